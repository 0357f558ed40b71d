use crate::parser::block::{Block, BLOCK_PREAMBLE_SIZE, MIN_BLOCK_SIZE};
use crate::parser::cursor::{FieldCursor, FieldStore};
use crate::parser::errors::{OpError, OpErrorKind, OpResult};
use crate::parser::transaction::DecodeOptions;
use log::{debug, info, warn};
use std::marker::PhantomData;

///
/// Options of a scan over a blk buffer.
///
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanOptions {
    /// stop after this many blocks, `0` for no limit
    pub limit: usize,
    /// report truncation and missing blocks as errors in `read_blocks`
    pub strict: bool,
    pub decode: DecodeOptions,
}

impl ScanOptions {
    pub fn new() -> Self {
        ScanOptions::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn decode(mut self, decode: DecodeOptions) -> Self {
        self.decode = decode;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    Scanning,
    /// end of usable data, or the block limit was reached
    Done,
    /// the block starting at `offset` is incomplete
    Truncated { offset: usize },
}

///
/// Iterate over the consecutive blocks of a blk buffer.
///
/// Stops at the end of data, at zero padding, or at a block that
/// cannot be decoded completely. None of these are errors;
/// `state()` tells which one happened.
///
pub struct BlkScanner<'a, S> {
    buf: &'a [u8],
    offset: usize,
    yielded: usize,
    state: ScanState,
    options: ScanOptions,
    stopped_by: Option<OpError>,
    _store: PhantomData<S>,
}

impl<'a, S: FieldStore> BlkScanner<'a, S> {
    pub fn new(buf: &'a [u8], options: ScanOptions) -> Self {
        BlkScanner {
            buf,
            offset: 0,
            yielded: 0,
            state: ScanState::Scanning,
            options,
            stopped_by: None,
            _store: PhantomData,
        }
    }

    pub fn state(&self) -> ScanState {
        self.state
    }

    /// offset of the next block to decode
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// number of blocks yielded so far
    pub fn yielded(&self) -> usize {
        self.yielded
    }

    /// the decoding error that ended the scan, if any
    pub fn stopped_by(&self) -> Option<&OpError> {
        self.stopped_by.as_ref()
    }

    fn finish(&mut self) {
        debug!(
            "Scan done at offset {} after {} blocks",
            self.offset, self.yielded
        );
        self.state = ScanState::Done;
    }
}

/// Bitcoin Core pre-allocates blk files with zeros.
#[inline]
fn is_zero_padding(preamble: &[u8]) -> bool {
    preamble.iter().all(|b| *b == 0)
}

impl<'a, S: FieldStore> Iterator for BlkScanner<'a, S> {
    type Item = Block<S>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.state != ScanState::Scanning {
            return None;
        }
        if self.options.limit > 0 && self.yielded >= self.options.limit {
            self.finish();
            return None;
        }
        let remaining = self.buf.len().saturating_sub(self.offset);
        if remaining < MIN_BLOCK_SIZE {
            if remaining > 0 {
                debug!("{} trailing bytes at offset {}", remaining, self.offset);
            }
            self.finish();
            return None;
        }
        if is_zero_padding(&self.buf[self.offset..self.offset + BLOCK_PREAMBLE_SIZE]) {
            self.finish();
            return None;
        }

        let mut cursor = FieldCursor::at(self.buf, self.offset);
        match Block::<S>::decode(&mut cursor, &self.options.decode) {
            Ok(block) => {
                self.offset = cursor.position();
                self.yielded += 1;
                Some(block)
            }
            Err(e) => {
                warn!(
                    "Stop scanning at block {} (offset {}): {}",
                    self.yielded, self.offset, e
                );
                self.state = ScanState::Truncated {
                    offset: self.offset,
                };
                self.stopped_by = Some(e);
                None
            }
        }
    }
}

///
/// Decode all blocks of `buf` (up to `options.limit`).
///
/// Permissive by default: a truncated last block just ends the list.
/// With `options.strict`, truncation or fewer blocks than `limit`
/// is an error.
///
pub fn read_blocks<S: FieldStore>(buf: &[u8], options: &ScanOptions) -> OpResult<Vec<Block<S>>> {
    let mut scanner = BlkScanner::<S>::new(buf, *options);
    let blocks: Vec<Block<S>> = scanner.by_ref().collect();
    info!("Decoded {} blocks", blocks.len());

    if options.strict {
        if let ScanState::Truncated { offset } = scanner.state() {
            let msg = format!("block {} at offset {} is incomplete", blocks.len(), offset);
            return Err(match scanner.stopped_by.take() {
                Some(e) => e.join_msg(&msg),
                None => OpError::new(OpErrorKind::TruncatedInput).join_msg(&msg),
            });
        }
        if options.limit > 0 && blocks.len() < options.limit {
            return Err(OpError::new(OpErrorKind::RuntimeError).join_msg(&format!(
                "requested {} blocks, found {}",
                options.limit,
                blocks.len()
            )));
        }
    }
    Ok(blocks)
}
