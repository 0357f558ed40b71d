//!
//! Decoding blocks of one buffer in parallel.
//!
//! Where a block starts depends on where the previous one ends, so
//! block boundaries are first located sequentially, using the size
//! declared in each block preamble and without decoding anything.
//! Blocks are then independent and decoded on the rayon thread pool.
//!
use crate::parser::block::{Block, BLOCK_PREAMBLE_SIZE, MAGIC_SIZE, MIN_BLOCK_SIZE};
use crate::parser::cursor::{le_u32, FieldCursor, FieldStore};
use crate::parser::errors::OpResult;
use crate::parser::transaction::DecodeOptions;
use log::{debug, warn};
use rayon::prelude::*;

/// Where a block sits in a buffer, according to its preamble.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockLocation {
    /// offset of the magic
    pub offset: usize,
    /// block size declared after the magic
    pub declared_size: u32,
}

impl BlockLocation {
    /// offset right after the block, as declared
    pub fn end(&self) -> usize {
        self.offset + BLOCK_PREAMBLE_SIZE + self.declared_size as usize
    }
}

///
/// Find the blocks of `buf` from their preambles.
///
/// Stops at the end of data, at zero padding, or at a block whose
/// declared size runs past the end of the buffer.
///
pub fn locate_blocks(buf: &[u8]) -> Vec<BlockLocation> {
    let mut locations = Vec::new();
    let mut offset = 0;
    while buf.len().saturating_sub(offset) >= MIN_BLOCK_SIZE {
        let preamble = &buf[offset..offset + BLOCK_PREAMBLE_SIZE];
        if preamble.iter().all(|b| *b == 0) {
            break;
        }
        let location = BlockLocation {
            offset,
            declared_size: le_u32(&preamble[MAGIC_SIZE..]),
        };
        if location.end() > buf.len() {
            warn!(
                "Block at offset {} declares {} bytes, only {} left",
                offset,
                location.declared_size,
                buf.len() - offset - BLOCK_PREAMBLE_SIZE
            );
            break;
        }
        locations.push(location);
        offset = location.end();
    }
    debug!("Located {} blocks", locations.len());
    locations
}

///
/// Decode the located blocks in parallel, results in the order of `locations`.
///
/// Each block is decoded within its declared size, a block whose
/// content runs past it is truncated rather than read into the next one.
///
pub fn decode_blocks_par<S: FieldStore>(
    buf: &[u8],
    locations: &[BlockLocation],
    options: &DecodeOptions,
) -> Vec<OpResult<Block<S>>> {
    locations
        .par_iter()
        .map(|location| {
            let bounded = &buf[..location.end().min(buf.len())];
            Block::decode(&mut FieldCursor::at(bounded, location.offset), options)
        })
        .collect()
}

///
/// Locate and decode all blocks of `buf` in parallel.
///
/// Like a permissive scan, the result ends before the first block that
/// fails to decode.
///
pub fn read_blocks_par<S: FieldStore>(buf: &[u8], options: &DecodeOptions) -> Vec<Block<S>> {
    let locations = locate_blocks(buf);
    let mut blocks = Vec::with_capacity(locations.len());
    for (location, result) in locations
        .iter()
        .zip(decode_blocks_par::<S>(buf, &locations, options))
    {
        match result {
            Ok(block) => blocks.push(block),
            Err(e) => {
                warn!("Stop at block offset {}: {}", location.offset, e);
                break;
            }
        }
    }
    blocks
}
