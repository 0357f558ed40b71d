//!
//! Crates APIs, essential structs, functions, methods are all here!
//!
//! To quickly understand how to use this crate, have a look at
//! `decode_file`, `BlkFile` and `BlkScanner`.
//!
//! # Example
//!
//! ```rust
//! use blk_decoder::{decode_file, Lazy, ScanOptions};
//! use std::path::Path;
//!
//! let path = Path::new("/Users/me/bitcoin/blocks/blk00000.dat");
//!
//! // lazy blocks only hold offsets into the returned buffer
//! let (buf, blocks) = decode_file::<Lazy>(path, &ScanOptions::new()).unwrap();
//! for block in &blocks {
//!     println!("{} transactions", block.n_transactions());
//!     let eager = block.materialize(&buf).unwrap();
//! }
//! ```
//!

use log::info;
use std::path::Path;
// re-exports
pub use crate::iter::{
    decode_blocks_par, locate_blocks, read_blocks, read_blocks_par, BlkScanner, BlockLocation,
    ScanOptions, ScanState,
};
pub use crate::parser::blk_file::{BlkBuffer, BlkFile};
pub use crate::parser::block::{Block, BlockHeader, Network, MIN_BLOCK_SIZE};
pub use crate::parser::cursor::{Eager, FieldCursor, FieldStore, Lazy, Span};
pub use crate::parser::errors::{OpError, OpErrorKind, OpResult};
pub use crate::parser::proto::simple_proto::{
    BlockHeaderSummary, BlockSummary, TxInSummary, TxOutSummary, TxSummary,
};
pub use crate::parser::transaction::{
    DecodeOptions, OutPoint, ScriptLenEncoding, Transaction, TxIn, TxOut, Witness,
};
pub use crate::parser::varint::{decode_varint, encode_varint, varint_len};
pub use crate::verify::{
    display_hash, display_hex, double_hash, legacy_signing_bytes, verify_legacy_txid,
};
pub use bitcoin_hashes::hex::{FromHex, ToHex};

///
/// Iterate over the blocks of `buf`.
///
/// Same as `BlkScanner::new`, the scanner stops without error at the
/// end of data, zero padding, or a truncated block.
///
#[inline]
pub fn scan_blocks<S: FieldStore>(buf: &[u8], options: ScanOptions) -> BlkScanner<'_, S> {
    BlkScanner::new(buf, options)
}

///
/// Acquire the blk file at `path` and decode its blocks.
///
/// The file is memory-mapped when the `mmap` feature is on, read into
/// memory otherwise. The buffer is returned with the blocks, lazy blocks
/// resolve their fields against it.
///
pub fn decode_file<S: FieldStore>(
    path: &Path,
    options: &ScanOptions,
) -> OpResult<(BlkBuffer, Vec<Block<S>>)> {
    let buf = acquire(&BlkFile::new(path))?;
    let blocks = buf.read_blocks::<S>(options)?;
    info!("{}: {} blocks", path.display(), blocks.len());
    Ok((buf, blocks))
}

/// Same as `decode_file`, blocks are decoded on the rayon thread pool.
pub fn decode_file_par<S: FieldStore>(
    path: &Path,
    options: &DecodeOptions,
) -> OpResult<(BlkBuffer, Vec<Block<S>>)> {
    let buf = acquire(&BlkFile::new(path))?;
    let blocks = read_blocks_par::<S>(&buf, options);
    info!("{}: {} blocks", path.display(), blocks.len());
    Ok((buf, blocks))
}

#[cfg(feature = "mmap")]
#[inline]
fn acquire(file: &BlkFile) -> OpResult<BlkBuffer> {
    file.map()
}

#[cfg(not(feature = "mmap"))]
#[inline]
fn acquire(file: &BlkFile) -> OpResult<BlkBuffer> {
    file.open()
}
