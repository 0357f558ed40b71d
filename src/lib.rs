//!
//! # Introduction
//!
//! This library decodes the raw block files of Bitcoin Core
//! (`blocks/blk*.dat`) without a node, a database, or any
//! blockchain library.
//!
//! Blocks and transactions are decoded field by field, with one of
//! two storage strategies:
//! - `Eager`: every field is copied out of the buffer.
//! - `Lazy`: every field is a `Span` of offsets into the buffer, and is
//!   read by passing the buffer back in. `materialize` turns a lazy
//!   block into an eager one.
//!
//! Every field is kept as found, including count and length prefixes,
//! so transactions re-serialize byte for byte and txids, wtxids and
//! block hashes can be recomputed.
//!
//! ## Caveat
//!
//! Nothing is validated: no proof-of-work, merkle root, script or
//! signature checks.
//!
//! # Example
//!
//! ```rust
//! use blk_decoder::{display_hex, BlkFile, Eager, ScanOptions};
//! use std::path::Path;
//!
//! let buf = BlkFile::new(Path::new("/Users/me/bitcoin/blocks/blk00000.dat"))
//!     .open()
//!     .unwrap();
//!
//! for block in buf.scan::<Eager>(ScanOptions::new().limit(10)) {
//!     println!("{}", display_hex(&block.block_hash()));
//! }
//! ```
//!

pub(crate) mod api;
pub mod iter;
pub mod parser;
pub mod verify;

#[doc(inline)]
pub use crate::api::*;
