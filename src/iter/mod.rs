//!
//! This module defines iteration over the blocks of a blk buffer,
//! sequentially or on the rayon thread pool.
//!

mod par_decode;
mod scanner;

pub use par_decode::{decode_blocks_par, locate_blocks, read_blocks_par, BlockLocation};
pub use scanner::{read_blocks, BlkScanner, ScanOptions, ScanState};
