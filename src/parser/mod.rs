//!
//! This module defines how to decode the binary data of blk files.
//!

/// read blk files into shared buffers
pub mod blk_file;

/// blocks with their preamble and header
pub mod block;

/// field cursor and the two field storage strategies
pub mod cursor;

/// error handling
pub mod errors;

/// serde friendly summaries of decoded blocks
pub mod proto;

/// transactions, inputs, outputs, witnesses
pub mod transaction;

/// Bitcoin's variable length integers
pub mod varint;
