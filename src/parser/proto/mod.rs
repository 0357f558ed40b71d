//!
//! ## Summary Types
//!
//! Decoded blocks keep every field as found, which is what decoding and
//! verification need. Downstream consumers usually want much less:
//! - `BlockSummary`: block hash, time, network and the transactions
//! - `TxSummary`: txid, spent outpoints and output values
//!
//! Hashes are hex strings in display (reversed) order. All summary
//! types derive serde `Serialize` and `Deserialize`.
//!

/// simplified blocks and transactions, for export
pub mod simple_proto;
