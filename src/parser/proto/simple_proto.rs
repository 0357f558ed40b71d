use crate::parser::block::{Block, Network};
use crate::parser::cursor::{Eager, FieldStore};
use crate::parser::errors::OpResult;
use crate::parser::transaction::{Transaction, TxIn, TxOut};
use crate::verify::display_hex;
use serde::{Deserialize, Serialize};

///
/// Block in a `simple` format.
///
/// A `BlockSummary` compared to a `Block` has the following
/// precomputed:
/// - `block hash`
/// - `transaction id`
///
/// But it has the following removed:
/// - `nonce`
/// - `previous block hash`
/// - `merkle root`
/// - `bits`
/// - `scripts and witnesses`
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSummary {
    pub header: BlockHeaderSummary,
    pub txdata: Vec<TxSummary>,
}

impl BlockSummary {
    pub fn from_block<S: FieldStore>(block: &Block<S>, buf: &[u8]) -> OpResult<BlockSummary> {
        Ok(BlockSummary {
            header: BlockHeaderSummary {
                block_hash: display_hex(&block.compute_block_hash(buf)?),
                time: block.read_header(buf)?.time,
                network: block.read_network(buf)?,
            },
            txdata: block
                .transactions()
                .iter()
                .map(|tx| TxSummary::from_transaction(tx, buf))
                .collect::<OpResult<_>>()?,
        })
    }
}

impl From<&Block<Eager>> for BlockSummary {
    fn from(block: &Block<Eager>) -> BlockSummary {
        BlockSummary {
            header: BlockHeaderSummary {
                block_hash: display_hex(&block.block_hash()),
                time: block.header().time,
                network: block.network(),
            },
            txdata: block.transactions().iter().map(|tx| tx.into()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeaderSummary {
    pub block_hash: String,
    pub time: u32,
    pub network: Network,
}

/// `TxSummary` keeps the txid, what is spent and how much is paid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxSummary {
    pub txid: String,
    /// List of inputs
    pub input: Vec<TxInSummary>,
    /// List of outputs
    pub output: Vec<TxOutSummary>,
}

impl TxSummary {
    pub fn from_transaction<S: FieldStore>(tx: &Transaction<S>, buf: &[u8]) -> OpResult<TxSummary> {
        Ok(TxSummary {
            txid: display_hex(&tx.compute_txid(buf)?),
            input: tx
                .inputs()
                .iter()
                .map(|i| TxInSummary::from_input(i, buf))
                .collect::<OpResult<_>>()?,
            output: tx
                .outputs()
                .iter()
                .map(|o| TxOutSummary::from_output(o, buf))
                .collect::<OpResult<_>>()?,
        })
    }

    /// sum of the output values, `None` if it does not fit in a `u64`
    pub fn total_value(&self) -> Option<u64> {
        self.output
            .iter()
            .try_fold(0u64, |acc, o| acc.checked_add(o.value))
    }
}

impl From<&Transaction<Eager>> for TxSummary {
    fn from(tx: &Transaction<Eager>) -> TxSummary {
        TxSummary {
            txid: display_hex(&tx.txid()),
            input: tx.inputs().iter().map(|i| i.into()).collect(),
            output: tx.outputs().iter().map(|o| o.into()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInSummary {
    /// txid of the spent output, in display order
    pub txid: String,
    pub vout: u32,
}

impl TxInSummary {
    pub fn from_input<S: FieldStore>(input: &TxIn<S>, buf: &[u8]) -> OpResult<TxInSummary> {
        let outpoint = input.read_outpoint(buf)?;
        Ok(TxInSummary {
            txid: display_hex(&outpoint.txid),
            vout: outpoint.vout,
        })
    }
}

impl From<&TxIn<Eager>> for TxInSummary {
    fn from(input: &TxIn<Eager>) -> TxInSummary {
        let outpoint = input.outpoint();
        TxInSummary {
            txid: display_hex(&outpoint.txid),
            vout: outpoint.vout,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutSummary {
    pub value: u64,
}

impl TxOutSummary {
    pub fn from_output<S: FieldStore>(output: &TxOut<S>, buf: &[u8]) -> OpResult<TxOutSummary> {
        Ok(TxOutSummary {
            value: output.read_value(buf)?,
        })
    }
}

impl From<&TxOut<Eager>> for TxOutSummary {
    fn from(output: &TxOut<Eager>) -> TxOutSummary {
        TxOutSummary {
            value: output.value(),
        }
    }
}
