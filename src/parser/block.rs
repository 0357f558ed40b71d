//!
//! Blocks as stored in `blk*.dat` files:
//! magic, block size, the 80-byte header, and the transactions.
//!
use crate::parser::cursor::{
    array4, hash32, infallible, le_i32, le_u32, own, Eager, FieldCursor, FieldStore,
};
use crate::parser::errors::OpResult;
use crate::parser::transaction::{DecodeOptions, Transaction};
use crate::verify::double_hash;
use log::debug;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// network magic
pub const MAGIC_SIZE: usize = 4;
/// declared size of the block following the preamble
pub const BLOCK_SIZE_FIELD: usize = 4;
/// magic + block size
pub const BLOCK_PREAMBLE_SIZE: usize = MAGIC_SIZE + BLOCK_SIZE_FIELD;
/// version + previous hash + merkle root + time + bits + nonce
pub const HEADER_SIZE: usize = 4 + 32 + 32 + 4 + 4 + 4;
/// smallest transaction count prefix
pub const MIN_VARINT_SIZE: usize = 1;
/// fewer remaining bytes than this cannot hold another block
pub const MIN_BLOCK_SIZE: usize = BLOCK_PREAMBLE_SIZE + HEADER_SIZE + MIN_VARINT_SIZE;

const MIN_TX_SIZE: usize = 4 + 1 + 1 + 4;

/// Network identified by the magic of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    Bitcoin,
    Testnet,
    Signet,
    Regtest,
    Unknown([u8; 4]),
}

impl Network {
    pub fn from_magic(magic: [u8; 4]) -> Network {
        match magic {
            [0xf9, 0xbe, 0xb4, 0xd9] => Network::Bitcoin,
            [0x0b, 0x11, 0x09, 0x07] => Network::Testnet,
            [0x0a, 0x03, 0xcf, 0x40] => Network::Signet,
            [0xfa, 0xbf, 0xb5, 0xda] => Network::Regtest,
            other => Network::Unknown(other),
        }
    }

    pub fn magic(&self) -> [u8; 4] {
        match self {
            Network::Bitcoin => [0xf9, 0xbe, 0xb4, 0xd9],
            Network::Testnet => [0x0b, 0x11, 0x09, 0x07],
            Network::Signet => [0x0a, 0x03, 0xcf, 0x40],
            Network::Regtest => [0xfa, 0xbf, 0xb5, 0xda],
            Network::Unknown(magic) => *magic,
        }
    }
}

/// Typed block header fields. Hashes are as stored, not reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_hash: [u8; 32],
    pub merkle_root: [u8; 32],
    pub time: u32,
    pub bits: u32,
    pub nonce: u32,
}

///
/// A decoded block.
///
/// `start` is the offset of its magic in the buffer, `end` the offset
/// right after its last transaction.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block<S: FieldStore> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) magic: S::Field,
    pub(crate) block_size: S::Field,
    pub(crate) version: S::Field,
    pub(crate) prev_hash: S::Field,
    pub(crate) merkle_root: S::Field,
    pub(crate) time: S::Field,
    pub(crate) bits: S::Field,
    pub(crate) nonce: S::Field,
    pub(crate) n_transactions: S::Field,
    pub(crate) transactions: Vec<Transaction<S>>,
}

impl<S: FieldStore> Block<S> {
    ///
    /// Decode one block, starting at its magic.
    ///
    /// No proof-of-work, merkle root or size check is performed.
    ///
    pub fn decode(cursor: &mut FieldCursor<'_>, options: &DecodeOptions) -> OpResult<Self> {
        let start = cursor.position();
        let magic = cursor.take::<S>(MAGIC_SIZE)?;
        let block_size = cursor.take::<S>(BLOCK_SIZE_FIELD)?;
        let version = cursor.take::<S>(4)?;
        let prev_hash = cursor.take::<S>(32)?;
        let merkle_root = cursor.take::<S>(32)?;
        let time = cursor.take::<S>(4)?;
        let bits = cursor.take::<S>(4)?;
        let nonce = cursor.take::<S>(4)?;

        let (count, n_transactions) = cursor.take_varint::<S>()?;
        let mut transactions = Vec::with_capacity(cursor.capacity_for(count, MIN_TX_SIZE));
        for _ in 0..count {
            transactions.push(Transaction::decode(cursor, options)?);
        }

        let end = cursor.position();
        let declared = le_u32(S::bytes(&block_size, cursor.buffer())?) as usize;
        let decoded = end - start - BLOCK_PREAMBLE_SIZE;
        if declared != decoded {
            debug!(
                "block at offset {} declares {} bytes, decoded {}",
                start, declared, decoded
            );
        }

        Ok(Block {
            start,
            end,
            magic,
            block_size,
            version,
            prev_hash,
            merkle_root,
            time,
            bits,
            nonce,
            n_transactions,
            transactions,
        })
    }

    pub(crate) fn emit_header<E, F>(&self, sink: &mut F) -> Result<(), E>
    where
        F: FnMut(&S::Field) -> Result<(), E>,
    {
        sink(&self.version)?;
        sink(&self.prev_hash)?;
        sink(&self.merkle_root)?;
        sink(&self.time)?;
        sink(&self.bits)?;
        sink(&self.nonce)
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// offset of the first byte after this block
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    pub fn transactions(&self) -> &[Transaction<S>] {
        &self.transactions
    }

    /// always equal to the transaction count declared in the block
    pub fn n_transactions(&self) -> usize {
        self.transactions.len()
    }

    pub fn read_magic(&self, buf: &[u8]) -> OpResult<[u8; 4]> {
        Ok(array4(S::bytes(&self.magic, buf)?))
    }

    pub fn read_network(&self, buf: &[u8]) -> OpResult<Network> {
        Ok(Network::from_magic(self.read_magic(buf)?))
    }

    /// block size as declared in the preamble
    pub fn read_block_size(&self, buf: &[u8]) -> OpResult<u32> {
        Ok(le_u32(S::bytes(&self.block_size, buf)?))
    }

    pub fn read_header(&self, buf: &[u8]) -> OpResult<BlockHeader> {
        Ok(BlockHeader {
            version: le_i32(S::bytes(&self.version, buf)?),
            prev_hash: hash32(S::bytes(&self.prev_hash, buf)?),
            merkle_root: hash32(S::bytes(&self.merkle_root, buf)?),
            time: le_u32(S::bytes(&self.time, buf)?),
            bits: le_u32(S::bytes(&self.bits, buf)?),
            nonce: le_u32(S::bytes(&self.nonce, buf)?),
        })
    }

    /// the 80 header bytes
    pub fn read_header_bytes(&self, buf: &[u8]) -> OpResult<Vec<u8>> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        self.emit_header(&mut |field: &S::Field| -> OpResult<()> {
            out.extend_from_slice(S::bytes(field, buf)?);
            Ok(())
        })?;
        Ok(out)
    }

    /// double SHA256 of the header, as stored (not reversed)
    pub fn compute_block_hash(&self, buf: &[u8]) -> OpResult<[u8; 32]> {
        Ok(double_hash(&self.read_header_bytes(buf)?))
    }

    pub fn materialize(&self, buf: &[u8]) -> OpResult<Block<Eager>> {
        Ok(Block {
            start: self.start,
            end: self.end,
            magic: own::<S>(&self.magic, buf)?,
            block_size: own::<S>(&self.block_size, buf)?,
            version: own::<S>(&self.version, buf)?,
            prev_hash: own::<S>(&self.prev_hash, buf)?,
            merkle_root: own::<S>(&self.merkle_root, buf)?,
            time: own::<S>(&self.time, buf)?,
            bits: own::<S>(&self.bits, buf)?,
            nonce: own::<S>(&self.nonce, buf)?,
            n_transactions: own::<S>(&self.n_transactions, buf)?,
            transactions: self
                .transactions
                .iter()
                .map(|tx| tx.materialize(buf))
                .collect::<OpResult<_>>()?,
        })
    }
}

impl Block<Eager> {
    pub fn magic(&self) -> [u8; 4] {
        array4(&self.magic)
    }

    pub fn network(&self) -> Network {
        Network::from_magic(self.magic())
    }

    pub fn block_size(&self) -> u32 {
        le_u32(&self.block_size)
    }

    pub fn header(&self) -> BlockHeader {
        BlockHeader {
            version: le_i32(&self.version),
            prev_hash: hash32(&self.prev_hash),
            merkle_root: hash32(&self.merkle_root),
            time: le_u32(&self.time),
            bits: le_u32(&self.bits),
            nonce: le_u32(&self.nonce),
        }
    }

    pub fn header_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_SIZE);
        infallible(self.emit_header(&mut |field: &Vec<u8>| -> Result<(), Infallible> {
            out.extend_from_slice(field);
            Ok(())
        }));
        out
    }

    pub fn block_hash(&self) -> [u8; 32] {
        double_hash(&self.header_bytes())
    }
}
