//!
//! Transactions, their inputs, outputs and witnesses.
//!
//! Every field is kept as found in the buffer (raw bytes or a span),
//! count and length prefixes included, so the exact serialization can
//! be reproduced from the decoded structure.
//!
use crate::parser::cursor::{
    hash32, infallible, le_i32, le_u32, le_u64, own, Eager, FieldCursor, FieldStore,
};
use crate::parser::errors::OpResult;
use crate::verify::double_hash;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;

/// previous transaction hash
pub const OUTPOINT_HASH_SIZE: usize = 32;
/// previous transaction hash + output index
pub const OUTPOINT_SIZE: usize = OUTPOINT_HASH_SIZE + 4;

const MIN_TXIN_SIZE: usize = OUTPOINT_SIZE + 1 + 4;
const MIN_TXOUT_SIZE: usize = 8 + 1;
const MIN_WITNESS_ITEM_SIZE: usize = 1;

const SEGWIT_MARKER: u8 = 0x00;
const SEGWIT_FLAG: u8 = 0x01;
const NULL_INDEX: u32 = 0xffff_ffff;

///
/// How script lengths (`scriptLength`, `pkScriptLen`) are encoded.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScriptLenEncoding {
    /// full compact-size integer, as Bitcoin Core writes it
    CompactSize,
    /// a single byte; scripts longer than 252 bytes are misread
    SingleByte,
}

impl Default for ScriptLenEncoding {
    fn default() -> Self {
        ScriptLenEncoding::CompactSize
    }
}

///
/// Options of the block and transaction decoders.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodeOptions {
    pub script_len: ScriptLenEncoding,
    /// recognize the BIP144 marker and read witnesses
    pub segwit: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        DecodeOptions {
            script_len: ScriptLenEncoding::CompactSize,
            segwit: true,
        }
    }
}

impl DecodeOptions {
    pub fn new() -> Self {
        DecodeOptions::default()
    }

    ///
    /// Single-byte script lengths and no witness support,
    /// which only decodes old blocks with short scripts correctly.
    ///
    pub fn legacy() -> Self {
        DecodeOptions {
            script_len: ScriptLenEncoding::SingleByte,
            segwit: false,
        }
    }

    pub fn script_len(mut self, encoding: ScriptLenEncoding) -> Self {
        self.script_len = encoding;
        self
    }

    pub fn segwit(mut self, segwit: bool) -> Self {
        self.segwit = segwit;
        self
    }
}

fn take_script_len<S: FieldStore>(
    cursor: &mut FieldCursor<'_>,
    encoding: ScriptLenEncoding,
) -> OpResult<(u64, S::Field)> {
    match encoding {
        ScriptLenEncoding::CompactSize => cursor.take_varint::<S>(),
        ScriptLenEncoding::SingleByte => {
            let field = cursor.take::<S>(1)?;
            let len = cursor.buffer()[cursor.position() - 1] as u64;
            Ok((len, field))
        }
    }
}

/// Reference to an output of a previous transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    /// as stored, not reversed for display
    pub txid: [u8; 32],
    pub vout: u32,
}

impl OutPoint {
    /// the outpoint of a coinbase input
    pub fn is_null(&self) -> bool {
        self.vout == NULL_INDEX && self.txid.iter().all(|b| *b == 0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxIn<S: FieldStore> {
    pub(crate) prev_hash: S::Field,
    pub(crate) prev_index: S::Field,
    pub(crate) script_len: S::Field,
    pub(crate) script_sig: S::Field,
    pub(crate) sequence: S::Field,
}

impl<S: FieldStore> TxIn<S> {
    pub(crate) fn decode(cursor: &mut FieldCursor<'_>, options: &DecodeOptions) -> OpResult<Self> {
        let prev_hash = cursor.take::<S>(OUTPOINT_HASH_SIZE)?;
        let prev_index = cursor.take::<S>(4)?;
        let (len, script_len) = take_script_len::<S>(cursor, options.script_len)?;
        let script_sig = cursor.take_declared::<S>(len)?;
        let sequence = cursor.take::<S>(4)?;
        Ok(TxIn {
            prev_hash,
            prev_index,
            script_len,
            script_sig,
            sequence,
        })
    }

    pub(crate) fn emit<E, F>(&self, sink: &mut F) -> Result<(), E>
    where
        F: FnMut(&S::Field) -> Result<(), E>,
    {
        sink(&self.prev_hash)?;
        sink(&self.prev_index)?;
        sink(&self.script_len)?;
        sink(&self.script_sig)?;
        sink(&self.sequence)
    }

    pub fn script_sig_len(&self) -> usize {
        S::field_len(&self.script_sig)
    }

    pub fn read_outpoint(&self, buf: &[u8]) -> OpResult<OutPoint> {
        Ok(OutPoint {
            txid: hash32(S::bytes(&self.prev_hash, buf)?),
            vout: le_u32(S::bytes(&self.prev_index, buf)?),
        })
    }

    pub fn read_script_sig<'a>(&'a self, buf: &'a [u8]) -> OpResult<&'a [u8]> {
        S::bytes(&self.script_sig, buf)
    }

    pub fn read_sequence(&self, buf: &[u8]) -> OpResult<u32> {
        Ok(le_u32(S::bytes(&self.sequence, buf)?))
    }

    pub fn materialize(&self, buf: &[u8]) -> OpResult<TxIn<Eager>> {
        Ok(TxIn {
            prev_hash: own::<S>(&self.prev_hash, buf)?,
            prev_index: own::<S>(&self.prev_index, buf)?,
            script_len: own::<S>(&self.script_len, buf)?,
            script_sig: own::<S>(&self.script_sig, buf)?,
            sequence: own::<S>(&self.sequence, buf)?,
        })
    }
}

impl TxIn<Eager> {
    pub fn outpoint(&self) -> OutPoint {
        OutPoint {
            txid: hash32(&self.prev_hash),
            vout: le_u32(&self.prev_index),
        }
    }

    pub fn script_sig(&self) -> &[u8] {
        &self.script_sig
    }

    pub fn sequence(&self) -> u32 {
        le_u32(&self.sequence)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxOut<S: FieldStore> {
    pub(crate) value: S::Field,
    pub(crate) script_len: S::Field,
    pub(crate) pk_script: S::Field,
}

impl<S: FieldStore> TxOut<S> {
    pub(crate) fn decode(cursor: &mut FieldCursor<'_>, options: &DecodeOptions) -> OpResult<Self> {
        let value = cursor.take::<S>(8)?;
        let (len, script_len) = take_script_len::<S>(cursor, options.script_len)?;
        let pk_script = cursor.take_declared::<S>(len)?;
        Ok(TxOut {
            value,
            script_len,
            pk_script,
        })
    }

    pub(crate) fn emit<E, F>(&self, sink: &mut F) -> Result<(), E>
    where
        F: FnMut(&S::Field) -> Result<(), E>,
    {
        sink(&self.value)?;
        sink(&self.script_len)?;
        sink(&self.pk_script)
    }

    pub fn pk_script_len(&self) -> usize {
        S::field_len(&self.pk_script)
    }

    /// value in satoshis
    pub fn read_value(&self, buf: &[u8]) -> OpResult<u64> {
        Ok(le_u64(S::bytes(&self.value, buf)?))
    }

    pub fn read_pk_script<'a>(&'a self, buf: &'a [u8]) -> OpResult<&'a [u8]> {
        S::bytes(&self.pk_script, buf)
    }

    pub fn materialize(&self, buf: &[u8]) -> OpResult<TxOut<Eager>> {
        Ok(TxOut {
            value: own::<S>(&self.value, buf)?,
            script_len: own::<S>(&self.script_len, buf)?,
            pk_script: own::<S>(&self.pk_script, buf)?,
        })
    }
}

impl TxOut<Eager> {
    /// value in satoshis
    pub fn value(&self) -> u64 {
        le_u64(&self.value)
    }

    pub fn pk_script(&self) -> &[u8] {
        &self.pk_script
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WitnessItem<S: FieldStore> {
    pub(crate) len: S::Field,
    pub(crate) data: S::Field,
}

/// The witness stack of one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Witness<S: FieldStore> {
    pub(crate) n_items: S::Field,
    pub(crate) items: Vec<WitnessItem<S>>,
}

impl<S: FieldStore> Witness<S> {
    pub(crate) fn decode(cursor: &mut FieldCursor<'_>) -> OpResult<Self> {
        let (count, n_items) = cursor.take_varint::<S>()?;
        let mut items = Vec::with_capacity(cursor.capacity_for(count, MIN_WITNESS_ITEM_SIZE));
        for _ in 0..count {
            let (len, len_field) = cursor.take_varint::<S>()?;
            let data = cursor.take_declared::<S>(len)?;
            items.push(WitnessItem {
                len: len_field,
                data,
            });
        }
        Ok(Witness { n_items, items })
    }

    pub(crate) fn emit<E, F>(&self, sink: &mut F) -> Result<(), E>
    where
        F: FnMut(&S::Field) -> Result<(), E>,
    {
        sink(&self.n_items)?;
        for item in &self.items {
            sink(&item.len)?;
            sink(&item.data)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn read_items<'a>(&'a self, buf: &'a [u8]) -> OpResult<Vec<&'a [u8]>> {
        self.items
            .iter()
            .map(|item| S::bytes(&item.data, buf))
            .collect()
    }

    pub fn materialize(&self, buf: &[u8]) -> OpResult<Witness<Eager>> {
        let mut items = Vec::with_capacity(self.items.len());
        for item in &self.items {
            items.push(WitnessItem {
                len: own::<S>(&item.len, buf)?,
                data: own::<S>(&item.data, buf)?,
            });
        }
        Ok(Witness {
            n_items: own::<S>(&self.n_items, buf)?,
            items,
        })
    }
}

impl Witness<Eager> {
    pub fn items(&self) -> Vec<&[u8]> {
        self.items.iter().map(|item| item.data.as_slice()).collect()
    }
}

///
/// A decoded transaction.
///
/// `start` and `end` are its offsets in the buffer it was decoded from.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction<S: FieldStore> {
    pub(crate) start: usize,
    pub(crate) end: usize,
    pub(crate) version: S::Field,
    /// BIP144 marker and flag
    pub(crate) segwit_flag: Option<S::Field>,
    pub(crate) n_inputs: S::Field,
    pub(crate) inputs: Vec<TxIn<S>>,
    pub(crate) n_outputs: S::Field,
    pub(crate) outputs: Vec<TxOut<S>>,
    pub(crate) witnesses: Vec<Witness<S>>,
    pub(crate) lock_time: S::Field,
}

impl<S: FieldStore> Transaction<S> {
    ///
    /// Decode one transaction at the cursor.
    ///
    /// On success the cursor is right after the transaction.
    /// Any failure is returned as is, nothing partially decoded is kept.
    ///
    pub fn decode(cursor: &mut FieldCursor<'_>, options: &DecodeOptions) -> OpResult<Self> {
        let start = cursor.position();
        let version = cursor.take::<S>(4)?;

        let segwit_flag = match cursor.peek(2) {
            Some(&[SEGWIT_MARKER, SEGWIT_FLAG]) if options.segwit => Some(cursor.take::<S>(2)?),
            _ => None,
        };

        let (count, n_inputs) = cursor.take_varint::<S>()?;
        let mut inputs = Vec::with_capacity(cursor.capacity_for(count, MIN_TXIN_SIZE));
        for _ in 0..count {
            inputs.push(TxIn::decode(cursor, options)?);
        }

        let (count, n_outputs) = cursor.take_varint::<S>()?;
        let mut outputs = Vec::with_capacity(cursor.capacity_for(count, MIN_TXOUT_SIZE));
        for _ in 0..count {
            outputs.push(TxOut::decode(cursor, options)?);
        }

        let witnesses = if segwit_flag.is_some() {
            let mut witnesses = Vec::with_capacity(inputs.len());
            for _ in 0..inputs.len() {
                witnesses.push(Witness::decode(cursor)?);
            }
            witnesses
        } else {
            Vec::new()
        };

        let lock_time = cursor.take::<S>(4)?;

        Ok(Transaction {
            start,
            end: cursor.position(),
            version,
            segwit_flag,
            n_inputs,
            inputs,
            n_outputs,
            outputs,
            witnesses,
            lock_time,
        })
    }

    /// Feed every field, in serialization order, to `sink`.
    pub(crate) fn emit<E, F>(&self, with_witness: bool, sink: &mut F) -> Result<(), E>
    where
        F: FnMut(&S::Field) -> Result<(), E>,
    {
        sink(&self.version)?;
        if with_witness {
            if let Some(flag) = &self.segwit_flag {
                sink(flag)?;
            }
        }
        sink(&self.n_inputs)?;
        for input in &self.inputs {
            input.emit(sink)?;
        }
        sink(&self.n_outputs)?;
        for output in &self.outputs {
            output.emit(sink)?;
        }
        if with_witness {
            for witness in &self.witnesses {
                witness.emit(sink)?;
            }
        }
        sink(&self.lock_time)
    }

    fn collect_bytes(&self, with_witness: bool, buf: &[u8]) -> OpResult<Vec<u8>> {
        let mut out = Vec::with_capacity(self.size());
        self.emit(with_witness, &mut |field: &S::Field| -> OpResult<()> {
            out.extend_from_slice(S::bytes(field, buf)?);
            Ok(())
        })?;
        Ok(out)
    }

    #[inline]
    pub fn start(&self) -> usize {
        self.start
    }

    /// offset of the first byte after this transaction
    #[inline]
    pub fn end(&self) -> usize {
        self.end
    }

    /// serialized size in bytes, witnesses included
    #[inline]
    pub fn size(&self) -> usize {
        self.end - self.start
    }

    pub fn inputs(&self) -> &[TxIn<S>] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[TxOut<S>] {
        &self.outputs
    }

    /// one witness per input for segwit transactions, empty otherwise
    pub fn witnesses(&self) -> &[Witness<S>] {
        &self.witnesses
    }

    pub fn n_inputs(&self) -> usize {
        self.inputs.len()
    }

    pub fn n_outputs(&self) -> usize {
        self.outputs.len()
    }

    pub fn is_segwit(&self) -> bool {
        self.segwit_flag.is_some()
    }

    pub fn read_version(&self, buf: &[u8]) -> OpResult<i32> {
        Ok(le_i32(S::bytes(&self.version, buf)?))
    }

    pub fn read_lock_time(&self, buf: &[u8]) -> OpResult<u32> {
        Ok(le_u32(S::bytes(&self.lock_time, buf)?))
    }

    pub fn read_is_coinbase(&self, buf: &[u8]) -> OpResult<bool> {
        match self.inputs.as_slice() {
            [input] => Ok(input.read_outpoint(buf)?.is_null()),
            _ => Ok(false),
        }
    }

    /// exact bytes of this transaction, witnesses included
    pub fn serialize(&self, buf: &[u8]) -> OpResult<Vec<u8>> {
        self.collect_bytes(true, buf)
    }

    /// bytes without marker, flag and witnesses
    pub fn serialize_stripped(&self, buf: &[u8]) -> OpResult<Vec<u8>> {
        self.collect_bytes(false, buf)
    }

    /// double SHA256 of the stripped serialization, as stored (not reversed)
    pub fn compute_txid(&self, buf: &[u8]) -> OpResult<[u8; 32]> {
        Ok(double_hash(&self.serialize_stripped(buf)?))
    }

    /// double SHA256 of the full serialization, as stored (not reversed)
    pub fn compute_wtxid(&self, buf: &[u8]) -> OpResult<[u8; 32]> {
        Ok(double_hash(&self.serialize(buf)?))
    }

    pub fn materialize(&self, buf: &[u8]) -> OpResult<Transaction<Eager>> {
        let segwit_flag = match &self.segwit_flag {
            Some(flag) => Some(own::<S>(flag, buf)?),
            None => None,
        };
        Ok(Transaction {
            start: self.start,
            end: self.end,
            version: own::<S>(&self.version, buf)?,
            segwit_flag,
            n_inputs: own::<S>(&self.n_inputs, buf)?,
            inputs: self
                .inputs
                .iter()
                .map(|i| i.materialize(buf))
                .collect::<OpResult<_>>()?,
            n_outputs: own::<S>(&self.n_outputs, buf)?,
            outputs: self
                .outputs
                .iter()
                .map(|o| o.materialize(buf))
                .collect::<OpResult<_>>()?,
            witnesses: self
                .witnesses
                .iter()
                .map(|w| w.materialize(buf))
                .collect::<OpResult<_>>()?,
            lock_time: own::<S>(&self.lock_time, buf)?,
        })
    }
}

impl Transaction<Eager> {
    fn owned_bytes(&self, with_witness: bool) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.size());
        infallible(
            self.emit(with_witness, &mut |field: &Vec<u8>| -> Result<(), Infallible> {
                out.extend_from_slice(field);
                Ok(())
            }),
        );
        out
    }

    pub fn version(&self) -> i32 {
        le_i32(&self.version)
    }

    pub fn lock_time(&self) -> u32 {
        le_u32(&self.lock_time)
    }

    pub fn is_coinbase(&self) -> bool {
        match self.inputs.as_slice() {
            [input] => input.outpoint().is_null(),
            _ => false,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.owned_bytes(true)
    }

    pub fn to_stripped_bytes(&self) -> Vec<u8> {
        self.owned_bytes(false)
    }

    pub fn txid(&self) -> [u8; 32] {
        double_hash(&self.to_stripped_bytes())
    }

    pub fn wtxid(&self) -> [u8; 32] {
        double_hash(&self.to_bytes())
    }
}
