//!
//! Hash based spot checks of decoded transactions.
//!
//! Nothing here takes part in decoding; a failed check only means the
//! data or the decoding deserves a closer look.
//!
use crate::parser::cursor::FieldStore;
use crate::parser::errors::{OpError, OpErrorKind, OpResult};
use crate::parser::transaction::Transaction;
use bitcoin_hashes::hex::ToHex;
use bitcoin_hashes::{sha256d, Hash};

/// SHA256 applied twice.
#[inline]
pub fn double_hash(bytes: &[u8]) -> [u8; 32] {
    sha256d::Hash::hash(bytes).into_inner()
}

/// Digests are stored little-endian and displayed reversed.
#[inline]
pub fn display_hash(digest: &[u8; 32]) -> [u8; 32] {
    let mut reversed = *digest;
    reversed.reverse();
    reversed
}

/// Hex of the reversed digest, the usual way to write txids and block hashes.
pub fn display_hex(digest: &[u8; 32]) -> String {
    display_hash(digest).to_hex()
}

///
/// Legacy preimage of one input and one output of `tx`:
///
/// version, input count, the chosen input (outpoint, script length,
/// scriptSig, sequence), output count, the chosen output (value,
/// script length, pkScript) and lock time, each as stored.
///
/// This is the single-input single-output simplification, not the
/// general signature hash.
///
pub fn legacy_signing_bytes<S: FieldStore>(
    tx: &Transaction<S>,
    input_index: usize,
    output_index: usize,
    buf: &[u8],
) -> OpResult<Vec<u8>> {
    let input = tx.inputs.get(input_index).ok_or_else(|| {
        OpError::new(OpErrorKind::IndexOutOfRange).join_msg(&format!(
            "input {} of {}",
            input_index,
            tx.inputs.len()
        ))
    })?;
    let output = tx.outputs.get(output_index).ok_or_else(|| {
        OpError::new(OpErrorKind::IndexOutOfRange).join_msg(&format!(
            "output {} of {}",
            output_index,
            tx.outputs.len()
        ))
    })?;

    let mut out = Vec::new();
    let mut push = |field: &S::Field| -> OpResult<()> {
        out.extend_from_slice(S::bytes(field, buf)?);
        Ok(())
    };
    push(&tx.version)?;
    push(&tx.n_inputs)?;
    input.emit(&mut push)?;
    push(&tx.n_outputs)?;
    output.emit(&mut push)?;
    push(&tx.lock_time)?;
    Ok(out)
}

///
/// Check a transaction against a txid known from elsewhere (a block
/// explorer, a node), given in display order.
///
/// For a non-segwit transaction with exactly one input and one output
/// the legacy preimage is the transaction itself, so its hash must be
/// the expected txid. Returns `None` for transactions of any other shape.
///
pub fn verify_legacy_txid<S: FieldStore>(
    tx: &Transaction<S>,
    buf: &[u8],
    expected: &[u8; 32],
) -> OpResult<Option<bool>> {
    if tx.is_segwit() || tx.n_inputs() != 1 || tx.n_outputs() != 1 {
        return Ok(None);
    }
    let preimage = legacy_signing_bytes(tx, 0, 0, buf)?;
    Ok(Some(display_hash(&double_hash(&preimage)) == *expected))
}
