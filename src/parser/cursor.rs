//!
//! Read position over a backing buffer, and the two ways of keeping what was read.
//!
//! Decoded structures are generic over a [`FieldStore`]:
//! - [`Eager`] copies every field out of the buffer into an owned `Vec<u8>`.
//! - [`Lazy`] only records the [`Span`] of every field, to be resolved
//!   later against the same buffer.
//!
//! Both strategies advance the cursor by exactly the same amount,
//! so the structural decoding does not depend on the strategy.
//!
use crate::parser::errors::{OpError, OpResult};
use crate::parser::varint::decode_varint;
use byteorder::{ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};
use std::convert::{Infallible, TryFrom};
use std::fmt::Debug;

/// Byte range `start..end` of a field inside its buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[inline]
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the bytes of this span from `buf`.
    ///
    /// Fails with `OffsetOutOfRange` when `buf` is not (or no longer)
    /// the buffer this span was recorded in.
    #[inline]
    pub fn resolve<'a>(&self, buf: &'a [u8]) -> OpResult<&'a [u8]> {
        buf.get(self.start..self.end)
            .ok_or_else(|| OpError::out_of_range(self.start, self.end, buf.len()))
    }
}

///
/// Storage strategy for decoded fields.
///
pub trait FieldStore: Sized + Send + Sync + 'static {
    type Field: Clone + Debug + PartialEq + Eq + Send + Sync;

    /// consume `n` bytes from the cursor and keep them in this strategy
    fn take(cursor: &mut FieldCursor<'_>, n: usize) -> OpResult<Self::Field>;

    /// the bytes of a field; `buf` is the buffer it was decoded from
    fn bytes<'a>(field: &'a Self::Field, buf: &'a [u8]) -> OpResult<&'a [u8]>;

    fn field_len(field: &Self::Field) -> usize;
}

/// Copy every field out of the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Eager;

/// Record only the offsets of every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lazy;

impl FieldStore for Eager {
    type Field = Vec<u8>;

    #[inline]
    fn take(cursor: &mut FieldCursor<'_>, n: usize) -> OpResult<Vec<u8>> {
        Ok(cursor.take_bytes(n)?.to_vec())
    }

    /// owned fields ignore `buf`
    #[inline]
    fn bytes<'a>(field: &'a Vec<u8>, _buf: &'a [u8]) -> OpResult<&'a [u8]> {
        Ok(field.as_slice())
    }

    #[inline]
    fn field_len(field: &Vec<u8>) -> usize {
        field.len()
    }
}

impl FieldStore for Lazy {
    type Field = Span;

    #[inline]
    fn take(cursor: &mut FieldCursor<'_>, n: usize) -> OpResult<Span> {
        cursor.take_offsets(n)
    }

    #[inline]
    fn bytes<'a>(field: &'a Span, buf: &'a [u8]) -> OpResult<&'a [u8]> {
        field.resolve(buf)
    }

    #[inline]
    fn field_len(field: &Span) -> usize {
        field.len()
    }
}

///
/// A read position inside a buffer.
///
/// A take that fails leaves the position unchanged.
///
#[derive(Debug, Clone, Copy)]
pub struct FieldCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        FieldCursor { buf, pos: 0 }
    }

    /// start reading at `pos`
    pub fn at(buf: &'a [u8], pos: usize) -> Self {
        FieldCursor { buf, pos }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.len().saturating_sub(self.pos)
    }

    #[inline]
    pub fn buffer(&self) -> &'a [u8] {
        self.buf
    }

    #[inline]
    fn ensure(&self, n: usize) -> OpResult<()> {
        if self.pos > self.buf.len() || self.remaining() < n {
            Err(OpError::truncated(self.pos, n, self.remaining()))
        } else {
            Ok(())
        }
    }

    /// Look at the next `n` bytes without consuming them.
    #[inline]
    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.buf.get(self.pos..self.pos.checked_add(n)?)
    }

    /// Consume `n` bytes and borrow them.
    pub fn take_bytes(&mut self, n: usize) -> OpResult<&'a [u8]> {
        self.ensure(n)?;
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    /// Consume `n` bytes and return where they are.
    pub fn take_offsets(&mut self, n: usize) -> OpResult<Span> {
        self.ensure(n)?;
        let span = Span {
            start: self.pos,
            end: self.pos + n,
        };
        self.pos += n;
        Ok(span)
    }

    #[inline]
    pub fn take<S: FieldStore>(&mut self, n: usize) -> OpResult<S::Field> {
        S::take(self, n)
    }

    /// Consume a compact-size integer, returning its value and its raw field.
    pub fn take_varint<S: FieldStore>(&mut self) -> OpResult<(u64, S::Field)> {
        let (value, width) = decode_varint(self.buf, self.pos)?;
        Ok((value, S::take(self, width)?))
    }

    /// Consume a field whose length was declared by the data itself.
    pub fn take_declared<S: FieldStore>(&mut self, len: u64) -> OpResult<S::Field> {
        match usize::try_from(len) {
            Ok(n) => S::take(self, n),
            Err(_) => Err(OpError::truncated(self.pos, usize::MAX, self.remaining())),
        }
    }

    /// Capacity to reserve for `count` declared items of at least `min_item` bytes.
    ///
    /// Counts come from the data, never reserve more than the rest of the buffer can hold.
    #[inline]
    pub fn capacity_for(&self, count: u64, min_item: usize) -> usize {
        let fit = self.remaining() / min_item.max(1);
        usize::try_from(count).map_or(fit, |c| c.min(fit))
    }
}

/// Copy a field out of `buf`.
#[inline]
pub(crate) fn own<S: FieldStore>(field: &S::Field, buf: &[u8]) -> OpResult<Vec<u8>> {
    Ok(S::bytes(field, buf)?.to_vec())
}

/// Unwrap the result of an operation on owned fields.
#[inline]
pub(crate) fn infallible<T>(result: Result<T, Infallible>) -> T {
    match result {
        Ok(value) => value,
        Err(never) => match never {},
    }
}

#[inline]
pub(crate) fn le_u32(bytes: &[u8]) -> u32 {
    LittleEndian::read_u32(bytes)
}

#[inline]
pub(crate) fn le_i32(bytes: &[u8]) -> i32 {
    LittleEndian::read_i32(bytes)
}

#[inline]
pub(crate) fn le_u64(bytes: &[u8]) -> u64 {
    LittleEndian::read_u64(bytes)
}

#[inline]
pub(crate) fn hash32(bytes: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    out
}

#[inline]
pub(crate) fn array4(bytes: &[u8]) -> [u8; 4] {
    let mut out = [0u8; 4];
    out.copy_from_slice(bytes);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: [u8; 8] = [1, 2, 3, 4, 0xfd, 0x02, 0x00, 9];

    #[test]
    fn test_take_advances_by_width() {
        let mut eager = FieldCursor::new(&DATA);
        let mut lazy = FieldCursor::new(&DATA);
        for n in [0usize, 1, 3].iter() {
            let before = eager.position();
            let bytes = eager.take::<Eager>(*n).unwrap();
            let span = lazy.take::<Lazy>(*n).unwrap();
            assert_eq!(eager.position(), before + n);
            assert_eq!(lazy.position(), eager.position());
            assert_eq!(span.resolve(&DATA).unwrap(), bytes.as_slice());
        }
    }

    #[test]
    fn test_take_varint() {
        let mut cursor = FieldCursor::at(&DATA, 4);
        let (value, field) = cursor.take_varint::<Lazy>().unwrap();
        assert_eq!(value, 2);
        assert_eq!(field, Span { start: 4, end: 7 });
        assert_eq!(cursor.position(), 7);
        assert_eq!(cursor.remaining(), 1);
    }

    #[test]
    fn test_failed_take_keeps_position() {
        let mut cursor = FieldCursor::at(&DATA, 6);
        assert!(cursor.take_bytes(3).unwrap_err().is_truncated());
        assert!(cursor.take_offsets(3).unwrap_err().is_truncated());
        assert_eq!(cursor.position(), 6);
        assert_eq!(cursor.take_bytes(2).unwrap(), &[0x00, 9]);
        assert_eq!(cursor.remaining(), 0);
    }

    #[test]
    fn test_declared_length_beyond_buffer() {
        let mut cursor = FieldCursor::new(&DATA);
        assert!(cursor.take_declared::<Eager>(u64::MAX).unwrap_err().is_truncated());
        assert!(cursor.take_declared::<Lazy>(9).unwrap_err().is_truncated());
        assert_eq!(cursor.position(), 0);
    }

    #[test]
    fn test_span_out_of_range() {
        let span = Span { start: 6, end: 10 };
        assert!(matches!(
            span.resolve(&DATA).unwrap_err().kind(),
            crate::parser::errors::OpErrorKind::OffsetOutOfRange
        ));
        assert_eq!(span.len(), 4);
    }

    #[test]
    fn test_start_past_end() {
        let mut cursor = FieldCursor::at(&DATA, DATA.len() + 4);
        assert!(cursor.take_bytes(0).unwrap_err().is_truncated());
        assert!(cursor.take_offsets(0).unwrap_err().is_truncated());
        assert!(cursor.take_varint::<Lazy>().unwrap_err().is_truncated());
        assert_eq!(cursor.position(), DATA.len() + 4);

        let mut at_end = FieldCursor::at(&DATA, DATA.len());
        assert_eq!(at_end.take_offsets(0).unwrap(), Span { start: 8, end: 8 });
    }

    #[test]
    fn test_capacity_is_bounded() {
        let cursor = FieldCursor::new(&DATA);
        assert_eq!(cursor.capacity_for(u64::MAX, 4), 2);
        assert_eq!(cursor.capacity_for(1, 4), 1);
    }

    #[test]
    fn test_peek() {
        let cursor = FieldCursor::at(&DATA, 7);
        assert_eq!(cursor.peek(1), Some(&DATA[7..]));
        assert_eq!(cursor.peek(2), None);
    }
}
