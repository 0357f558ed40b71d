use std::convert::From;
use std::error::Error;
use std::fmt;
use std::io;

pub type OpResult<T> = Result<T, OpError>;

#[derive(Debug)]
pub struct OpError {
    kind: OpErrorKind,
    message: String,
}

impl OpError {
    pub fn new(kind: OpErrorKind) -> Self {
        OpError {
            kind,
            message: String::new(),
        }
    }

    /// append a message to this error
    pub fn join_msg(mut self, msg: &str) -> Self {
        if !self.message.is_empty() {
            self.message.push_str("; ");
        }
        self.message.push_str(msg);
        self
    }

    pub fn kind(&self) -> &OpErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    #[inline]
    pub fn is_truncated(&self) -> bool {
        matches!(self.kind, OpErrorKind::TruncatedInput)
    }

    /// fewer bytes than required remain at `offset`
    #[inline]
    pub(crate) fn truncated(offset: usize, needed: usize, available: usize) -> Self {
        OpError::new(OpErrorKind::TruncatedInput).join_msg(&format!(
            "need {} bytes at offset {}, {} available",
            needed, offset, available
        ))
    }

    #[inline]
    pub(crate) fn out_of_range(start: usize, end: usize, len: usize) -> Self {
        OpError::new(OpErrorKind::OffsetOutOfRange).join_msg(&format!(
            "span {}..{} outside buffer of {} bytes",
            start, end, len
        ))
    }
}

#[derive(Debug)]
pub enum OpErrorKind {
    /// a field declares more bytes than remain in the buffer
    TruncatedInput,
    /// a lazy span was resolved against a buffer that does not contain it
    OffsetOutOfRange,
    IndexOutOfRange,
    IOError(io::Error),
    RuntimeError,
}

impl fmt::Display for OpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpErrorKind::TruncatedInput => write!(f, "truncated input"),
            OpErrorKind::OffsetOutOfRange => write!(f, "offset out of range"),
            OpErrorKind::IndexOutOfRange => write!(f, "index out of range"),
            OpErrorKind::IOError(e) => write!(f, "io error: {}", e),
            OpErrorKind::RuntimeError => write!(f, "runtime error"),
        }
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

impl Error for OpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            OpErrorKind::IOError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for OpError {
    fn from(err: io::Error) -> Self {
        OpError::new(OpErrorKind::IOError(err))
    }
}

impl From<&str> for OpError {
    fn from(msg: &str) -> Self {
        OpError::new(OpErrorKind::RuntimeError).join_msg(msg)
    }
}
