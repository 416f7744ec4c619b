//! Interpreter runtime errors.

use std::fmt::{self, Display, Formatter};

/// A result type specialized to runtime errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of runtime error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// The stream ran out of bytes before the requested read could complete.
    UnexpectedEnd { requested: usize, available: usize },
    /// A length/count source evaluated to something other than a non-negative integer.
    InvalidLength,
    /// A `Match` discriminant selected a branch index outside the opcode's branch list.
    NoMatch { discriminant: i64, branches: usize },
    /// A string field's bytes could not be decoded under the requested (or default) encoding.
    DecodeError { encoding: String },
    /// A `FuncCall` callable returned an error.
    CallbackError(String),
    /// A `Seek` request moved the cursor outside the stream, or used an unsupported mode for the
    /// underlying stream implementation.
    InvalidSeek,
    /// An LEB128 varint read more than 10 continuation bytes without terminating.
    MalformedVarint,
    /// An opcode carried a value the compiler should never have produced (e.g. an integer width
    /// outside 1..=64 bits), surfaced defensively rather than causing undefined behavior.
    ProgramError(String),
    /// The underlying I/O source (e.g. a file-backed stream) failed.
    Io(String),
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnexpectedEnd {
                requested,
                available,
            } => write!(
                f,
                "unexpected end of stream: requested {requested} bytes, {available} available"
            ),
            Self::InvalidLength => write!(f, "length/count source did not evaluate to a non-negative integer"),
            Self::NoMatch {
                discriminant,
                branches,
            } => write!(f, "discriminant {discriminant} has no branch (of {branches})"),
            Self::DecodeError { encoding } => write!(f, "could not decode bytes as {encoding}"),
            Self::CallbackError(msg) => write!(f, "callback error: {msg}"),
            Self::InvalidSeek => write!(f, "seek target is out of bounds"),
            Self::MalformedVarint => write!(f, "malformed varint"),
            Self::ProgramError(msg) => write!(f, "invalid program: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
        }
    }
}

/// An error raised while interpreting a program against a stream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "{kind}{}{}",
    field.as_ref().map(|f| format!(" (field {f:?})")).unwrap_or_default(),
    offset.map(|o| format!(" at offset {o}")).unwrap_or_default()
)]
pub struct Error {
    pub(crate) kind: ErrorKind,
    /// The name of the field being parsed when the error occurred, if any (anonymous opcodes
    /// such as `Seek` carry no name).
    pub(crate) field: Option<String>,
    /// The stream offset at which the error occurred, when known.
    pub(crate) offset: Option<u64>,
}

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            field: None,
            offset: None,
        }
    }

    /// Attaches a field name, unless one is already attached — the innermost `run_level` to
    /// touch this error (i.e. the one closest to where it was raised) wins, so a failure inside a
    /// `Nested` sub-structure keeps that sub-structure's field name rather than the enclosing
    /// field's.
    pub(crate) fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = self.field.or_else(|| Some(field.into()));
        self
    }

    /// Attaches a stream offset, unless one is already attached. See `with_field`.
    pub(crate) fn with_offset(mut self, offset: u64) -> Self {
        self.offset = self.offset.or(Some(offset));
        self
    }

    /// The category of this error.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// The name of the field being parsed when this error occurred, if any.
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// The stream offset at which this error occurred, when known.
    pub fn offset(&self) -> Option<u64> {
        self.offset
    }
}
