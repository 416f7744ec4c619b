//! The caller-facing, pre-compilation structure description.
//!
//! This is the uncompiled counterpart of `binstruct_format::Opcode`: a [`FieldSpec`] names its
//! length/count/discriminant/offset operands symbolically (`LenSpec::Var`), whereas the compiled
//! `Opcode` names them positionally (`Source::Ref`). [`crate::compile::Compiler`] performs
//! exactly that substitution.

use binstruct_format::{ByteOrder, Callable};

/// An ordered, named list of fields describing one structure level.
///
/// Names must be unique within a single `StructureDescription`; the compiler rejects a
/// duplicate name with [`crate::error::CompileError::DuplicateField`].
pub type StructureDescription = Vec<(String, FieldSpec)>;

/// A value producer for a field's length/count/discriminant/offset parameter, in its
/// pre-compilation, symbolic form.
#[derive(Clone)]
pub enum LenSpec {
    /// A compile-time constant.
    Literal(i64),
    /// A reference to an earlier field in the same structure level, by name.
    Var(String),
    /// A field spec evaluated inline, purely to produce this operand's value.
    Inline(Box<FieldSpec>),
}

impl LenSpec {
    /// Shorthand for `LenSpec::Var(name.into())`.
    pub fn var(name: impl Into<String>) -> Self {
        Self::Var(name.into())
    }
}

impl From<i64> for LenSpec {
    fn from(value: i64) -> Self {
        Self::Literal(value)
    }
}

/// One field's reader specification, in its pre-compilation, symbolic form.
#[derive(Clone)]
pub enum FieldSpec {
    /// Read a signed or unsigned integer of `bits` width.
    Int {
        signed: bool,
        bits: u8,
        order: Option<ByteOrder>,
    },
    /// Read an IEEE-754 float of `bits` width (32 or 64).
    Float { bits: u8, order: Option<ByteOrder> },
    /// Read `length` raw bytes.
    Bytes { length: LenSpec },
    /// Read `length` bytes and decode with `encoding` (or the context default).
    Str {
        length: LenSpec,
        encoding: Option<String>,
    },
    /// Read an unsigned LEB128 varint.
    Uvarint,
    /// A nested structure.
    Nested(StructureDescription),
    /// Read `element` `count` times.
    List {
        count: LenSpec,
        element: Box<FieldSpec>,
    },
    /// Select one of `branches` by evaluating `discriminant` as a 0-based index.
    Match {
        discriminant: LenSpec,
        branches: Vec<FieldSpec>,
    },
    /// Run `inner`, capture its value, then restore the stream position.
    Peek(Box<FieldSpec>),
    /// Move the stream cursor; produces no captured value.
    Seek { offset: LenSpec, mode: SeekModeSpec },
    /// Capture the current stream position.
    Pos,
    /// Invoke `callable` with the evaluated `args`.
    Func {
        callable: Callable,
        args: Vec<LenSpec>,
    },
    /// Capture a positional tuple of the evaluated `args` (used as a `Func` argument).
    Group(Vec<LenSpec>),
}

/// The pre-compilation form of [`binstruct_format::SeekMode`] (kept distinct so this crate
/// doesn't need to depend on the VM's notion of a live stream).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekModeSpec {
    Absolute,
    Relative,
    FromEnd,
}

impl FieldSpec {
    /// Shorthand for an unsigned integer field with the context's default byte order.
    pub fn uint(bits: u8) -> Self {
        Self::Int {
            signed: false,
            bits,
            order: None,
        }
    }

    /// Shorthand for a signed integer field with the context's default byte order.
    pub fn int(bits: u8) -> Self {
        Self::Int {
            signed: true,
            bits,
            order: None,
        }
    }

    /// Shorthand for a raw-bytes field of a literal length.
    pub fn bytes(length: impl Into<LenSpec>) -> Self {
        Self::Bytes {
            length: length.into(),
        }
    }

    /// Shorthand for a string field of a literal length, using the context's default encoding.
    pub fn string(length: impl Into<LenSpec>) -> Self {
        Self::Str {
            length: length.into(),
            encoding: None,
        }
    }
}
