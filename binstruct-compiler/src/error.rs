//! Errors raised while lowering a [`crate::spec::StructureDescription`] into a
//! [`binstruct_format::Program`].

use thiserror::Error;

/// A failure to compile a structure description.
///
/// Every variant names the field whose spec could not be lowered, so a caller can point a user
/// at the offending entry in their `StructureDescription` without re-walking it themselves.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CompileError {
    /// A `LenSpec::Var` named a field that either does not exist in the current structure level,
    /// or is declared at or after the referring field (forward references are not allowed).
    #[error("field {field:?} references unknown or forward field {reference:?}")]
    UnresolvedReference { field: String, reference: String },

    /// Two fields in the same structure level share a name.
    #[error("duplicate field name {name:?}")]
    DuplicateField { name: String },

    /// An integer or float read requested a bit width the interpreter cannot execute (not a
    /// multiple of 8, zero, or over 64 bits for integers / not 32-or-64 for floats).
    #[error("field {field:?} has invalid width {bits} bits")]
    InvalidWidth { field: String, bits: u8 },

    /// A `Match` field had zero branches.
    #[error("field {field:?} is a match with no branches")]
    EmptyMatch { field: String },
}
