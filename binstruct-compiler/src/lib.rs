//! # binstruct compiler
//!
//! Lowers a caller-built [`spec::StructureDescription`] into a `binstruct_format::Program`:
//! resolving named field references to positional indices, validating integer/float widths, and
//! rejecting duplicate names, forward references and empty `match` fields up front so the
//! interpreter never has to.

pub mod compile;
pub mod error;
pub mod spec;

pub use compile::Compiler;
pub use error::CompileError;
pub use spec::{FieldSpec, LenSpec, SeekModeSpec, StructureDescription};
