//! # binstruct format
//!
//! This crate provides the shared vocabulary between the compiler and the interpreter: the
//! dynamically-typed [`Value`]/[`Record`] result model, the [`Opcode`] instruction set a compiled
//! [`Program`] is made of, and the [`Source`] operand sum type opcodes use for their
//! length/count/discriminant/offset parameters.
//!
//! This crate defines shapes, not behavior: it does not compile field layouts (see
//! `binstruct-compiler`) and does not execute programs (see `binstruct-vm`).

pub mod opcode;
pub mod value;

pub use opcode::{Callable, Opcode, Program, Source};
pub use value::{ByteOrder, Record, Value};

/// How a [`crate::opcode::Opcode::Seek`] (or a public-entry seek request) interprets its offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekMode {
    /// Offset is measured from the start of the stream.
    Absolute,
    /// Offset is measured from the current position.
    Relative,
    /// Offset is measured from the end of the stream.
    FromEnd,
}

impl SeekMode {
    /// Decode a seek mode from the mode number used throughout the specification (0 = absolute,
    /// 1 = relative, 2 = from end).
    pub fn from_u8(mode: u8) -> Option<Self> {
        match mode {
            0 => Some(Self::Absolute),
            1 => Some(Self::Relative),
            2 => Some(Self::FromEnd),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn seek_mode_from_u8() {
        assert_eq!(SeekMode::from_u8(0), Some(SeekMode::Absolute));
        assert_eq!(SeekMode::from_u8(1), Some(SeekMode::Relative));
        assert_eq!(SeekMode::from_u8(2), Some(SeekMode::FromEnd));
        assert_eq!(SeekMode::from_u8(3), None);
    }
}
