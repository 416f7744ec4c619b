//! The compiled instruction set.
//!
//! Where the teacher's bytecode was a flat tape of fixed-width `Instruction`s, a structure
//! description compiles to a *tree* of `Opcode`s: a `Nested` or `List` opcode embeds an entire
//! sub-`Program`, and several opcodes take nested opcodes as operands (`Peek`, `Match`'s
//! branches). The compiler (`binstruct-compiler`) builds this tree once; the interpreter
//! (`binstruct-vm`) only ever walks it, never mutates it.

use std::fmt::{self, Debug, Formatter};
use std::sync::Arc;

use crate::value::{ByteOrder, Value};
use crate::SeekMode;

/// A caller-provided function invoked by `FuncCall`.
///
/// Modeled as a capability-typed function reference rather than a named registry lookup: the
/// compiler captures the `Arc` directly into the opcode tree, so the interpreter never needs to
/// resolve a name back to a function at run time.
pub type Callable = Arc<dyn Fn(&[Value]) -> Result<Value, String> + Send + Sync>;

/// A value producer for an opcode's length/count/discriminant/offset/argument parameter.
///
/// This is the compiled counterpart of `binstruct_compiler::spec::LenSpec`: the compiler
/// resolves every symbolic `LenSpec::Var` reference to a `Source::Ref(usize)` positional index,
/// so the interpreter never performs a name lookup.
#[derive(Clone)]
pub enum Source {
    /// A compile-time constant.
    Literal(i64),
    /// A positional back-reference into the current frame's captured values.
    ///
    /// Always strictly less than the referring opcode's own position (enforced at compile time).
    Ref(usize),
    /// An opcode executed inline, purely to produce this operand's value (used by `Peek`'s
    /// typical usage of reading one field and reusing it, and by any field that must derive a
    /// length from something other than a previously-named field).
    Inline(Box<Opcode>),
}

impl Debug for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Source::Literal(v) => write!(f, "Literal({v})"),
            Source::Ref(idx) => write!(f, "Ref({idx})"),
            Source::Inline(op) => write!(f, "Inline({op:?})"),
        }
    }
}

/// One compiled instruction.
#[derive(Clone)]
pub enum Opcode {
    /// Read a signed or unsigned integer of `bits` width (a multiple of 8, at most 64).
    IntRead {
        signed: bool,
        bits: u8,
        order: Option<ByteOrder>,
    },
    /// Read an IEEE-754 float of `bits` width (32 or 64).
    FloatRead { bits: u8, order: Option<ByteOrder> },
    /// Read `length` raw bytes (hex-encoded into a `Value::Str` when the context's
    /// `bytes_as_hex` flag is set, else a `Value::Bytes`).
    BytesRead { length: Source },
    /// Read `length` bytes and decode them with `encoding` (or the context default).
    StringRead {
        length: Source,
        encoding: Option<String>,
    },
    /// Read an unsigned LEB128 varint.
    VarintRead,
    /// Push a fresh frame, run the embedded program, pop the frame, capture the result as a
    /// `Value::Record`.
    Nested(Program),
    /// Evaluate `count`, then execute `element` that many times in the current frame; capture
    /// the results as a `Value::List`.
    List { count: Source, element: Box<Opcode> },
    /// Evaluate `discriminant`, then execute `branches[discriminant]` (0-based); capture its
    /// value as this opcode's value.
    Match {
        discriminant: Source,
        branches: Vec<Opcode>,
    },
    /// Record the stream position, run `inner`, then restore the position; capture `inner`'s
    /// value.
    Peek(Box<Opcode>),
    /// Move the stream cursor by `offset` per `mode`. Anonymous: produces no named value.
    Seek { offset: Source, mode: SeekMode },
    /// Capture the current stream position as a `Value::UInt`.
    Pos,
    /// Evaluate each of `args` in order, invoke `callable` with them, capture its return value.
    FuncCall { callable: Callable, args: Vec<Source> },
    /// Evaluate each of `args` in order; capture as a `Value::List` (a positional tuple used to
    /// pass several sources as one `FuncCall` argument).
    Group { args: Vec<Source> },
}

impl Debug for Opcode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Opcode::IntRead { signed, bits, order } => f
                .debug_struct("IntRead")
                .field("signed", signed)
                .field("bits", bits)
                .field("order", order)
                .finish(),
            Opcode::FloatRead { bits, order } => f
                .debug_struct("FloatRead")
                .field("bits", bits)
                .field("order", order)
                .finish(),
            Opcode::BytesRead { length } => {
                f.debug_struct("BytesRead").field("length", length).finish()
            }
            Opcode::StringRead { length, encoding } => f
                .debug_struct("StringRead")
                .field("length", length)
                .field("encoding", encoding)
                .finish(),
            Opcode::VarintRead => write!(f, "VarintRead"),
            Opcode::Nested(program) => f.debug_tuple("Nested").field(program).finish(),
            Opcode::List { count, element } => f
                .debug_struct("List")
                .field("count", count)
                .field("element", element)
                .finish(),
            Opcode::Match {
                discriminant,
                branches,
            } => f
                .debug_struct("Match")
                .field("discriminant", discriminant)
                .field("branches", branches)
                .finish(),
            Opcode::Peek(inner) => f.debug_tuple("Peek").field(inner).finish(),
            Opcode::Seek { offset, mode } => f
                .debug_struct("Seek")
                .field("offset", offset)
                .field("mode", mode)
                .finish(),
            Opcode::Pos => write!(f, "Pos"),
            Opcode::FuncCall { args, .. } => f.debug_struct("FuncCall").field("args", args).finish(),
            Opcode::Group { args } => f.debug_struct("Group").field("args", args).finish(),
        }
    }
}

impl Opcode {
    /// Whether this opcode produces no captured value (only `Seek`, today).
    pub fn is_anonymous(&self) -> bool {
        matches!(self, Opcode::Seek { .. })
    }
}

/// A compiled, immutable opcode program with a parallel name list.
///
/// `Program.opcodes[i]` and `Program.names[i]` describe the same field; `names[i]` is `None`
/// exactly when `opcodes[i].is_anonymous()`.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub opcodes: Vec<Opcode>,
    pub names: Vec<Option<String>>,
}

impl Program {
    pub fn new(opcodes: Vec<Opcode>, names: Vec<Option<String>>) -> Self {
        debug_assert_eq!(opcodes.len(), names.len());
        Self { opcodes, names }
    }

    /// Number of program slots (including anonymous ones).
    pub fn len(&self) -> usize {
        self.opcodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.opcodes.is_empty()
    }

    /// Find the declared position of `name` within this program, searching only positions
    /// strictly before `before` (used by the compiler to enforce the no-forward-references
    /// invariant; interpreters never call this).
    pub fn position_of(&self, name: &str, before: usize) -> Option<usize> {
        self.names[..before]
            .iter()
            .position(|n| n.as_deref() == Some(name))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn anonymous_opcode() {
        let seek = Opcode::Seek {
            offset: Source::Literal(4),
            mode: SeekMode::Absolute,
        };
        assert!(seek.is_anonymous());
        assert!(!Opcode::Pos.is_anonymous());
    }

    #[test]
    fn program_position_of_respects_before() {
        let program = Program::new(
            vec![Opcode::Pos, Opcode::Pos, Opcode::Pos],
            vec![Some("a".into()), Some("b".into()), Some("a".into())],
        );
        assert_eq!(program.position_of("a", 3), Some(0));
        assert_eq!(program.position_of("a", 1), None);
        assert_eq!(program.position_of("b", 2), Some(1));
        assert_eq!(program.position_of("missing", 3), None);
    }
}
