//! The dynamically-typed result model: [`Value`] and the two output shapes it can be gathered
//! into, [`Record::Keyed`] and [`Record::Tuple`].

use std::fmt::{self, Display, Formatter};

/// Default integer/float byte order, and the override a single field can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    Little,
    Big,
}

/// A value captured while parsing a structure.
///
/// This stands in for the dynamic typing of the original design: every reader produces a
/// `Value`, and `Value` carries no notion of "the type the caller expected" — that is the
/// caller's concern, not the engine's.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of an unsigned integer read, or a captured stream position (`Pos`).
    UInt(u64),
    /// Result of a signed integer read.
    Int(i64),
    /// Result of a float read, widened to `f64` regardless of source width.
    Float(f64),
    /// Result of a raw-bytes read with `bytes_as_hex` unset.
    Bytes(Vec<u8>),
    /// Result of a string read, or a raw-bytes read with `bytes_as_hex` set.
    Str(String),
    /// Result of a `List` opcode.
    List(Vec<Value>),
    /// Result of a `Nested` opcode.
    Record(Record),
}

impl Value {
    /// Interpret this value as a non-negative length/count/offset, per the engine's rule that
    /// references used as lengths must evaluate to a non-negative integer.
    ///
    /// Returns `None` if this value is not an integer, or is a negative `Int`.
    pub fn as_length(&self) -> Option<i64> {
        match self {
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Int(v) if *v >= 0 => Some(*v),
            _ => None,
        }
    }

    /// Interpret this value as a `Match` discriminant: any integer, signed or unsigned.
    ///
    /// Returns `None` if this value is not an integer.
    pub fn as_discriminant(&self) -> Option<i64> {
        match self {
            Value::UInt(v) => i64::try_from(*v).ok(),
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::UInt(v) => write!(f, "{v}"),
            Value::Int(v) => write!(f, "{v}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bytes(b) => write!(f, "{b:02x?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Record(r) => write!(f, "{r}"),
        }
    }
}

/// The output of parsing one structure level: either a name-value mapping, or a bare tuple.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    /// One `(name, value)` pair per non-anonymous field, in declared order.
    Keyed(Vec<(String, Value)>),
    /// The ordered sequence of non-anonymous values, with names discarded.
    Tuple(Vec<Value>),
}

impl Record {
    /// Look up a field by name in a keyed record.
    ///
    /// Returns `None` for a `Tuple` record, or if no field with this name was captured.
    pub fn get(&self, name: &str) -> Option<&Value> {
        match self {
            Record::Keyed(pairs) => pairs.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            Record::Tuple(_) => None,
        }
    }

    /// Get the value at a positional index, for either record shape.
    pub fn get_pos(&self, index: usize) -> Option<&Value> {
        match self {
            Record::Keyed(pairs) => pairs.get(index).map(|(_, v)| v),
            Record::Tuple(values) => values.get(index),
        }
    }

    /// Iterate the `(name, value)` pairs of a keyed record, in declared order.
    ///
    /// Yields nothing for a `Tuple` record.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        let pairs: &[(String, Value)] = match self {
            Record::Keyed(pairs) => pairs,
            Record::Tuple(_) => &[],
        };
        pairs.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of captured values.
    pub fn len(&self) -> usize {
        match self {
            Record::Keyed(pairs) => pairs.len(),
            Record::Tuple(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Record::Keyed(pairs) => {
                write!(f, "{{")?;
                for (i, (name, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {value}")?;
                }
                write!(f, "}}")
            }
            Record::Tuple(values) => {
                write!(f, "(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{value}")?;
                }
                write!(f, ")")
            }
        }
    }
}
