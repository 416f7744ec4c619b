//! Execution traces for debugging a parse.

use std::fmt::{self, Display, Formatter};

/// A snapshot of one opcode's execution.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// The opcode's position within its program.
    pub program_counter: usize,

    /// The field's declared name, or `None` for an anonymous opcode (`Seek`).
    pub field_name: Option<String>,

    /// Stream offset immediately before this opcode ran.
    pub offset_before: u64,

    /// Stream offset immediately after this opcode ran.
    pub offset_after: u64,

    /// This opcode's kind, as a short label (`"IntRead"`, `"Nested"`, ...).
    pub opcode: &'static str,
}

impl Display for Snapshot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = self.field_name.as_deref().unwrap_or("_");
        write!(
            f,
            "pc {:3} {:<10} {:<16} {:>6} -> {:<6}",
            self.program_counter, self.opcode, name, self.offset_before, self.offset_after
        )
    }
}

/// Render a full trace, one line per snapshot.
pub fn format_trace<W: fmt::Write>(stream: &mut W, trace: &[Snapshot]) -> fmt::Result {
    let mut first = true;
    for snapshot in trace {
        if !first {
            writeln!(stream)?;
        } else {
            first = false;
        }
        write!(stream, "{snapshot}")?;
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn snapshot_display_uses_placeholder_for_anonymous() {
        let snapshot = Snapshot {
            program_counter: 0,
            field_name: None,
            offset_before: 0,
            offset_after: 4,
            opcode: "Seek",
        };
        assert!(snapshot.to_string().contains('_'));
    }

    #[test]
    fn format_trace_joins_with_newlines() {
        let trace = vec![
            Snapshot {
                program_counter: 0,
                field_name: Some("a".into()),
                offset_before: 0,
                offset_after: 2,
                opcode: "IntRead",
            },
            Snapshot {
                program_counter: 1,
                field_name: Some("b".into()),
                offset_before: 2,
                offset_after: 4,
                opcode: "IntRead",
            },
        ];
        let mut out = String::new();
        format_trace(&mut out, &trace).unwrap();
        assert_eq!(out.lines().count(), 2);
    }
}
