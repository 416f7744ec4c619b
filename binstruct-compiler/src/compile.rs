//! Lowers a [`StructureDescription`] to a [`Program`]: the single-pass algorithm that resolves
//! every symbolic [`LenSpec::Var`] to a positional [`Source::Ref`].

use binstruct_format::{Opcode, Program, SeekMode, Source};

use crate::error::CompileError;
use crate::spec::{FieldSpec, LenSpec, SeekModeSpec, StructureDescription};

/// Compiles structure descriptions to opcode programs.
///
/// Stateless between calls: all per-compilation bookkeeping (the names declared so far at the
/// current structure level) lives on the stack of `compile_level`'s recursion, not on `self`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Compiler;

impl Compiler {
    pub fn new() -> Self {
        Self
    }

    /// Compile a top-level (or nested) structure description into a [`Program`].
    pub fn compile(&self, description: &StructureDescription) -> Result<Program, CompileError> {
        compile_level(description)
    }
}

/// Compile one structure level: a list of `(name, FieldSpec)` pairs sharing one frame.
fn compile_level(description: &StructureDescription) -> Result<Program, CompileError> {
    log::debug!("compiling structure level with {} fields", description.len());
    let mut opcodes = Vec::with_capacity(description.len());
    let mut names: Vec<Option<String>> = Vec::with_capacity(description.len());

    for (name, field) in description {
        if names.iter().flatten().any(|n| n == name) {
            return Err(CompileError::DuplicateField { name: name.clone() });
        }
        let opcode = compile_field(name, field, &names)?;
        log::trace!("compiled field {name:?} at position {}", names.len());
        let declared_name = if opcode.is_anonymous() {
            None
        } else {
            Some(name.clone())
        };
        opcodes.push(opcode);
        names.push(declared_name);
    }

    Ok(Program::new(opcodes, names))
}

/// Compile a single field, resolving any `LenSpec`s it carries against `names_so_far` (the
/// fields already declared at this structure level, in order).
fn compile_field(
    field_name: &str,
    field: &FieldSpec,
    names_so_far: &[Option<String>],
) -> Result<Opcode, CompileError> {
    let opcode = match field {
        FieldSpec::Int { signed, bits, order } => {
            check_int_width(field_name, *bits)?;
            Opcode::IntRead {
                signed: *signed,
                bits: *bits,
                order: *order,
            }
        }
        FieldSpec::Float { bits, order } => {
            if *bits != 32 && *bits != 64 {
                return Err(CompileError::InvalidWidth {
                    field: field_name.to_string(),
                    bits: *bits,
                });
            }
            Opcode::FloatRead {
                bits: *bits,
                order: *order,
            }
        }
        FieldSpec::Bytes { length } => Opcode::BytesRead {
            length: resolve_source(field_name, length, names_so_far)?,
        },
        FieldSpec::Str { length, encoding } => Opcode::StringRead {
            length: resolve_source(field_name, length, names_so_far)?,
            encoding: encoding.clone(),
        },
        FieldSpec::Uvarint => Opcode::VarintRead,
        FieldSpec::Nested(inner) => Opcode::Nested(compile_level(inner)?),
        FieldSpec::List { count, element } => Opcode::List {
            count: resolve_source(field_name, count, names_so_far)?,
            element: Box::new(compile_field(field_name, element, names_so_far)?),
        },
        FieldSpec::Match {
            discriminant,
            branches,
        } => {
            if branches.is_empty() {
                return Err(CompileError::EmptyMatch {
                    field: field_name.to_string(),
                });
            }
            let discriminant = resolve_source(field_name, discriminant, names_so_far)?;
            let branches = branches
                .iter()
                .map(|b| compile_field(field_name, b, names_so_far))
                .collect::<Result<Vec<_>, _>>()?;
            Opcode::Match {
                discriminant,
                branches,
            }
        }
        FieldSpec::Peek(inner) => {
            Opcode::Peek(Box::new(compile_field(field_name, inner, names_so_far)?))
        }
        FieldSpec::Seek { offset, mode } => Opcode::Seek {
            offset: resolve_source(field_name, offset, names_so_far)?,
            mode: lower_seek_mode(*mode),
        },
        FieldSpec::Pos => Opcode::Pos,
        FieldSpec::Func { callable, args } => Opcode::FuncCall {
            callable: callable.clone(),
            args: args
                .iter()
                .map(|a| resolve_source(field_name, a, names_so_far))
                .collect::<Result<Vec<_>, _>>()?,
        },
        FieldSpec::Group(args) => Opcode::Group {
            args: args
                .iter()
                .map(|a| resolve_source(field_name, a, names_so_far))
                .collect::<Result<Vec<_>, _>>()?,
        },
    };
    Ok(opcode)
}

/// Resolve one `LenSpec` operand into its compiled `Source`, looking up `Var` names against
/// `names_so_far` only (enforcing the no-forward-references invariant by construction: a later
/// field's name simply isn't in this slice yet).
fn resolve_source(
    field_name: &str,
    spec: &LenSpec,
    names_so_far: &[Option<String>],
) -> Result<Source, CompileError> {
    match spec {
        LenSpec::Literal(v) => Ok(Source::Literal(*v)),
        LenSpec::Var(name) => names_so_far
            .iter()
            .position(|n| n.as_deref() == Some(name.as_str()))
            .map(Source::Ref)
            .ok_or_else(|| CompileError::UnresolvedReference {
                field: field_name.to_string(),
                reference: name.clone(),
            }),
        LenSpec::Inline(inner) => Ok(Source::Inline(Box::new(compile_field(
            field_name,
            inner,
            names_so_far,
        )?))),
    }
}

fn lower_seek_mode(mode: SeekModeSpec) -> SeekMode {
    match mode {
        SeekModeSpec::Absolute => SeekMode::Absolute,
        SeekModeSpec::Relative => SeekMode::Relative,
        SeekModeSpec::FromEnd => SeekMode::FromEnd,
    }
}

fn check_int_width(field_name: &str, bits: u8) -> Result<(), CompileError> {
    if bits == 0 || bits > 64 || bits % 8 != 0 {
        return Err(CompileError::InvalidWidth {
            field: field_name.to_string(),
            bits,
        });
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use binstruct_vm::{Context, Interpreter};

    fn run(description: &StructureDescription, data: &[u8]) -> binstruct_format::Record {
        let program = Compiler::new().compile(description).expect("compiles");
        let mut stream = binstruct_vm::SliceStream::new(data);
        let mut ctx = Context::new();
        Interpreter::new()
            .run(&program, &mut stream, &mut ctx)
            .expect("runs")
    }

    #[test]
    fn flat_record() {
        let description: StructureDescription = vec![
            ("magic".into(), FieldSpec::uint(16)),
            ("len".into(), FieldSpec::uint(8)),
            ("payload".into(), FieldSpec::bytes(LenSpec::var("len"))),
        ];
        let record = run(&description, &[0xca, 0xfe, 0x03, b'a', b'b', b'c']);
        assert_eq!(record.len(), 3);
    }

    #[test]
    fn unresolved_reference_is_rejected() {
        let description: StructureDescription = vec![(
            "payload".into(),
            FieldSpec::bytes(LenSpec::var("missing")),
        )];
        let err = Compiler::new().compile(&description).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedReference {
                field: "payload".into(),
                reference: "missing".into(),
            }
        );
    }

    #[test]
    fn forward_reference_is_rejected() {
        let description: StructureDescription = vec![
            ("payload".into(), FieldSpec::bytes(LenSpec::var("len"))),
            ("len".into(), FieldSpec::uint(8)),
        ];
        let err = Compiler::new().compile(&description).unwrap_err();
        assert_eq!(
            err,
            CompileError::UnresolvedReference {
                field: "payload".into(),
                reference: "len".into(),
            }
        );
    }

    #[test]
    fn duplicate_field_name_is_rejected() {
        let description: StructureDescription = vec![
            ("a".into(), FieldSpec::uint(8)),
            ("a".into(), FieldSpec::uint(8)),
        ];
        let err = Compiler::new().compile(&description).unwrap_err();
        assert_eq!(err, CompileError::DuplicateField { name: "a".into() });
    }

    #[test]
    fn invalid_width_is_rejected() {
        let description: StructureDescription =
            vec![("a".into(), FieldSpec::uint(13))];
        let err = Compiler::new().compile(&description).unwrap_err();
        assert_eq!(
            err,
            CompileError::InvalidWidth {
                field: "a".into(),
                bits: 13,
            }
        );
    }

    #[test]
    fn empty_match_is_rejected() {
        let description: StructureDescription = vec![(
            "tag".into(),
            FieldSpec::Match {
                discriminant: LenSpec::Literal(0),
                branches: vec![],
            },
        )];
        let err = Compiler::new().compile(&description).unwrap_err();
        assert_eq!(err, CompileError::EmptyMatch { field: "tag".into() });
    }

    #[test]
    fn seek_field_is_anonymous_in_names() {
        let description: StructureDescription = vec![
            (
                "skip".into(),
                FieldSpec::Seek {
                    offset: LenSpec::Literal(1),
                    mode: SeekModeSpec::Relative,
                },
            ),
            ("value".into(), FieldSpec::uint(8)),
        ];
        let program = Compiler::new().compile(&description).unwrap();
        assert_eq!(program.names, vec![None, Some("value".into())]);
    }

    #[test]
    fn list_element_resolves_against_outer_names() {
        let description: StructureDescription = vec![
            ("width".into(), FieldSpec::uint(8)),
            (
                "rows".into(),
                FieldSpec::List {
                    count: LenSpec::Literal(2),
                    element: Box::new(FieldSpec::bytes(LenSpec::var("width"))),
                },
            ),
        ];
        let record = run(&description, &[0x02, b'a', b'b', b'c', b'd']);
        assert_eq!(record.len(), 2);
    }
}
