//! # binstruct
//!
//! A declarative binary-format parsing framework: describe a structure's fields once as a
//! [`binstruct_compiler::StructureDescription`], compile it to an opcode [`binstruct_format::Program`],
//! then run that program against any [`binstruct_vm::Stream`] to get back a
//! [`binstruct_format::Record`].
//!
//! ```no_run
//! use binstruct::{parse_struct, CompileTarget, Data, ParseOptions};
//! use binstruct_compiler::FieldSpec;
//!
//! let description = vec![
//!     ("magic".to_string(), FieldSpec::uint(16)),
//!     ("len".to_string(), FieldSpec::uint(8)),
//! ];
//! let record = parse_struct(
//!     CompileTarget::Description(description),
//!     Data::Slice(&[0xca, 0xfe, 0x00]),
//!     ParseOptions::default(),
//! )
//! .unwrap();
//! ```

use std::fs::File;

use binstruct_compiler::{CompileError, Compiler, StructureDescription};
use binstruct_format::{ByteOrder, Program, Record};
use binstruct_vm::{BufferedFileStream, ByteBufferStream, Context, Interpreter, SliceStream, Snapshot, Stream};

/// Either an uncompiled structure description or an already-compiled program.
///
/// Compiling an already-`Compiled` target is a type-level no-op: the `Compiled` arm is returned
/// unchanged rather than re-checked at run time.
pub enum CompileTarget {
    Description(StructureDescription),
    Compiled(Program),
}

/// Compile a structure description (or pass through an already-compiled program).
pub fn compile_struct(target: CompileTarget) -> Result<Program, CompileError> {
    match target {
        CompileTarget::Description(description) => Compiler::new().compile(&description),
        CompileTarget::Compiled(program) => Ok(program),
    }
}

/// The byte source to parse a structure from.
pub enum Data<'a> {
    /// An owned buffer, consumed by the parse.
    Buffer(Vec<u8>),
    /// A borrowed slice, parsed without copying.
    Slice(&'a [u8]),
    /// A file, read lazily through a buffered reader.
    File(File),
}

/// Builder for the options governing one `parse_struct` call.
///
/// Mirrors the chained-builder shape the underlying VM's host binary uses for its own execution
/// context: construct with defaults, then override only what you need.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    return_dict: bool,
    order: ByteOrder,
    encoding: String,
    float_order: Option<ByteOrder>,
    bytes_to_hex: bool,
    trace: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            return_dict: false,
            order: ByteOrder::Little,
            encoding: "utf-8".to_string(),
            float_order: None,
            bytes_to_hex: false,
            trace: false,
        }
    }
}

impl ParseOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select keyed-record output (default `false`; both settings return `Record::Keyed` when
    /// every field is named — this only documents the intended access style).
    pub fn with_return_dict(mut self, return_dict: bool) -> Self {
        self.return_dict = return_dict;
        self
    }

    /// Default integer byte order (default little-endian).
    pub fn with_order(mut self, order: ByteOrder) -> Self {
        self.order = order;
        self
    }

    /// Default string decoding (default `"utf-8"`).
    pub fn with_encoding(mut self, encoding: impl Into<String>) -> Self {
        self.encoding = encoding.into();
        self
    }

    /// Float byte order override; when unset, derived from `order`.
    pub fn with_float_order(mut self, order: ByteOrder) -> Self {
        self.float_order = Some(order);
        self
    }

    /// Render raw-byte fields as lowercase hex strings (default `false`).
    pub fn with_bytes_to_hex(mut self, bytes_to_hex: bool) -> Self {
        self.bytes_to_hex = bytes_to_hex;
        self
    }

    /// Collect an execution trace alongside the result (default `false`).
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }
}

/// The result of a traced parse: the record plus the opcode-by-opcode trace.
#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub record: Record,
    pub trace: Vec<Snapshot>,
}

/// Errors a `parse_struct` call can fail with, unifying the compile and runtime error domains.
#[derive(Debug, thiserror::Error)]
pub enum BinStructError {
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] binstruct_vm::Error),
    #[error("could not read input file: {0}")]
    Io(#[from] std::io::Error),
}

fn context_from_options(options: &ParseOptions) -> Context {
    let mut ctx = Context::new();
    ctx.default_byte_order = options.order;
    ctx.default_float_order = options.float_order.unwrap_or(options.order);
    ctx.default_encoding = options.encoding.clone();
    ctx.bytes_as_hex = options.bytes_to_hex;
    ctx
}

fn run_with_stream(
    program: &Program,
    stream: &mut dyn Stream,
    options: &ParseOptions,
) -> Result<ParseOutcome, BinStructError> {
    let mut ctx = context_from_options(options);
    let interpreter = if options.trace {
        Interpreter::new().with_trace()
    } else {
        Interpreter::new()
    };
    let (record, trace) = interpreter.run_traced(program, stream, &mut ctx)?;
    Ok(ParseOutcome { record, trace })
}

/// Compile (if needed) and run a structure description against a byte source.
///
/// This is the engine's primary entry point. A fresh `Context` is constructed for this call only
/// and discarded on return; no state survives between independent calls.
pub fn parse_struct(
    target: CompileTarget,
    data: Data<'_>,
    options: ParseOptions,
) -> Result<Record, BinStructError> {
    Ok(parse_struct_traced(target, data, options)?.record)
}

/// Like [`parse_struct`], always returning the execution trace (empty unless
/// [`ParseOptions::with_trace`] was set).
pub fn parse_struct_traced(
    target: CompileTarget,
    data: Data<'_>,
    options: ParseOptions,
) -> Result<ParseOutcome, BinStructError> {
    let program = compile_struct(target)?;
    match data {
        Data::Buffer(buffer) => {
            let mut stream = ByteBufferStream::new(buffer);
            run_with_stream(&program, &mut stream, &options)
        }
        Data::Slice(slice) => {
            let mut stream = SliceStream::new(slice);
            run_with_stream(&program, &mut stream, &options)
        }
        Data::File(file) => {
            let mut stream = BufferedFileStream::open(file)?;
            run_with_stream(&program, &mut stream, &options)
        }
    }
}

/// Open `path` and wrap it as [`Data::File`], for callers who only have a path.
pub fn open_file(path: impl AsRef<std::path::Path>) -> std::io::Result<Data<'static>> {
    Ok(Data::File(File::open(path)?))
}

#[cfg(test)]
mod test {
    use super::*;
    use binstruct_compiler::{FieldSpec, LenSpec};

    fn sample_description() -> StructureDescription {
        vec![
            ("magic".to_string(), FieldSpec::uint(16)),
            ("len".to_string(), FieldSpec::uint(8)),
            (
                "payload".to_string(),
                FieldSpec::bytes(LenSpec::var("len")),
            ),
        ]
    }

    #[test]
    fn parses_from_slice() {
        let data = [0xca, 0xfe, 0x03, b'a', b'b', b'c'];
        let record = parse_struct(
            CompileTarget::Description(sample_description()),
            Data::Slice(&data),
            ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(record.get("magic"), Some(&binstruct_format::Value::UInt(0xfeca)));
    }

    #[test]
    fn precompiled_target_skips_recompilation() {
        let program = compile_struct(CompileTarget::Description(sample_description())).unwrap();
        let data = [0xca, 0xfe, 0x01, b'x'];
        let record = parse_struct(
            CompileTarget::Compiled(program),
            Data::Slice(&data),
            ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(
            record.get("payload"),
            Some(&binstruct_format::Value::Bytes(vec![b'x']))
        );
    }

    #[test]
    fn trace_is_collected_when_requested() {
        let data = [0xca, 0xfe, 0x00];
        let outcome = parse_struct_traced(
            CompileTarget::Description(sample_description()),
            Data::Slice(&data),
            ParseOptions::default().with_trace(),
        )
        .unwrap();
        assert_eq!(outcome.trace.len(), 3);
    }

    #[test]
    fn big_endian_order_applies_to_unannotated_fields() {
        let data = [0xca, 0xfe, 0x00];
        let record = parse_struct(
            CompileTarget::Description(sample_description()),
            Data::Slice(&data),
            ParseOptions::default().with_order(ByteOrder::Big),
        )
        .unwrap();
        assert_eq!(record.get("magic"), Some(&binstruct_format::Value::UInt(0xcafe)));
    }
}
