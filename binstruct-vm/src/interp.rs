//! Executes a compiled [`Program`] against a [`Stream`] and [`Context`].

use binstruct_format::{ByteOrder, Opcode, Program, Record, SeekMode, Source, Value};

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::stream::Stream;
use crate::trace::Snapshot;

/// Walks an opcode tree, reading from a stream and accumulating captured values in a context.
///
/// Stateless between runs: `run` takes the program, stream and context as arguments rather than
/// owning them, so one `Interpreter` can be reused (or simply constructed fresh each call, as the
/// top-level crate does).
#[derive(Debug, Default, Clone, Copy)]
pub struct Interpreter {
    trace: bool,
}

impl Interpreter {
    pub fn new() -> Self {
        Self { trace: false }
    }

    /// Collect an execution trace (one [`Snapshot`] per opcode) alongside the result.
    pub fn with_trace(mut self) -> Self {
        self.trace = true;
        self
    }

    /// Execute `program` against `stream`, using and mutating `ctx`, and return the resulting
    /// record.
    pub fn run(&self, program: &Program, stream: &mut dyn Stream, ctx: &mut Context) -> Result<Record> {
        let (record, _trace) = self.run_traced(program, stream, ctx)?;
        Ok(record)
    }

    /// Like [`Self::run`], additionally returning the execution trace (empty unless
    /// [`Self::with_trace`] was set).
    pub fn run_traced(
        &self,
        program: &Program,
        stream: &mut dyn Stream,
        ctx: &mut Context,
    ) -> Result<(Record, Vec<Snapshot>)> {
        let mut trace = Vec::new();
        self.run_level(program, stream, ctx, &mut trace)?;
        let frame = ctx.pop_frame();
        ctx.push_frame();
        let record = build_record(program, &frame.values);
        Ok((record, trace))
    }

    /// Execute one structure level's opcodes into the current frame.
    fn run_level(
        &self,
        program: &Program,
        stream: &mut dyn Stream,
        ctx: &mut Context,
        trace: &mut Vec<Snapshot>,
    ) -> Result<()> {
        for (index, opcode) in program.opcodes.iter().enumerate() {
            let name = program.names[index].clone();
            let offset_before = stream.tell();
            log::trace!(
                "field {:?} ({}) at offset {offset_before}",
                name.as_deref().unwrap_or("_"),
                opcode_label(opcode)
            );
            let value = self
                .exec(opcode, stream, ctx, trace)
                .map_err(|err| attach(err, name.clone(), offset_before))?;
            if self.trace {
                trace.push(Snapshot {
                    program_counter: index,
                    field_name: name.clone(),
                    offset_before,
                    offset_after: stream.tell(),
                    opcode: opcode_label(opcode),
                });
            }
            ctx.push_value(value);
        }
        Ok(())
    }

    fn exec(
        &self,
        opcode: &Opcode,
        stream: &mut dyn Stream,
        ctx: &mut Context,
        trace: &mut Vec<Snapshot>,
    ) -> Result<Value> {
        match opcode {
            Opcode::IntRead { signed, bits, order } => {
                read_int(stream, *signed, *bits, order.unwrap_or(ctx.default_byte_order))
            }
            Opcode::FloatRead { bits, order } => {
                read_float(stream, *bits, order.unwrap_or(ctx.default_float_order))
            }
            Opcode::BytesRead { length } => {
                let len = self.eval_length(length, stream, ctx, trace)?;
                let bytes = stream.read(len)?;
                if ctx.bytes_as_hex {
                    Ok(Value::Str(binstruct_util::to_lower_hex(&bytes)))
                } else {
                    Ok(Value::Bytes(bytes))
                }
            }
            Opcode::StringRead { length, encoding } => {
                let len = self.eval_length(length, stream, ctx, trace)?;
                let bytes = stream.read(len)?;
                let encoding = encoding.clone().unwrap_or_else(|| ctx.default_encoding.clone());
                decode_string(&bytes, &encoding)
            }
            Opcode::VarintRead => read_varint(stream),
            Opcode::Nested(sub_program) => {
                ctx.push_frame();
                self.run_level(sub_program, stream, ctx, trace)?;
                let frame = ctx.pop_frame();
                Ok(Value::Record(build_record(sub_program, &frame.values)))
            }
            Opcode::List { count, element } => {
                let count = self.eval_length(count, stream, ctx, trace)?;
                let mut items = Vec::with_capacity(count);
                for _ in 0..count {
                    items.push(self.exec(element, stream, ctx, trace)?);
                }
                Ok(Value::List(items))
            }
            Opcode::Match {
                discriminant,
                branches,
            } => {
                let source = self.eval_source(discriminant, stream, ctx, trace)?;
                let discriminant = source
                    .as_discriminant()
                    .ok_or(Error::new(ErrorKind::InvalidLength))?;
                let branch = usize::try_from(discriminant)
                    .ok()
                    .and_then(|i| branches.get(i))
                    .ok_or(Error::new(ErrorKind::NoMatch {
                        discriminant,
                        branches: branches.len(),
                    }))?;
                log::debug!("match selected branch {discriminant} of {}", branches.len());
                self.exec(branch, stream, ctx, trace)
            }
            Opcode::Peek(inner) => {
                let start = stream.tell();
                let value = self.exec(inner, stream, ctx, trace)?;
                stream.seek(start as i64, SeekMode::Absolute)?;
                Ok(value)
            }
            Opcode::Seek { offset, mode } => {
                let offset = self.eval_source(offset, stream, ctx, trace)?;
                let offset = offset
                    .as_discriminant()
                    .ok_or(Error::new(ErrorKind::InvalidLength))?;
                stream.seek(offset, *mode)?;
                Ok(Value::UInt(0))
            }
            Opcode::Pos => Ok(Value::UInt(stream.tell())),
            Opcode::FuncCall { callable, args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval_source(a, stream, ctx, trace))
                    .collect::<Result<Vec<_>>>()?;
                callable(&args).map_err(|msg| Error::new(ErrorKind::CallbackError(msg)))
            }
            Opcode::Group { args } => {
                let args = args
                    .iter()
                    .map(|a| self.eval_source(a, stream, ctx, trace))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Value::List(args))
            }
        }
    }

    fn eval_source(
        &self,
        source: &Source,
        stream: &mut dyn Stream,
        ctx: &mut Context,
        trace: &mut Vec<Snapshot>,
    ) -> Result<Value> {
        match source {
            Source::Literal(v) => Ok(Value::Int(*v)),
            Source::Ref(index) => ctx
                .value_at(*index)
                .cloned()
                .ok_or_else(|| Error::new(ErrorKind::ProgramError(format!("unresolved position {index}")))),
            Source::Inline(opcode) => self.exec(opcode, stream, ctx, trace),
        }
    }

    fn eval_length(
        &self,
        source: &Source,
        stream: &mut dyn Stream,
        ctx: &mut Context,
        trace: &mut Vec<Snapshot>,
    ) -> Result<usize> {
        let value = self.eval_source(source, stream, ctx, trace)?;
        let len = value.as_length().ok_or(Error::new(ErrorKind::InvalidLength))?;
        usize::try_from(len).map_err(|_| Error::new(ErrorKind::InvalidLength))
    }
}

fn attach(err: Error, field: Option<String>, offset: u64) -> Error {
    let err = err.with_offset(offset);
    match field {
        Some(name) => err.with_field(name),
        None => err,
    }
}

/// Build the record for one completed frame from its program and captured values.
///
/// Keyed when every declared name in `program` is `Some` (the common case); falls back to a
/// positional tuple of the non-anonymous values when any field in this level was anonymous.
fn build_record(program: &Program, values: &[Value]) -> Record {
    if program.names.iter().all(Option::is_some) {
        Record::Keyed(
            program
                .names
                .iter()
                .zip(values)
                .map(|(name, value)| (name.clone().unwrap(), value.clone()))
                .collect(),
        )
    } else {
        Record::Tuple(
            program
                .names
                .iter()
                .zip(values)
                .filter(|(name, _)| name.is_some())
                .map(|(_, value)| value.clone())
                .collect(),
        )
    }
}

fn opcode_label(opcode: &Opcode) -> &'static str {
    match opcode {
        Opcode::IntRead { .. } => "IntRead",
        Opcode::FloatRead { .. } => "FloatRead",
        Opcode::BytesRead { .. } => "BytesRead",
        Opcode::StringRead { .. } => "StringRead",
        Opcode::VarintRead => "VarintRead",
        Opcode::Nested(_) => "Nested",
        Opcode::List { .. } => "List",
        Opcode::Match { .. } => "Match",
        Opcode::Peek(_) => "Peek",
        Opcode::Seek { .. } => "Seek",
        Opcode::Pos => "Pos",
        Opcode::FuncCall { .. } => "FuncCall",
        Opcode::Group { .. } => "Group",
    }
}

fn read_int(stream: &mut dyn Stream, signed: bool, bits: u8, order: ByteOrder) -> Result<Value> {
    if bits == 0 || bits > 64 || bits % 8 != 0 {
        return Err(Error::new(ErrorKind::ProgramError(format!(
            "invalid integer width {bits}"
        ))));
    }
    let bytes = stream.read((bits / 8) as usize)?;
    let mut buf = [0u8; 8];
    let width = bytes.len();
    match order {
        ByteOrder::Little => buf[..width].copy_from_slice(&bytes),
        ByteOrder::Big => buf[8 - width..].copy_from_slice(&bytes),
    }
    let raw = match order {
        ByteOrder::Little => u64::from_le_bytes(buf),
        ByteOrder::Big => u64::from_be_bytes(buf),
    };
    if signed {
        let shift = 64 - (width as u32 * 8);
        let signed_value = ((raw << shift) as i64) >> shift;
        Ok(Value::Int(signed_value))
    } else {
        Ok(Value::UInt(raw))
    }
}

fn read_float(stream: &mut dyn Stream, bits: u8, order: ByteOrder) -> Result<Value> {
    let bytes = stream.read((bits / 8) as usize)?;
    let value = match (bits, order) {
        (32, ByteOrder::Little) => f32::from_le_bytes(binstruct_util::array_from_slice(&bytes)) as f64,
        (32, ByteOrder::Big) => f32::from_be_bytes(binstruct_util::array_from_slice(&bytes)) as f64,
        (64, ByteOrder::Little) => f64::from_le_bytes(binstruct_util::array_from_slice(&bytes)),
        (64, ByteOrder::Big) => f64::from_be_bytes(binstruct_util::array_from_slice(&bytes)),
        _ => {
            return Err(Error::new(ErrorKind::ProgramError(format!(
                "invalid float width {bits}"
            ))))
        }
    };
    Ok(Value::Float(value))
}

fn decode_string(bytes: &[u8], encoding: &str) -> Result<Value> {
    match encoding.to_ascii_lowercase().as_str() {
        "utf-8" | "utf8" => String::from_utf8(bytes.to_vec())
            .map(Value::Str)
            .map_err(|_| {
                Error::new(ErrorKind::DecodeError {
                    encoding: encoding.to_string(),
                })
            }),
        "ascii" => {
            if bytes.iter().all(u8::is_ascii) {
                Ok(Value::Str(bytes.iter().map(|&b| b as char).collect()))
            } else {
                Err(Error::new(ErrorKind::DecodeError {
                    encoding: encoding.to_string(),
                }))
            }
        }
        _ => Err(Error::new(ErrorKind::DecodeError {
            encoding: encoding.to_string(),
        })),
    }
}

fn read_varint(stream: &mut dyn Stream) -> Result<Value> {
    let mut result: u64 = 0;
    for i in 0..10 {
        let byte = stream.read(1)?[0];
        let low7 = (byte & 0x7f) as u64;
        if i == 9 && (low7 & !1) != 0 {
            return Err(Error::new(ErrorKind::MalformedVarint));
        }
        result |= low7 << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(Value::UInt(result));
        }
    }
    Err(Error::new(ErrorKind::MalformedVarint))
}
