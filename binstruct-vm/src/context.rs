//! Per-parse interpreter state: the frame stack and the context-wide defaults fields can fall
//! back on.

use binstruct_format::{ByteOrder, Value};

/// One nesting level's captured values.
///
/// Every opcode executed at this level appends exactly one entry (a placeholder for anonymous
/// opcodes), so `values[i]` always corresponds to `Program.opcodes[i]` at the same level.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    pub values: Vec<Value>,
}

impl Frame {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Per-parse state: the frame stack plus the defaults new frames inherit.
///
/// A `Context` is constructed fresh for each `parse_struct` call and discarded afterward — no
/// state leaks between independent parses.
#[derive(Debug, Clone)]
pub struct Context {
    frames: Vec<Frame>,
    pub default_byte_order: ByteOrder,
    pub default_float_order: ByteOrder,
    pub default_encoding: String,
    pub bytes_as_hex: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    /// A context with the engine's defaults: little-endian, UTF-8, bytes rendered raw.
    pub fn new() -> Self {
        Self {
            frames: vec![Frame::new()],
            default_byte_order: ByteOrder::Little,
            default_float_order: ByteOrder::Little,
            default_encoding: "utf-8".to_string(),
            bytes_as_hex: false,
        }
    }

    /// Push a fresh frame for a nested structure.
    ///
    /// Defaults (`default_byte_order`, `default_encoding`, `bytes_as_hex`) are not duplicated
    /// into the new frame: they live on `Context` itself, outside the frame stack, so a nested
    /// structure sees the same defaults as its parent automatically.
    pub fn push_frame(&mut self) {
        self.frames.push(Frame::new());
    }

    /// Pop the current frame, returning its captured values.
    ///
    /// # Panics
    ///
    /// Panics if called on the top-level frame; the interpreter never does this, since it only
    /// pops frames it pushed.
    pub fn pop_frame(&mut self) -> Frame {
        self.frames.pop().expect("frame stack must not underflow")
    }

    /// The current (innermost) frame.
    pub fn current(&self) -> &Frame {
        self.frames.last().expect("frame stack is never empty")
    }

    /// The current (innermost) frame, mutably.
    pub fn current_mut(&mut self) -> &mut Frame {
        self.frames.last_mut().expect("frame stack is never empty")
    }

    /// Append a captured value to the current frame.
    pub fn push_value(&mut self, value: Value) {
        self.current_mut().values.push(value);
    }

    /// Look up a previously captured value in the current frame by its positional index.
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.current().values.get(index)
    }
}
