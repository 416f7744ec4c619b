//! # binstruct VM
//!
//! Executes a `binstruct_format::Program` against a seekable byte [`Stream`], accumulating
//! `binstruct_format::Value`s into a `binstruct_format::Record` via a per-parse [`Context`].

pub mod context;
pub mod error;
pub mod interp;
pub mod stream;
pub mod trace;

pub use context::{Context, Frame};
pub use error::{Error, ErrorKind, Result};
pub use interp::Interpreter;
pub use stream::{BufferedFileStream, ByteBufferStream, SliceStream, Stream};
pub use trace::Snapshot;
