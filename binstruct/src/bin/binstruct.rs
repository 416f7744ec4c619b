//! A thin CLI demonstrating the engine against a small fixed registry of structure descriptions.

use std::path::PathBuf;
use std::process::ExitCode;

use binstruct::{parse_struct_traced, CompileTarget, Data, ParseOptions};
use binstruct_compiler::{FieldSpec, LenSpec, StructureDescription};
use structopt::StructOpt;

#[derive(StructOpt)]
#[structopt(name = "binstruct", about = "parse a binary file against a named structure")]
struct Options {
    /// Print the opcode-by-opcode execution trace after parsing.
    #[structopt(short, long)]
    trace: bool,

    /// Render raw-byte fields as lowercase hex.
    #[structopt(long)]
    hex: bool,

    /// Name of a registered structure to parse against.
    #[structopt(short, long, default_value = "tlv")]
    structure: String,

    /// The file to parse.
    path: PathBuf,
}

/// A small set of structures built in for demonstration; a real embedding would supply its own
/// `StructureDescription` values directly rather than going through a name registry like this.
fn registry(name: &str) -> Option<StructureDescription> {
    match name {
        "tlv" => Some(vec![
            ("tag".to_string(), FieldSpec::uint(8)),
            ("len".to_string(), FieldSpec::uint(16)),
            ("value".to_string(), FieldSpec::bytes(LenSpec::var("len"))),
        ]),
        "header" => Some(vec![
            ("magic".to_string(), FieldSpec::bytes(4)),
            ("version".to_string(), FieldSpec::uint(8)),
            ("flags".to_string(), FieldSpec::uint(8)),
            ("payload_len".to_string(), FieldSpec::uint(32)),
        ]),
        _ => None,
    }
}

fn main() -> ExitCode {
    env_logger::init();
    let Options {
        trace,
        hex,
        structure,
        path,
    } = Options::from_args();

    let Some(description) = registry(&structure) else {
        eprintln!(
            "unknown structure {structure:?}; known structures: tlv, header"
        );
        return ExitCode::FAILURE;
    };

    let data = match binstruct::open_file(&path) {
        Ok(data) => data,
        Err(err) => {
            eprintln!("couldn't open {}: {err}", path.display());
            return ExitCode::FAILURE;
        }
    };

    let mut options = ParseOptions::default().with_bytes_to_hex(hex);
    if trace {
        options = options.with_trace();
    }

    match parse_struct_traced(CompileTarget::Description(description), data, options) {
        Ok(outcome) => {
            println!("{}", outcome.record);
            if trace {
                let mut rendered = String::new();
                binstruct_vm::trace::format_trace(&mut rendered, &outcome.trace).ok();
                eprintln!("{rendered}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("parse failed: {err}");
            ExitCode::FAILURE
        }
    }
}
