//! The outer program shell: read a program, parse it, run it.

use std::io::{BufRead, Write};

use crate::env::Environment;
use crate::error::{GrinDiagnostic, GrinError, GrinResult};
use crate::exec::Executor;
use crate::parser::{self, TERMINATOR};

/// Read source lines from `reader` up to the terminator line or end of input.
///
/// The terminator itself is consumed but not returned, so whatever follows it
/// is left in `reader` for INNUM and INSTR.
pub fn read_program<R: BufRead>(reader: &mut R) -> GrinResult<Vec<String>> {
    let mut lines = Vec::new();
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).map_err(|e| {
            GrinDiagnostic::new(GrinError::Io).with_detail(format!("failed to read program: {e}"))
        })?;
        if read == 0 {
            break;
        }
        let line = line.trim_end_matches(['\n', '\r']);
        if line.trim() == TERMINATOR {
            break;
        }
        lines.push(line.to_string());
    }
    Ok(lines)
}

/// Parse `source` and run it to completion against the given console.
pub fn run_source<R: BufRead, W: Write>(
    source: &str,
    input: R,
    output: W,
) -> GrinResult<Environment> {
    let program = parser::parse(source)?;
    Executor::new(&program, input, output).run()
}
