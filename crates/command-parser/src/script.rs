//! Whole-script pipeline: routines, main-code lines and the final program

use crate::calls::{generate_routine_call, is_routine_call};
use crate::config::RobotDefaults;
use crate::parser::{parse_command, CommandType, ParseResult};
use crate::program::{generate_program, GeneratedProgram};
use crate::routines::{extract_routines, ParsedRoutine, RoutineLibrary};
use serde::Serialize;

/// Parse one line, recognizing calls to routines in `library` first.
pub fn parse_line(text: &str, defaults: &RobotDefaults, library: &RoutineLibrary) -> ParseResult {
    let names = library.names();
    if let Some(call) = is_routine_call(text, names.as_slice()) {
        return ParseResult::code(
            generate_routine_call(&call.name, &call.args),
            0.95,
            CommandType::RoutineCall,
        );
    }
    parse_command(text, defaults)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineResult {
    pub line: String,
    pub result: ParseResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScriptOutput {
    /// Routines defined by this script, with their per-line errors
    pub routines: Vec<ParsedRoutine>,
    /// One entry per main-code line, in order
    pub results: Vec<LineResult>,
    pub program: GeneratedProgram,
}

impl ScriptOutput {
    /// Lines that need a value or failed outright.
    pub fn unresolved(&self) -> impl Iterator<Item = &LineResult> {
        self.results.iter().filter(|r| !r.result.success())
    }
}

/// Run a full script through routine extraction, line parsing and program
/// generation. Routines defined here are merged into `library` first, so main
/// code may call them as well as anything defined earlier.
pub fn parse_script(text: &str, defaults: &RobotDefaults, library: &mut RoutineLibrary) -> ScriptOutput {
    let extracted = extract_routines(text, defaults);
    library.merge(extracted.routines.iter().cloned());

    let results: Vec<LineResult> = extracted
        .main_code
        .iter()
        .map(|line| LineResult {
            line: line.clone(),
            result: parse_line(line, defaults, library),
        })
        .collect();

    let statements: Vec<&str> = results
        .iter()
        .filter_map(|r| r.result.generated_code())
        .collect();
    let compiled = library.compile_all(defaults);
    let program = generate_program(defaults, &statements, &compiled);

    tracing::info!(
        routines = extracted.routines.len(),
        lines = results.len(),
        statements = statements.len(),
        "script parsed"
    );

    ScriptOutput {
        routines: extracted.routines,
        results,
        program,
    }
}
