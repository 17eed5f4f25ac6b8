//! Command parser for plain-English robot scripts
//!
//! This crate turns short sentences such as `move forward 200mm` or
//! `turn right 90 degrees` into Pybricks drive-base statements, and supports
//! user-defined routines with parameters declared inline in a script.
//!
//! ```text
//! script -> routines::extract_routines -> main-code lines
//!        -> tokenizer::tokenize -> matchers (first match wins)
//!        -> code | clarification | error
//! ```

mod calls;
mod clarify;
mod config;
mod error;
mod fallback;
mod fuzzy;
mod matchers;
mod metrics;
mod parser;
mod program;
mod routines;
mod script;
mod tokenizer;
pub mod vocabulary;

pub use calls::{generate_routine_call, is_routine_call, RoutineCall};
pub use clarify::{complete_with_value, resolve_clarification, CommandEntry, CommandState};
pub use config::{load_defaults_file, RobotDefaults, StopBehavior};
pub use error::{ParseError, Result};
pub use fallback::{
    consult_fallback, is_fallback_result, load_fallback_responses, parse_with_fallback,
    FallbackContext, FallbackError, FallbackParser, FallbackPolicy, MockFallback,
};
pub use fuzzy::{closest_match, edit_distance, find_best_match};
pub use metrics::ParserMetrics;
pub use parser::{
    parse_command, parse_commands, ClarificationKind, ClarificationRequest, CommandType,
    ParseOutcome, ParseResult,
};
pub use program::{generate_program, GeneratedProgram};
pub use routines::{
    compile_routine, extract_routines, normalize_routine_name, split_logical_lines,
    ExtractedRoutines, ParsedRoutine, Routine, RoutineLibrary,
};
pub use script::{parse_line, parse_script, LineResult, ScriptOutput};
pub use tokenizer::{classify_word, tokenize, Direction, Numeric, Token, TokenKind};

/// Initialize the command parser
///
/// Builds the shared word tables up front so the first parse does not pay for it.
pub fn init() -> Result<(), Box<dyn std::error::Error>> {
    let tables = vocabulary::vocabulary();
    tracing::info!(
        verbs = tables.verbs.len(),
        directions = tables.directions.len(),
        units = tables.units.len(),
        "Initializing command parser"
    );
    Ok(())
}

/// Parse a single command with default robot settings
pub fn parse_with_defaults(text: &str) -> ParseResult {
    parse_command(text, &RobotDefaults::default())
}

/// Quick check of a command, for logs and the CLI
pub fn describe_command(text: &str) -> String {
    let result = parse_with_defaults(text);
    match &result.outcome {
        ParseOutcome::Code(code) => {
            format!("{} (confidence: {:.2})", code.replace('\n', "; "), result.confidence)
        }
        ParseOutcome::Clarification(request) => format!("needs {}: {}", request.field, request.message),
        ParseOutcome::Failed(error) => format!("error: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_commands() {
        let test_cases = vec![
            ("move forward 200mm", "robot.straight(200)"),
            ("go backwards 10 cm", "robot.straight(-100)"),
            ("turn left 45", "robot.turn(-45)"),
            ("wait 500 ms", "wait(500)"),
            ("stop the claw", "claw.stop()"),
            ("run arm 90", "arm.run_angle(200, 90)"),
        ];

        for (command, expected) in test_cases {
            let result = parse_with_defaults(command);
            assert_eq!(result.generated_code(), Some(expected), "command: {command}");
            assert!(result.confidence > 0.0);
        }
    }

    #[test]
    fn test_init() {
        assert!(init().is_ok());
    }

    #[test]
    fn test_describe_command() {
        assert_eq!(describe_command("turn right 90"), "robot.turn(90) (confidence: 0.95)");
        assert_eq!(
            describe_command("move forward"),
            "needs distance: How far should the robot move?"
        );
        assert_eq!(describe_command(""), "error: Empty command");
    }
}
