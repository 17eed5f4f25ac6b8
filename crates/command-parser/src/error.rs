use crate::parser::ClarificationKind;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = ParseError> = core::result::Result<T, E>;

/// Why a line did not produce code.
///
/// Parsing reports these as data inside [`crate::ParseResult`]. Only misuse of
/// a [`crate::CommandEntry`] surfaces one through `Err`.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ParseError {
    #[error("Empty command")]
    EmptyInput,
    #[error("Could not parse command")]
    UnrecognizedCommand,
    #[error("missing {0} value")]
    MissingValue(ClarificationKind),
    #[error("routine '{routine}': could not compile '{line}': {reason}")]
    MalformedRoutineDefinition {
        routine: String,
        line: String,
        reason: String,
    },
    #[error("fallback unavailable: {0}")]
    FallbackUnavailable(String),
    #[error("no clarification pending for '{0}'")]
    NothingToClarify(String),
}
