//! Command parser for plain-English robot instructions

use crate::config::RobotDefaults;
use crate::error::ParseError;
use crate::matchers::MATCHERS;
use crate::tokenizer::tokenize;
use serde::Serialize;
use std::fmt;

/// Kind of value a clarification asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClarificationKind {
    Distance,
    Angle,
    Duration,
}

impl ClarificationKind {
    /// Field name presented to the caller.
    pub fn field(&self) -> &'static str {
        match self {
            ClarificationKind::Distance => "distance",
            ClarificationKind::Angle => "angle",
            ClarificationKind::Duration => "duration",
        }
    }

    /// Text appended to the original command once a value is known.
    pub fn suffix(&self, value: &str) -> String {
        match self {
            ClarificationKind::Distance => format!("{value}mm"),
            ClarificationKind::Angle => format!("{value} degrees"),
            ClarificationKind::Duration => format!("{value} seconds"),
        }
    }
}

impl fmt::Display for ClarificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.field())
    }
}

/// Request for a value the command shape requires but the text lacks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClarificationRequest {
    pub field: String,
    pub message: String,
    pub kind: ClarificationKind,
}

impl ClarificationRequest {
    pub fn new(kind: ClarificationKind, message: impl Into<String>) -> Self {
        Self {
            field: kind.field().to_string(),
            message: message.into(),
            kind,
        }
    }
}

/// Which recognizer produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandType {
    Stop,
    Motor,
    Turn,
    Move,
    Wait,
    RoutineCall,
    Fallback,
}

/// What parsing a line produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseOutcome {
    /// Generated statements, one per line
    Code(String),
    Clarification(ClarificationRequest),
    Failed(ParseError),
}

/// Result of parsing a command
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParseResult {
    pub outcome: ParseOutcome,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,
    pub command_type: Option<CommandType>,
}

impl ParseResult {
    pub fn code(code: impl Into<String>, confidence: f32, command_type: CommandType) -> Self {
        Self {
            outcome: ParseOutcome::Code(code.into()),
            confidence,
            command_type: Some(command_type),
        }
    }

    pub fn clarification(request: ClarificationRequest, command_type: CommandType) -> Self {
        Self {
            outcome: ParseOutcome::Clarification(request),
            confidence: 0.7,
            command_type: Some(command_type),
        }
    }

    pub fn failed(error: ParseError) -> Self {
        Self {
            outcome: ParseOutcome::Failed(error),
            confidence: 0.0,
            command_type: None,
        }
    }

    pub fn success(&self) -> bool {
        matches!(self.outcome, ParseOutcome::Code(_))
    }

    pub fn generated_code(&self) -> Option<&str> {
        match &self.outcome {
            ParseOutcome::Code(code) => Some(code),
            _ => None,
        }
    }

    pub fn clarification_request(&self) -> Option<&ClarificationRequest> {
        match &self.outcome {
            ParseOutcome::Clarification(request) => Some(request),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ParseError> {
        match &self.outcome {
            ParseOutcome::Failed(error) => Some(error),
            _ => None,
        }
    }
}

/// Parse a single command line into statements.
pub fn parse_command(text: &str, defaults: &RobotDefaults) -> ParseResult {
    let tokens = tokenize(text);
    if tokens.is_empty() {
        return ParseResult::failed(ParseError::EmptyInput);
    }

    for (name, matcher) in MATCHERS {
        if let Some(result) = matcher(&tokens, defaults) {
            tracing::debug!(
                matcher = name,
                confidence = result.confidence,
                text,
                "command matched"
            );
            return result;
        }
    }

    tracing::debug!(text, "no matcher accepted command");
    ParseResult::failed(ParseError::UnrecognizedCommand)
}

/// Parse several independent lines.
pub fn parse_commands<S: AsRef<str>>(lines: &[S], defaults: &RobotDefaults) -> Vec<ParseResult> {
    lines
        .iter()
        .map(|line| parse_command(line.as_ref(), defaults))
        .collect()
}
