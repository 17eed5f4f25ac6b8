//! Clarification protocol
//!
//! A line that names a command but omits its value parks in
//! [`CommandState::NeedsClarification`]. Supplying the value appends it to the
//! original text with the unit implied by the clarification kind and parses
//! the completed line from scratch.
//!
//! ```text
//! Error <- parse -> Parsed
//!            |
//!            v
//!   NeedsClarification --supply--> Parsed | NeedsClarification | Error
//!
//! any --mark_pending--> Pending (fallback in flight)
//! ```

use crate::config::RobotDefaults;
use crate::error::{ParseError, Result};
use crate::parser::{parse_command, ClarificationKind, ParseOutcome, ParseResult};
use serde::Serialize;

/// Where a command line stands in the clarification protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandState {
    Parsed,
    NeedsClarification,
    Error,
    /// An external fallback parser is working on the line
    Pending,
}

impl CommandState {
    pub fn of(result: &ParseResult) -> Self {
        match result.outcome {
            ParseOutcome::Code(_) => CommandState::Parsed,
            ParseOutcome::Clarification(_) => CommandState::NeedsClarification,
            ParseOutcome::Failed(_) => CommandState::Error,
        }
    }
}

/// Append a supplied value to the command text.
pub fn complete_with_value(text: &str, kind: ClarificationKind, value: &str) -> String {
    format!("{} {}", text.trim_end(), kind.suffix(value.trim()))
}

/// Re-parse `text` completed with `value`.
pub fn resolve_clarification(
    text: &str,
    kind: ClarificationKind,
    value: &str,
    defaults: &RobotDefaults,
) -> ParseResult {
    let completed = complete_with_value(text, kind, value);
    tracing::debug!(original = text, completed = completed.as_str(), "resolving clarification");
    parse_command(&completed, defaults)
}

/// One command line and its latest parse.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommandEntry {
    pub text: String,
    pub result: ParseResult,
    pub state: CommandState,
}

impl CommandEntry {
    pub fn parse(text: &str, defaults: &RobotDefaults) -> Self {
        Self::from_result(text.to_string(), parse_command(text, defaults))
    }

    pub fn from_result(text: String, result: ParseResult) -> Self {
        let state = CommandState::of(&result);
        Self {
            text,
            result,
            state,
        }
    }

    /// Provide the missing value. The entry text becomes the completed line.
    pub fn supply(&mut self, value: &str, defaults: &RobotDefaults) -> Result<CommandState> {
        let kind = match (self.state, self.result.clarification_request()) {
            (CommandState::NeedsClarification, Some(request)) => request.kind,
            _ => return Err(ParseError::NothingToClarify(self.text.clone())),
        };

        let completed = complete_with_value(&self.text, kind, value);
        let result = parse_command(&completed, defaults);
        *self = Self::from_result(completed, result);
        Ok(self.state)
    }

    pub fn mark_pending(&mut self) {
        self.state = CommandState::Pending;
    }

    /// Adopt a result delivered after [`CommandEntry::mark_pending`].
    pub fn settle(&mut self, result: ParseResult) {
        self.state = CommandState::of(&result);
        self.result = result;
    }

    /// Parsed and Error need nothing further from the caller.
    pub fn is_terminal(&self) -> bool {
        matches!(self.state, CommandState::Parsed | CommandState::Error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults() -> RobotDefaults {
        RobotDefaults::default()
    }

    #[test]
    fn test_complete_with_value_per_kind() {
        assert_eq!(
            complete_with_value("move forward", ClarificationKind::Distance, "150"),
            "move forward 150mm"
        );
        assert_eq!(
            complete_with_value("turn left ", ClarificationKind::Angle, "30"),
            "turn left 30 degrees"
        );
        assert_eq!(
            complete_with_value("wait", ClarificationKind::Duration, " 2 "),
            "wait 2 seconds"
        );
    }

    #[test]
    fn test_resolve_clarification() {
        let result = resolve_clarification("move forward", ClarificationKind::Distance, "150", &defaults());
        assert_eq!(result.generated_code(), Some("robot.straight(150)"));

        let result = resolve_clarification("turn left", ClarificationKind::Angle, "30", &defaults());
        assert_eq!(result.generated_code(), Some("robot.turn(-30)"));

        let result = resolve_clarification("wait", ClarificationKind::Duration, "2", &defaults());
        assert_eq!(result.generated_code(), Some("wait(2000)"));
    }

    #[test]
    fn test_entry_walks_to_parsed() {
        let mut entry = CommandEntry::parse("move forward", &defaults());
        assert_eq!(entry.state, CommandState::NeedsClarification);
        assert!(!entry.is_terminal());

        let state = entry.supply("150", &defaults()).unwrap();
        assert_eq!(state, CommandState::Parsed);
        assert!(entry.is_terminal());
        assert_eq!(entry.text, "move forward 150mm");
        assert_eq!(entry.result.generated_code(), Some("robot.straight(150)"));
    }

    #[test]
    fn test_non_numeric_value_asks_again() {
        let mut entry = CommandEntry::parse("move forward", &defaults());
        let state = entry.supply("far", &defaults()).unwrap();
        assert_eq!(state, CommandState::NeedsClarification);
    }

    #[test]
    fn test_supply_outside_clarification_is_rejected() {
        let mut entry = CommandEntry::parse("stop", &defaults());
        assert_eq!(entry.state, CommandState::Parsed);
        let err = entry.supply("10", &defaults()).unwrap_err();
        assert_eq!(err, ParseError::NothingToClarify("stop".to_string()));

        let mut entry = CommandEntry::parse("", &defaults());
        assert_eq!(entry.state, CommandState::Error);
        assert!(entry.supply("10", &defaults()).is_err());
    }

    #[test]
    fn test_pending_then_settle() {
        let mut entry = CommandEntry::parse("xyzzy plugh", &defaults());
        assert_eq!(entry.state, CommandState::Error);
        entry.mark_pending();
        assert_eq!(entry.state, CommandState::Pending);
        assert!(!entry.is_terminal());
        assert!(entry.supply("1", &defaults()).is_err());

        entry.settle(ParseResult::code("robot.stop()", 0.9, crate::CommandType::Fallback));
        assert_eq!(entry.state, CommandState::Parsed);
    }
}
