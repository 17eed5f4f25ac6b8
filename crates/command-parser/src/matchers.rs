//! Command shape recognizers
//!
//! Each matcher inspects the whole token stream and either declines (`None`)
//! or produces a final result, which may be a clarification request when the
//! shape is recognized but its value is missing.

use crate::config::RobotDefaults;
use crate::parser::{ClarificationKind, ClarificationRequest, CommandType, ParseResult};
use crate::tokenizer::{Direction, Numeric, Token, TokenKind};
use crate::vocabulary::{self, DEFAULT_DURATION_FACTOR};

pub type MatchFn = fn(&[Token], &RobotDefaults) -> Option<ParseResult>;

/// Matchers in priority order. Specific shapes (a bare stop, an attachment
/// motor) come before the broader turn/move/wait shapes.
pub const MATCHERS: [(&str, MatchFn); 5] = [
    ("stop", match_stop),
    ("motor", match_motor),
    ("turn", match_turn),
    ("move", match_move),
    ("wait", match_wait),
];

fn has_verb(tokens: &[Token], verbs: &[&str]) -> bool {
    tokens.iter().any(|t| t.is_verb_in(verbs))
}

fn find_kind(tokens: &[Token], kind: TokenKind) -> Option<(usize, &Token)> {
    tokens.iter().enumerate().find(|(_, t)| t.kind() == kind)
}

fn first_direction(tokens: &[Token]) -> Option<Direction> {
    tokens.iter().find_map(Token::direction)
}

fn number_indices(tokens: &[Token]) -> Vec<usize> {
    tokens
        .iter()
        .enumerate()
        .filter(|(_, t)| t.is_number())
        .map(|(i, _)| i)
        .collect()
}

/// Index of the measured quantity: the number nearest before the first unit,
/// otherwise the first number.
fn measured_index(tokens: &[Token], numbers: &[usize]) -> Option<usize> {
    if let Some((unit_index, _)) = find_kind(tokens, TokenKind::Unit) {
        if let Some(i) = (0..unit_index).rev().find(|&i| tokens[i].is_number()) {
            return Some(i);
        }
    }
    numbers.first().copied()
}

/// A rate given alongside the quantity, as in `... at speed 300` or `... at 300`.
///
/// Needs a second number; the first number after a speed word (or, failing
/// that, the word `at`) other than the measured quantity is the rate.
fn rate_override<'a>(
    tokens: &'a [Token],
    numbers: &[usize],
    measured: usize,
) -> Option<&'a Numeric> {
    if numbers.len() < 2 {
        return None;
    }
    let anchor = find_kind(tokens, TokenKind::Speed)
        .map(|(i, _)| i)
        .or_else(|| tokens.iter().position(|t| t.raw() == "at"))?;

    numbers
        .iter()
        .copied()
        .filter(|&i| i > anchor && i != measured)
        .find_map(|i| tokens[i].numeric())
        .filter(|value| !value.is_zero())
}

fn match_stop(tokens: &[Token], defaults: &RobotDefaults) -> Option<ParseResult> {
    if !has_verb(tokens, vocabulary::STOP_VERBS) {
        return None;
    }

    if let Some((_, motor)) = find_kind(tokens, TokenKind::Motor) {
        let method = defaults.stop_behavior.motor_method();
        return Some(ParseResult::code(
            format!("{}.{method}()", motor.raw()),
            0.9,
            CommandType::Stop,
        ));
    }

    Some(ParseResult::code("robot.stop()", 0.85, CommandType::Stop))
}

fn match_motor(tokens: &[Token], defaults: &RobotDefaults) -> Option<ParseResult> {
    if !has_verb(tokens, vocabulary::RUN_VERBS) {
        return None;
    }
    let (_, motor) = find_kind(tokens, TokenKind::Motor)?;
    let motor_name = motor.raw();

    let Some((_, angle)) = find_kind(tokens, TokenKind::Number) else {
        return Some(ParseResult::clarification(
            ClarificationRequest::new(
                ClarificationKind::Angle,
                format!("How many degrees should the {motor_name} motor run?"),
            ),
            CommandType::Motor,
        ));
    };
    let angle = angle.numeric()?.render(1.0, false);
    let speed = defaults.motor_speed.trunc() as i64;

    Some(ParseResult::code(
        format!("{motor_name}.run_angle({speed}, {angle})"),
        0.85,
        CommandType::Motor,
    ))
}

fn match_turn(tokens: &[Token], _defaults: &RobotDefaults) -> Option<ParseResult> {
    let direction = first_direction(tokens);
    let has_turn = has_verb(tokens, vocabulary::TURN_VERBS);
    if !has_turn && direction.is_none() {
        return None;
    }
    if matches!(direction, Some(Direction::Forward | Direction::Backward)) {
        return None;
    }

    let numbers = number_indices(tokens);
    let Some(measured) = measured_index(tokens, &numbers) else {
        return Some(ParseResult::clarification(
            ClarificationRequest::new(
                ClarificationKind::Angle,
                "What angle should the robot turn?",
            ),
            CommandType::Turn,
        ));
    };

    let negate = direction == Some(Direction::Left);
    let angle = tokens[measured].numeric()?.render(1.0, negate);
    let turn = format!("robot.turn({angle})");

    let code = match rate_override(tokens, &numbers, measured) {
        Some(rate) => format!(
            "robot.settings(turn_rate={})\n{turn}",
            rate.render(1.0, false)
        ),
        None => turn,
    };
    Some(ParseResult::code(code, 0.95, CommandType::Turn))
}

fn match_move(tokens: &[Token], _defaults: &RobotDefaults) -> Option<ParseResult> {
    let direction = first_direction(tokens);
    let has_move = has_verb(tokens, vocabulary::MOVE_VERBS);
    if !has_move && direction.is_none() {
        return None;
    }
    if matches!(direction, Some(Direction::Left | Direction::Right)) {
        return None;
    }

    let numbers = number_indices(tokens);
    let Some(measured) = measured_index(tokens, &numbers) else {
        return Some(ParseResult::clarification(
            ClarificationRequest::new(
                ClarificationKind::Distance,
                "How far should the robot move?",
            ),
            CommandType::Move,
        ));
    };

    let factor = find_kind(tokens, TokenKind::Unit)
        .and_then(|(_, unit)| unit.normalized())
        .and_then(vocabulary::distance_factor)
        .unwrap_or(1.0);
    let negate = direction == Some(Direction::Backward);
    let distance = tokens[measured].numeric()?.render(factor, negate);
    let straight = format!("robot.straight({distance})");

    let code = match rate_override(tokens, &numbers, measured) {
        Some(rate) => format!(
            "robot.settings(straight_speed={})\n{straight}",
            rate.render(1.0, false)
        ),
        None => straight,
    };
    Some(ParseResult::code(code, 0.95, CommandType::Move))
}

fn match_wait(tokens: &[Token], _defaults: &RobotDefaults) -> Option<ParseResult> {
    if !has_verb(tokens, vocabulary::WAIT_VERBS) {
        return None;
    }

    let Some((_, number)) = find_kind(tokens, TokenKind::Number) else {
        return Some(ParseResult::clarification(
            ClarificationRequest::new(
                ClarificationKind::Duration,
                "How long should the robot wait?",
            ),
            CommandType::Wait,
        ));
    };

    let factor = find_kind(tokens, TokenKind::Unit)
        .and_then(|(_, unit)| unit.normalized())
        .and_then(vocabulary::duration_factor)
        .unwrap_or(DEFAULT_DURATION_FACTOR);
    let duration = number.numeric()?.render(factor, false);

    Some(ParseResult::code(
        format!("wait({duration})"),
        0.9,
        CommandType::Wait,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::tokenize;

    fn run(matcher: MatchFn, text: &str) -> Option<ParseResult> {
        matcher(&tokenize(text), &RobotDefaults::default())
    }

    #[test]
    fn test_matchers_decline_foreign_shapes() {
        assert!(run(match_stop, "move forward 10").is_none());
        assert!(run(match_motor, "run forward 10").is_none());
        assert!(run(match_turn, "move forward 10").is_none());
        assert!(run(match_move, "turn left 10").is_none());
        assert!(run(match_wait, "turn left 10").is_none());
    }

    #[test]
    fn test_measured_index_prefers_unit_neighbour() {
        let tokens = tokenize("speed 300 forward 20 cm");
        let numbers = number_indices(&tokens);
        assert_eq!(measured_index(&tokens, &numbers), Some(3));
    }

    #[test]
    fn test_rate_requires_two_numbers() {
        let tokens = tokenize("move forward at speed 300");
        let numbers = number_indices(&tokens);
        assert!(rate_override(&tokens, &numbers, numbers[0]).is_none());
    }

    #[test]
    fn test_rate_ignores_zero() {
        let result = run(match_move, "move forward 100 at 0").unwrap();
        assert_eq!(result.generated_code(), Some("robot.straight(100)"));
    }

    #[test]
    fn test_second_number_without_anchor_is_not_a_rate() {
        let result = run(match_move, "move forward 100 300").unwrap();
        assert_eq!(result.generated_code(), Some("robot.straight(100)"));
    }

    #[test]
    fn test_wait_with_unknown_unit_uses_seconds() {
        let result = run(match_wait, "wait 2 degrees").unwrap();
        assert_eq!(result.generated_code(), Some("wait(2000)"));
    }

    #[test]
    fn test_symbolic_values_render_as_expressions() {
        let result = run(match_move, "move backward {d}cm").unwrap();
        assert_eq!(result.generated_code(), Some("robot.straight(-d * 10)"));
        let result = run(match_wait, "wait {t}").unwrap();
        assert_eq!(result.generated_code(), Some("wait(t * 1000)"));
        let result = run(match_turn, "turn left {a}").unwrap();
        assert_eq!(result.generated_code(), Some("robot.turn(-a)"));
    }

    #[test]
    fn test_motor_uses_default_speed() {
        let defaults = RobotDefaults {
            motor_speed: 450.0,
            ..RobotDefaults::default()
        };
        let result = match_motor(&tokenize("spin gripper 90"), &defaults).unwrap();
        assert_eq!(result.generated_code(), Some("gripper.run_angle(450, 90)"));
    }
}
