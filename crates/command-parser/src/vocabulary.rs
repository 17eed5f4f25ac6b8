//! Word tables for command classification
//!
//! Every table is a compile-time constant. The combined lists used by the
//! classifier are built once on first use and shared read-only afterwards.

use std::sync::OnceLock;

pub const MOVE_VERBS: &[&str] = &["move", "go", "drive", "travel", "advance", "proceed"];
pub const TURN_VERBS: &[&str] = &["turn", "rotate", "spin", "pivot", "swing"];
pub const WAIT_VERBS: &[&str] = &["wait", "pause", "delay", "sleep", "hold"];
pub const RUN_VERBS: &[&str] = &["run", "spin", "rotate", "move", "activate", "start"];
pub const STOP_VERBS: &[&str] = &["stop", "halt", "brake", "freeze", "end"];
pub const CALL_VERBS: &[&str] = &["call", "execute", "launch", "begin"];

pub const FORWARD_WORDS: &[&str] = &["forward", "forwards", "ahead", "straight", "front"];
pub const BACKWARD_WORDS: &[&str] = &["backward", "backwards", "back", "reverse", "behind"];
pub const LEFT_WORDS: &[&str] = &["left", "counterclockwise", "ccw"];
pub const RIGHT_WORDS: &[&str] = &["right", "clockwise", "cw"];

pub const MOTOR_WORDS: &[&str] = &[
    "motor",
    "arm",
    "claw",
    "gripper",
    "lift",
    "attachment",
    "grabber",
    "lever",
];

pub const SPEED_WORDS: &[&str] = &[
    "speed", "velocity", "rate", "fast", "slow", "quickly", "slowly",
];

pub const COLORS: &[&str] = &[
    "red", "orange", "yellow", "green", "cyan", "blue", "violet", "magenta", "white", "gray",
    "grey", "black", "none",
];

/// Words dropped from interpretation; they still appear in the token stream.
pub const FILLER_WORDS: &[&str] = &[
    "for", "to", "the", "a", "an", "of", "by", "at", "in", "on", "and", "then", "with",
];

/// Words that would fuzzy-match into the wrong category.
pub const FUZZY_BLACKLIST: &[&str] = &["speed", "slow", "fast", "quick", "rate"];

/// Distance units and their factor to millimetres.
pub const DISTANCE_UNITS: &[(&str, f64)] = &[
    ("mm", 1.0),
    ("millimeter", 1.0),
    ("millimeters", 1.0),
    ("millimetre", 1.0),
    ("millimetres", 1.0),
    ("cm", 10.0),
    ("centimeter", 10.0),
    ("centimeters", 10.0),
    ("centimetre", 10.0),
    ("centimetres", 10.0),
    ("m", 1000.0),
    ("meter", 1000.0),
    ("meters", 1000.0),
    ("metre", 1000.0),
    ("metres", 1000.0),
];

/// Duration units and their factor to milliseconds.
pub const DURATION_UNITS: &[(&str, f64)] = &[
    ("ms", 1.0),
    ("millisecond", 1.0),
    ("milliseconds", 1.0),
    ("s", 1000.0),
    ("sec", 1000.0),
    ("second", 1000.0),
    ("seconds", 1000.0),
    ("min", 60000.0),
    ("minute", 60000.0),
    ("minutes", 60000.0),
];

pub const ANGLE_UNITS: &[&str] = &["degree", "degrees", "deg"];

/// Milliseconds per second, applied when a duration carries no known unit.
pub const DEFAULT_DURATION_FACTOR: f64 = 1000.0;

/// Combined tables, in classification order.
#[derive(Debug)]
pub struct Vocabulary {
    pub verbs: Vec<&'static str>,
    pub directions: Vec<&'static str>,
    pub units: Vec<&'static str>,
}

/// Shared vocabulary, built on first access.
pub fn vocabulary() -> &'static Vocabulary {
    static VOCABULARY: OnceLock<Vocabulary> = OnceLock::new();
    VOCABULARY.get_or_init(|| {
        let verbs = dedup(
            [
                MOVE_VERBS, TURN_VERBS, WAIT_VERBS, RUN_VERBS, STOP_VERBS, CALL_VERBS,
            ]
            .concat(),
        );
        let directions = [FORWARD_WORDS, BACKWARD_WORDS, LEFT_WORDS, RIGHT_WORDS].concat();
        let units = DISTANCE_UNITS
            .iter()
            .chain(DURATION_UNITS)
            .map(|(name, _)| *name)
            .chain(ANGLE_UNITS.iter().copied())
            .collect();
        Vocabulary {
            verbs,
            directions,
            units,
        }
    })
}

fn dedup(words: Vec<&'static str>) -> Vec<&'static str> {
    let mut seen = Vec::with_capacity(words.len());
    for word in words {
        if !seen.contains(&word) {
            seen.push(word);
        }
    }
    seen
}

/// Factor converting `unit` to millimetres.
pub fn distance_factor(unit: &str) -> Option<f64> {
    lookup(DISTANCE_UNITS, unit)
}

/// Factor converting `unit` to milliseconds.
pub fn duration_factor(unit: &str) -> Option<f64> {
    lookup(DURATION_UNITS, unit)
}

fn lookup(table: &[(&str, f64)], unit: &str) -> Option<f64> {
    table
        .iter()
        .find(|(name, _)| *name == unit)
        .map(|(_, factor)| *factor)
}

pub fn is_filler(word: &str) -> bool {
    FILLER_WORDS.contains(&word)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbs_are_unique() {
        let verbs = &vocabulary().verbs;
        for (i, verb) in verbs.iter().enumerate() {
            assert!(!verbs[i + 1..].contains(verb), "duplicate verb {verb}");
        }
        // shared between turn and run tables
        assert!(verbs.contains(&"spin"));
    }

    #[test]
    fn test_unit_factors() {
        assert_eq!(distance_factor("cm"), Some(10.0));
        assert_eq!(distance_factor("metres"), Some(1000.0));
        assert_eq!(duration_factor("min"), Some(60000.0));
        assert_eq!(duration_factor("degrees"), None);
    }

    #[test]
    fn test_units_table_covers_all_kinds() {
        let units = &vocabulary().units;
        assert!(units.contains(&"mm"));
        assert!(units.contains(&"seconds"));
        assert!(units.contains(&"deg"));
    }
}
