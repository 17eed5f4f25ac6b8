//! Recognition of calls to known routines

use crate::routines::normalize_routine_name;
use regex::{Regex, RegexBuilder};
use serde::Serialize;

/// A recognized invocation of a known routine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutineCall {
    pub name: String,
    /// Positional arguments, trimmed, as written
    pub args: Vec<String>,
}

/// Name pattern that also accepts spaces where the identifier has underscores.
fn name_pattern(name: &str) -> String {
    name.split('_')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[_\s]+")
}

fn call_patterns(name: &str) -> Vec<Regex> {
    let name = name_pattern(name);
    [
        format!(r"^run\s+{name}(?:\s+with(?:\s+(.+))?)?$"),
        format!(r"^call\s+{name}(?:\s+with(?:\s+(.+))?)?$"),
        format!(r"^{name}(?:\s+with(?:\s+(.+))?)?$"),
        format!(r"^{name}\s*\((.*)\)$"),
    ]
    .iter()
    .filter_map(|pattern| match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::warn!(pattern = pattern.as_str(), error = %e, "bad call pattern");
            None
        }
    })
    .collect()
}

fn split_args(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|arg| !arg.is_empty())
        .map(str::to_string)
        .collect()
}

/// Match `text` against the call shapes of each known name in turn.
///
/// Accepted shapes are `run <name> [with a, b]`, `call <name> [with a, b]`,
/// `<name> [with a, b]` and `<name>(a, b)`. The first name in `known_names`
/// with a matching shape wins.
pub fn is_routine_call<S: AsRef<str>>(text: &str, known_names: &[S]) -> Option<RoutineCall> {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if text.is_empty() {
        return None;
    }

    for name in known_names {
        let name = normalize_routine_name(name.as_ref());
        for pattern in call_patterns(&name) {
            if let Some(caps) = pattern.captures(&text) {
                let args = caps.get(1).map(|m| split_args(m.as_str())).unwrap_or_default();
                tracing::debug!(routine = name.as_str(), args = args.len(), "routine call");
                return Some(RoutineCall { name, args });
            }
        }
    }
    None
}

/// Emit a call statement for a routine.
pub fn generate_routine_call<S: AsRef<str>>(name: &str, args: &[S]) -> String {
    let args: Vec<&str> = args.iter().map(|a| a.as_ref().trim()).collect();
    format!("{}({})", normalize_routine_name(name), args.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMES: [&str; 2] = ["square", "grab_object"];

    fn call(name: &str, args: &[&str]) -> Option<RoutineCall> {
        Some(RoutineCall {
            name: name.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
        })
    }

    #[test]
    fn test_all_call_shapes() {
        assert_eq!(is_routine_call("run square", &NAMES), call("square", &[]));
        assert_eq!(is_routine_call("call square with 100", &NAMES), call("square", &["100"]));
        assert_eq!(is_routine_call("square with 10, 20", &NAMES), call("square", &["10", "20"]));
        assert_eq!(is_routine_call("square(50)", &NAMES), call("square", &["50"]));
        assert_eq!(is_routine_call("square()", &NAMES), call("square", &[]));
        assert_eq!(is_routine_call("square with", &NAMES), call("square", &[]));
        assert_eq!(is_routine_call("run square with", &NAMES), call("square", &[]));
    }

    #[test]
    fn test_case_and_spacing() {
        assert_eq!(is_routine_call("  Run   SQUARE  ", &NAMES), call("square", &[]));
        assert_eq!(
            is_routine_call("call grab object with 90", &NAMES),
            call("grab_object", &["90"])
        );
        assert_eq!(is_routine_call("grab_object (45)", &NAMES), call("grab_object", &["45"]));
    }

    #[test]
    fn test_declines_non_calls() {
        assert_eq!(is_routine_call("move forward 100", &NAMES), None);
        assert_eq!(is_routine_call("run squares", &NAMES), None);
        assert_eq!(is_routine_call("square without", &NAMES), None);
        assert_eq!(is_routine_call("", &NAMES), None);
        assert_eq!(is_routine_call("square", &[] as &[&str]), None);
    }

    #[test]
    fn test_first_listed_name_wins() {
        let names = ["spin", "spin_fast"];
        assert_eq!(is_routine_call("run spin fast", &names), call("spin_fast", &[]));
        assert_eq!(is_routine_call("run spin", &names), call("spin", &[]));
    }

    #[test]
    fn test_generate_routine_call() {
        assert_eq!(generate_routine_call("square", &["100"]), "square(100)");
        assert_eq!(generate_routine_call("Grab Object", &[" 1", "2 "]), "grab_object(1, 2)");
        assert_eq!(generate_routine_call("noop", &[] as &[&str]), "noop()");
    }
}
