//! User-defined routines embedded in a script
//!
//! A routine opens with a header line such as `define square with size:` and
//! owns the indented lines that follow it:
//!
//! ```text
//! define square with size:
//!     move forward size
//!     turn right 90
//! move forward 100
//! ```
//!
//! Every other line is main code. Body lines are compiled through the same
//! command matchers as main code, with parameter names standing in for
//! numbers.

use crate::calls::generate_routine_call;
use crate::config::RobotDefaults;
use crate::error::ParseError;
use crate::parser::{parse_command, ParseOutcome};
use regex::{NoExpand, Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use uuid::Uuid;

const INDENT: &str = "    ";

/// A named, parameterized command sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Routine {
    pub id: Uuid,
    /// Normalized identifier, see [`normalize_routine_name`]
    pub name: String,
    /// Normalized parameter names in declaration order
    pub parameters: Vec<String>,
    /// Body lines as written, without indentation
    pub body: String,
}

impl Routine {
    pub fn new(name: &str, parameters: &[&str], body: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: normalize_routine_name(name),
            parameters: parameters
                .iter()
                .map(|p| normalize_routine_name(p))
                .collect(),
            body: body.to_string(),
        }
    }

    /// Order named arguments by the declared parameters. Missing ones become `None`.
    pub fn bind_arguments(&self, args: &HashMap<String, String>) -> Vec<String> {
        self.parameters
            .iter()
            .map(|param| {
                args.get(param)
                    .map(|value| value.trim().to_string())
                    .unwrap_or_else(|| "None".to_string())
            })
            .collect()
    }
}

/// A routine together with its compiled definition.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedRoutine {
    pub routine: Routine,
    /// `def name(params):` block
    pub code: String,
    /// Body lines that did not compile; the rest of the routine still does
    pub errors: Vec<ParseError>,
}

/// Routines found in a script plus the remaining main-code lines.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExtractedRoutines {
    pub routines: Vec<ParsedRoutine>,
    pub main_code: Vec<String>,
}

/// Lowercase identifier made of `a-z`, `0-9` and `_`.
pub fn normalize_routine_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else if (c.is_whitespace() || c == '-') && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        return "routine".to_string();
    }
    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

fn header_regex() -> &'static Regex {
    static HEADER_REGEX: OnceLock<Regex> = OnceLock::new();
    HEADER_REGEX.get_or_init(|| {
        Regex::new(r"(?i)^define\s+(.+?)(?:\s+with\s+(.+?))?\s*:(.*)$")
            .expect("Invalid regex pattern - this is a bug")
    })
}

fn starts_with_define(line: &str) -> bool {
    line.trim_start()
        .get(..6)
        .is_some_and(|head| head.eq_ignore_ascii_case("define"))
}

/// Split raw text into logical lines.
///
/// Header lines stay whole. Other lines are split on `;` and each piece keeps
/// the indentation of its physical line. Empty physical lines survive as `""`.
pub fn split_logical_lines(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for line in text.lines() {
        if line.trim().is_empty() {
            lines.push(String::new());
            continue;
        }
        if starts_with_define(line) {
            lines.push(line.to_string());
            continue;
        }
        let indent: String = line.chars().take_while(|c| c.is_whitespace()).collect();
        lines.extend(
            line.split(';')
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(|piece| format!("{indent}{piece}")),
        );
    }
    lines
}

fn is_indented(line: &str) -> bool {
    !line.trim().is_empty() && line.starts_with([' ', '\t'])
}

struct Header {
    name: String,
    parameters: Vec<String>,
    inline_body: Vec<String>,
}

fn parse_header(line: &str) -> Option<Header> {
    let caps = header_regex().captures(line.trim())?;
    let name = caps.get(1)?.as_str();
    let parameters = caps
        .get(2)
        .map(|m| {
            m.as_str()
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(normalize_routine_name)
                .collect()
        })
        .unwrap_or_default();
    let inline_body = caps
        .get(3)
        .map(|m| {
            m.as_str()
                .split(';')
                .map(str::trim)
                .filter(|piece| !piece.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    Some(Header {
        name: normalize_routine_name(name),
        parameters,
        inline_body,
    })
}

/// Separate routine definitions from main code and compile each definition.
pub fn extract_routines(text: &str, defaults: &RobotDefaults) -> ExtractedRoutines {
    let lines = split_logical_lines(text);
    let mut extracted = ExtractedRoutines::default();
    let mut i = 0;

    while i < lines.len() {
        let line = &lines[i];
        i += 1;

        if !starts_with_define(line) {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                extracted.main_code.push(trimmed.to_string());
            }
            continue;
        }

        let Some(header) = parse_header(line) else {
            tracing::warn!(line = line.as_str(), "define line without ':' treated as a command");
            extracted.main_code.push(line.trim().to_string());
            continue;
        };

        let mut body = header.inline_body;
        while i < lines.len() {
            if is_indented(&lines[i]) {
                body.push(lines[i].trim().to_string());
                i += 1;
                continue;
            }
            // blank lines belong to the body only if more body follows
            let next = lines[i..].iter().position(|l| !l.trim().is_empty());
            match next {
                Some(offset) if offset > 0 && is_indented(&lines[i + offset]) => i += offset,
                _ => break,
            }
        }

        let routine = Routine {
            id: Uuid::new_v4(),
            name: header.name,
            parameters: header.parameters,
            body: body.join("\n"),
        };
        let parsed = compile_routine(&routine, defaults);

        match extracted
            .routines
            .iter_mut()
            .find(|existing| existing.routine.name == parsed.routine.name)
        {
            Some(existing) => *existing = parsed,
            None => extracted.routines.push(parsed),
        }
    }

    tracing::debug!(
        routines = extracted.routines.len(),
        main_lines = extracted.main_code.len(),
        "extracted routines"
    );
    extracted
}

/// Compile a routine body into a `def` block.
pub fn compile_routine(routine: &Routine, defaults: &RobotDefaults) -> ParsedRoutine {
    let substitutions: Vec<(Regex, String)> = routine
        .parameters
        .iter()
        .filter_map(|param| {
            let pattern = format!(r"\b{}\b", regex::escape(param));
            match RegexBuilder::new(&pattern).case_insensitive(true).build() {
                Ok(re) => Some((re, format!("{{{param}}}"))),
                Err(e) => {
                    tracing::warn!(param = param.as_str(), error = %e, "skipping parameter");
                    None
                }
            }
        })
        .collect();

    let mut statements = Vec::new();
    let mut errors = Vec::new();

    for line in routine.body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let mut substituted = line.to_string();
        for (re, placeholder) in &substitutions {
            substituted = re
                .replace_all(&substituted, NoExpand(placeholder.as_str()))
                .into_owned();
        }

        let result = parse_command(&substituted, defaults);
        let reason = match result.outcome {
            ParseOutcome::Code(code) => {
                statements.extend(code.lines().map(str::to_string));
                continue;
            }
            ParseOutcome::Clarification(request) => {
                ParseError::MissingValue(request.kind).to_string()
            }
            ParseOutcome::Failed(error) => error.to_string(),
        };

        tracing::warn!(routine = routine.name.as_str(), line, %reason, "routine line skipped");
        errors.push(ParseError::MalformedRoutineDefinition {
            routine: routine.name.clone(),
            line: line.to_string(),
            reason,
        });
    }

    let mut code = format!("def {}({}):", routine.name, routine.parameters.join(", "));
    if statements.is_empty() {
        code.push('\n');
        code.push_str(INDENT);
        code.push_str("pass");
    }
    for statement in &statements {
        code.push('\n');
        code.push_str(INDENT);
        code.push_str(statement);
    }

    ParsedRoutine {
        routine: routine.clone(),
        code,
        errors,
    }
}

/// Routines keyed by name, remembering first-definition order.
#[derive(Debug, Clone, Default)]
pub struct RoutineLibrary {
    routines: HashMap<String, Routine>,
    order: Vec<String>,
}

impl RoutineLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite by name. An overwritten routine keeps its id and
    /// position; the previous version is returned.
    pub fn upsert(&mut self, mut routine: Routine) -> Option<Routine> {
        match self.routines.get_mut(&routine.name) {
            Some(existing) => {
                routine.id = existing.id;
                Some(std::mem::replace(existing, routine))
            }
            None => {
                self.order.push(routine.name.clone());
                self.routines.insert(routine.name.clone(), routine);
                None
            }
        }
    }

    pub fn merge<I>(&mut self, parsed: I)
    where
        I: IntoIterator<Item = ParsedRoutine>,
    {
        for entry in parsed {
            self.upsert(entry.routine);
        }
    }

    pub fn get(&self, name: &str) -> Option<&Routine> {
        self.routines.get(&normalize_routine_name(name))
    }

    /// Names in first-definition order.
    pub fn names(&self) -> Vec<&str> {
        self.order.iter().map(String::as_str).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Routine> {
        self.order.iter().filter_map(|name| self.routines.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Call statement for a known routine from named arguments.
    ///
    /// Arguments are ordered by the routine's declared parameters; missing
    /// ones are passed as `None`. Returns `None` for an unknown routine.
    pub fn generate_call(&self, name: &str, args: &HashMap<String, String>) -> Option<String> {
        let routine = self.get(name)?;
        Some(generate_routine_call(&routine.name, &routine.bind_arguments(args)))
    }

    /// Compile every routine, in definition order.
    pub fn compile_all(&self, defaults: &RobotDefaults) -> Vec<ParsedRoutine> {
        self.iter()
            .map(|routine| compile_routine(routine, defaults))
            .collect()
    }
}
