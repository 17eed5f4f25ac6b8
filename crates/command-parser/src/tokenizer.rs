//! Lexical tokenization of command lines
//!
//! A line is lowercased, stripped of sentence punctuation and split on
//! whitespace. Each word is classified against the vocabulary tables, with a
//! conservative fuzzy fallback for longer words so that typos such as
//! `forwrad` still resolve.

use crate::fuzzy::closest_match;
use crate::vocabulary::{self, vocabulary};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Maximum edit distance accepted by the fuzzy fallback.
const FUZZY_MAX_DISTANCE: usize = 2;
/// Shorter words are never fuzzy matched.
const FUZZY_MIN_LEN: usize = 4;

/// Normalized travel or turn direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    fn from_table_word(word: &str) -> Option<Self> {
        if vocabulary::FORWARD_WORDS.contains(&word) {
            Some(Direction::Forward)
        } else if vocabulary::BACKWARD_WORDS.contains(&word) {
            Some(Direction::Backward)
        } else if vocabulary::LEFT_WORDS.contains(&word) {
            Some(Direction::Left)
        } else if vocabulary::RIGHT_WORDS.contains(&word) {
            Some(Direction::Right)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Value carried by a number token.
///
/// Routine bodies refer to their parameters by name; those words are read as
/// symbolic numbers so the matchers can treat them like literals.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Numeric {
    Literal(f64),
    Param(String),
}

impl Numeric {
    /// Render `self * factor`, negated when requested, as a code expression.
    ///
    /// Literals are truncated toward zero to whole numbers.
    pub fn render(&self, factor: f64, negate: bool) -> String {
        match self {
            Numeric::Literal(value) => {
                let mut scaled = value * factor;
                if negate {
                    scaled = -scaled;
                }
                format!("{}", scaled.trunc() as i64)
            }
            Numeric::Param(name) => {
                let sign = if negate { "-" } else { "" };
                if factor == 1.0 {
                    format!("{sign}{name}")
                } else {
                    format!("{sign}{name} * {}", factor as i64)
                }
            }
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Numeric::Literal(value) => Some(*value),
            Numeric::Param(_) => None,
        }
    }

    /// Zero literals carry no information for rate overrides.
    pub fn is_zero(&self) -> bool {
        matches!(self, Numeric::Literal(value) if *value == 0.0)
    }
}

/// Classification label of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Verb,
    Direction,
    Number,
    Unit,
    Color,
    Motor,
    Speed,
    Word,
    Unknown,
}

/// One classified word of a command line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Token {
    Verb {
        raw: String,
        normalized: &'static str,
    },
    Direction {
        raw: String,
        direction: Direction,
    },
    Number {
        raw: String,
        value: Numeric,
    },
    Unit {
        raw: String,
        normalized: &'static str,
    },
    Color {
        raw: String,
        normalized: &'static str,
    },
    Motor {
        raw: String,
    },
    Speed {
        raw: String,
    },
    Word {
        raw: String,
    },
    Unknown {
        raw: String,
    },
}

impl Token {
    pub fn kind(&self) -> TokenKind {
        match self {
            Token::Verb { .. } => TokenKind::Verb,
            Token::Direction { .. } => TokenKind::Direction,
            Token::Number { .. } => TokenKind::Number,
            Token::Unit { .. } => TokenKind::Unit,
            Token::Color { .. } => TokenKind::Color,
            Token::Motor { .. } => TokenKind::Motor,
            Token::Speed { .. } => TokenKind::Speed,
            Token::Word { .. } => TokenKind::Word,
            Token::Unknown { .. } => TokenKind::Unknown,
        }
    }

    /// Text as it appeared in the (lowercased) input.
    pub fn raw(&self) -> &str {
        match self {
            Token::Verb { raw, .. }
            | Token::Direction { raw, .. }
            | Token::Number { raw, .. }
            | Token::Unit { raw, .. }
            | Token::Color { raw, .. }
            | Token::Motor { raw }
            | Token::Speed { raw }
            | Token::Word { raw }
            | Token::Unknown { raw } => raw.as_str(),
        }
    }

    pub fn normalized(&self) -> Option<&str> {
        match self {
            Token::Verb { normalized, .. }
            | Token::Unit { normalized, .. }
            | Token::Color { normalized, .. } => Some(*normalized),
            Token::Direction { direction, .. } => Some(direction.as_str()),
            _ => None,
        }
    }

    pub fn numeric(&self) -> Option<&Numeric> {
        match self {
            Token::Number { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn numeric_value(&self) -> Option<f64> {
        self.numeric().and_then(Numeric::as_f64)
    }

    pub fn direction(&self) -> Option<Direction> {
        match self {
            Token::Direction { direction, .. } => Some(*direction),
            _ => None,
        }
    }

    /// True if this is a verb whose normalized form is one of `verbs`.
    pub fn is_verb_in(&self, verbs: &[&str]) -> bool {
        matches!(self, Token::Verb { normalized, .. } if verbs.contains(normalized))
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Token::Number { .. })
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Verb => "verb",
            TokenKind::Direction => "direction",
            TokenKind::Number => "number",
            TokenKind::Unit => "unit",
            TokenKind::Color => "color",
            TokenKind::Motor => "motor",
            TokenKind::Speed => "speed",
            TokenKind::Word => "word",
            TokenKind::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

fn number_regex() -> &'static Regex {
    static NUMBER_REGEX: OnceLock<Regex> = OnceLock::new();
    NUMBER_REGEX.get_or_init(|| {
        Regex::new(r"^(-?\d+(?:\.\d+)?)([a-z]*)$").expect("Invalid regex pattern - this is a bug")
    })
}

fn placeholder_regex() -> &'static Regex {
    static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"^\{([a-z_][a-z0-9_]*)\}([a-z]*)$")
            .expect("Invalid regex pattern - this is a bug")
    })
}

/// Split a line into classified tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(|c| match c {
            ',' | ':' | ';' | '!' | '?' => ' ',
            other => other,
        })
        .collect();

    let mut tokens = Vec::new();
    for word in cleaned.split_whitespace() {
        if let Some(caps) = number_regex().captures(word) {
            let digits = &caps[1];
            match digits.parse::<f64>() {
                Ok(value) => {
                    tokens.push(Token::Number {
                        raw: digits.to_string(),
                        value: Numeric::Literal(value),
                    });
                    push_suffix(&mut tokens, &caps[2]);
                    continue;
                }
                Err(_) => {
                    tracing::trace!(word, "numeric pattern did not parse as f64");
                }
            }
        }

        if let Some(caps) = placeholder_regex().captures(word) {
            let name = &caps[1];
            tokens.push(Token::Number {
                raw: format!("{{{name}}}"),
                value: Numeric::Param(name.to_string()),
            });
            push_suffix(&mut tokens, &caps[2]);
            continue;
        }

        tokens.push(classify_word(word));
    }

    tracing::trace!(?tokens, "tokenized");
    tokens
}

fn push_suffix(tokens: &mut Vec<Token>, suffix: &str) {
    if !suffix.is_empty() {
        tokens.push(classify_word(suffix));
    }
}

/// Classify one lowercase word.
pub fn classify_word(word: &str) -> Token {
    let raw = word.to_string();
    let vocab = vocabulary();

    if vocabulary::is_filler(word) {
        return Token::Word { raw };
    }
    if let Some(verb) = exact(&vocab.verbs, word) {
        return Token::Verb {
            raw,
            normalized: verb,
        };
    }
    if let Some(direction) = Direction::from_table_word(word) {
        return Token::Direction { raw, direction };
    }
    if let Some(unit) = exact(&vocab.units, word) {
        return Token::Unit {
            raw,
            normalized: unit,
        };
    }
    if let Some(color) = exact(vocabulary::COLORS, word) {
        return Token::Color {
            raw,
            normalized: normalize_color(color),
        };
    }
    if vocabulary::MOTOR_WORDS.contains(&word) {
        return Token::Motor { raw };
    }
    if vocabulary::SPEED_WORDS.contains(&word) {
        return Token::Speed { raw };
    }

    if word.chars().count() >= FUZZY_MIN_LEN && !vocabulary::FUZZY_BLACKLIST.contains(&word) {
        if let Some(token) = classify_fuzzy(word) {
            return token;
        }
    }

    Token::Unknown { raw }
}

/// Closest entry across the direction, unit, verb and color tables.
///
/// A smaller distance always wins over table order. On equal distance
/// directions come first, then units, verbs and colors. Verbs only compete
/// when they share the word's first letter.
fn classify_fuzzy(word: &str) -> Option<Token> {
    let vocab = vocabulary();
    let first = word.chars().next();
    let verbs: Vec<&'static str> = vocab
        .verbs
        .iter()
        .copied()
        .filter(|verb| verb.chars().next() == first)
        .collect();

    let (kind, entry, distance) = [
        (TokenKind::Direction, closest_match(word, &vocab.directions, FUZZY_MAX_DISTANCE)),
        (TokenKind::Unit, closest_match(word, &vocab.units, FUZZY_MAX_DISTANCE)),
        (TokenKind::Verb, closest_match(word, &verbs, FUZZY_MAX_DISTANCE)),
        (TokenKind::Color, closest_match(word, vocabulary::COLORS, FUZZY_MAX_DISTANCE)),
    ]
    .into_iter()
    .filter_map(|(kind, found)| found.map(|(entry, distance)| (kind, entry, distance)))
    .min_by_key(|(_, _, distance)| *distance)?;

    tracing::trace!(word, entry, distance, kind = %kind, "fuzzy match");
    let raw = word.to_string();
    match kind {
        TokenKind::Direction => {
            Direction::from_table_word(entry).map(|direction| Token::Direction { raw, direction })
        }
        TokenKind::Unit => Some(Token::Unit {
            raw,
            normalized: entry,
        }),
        TokenKind::Verb => Some(Token::Verb {
            raw,
            normalized: entry,
        }),
        TokenKind::Color => Some(Token::Color {
            raw,
            normalized: normalize_color(entry),
        }),
        _ => None,
    }
}

fn exact(table: &[&'static str], word: &str) -> Option<&'static str> {
    table.iter().find(|entry| **entry == word).copied()
}

fn normalize_color(color: &'static str) -> &'static str {
    if color == "grey" {
        "gray"
    } else {
        color
    }
}
