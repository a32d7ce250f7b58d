//! Named, null-preserving value transforms applied to join-key columns.
//!
//! Every transform is total: garbage input degrades to `Value::Null`, never an error.
//! Lookup by name is the only fallible step ([`Transform::from_name`]).

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::ReconError;
use crate::value::Value;

/// Prefix stripped by `remove_prefix` when none is configured.
pub const DEFAULT_PREFIX: &str = "ext-";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transform {
    /// Strip a leading `ext`/`ext-` (any case), then parse an integer.
    RemovePrefixAndInt,
    /// Strip `prefix` when present; always yields text.
    RemovePrefix { prefix: String },
    ToInt,
    ToStr,
    Lowercase,
    Uppercase,
    StripWhitespace,
    /// Concatenate every digit run.
    ExtractDigits,
}

impl Transform {
    pub const NAMES: [&'static str; 8] = [
        "remove_prefix_and_int",
        "remove_prefix",
        "to_int",
        "to_str",
        "lowercase",
        "uppercase",
        "strip_whitespace",
        "extract_digits",
    ];

    pub fn from_name(name: &str) -> Result<Self, ReconError> {
        Ok(match name {
            "remove_prefix_and_int" => Self::RemovePrefixAndInt,
            "remove_prefix" => Self::RemovePrefix { prefix: DEFAULT_PREFIX.to_string() },
            "to_int" => Self::ToInt,
            "to_str" => Self::ToStr,
            "lowercase" => Self::Lowercase,
            "uppercase" => Self::Uppercase,
            "strip_whitespace" => Self::StripWhitespace,
            "extract_digits" => Self::ExtractDigits,
            other => return Err(ReconError::UnknownTransform { name: other.to_string() }),
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::RemovePrefixAndInt => "remove_prefix_and_int",
            Self::RemovePrefix { .. } => "remove_prefix",
            Self::ToInt => "to_int",
            Self::ToStr => "to_str",
            Self::Lowercase => "lowercase",
            Self::Uppercase => "uppercase",
            Self::StripWhitespace => "strip_whitespace",
            Self::ExtractDigits => "extract_digits",
        }
    }

    pub fn apply(&self, value: &Value) -> Value {
        if value.is_null() {
            return Value::Null;
        }
        match self {
            Self::RemovePrefixAndInt => {
                let s = value.to_string();
                let cleaned = ext_prefix().replace(&s, "");
                parse_int_or_first_run(&cleaned)
            }
            Self::RemovePrefix { prefix } => {
                let s = value.to_string();
                match s.strip_prefix(prefix.as_str()) {
                    Some(rest) => Value::Text(rest.to_string()),
                    None => Value::Text(s),
                }
            }
            Self::ToInt => match value {
                Value::Int(i) => Value::Int(*i),
                Value::Bool(b) => Value::Int(i64::from(*b)),
                Value::Float(f) if f.is_finite() && f.abs() < i64::MAX as f64 => {
                    Value::Int(f.trunc() as i64)
                }
                other => parse_int_or_first_run(&other.to_string()),
            },
            Self::ToStr => Value::Text(value.to_string()),
            Self::Lowercase => Value::Text(value.to_string().to_lowercase()),
            Self::Uppercase => Value::Text(value.to_string().to_uppercase()),
            Self::StripWhitespace => Value::Text(value.to_string().trim().to_string()),
            Self::ExtractDigits => {
                let s = value.to_string();
                let joined: String = digit_runs().find_iter(&s).map(|m| m.as_str()).collect();
                if joined.is_empty() {
                    Value::Null
                } else {
                    Value::Text(joined)
                }
            }
        }
    }

    pub fn apply_all<'a>(&self, values: impl Iterator<Item = &'a Value>) -> Vec<Value> {
        values.map(|v| self.apply(v)).collect()
    }
}

impl FromStr for Transform {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

fn digit_runs() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("valid regex"))
}

fn ext_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^ext-?").expect("valid regex"))
}

/// Whole-string integer parse, falling back to the first digit run.
fn parse_int_or_first_run(s: &str) -> Value {
    if let Ok(i) = s.trim().parse::<i64>() {
        return Value::Int(i);
    }
    digit_runs()
        .find(s)
        .and_then(|m| m.as_str().parse::<i64>().ok())
        .map_or(Value::Null, Value::Int)
}
