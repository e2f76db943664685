// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Casting of raw string values into typed configuration values.
//!
//! Every value, whether read from a file, passed with `--set` or typed into
//! the form, arrives as a string and goes through [`cast_value`].

use crate::config::schema::{CastKind, ConfKey};
use crate::errors::ConfigProblem;
use crate::observability::messages::config::ConfigValueCast;
use crate::observability::messages::StructuredLog;
use std::num::ParseIntError;

/// A value after casting.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Pair(i64, i64),
}

impl ConfValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfValue::Float(v) => Some(*v),
            ConfValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_pair(&self) -> Option<(i64, i64)> {
        match self {
            ConfValue::Pair(a, b) => Some((*a, *b)),
            _ => None,
        }
    }
}

/// Result of splitting a `first-last` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitInt {
    Parsed(i64, i64),
    /// No `-` separator. Casts to `(0, 0)` and is reported as a format error.
    Malformed,
}

impl SplitInt {
    pub fn pair(self) -> (i64, i64) {
        match self {
            SplitInt::Parsed(a, b) => (a, b),
            SplitInt::Malformed => (0, 0),
        }
    }
}

/// Expand a leading `~` and every `$VAR` / `${VAR}` reference.
///
/// Unset variables are left as written, the way a shell `expandvars` does.
pub fn expand_vars<F>(raw: &str, lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    let mut text = raw.to_string();
    if text == "~" || text.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            text = format!("{}{}", home.display(), &text[1..]);
        }
    }

    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;
    while i < chars.len() {
        if chars[i] != '$' {
            out.push(chars[i]);
            i += 1;
            continue;
        }

        let (name, consumed) = if chars.get(i + 1) == Some(&'{') {
            match chars[i + 2..].iter().position(|c| *c == '}') {
                Some(end) => (chars[i + 2..i + 2 + end].iter().collect::<String>(), end + 3),
                None => (String::new(), 0),
            }
        } else {
            let len = chars[i + 1..]
                .iter()
                .take_while(|c| c.is_ascii_alphanumeric() || **c == '_')
                .count();
            (chars[i + 1..i + 1 + len].iter().collect::<String>(), len + 1)
        };

        match (name.is_empty(), lookup(&name)) {
            (false, Some(value)) => {
                out.push_str(&value);
                i += consumed;
            }
            _ => {
                out.push('$');
                i += 1;
            }
        }
    }
    out
}

/// Integers are true when strictly positive; the usual words are accepted
/// in any case.
pub fn cast_bool(raw: &str) -> Option<bool> {
    let trimmed = raw.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        return Some(n > 0);
    }
    match trimmed.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" => Some(true),
        "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `""` is `(1, 0)`, `"a-b"` is `(a, b)`.
pub fn split_int(raw: &str) -> Result<SplitInt, ParseIntError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(SplitInt::Parsed(1, 0));
    }
    match trimmed.split_once('-') {
        Some((first, last)) => Ok(SplitInt::Parsed(
            first.trim().parse()?,
            last.trim().parse()?,
        )),
        None => Ok(SplitInt::Malformed),
    }
}

/// A product `a*b*c`, a left-folded quotient `a/b/c`, or a plain float.
pub fn split_times_float(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let fold = |sep: char, op: fn(f64, f64) -> f64| -> Option<f64> {
        let mut parts = trimmed.split(sep).map(|p| p.trim().parse::<f64>().ok());
        let first = parts.next()??;
        parts.try_fold(first, |acc, p| p.map(|v| op(acc, v)))
    };

    if trimmed.contains('*') {
        fold('*', |a, b| a * b)
    } else if trimmed.contains('/') {
        fold('/', |a, b| a / b)
    } else {
        trimmed.parse().ok()
    }
}

/// Cast a raw value for `key`, expanding environment variables first.
pub fn cast_value(key: ConfKey, raw: &str) -> Result<ConfValue, ConfigProblem> {
    cast_value_with(key, raw, |name| std::env::var(name).ok())
}

pub(crate) fn cast_value_with<F>(key: ConfKey, raw: &str, lookup: F) -> Result<ConfValue, ConfigProblem>
where
    F: Fn(&str) -> Option<String>,
{
    let expanded = expand_vars(raw, lookup);
    let cast = key.cast();
    let invalid = || ConfigProblem::InvalidValue {
        key: key.name().to_string(),
        value: expanded.clone(),
        expected: cast.expected(),
    };

    let value = match cast {
        CastKind::Int => ConfValue::Int(expanded.trim().parse().map_err(|_| invalid())?),
        CastKind::Float => ConfValue::Float(expanded.trim().parse().map_err(|_| invalid())?),
        CastKind::Bool => ConfValue::Bool(cast_bool(&expanded).ok_or_else(invalid)?),
        CastKind::Str | CastKind::Path => ConfValue::Str(expanded.clone()),
        CastKind::SplitInt => match split_int(&expanded).map_err(|_| invalid())? {
            SplitInt::Parsed(a, b) => ConfValue::Pair(a, b),
            SplitInt::Malformed => {
                return Err(ConfigProblem::BadFormat {
                    label: key.label().to_string(),
                    example: "2-15",
                })
            }
        },
        CastKind::SplitTimesFloat => {
            ConfValue::Float(split_times_float(&expanded).ok_or_else(invalid)?)
        }
    };

    ConfigValueCast {
        key: key.name(),
        raw,
        cast: &format!("{:?}", value),
    }
    .log();

    Ok(value)
}
