// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Errors raised while reading, casting and checking the launch configuration.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single problem found in the configuration.
///
/// Problems are collected rather than returned one at a time so that a user
/// fixing a config file sees everything wrong with it in one run.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigProblem {
    /// A key declared as mandatory has no value
    MissingMandatory { key: String },
    /// The key is not part of the schema
    UnknownKey { key: String },
    /// The value could not be cast to the declared type
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },
    /// A split value does not follow its expected layout
    BadFormat { label: String, example: &'static str },
    /// A `KEY=VALUE` override without the `=`
    MalformedOverride { arg: String },
}

impl fmt::Display for ConfigProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigProblem::MissingMandatory { key } => {
                write!(f, "Missing mandatory parameter: {}", key)
            }
            ConfigProblem::UnknownKey { key } => {
                write!(f, "Unknown parameter '{}'", key)
            }
            ConfigProblem::InvalidValue {
                key,
                value,
                expected,
            } => write!(f, "'{}' should be {} (got '{}')", key, expected, value),
            ConfigProblem::BadFormat { label, example } => {
                write!(f, "'{}' is not well formatted (ie. {})", label, example)
            }
            ConfigProblem::MalformedOverride { arg } => {
                write!(f, "Override '{}' must look like KEY=VALUE", arg)
            }
        }
    }
}

/// Errors that stop the launcher before any project is touched.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file '{}' not found. Mandatory parameters: {}", .path.display(), .mandatory.join(", "))]
    FileNotFound {
        path: PathBuf,
        mandatory: Vec<&'static str>,
    },

    #[error("Failed to read config file '{}': {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid INI in '{}': {source}", .path.display())]
    Ini {
        path: PathBuf,
        #[source]
        source: ini::ParseError,
    },

    #[error("Invalid TOML in '{}': {source}", .path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid YAML in '{}': {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Problem reading the configuration:\n  - {}", join_problems(.problems))]
    Invalid { problems: Vec<ConfigProblem> },

    #[error("Some incompatible parameters found:\n  - {}", .problems.join("\n  - "))]
    Incompatible { problems: Vec<String> },
}

impl ConfigError {
    /// Problems carried by an `Invalid` error, empty for every other variant.
    pub fn problems(&self) -> &[ConfigProblem] {
        match self {
            ConfigError::Invalid { problems } => problems,
            _ => &[],
        }
    }
}

fn join_problems(problems: &[ConfigProblem]) -> String {
    problems
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join("\n  - ")
}
