// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for configuration events.
//!
//! This module contains message types for logging events related to:
//! * Reading the config file and command-line overrides
//! * Casting each value according to the schema
//! * Filling derived values (project name, paths, patterns)

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// Config file read, before casting.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use cryobox::observability::messages::config::ConfigFileRead;
/// use std::path::Path;
///
/// let msg = ConfigFileRead {
///     path: Path::new("scipionbox.conf"),
///     key_count: 12,
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ConfigFileRead<'a> {
    pub path: &'a Path,
    pub key_count: usize,
}

impl Display for ConfigFileRead<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Reading conf file: {} ({} parameters)",
            self.path.display(),
            self.key_count
        )
    }
}

impl StructuredLog for ConfigFileRead<'_> {
    fn log(&self) {
        tracing::info!(
            path = %self.path.display(),
            key_count = self.key_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "config_load",
            span_name = name,
            path = %self.path.display(),
        )
    }
}

/// A raw value was cast according to its schema entry.
///
/// # Log Level
/// `debug!` - Per-value detail
pub struct ConfigValueCast<'a> {
    pub key: &'a str,
    pub raw: &'a str,
    pub cast: &'a str,
}

impl Display for ConfigValueCast<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.key, self.raw, self.cast)
    }
}

impl StructuredLog for ConfigValueCast<'_> {
    fn log(&self) {
        tracing::debug!(key = self.key, raw = self.raw, cast = self.cast, "{}", self);
    }
}

/// A command-line `KEY=VALUE` override replaced the file value.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConfigOverrideApplied<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl Display for ConfigOverrideApplied<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Overriding {} = {}", self.key, self.value)
    }
}

impl StructuredLog for ConfigOverrideApplied<'_> {
    fn log(&self) {
        tracing::info!(key = self.key, value = self.value, "{}", self);
    }
}

/// A field was changed in the interactive form.
///
/// # Log Level
/// `debug!` - Per-value detail
pub struct FormValueEdited<'a> {
    pub key: &'a str,
    pub previous: &'a str,
    pub value: &'a str,
}

impl Display for FormValueEdited<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{} changed from '{}' to '{}'", self.key, self.previous, self.value)
    }
}

impl StructuredLog for FormValueEdited<'_> {
    fn log(&self) {
        tracing::debug!(
            key = self.key,
            previous = self.previous,
            value = self.value,
            "{}", self
        );
    }
}

/// A value that was not configured has been derived from others.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DerivedValue<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

impl Display for DerivedValue<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Derived {}: {}", self.key, self.value)
    }
}

impl StructuredLog for DerivedValue<'_> {
    fn log(&self) {
        tracing::info!(key = self.key, value = self.value, "{}", self);
    }
}

/// Launch checks found incompatible parameters.
///
/// # Log Level
/// `error!` - Failure requiring attention
pub struct LaunchCheckFailed<'a> {
    pub problems: &'a [String],
}

impl Display for LaunchCheckFailed<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Some incompatible parameters found: {}",
            self.problems.join("; ")
        )
    }
}

impl StructuredLog for LaunchCheckFailed<'_> {
    fn log(&self) {
        tracing::error!(problem_count = self.problems.len(), "{}", self);
    }
}
