// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for the project store, the acquisition wait loop and dispatch.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::path::Path;
use tracing::Span;

/// A project directory was created.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ProjectCreated<'a> {
    pub name: &'a str,
    pub path: &'a Path,
}

impl Display for ProjectCreated<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Project '{}' created at {}", self.name, self.path.display())
    }
}

impl StructuredLog for ProjectCreated<'_> {
    fn log(&self) {
        tracing::info!(name = self.name, path = %self.path.display(), "{}", self);
    }
}

/// A dispatch pass over a project is starting.
///
/// # Log Level
/// `info!` - Important operational event
pub struct DispatchStarted<'a> {
    pub project: &'a Path,
    pub scheduler: &'a str,
    pub protocol_count: usize,
}

impl Display for DispatchStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduling {} protocols of {} with {}",
            self.protocol_count,
            self.project.display(),
            self.scheduler
        )
    }
}

impl StructuredLog for DispatchStarted<'_> {
    fn log(&self) {
        tracing::info!(
            project = %self.project.display(),
            scheduler = self.scheduler,
            protocol_count = self.protocol_count,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!(
            "dispatch",
            span_name = name,
            project = %self.project.display(),
        )
    }
}

/// A protocol was handed to the external scheduler.
///
/// # Log Level
/// `info!` - Important operational event
///
/// # Example
/// ```
/// use cryobox::observability::messages::project::ProtocolScheduled;
///
/// let msg = ProtocolScheduled {
///     node_id: 7,
///     class: "ProtCTFFind",
///     label: "GrigorieffLab - CTFfind",
/// };
///
/// tracing::info!("{}", msg);
/// ```
pub struct ProtocolScheduled<'a> {
    pub node_id: u32,
    pub class: &'a str,
    pub label: &'a str,
}

impl Display for ProtocolScheduled<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Scheduled '{}' protocol {} named '{}'",
            self.class, self.node_id, self.label
        )
    }
}

impl StructuredLog for ProtocolScheduled<'_> {
    fn log(&self) {
        tracing::info!(
            node_id = self.node_id,
            class = self.class,
            label = self.label,
            "{}", self
        );
    }
}

/// A protocol matched the ignore list and was left unscheduled.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct ProtocolSkipped<'a> {
    pub node_id: u32,
    pub class: &'a str,
    pub label: &'a str,
}

impl Display for ProtocolSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Not scheduling '{}' protocol named '{}'",
            self.class, self.label
        )
    }
}

impl StructuredLog for ProtocolSkipped<'_> {
    fn log(&self) {
        tracing::warn!(
            node_id = self.node_id,
            class = self.class,
            label = self.label,
            "{}", self
        );
    }
}

/// No acquisition files yet, another attempt will follow.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct WaitingForAcquisition<'a> {
    pub pattern: &'a str,
    pub attempt: u32,
    pub max_attempts: u32,
}

impl Display for WaitingForAcquisition<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "No file found in {} (attempt {}/{})",
            self.pattern, self.attempt, self.max_attempts
        )
    }
}

impl StructuredLog for WaitingForAcquisition<'_> {
    fn log(&self) {
        tracing::warn!(
            pattern = self.pattern,
            attempt = self.attempt,
            max_attempts = self.max_attempts,
            "{}", self
        );
    }
}

/// Gain file lookup outcome when it is not a single clean match.
///
/// # Log Level
/// `warn!` - Potential issue or degraded behavior
pub struct GainFileLookup<'a> {
    pub pattern: &'a str,
    pub matches: usize,
}

impl Display for GainFileLookup<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        if self.matches == 0 {
            write!(
                f,
                "No gain file found for '{}', proceeding without applying it",
                self.pattern
            )
        } else {
            write!(
                f,
                "{} gain files found for '{}', using only the first",
                self.matches, self.pattern
            )
        }
    }
}

impl StructuredLog for GainFileLookup<'_> {
    fn log(&self) {
        tracing::warn!(pattern = self.pattern, matches = self.matches, "{}", self);
    }
}

/// An external command (simulation, scheduler) was started.
///
/// # Log Level
/// `info!` - Important operational event
pub struct CommandLaunched<'a> {
    pub purpose: &'a str,
    pub command: &'a str,
}

impl Display for CommandLaunched<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Launching {}: {}", self.purpose, self.command)
    }
}

impl StructuredLog for CommandLaunched<'_> {
    fn log(&self) {
        tracing::info!(purpose = self.purpose, command = self.command, "{}", self);
    }
}

/// Label colors were written to the project settings.
///
/// # Log Level
/// `info!` - Important operational event
pub struct LabelsApplied {
    pub label_count: usize,
    pub node_count: usize,
}

impl Display for LabelsApplied {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Applied {} labels to {} protocols",
            self.label_count, self.node_count
        )
    }
}

impl StructuredLog for LabelsApplied {
    fn log(&self) {
        tracing::info!(
            label_count = self.label_count,
            node_count = self.node_count,
            "{}", self
        );
    }
}
