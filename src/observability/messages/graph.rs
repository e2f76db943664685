// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Message types for workflow graph assembly.

use crate::observability::messages::StructuredLog;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tracing::Span;

/// A protocol node was created and registered under a stage label.
///
/// # Log Level
/// `debug!` - One line per node
///
/// # Example
/// ```
/// use cryobox::observability::messages::graph::ProtocolRegistered;
///
/// let msg = ProtocolRegistered {
///     node_id: 1,
///     class: "ProtImportMovies",
///     label: "import movies",
///     stage: "Movies",
/// };
///
/// tracing::debug!("{}", msg);
/// ```
pub struct ProtocolRegistered<'a> {
    pub node_id: u32,
    pub class: &'a str,
    pub label: &'a str,
    pub stage: &'a str,
}

impl Display for ProtocolRegistered<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Registered protocol {} '{}' ({}) under '{}'",
            self.node_id, self.label, self.class, self.stage
        )
    }
}

impl StructuredLog for ProtocolRegistered<'_> {
    fn log(&self) {
        tracing::debug!(
            node_id = self.node_id,
            class = self.class,
            label = self.label,
            stage = self.stage,
            "{}", self
        );
    }
}

/// Several pickers are enabled, so AND/OR consensus branches are built.
///
/// # Log Level
/// `info!` - Important operational event
pub struct ConsensusBranches<'a> {
    pub pickers: &'a [&'a str],
}

impl Display for ConsensusBranches<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "{} pickers enabled ({}): building AND and OR consensus branches",
            self.pickers.len(),
            self.pickers.join(", ")
        )
    }
}

impl StructuredLog for ConsensusBranches<'_> {
    fn log(&self) {
        tracing::info!(picker_count = self.pickers.len(), "{}", self);
    }
}

/// A single picker is enabled and feeds extraction directly.
///
/// # Log Level
/// `info!` - Important operational event
pub struct SinglePickerPassThrough<'a> {
    pub picker: &'a str,
}

impl Display for SinglePickerPassThrough<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Single picker '{}': no consensus needed", self.picker)
    }
}

impl StructuredLog for SinglePickerPassThrough<'_> {
    fn log(&self) {
        tracing::info!(picker = self.picker, "{}", self);
    }
}

/// A whole stage was left out by configuration.
///
/// # Log Level
/// `info!` - Important operational event
pub struct StageSkipped<'a> {
    pub stage: &'a str,
    pub switch: &'a str,
}

impl Display for StageSkipped<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Skipping {} ({} is off)", self.stage, self.switch)
    }
}

impl StructuredLog for StageSkipped<'_> {
    fn log(&self) {
        tracing::info!(stage = self.stage, switch = self.switch, "{}", self);
    }
}

/// Workflow assembly is starting; node registrations happen inside its span.
///
/// # Log Level
/// `debug!` - Build parameters
pub struct WorkflowBuildStarted<'a> {
    pub project: &'a str,
    pub simulation: bool,
    pub has_gain: bool,
}

impl Display for WorkflowBuildStarted<'_> {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "Assembling the workflow of '{}'", self.project)?;
        if self.simulation {
            write!(f, " (simulated session)")?;
        }
        Ok(())
    }
}

impl StructuredLog for WorkflowBuildStarted<'_> {
    fn log(&self) {
        tracing::debug!(
            project = self.project,
            simulation = self.simulation,
            has_gain = self.has_gain,
            "{}", self
        );
    }

    fn span(&self, name: &str) -> Span {
        tracing::info_span!("workflow_build", span_name = name, project = self.project)
    }
}

/// Workflow assembly finished.
///
/// # Log Level
/// `info!` - Important operational event
pub struct WorkflowBuilt {
    pub node_count: usize,
    pub label_count: usize,
    pub duration: Duration,
}

impl Display for WorkflowBuilt {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(
            f,
            "Workflow assembled: {} protocols under {} labels in {:?}",
            self.node_count, self.label_count, self.duration
        )
    }
}

impl StructuredLog for WorkflowBuilt {
    fn log(&self) {
        tracing::info!(
            node_count = self.node_count,
            label_count = self.label_count,
            duration_ms = self.duration.as_millis() as u64,
            "{}", self
        );
    }
}
