// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::ProjectError;
use crate::graph::{NodeId, ProtocolNode};
use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use tokio::sync::Mutex;

/// The seam toward the external processing framework.
///
/// Dispatch hands protocols over one at a time, upstream first. Running them
/// is entirely up to the framework.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Queue one protocol of the project stored at `project`.
    async fn schedule(&self, project: &Path, node: &ProtocolNode) -> Result<(), ProjectError>;

    fn name(&self) -> &'static str;
}

/// Runs `<command> <project dir> <protocol id>` for every protocol.
#[derive(Debug, Clone)]
pub struct CommandScheduler {
    program: String,
    args: Vec<String>,
}

impl CommandScheduler {
    /// Split a command line such as `scipion schedule` on whitespace.
    pub fn new(command_line: &str) -> Result<Self, ProjectError> {
        let mut parts = command_line.split_whitespace().map(str::to_string);
        let program = parts.next().ok_or(ProjectError::EmptyCommand("scheduler"))?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[async_trait]
impl Scheduler for CommandScheduler {
    async fn schedule(&self, project: &Path, node: &ProtocolNode) -> Result<(), ProjectError> {
        let command = format!("{} {} {}", self.command_line(), project.display(), node.id);
        tracing::debug!(command = %command, "running scheduler command");

        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(project)
            .arg(node.id.to_string())
            .status()
            .await
            .map_err(|source| ProjectError::Spawn {
                command: command.clone(),
                source,
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ProjectError::CommandFailed {
                command,
                status: status.to_string(),
            })
        }
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

/// Only records what would be scheduled. Used for dry runs.
#[derive(Debug, Default)]
pub struct LogScheduler {
    scheduled: Mutex<Vec<NodeId>>,
}

impl LogScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn scheduled(&self) -> Vec<NodeId> {
        self.scheduled.lock().await.clone()
    }
}

#[async_trait]
impl Scheduler for LogScheduler {
    async fn schedule(&self, _project: &Path, node: &ProtocolNode) -> Result<(), ProjectError> {
        tracing::info!(node_id = node.id.0, label = %node.label, "dry run: would schedule");
        self.scheduled.lock().await.push(node.id);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "dry-run"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{ProtocolClass, Stage};

    fn node(id: u32) -> ProtocolNode {
        ProtocolNode::new(NodeId(id), ProtocolClass::CtfFind, "GrigorieffLab - CTFfind", Stage::Ctf)
    }

    #[test]
    fn command_line_is_split_on_whitespace() {
        let scheduler = CommandScheduler::new("  scipion   schedule ").unwrap();
        assert_eq!(scheduler.command_line(), "scipion schedule");
        assert!(matches!(
            CommandScheduler::new("   "),
            Err(ProjectError::EmptyCommand("scheduler"))
        ));
    }

    #[tokio::test]
    async fn log_scheduler_records_in_call_order() {
        let scheduler = LogScheduler::new();
        for id in [3, 1, 2] {
            scheduler.schedule(Path::new("/tmp/p"), &node(id)).await.unwrap();
        }
        assert_eq!(scheduler.scheduled().await, vec![NodeId(3), NodeId(1), NodeId(2)]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_command_is_reported() {
        let scheduler = CommandScheduler::new("false").unwrap();
        let err = scheduler
            .schedule(Path::new("/tmp/p"), &node(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ProjectError::CommandFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn succeeding_command_is_accepted() {
        let scheduler = CommandScheduler::new("true").unwrap();
        assert!(scheduler.schedule(Path::new("/tmp/p"), &node(1)).await.is_ok());
    }
}
