// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use crate::errors::GraphError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from the project store and from dispatching to the external framework.
#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("Project '{}' already exists. Change user or sample name", .0.display())]
    AlreadyExists(PathBuf),

    #[error("There is no project with this name: {name} (looked in '{}')", .path.display())]
    NotFound { name: String, path: PathBuf },

    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed project file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("No file found in {pattern} after {attempts} attempts. Make sure that the acquisition has been started")]
    NoInputFiles { pattern: String, attempts: u32 },

    #[error("Waiting for acquisition cancelled by the user")]
    Cancelled,

    #[error("Empty command line for {0}")]
    EmptyCommand(&'static str),

    #[error("Failed to run '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error(transparent)]
    Graph(#[from] GraphError),
}
