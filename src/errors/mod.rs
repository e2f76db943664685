// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod config;
mod graph;
mod project;

pub use config::{ConfigError, ConfigProblem};
pub use graph::{GraphError, ValidationError};
pub use project::ProjectError;
