// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Checks run on a cast configuration before anything is created on disk.

use crate::config::settings::WorkflowConfig;
use crate::errors::ConfigError;
use crate::observability::messages::config::LaunchCheckFailed;
use crate::observability::messages::StructuredLog;

/// A name usable inside the project name: at least three characters, ASCII
/// alphanumeric at both ends, `_` and `-` allowed in between.
pub fn is_valid_name(name: &str) -> bool {
    let bytes = name.trim().as_bytes();
    if bytes.len() < 3 {
        return false;
    }
    let inner_ok = |b: &u8| b.is_ascii_alphanumeric() || *b == b'_' || *b == b'-';
    bytes[0].is_ascii_alphanumeric()
        && bytes[bytes.len() - 1].is_ascii_alphanumeric()
        && bytes[1..bytes.len() - 1].iter().all(inner_ok)
}

/// Parameter combinations the workflow cannot be built from.
///
/// Returns every problem found; an empty list means the launch can go on.
pub fn launch_problems(cfg: &WorkflowConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if !is_valid_name(&cfg.project.user) {
        problems.push(format!("Wrong username '{}'", cfg.project.user));
    }
    if !is_valid_name(&cfg.project.sample) {
        problems.push(format!("Wrong sample name '{}'", cfg.project.sample));
    }

    let picking = &cfg.picking;
    if !picking.manual_route() && !picking.any_automatic() {
        problems.push(
            "At least, one picker is needed. Choose crYOLO, Relion LoG, Sparx or DoG, \
             or fix the particle size to 0 for a manual picking."
                .to_string(),
        );
    }
    if picking.manual_route() && picking.mics_to_pick <= 0 {
        problems.push(
            "If no particle size is provided, a manual picking must be done. \
             Indicate some mics to manual pick (MICS2PICK)."
                .to_string(),
        );
    }
    if picking.wait_manual && picking.mics_to_pick <= 0 {
        problems.push("Waiting for the manual picking needs MICS2PICK > 0".to_string());
    }

    let c2d = &cfg.classify2d;
    let vol = &cfg.initial_volume;
    let c3d = &cfg.analysis3d;
    if c2d.enabled && !c2d.any_classifier() {
        problems.push("2D analysis is enabled but no 2D classifier is selected".to_string());
    }
    if vol.enabled && !c2d.enabled {
        problems.push("The initial volume estimation needs the 2D analysis".to_string());
    }
    if vol.enabled && !vol.any_estimator() {
        problems.push(
            "Initial volume estimation is enabled but no estimator is selected".to_string(),
        );
    }
    if c3d.enabled && !vol.enabled {
        problems.push("The 3D analysis needs an initial volume".to_string());
    }
    if c3d.full_size && c3d.enabled && !vol.enabled {
        problems.push("The full size extraction needs an initial volume".to_string());
    }
    if c2d.enabled && c2d.sampling <= 0.0 {
        problems.push("The 2D analysis pixel size must be positive".to_string());
    }
    if c3d.enabled && c3d.sampling <= 0.0 {
        problems.push("The 3D analysis pixel size must be positive".to_string());
    }

    problems
}

/// [`launch_problems`] as a `Result`, logging the failure.
pub fn check_launch(cfg: &WorkflowConfig) -> Result<(), ConfigError> {
    into_result(launch_problems(cfg))
}

/// The deposition folder must exist and the project folder must not.
pub fn check_paths(cfg: &WorkflowConfig) -> Result<(), ConfigError> {
    let mut problems = Vec::new();
    let deposition = &cfg.acquisition.deposition_dir;
    // in simulation the folder is filled by the simulator itself
    if !cfg.acquisition.simulation && !deposition.exists() {
        problems.push(format!(
            "Data folder '{}' does not exist. Check the config file.",
            deposition.display()
        ));
    }
    let project = cfg.project_path();
    if project.exists() {
        problems.push(format!(
            "Project '{}' already exists. Change User or Sample name",
            project.display()
        ));
    }
    into_result(problems)
}

fn into_result(problems: Vec<String>) -> Result<(), ConfigError> {
    if problems.is_empty() {
        return Ok(());
    }
    LaunchCheckFailed {
        problems: &problems,
    }
    .log();
    Err(ConfigError::Incompatible { problems })
}
