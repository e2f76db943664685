// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Waiting for the microscope to deposit movies, gain lookup and the
//! acquisition simulator.

use crate::config::consts::{INPUT_RETRY_ATTEMPTS, INPUT_RETRY_DELAY};
use crate::config::WorkflowConfig;
use crate::errors::ProjectError;
use crate::observability::messages::project::{
    CommandLaunched, GainFileLookup, WaitingForAcquisition,
};
use crate::observability::messages::StructuredLog;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::process::{Child, Command};

/// How many times to look again for input files, and how long to wait.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: INPUT_RETRY_ATTEMPTS,
            delay: INPUT_RETRY_DELAY,
        }
    }
}

/// What the user answered to a retry prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAnswer {
    Continue,
    Cancel,
}

/// `*` and `?` wildcard match of a single file name.
pub fn wildcard_match(pattern: &str, name: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let n: Vec<char> = name.chars().collect();
    let (mut pi, mut ni) = (0, 0);
    // last `*` seen and the name position it was tried at
    let mut star: Option<(usize, usize)> = None;

    while ni < n.len() {
        match p.get(pi).copied() {
            Some('*') => {
                star = Some((pi, ni));
                pi += 1;
            }
            Some(c) if c == '?' || c == n[ni] => {
                pi += 1;
                ni += 1;
            }
            _ => match star {
                Some((sp, sn)) => {
                    pi = sp + 1;
                    ni = sn + 1;
                    star = Some((sp, sn + 1));
                }
                None => return false,
            },
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

fn has_wildcard(component: &str) -> bool {
    component.contains(['*', '?'])
}

/// Files matching `pattern`, sorted. Wildcards may appear in any path
/// component. Hidden entries only match a pattern that starts with `.`.
pub fn glob_files(pattern: &str) -> Vec<PathBuf> {
    let pattern = Path::new(pattern);
    let mut candidates = vec![PathBuf::new()];

    for component in pattern.components() {
        let part = match component {
            Component::Normal(part) => part.to_string_lossy(),
            other => {
                for candidate in &mut candidates {
                    candidate.push(other.as_os_str());
                }
                continue;
            }
        };

        let mut next = Vec::new();
        for base in &candidates {
            if !has_wildcard(&part) {
                let path = base.join(&*part);
                if path.exists() {
                    next.push(path);
                }
                continue;
            }
            let dir = if base.as_os_str().is_empty() {
                Path::new(".")
            } else {
                base.as_path()
            };
            let Ok(entries) = std::fs::read_dir(dir) else {
                continue;
            };
            for entry in entries.flatten() {
                let name = entry.file_name();
                let name = name.to_string_lossy();
                if name.starts_with('.') && !part.starts_with('.') {
                    continue;
                }
                if wildcard_match(&part, &name) {
                    next.push(base.join(&*name));
                }
            }
        }
        candidates = next;
        if candidates.is_empty() {
            break;
        }
    }

    candidates.retain(|p| !p.as_os_str().is_empty());
    candidates.sort();
    candidates
}

/// Wait until the deposition pattern matches something.
///
/// After each empty look `prompt` is shown the retry message and may cancel.
/// Once every retry is spent the wait fails with
/// [`ProjectError::NoInputFiles`].
pub async fn wait_for_acquisition<F>(
    pattern: &str,
    policy: RetryPolicy,
    mut prompt: F,
) -> Result<Vec<PathBuf>, ProjectError>
where
    F: FnMut(&str) -> PromptAnswer,
{
    let mut attempt = 1;
    loop {
        let found = glob_files(pattern);
        if !found.is_empty() {
            return Ok(found);
        }
        if attempt > policy.attempts {
            return Err(ProjectError::NoInputFiles {
                pattern: pattern.to_string(),
                attempts: policy.attempts,
            });
        }

        WaitingForAcquisition {
            pattern,
            attempt,
            max_attempts: policy.attempts,
        }
        .log();
        let next = if attempt < policy.attempts {
            format!("Retrying... ({}/{})", attempt, policy.attempts)
        } else {
            "Last try...".to_string()
        };
        let message = format!(
            "No file found in {}.\nMake sure that the acquisition has been started.\n\n{}",
            pattern, next
        );
        if prompt(&message) == PromptAnswer::Cancel {
            return Err(ProjectError::Cancelled);
        }

        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}

/// First file in `dir` matching the gain pattern, if any.
pub fn find_gain_file(dir: &Path, pattern: &str) -> Option<PathBuf> {
    if pattern.is_empty() {
        return None;
    }
    let full = dir.join(pattern);
    let full = full.to_string_lossy();
    let matches = glob_files(&full);
    if matches.len() != 1 {
        GainFileLookup {
            pattern: &full,
            matches: matches.len(),
        }
        .log();
    }
    matches.into_iter().next()
}

/// Start the acquisition simulator in the background.
///
/// It is called as `<command> <raw data pattern> <deposition dir> <timeout>
/// <gain file>`, where the gain file is looked up among the raw data.
pub fn launch_simulation(cfg: &WorkflowConfig) -> Result<Child, ProjectError> {
    let acq = &cfg.acquisition;
    let raw_data = Path::new(&acq.raw_data_sim);
    let raw_pattern = raw_data.join(&acq.pattern);
    let gain = find_gain_file(raw_data, &acq.gain_pattern)
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts = cfg.project.simulation_cmd.split_whitespace();
    let program = parts.next().ok_or(ProjectError::EmptyCommand("simulation"))?;
    let args: Vec<String> = parts
        .map(str::to_string)
        .chain([
            raw_pattern.to_string_lossy().into_owned(),
            acq.deposition_dir.to_string_lossy().into_owned(),
            (acq.timeout as i64).to_string(),
            gain,
        ])
        .collect();

    let command = format!("{} {}", program, args.join(" "));
    CommandLaunched {
        purpose: "acquisition simulation",
        command: &command,
    }
    .log();

    Command::new(program)
        .args(&args)
        .spawn()
        .map_err(|source| ProjectError::Spawn { command, source })
}
