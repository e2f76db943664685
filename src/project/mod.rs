// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Everything after the graph is built: the on-disk project, waiting for the
//! acquisition, dispatch to the scheduler and label replay.

mod acquisition;
mod dispatch;
mod settings;
mod store;

pub use acquisition::{
    find_gain_file, glob_files, launch_simulation, wait_for_acquisition, wildcard_match,
    PromptAnswer, RetryPolicy,
};
pub use dispatch::{is_ignored, schedule_graph, schedule_project, ScheduleReport};
pub use settings::{apply_labels, ColorMode, LabelDefinition, NodeLabels, ViewSettings};
pub use store::{ProjectStore, StoredWorkflow, LABELS_FILE, SETTINGS_FILE, WORKFLOW_FILE};
