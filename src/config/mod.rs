// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

mod cast;
mod loader;
mod schema;
mod settings;
mod validation;

#[cfg(test)]
mod integration_tests;
#[cfg(test)]
pub(crate) use settings::tests as test_support;
pub mod consts;

pub use cast::{cast_bool, cast_value, expand_vars, split_int, split_times_float, ConfValue, SplitInt};
pub use loader::{load_config, load_raw, read_config_file, RawConfig};
pub use schema::{CastKind, ConfKey, KeySpec, Requirement};
pub use settings::{
    default_project_name, default_projects_path, AcquisitionSettings, AlignmentSettings,
    Analysis3dSettings, Classify2dSettings, GpuSelection, InitialVolumeSettings, PickingSettings,
    ProjectSettings, ResourceSettings, WorkflowConfig,
};
pub use validation::{check_launch, check_paths, is_valid_name, launch_problems};
