// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use std::time::Duration;

/// Config file read when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "scipionbox.conf";
/// Times the deposition folder is checked before giving up
pub const INPUT_RETRY_ATTEMPTS: u32 = 5;
/// Pause between two checks of the deposition folder
pub const INPUT_RETRY_DELAY: Duration = Duration::from_secs(3);
/// CPUs assumed when the host parallelism cannot be detected
pub const FALLBACK_CPUS: usize = 8;
/// Environment variable that overrides the configured acquisition pattern
pub const PATTERN_ENV_VAR: &str = "SCIPION_ACQUISITION_PATTERN";
/// Environment variable pointing at the Scipion user data folder
pub const USER_DATA_ENV_VAR: &str = "SCIPION_USER_DATA";
/// User data folder under `$HOME` when the variable is unset
pub const DEFAULT_USER_DATA_DIR: &str = "ScipionUserData";
