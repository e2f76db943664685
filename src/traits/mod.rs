// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod scheduler;

pub use scheduler::{CommandScheduler, LogScheduler, Scheduler};
