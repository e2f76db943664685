// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod config;       // schema, loading, casting, launch checks
pub mod errors;       // error handling
pub mod form;         // interactive terminal form
pub mod graph;        // protocol catalog + workflow graph
pub mod observability;
pub mod project;      // project store, acquisition wait, dispatch
pub mod traits;       // scheduler seam
pub mod workflow;     // acquisition pipeline topology
