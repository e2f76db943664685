// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Observability module for structured logging and tracing.
//!
//! This module provides centralized message types for all diagnostic and operational
//! logging throughout cryobox. Message types follow a struct-based pattern
//! with `Display` trait implementation to:
//!
//! * Eliminate magic strings scattered throughout the codebase
//! * Keep field names consistent between the human message and structured fields
//!
//! # Architecture
//!
//! Messages are organized by subsystem:
//! * `messages::config` - configuration reading, casting and derived values
//! * `messages::graph` - protocol registration and branch decisions
//! * `messages::project` - project store, acquisition wait and dispatch events
//!
//! # Usage
//!
//! ```rust
//! use cryobox::observability::messages::StructuredLog;
//! use cryobox::observability::messages::project::ProtocolScheduled;
//!
//! let msg = ProtocolScheduled {
//!     node_id: 3,
//!     class: "XmippProtMovieGain",
//!     label: "Xmipp - movie gain",
//! };
//!
//! msg.log();
//! ```

pub mod messages;

#[cfg(test)]
mod recorder;
#[cfg(test)]
pub(crate) use recorder::SpanRecorder;
