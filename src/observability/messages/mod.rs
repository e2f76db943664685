// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Centralized message types for structured logging.
//!
//! Each message type implements `Display` for the human-readable line and
//! `StructuredLog` to emit the same event with its fields attached.
//!
//! # Organization
//!
//! * `config` - configuration loading and casting
//! * `graph` - workflow graph assembly
//! * `project` - project persistence, acquisition and scheduling

use tracing::Span;

pub mod config;
pub mod graph;
pub mod project;

/// Emit a message as a tracing event (and optionally open a span) at the
/// level the message type owns.
pub trait StructuredLog {
    fn log(&self);

    fn span(&self, _name: &str) -> Span {
        Span::none()
    }
}
