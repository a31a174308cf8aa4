//! Common utilities and types shared across Huddle components.

#![warn(clippy::pedantic)]

/// Module for identifier newtypes (sessions, streams, connections)
pub mod types;

/// Module for secret types that prevent accidental logging
pub mod secret;

/// Module for tracing subscriber setup
pub mod logging;
