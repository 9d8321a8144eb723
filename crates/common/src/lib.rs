//! Shared error helpers and collaborator traits used across all realay crates.

pub mod error;
pub mod hooks;

pub use {
    error::FromMessage,
    hooks::{
        Localizer, Logger, NoopLocalizer, NoopPreCheckin, NullLogger, PreCheckinHook,
        RecordingLogger, TracingLogger,
    },
};
