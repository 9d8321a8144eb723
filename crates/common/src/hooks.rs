//! Collaborator capabilities handed to the project core.
//!
//! The core never reaches for process-wide state: whoever builds a project
//! context decides where operator messages go, how a freshly checked-out
//! project file is localized, and what runs before a checkin.

use std::{
    io,
    path::Path,
    sync::{Arc, Mutex},
};

use tracing::info;

// ── Logger ──────────────────────────────────────────────────────────────────

/// Best-effort sink for operator-facing diagnostics.
///
/// Implementations must not fail and must not influence control flow.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
}

/// Forwards every message to `tracing` under the `realay` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "realay", "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _message: &str) {}
}

/// Keeps messages in memory so callers (and tests) can inspect them.
#[derive(Debug, Default, Clone)]
pub struct RecordingLogger {
    messages: Arc<Mutex<Vec<String>>>,
}

impl RecordingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages
            .lock()
            .map(|m| m.clone())
            .unwrap_or_default()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.messages().iter().any(|m| m.contains(needle))
    }
}

impl Logger for RecordingLogger {
    fn log(&self, message: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(message.to_string());
        }
    }
}

// ── Localizer ───────────────────────────────────────────────────────────────

/// Rewrites environment-specific references inside a checked-out primary
/// project file so it works on the checking-out user's machine.
pub trait Localizer: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &str;

    fn localize(&self, project_file: &Path, user: &str) -> io::Result<()>;
}

/// Leaves the project file untouched.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopLocalizer;

impl Localizer for NoopLocalizer {
    fn name(&self) -> &str {
        "none"
    }

    fn localize(&self, _project_file: &Path, _user: &str) -> io::Result<()> {
        Ok(())
    }
}

// ── PreCheckinHook ──────────────────────────────────────────────────────────

/// Runs before a checkin to release whatever the host application still
/// holds open inside the local working copy.
///
/// The presentation layer owns the call order: the hook must have returned
/// before `Project::checkin` is invoked. The core never calls it.
pub trait PreCheckinHook: Send + Sync {
    fn before_checkin(&self, project: &str, local_path: &Path) -> io::Result<()>;
}

/// Hook that does nothing, for hosts with no open handles to release.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPreCheckin;

impl PreCheckinHook for NoopPreCheckin {
    fn before_checkin(&self, _project: &str, _local_path: &Path) -> io::Result<()> {
        Ok(())
    }
}
