//! Configuration validation.
//!
//! Checks that the configured roots make sense before any project is
//! touched, most importantly that the local working area can never overlap
//! the shared drop location (checkout deletes the local copy).

use std::path::{Path, PathBuf};

use crate::schema::RealayConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "missing", "filesystem", "overlap", "identity", "format", "hook"
    pub category: &'static str,
    /// Config key, e.g. "remote_root"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn new(
        severity: Severity,
        category: &'static str,
        path: &str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category,
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Result of validating a configuration.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
    pub config_path: Option<PathBuf>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

/// Validate a loaded configuration.
pub fn validate(config: &RealayConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    match &config.remote_root {
        None => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "missing",
            "remote_root",
            "no shared project location configured",
        )),
        Some(root) if !root.is_dir() => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "filesystem",
            "remote_root",
            format!("{} is not a directory", root.display()),
        )),
        Some(_) => {},
    }

    if config.local_root.is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "missing",
            "local_root",
            "no local working directory configured",
        ));
    }

    if let (Some(remote), Some(local)) = (&config.remote_root, &config.local_root)
        && overlaps(remote, local)
    {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "overlap",
            "local_root",
            format!(
                "{} and {} overlap; checkout would delete shared files",
                local.display(),
                remote.display()
            ),
        ));
    }

    if config.resolved_user().is_none() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "identity",
            "user",
            "no user configured and none found in the environment",
        ));
    }

    if config.project_extension.starts_with('.') {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "format",
            "project_extension",
            format!(
                "extension {:?} should not start with a dot",
                config.project_extension
            ),
        ));
    } else if config.project_extension.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "format",
            "project_extension",
            "extension must not be empty",
        ));
    }

    if let Some(cmd) = &config.hooks.pre_checkin {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "hook",
            "hooks.pre_checkin",
            format!("will run `{cmd}` before every checkin"),
        ));
    }

    ValidationResult {
        diagnostics,
        config_path: None,
    }
}

/// True when either path contains the other. Resolves symlinks when the
/// paths exist so aliases of the same directory are caught.
fn overlaps(a: &Path, b: &Path) -> bool {
    let a = a.canonicalize().unwrap_or_else(|_| a.to_path_buf());
    let b = b.canonicalize().unwrap_or_else(|_| b.to_path_buf());
    a.starts_with(&b) || b.starts_with(&a)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, crate::schema::HooksConfig};

    fn valid_config(dir: &Path) -> RealayConfig {
        let remote = dir.join("shared");
        std::fs::create_dir_all(&remote).unwrap();
        RealayConfig {
            user: Some("dan".into()),
            remote_root: Some(remote),
            local_root: Some(dir.join("work")),
            ..Default::default()
        }
    }

    #[test]
    fn valid_config_has_no_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = validate(&valid_config(dir.path()));
        assert!(!result.has_errors(), "{:?}", result.diagnostics);
    }

    #[test]
    fn missing_roots_are_errors() {
        let cfg = RealayConfig {
            user: Some("dan".into()),
            ..Default::default()
        };
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Error), 2);
        assert!(result.diagnostics.iter().all(|d| d.category == "missing"));
    }

    #[test]
    fn remote_root_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path());
        cfg.remote_root = Some(dir.path().join("nope"));
        let result = validate(&cfg);
        assert!(
            result
                .diagnostics
                .iter()
                .any(|d| d.category == "filesystem" && d.path == "remote_root")
        );
    }

    #[test]
    fn local_inside_remote_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path());
        cfg.local_root = cfg.remote_root.as_ref().map(|r| r.join("mine"));
        let result = validate(&cfg);
        assert!(result.diagnostics.iter().any(|d| d.category == "overlap"));
        assert!(result.has_errors());
    }

    #[test]
    fn dotted_extension_is_a_warning() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path());
        cfg.project_extension = ".rpp".into();
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert_eq!(result.count(Severity::Warning), 1);
    }

    #[test]
    fn pre_checkin_hook_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = valid_config(dir.path());
        cfg.hooks = HooksConfig {
            pre_checkin: Some("reaper -closeall".into()),
            ..Default::default()
        };
        let result = validate(&cfg);
        assert_eq!(result.count(Severity::Info), 1);
    }
}
