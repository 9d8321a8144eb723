/// Config schema types.
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RealayConfig {
    /// Identity recorded as lock holder. Falls back to `$USER` / `$USERNAME`.
    pub user: Option<String>,
    /// Shared drop location whose immediate subdirectories are projects.
    #[serde(alias = "dropbox")]
    pub remote_root: Option<PathBuf>,
    /// Parent of local working copies; each project lands in
    /// `<local_root>/<project name>`.
    #[serde(alias = "local")]
    pub local_root: Option<PathBuf>,
    /// Extension of the primary project file, without the leading dot.
    pub project_extension: String,
    /// Verbose logging.
    pub debug: bool,
    /// Ignore dot-directories (sync tool caches) when scanning.
    pub skip_hidden: bool,
    pub hooks: HooksConfig,
}

impl Default for RealayConfig {
    fn default() -> Self {
        Self {
            user: None,
            remote_root: None,
            local_root: None,
            project_extension: "rpp".into(),
            debug: false,
            skip_hidden: true,
            hooks: HooksConfig::default(),
        }
    }
}

impl RealayConfig {
    /// The configured user, or the login name from the environment.
    pub fn resolved_user(&self) -> Option<String> {
        self.resolved_user_with(|name| std::env::var(name).ok())
    }

    fn resolved_user_with(&self, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
        self.user
            .clone()
            .or_else(|| lookup("USER"))
            .or_else(|| lookup("USERNAME"))
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty())
    }

    /// Where the working copy of `project_name` lives locally.
    pub fn local_path_for(&self, project_name: &str) -> Option<PathBuf> {
        self.local_root.as_ref().map(|root| root.join(project_name))
    }

    /// Expand a leading `~` in the configured roots.
    pub(crate) fn expand_home(&mut self, home: &Path) {
        for root in [&mut self.remote_root, &mut self.local_root]
            .into_iter()
            .flatten()
        {
            if let Ok(rest) = root.strip_prefix("~") {
                *root = home.join(rest);
            }
        }
    }
}

/// Collaborator hooks wired up by the command line front end.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Shell command run before every checkin, e.g. to make the host
    /// application close the project.
    pub pre_checkin: Option<String>,
    /// How the primary project file is rewritten after checkout.
    pub localize: LocalizeMode,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LocalizeMode {
    /// Leave the project file as it was in the shared location.
    #[default]
    None,
    /// Rewrite `\Users\<name>\` path segments to the checking-out user.
    UserPaths,
}
