//! Post-checkout rewriting of the primary project file.

use std::{
    fs, io,
    path::{Path, PathBuf},
};

use {
    realay_common::Localizer,
    regex::bytes::{NoExpand, Regex},
    tracing::debug,
};

/// Rewrites Windows profile paths (`\Users\<name>\`) so that media
/// referenced from another user's profile points at the checking-out
/// user's profile instead.
#[derive(Debug, Clone)]
pub struct UserPathLocalizer {
    pattern: Regex,
}

impl UserPathLocalizer {
    #[allow(clippy::unwrap_used)] // literal pattern
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(r"\\Users\\\w+\\").unwrap(),
        }
    }

    fn rewrite(&self, data: &[u8], user: &str) -> Vec<u8> {
        let replacement = format!("\\Users\\{user}\\");
        self.pattern
            .replace_all(data, NoExpand(replacement.as_bytes()))
            .into_owned()
    }
}

impl Default for UserPathLocalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Localizer for UserPathLocalizer {
    fn name(&self) -> &str {
        "user-paths"
    }

    fn localize(&self, project_file: &Path, user: &str) -> io::Result<()> {
        let data = fs::read(project_file)?;
        let rewritten = self.rewrite(&data, user);
        if rewritten == data {
            return Ok(());
        }

        let tmp = temp_path(project_file);
        fs::write(&tmp, &rewritten)?;
        fs::rename(&tmp, project_file)?;
        debug!(path = %project_file.display(), user, "localized project file");
        Ok(())
    }
}

/// `<file>.<ext>.tmp` beside the file, so no sibling is clobbered.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}
