use std::{
    fs, io,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{context::SyncContext, error::Result, project::Project};

/// Projects and project candidates found directly under a root directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    /// Directories with readable metadata.
    pub projects: Vec<Project>,
    /// Directories without metadata; candidates for [`Project::create`].
    pub non_projects: Vec<PathBuf>,
}

impl ScanResult {
    pub fn find(&self, name: &str) -> Option<&Project> {
        self.projects.iter().find(|p| p.name() == name)
    }

    /// Take ownership of the named project out of the listing.
    pub fn take(&mut self, name: &str) -> Option<Project> {
        let idx = self.projects.iter().position(|p| p.name() == name)?;
        Some(self.projects.remove(idx))
    }

    pub fn find_non_project(&self, name: &str) -> Option<&Path> {
        self.non_projects
            .iter()
            .find(|p| p.file_name().is_some_and(|n| n == name))
            .map(PathBuf::as_path)
    }
}

/// Classifies the immediate subdirectories of a shared root.
pub struct ProjectRegistry {
    ctx: SyncContext,
}

impl ProjectRegistry {
    pub fn new(ctx: SyncContext) -> Self {
        Self { ctx }
    }

    /// List every child directory of `root` as a project or a non-project.
    ///
    /// A project whose metadata cannot be loaded is logged and left out of
    /// both lists; it never fails the scan. Entries are ordered by name.
    /// Only an unreadable `root` is an error.
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        self.ctx
            .log(format!("refreshing project list from {}", root.display()));

        let entries = fs::read_dir(root)?.map(|entry| entry.map(|e| e.path()));
        let dirs = self.child_dirs(root, entries);

        let mut result = ScanResult::default();
        for dir in dirs {
            if Project::is_project(&dir) {
                match Project::load(&dir, self.ctx.clone()) {
                    Ok(project) => result.projects.push(project),
                    Err(e) => {
                        warn!(path = %dir.display(), error = %e, "skipping unloadable project");
                        self.ctx.log(format!(
                            "error loading project from {}: {e}",
                            dir.display()
                        ));
                    },
                }
            } else {
                self.ctx
                    .log(format!("adding nonproject {}", dir.display()));
                result.non_projects.push(dir);
            }
        }

        debug!(
            root = %root.display(),
            projects = result.projects.len(),
            non_projects = result.non_projects.len(),
            "scanned project root"
        );
        Ok(result)
    }

    /// Sorted child directories, logging entries that could not be read.
    fn child_dirs(
        &self,
        root: &Path,
        entries: impl Iterator<Item = io::Result<PathBuf>>,
    ) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(root = %root.display(), error = %e, "skipping unreadable entry");
                    self.ctx.log(format!(
                        "error reading entry in {}: {e}",
                        root.display()
                    ));
                    None
                },
            })
            .filter(|p| p.is_dir())
            .filter(|p| !(self.ctx.skip_hidden && is_hidden(p)))
            .collect();
        dirs.sort();
        dirs
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with('.'))
}
