//! Recursive tree copy/replace used to move working copies between the
//! shared location and the local machine.

use std::{
    fs,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Counts of what a copy touched, for operator messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub files: usize,
    pub dirs: usize,
}

/// Remove `path` entirely, whether it is a directory tree or a single file.
/// A missing path is not an error.
pub fn remove_tree(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e.into()),
    };
    if meta.is_dir() {
        fs::remove_dir_all(path)?;
    } else {
        fs::remove_file(path)?;
    }
    debug!(path = %path.display(), "removed tree");
    Ok(())
}

/// Copy everything under `src` into `dest`, overwriting files that already
/// exist. Files present only in `dest` are left alone.
///
/// `skip` receives each entry's path relative to `src`; returning `true`
/// excludes it (and, for directories, everything beneath it).
pub fn copy_tree(src: &Path, dest: &Path, skip: impl Fn(&Path) -> bool) -> Result<TreeStats> {
    if !src.is_dir() {
        return Err(Error::NotADirectory {
            path: src.to_path_buf(),
        });
    }
    fs::create_dir_all(dest)?;

    let mut stats = TreeStats::default();
    let mut walker = walkdir::WalkDir::new(src).min_depth(1).into_iter();

    while let Some(entry) = walker.next() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(src)?;
        let file_type = entry.file_type();

        if skip(relative) {
            if file_type.is_dir() {
                walker.skip_current_dir();
            }
            continue;
        }

        let target = dest.join(relative);
        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
            stats.dirs += 1;
        } else if file_type.is_symlink() && entry.path().is_dir() {
            warn!(path = %entry.path().display(), "not following symlinked directory");
        } else {
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(entry.path(), &target)?;
            stats.files += 1;
        }
    }

    debug!(
        src = %src.display(),
        dest = %dest.display(),
        files = stats.files,
        dirs = stats.dirs,
        "copied tree"
    );
    Ok(stats)
}

/// Fail unless `remote` and `local` are disjoint trees. Replacing one with
/// the other would otherwise destroy the source.
pub fn ensure_disjoint(remote: &Path, local: &Path) -> Result<()> {
    let r = resolve(remote);
    let l = resolve(local);
    if r.starts_with(&l) || l.starts_with(&r) {
        return Err(Error::OverlappingPaths {
            remote: remote.to_path_buf(),
            local: local.to_path_buf(),
        });
    }
    Ok(())
}

/// Canonicalize the longest existing ancestor so paths that do not exist
/// yet still compare correctly against ones reached through symlinks.
fn resolve(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            },
            _ => return path.to_path_buf(),
        }
    }
}
