//! A shared project directory and its checkout/checkin protocol.
//!
//! Every mutating operation reloads the metadata first, validates the lock,
//! writes the new lock state, and only then moves files. A failure during
//! the bulk copy therefore never leaves the lock record wrong; it surfaces
//! as [`Error::Transfer`] carrying the status that was persisted.

use std::{
    fmt,
    path::{Path, PathBuf},
};

use {chrono::Utc, tracing::debug};

use crate::{
    context::SyncContext,
    error::{Context, Error, Result},
    metadata::{META_FILENAME, MetadataStore, ProjectMetadata, ProjectStatus},
    sync::{self, TreeStats},
};

/// A directory in the shared location that carries a metadata file.
///
/// The in-memory metadata is a snapshot; call [`Project::refresh`] (every
/// mutating method does) before trusting it for a decision. Mutating
/// methods take `&mut self`, which makes refresh, validate, and persist one
/// critical section per instance.
pub struct Project {
    name: String,
    path: PathBuf,
    meta: ProjectMetadata,
    ctx: SyncContext,
}

impl Project {
    /// Whether `dir` carries a metadata file.
    pub fn is_project(dir: &Path) -> bool {
        MetadataStore::exists(dir)
    }

    /// Turn a prepared directory into a project.
    ///
    /// The directory must contain `<dirname>.<ext>` and must not already be
    /// a project. Only the metadata file is written.
    pub fn create(dir: &Path, ctx: SyncContext) -> Result<Self> {
        ctx.log(format!("creating new project at {}", dir.display()));

        if !dir.is_dir() {
            return Err(Error::NotADirectory {
                path: dir.to_path_buf(),
            });
        }
        if Self::is_project(dir) {
            return Err(Error::AlreadyProject {
                path: dir.to_path_buf(),
            });
        }

        let name = dir_name(dir)?;
        let expected = primary_file_in(dir, &name, &ctx.project_extension);
        if !expected.is_file() {
            return Err(Error::MissingProjectFile { expected });
        }

        MetadataStore::save(dir, &ProjectMetadata::default())?;
        ctx.log(format!(
            "created project {name} with metafile {}",
            MetadataStore::path(dir).display()
        ));
        Self::load(dir, ctx)
    }

    /// Open an existing project. Fails when the metadata file is missing or
    /// unreadable.
    pub fn load(dir: &Path, ctx: SyncContext) -> Result<Self> {
        let name = dir_name(dir)?;
        let meta = MetadataStore::load(dir)?;
        ctx.log(format!(
            "loaded project {name} from {}",
            MetadataStore::path(dir).display()
        ));
        Ok(Self {
            name,
            path: dir.to_path_buf(),
            meta,
            ctx,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The project directory in the shared location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata as of the last load or refresh.
    pub fn metadata(&self) -> &ProjectMetadata {
        &self.meta
    }

    pub fn status(&self) -> ProjectStatus {
        self.meta.status
    }

    /// Path of the primary project file inside the shared directory.
    pub fn primary_file(&self) -> PathBuf {
        primary_file_in(&self.path, &self.name, &self.ctx.project_extension)
    }

    /// Reload metadata from disk, replacing the in-memory copy only when the
    /// read succeeds.
    pub fn refresh(&mut self) -> Result<()> {
        debug!(project = %self.name, "refreshing metadata");
        self.meta = MetadataStore::load(&self.path)?;
        Ok(())
    }

    /// Take the lock for `user` and replace `local_path` with a fresh copy
    /// of the shared tree.
    ///
    /// Whatever was at `local_path` is deleted. The copy never includes the
    /// metadata file; the configured localizer then rewrites the copied
    /// primary project file for `user`.
    ///
    /// `user` is trimmed before it is checked and recorded as the holder.
    pub fn checkout(&mut self, user: &str, local_path: &Path) -> Result<TreeStats> {
        let user = normalize_user(user)?;
        self.refresh()?;

        if self.meta.is_checked_out() {
            return Err(Error::AlreadyCheckedOut {
                project: self.name.clone(),
                holder: self.meta.checkout_by.clone(),
            });
        }
        sync::ensure_disjoint(&self.path, local_path)?;

        self.ctx
            .log(format!("checking out {} as {user}", self.name));
        let mut next = self.meta.clone();
        next.acquire(user, Utc::now());
        self.persist(next)?;

        let stats = self
            .materialize(user, local_path)
            .map_err(|e| Error::transfer("checkout", ProjectStatus::CheckedOut, e))?;
        self.ctx.log(format!(
            "checkout of {} complete ({} files)",
            self.name, stats.files
        ));
        Ok(stats)
    }

    /// Release the lock held by `user` and publish `local_path` over the
    /// shared tree.
    ///
    /// Files are copied over the shared directory without deleting anything
    /// that exists only there. The local working copy is left as is.
    ///
    /// `user` is trimmed and compared case-insensitively with the holder.
    pub fn checkin(&mut self, user: &str, local_path: &Path) -> Result<TreeStats> {
        let user = normalize_user(user)?;
        self.refresh()?;

        if !self.meta.is_checked_out() {
            return Err(Error::NotCheckedOut {
                project: self.name.clone(),
            });
        }
        if let Some(holder) = &self.meta.checkout_by
            && !same_identity(holder, user)
        {
            return Err(Error::CheckedOutByOther {
                project: self.name.clone(),
                holder: holder.clone(),
                user: user.to_string(),
            });
        }
        sync::ensure_disjoint(&self.path, local_path)?;
        if !local_path.is_dir() {
            return Err(Error::LocalCopyMissing {
                path: local_path.to_path_buf(),
            });
        }

        self.ctx.log(format!("checking in {}", self.name));
        let mut next = self.meta.clone();
        next.release(user, Utc::now());
        self.persist(next)?;

        self.ctx.log(format!(
            "copying local project from {} to {}",
            local_path.display(),
            self.path.display()
        ));
        let stats = sync::copy_tree(local_path, &self.path, is_lock_file)
            .map_err(|e| Error::transfer("checkin", ProjectStatus::Ready, e))?;
        self.ctx.log(format!(
            "checkin of {} complete ({} files)",
            self.name, stats.files
        ));
        Ok(stats)
    }

    /// Append a note to the project record.
    pub fn add_note(&mut self, note: &str) -> Result<()> {
        let note = note.trim();
        if note.is_empty() {
            return Err(Error::message("note must not be blank"));
        }
        self.refresh()?;
        let mut next = self.meta.clone();
        next.notes.push(note.to_string());
        self.persist(next)
    }

    /// Write `next` to disk, then adopt it. The in-memory copy is never left
    /// half-updated when the write fails.
    fn persist(&mut self, next: ProjectMetadata) -> Result<()> {
        MetadataStore::save(&self.path, &next)?;
        self.meta = next;
        Ok(())
    }

    fn materialize(&self, user: &str, local_path: &Path) -> Result<TreeStats> {
        if local_path.symlink_metadata().is_ok() {
            self.ctx.log(format!(
                "removing local project files from {}",
                local_path.display()
            ));
            sync::remove_tree(local_path)?;
        }

        self.ctx.log(format!(
            "copying project from {} to {}",
            self.path.display(),
            local_path.display()
        ));
        let stats = sync::copy_tree(&self.path, local_path, is_lock_file)?;

        // the working copy must never look like an authoritative project
        let stray = MetadataStore::path(local_path);
        if stray.exists() {
            std::fs::remove_file(&stray)?;
        }

        let primary = primary_file_in(local_path, &self.name, &self.ctx.project_extension);
        if primary.is_file() {
            self.ctx.log(format!(
                "post-processing {} with {} localizer",
                primary.display(),
                self.ctx.localizer.name()
            ));
            self.ctx.localizer.localize(&primary, user)?;
        } else {
            self.ctx.log(format!(
                "no project file at {}, skipping localization",
                primary.display()
            ));
        }
        Ok(stats)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[project] {} ({})", self.name, self.meta.status_label())
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("meta", &self.meta)
            .finish_non_exhaustive()
    }
}

/// Lock identities compare case-insensitively.
fn same_identity(holder: &str, user: &str) -> bool {
    holder.to_lowercase() == user.to_lowercase()
}

fn normalize_user(user: &str) -> Result<&str> {
    let user = user.trim();
    if user.is_empty() {
        return Err(Error::InvalidUser);
    }
    Ok(user)
}

fn dir_name(dir: &Path) -> Result<String> {
    dir.file_name()
        .and_then(|n| n.to_str())
        .map(String::from)
        .with_context(|| format!("{} has no usable directory name", dir.display()))
}

fn primary_file_in(dir: &Path, name: &str, ext: &str) -> PathBuf {
    dir.join(format!("{name}.{ext}"))
}

/// Top-level lock files that must never travel between trees.
fn is_lock_file(relative: &Path) -> bool {
    relative
        .to_str()
        .is_some_and(|p| p == META_FILENAME || p == MetadataStore::TEMP_FILENAME)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        realay_common::{Localizer, RecordingLogger},
        std::{fs, sync::Arc},
    };

    struct Fixture {
        _root: tempfile::TempDir,
        remote: PathBuf,
        local: PathBuf,
        logger: RecordingLogger,
    }

    impl Fixture {
        fn new() -> Self {
            let root = tempfile::tempdir().unwrap();
            let remote = root.path().join("shared").join("song");
            fs::create_dir_all(&remote).unwrap();
            fs::write(remote.join("song.rpp"), "<REAPER_PROJECT>").unwrap();
            fs::write(remote.join("a.txt"), "a").unwrap();
            let local = root.path().join("local").join("song");
            Self {
                remote,
                local,
                _root: root,
                logger: RecordingLogger::new(),
            }
        }

        fn ctx(&self) -> SyncContext {
            SyncContext::default().with_logger(Arc::new(self.logger.clone()))
        }

        fn create(&self) -> Project {
            Project::create(&self.remote, self.ctx()).unwrap()
        }
    }

    struct FailingLocalizer;

    impl Localizer for FailingLocalizer {
        fn name(&self) -> &str {
            "failing"
        }

        fn localize(&self, _: &Path, _: &str) -> std::io::Result<()> {
            Err(std::io::Error::other("cannot rewrite"))
        }
    }

    #[test]
    fn create_writes_default_metadata_only() {
        let fx = Fixture::new();
        let mut project = fx.create();
        project.refresh().unwrap();

        assert_eq!(project.name(), "song");
        assert_eq!(project.metadata(), &ProjectMetadata::default());
        assert_eq!(
            fs::read_to_string(fx.remote.join("song.rpp")).unwrap(),
            "<REAPER_PROJECT>"
        );
        assert!(fx.logger.contains("creating new project"));
    }

    #[test]
    fn create_requires_matching_project_file() {
        let fx = Fixture::new();
        fs::rename(fx.remote.join("song.rpp"), fx.remote.join("other.rpp")).unwrap();
        let err = Project::create(&fx.remote, fx.ctx()).unwrap_err();
        assert!(matches!(err, Error::MissingProjectFile { ref expected } if expected.ends_with("song.rpp")));
        assert!(err.is_structural());
        assert!(!Project::is_project(&fx.remote));
    }

    #[test]
    fn create_honours_configured_extension() {
        let fx = Fixture::new();
        fs::write(fx.remote.join("song.als"), "").unwrap();
        let ctx = fx.ctx().with_project_extension("als");
        let project = Project::create(&fx.remote, ctx).unwrap();
        assert!(project.primary_file().ends_with("song.als"));
    }

    #[test]
    fn create_refuses_existing_project() {
        let fx = Fixture::new();
        let mut project = fx.create();
        project.add_note("keep me").unwrap();
        let before = fs::read(MetadataStore::path(&fx.remote)).unwrap();

        let err = Project::create(&fx.remote, fx.ctx()).unwrap_err();
        assert!(matches!(err, Error::AlreadyProject { .. }));
        assert_eq!(fs::read(MetadataStore::path(&fx.remote)).unwrap(), before);
    }

    #[test]
    fn create_rejects_missing_directory() {
        let fx = Fixture::new();
        let err = Project::create(&fx.remote.join("nope"), fx.ctx()).unwrap_err();
        assert!(matches!(err, Error::NotADirectory { .. }));
    }

    #[test]
    fn load_without_metadata_fails() {
        let fx = Fixture::new();
        let err = Project::load(&fx.remote, fx.ctx()).unwrap_err();
        assert!(matches!(err, Error::MetadataNotFound { .. }));
    }

    #[test]
    fn refresh_fails_when_metadata_disappears() {
        let fx = Fixture::new();
        let mut project = fx.create();
        fs::remove_file(MetadataStore::path(&fx.remote)).unwrap();
        assert!(matches!(
            project.refresh(),
            Err(Error::MetadataNotFound { .. })
        ));
        // the stale snapshot is kept rather than half-replaced
        assert_eq!(project.metadata(), &ProjectMetadata::default());

        let err = project.checkout("dan", &fx.local).unwrap_err();
        assert!(matches!(err, Error::MetadataNotFound { .. }));
        assert!(!fx.local.exists());
    }

    #[test]
    fn checkout_sees_lock_taken_by_another_instance() {
        let fx = Fixture::new();
        let mut mine = fx.create();
        let mut theirs = Project::load(&fx.remote, fx.ctx()).unwrap();

        theirs.checkout("alice", &fx.local).unwrap();
        // `mine` still holds a Ready snapshot; checkout must refresh first
        assert_eq!(mine.status(), ProjectStatus::Ready);
        let err = mine.checkout("bob", &fx.local.with_file_name("bob")).unwrap_err();
        assert_eq!(err.holder(), Some("alice"));
        assert!(!fx.local.with_file_name("bob").exists());
    }

    #[test]
    fn checkout_records_holder_and_date() {
        let fx = Fixture::new();
        let mut project = fx.create();
        let before = Utc::now();
        let stats = project.checkout("dan", &fx.local).unwrap();

        let meta = MetadataStore::load(&fx.remote).unwrap();
        assert_eq!(meta.status, ProjectStatus::CheckedOut);
        assert_eq!(meta.checkout_by.as_deref(), Some("dan"));
        assert!(meta.checkout_date.unwrap() >= before);
        assert_eq!(project.metadata(), &meta);
        assert_eq!(stats.files, 2);
        assert_eq!(project.to_string(), "[project] song (checked out by dan)");
    }

    #[test]
    fn checkout_rejects_blank_user() {
        let fx = Fixture::new();
        let mut project = fx.create();
        assert!(matches!(
            project.checkout("   ", &fx.local),
            Err(Error::InvalidUser)
        ));
        assert_eq!(
            MetadataStore::load(&fx.remote).unwrap().status,
            ProjectStatus::Ready
        );
    }

    #[test]
    fn holder_is_recorded_without_surrounding_whitespace() {
        let fx = Fixture::new();
        let mut project = fx.create();
        project.checkout("  alice ", &fx.local).unwrap();
        assert_eq!(
            MetadataStore::load(&fx.remote).unwrap().checkout_by.as_deref(),
            Some("alice")
        );
        project.checkin(" Alice", &fx.local).unwrap();
        assert_eq!(project.status(), ProjectStatus::Ready);
    }

    #[test]
    fn checkout_into_remote_is_refused_before_locking() {
        let fx = Fixture::new();
        let mut project = fx.create();
        let err = project
            .checkout("dan", &fx.remote.join("work"))
            .unwrap_err();
        assert!(matches!(err, Error::OverlappingPaths { .. }));
        assert_eq!(
            MetadataStore::load(&fx.remote).unwrap().status,
            ProjectStatus::Ready
        );
        assert!(fx.remote.join("a.txt").is_file());
    }

    #[test]
    fn checkout_replaces_a_local_file_too() {
        let fx = Fixture::new();
        let mut project = fx.create();
        fs::create_dir_all(fx.local.parent().unwrap()).unwrap();
        fs::write(&fx.local, "not a directory").unwrap();

        project.checkout("dan", &fx.local).unwrap();
        assert!(fx.local.join("a.txt").is_file());
    }

    #[test]
    fn checkout_applies_localizer_to_primary_file() {
        let fx = Fixture::new();
        fs::write(fx.remote.join("song.rpp"), "FILE C:\\Users\\bob\\kick.wav").unwrap();
        let ctx = fx
            .ctx()
            .with_localizer(Arc::new(crate::localize::UserPathLocalizer::new()));
        let mut project = Project::create(&fx.remote, ctx).unwrap();

        project.checkout("alice", &fx.local).unwrap();

        assert_eq!(
            fs::read_to_string(fx.local.join("song.rpp")).unwrap(),
            "FILE C:\\Users\\alice\\kick.wav"
        );
        // the shared copy is not rewritten
        assert_eq!(
            fs::read_to_string(fx.remote.join("song.rpp")).unwrap(),
            "FILE C:\\Users\\bob\\kick.wav"
        );
    }

    #[test]
    fn localizer_failure_is_a_partial_copy_with_lock_held() {
        let fx = Fixture::new();
        let ctx = fx.ctx().with_localizer(Arc::new(FailingLocalizer));
        let mut project = Project::create(&fx.remote, ctx).unwrap();

        let err = project.checkout("dan", &fx.local).unwrap_err();
        assert!(matches!(
            err,
            Error::Transfer {
                operation: "checkout",
                status: ProjectStatus::CheckedOut,
                ..
            }
        ));
        assert_eq!(
            MetadataStore::load(&fx.remote).unwrap().checkout_by.as_deref(),
            Some("dan")
        );
    }

    #[test]
    fn checkin_requires_a_lock() {
        let fx = Fixture::new();
        let mut project = fx.create();
        fs::create_dir_all(&fx.local).unwrap();
        let err = project.checkin("dan", &fx.local).unwrap_err();
        assert!(matches!(err, Error::NotCheckedOut { .. }));
        assert!(err.is_not_checked_out());
        assert_eq!(err.holder(), None);
    }

    #[test]
    fn checkin_with_missing_local_copy_keeps_lock() {
        let fx = Fixture::new();
        let mut project = fx.create();
        project.checkout("dan", &fx.local).unwrap();
        fs::remove_dir_all(&fx.local).unwrap();

        let err = project.checkin("dan", &fx.local).unwrap_err();
        assert!(matches!(err, Error::LocalCopyMissing { .. }));
        assert!(MetadataStore::load(&fx.remote).unwrap().is_checked_out());
    }

    #[test]
    fn checkin_records_last_modifier() {
        let fx = Fixture::new();
        let mut project = fx.create();
        project.checkout("Dan", &fx.local).unwrap();
        project.checkin("dan", &fx.local).unwrap();

        let meta = MetadataStore::load(&fx.remote).unwrap();
        assert_eq!(meta.status, ProjectStatus::Ready);
        assert!(meta.checkout_by.is_none());
        assert!(meta.checkout_date.is_none());
        assert_eq!(meta.last_modified_by.as_deref(), Some("dan"));
        assert!(meta.last_updated_date.is_some());
        assert!(meta.is_consistent());
    }

    #[test]
    fn checkin_copy_failure_reports_released_lock() {
        let fx = Fixture::new();
        let mut project = fx.create();
        fs::create_dir_all(fx.remote.join("x")).unwrap();
        project.checkout("dan", &fx.local).unwrap();

        // a local file where the shared tree has a directory cannot be copied
        fs::remove_dir_all(fx.local.join("x")).unwrap();
        fs::write(fx.local.join("x"), "file now").unwrap();

        let err = project.checkin("dan", &fx.local).unwrap_err();
        assert!(err.is_partial_copy());
        assert!(matches!(
            err,
            Error::Transfer {
                operation: "checkin",
                status: ProjectStatus::Ready,
                ..
            }
        ));
        let meta = MetadataStore::load(&fx.remote).unwrap();
        assert_eq!(meta.status, ProjectStatus::Ready);
        assert!(meta.checkout_by.is_none());
        assert_eq!(meta.last_modified_by.as_deref(), Some("dan"));
        assert_eq!(project.status(), ProjectStatus::Ready);
    }

    #[test]
    fn checkin_ignores_metadata_file_in_local_tree() {
        let fx = Fixture::new();
        let mut project = fx.create();
        project.checkout("dan", &fx.local).unwrap();
        // someone copied a lock record into the working copy by hand
        fs::write(
            fx.local.join(META_FILENAME),
            r#"{"status": "checkout", "checkoutBy": "mallory"}"#,
        )
        .unwrap();

        project.checkin("dan", &fx.local).unwrap();
        let meta = MetadataStore::load(&fx.remote).unwrap();
        assert_eq!(meta.status, ProjectStatus::Ready);
    }

    #[test]
    fn checkin_tolerates_holderless_lock() {
        let fx = Fixture::new();
        let _ = fx.create();
        fs::write(
            MetadataStore::path(&fx.remote),
            r#"{"status": "checkout"}"#,
        )
        .unwrap();
        fs::create_dir_all(&fx.local).unwrap();

        let mut project = Project::load(&fx.remote, fx.ctx()).unwrap();
        project.checkin("anyone", &fx.local).unwrap();
        assert_eq!(project.status(), ProjectStatus::Ready);
    }

    #[test]
    fn notes_append_in_order() {
        let fx = Fixture::new();
        let mut project = fx.create();
        project.add_note("drums tracked").unwrap();
        project.add_note("  needs vocals ").unwrap();
        assert!(project.add_note("   ").is_err());

        let meta = MetadataStore::load(&fx.remote).unwrap();
        assert_eq!(meta.notes, vec!["drums tracked", "needs vocals"]);
    }

    #[test]
    fn identity_comparison_ignores_case() {
        assert!(same_identity("Alice", "aLICE"));
        assert!(!same_identity("alice", "alicia"));
    }

    #[test]
    fn lock_file_filter_matches_top_level_only() {
        assert!(is_lock_file(Path::new("realay.dat")));
        assert!(is_lock_file(Path::new("realay.dat.tmp")));
        assert!(!is_lock_file(Path::new("sub/realay.dat")));
        assert!(!is_lock_file(Path::new("song.rpp")));
    }
}
