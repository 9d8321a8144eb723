//! The per-project lock record and its on-disk store.
//!
//! Each project directory carries one `realay.dat` file, the single source
//! of truth for who holds the project. Every field has a documented default
//! that is filled in individually on load, so records written by older
//! versions (or with fields this version does not know) keep loading.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
};

use {
    chrono::{DateTime, Utc},
    serde::{Deserialize, Serialize},
    tracing::debug,
};

use crate::error::{Error, Result};

/// Name of the metadata file inside every project directory.
pub const META_FILENAME: &str = "realay.dat";

/// Current schema version written by [`MetadataStore::save`].
pub const SCHEMA_VERSION: u32 = 1;

/// Lock state of a shared project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProjectStatus {
    #[default]
    #[serde(rename = "ready")]
    Ready,
    #[serde(rename = "checkout", alias = "checked_out")]
    CheckedOut,
}

impl fmt::Display for ProjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::CheckedOut => write!(f, "checked out"),
        }
    }
}

/// Persisted record attached to each project directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectMetadata {
    pub version: u32,
    pub status: ProjectStatus,
    /// Identity holding the lock; set iff `status` is `CheckedOut`.
    pub checkout_by: Option<String>,
    pub checkout_date: Option<DateTime<Utc>>,
    /// Identity of the last checkin.
    pub last_modified_by: Option<String>,
    pub last_updated_date: Option<DateTime<Utc>>,
    /// Free-form annotations, appended in order.
    pub notes: Vec<String>,
}

impl Default for ProjectMetadata {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            status: ProjectStatus::Ready,
            checkout_by: None,
            checkout_date: None,
            last_modified_by: None,
            last_updated_date: None,
            notes: Vec::new(),
        }
    }
}

impl ProjectMetadata {
    pub fn is_checked_out(&self) -> bool {
        self.status == ProjectStatus::CheckedOut
    }

    /// `Ready` exactly when nobody is recorded as holding the lock.
    pub fn is_consistent(&self) -> bool {
        (self.status == ProjectStatus::Ready) == self.checkout_by.is_none()
    }

    /// Listing label, e.g. "ready for checkout" or "checked out by dan".
    pub fn status_label(&self) -> String {
        match self.status {
            ProjectStatus::Ready => "ready for checkout".into(),
            ProjectStatus::CheckedOut => format!(
                "checked out by {}",
                self.checkout_by.as_deref().unwrap_or("unknown")
            ),
        }
    }

    pub(crate) fn acquire(&mut self, user: &str, at: DateTime<Utc>) {
        self.status = ProjectStatus::CheckedOut;
        self.checkout_by = Some(user.to_string());
        self.checkout_date = Some(at);
    }

    pub(crate) fn release(&mut self, user: &str, at: DateTime<Utc>) {
        self.status = ProjectStatus::Ready;
        self.checkout_by = None;
        self.checkout_date = None;
        self.last_modified_by = Some(user.to_string());
        self.last_updated_date = Some(at);
    }
}

/// Reads and writes `realay.dat` inside a project directory.
pub struct MetadataStore;

impl MetadataStore {
    /// Scratch file written next to the record before the rename.
    pub const TEMP_FILENAME: &'static str = "realay.dat.tmp";

    /// Location of the metadata file for `dir`.
    pub fn path(dir: &Path) -> PathBuf {
        dir.join(META_FILENAME)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::path(dir).is_file()
    }

    /// Load the metadata stored in `dir`.
    pub fn load(dir: &Path) -> Result<ProjectMetadata> {
        let path = Self::path(dir);
        if !path.is_file() {
            return Err(Error::MetadataNotFound { path });
        }
        let data = fs::read(&path)?;
        let meta =
            serde_json::from_slice(&data).map_err(|source| Error::MetadataCorrupt {
                path: path.clone(),
                source,
            })?;
        debug!(path = %path.display(), "loaded project metadata");
        Ok(meta)
    }

    /// Save `meta` into `dir` atomically via temp file + rename, so other
    /// readers never observe a half-written record.
    pub fn save(dir: &Path, meta: &ProjectMetadata) -> Result<()> {
        let path = Self::path(dir);
        let tmp = dir.join(Self::TEMP_FILENAME);
        let data = serde_json::to_string_pretty(meta)?;
        fs::write(&tmp, data)?;
        if let Err(e) = fs::rename(&tmp, &path) {
            fs::remove_file(&tmp).ok();
            return Err(e.into());
        }
        debug!(path = %path.display(), status = %meta.status, "wrote project metadata");
        Ok(())
    }
}
