use std::path::PathBuf;

use realay_common::FromMessage;

use crate::metadata::ProjectStatus;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Walkdir(#[from] walkdir::Error),
    #[error(transparent)]
    StripPrefix(#[from] std::path::StripPrefixError),

    #[error("there appears to already be a project at {path}")]
    AlreadyProject { path: PathBuf },
    #[error("expected project file at {expected}")]
    MissingProjectFile { expected: PathBuf },
    #[error("{path} is not a directory")]
    NotADirectory { path: PathBuf },

    #[error("no project metadata found at {path}")]
    MetadataNotFound { path: PathBuf },
    #[error("project metadata at {path} is unreadable: {source}")]
    MetadataCorrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("project {project} is already checked out by {}", .holder.as_deref().unwrap_or("an unknown user"))]
    AlreadyCheckedOut {
        project: String,
        holder: Option<String>,
    },
    #[error("project {project} isn't checked out")]
    NotCheckedOut { project: String },
    #[error("current user {user} is not the checkout owner ({holder})")]
    CheckedOutByOther {
        project: String,
        holder: String,
        user: String,
    },

    #[error("user name must not be blank")]
    InvalidUser,
    #[error("refusing to sync: {remote} and {local} overlap")]
    OverlappingPaths { remote: PathBuf, local: PathBuf },
    #[error("no local working copy at {path}")]
    LocalCopyMissing { path: PathBuf },

    /// A bulk copy failed after the lock state was already written; the
    /// destination may be partially populated.
    #[error("{operation} left a partial copy (project is now {status}): {source}")]
    Transfer {
        operation: &'static str,
        status: ProjectStatus,
        #[source]
        source: Box<Error>,
    },

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn transfer(operation: &'static str, status: ProjectStatus, source: Error) -> Self {
        Self::Transfer {
            operation,
            status,
            source: Box::new(source),
        }
    }

    /// The identity currently holding the lock, for lock-conflict errors.
    pub fn holder(&self) -> Option<&str> {
        match self {
            Self::AlreadyCheckedOut { holder, .. } => holder.as_deref(),
            Self::CheckedOutByOther { holder, .. } => Some(holder),
            _ => None,
        }
    }

    /// Checkin refused: either nothing is checked out or someone else holds it.
    pub fn is_not_checked_out(&self) -> bool {
        matches!(
            self,
            Self::NotCheckedOut { .. } | Self::CheckedOutByOther { .. }
        )
    }

    /// The target directory does not satisfy the project layout contract.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::AlreadyProject { .. } | Self::MissingProjectFile { .. } | Self::NotADirectory { .. }
        )
    }

    /// Lock state was persisted but files were only partially moved.
    pub fn is_partial_copy(&self) -> bool {
        matches!(self, Self::Transfer { .. })
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

realay_common::impl_context!();
