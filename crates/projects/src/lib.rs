//! Checkout/checkin coordination for project directories in a shared
//! drop location.
//!
//! A project is a directory `<name>/` containing `<name>.<ext>` and a
//! `realay.dat` lock record. Checking out takes the lock and replaces the
//! user's local working copy with the shared tree; checking in releases the
//! lock and copies the working copy back over the shared tree. Exclusion is
//! advisory: it is only as strong as every participant honouring the record.

pub mod context;
pub mod error;
pub mod localize;
pub mod metadata;
pub mod project;
pub mod registry;
pub mod sync;

pub use {
    context::SyncContext,
    error::{Error, Result},
    localize::UserPathLocalizer,
    metadata::{META_FILENAME, MetadataStore, ProjectMetadata, ProjectStatus},
    project::Project,
    registry::{ProjectRegistry, ScanResult},
    sync::TreeStats,
};
