use std::sync::Arc;

use realay_common::{Localizer, Logger, NoopLocalizer, TracingLogger};

/// Default primary project file extension (REAPER projects).
pub const DEFAULT_PROJECT_EXTENSION: &str = "rpp";

/// Capabilities and conventions shared by every project in a session.
///
/// Built once by the front end and cloned into each [`crate::Project`];
/// there is no process-wide logger or hook registry.
#[derive(Clone)]
pub struct SyncContext {
    pub logger: Arc<dyn Logger>,
    pub localizer: Arc<dyn Localizer>,
    /// Extension of the primary project file, without the leading dot.
    pub project_extension: String,
    /// Ignore dot-directories when scanning a root.
    pub skip_hidden: bool,
}

impl Default for SyncContext {
    fn default() -> Self {
        Self {
            logger: Arc::new(TracingLogger),
            localizer: Arc::new(NoopLocalizer),
            project_extension: DEFAULT_PROJECT_EXTENSION.into(),
            skip_hidden: true,
        }
    }
}

impl SyncContext {
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn with_project_extension(mut self, ext: impl Into<String>) -> Self {
        let ext = ext.into();
        self.project_extension = ext.trim_start_matches('.').to_string();
        self
    }

    pub fn with_skip_hidden(mut self, skip_hidden: bool) -> Self {
        self.skip_hidden = skip_hidden;
        self
    }

    pub(crate) fn log(&self, message: impl AsRef<str>) {
        self.logger.log(message.as_ref());
    }
}

impl std::fmt::Debug for SyncContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncContext")
            .field("localizer", &self.localizer.name())
            .field("project_extension", &self.project_extension)
            .field("skip_hidden", &self.skip_hidden)
            .finish_non_exhaustive()
    }
}
