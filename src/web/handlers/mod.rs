//! API handlers.

pub mod files;
pub mod folders;

pub use files::*;
pub use folders::*;

use std::sync::Arc;

use crate::archive::{ArchiveOptions, ArchivePipeline};
use crate::drive::DriveSource;
use crate::registry::Registry;

/// Shared application state.
pub struct AppState {
    /// Folder registry.
    pub registry: Arc<Registry>,
    /// Remote file store.
    pub drive: Arc<dyn DriveSource>,
    /// Archive builder.
    pub archive: ArchivePipeline,
}

impl AppState {
    /// Create the application state.
    pub fn new(
        registry: Arc<Registry>,
        drive: Arc<dyn DriveSource>,
        archive_options: ArchiveOptions,
    ) -> Self {
        let archive = ArchivePipeline::new(registry.clone(), drive.clone(), archive_options);
        Self {
            registry,
            drive,
            archive,
        }
    }
}
