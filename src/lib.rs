//! drivegate - token-gated photo gallery over Google Drive folders.
//!
//! Folders are registered under opaque tokens; a token lists the folder's
//! files and downloads a selection of them as one streamed ZIP archive.

pub mod archive;
pub mod config;
pub mod drive;
pub mod error;
pub mod logging;
pub mod registry;
pub mod web;

pub use archive::{ArchiveOptions, ArchivePipeline, ArchiveRequest, ArchiveStream};
pub use config::Config;
pub use drive::{DriveClient, DriveSource, FileDescriptor, FileMetadata};
pub use error::{GateError, Result, ValidationError};
pub use registry::{RegistrationRequest, Registry, RegistryEntry, RegistryStore};
