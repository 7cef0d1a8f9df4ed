//! Infrastructure adapters for pbxgen.
//!
//! This crate implements the ports defined in `pbxgen-core::application::ports`.
//! It contains all external dependencies and I/O operations.

pub mod cache;
pub mod error;
pub mod filesystem;
pub mod framework_metadata;
pub mod presets;
pub mod spec_loader;

// Re-export commonly used adapters
pub use cache::{cache_for_spec, default_cache_dir};
pub use error::LoadError;
pub use filesystem::{LocalFilesystem, MemoryFilesystem};
pub use framework_metadata::VersionFileMetadata;
pub use presets::{BuiltinPresets, DirectoryPresets};
pub use spec_loader::load_spec;
