//! Application layer for pbxgen.
//!
//! This layer contains:
//! - **Services**: resolution, graph building, serialization, writing and caching
//! - **Ports**: Interface definitions (traits) for external dependencies
//! - **Errors**: Application-specific error types
//!
//! Rules about what a valid spec is live in `crate::domain`. This layer
//! only coordinates them with the outside world.

pub mod error;
pub mod ports;
pub mod services;

// Re-export main services
pub use services::{CacheManager, Generator, GeneratorOptions, ProjectWriter};

// Re-export port traits (for adapter implementation)
pub use ports::{Filesystem, FrameworkMetadata, PresetKey, PresetLibrary};

pub use error::ApplicationError;
