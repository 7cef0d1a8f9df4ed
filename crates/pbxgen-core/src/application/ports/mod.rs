//! Application ports (traits) for external dependencies.
//!
//! In hexagonal architecture, ports define interfaces that the application
//! needs from the outside world. Adapters in `pbxgen-adapters` implement these.
//!
//! ## Port Types
//!
//! - **Driven (Output) Ports**: Called by application, implemented by infrastructure
//!   - `Filesystem`: reading source trees, writing the project bundle and cache
//!   - `PresetLibrary`: named build-setting presets
//!   - `FrameworkMetadata`: sub-dependencies of prebuilt frameworks
//!
//! - **Driving (Input) Ports**: Called by external world, implemented by application
//!   - (`Generator` in `services::pipeline`)

pub mod output;

pub use output::{Filesystem, FrameworkMetadata, PresetKey, PresetLibrary};

#[cfg(test)]
pub use output::MockFilesystem;
