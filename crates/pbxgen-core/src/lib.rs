//! pbxgen Core - Hexagonal Architecture Implementation
//!
//! This crate provides the domain and application layers for the pbxgen
//! project generator, following hexagonal (ports and adapters) architecture.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │            pbxgen-cli (CLI)             │
//! │       (Implements Driving Ports)        │
//! └──────────────────┬──────────────────────┘
//!                    │ calls
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │          Application Services           │
//! │  (Generator, ProjectWriter, CacheMgr)   │
//! │     Resolve, build, serialize, write    │
//! └──────────────────┬──────────────────────┘
//!                    │ uses
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │       Application Ports (Traits)        │
//! │ (Filesystem, Presets, FrameworkMetadata)│
//! └──────────────────┬──────────────────────┘
//!                    │ implemented by
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │     pbxgen-adapters (Infrastructure)    │
//! │ (LocalFilesystem, BuiltinPresets, etc)  │
//! └─────────────────────────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │        Domain Layer (Pure Logic)        │
//! │ (ProjectSpec, Target, Scheme, Objects)  │
//! │        No Ports, No Logging             │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use pbxgen_core::application::{Generator, GeneratorOptions};
//!
//! // 1. Load a spec (see pbxgen-adapters)
//! let spec = load_spec("project.json")?;
//!
//! // 2. Resolve and write (with injected adapters)
//! let generator = Generator::new(filesystem, presets, metadata, GeneratorOptions::default());
//! let graph = generator.resolve(&spec)?;
//! generator.write(&graph, &spec.base_path, true)?;
//! ```

pub mod domain;

pub mod application;

pub mod error;

// Public API - what external crates should use
pub mod prelude {
    pub use crate::application::{
        CacheManager, Generator, GeneratorOptions, ProjectWriter,
        ports::{Filesystem, FrameworkMetadata, PresetKey, PresetLibrary},
    };
    pub use crate::domain::{
        AggregateTarget, Config, Dependency, ObjectGraph, Platform, ProductType, ProjectSpec,
        Scheme, Settings, Target, TargetSource,
    };
    pub use crate::error::{PbxError, PbxResult};
}

// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
