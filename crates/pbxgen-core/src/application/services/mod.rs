//! Application services - orchestrate generation.
//!
//! Resolvers turn the spec into per-target data, the graph builder turns
//! that into objects, and the serializer and writer put the result on disk.
//! [`Generator`] ties them together.

pub mod cache;
pub mod dependencies;
pub mod glob;
pub mod graph_builder;
pub mod identifiers;
pub mod ordering;
pub mod pipeline;
pub mod schemes;
pub mod serializer;
pub mod settings;
pub mod sources;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::{CacheManager, SignatureInput, compute_signature};
pub use dependencies::{DependencyResolver, ResolvedDependency, ResolvedKind};
pub use graph_builder::{GraphBuilder, GraphInput, ResolvedTarget};
pub use pipeline::{Generator, GeneratorOptions};
pub use schemes::SchemeSynthesizer;
pub use settings::SettingsResolver;
pub use sources::{SourceTreeBuilder, TargetSources};
pub use writer::{ProjectWriter, bundle_path};
