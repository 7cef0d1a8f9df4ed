pub mod dependency;
pub mod graph;
pub mod project;
pub mod scheme;
pub mod settings;
pub mod target;

pub use crate::domain::DomainError;
pub use dependency::{Dependency, DependencyKind};
pub use graph::{ObjectGraph, ObjectId};
pub use project::{Config, ProjectSpec, SpecOptions};
pub use scheme::{Scheme, TargetScheme};
pub use settings::{BuildSettings, SettingValue, Settings};
pub use target::{AggregateTarget, AnyTarget, ProjectTarget, Target, TargetSource};
