//! Core domain layer for pbxgen.
//!
//! This module contains the project-spec model, the object graph and spec
//! validation. It performs no I/O: anything that needs the filesystem is
//! handed in by the application layer.
//!
//! ## Contents
//!
//! - **Value objects**: platforms, product types, phases, glob behaviours
//! - **Capabilities**: product and file-type registries
//! - **Entities**: spec, targets, settings, dependencies, schemes, graph
//! - **Validation**: every structural check on a spec, reported together

pub mod capabilities;
pub mod entities;
pub mod error;
pub mod value_objects;

mod validation;

/// Display name of scripts and execution actions declared without one.
pub const DEFAULT_SCRIPT_NAME: &str = "Run Script";

pub use entities::{
    dependency::{Dependency, DependencyKind},
    graph::{
        BuildableReference, Declaration, Isa, Object, ObjectGraph, ObjectId, SchemeDocument,
        Value,
    },
    project::{
        Config, DisabledValidation, GroupOrdering, Package, ProjectSpec, SpecOptions,
        VersionRequirement,
    },
    scheme::{
        ActionCommon, ActionConfigs, AnalyzeAction, ArchiveAction, BuildAction, BuildTarget,
        EnvironmentVariable, ExecutionAction, ProfileAction, RunAction, Scheme, TargetScheme,
        TestAction, TestPlan, TestTarget,
    },
    settings::{BuildSettings, ConfigSettings, SettingValue, Settings, merge_settings},
    target::{
        AggregateTarget, AnyTarget, BuildRule, BuildScript, FileMatcher, HeaderVisibility,
        InfoPlist, PlistValue, ProjectTarget, RuleAction, ScriptSource, Target, TargetSource,
    },
};

pub use error::{DomainError, ErrorCategory};

pub use value_objects::{
    BuildFor, BuildPhase, BuildPhaseOverride, ConfigKind, GlobBehavior, Linkage, Platform,
    ProductType, ScriptTiming, SettingPresets, SortPosition, SourceType,
};

pub use validation::{SpecValidator, ValidationContext};

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn platform_parsing_is_case_insensitive() {
        assert_eq!(Platform::from_str("IOS").unwrap(), Platform::Ios);
        assert_eq!(Platform::from_str("macos").unwrap(), Platform::Macos);
        assert!(matches!(
            Platform::from_str("amiga"),
            Err(DomainError::UnknownPlatform(_))
        ));
    }

    #[test]
    fn platform_framework_dir() {
        assert_eq!(Platform::Macos.framework_dir(), "Mac");
        assert_eq!(Platform::Ios.framework_dir(), "iOS");
    }

    #[test]
    fn product_type_identifiers() {
        assert_eq!(
            ProductType::Application.identifier(),
            "com.apple.product-type.application"
        );
        assert_eq!(
            ProductType::from_str("bundle.unit-test").unwrap(),
            ProductType::UnitTestBundle
        );
        assert!(ProductType::from_str("toaster").is_err());
    }

    #[test]
    fn product_type_serde_uses_identifier_suffix() {
        let parsed: ProductType = serde_json::from_str("\"library.static\"").unwrap();
        assert_eq!(parsed, ProductType::StaticLibrary);
        assert_eq!(
            serde_json::to_string(&ProductType::UiTestBundle).unwrap(),
            "\"bundle.ui-testing\""
        );
    }

    #[test]
    fn glob_behavior_presets() {
        assert!(!GlobBehavior::BashV3.supports_globstar());
        assert!(GlobBehavior::BashV4.supports_globstar());
        assert!(GlobBehavior::BashV4.includes_directories());
        assert!(!GlobBehavior::Gradle.includes_directories());
        assert!(GlobBehavior::Gradle.includes_files_if_trailing_slash());
        assert_eq!(GlobBehavior::default(), GlobBehavior::BashV4);
    }

    #[test]
    fn explicit_none_phase_differs_from_absent() {
        assert_eq!(BuildPhaseOverride::None.phase(), None);
        assert_eq!(
            BuildPhaseOverride::Resources.phase(),
            Some(BuildPhase::Resources)
        );
    }

    #[test]
    fn setting_presets_scope() {
        assert!(SettingPresets::All.applies_to_project());
        assert!(SettingPresets::All.applies_to_targets());
        assert!(!SettingPresets::Project.applies_to_targets());
        assert!(!SettingPresets::None.applies_to_project());
    }

    #[test]
    fn spec_round_trips_through_json() {
        let json = r#"{
            "name": "Demo",
            "targets": [{
                "name": "App",
                "type": "application",
                "platform": "iOS",
                "sources": [{"path": "Sources", "excludes": ["B"]}],
                "dependencies": [{"target": "Core"}, {"sdk": {"reference": "UIKit.framework"}}]
            }, {
                "name": "Core",
                "type": "framework",
                "platform": "iOS"
            }]
        }"#;
        let spec: ProjectSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.targets.len(), 2);
        assert_eq!(spec.targets[0].sources[0].excludes, vec!["B"]);

        let again: ProjectSpec =
            serde_json::from_str(&serde_json::to_string(&spec).unwrap()).unwrap();
        assert_eq!(spec, again);
    }
}
