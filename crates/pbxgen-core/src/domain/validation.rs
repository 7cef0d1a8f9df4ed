use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::domain::{
    entities::{
        dependency::DependencyKind,
        project::{DisabledValidation, ProjectSpec},
        settings::Settings,
        target::{BuildScript, ProjectTarget, ScriptSource, Target},
    },
    error::DomainError,
    value_objects::{BuildPhaseOverride, ConfigKind, SourceType},
};

/// What validation needs to know about the world outside the spec.
pub struct ValidationContext<'a> {
    /// Version of the running tool.
    pub tool_version: &'a semver::Version,
    /// Whether a path (already joined to the base path) exists.
    pub path_exists: &'a dyn Fn(&Path) -> bool,
    /// Whether a name is provided by the preset library.
    pub is_preset: &'a dyn Fn(&str) -> bool,
}

/// Centralized spec validation.
///
/// Every check runs; failures are reported together.
pub struct SpecValidator;

impl SpecValidator {
    pub fn validate(spec: &ProjectSpec, ctx: &ValidationContext<'_>) -> Result<(), DomainError> {
        let mut errors = Vec::new();

        Self::check_tool_version(spec, ctx, &mut errors);
        Self::check_names(spec, &mut errors);
        Self::check_configs(spec, &mut errors);
        Self::check_settings(spec, ctx, &mut errors);
        Self::check_file_groups(spec, ctx, &mut errors);
        for target in &spec.targets {
            Self::check_target(spec, target, ctx, &mut errors);
        }
        Self::check_aggregates(spec, ctx, &mut errors);
        Self::check_schemes(spec, &mut errors);

        match DomainError::collect(errors) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Parse a version, accepting `1` and `1.2` as `1.0.0` and `1.2.0`.
    pub fn parse_version(value: &str) -> Option<semver::Version> {
        let trimmed = value.trim();
        let padded = match trimmed.matches('.').count() {
            0 => format!("{trimmed}.0.0"),
            1 => format!("{trimmed}.0"),
            _ => trimmed.to_string(),
        };
        semver::Version::parse(&padded).ok()
    }

    fn check_tool_version(
        spec: &ProjectSpec,
        ctx: &ValidationContext<'_>,
        errors: &mut Vec<DomainError>,
    ) {
        let Some(required) = &spec.options.minimum_tool_version else {
            return;
        };
        match Self::parse_version(required) {
            Some(version) if &version > ctx.tool_version => {
                errors.push(DomainError::ToolVersionTooLow {
                    required: version.to_string(),
                    current: ctx.tool_version.to_string(),
                });
            }
            Some(_) => {}
            None => errors.push(DomainError::InvalidValue {
                field: "minimum tool version",
                value: required.clone(),
            }),
        }
    }

    fn check_names(spec: &ProjectSpec, errors: &mut Vec<DomainError>) {
        let mut seen = BTreeSet::new();
        for target in spec.all_targets() {
            if !seen.insert(target.name().to_string()) {
                errors.push(DomainError::DuplicateTarget {
                    name: target.name().to_string(),
                });
            }
        }

        let mut seen = BTreeSet::new();
        for scheme in &spec.schemes {
            if !seen.insert(scheme.name.as_str()) {
                errors.push(DomainError::DuplicateScheme {
                    name: scheme.name.clone(),
                });
            }
        }
    }

    fn check_configs(spec: &ProjectSpec, errors: &mut Vec<DomainError>) {
        if !spec.options.is_disabled(DisabledValidation::MissingConfigs) {
            for kind in [ConfigKind::Debug, ConfigKind::Release] {
                if spec.first_config(kind).is_none() {
                    errors.push(DomainError::MissingConfigKind {
                        kind: kind.to_string(),
                    });
                }
            }
        }

        if let Some(default) = &spec.options.default_config {
            if spec.config(default).is_none() {
                errors.push(DomainError::UnknownDefaultConfig {
                    config: default.clone(),
                });
            }
        }
    }

    fn check_settings(
        spec: &ProjectSpec,
        ctx: &ValidationContext<'_>,
        errors: &mut Vec<DomainError>,
    ) {
        Self::check_settings_block("project", &spec.settings, spec, ctx, errors);
        for (name, group) in &spec.setting_groups {
            Self::check_settings_block(&format!("settings group '{name}'"), group, spec, ctx, errors);
        }
        for target in spec.all_targets() {
            Self::check_settings_block(
                &format!("target '{}'", target.name()),
                target.settings(),
                spec,
                ctx,
                errors,
            );
        }
    }

    fn check_settings_block(
        owner: &str,
        settings: &Settings,
        spec: &ProjectSpec,
        ctx: &ValidationContext<'_>,
        errors: &mut Vec<DomainError>,
    ) {
        for group in settings.referenced_groups() {
            if !spec.setting_groups.contains_key(group) && !(ctx.is_preset)(group) {
                errors.push(DomainError::UnknownSettingsGroup {
                    owner: owner.to_string(),
                    group: group.to_string(),
                });
            }
        }

        for scoped in &settings.config_settings {
            let is_kind = scoped.config.parse::<ConfigKind>().is_ok();
            if !is_kind && spec.config(&scoped.config).is_none() {
                errors.push(DomainError::UnknownSettingsConfig {
                    owner: owner.to_string(),
                    config: scoped.config.clone(),
                });
            }
        }
    }

    fn check_file_groups(
        spec: &ProjectSpec,
        ctx: &ValidationContext<'_>,
        errors: &mut Vec<DomainError>,
    ) {
        for path in &spec.file_groups {
            if !(ctx.path_exists)(&spec.base_path.join(path)) {
                errors.push(DomainError::MissingFileGroup { path: path.clone() });
            }
        }
    }

    fn check_target(
        spec: &ProjectSpec,
        target: &Target,
        ctx: &ValidationContext<'_>,
        errors: &mut Vec<DomainError>,
    ) {
        let name = &target.name;

        for dependency in &target.dependencies {
            match &dependency.kind {
                DependencyKind::Target(dep) => {
                    if spec.project_target(dep).is_none() {
                        errors.push(DomainError::InvalidTargetDependency {
                            target: name.clone(),
                            dependency: dep.clone(),
                        });
                    }
                }
                DependencyKind::Package {
                    name: package,
                    products,
                } => {
                    if !spec.packages.contains_key(package) {
                        errors.push(DomainError::UnknownPackage {
                            target: name.clone(),
                            package: package.clone(),
                        });
                    }
                    if products.is_empty() {
                        errors.push(DomainError::EmptyPackageProducts {
                            target: name.clone(),
                            package: package.clone(),
                        });
                    }
                }
                DependencyKind::Sdk { reference, .. } => {
                    let linkable = [".framework", ".tbd", ".dylib"]
                        .iter()
                        .any(|ext| reference.ends_with(ext));
                    if !linkable && !reference.contains('/') {
                        errors.push(DomainError::InvalidSdkDependency {
                            target: name.clone(),
                            reference: reference.clone(),
                        });
                    }
                }
                DependencyKind::Prebuilt { .. } => {}
            }
        }

        // Same path declared twice must agree on how it is represented.
        let mut overrides: BTreeMap<&str, (Option<SourceType>, Option<BuildPhaseOverride>)> =
            BTreeMap::new();
        for source in &target.sources {
            let path = source.normalized_path();
            if !source.optional && !(ctx.path_exists)(&spec.base_path.join(path)) {
                errors.push(DomainError::MissingSourcePath {
                    target: name.clone(),
                    path: source.path.clone(),
                });
            }
            let entry = overrides.entry(path).or_insert((None, None));
            if let Some(source_type) = source.source_type {
                match entry.0 {
                    Some(previous) if previous != source_type => {
                        errors.push(DomainError::ConflictingSourceOverride {
                            target: name.clone(),
                            path: path.to_string(),
                            field: "type",
                        })
                    }
                    _ => entry.0 = Some(source_type),
                }
            }
            if let Some(phase) = source.build_phase {
                match entry.1 {
                    Some(previous) if previous != phase => {
                        errors.push(DomainError::ConflictingSourceOverride {
                            target: name.clone(),
                            path: path.to_string(),
                            field: "build phase",
                        })
                    }
                    _ => entry.1 = Some(phase),
                }
            }
        }

        Self::check_scripts(spec, name, &target.build_scripts, ctx, errors);

        if let Some(scheme) = &target.scheme {
            for variant in &scheme.config_variants {
                for kind in [ConfigKind::Debug, ConfigKind::Release] {
                    let found = spec.configs.iter().any(|c| {
                        c.kind == kind && c.name.to_lowercase().contains(&variant.to_lowercase())
                    });
                    if !found {
                        errors.push(DomainError::InvalidConfigVariant {
                            target: name.clone(),
                            variant: variant.clone(),
                            kind: kind.to_string(),
                        });
                    }
                }
            }
            for test in &scheme.test_targets {
                if spec.project_target(&test.target).is_none() {
                    errors.push(DomainError::InvalidTargetSchemeTest {
                        target: name.clone(),
                        test_target: test.target.clone(),
                    });
                }
            }
        }
    }

    fn check_scripts(
        spec: &ProjectSpec,
        owner: &str,
        scripts: &[BuildScript],
        ctx: &ValidationContext<'_>,
        errors: &mut Vec<DomainError>,
    ) {
        for script in scripts {
            if let ScriptSource::Path(path) = &script.source {
                if !(ctx.path_exists)(&spec.base_path.join(path)) {
                    errors.push(DomainError::MissingBuildScript {
                        target: owner.to_string(),
                        path: path.clone(),
                    });
                }
            }
        }
    }

    fn check_aggregates(
        spec: &ProjectSpec,
        ctx: &ValidationContext<'_>,
        errors: &mut Vec<DomainError>,
    ) {
        for aggregate in &spec.aggregate_targets {
            for target in &aggregate.targets {
                if spec.project_target(target).is_none() {
                    errors.push(DomainError::InvalidAggregateTarget {
                        aggregate: aggregate.name.clone(),
                        target: target.clone(),
                    });
                }
            }
            Self::check_scripts(spec, &aggregate.name, &aggregate.build_scripts, ctx, errors);
        }
    }

    fn check_schemes(spec: &ProjectSpec, errors: &mut Vec<DomainError>) {
        for scheme in &spec.schemes {
            for target in scheme.referenced_targets() {
                if spec.project_target(target).is_none() {
                    errors.push(DomainError::InvalidSchemeTarget {
                        scheme: scheme.name.clone(),
                        target: target.to_string(),
                    });
                }
            }
            for config in scheme.referenced_configs() {
                if spec.config(config).is_none() {
                    errors.push(DomainError::InvalidSchemeConfig {
                        scheme: scheme.name.clone(),
                        config: config.to_string(),
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::entities::{
        dependency::Dependency,
        project::Config,
        scheme::{BuildAction, BuildTarget, Scheme, TargetScheme},
        target::TargetSource,
    };
    use crate::domain::value_objects::{BuildFor, Platform, ProductType};

    fn validate(spec: &ProjectSpec) -> Result<(), DomainError> {
        let version = semver::Version::new(1, 0, 0);
        let ctx = ValidationContext {
            tool_version: &version,
            path_exists: &|_| true,
            is_preset: &|name| name == "base",
        };
        SpecValidator::validate(spec, &ctx)
    }

    fn app() -> Target {
        Target::new("App", ProductType::Application, Platform::Ios)
    }

    #[test]
    fn valid_spec_passes() {
        let spec = ProjectSpec::new("Demo", ".").with_target(app());
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn unknown_dependency_is_named() {
        let spec = ProjectSpec::new("Demo", ".")
            .with_target(app().with_dependency(Dependency::target("Ghost")));
        let err = validate(&spec).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTargetDependency {
                target: "App".into(),
                dependency: "Ghost".into(),
            }
        );
    }

    #[test]
    fn errors_are_collected() {
        let mut spec = ProjectSpec::new("Demo", ".")
            .with_target(app().with_dependency(Dependency::target("Ghost")))
            .with_scheme(Scheme::new(
                "Broken",
                BuildAction {
                    targets: vec![BuildTarget::new("Nope", BuildFor::all())],
                    ..BuildAction::default()
                },
            ));
        spec.configs = vec![Config::debug("Debug")];

        match validate(&spec).unwrap_err() {
            DomainError::Multiple { count, errors } => {
                assert_eq!(count, 3);
                assert!(errors.contains(&DomainError::MissingConfigKind {
                    kind: "release".into()
                }));
                assert!(errors.contains(&DomainError::InvalidSchemeTarget {
                    scheme: "Broken".into(),
                    target: "Nope".into()
                }));
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn unknown_settings_group_fails() {
        let spec = ProjectSpec::new("Demo", ".").with_target(
            app().with_settings(Settings::new().with_group("base").with_group("mystery")),
        );
        assert_eq!(
            validate(&spec).unwrap_err(),
            DomainError::UnknownSettingsGroup {
                owner: "target 'App'".into(),
                group: "mystery".into(),
            }
        );
    }

    #[test]
    fn conflicting_type_overrides_fail() {
        let spec = ProjectSpec::new("Demo", ".").with_target(
            app()
                .with_source(TargetSource::new("Res").with_type(SourceType::Folder))
                .with_source(TargetSource::new("Res/").with_type(SourceType::Group)),
        );
        assert!(matches!(
            validate(&spec).unwrap_err(),
            DomainError::ConflictingSourceOverride { field: "type", .. }
        ));
    }

    #[test]
    fn matching_duplicate_overrides_pass() {
        let spec = ProjectSpec::new("Demo", ".").with_target(
            app()
                .with_source(TargetSource::new("a.txt").with_build_phase(BuildPhaseOverride::None))
                .with_source(TargetSource::new("a.txt").with_build_phase(BuildPhaseOverride::None)),
        );
        assert!(validate(&spec).is_ok());
    }

    #[test]
    fn missing_source_fails_unless_optional() {
        let version = semver::Version::new(1, 0, 0);
        let ctx = ValidationContext {
            tool_version: &version,
            path_exists: &|_| false,
            is_preset: &|_| false,
        };
        let mut source = TargetSource::new("Generated");
        let spec = ProjectSpec::new("Demo", ".").with_target(app().with_source(source.clone()));
        assert!(matches!(
            SpecValidator::validate(&spec, &ctx).unwrap_err(),
            DomainError::MissingSourcePath { .. }
        ));

        source.optional = true;
        let spec = ProjectSpec::new("Demo", ".").with_target(app().with_source(source));
        assert!(SpecValidator::validate(&spec, &ctx).is_ok());
    }

    #[test]
    fn config_variant_needs_both_kinds() {
        let mut spec = ProjectSpec::new("Demo", ".").with_target(app().with_scheme(TargetScheme {
            config_variants: vec!["Staging".into()],
            ..TargetScheme::default()
        }));
        spec.configs.push(Config::debug("Staging Debug"));

        assert_eq!(
            validate(&spec).unwrap_err(),
            DomainError::InvalidConfigVariant {
                target: "App".into(),
                variant: "Staging".into(),
                kind: "release".into(),
            }
        );
    }

    #[test]
    fn sdk_dependency_needs_linkable_extension() {
        let spec = ProjectSpec::new("Demo", ".").with_target(
            app()
                .with_dependency(Dependency::sdk("UIKit.framework"))
                .with_dependency(Dependency::sdk("libz.tbd"))
                .with_dependency(Dependency::sdk("UIKit")),
        );
        assert_eq!(
            validate(&spec).unwrap_err(),
            DomainError::InvalidSdkDependency {
                target: "App".into(),
                reference: "UIKit".into(),
            }
        );
    }

    #[test]
    fn minimum_tool_version() {
        let mut spec = ProjectSpec::new("Demo", ".");
        spec.options.minimum_tool_version = Some("2.1".into());
        assert_eq!(
            validate(&spec).unwrap_err(),
            DomainError::ToolVersionTooLow {
                required: "2.1.0".into(),
                current: "1.0.0".into(),
            }
        );

        spec.options.minimum_tool_version = Some("0.9".into());
        assert!(validate(&spec).is_ok());
    }
}
