//! Scheme synthesizer.
//!
//! Declared schemes get their missing actions and configs filled in. Targets
//! that request a scheme get one per config variant, built from the target's
//! defaults.

use tracing::{debug, instrument};

use crate::{
    domain::{
        ActionCommon, AnalyzeAction, AnyTarget, ArchiveAction, BuildAction, BuildFor, BuildTarget,
        Config, ConfigKind, DomainError, ProfileAction, ProjectSpec, ProjectTarget, RunAction,
        Scheme, TargetScheme, TestAction,
    },
    error::PbxResult,
};

/// Config names picked for each action of one scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ActionDefaults {
    debug: String,
    release: String,
}

pub struct SchemeSynthesizer<'a> {
    spec: &'a ProjectSpec,
}

impl<'a> SchemeSynthesizer<'a> {
    pub fn new(spec: &'a ProjectSpec) -> Self {
        Self { spec }
    }

    /// Every scheme of the project: declared ones first in declared order,
    /// then derived target schemes in target order.
    #[instrument(skip_all)]
    pub fn synthesize_all(&self) -> PbxResult<Vec<Scheme>> {
        let mut schemes = Vec::new();
        for scheme in &self.spec.schemes {
            schemes.push(self.complete(scheme)?);
        }
        for target in self.spec.all_targets() {
            if target.scheme().is_some() {
                schemes.extend(self.for_target(target)?);
            }
        }
        debug!(count = schemes.len(), "Schemes synthesized");
        Ok(schemes)
    }

    /// Fill in every action of a declared scheme.
    pub fn complete(&self, scheme: &Scheme) -> PbxResult<Scheme> {
        self.check_targets(scheme)?;
        let defaults = self.defaults(None, &scheme.name)?;
        let mut scheme = scheme.clone();

        let run = scheme.run.get_or_insert_with(RunAction::default);
        run.common.config.get_or_insert_with(|| defaults.debug.clone());
        if run.executable.is_none() {
            run.executable = scheme
                .build
                .targets
                .iter()
                .find(|t| t.build_for.running)
                .map(|t| t.target.clone());
        }

        let test = scheme.test.get_or_insert_with(TestAction::default);
        test.common.config.get_or_insert_with(|| defaults.debug.clone());

        let profile = scheme.profile.get_or_insert_with(ProfileAction::default);
        profile.common.config.get_or_insert_with(|| defaults.release.clone());

        let analyze = scheme.analyze.get_or_insert_with(AnalyzeAction::default);
        analyze.config.get_or_insert_with(|| defaults.debug.clone());

        let archive = scheme.archive.get_or_insert_with(ArchiveAction::default);
        archive.common.config.get_or_insert_with(|| defaults.release.clone());

        Ok(scheme)
    }

    /// Schemes derived from a target's scheme request, one per variant.
    #[instrument(skip_all, fields(target = %target.name()))]
    pub fn for_target(&self, target: AnyTarget<'_>) -> PbxResult<Vec<Scheme>> {
        let Some(request) = target.scheme() else {
            return Ok(Vec::new());
        };

        for test in &request.test_targets {
            if self.spec.project_target(&test.target).is_none() {
                return Err(DomainError::InvalidTargetSchemeTest {
                    target: target.name().to_string(),
                    test_target: test.target.clone(),
                }
                .into());
            }
        }

        if request.config_variants.is_empty() {
            let defaults = self.defaults(None, target.name())?;
            return Ok(vec![self.derive(target, request, target.name(), &defaults)]);
        }

        request
            .config_variants
            .iter()
            .map(|variant| {
                let defaults = self.defaults(Some(variant.as_str()), target.name())?;
                let name = format!("{} {variant}", target.name());
                Ok(self.derive(target, request, &name, &defaults))
            })
            .collect()
    }

    fn derive(
        &self,
        target: AnyTarget<'_>,
        request: &TargetScheme,
        name: &str,
        defaults: &ActionDefaults,
    ) -> Scheme {
        let configs = &request.configs;
        let pick = |explicit: &Option<String>, fallback: &String| {
            Some(explicit.clone().unwrap_or_else(|| fallback.clone()))
        };

        let mut build_targets = vec![BuildTarget::new(target.name(), BuildFor::all())];
        for test in &request.test_targets {
            if test.target != target.name() {
                build_targets.push(BuildTarget::new(&test.target, BuildFor::test_only()));
            }
        }

        let executable = target
            .as_native()
            .filter(|t| t.product_type.is_executable())
            .map(|t| t.name.clone());

        Scheme {
            name: name.to_string(),
            build: BuildAction {
                targets: build_targets,
                pre_actions: request.pre_actions.clone(),
                post_actions: request.post_actions.clone(),
                ..BuildAction::default()
            },
            run: Some(RunAction {
                common: ActionCommon {
                    config: pick(&configs.run, &defaults.debug),
                    environment_variables: request.environment_variables.clone(),
                    command_line_arguments: request.command_line_arguments.clone(),
                    ..ActionCommon::default()
                },
                executable,
            }),
            test: Some(TestAction {
                common: ActionCommon {
                    config: pick(&configs.test, &defaults.debug),
                    ..ActionCommon::default()
                },
                gather_coverage: request.gather_coverage,
                coverage_targets: request.coverage_targets.clone(),
                targets: request.test_targets.clone(),
                test_plans: request.test_plans.clone(),
            }),
            profile: Some(ProfileAction {
                common: ActionCommon {
                    config: pick(&configs.profile, &defaults.release),
                    ..ActionCommon::default()
                },
            }),
            analyze: Some(AnalyzeAction {
                config: pick(&configs.analyze, &defaults.debug),
            }),
            archive: Some(ArchiveAction {
                common: ActionCommon {
                    config: pick(&configs.archive, &defaults.release),
                    ..ActionCommon::default()
                },
                ..ArchiveAction::default()
            }),
        }
    }

    /// First debug and release configs, restricted to names containing
    /// `variant` when one is given.
    fn defaults(&self, variant: Option<&str>, owner: &str) -> PbxResult<ActionDefaults> {
        let find = |kind: ConfigKind| -> PbxResult<String> {
            let matching = |config: &&Config| {
                config.kind == kind
                    && variant.is_none_or(|v| config.name.to_lowercase().contains(&v.to_lowercase()))
            };
            match self.spec.configs.iter().find(matching) {
                Some(config) => Ok(config.name.clone()),
                None => Err(match variant {
                    Some(variant) => DomainError::InvalidConfigVariant {
                        target: owner.to_string(),
                        variant: variant.to_string(),
                        kind: kind.to_string(),
                    },
                    None => DomainError::MissingConfigKind {
                        kind: kind.to_string(),
                    },
                }
                .into()),
            }
        };
        Ok(ActionDefaults {
            debug: find(ConfigKind::Debug)?,
            release: find(ConfigKind::Release)?,
        })
    }

    fn check_targets(&self, scheme: &Scheme) -> PbxResult<()> {
        for name in scheme.referenced_targets() {
            if self.spec.project_target(name).is_none() {
                return Err(DomainError::InvalidSchemeTarget {
                    scheme: scheme.name.clone(),
                    target: name.to_string(),
                }
                .into());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ActionConfigs, EnvironmentVariable, Platform, ProductType, Target, TestTarget,
    };
    use crate::error::PbxError;

    fn spec_with(target: Target) -> ProjectSpec {
        ProjectSpec::new("Demo", "/p")
            .with_target(target)
            .with_target(Target::new("AppTests", ProductType::UnitTestBundle, Platform::Ios))
    }

    fn app() -> Target {
        Target::new("App", ProductType::Application, Platform::Ios)
    }

    fn configs(scheme: &Scheme) -> [Option<&str>; 5] {
        [
            scheme.run.as_ref().and_then(|a| a.common.config.as_deref()),
            scheme.test.as_ref().and_then(|a| a.common.config.as_deref()),
            scheme.analyze.as_ref().and_then(|a| a.config.as_deref()),
            scheme.profile.as_ref().and_then(|a| a.common.config.as_deref()),
            scheme.archive.as_ref().and_then(|a| a.common.config.as_deref()),
        ]
    }

    #[test]
    fn derived_scheme_uses_kind_defaults() {
        let spec = spec_with(app().with_scheme(TargetScheme::default()));
        let schemes = SchemeSynthesizer::new(&spec).synthesize_all().unwrap();

        assert_eq!(schemes.len(), 1);
        assert_eq!(schemes[0].name, "App");
        assert_eq!(
            configs(&schemes[0]),
            [Some("Debug"), Some("Debug"), Some("Debug"), Some("Release"), Some("Release")]
        );
        assert_eq!(
            schemes[0].run.as_ref().and_then(|r| r.executable.as_deref()),
            Some("App")
        );
    }

    #[test]
    fn explicit_action_config_wins() {
        let spec = spec_with(app().with_scheme(TargetScheme {
            configs: ActionConfigs {
                archive: Some("Debug".into()),
                ..ActionConfigs::default()
            },
            ..TargetScheme::default()
        }));

        let schemes = SchemeSynthesizer::new(&spec).synthesize_all().unwrap();
        assert_eq!(configs(&schemes[0])[4], Some("Debug"));
    }

    #[test]
    fn one_scheme_per_variant() {
        let mut spec = spec_with(app().with_scheme(TargetScheme {
            config_variants: vec!["Staging".into(), "Production".into()],
            ..TargetScheme::default()
        }));
        spec.configs = vec![
            Config::debug("Staging Debug"),
            Config::release("Staging Release"),
            Config::debug("Production Debug"),
            Config::release("Production Release"),
        ];

        let schemes = SchemeSynthesizer::new(&spec).synthesize_all().unwrap();
        let names: Vec<&str> = schemes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["App Staging", "App Production"]);
        assert_eq!(configs(&schemes[1])[0], Some("Production Debug"));
        assert_eq!(configs(&schemes[1])[4], Some("Production Release"));
    }

    #[test]
    fn environment_lives_on_run_only() {
        let spec = spec_with(app().with_scheme(TargetScheme {
            environment_variables: vec![EnvironmentVariable::new("API", "staging")],
            test_targets: vec![TestTarget::new("AppTests")],
            ..TargetScheme::default()
        }));
        let scheme = SchemeSynthesizer::new(&spec).synthesize_all().unwrap().remove(0);

        let run = scheme.run.as_ref().unwrap();
        let test = scheme.test.as_ref().unwrap();
        assert!(!run.common.should_use_launch_scheme_args_env());
        assert!(test.common.should_use_launch_scheme_args_env());
        assert_eq!(scheme.build.targets.len(), 2);
        assert_eq!(scheme.build.targets[1].build_for, BuildFor::test_only());
    }

    #[test]
    fn declared_scheme_gets_defaults() {
        let scheme = Scheme::new(
            "Everything",
            BuildAction {
                targets: vec![BuildTarget::new("App", BuildFor::all())],
                ..BuildAction::default()
            },
        );
        let spec = spec_with(app()).with_scheme(scheme);
        let completed = SchemeSynthesizer::new(&spec).synthesize_all().unwrap().remove(0);

        assert_eq!(
            configs(&completed),
            [Some("Debug"), Some("Debug"), Some("Debug"), Some("Release"), Some("Release")]
        );
        assert_eq!(
            completed.run.unwrap().executable.as_deref(),
            Some("App")
        );
    }

    #[test]
    fn unknown_scheme_target_is_named() {
        let scheme = Scheme::new(
            "Broken",
            BuildAction {
                targets: vec![BuildTarget::new("Ghost", BuildFor::all())],
                ..BuildAction::default()
            },
        );
        let spec = spec_with(app()).with_scheme(scheme);
        let err = SchemeSynthesizer::new(&spec).synthesize_all().unwrap_err();
        assert_eq!(
            err,
            PbxError::Domain(DomainError::InvalidSchemeTarget {
                scheme: "Broken".into(),
                target: "Ghost".into(),
            })
        );
    }
}
