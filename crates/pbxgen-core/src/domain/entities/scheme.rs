//! Schemes: declared per project or derived per target.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::BuildFor;

fn default_true() -> bool {
    true
}

// ── Shared action pieces ─────────────────────────────────────────────────────

/// Pre/post script run around a scheme action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionAction {
    #[serde(default)]
    pub name: Option<String>,
    pub script: String,
    /// Target whose build settings are exported to the script.
    #[serde(default)]
    pub settings_target: Option<String>,
}

impl ExecutionAction {
    pub fn new(script: impl Into<String>) -> Self {
        Self {
            name: None,
            script: script.into(),
            settings_target: None,
        }
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(crate::domain::DEFAULT_SCRIPT_NAME)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentVariable {
    pub variable: String,
    pub value: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl EnvironmentVariable {
    pub fn new(variable: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            variable: variable.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

/// Command-line argument to enabled flag.
pub type CommandLineArguments = BTreeMap<String, bool>;

// ── Actions ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildTarget {
    pub target: String,
    #[serde(default)]
    pub build_for: BuildFor,
}

impl BuildTarget {
    pub fn new(target: impl Into<String>, build_for: BuildFor) -> Self {
        Self {
            target: target.into(),
            build_for,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildAction {
    #[serde(default)]
    pub targets: Vec<BuildTarget>,
    #[serde(default = "default_true")]
    pub parallelize_build: bool,
    #[serde(default = "default_true")]
    pub build_implicit_dependencies: bool,
    #[serde(default)]
    pub pre_actions: Vec<ExecutionAction>,
    #[serde(default)]
    pub post_actions: Vec<ExecutionAction>,
}

impl Default for BuildAction {
    fn default() -> Self {
        Self {
            targets: Vec::new(),
            parallelize_build: true,
            build_implicit_dependencies: true,
            pre_actions: Vec::new(),
            post_actions: Vec::new(),
        }
    }
}

/// Fields shared by run, test, profile and archive actions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionCommon {
    pub config: Option<String>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub command_line_arguments: CommandLineArguments,
    pub pre_actions: Vec<ExecutionAction>,
    pub post_actions: Vec<ExecutionAction>,
}

impl ActionCommon {
    pub fn with_config(config: impl Into<String>) -> Self {
        Self {
            config: Some(config.into()),
            ..Self::default()
        }
    }

    /// An action with neither environment nor arguments borrows the run
    /// action's.
    pub fn should_use_launch_scheme_args_env(&self) -> bool {
        self.environment_variables.is_empty() && self.command_line_arguments.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    #[serde(default)]
    pub executable: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestTarget {
    pub target: String,
    #[serde(default)]
    pub random_execution_order: bool,
    #[serde(default)]
    pub parallelizable: bool,
    #[serde(default)]
    pub skipped_tests: Vec<String>,
}

impl TestTarget {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            random_execution_order: false,
            parallelizable: false,
            skipped_tests: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestPlan {
    pub path: String,
    #[serde(default)]
    pub default_plan: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    #[serde(default)]
    pub gather_coverage: bool,
    #[serde(default)]
    pub coverage_targets: Vec<String>,
    #[serde(default)]
    pub targets: Vec<TestTarget>,
    #[serde(default)]
    pub test_plans: Vec<TestPlan>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileAction {
    #[serde(flatten)]
    pub common: ActionCommon,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeAction {
    #[serde(default)]
    pub config: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveAction {
    #[serde(flatten)]
    pub common: ActionCommon,
    #[serde(default)]
    pub custom_archive_name: Option<String>,
    #[serde(default = "default_true")]
    pub reveal_archive_in_organizer: bool,
}

impl Default for ArchiveAction {
    fn default() -> Self {
        Self {
            common: ActionCommon::default(),
            custom_archive_name: None,
            reveal_archive_in_organizer: true,
        }
    }
}

// ── Scheme ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scheme {
    pub name: String,
    #[serde(default)]
    pub build: BuildAction,
    #[serde(default)]
    pub run: Option<RunAction>,
    #[serde(default)]
    pub test: Option<TestAction>,
    #[serde(default)]
    pub profile: Option<ProfileAction>,
    #[serde(default)]
    pub analyze: Option<AnalyzeAction>,
    #[serde(default)]
    pub archive: Option<ArchiveAction>,
}

impl Scheme {
    pub fn new(name: impl Into<String>, build: BuildAction) -> Self {
        Self {
            name: name.into(),
            build,
            run: None,
            test: None,
            profile: None,
            analyze: None,
            archive: None,
        }
    }

    /// Every target name this scheme refers to.
    pub fn referenced_targets(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.build.targets.iter().map(|t| t.target.as_str()).collect();
        let mut actions: Vec<&ExecutionAction> = self
            .build
            .pre_actions
            .iter()
            .chain(&self.build.post_actions)
            .collect();
        if let Some(test) = &self.test {
            names.extend(test.targets.iter().map(|t| t.target.as_str()));
            names.extend(test.coverage_targets.iter().map(String::as_str));
            actions.extend(test.common.pre_actions.iter().chain(&test.common.post_actions));
        }
        for common in [
            self.run.as_ref().map(|a| &a.common),
            self.profile.as_ref().map(|a| &a.common),
            self.archive.as_ref().map(|a| &a.common),
        ]
        .into_iter()
        .flatten()
        {
            actions.extend(common.pre_actions.iter().chain(&common.post_actions));
        }
        names.extend(actions.iter().filter_map(|a| a.settings_target.as_deref()));
        names
    }

    /// Every explicitly named config.
    pub fn referenced_configs(&self) -> Vec<&str> {
        [
            self.run.as_ref().and_then(|a| a.common.config.as_deref()),
            self.test.as_ref().and_then(|a| a.common.config.as_deref()),
            self.profile.as_ref().and_then(|a| a.common.config.as_deref()),
            self.analyze.as_ref().and_then(|a| a.config.as_deref()),
            self.archive.as_ref().and_then(|a| a.common.config.as_deref()),
        ]
        .into_iter()
        .flatten()
        .collect()
    }
}

// ── Per-target scheme request ────────────────────────────────────────────────

/// Explicit per-action config names that override kind-based defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionConfigs {
    pub run: Option<String>,
    pub test: Option<String>,
    pub profile: Option<String>,
    pub analyze: Option<String>,
    pub archive: Option<String>,
}

/// Request to derive schemes for a target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TargetScheme {
    /// One scheme per label; empty means a single unlabeled scheme.
    pub config_variants: Vec<String>,
    pub test_targets: Vec<TestTarget>,
    pub gather_coverage: bool,
    pub coverage_targets: Vec<String>,
    pub environment_variables: Vec<EnvironmentVariable>,
    pub command_line_arguments: CommandLineArguments,
    pub pre_actions: Vec<ExecutionAction>,
    pub post_actions: Vec<ExecutionAction>,
    pub configs: ActionConfigs,
    pub test_plans: Vec<TestPlan>,
}
