//! The project spec: the immutable input of one generation run.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::entities::scheme::Scheme;
use crate::domain::entities::settings::{SettingValue, Settings};
use crate::domain::entities::target::{AggregateTarget, AnyTarget, Target};
use crate::domain::value_objects::{
    ConfigKind, GlobBehavior, SettingPresets, SortPosition,
};

/// A named build configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ConfigKind,
}

impl Config {
    pub fn new(name: impl Into<String>, kind: ConfigKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    pub fn debug(name: impl Into<String>) -> Self {
        Self::new(name, ConfigKind::Debug)
    }

    pub fn release(name: impl Into<String>) -> Self {
        Self::new(name, ConfigKind::Release)
    }
}

fn default_configs() -> Vec<Config> {
    vec![Config::debug("Debug"), Config::release("Release")]
}

/// Explicit child ordering for groups whose name matches `pattern`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupOrdering {
    /// Glob over the group name. Empty matches the main group.
    #[serde(default)]
    pub pattern: String,
    pub order: Vec<String>,
    /// Whether ordered names go before or after the remaining children.
    #[serde(default = "default_ordering_position")]
    pub position: SortPosition,
}

fn default_ordering_position() -> SortPosition {
    SortPosition::Top
}

/// Checks that can be switched off per project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DisabledValidation {
    MissingConfigs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SpecOptions {
    pub create_intermediate_groups: bool,
    pub group_sort_position: SortPosition,
    pub group_ordering: Vec<GroupOrdering>,
    pub bundle_id_prefix: Option<String>,
    pub minimum_tool_version: Option<String>,
    pub pre_gen_command: Option<String>,
    pub post_gen_command: Option<String>,
    pub development_language: Option<String>,
    pub tool_version: Option<String>,
    pub last_upgrade_check: Option<String>,
    pub setting_presets: SettingPresets,
    pub framework_build_path: Option<String>,
    pub find_related_frameworks: bool,
    pub transitively_link_dependencies: bool,
    pub generate_empty_directories: bool,
    pub glob_behavior: GlobBehavior,
    pub default_config: Option<String>,
    pub disabled_validations: Vec<DisabledValidation>,
}

impl Default for SpecOptions {
    fn default() -> Self {
        Self {
            create_intermediate_groups: false,
            group_sort_position: SortPosition::Bottom,
            group_ordering: Vec::new(),
            bundle_id_prefix: None,
            minimum_tool_version: None,
            pre_gen_command: None,
            post_gen_command: None,
            development_language: None,
            tool_version: None,
            last_upgrade_check: None,
            setting_presets: SettingPresets::All,
            framework_build_path: None,
            find_related_frameworks: false,
            transitively_link_dependencies: false,
            generate_empty_directories: false,
            glob_behavior: GlobBehavior::BashV4,
            default_config: None,
            disabled_validations: Vec::new(),
        }
    }
}

impl SpecOptions {
    pub const DEFAULT_FRAMEWORK_BUILD_PATH: &'static str = "Carthage/Build";

    pub fn development_language(&self) -> &str {
        self.development_language.as_deref().unwrap_or("en")
    }

    pub fn framework_build_path(&self) -> &str {
        self.framework_build_path
            .as_deref()
            .unwrap_or(Self::DEFAULT_FRAMEWORK_BUILD_PATH)
    }

    pub fn is_disabled(&self, validation: DisabledValidation) -> bool {
        self.disabled_validations.contains(&validation)
    }
}

/// Version requirement of a remote package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VersionRequirement {
    Exact(String),
    From(String),
    Branch(String),
    Revision(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Package {
    pub url: String,
    #[serde(flatten)]
    pub requirement: VersionRequirement,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSpec {
    pub name: String,
    /// Directory all relative spec paths resolve against.
    #[serde(default)]
    pub base_path: PathBuf,
    #[serde(default = "default_configs")]
    pub configs: Vec<Config>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub setting_groups: BTreeMap<String, Settings>,
    #[serde(default)]
    pub targets: Vec<Target>,
    #[serde(default)]
    pub aggregate_targets: Vec<AggregateTarget>,
    #[serde(default)]
    pub schemes: Vec<Scheme>,
    #[serde(default)]
    pub options: SpecOptions,
    #[serde(default)]
    pub file_groups: Vec<String>,
    #[serde(default)]
    pub packages: BTreeMap<String, Package>,
    #[serde(default)]
    pub attributes: BTreeMap<String, SettingValue>,
}

impl ProjectSpec {
    pub fn new(name: impl Into<String>, base_path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            base_path: base_path.into(),
            configs: default_configs(),
            settings: Settings::default(),
            setting_groups: BTreeMap::new(),
            targets: Vec::new(),
            aggregate_targets: Vec::new(),
            schemes: Vec::new(),
            options: SpecOptions::default(),
            file_groups: Vec::new(),
            packages: BTreeMap::new(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_target(mut self, target: Target) -> Self {
        self.targets.push(target);
        self
    }

    pub fn with_scheme(mut self, scheme: Scheme) -> Self {
        self.schemes.push(scheme);
        self
    }

    pub fn target(&self, name: &str) -> Option<&Target> {
        self.targets.iter().find(|t| t.name == name)
    }

    pub fn aggregate_target(&self, name: &str) -> Option<&AggregateTarget> {
        self.aggregate_targets.iter().find(|t| t.name == name)
    }

    /// Look up a native or aggregate target by name.
    pub fn project_target(&self, name: &str) -> Option<AnyTarget<'_>> {
        self.target(name)
            .map(AnyTarget::Native)
            .or_else(|| self.aggregate_target(name).map(AnyTarget::Aggregate))
    }

    /// Native targets first, then aggregates, in declared order.
    pub fn all_targets(&self) -> impl Iterator<Item = AnyTarget<'_>> {
        self.targets
            .iter()
            .map(AnyTarget::Native)
            .chain(self.aggregate_targets.iter().map(AnyTarget::Aggregate))
    }

    pub fn config(&self, name: &str) -> Option<&Config> {
        self.configs.iter().find(|c| c.name == name)
    }

    /// First declared config of `kind`.
    pub fn first_config(&self, kind: ConfigKind) -> Option<&Config> {
        self.configs.iter().find(|c| c.kind == kind)
    }

    /// Config selected as the configuration list default.
    pub fn default_config_name(&self) -> Option<&str> {
        self.options
            .default_config
            .as_deref()
            .or_else(|| self.first_config(ConfigKind::Release).map(|c| c.name.as_str()))
            .or_else(|| self.configs.first().map(|c| c.name.as_str()))
    }

    /// File name of the project bundle.
    pub fn bundle_name(&self) -> String {
        format!("{}.xcodeproj", self.name)
    }
}
