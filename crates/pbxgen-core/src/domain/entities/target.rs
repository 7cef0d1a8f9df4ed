//! Native and aggregate targets.
//!
//! Both kinds share the [`ProjectTarget`] capability surface used by graph
//! building and scheme synthesis. Code that needs product-specific behaviour
//! matches on [`AnyTarget`] instead.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::entities::dependency::Dependency;
use crate::domain::entities::scheme::TargetScheme;
use crate::domain::entities::settings::{SettingValue, Settings};
use crate::domain::value_objects::{
    BuildPhaseOverride, Platform, ProductType, ScriptTiming, SourceType,
};

// ── Capability surface ───────────────────────────────────────────────────────

/// What graph building needs from any target.
pub trait ProjectTarget {
    fn name(&self) -> &str;
    fn build_scripts(&self) -> &[BuildScript];
    fn scheme(&self) -> Option<&TargetScheme>;
    fn attributes(&self) -> &BTreeMap<String, SettingValue>;
}

/// A borrowed native or aggregate target.
#[derive(Debug, Clone, Copy)]
pub enum AnyTarget<'a> {
    Native(&'a Target),
    Aggregate(&'a AggregateTarget),
}

impl<'a> AnyTarget<'a> {
    pub fn as_native(&self) -> Option<&'a Target> {
        match self {
            Self::Native(target) => Some(target),
            Self::Aggregate(_) => None,
        }
    }

    pub fn settings(&self) -> &'a Settings {
        match self {
            Self::Native(target) => &target.settings,
            Self::Aggregate(target) => &target.settings,
        }
    }
}

impl ProjectTarget for AnyTarget<'_> {
    fn name(&self) -> &str {
        match self {
            Self::Native(target) => target.name(),
            Self::Aggregate(target) => target.name(),
        }
    }

    fn build_scripts(&self) -> &[BuildScript] {
        match self {
            Self::Native(target) => target.build_scripts(),
            Self::Aggregate(target) => target.build_scripts(),
        }
    }

    fn scheme(&self) -> Option<&TargetScheme> {
        match self {
            Self::Native(target) => target.scheme(),
            Self::Aggregate(target) => target.scheme(),
        }
    }

    fn attributes(&self) -> &BTreeMap<String, SettingValue> {
        match self {
            Self::Native(target) => target.attributes(),
            Self::Aggregate(target) => target.attributes(),
        }
    }
}

// ── Target ───────────────────────────────────────────────────────────────────

/// A native target: something that is compiled into a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub name: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
    pub platform: Platform,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub sources: Vec<TargetSource>,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub build_scripts: Vec<BuildScript>,
    #[serde(default)]
    pub build_rules: Vec<BuildRule>,
    #[serde(default)]
    pub scheme: Option<TargetScheme>,
    #[serde(default)]
    pub attributes: BTreeMap<String, SettingValue>,
    #[serde(default)]
    pub info: Option<InfoPlist>,
}

impl Target {
    pub fn new(name: impl Into<String>, product_type: ProductType, platform: Platform) -> Self {
        Self {
            name: name.into(),
            product_type,
            platform,
            product_name: None,
            sources: Vec::new(),
            dependencies: Vec::new(),
            settings: Settings::default(),
            build_scripts: Vec::new(),
            build_rules: Vec::new(),
            scheme: None,
            attributes: BTreeMap::new(),
            info: None,
        }
    }

    pub fn with_source(mut self, source: impl Into<TargetSource>) -> Self {
        self.sources.push(source.into());
        self
    }

    pub fn with_dependency(mut self, dependency: Dependency) -> Self {
        self.dependencies.push(dependency);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_scheme(mut self, scheme: TargetScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn with_build_script(mut self, script: BuildScript) -> Self {
        self.build_scripts.push(script);
        self
    }

    /// `PRODUCT_NAME`, defaulting to the target name.
    pub fn product_name(&self) -> &str {
        self.product_name.as_deref().unwrap_or(&self.name)
    }

    /// Relative path of the generated Info.plist.
    pub fn info_plist_path(&self) -> String {
        self.info
            .as_ref()
            .map(|info| info.path.clone())
            .unwrap_or_else(|| format!("{}/Info.plist", self.name))
    }
}

impl ProjectTarget for Target {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_scripts(&self) -> &[BuildScript] {
        &self.build_scripts
    }

    fn scheme(&self) -> Option<&TargetScheme> {
        self.scheme.as_ref()
    }

    fn attributes(&self) -> &BTreeMap<String, SettingValue> {
        &self.attributes
    }
}

// ── AggregateTarget ──────────────────────────────────────────────────────────

/// A target with no product that only runs scripts and orders other targets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateTarget {
    pub name: String,
    #[serde(default)]
    pub targets: Vec<String>,
    #[serde(default)]
    pub build_scripts: Vec<BuildScript>,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub scheme: Option<TargetScheme>,
    #[serde(default)]
    pub attributes: BTreeMap<String, SettingValue>,
}

impl AggregateTarget {
    pub fn new(name: impl Into<String>, targets: Vec<String>) -> Self {
        Self {
            name: name.into(),
            targets,
            build_scripts: Vec::new(),
            settings: Settings::default(),
            scheme: None,
            attributes: BTreeMap::new(),
        }
    }
}

impl ProjectTarget for AggregateTarget {
    fn name(&self) -> &str {
        &self.name
    }

    fn build_scripts(&self) -> &[BuildScript] {
        &self.build_scripts
    }

    fn scheme(&self) -> Option<&TargetScheme> {
        self.scheme.as_ref()
    }

    fn attributes(&self) -> &BTreeMap<String, SettingValue> {
        &self.attributes
    }
}

// ── Sources ──────────────────────────────────────────────────────────────────

/// Visibility of headers copied by the headers phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeaderVisibility {
    #[default]
    Public,
    Private,
    Project,
}

impl HeaderVisibility {
    /// Value of the `ATTRIBUTES` build-file setting, `None` for project headers.
    pub const fn attribute(&self) -> Option<&'static str> {
        match self {
            Self::Public => Some("Public"),
            Self::Private => Some("Private"),
            Self::Project => None,
        }
    }
}

/// A declared source root of a target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSource {
    /// Path relative to the project base path.
    pub path: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default, rename = "type")]
    pub source_type: Option<SourceType>,
    #[serde(default)]
    pub build_phase: Option<BuildPhaseOverride>,
    #[serde(default)]
    pub compiler_flags: Vec<String>,
    #[serde(default)]
    pub header_visibility: HeaderVisibility,
    #[serde(default)]
    pub optional: bool,
}

impl TargetSource {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            name: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            source_type: None,
            build_phase: None,
            compiler_flags: Vec::new(),
            header_visibility: HeaderVisibility::default(),
            optional: false,
        }
    }

    pub fn with_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excludes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn with_includes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.includes.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn with_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }

    pub fn with_build_phase(mut self, phase: BuildPhaseOverride) -> Self {
        self.build_phase = Some(phase);
        self
    }

    /// The declared path without a trailing slash.
    pub fn normalized_path(&self) -> &str {
        let trimmed = self.path.trim_end_matches('/');
        if trimmed.is_empty() { "." } else { trimmed }
    }
}

impl From<&str> for TargetSource {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

// ── Build scripts ────────────────────────────────────────────────────────────

/// Inline script text or a script file relative to the base path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ScriptSource {
    Script(String),
    Path(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildScript {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub source: ScriptSource,
    #[serde(default)]
    pub timing: ScriptTiming,
    #[serde(default)]
    pub input_files: Vec<String>,
    #[serde(default)]
    pub output_files: Vec<String>,
    #[serde(default)]
    pub shell: Option<String>,
    #[serde(default)]
    pub run_only_when_installing: bool,
    #[serde(default = "default_true")]
    pub show_env_vars: bool,
}

fn default_true() -> bool {
    true
}

impl BuildScript {
    pub fn inline(script: impl Into<String>, timing: ScriptTiming) -> Self {
        Self {
            name: None,
            source: ScriptSource::Script(script.into()),
            timing,
            input_files: Vec::new(),
            output_files: Vec::new(),
            shell: None,
            run_only_when_installing: false,
            show_env_vars: true,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(crate::domain::DEFAULT_SCRIPT_NAME)
    }

    pub fn shell_path(&self) -> &str {
        self.shell.as_deref().unwrap_or("/bin/sh")
    }
}

// ── Build rules ──────────────────────────────────────────────────────────────

/// Which files a build rule applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FileMatcher {
    FileType(String),
    FilePattern(String),
}

/// What a build rule does with matched files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleAction {
    CompilerSpec(String),
    Script(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub matcher: FileMatcher,
    #[serde(flatten)]
    pub action: RuleAction,
    #[serde(default)]
    pub output_files: Vec<String>,
    #[serde(default)]
    pub output_files_compiler_flags: Vec<String>,
}

impl BuildRule {
    pub const PATTERN_FILE_TYPE: &'static str = "pattern.proxy";
    pub const SCRIPT_COMPILER_SPEC: &'static str = "com.apple.compilers.proxy.script";

    pub fn file_type(&self) -> &str {
        match &self.matcher {
            FileMatcher::FileType(file_type) => file_type,
            FileMatcher::FilePattern(_) => Self::PATTERN_FILE_TYPE,
        }
    }

    pub fn compiler_spec(&self) -> &str {
        match &self.action {
            RuleAction::CompilerSpec(spec) => spec,
            RuleAction::Script(_) => Self::SCRIPT_COMPILER_SPEC,
        }
    }
}

// ── Info.plist ───────────────────────────────────────────────────────────────

/// A property-list value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlistValue {
    Bool(bool),
    Integer(i64),
    String(String),
    Array(Vec<PlistValue>),
    Dictionary(BTreeMap<String, PlistValue>),
}

impl From<&str> for PlistValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Declared Info.plist location and extra properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfoPlist {
    pub path: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PlistValue>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn any_target_exposes_shared_surface() {
        let native = Target::new("App", ProductType::Application, Platform::Ios)
            .with_build_script(BuildScript::inline("echo hi", ScriptTiming::PreBuild));
        let aggregate = AggregateTarget::new("All", vec!["App".into()]);

        let targets = [AnyTarget::Native(&native), AnyTarget::Aggregate(&aggregate)];
        let names: Vec<&str> = targets.iter().map(|t| t.name()).collect();
        assert_eq!(names, ["App", "All"]);
        assert_eq!(targets[0].build_scripts().len(), 1);
        assert!(targets[1].as_native().is_none());
    }

    #[test]
    fn script_name_defaults_to_placeholder() {
        let script = BuildScript::inline("true", ScriptTiming::PostBuild);
        assert_eq!(script.display_name(), "Run Script");
        assert_eq!(script.shell_path(), "/bin/sh");
    }

    #[test]
    fn build_rule_pattern_uses_proxy_file_type() {
        let rule: BuildRule = serde_json::from_str(
            r#"{"filePattern": "*.xcassets", "script": "process", "outputFiles": ["$(DERIVED_FILE_DIR)/a"]}"#,
        )
        .unwrap();
        assert_eq!(rule.file_type(), BuildRule::PATTERN_FILE_TYPE);
        assert_eq!(rule.compiler_spec(), BuildRule::SCRIPT_COMPILER_SPEC);
    }

    #[test]
    fn info_plist_path_defaults_under_target_dir() {
        let target = Target::new("App", ProductType::Application, Platform::Ios);
        assert_eq!(target.info_plist_path(), "App/Info.plist");
    }

    #[test]
    fn source_path_normalization() {
        assert_eq!(TargetSource::new("Sources/").normalized_path(), "Sources");
        assert_eq!(TargetSource::new("").normalized_path(), ".");
    }
}
