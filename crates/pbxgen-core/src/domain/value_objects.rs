//! Domain value objects: Platform, ProductType, ConfigKind, phases and flags.
//!
//! # Design
//!
//! These are pure value types: `Copy`, equality-by-value, no identity.
//! Per-product behaviour (extensions, linkage, embedding) lives in
//! `capabilities.rs`. This file defines the types, their string
//! representations, and their `FromStr` parsers.

use crate::domain::error::DomainError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ── Platform ─────────────────────────────────────────────────────────────────

/// An Apple platform a target builds for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Platform {
    #[serde(rename = "iOS")]
    Ios,
    #[serde(rename = "tvOS")]
    Tvos,
    #[serde(rename = "watchOS")]
    Watchos,
    #[serde(rename = "macOS")]
    Macos,
    #[serde(rename = "visionOS")]
    Visionos,
}

impl Platform {
    pub const ALL: [Platform; 5] = [
        Self::Ios,
        Self::Tvos,
        Self::Watchos,
        Self::Macos,
        Self::Visionos,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Ios => "iOS",
            Self::Tvos => "tvOS",
            Self::Watchos => "watchOS",
            Self::Macos => "macOS",
            Self::Visionos => "visionOS",
        }
    }

    /// Value of the `SDKROOT` build setting.
    pub const fn sdk_root(&self) -> &'static str {
        match self {
            Self::Ios => "iphoneos",
            Self::Tvos => "appletvos",
            Self::Watchos => "watchos",
            Self::Macos => "macosx",
            Self::Visionos => "xros",
        }
    }

    /// Directory name used under the prebuilt-framework root.
    pub const fn framework_dir(&self) -> &'static str {
        match self {
            Self::Macos => "Mac",
            other => other.as_str(),
        }
    }

    /// Name of the deployment-target build setting for this platform.
    pub const fn deployment_target_setting(&self) -> &'static str {
        match self {
            Self::Ios => "IPHONEOS_DEPLOYMENT_TARGET",
            Self::Tvos => "TVOS_DEPLOYMENT_TARGET",
            Self::Watchos => "WATCHOS_DEPLOYMENT_TARGET",
            Self::Macos => "MACOSX_DEPLOYMENT_TARGET",
            Self::Visionos => "XROS_DEPLOYMENT_TARGET",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ios" => Ok(Self::Ios),
            "tvos" => Ok(Self::Tvos),
            "watchos" => Ok(Self::Watchos),
            "macos" | "osx" | "mac" => Ok(Self::Macos),
            "visionos" | "xros" => Ok(Self::Visionos),
            other => Err(DomainError::UnknownPlatform(other.to_string())),
        }
    }
}

// ── ProductType ──────────────────────────────────────────────────────────────

/// What a native target produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "application")]
    Application,
    #[serde(rename = "framework")]
    Framework,
    #[serde(rename = "library.static")]
    StaticLibrary,
    #[serde(rename = "library.dynamic")]
    DynamicLibrary,
    #[serde(rename = "bundle.unit-test")]
    UnitTestBundle,
    #[serde(rename = "bundle.ui-testing")]
    UiTestBundle,
    #[serde(rename = "app-extension")]
    AppExtension,
    #[serde(rename = "bundle")]
    Bundle,
    #[serde(rename = "tool")]
    CommandLineTool,
}

impl ProductType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Application => "application",
            Self::Framework => "framework",
            Self::StaticLibrary => "library.static",
            Self::DynamicLibrary => "library.dynamic",
            Self::UnitTestBundle => "bundle.unit-test",
            Self::UiTestBundle => "bundle.ui-testing",
            Self::AppExtension => "app-extension",
            Self::Bundle => "bundle",
            Self::CommandLineTool => "tool",
        }
    }

    /// The `productType` identifier written into the native target.
    pub fn identifier(&self) -> String {
        format!("com.apple.product-type.{}", self.as_str())
    }

    pub const fn is_test(&self) -> bool {
        matches!(self, Self::UnitTestBundle | Self::UiTestBundle)
    }

    pub const fn is_application(&self) -> bool {
        matches!(self, Self::Application)
    }

    pub const fn is_extension(&self) -> bool {
        matches!(self, Self::AppExtension)
    }

    /// Whether a scheme can launch this product directly.
    pub const fn is_executable(&self) -> bool {
        matches!(self, Self::Application | Self::CommandLineTool)
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "application" | "app" => Ok(Self::Application),
            "framework" => Ok(Self::Framework),
            "library.static" | "static-library" => Ok(Self::StaticLibrary),
            "library.dynamic" | "dynamic-library" => Ok(Self::DynamicLibrary),
            "bundle.unit-test" | "unit-test" => Ok(Self::UnitTestBundle),
            "bundle.ui-testing" | "ui-test" => Ok(Self::UiTestBundle),
            "app-extension" | "extension" => Ok(Self::AppExtension),
            "bundle" => Ok(Self::Bundle),
            "tool" | "command-line-tool" => Ok(Self::CommandLineTool),
            other => Err(DomainError::UnknownProductType(other.to_string())),
        }
    }
}

// ── ConfigKind ───────────────────────────────────────────────────────────────

/// Build configuration kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigKind {
    Debug,
    Release,
}

impl ConfigKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Release => "release",
        }
    }
}

impl fmt::Display for ConfigKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfigKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "release" => Ok(Self::Release),
            other => Err(DomainError::InvalidValue {
                field: "config kind",
                value: other.to_string(),
            }),
        }
    }
}

// ── Build phases ─────────────────────────────────────────────────────────────

/// Build phase a source file can join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhase {
    Sources,
    Headers,
    Resources,
    Frameworks,
}

impl BuildPhase {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Sources => "Sources",
            Self::Headers => "Headers",
            Self::Resources => "Resources",
            Self::Frameworks => "Frameworks",
        }
    }
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Explicit per-source build phase override.
///
/// `None` keeps files out of every phase, which is different from not
/// declaring an override at all (default classification by extension).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildPhaseOverride {
    Sources,
    Headers,
    Resources,
    Frameworks,
    None,
}

impl BuildPhaseOverride {
    pub const fn phase(&self) -> Option<BuildPhase> {
        match self {
            Self::Sources => Some(BuildPhase::Sources),
            Self::Headers => Some(BuildPhase::Headers),
            Self::Resources => Some(BuildPhase::Resources),
            Self::Frameworks => Some(BuildPhase::Frameworks),
            Self::None => None,
        }
    }
}

/// How a declared source path is represented in the project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Recurse into a directory and mirror it as groups.
    Group,
    /// A single file reference.
    File,
    /// A folder reference copied as-is into resources.
    Folder,
}

impl SourceType {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Group => "group",
            Self::File => "file",
            Self::Folder => "folder",
        }
    }
}

// ── Linkage ──────────────────────────────────────────────────────────────────

/// How a prebuilt or product framework is linked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Linkage {
    #[default]
    Dynamic,
    Static,
    None,
}

// ── Scheme build-for flags ───────────────────────────────────────────────────

/// Subset of scheme actions a build entry participates in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildFor {
    pub running: bool,
    pub testing: bool,
    pub profiling: bool,
    pub analyzing: bool,
    pub archiving: bool,
}

impl BuildFor {
    pub const fn all() -> Self {
        Self {
            running: true,
            testing: true,
            profiling: true,
            analyzing: true,
            archiving: true,
        }
    }

    pub const fn test_only() -> Self {
        Self {
            running: false,
            testing: true,
            profiling: false,
            analyzing: false,
            archiving: false,
        }
    }
}

impl Default for BuildFor {
    fn default() -> Self {
        Self::all()
    }
}

// ── Script timing ────────────────────────────────────────────────────────────

/// Where a build script runs relative to the target's standard phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScriptTiming {
    PreBuild,
    PostCompile,
    #[default]
    PostBuild,
}

// ── Group ordering ───────────────────────────────────────────────────────────

/// Placement of sub-groups (or explicitly ordered names) among siblings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortPosition {
    Top,
    #[default]
    Bottom,
    None,
}

// ── Glob behaviour ───────────────────────────────────────────────────────────

/// Recursive-matching conventions for include patterns.
///
/// Shell and build-tool conventions disagree on how `**` interacts with the
/// directory it is rooted at and with trailing slashes, so each convention
/// is kept as a named preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GlobBehavior {
    BashV3,
    #[default]
    BashV4,
    Gradle,
}

impl GlobBehavior {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BashV3 => "bash-v3",
            Self::BashV4 => "bash-v4",
            Self::Gradle => "gradle",
        }
    }

    /// `**` descends into subdirectories; otherwise it behaves like `*`.
    pub const fn supports_globstar(&self) -> bool {
        !matches!(self, Self::BashV3)
    }

    /// `dir/**/x` also matches `dir/x`.
    pub const fn includes_files_from_globstar_root(&self) -> bool {
        !matches!(self, Self::BashV3)
    }

    pub const fn includes_directories(&self) -> bool {
        !matches!(self, Self::Gradle)
    }

    /// A pattern ending in `**/` also yields files.
    pub const fn includes_files_if_trailing_slash(&self) -> bool {
        matches!(self, Self::Gradle)
    }
}

impl fmt::Display for GlobBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GlobBehavior {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bash-v3" | "bashv3" => Ok(Self::BashV3),
            "bash-v4" | "bashv4" | "bash" => Ok(Self::BashV4),
            "gradle" => Ok(Self::Gradle),
            other => Err(DomainError::InvalidValue {
                field: "glob behavior",
                value: other.to_string(),
            }),
        }
    }
}

/// Which layers receive preset build settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingPresets {
    #[default]
    All,
    Project,
    Targets,
    None,
}

impl SettingPresets {
    pub const fn applies_to_project(&self) -> bool {
        matches!(self, Self::All | Self::Project)
    }

    pub const fn applies_to_targets(&self) -> bool {
        matches!(self, Self::All | Self::Targets)
    }
}
