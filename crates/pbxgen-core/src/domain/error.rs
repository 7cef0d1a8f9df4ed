// ============================================================================
// domain/error.rs - SPEC VALIDATION ERRORS
// ============================================================================

use thiserror::Error;

/// Root domain error type: a structurally invalid project spec.
///
/// All errors are:
/// - Cloneable (collected and reported together)
/// - Categorizable (for CLI display)
/// - Actionable (provides suggestions)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DomainError {
    // ========================================================================
    // Parse-level errors
    // ========================================================================
    #[error("unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("unknown product type '{0}'")]
    UnknownProductType(String),

    #[error("invalid {field}: '{value}'")]
    InvalidValue { field: &'static str, value: String },

    // ========================================================================
    // Structural errors
    // ========================================================================
    #[error("duplicate target name '{name}'")]
    DuplicateTarget { name: String },

    #[error("duplicate scheme name '{name}'")]
    DuplicateScheme { name: String },

    #[error("no {kind} config declared")]
    MissingConfigKind { kind: String },

    #[error("default config '{config}' is not declared")]
    UnknownDefaultConfig { config: String },

    #[error("{owner} references unknown settings group '{group}'")]
    UnknownSettingsGroup { owner: String, group: String },

    #[error("{owner} has settings for undeclared config '{config}'")]
    UnknownSettingsConfig { owner: String, config: String },

    // ========================================================================
    // Cross-reference errors
    // ========================================================================
    #[error("target '{target}' depends on unknown target '{dependency}'")]
    InvalidTargetDependency { target: String, dependency: String },

    #[error("target '{target}' depends on undeclared package '{package}'")]
    UnknownPackage { target: String, package: String },

    #[error("target '{target}' declares package '{package}' without products")]
    EmptyPackageProducts { target: String, package: String },

    #[error("target '{target}' has sdk dependency '{reference}' with no framework, tbd or dylib extension")]
    InvalidSdkDependency { target: String, reference: String },

    #[error("target '{target}' has missing source path '{path}'")]
    MissingSourcePath { target: String, path: String },

    #[error("target '{target}' declares '{path}' with conflicting {field} overrides")]
    ConflictingSourceOverride {
        target: String,
        path: String,
        field: &'static str,
    },

    #[error("target '{target}' has scheme config variant '{variant}' with no matching {kind} config")]
    InvalidConfigVariant {
        target: String,
        variant: String,
        kind: String,
    },

    #[error("target '{target}' scheme tests unknown target '{test_target}'")]
    InvalidTargetSchemeTest { target: String, test_target: String },

    #[error("scheme '{scheme}' references unknown target '{target}'")]
    InvalidSchemeTarget { scheme: String, target: String },

    #[error("scheme '{scheme}' references undeclared config '{config}'")]
    InvalidSchemeConfig { scheme: String, config: String },

    #[error("aggregate target '{aggregate}' references unknown target '{target}'")]
    InvalidAggregateTarget { aggregate: String, target: String },

    #[error("target '{target}' has missing build script file '{path}'")]
    MissingBuildScript { target: String, path: String },

    #[error("file group '{path}' does not exist")]
    MissingFileGroup { path: String },

    // ========================================================================
    // Compatibility
    // ========================================================================
    #[error("spec requires tool version {required}, running {current}")]
    ToolVersionTooLow { required: String, current: String },

    #[error("{count} spec validation errors:\n{}", list_errors(.errors))]
    Multiple { count: usize, errors: Vec<DomainError> },
}

fn list_errors(errors: &[DomainError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {e}"))
        .collect::<Vec<_>>()
        .join("\n")
}

impl DomainError {
    /// Collapse a list of validation failures into one error.
    ///
    /// Returns `None` for an empty list and the error itself for a single one.
    pub fn collect(mut errors: Vec<DomainError>) -> Option<Self> {
        match errors.len() {
            0 => None,
            1 => errors.pop(),
            count => Some(Self::Multiple { count, errors }),
        }
    }

    /// Get user-actionable suggestions for fixing this error.
    pub fn suggestions(&self) -> Vec<String> {
        match self {
            Self::UnknownPlatform(_) => vec![
                "Supported platforms: iOS, tvOS, watchOS, macOS, visionOS".into(),
            ],
            Self::UnknownProductType(_) => vec![
                "Use a product type such as application, framework, library.static or bundle.unit-test"
                    .into(),
            ],
            Self::MissingConfigKind { kind } => vec![
                format!("Declare at least one config with type '{kind}'"),
                "Or disable the check with options.disabledValidations: [missingConfigs]".into(),
            ],
            Self::UnknownSettingsGroup { group, .. } => vec![
                format!("Declare '{group}' under settingGroups"),
                "Or check the spelling against the built-in presets".into(),
            ],
            Self::InvalidTargetDependency { dependency, .. }
            | Self::InvalidSchemeTarget {
                target: dependency, ..
            } => vec![format!("Declare a target named '{dependency}' or fix the reference")],
            Self::MissingSourcePath { path, .. } => vec![
                format!("Create '{path}' or remove it from the target's sources"),
                "Mark the source as optional if it is generated later".into(),
            ],
            Self::ToolVersionTooLow { required, .. } => {
                vec![format!("Upgrade pbxgen to at least {required}")]
            }
            Self::Multiple { errors, .. } => errors.iter().flat_map(|e| e.suggestions()).collect(),
            _ => vec!["Fix the project spec and run again".into()],
        }
    }

    /// Error category for CLI display styling.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidTargetDependency { .. }
            | Self::UnknownPackage { .. }
            | Self::InvalidSchemeTarget { .. }
            | Self::InvalidSchemeConfig { .. }
            | Self::InvalidAggregateTarget { .. }
            | Self::InvalidTargetSchemeTest { .. }
            | Self::UnknownSettingsGroup { .. }
            | Self::MissingSourcePath { .. }
            | Self::MissingBuildScript { .. }
            | Self::MissingFileGroup { .. } => ErrorCategory::NotFound,
            Self::ToolVersionTooLow { .. } => ErrorCategory::Compatibility,
            _ => ErrorCategory::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Compatibility,
    NotFound,
}
