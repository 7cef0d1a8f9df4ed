//! Build-setting presets.
//!
//! [`BuiltinPresets`] ships the defaults Xcode itself applies to new
//! projects. [`DirectoryPresets`] reads user presets from JSON files and
//! falls back to the built-in table for anything it does not define.
//!
//! # Keys
//!
//! Every preset is addressed by the display form of its [`PresetKey`]:
//!
//! ```text
//! base                              every project configuration
//! config/debug, config/release      per configuration kind
//! platform/iOS                      per platform
//! product/framework                 per product type
//! platform-product/iOS/application  per platform and product type
//! <anything else>                   named groups referenced from settings
//! ```
//!
//! A directory preset lives at `<dir>/<key>.json` and holds one settings
//! object (`groups`, `buildSettings`, `configSettings`).

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use pbxgen_core::{
    application::ports::{PresetKey, PresetLibrary},
    domain::{SettingValue, Settings},
};

use crate::error::LoadError;

// ── Built-in table ───────────────────────────────────────────────────────────

enum V {
    S(&'static str),
    L(&'static [&'static str]),
}

use V::{L, S};

type Table = &'static [(&'static str, &'static [(&'static str, V)])];

const BUILTIN: Table = &[
    (
        "base",
        &[
            ("ALWAYS_SEARCH_USER_PATHS", S("NO")),
            ("CLANG_ANALYZER_NONNULL", S("YES")),
            ("CLANG_ANALYZER_NUMBER_OBJECT_CONVERSION", S("YES_AGGRESSIVE")),
            ("CLANG_CXX_LANGUAGE_STANDARD", S("gnu++20")),
            ("CLANG_ENABLE_MODULES", S("YES")),
            ("CLANG_ENABLE_OBJC_ARC", S("YES")),
            ("CLANG_ENABLE_OBJC_WEAK", S("YES")),
            ("CLANG_WARN_BLOCK_CAPTURE_AUTORELEASING", S("YES")),
            ("CLANG_WARN_BOOL_CONVERSION", S("YES")),
            ("CLANG_WARN_COMMA", S("YES")),
            ("CLANG_WARN_CONSTANT_CONVERSION", S("YES")),
            ("CLANG_WARN_DEPRECATED_OBJC_IMPLEMENTATIONS", S("YES")),
            ("CLANG_WARN_DIRECT_OBJC_ISA_USAGE", S("YES_ERROR")),
            ("CLANG_WARN_DOCUMENTATION_COMMENTS", S("YES")),
            ("CLANG_WARN_EMPTY_BODY", S("YES")),
            ("CLANG_WARN_ENUM_CONVERSION", S("YES")),
            ("CLANG_WARN_INFINITE_RECURSION", S("YES")),
            ("CLANG_WARN_INT_CONVERSION", S("YES")),
            ("CLANG_WARN_NON_LITERAL_NULL_CONVERSION", S("YES")),
            ("CLANG_WARN_OBJC_IMPLICIT_RETAIN_SELF", S("YES")),
            ("CLANG_WARN_OBJC_LITERAL_CONVERSION", S("YES")),
            ("CLANG_WARN_OBJC_ROOT_CLASS", S("YES_ERROR")),
            ("CLANG_WARN_QUOTED_INCLUDE_IN_FRAMEWORK_HEADER", S("YES")),
            ("CLANG_WARN_RANGE_LOOP_ANALYSIS", S("YES")),
            ("CLANG_WARN_STRICT_PROTOTYPES", S("YES")),
            ("CLANG_WARN_SUSPICIOUS_MOVE", S("YES")),
            ("CLANG_WARN_UNGUARDED_AVAILABILITY", S("YES_AGGRESSIVE")),
            ("CLANG_WARN_UNREACHABLE_CODE", S("YES")),
            ("CLANG_WARN__DUPLICATE_METHOD_MATCH", S("YES")),
            ("COPY_PHASE_STRIP", S("NO")),
            ("ENABLE_STRICT_OBJC_MSGSEND", S("YES")),
            ("ENABLE_USER_SCRIPT_SANDBOXING", S("YES")),
            ("GCC_C_LANGUAGE_STANDARD", S("gnu17")),
            ("GCC_NO_COMMON_BLOCKS", S("YES")),
            ("GCC_WARN_64_TO_32_BIT_CONVERSION", S("YES")),
            ("GCC_WARN_ABOUT_RETURN_TYPE", S("YES_ERROR")),
            ("GCC_WARN_UNDECLARED_SELECTOR", S("YES")),
            ("GCC_WARN_UNINITIALIZED_AUTOS", S("YES_AGGRESSIVE")),
            ("GCC_WARN_UNUSED_FUNCTION", S("YES")),
            ("GCC_WARN_UNUSED_VARIABLE", S("YES")),
            ("MTL_FAST_MATH", S("YES")),
            ("PRODUCT_NAME", S("$(TARGET_NAME)")),
            ("SWIFT_VERSION", S("5.0")),
        ],
    ),
    (
        "config/debug",
        &[
            ("DEBUG_INFORMATION_FORMAT", S("dwarf")),
            ("ENABLE_TESTABILITY", S("YES")),
            ("GCC_DYNAMIC_NO_PIC", S("NO")),
            ("GCC_OPTIMIZATION_LEVEL", S("0")),
            ("GCC_PREPROCESSOR_DEFINITIONS", L(&["$(inherited)", "DEBUG=1"])),
            ("MTL_ENABLE_DEBUG_INFO", S("INCLUDE_SOURCE")),
            ("ONLY_ACTIVE_ARCH", S("YES")),
            ("SWIFT_ACTIVE_COMPILATION_CONDITIONS", S("DEBUG")),
            ("SWIFT_OPTIMIZATION_LEVEL", S("-Onone")),
        ],
    ),
    (
        "config/release",
        &[
            ("DEBUG_INFORMATION_FORMAT", S("dwarf-with-dsym")),
            ("ENABLE_NS_ASSERTIONS", S("NO")),
            ("MTL_ENABLE_DEBUG_INFO", S("NO")),
            ("SWIFT_COMPILATION_MODE", S("wholemodule")),
            ("SWIFT_OPTIMIZATION_LEVEL", S("-O")),
            ("VALIDATE_PRODUCT", S("YES")),
        ],
    ),
    (
        "platform/iOS",
        &[
            ("LD_RUNPATH_SEARCH_PATHS", L(&["$(inherited)", "@executable_path/Frameworks"])),
            ("TARGETED_DEVICE_FAMILY", S("1,2")),
        ],
    ),
    (
        "platform/tvOS",
        &[
            ("LD_RUNPATH_SEARCH_PATHS", L(&["$(inherited)", "@executable_path/Frameworks"])),
            ("TARGETED_DEVICE_FAMILY", S("3")),
        ],
    ),
    (
        "platform/watchOS",
        &[
            ("LD_RUNPATH_SEARCH_PATHS", L(&["$(inherited)", "@executable_path/Frameworks"])),
            ("SKIP_INSTALL", S("YES")),
            ("TARGETED_DEVICE_FAMILY", S("4")),
        ],
    ),
    (
        "platform/macOS",
        &[
            ("COMBINE_HIDPI_IMAGES", S("YES")),
            ("LD_RUNPATH_SEARCH_PATHS", L(&["$(inherited)", "@executable_path/../Frameworks"])),
        ],
    ),
    (
        "platform/visionOS",
        &[
            ("LD_RUNPATH_SEARCH_PATHS", L(&["$(inherited)", "@executable_path/Frameworks"])),
            ("TARGETED_DEVICE_FAMILY", S("7")),
        ],
    ),
    (
        "product/application",
        &[("ASSETCATALOG_COMPILER_APPICON_NAME", S("AppIcon"))],
    ),
    (
        "product/framework",
        &[
            ("CODE_SIGN_IDENTITY", S("")),
            ("CURRENT_PROJECT_VERSION", S("1")),
            ("DEFINES_MODULE", S("YES")),
            ("DYLIB_COMPATIBILITY_VERSION", S("1")),
            ("DYLIB_CURRENT_VERSION", S("1")),
            ("DYLIB_INSTALL_NAME_BASE", S("@rpath")),
            ("INSTALL_PATH", S("$(LOCAL_LIBRARY_DIR)/Frameworks")),
            ("SKIP_INSTALL", S("YES")),
            ("VERSIONING_SYSTEM", S("apple-generic")),
            ("VERSION_INFO_PREFIX", S("")),
        ],
    ),
    (
        "product/library.static",
        &[("OTHER_LDFLAGS", S("-ObjC")), ("SKIP_INSTALL", S("YES"))],
    ),
    (
        "product/library.dynamic",
        &[
            ("DYLIB_COMPATIBILITY_VERSION", S("1")),
            ("DYLIB_CURRENT_VERSION", S("1")),
            ("EXECUTABLE_PREFIX", S("lib")),
            ("SKIP_INSTALL", S("YES")),
        ],
    ),
    (
        "product/bundle.unit-test",
        &[(
            "LD_RUNPATH_SEARCH_PATHS",
            L(&["$(inherited)", "@executable_path/Frameworks", "@loader_path/Frameworks"]),
        )],
    ),
    (
        "product/bundle.ui-testing",
        &[(
            "LD_RUNPATH_SEARCH_PATHS",
            L(&["$(inherited)", "@executable_path/Frameworks", "@loader_path/Frameworks"]),
        )],
    ),
    (
        "product/app-extension",
        &[
            (
                "LD_RUNPATH_SEARCH_PATHS",
                L(&[
                    "$(inherited)",
                    "@executable_path/Frameworks",
                    "@executable_path/../../Frameworks",
                ]),
            ),
            ("SKIP_INSTALL", S("YES")),
        ],
    ),
    (
        "platform-product/iOS/application",
        &[("CODE_SIGN_IDENTITY", S("iPhone Developer"))],
    ),
    (
        "platform-product/iOS/framework",
        &[(
            "LD_RUNPATH_SEARCH_PATHS",
            L(&["$(inherited)", "@executable_path/Frameworks", "@loader_path/Frameworks"]),
        )],
    ),
    (
        "platform-product/macOS/framework",
        &[
            ("COMBINE_HIDPI_IMAGES", S("YES")),
            ("FRAMEWORK_VERSION", S("A")),
            (
                "LD_RUNPATH_SEARCH_PATHS",
                L(&["$(inherited)", "@executable_path/../Frameworks", "@loader_path/Frameworks"]),
            ),
        ],
    ),
    (
        "platform-product/macOS/application",
        &[("CODE_SIGN_IDENTITY", S("-"))],
    ),
];

fn to_settings(entries: &[(&str, V)]) -> Settings {
    let mut settings = Settings::new();
    for (key, value) in entries {
        let value = match value {
            S(text) => SettingValue::from(*text),
            L(items) => SettingValue::from(items.iter().map(|s| s.to_string()).collect::<Vec<_>>()),
        };
        settings.build_settings.insert(key.to_string(), value);
    }
    settings
}

/// The built-in preset table.
#[derive(Debug, Clone)]
pub struct BuiltinPresets {
    presets: BTreeMap<String, Settings>,
}

impl BuiltinPresets {
    pub fn new() -> Self {
        Self {
            presets: BUILTIN
                .iter()
                .map(|(key, entries)| (key.to_string(), to_settings(entries)))
                .collect(),
        }
    }

    /// Keys of every built-in preset, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.presets.keys().map(String::as_str)
    }
}

impl Default for BuiltinPresets {
    fn default() -> Self {
        Self::new()
    }
}

impl PresetLibrary for BuiltinPresets {
    fn preset(&self, key: PresetKey<'_>) -> Option<Settings> {
        self.presets.get(&key.to_string()).cloned()
    }
}

// ── Directory presets ────────────────────────────────────────────────────────

/// Presets read from `<dir>/**/*.json`, layered over [`BuiltinPresets`].
#[derive(Debug, Clone)]
pub struct DirectoryPresets {
    root: PathBuf,
    presets: BTreeMap<String, Settings>,
    builtin: BuiltinPresets,
}

impl DirectoryPresets {
    /// Load every preset under `root`.
    ///
    /// A missing directory yields only the built-in presets. A file that
    /// cannot be read or parsed fails the whole load, so a typo never
    /// silently falls back to a built-in preset.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn load(root: impl AsRef<Path>) -> Result<Self, LoadError> {
        let root = root.as_ref().to_path_buf();
        let mut presets = BTreeMap::new();

        if !root.is_dir() {
            warn!("Preset directory not found, using built-in presets only");
        } else {
            for entry in WalkDir::new(&root).sort_by_file_name() {
                let entry = entry.map_err(|e| LoadError::read(&root, e))?;
                let path = entry.path();
                if !entry.file_type().is_file()
                    || path.extension().and_then(|e| e.to_str()) != Some("json")
                {
                    continue;
                }
                let Some(key) = preset_key(&root, path) else {
                    continue;
                };
                let text = std::fs::read_to_string(path).map_err(|e| LoadError::read(path, e))?;
                let settings: Settings =
                    serde_json::from_str(&text).map_err(|e| LoadError::parse(path, &e))?;
                debug!(key = %key, "Loaded preset");
                presets.insert(key, settings);
            }
        }

        Ok(Self {
            root,
            presets,
            builtin: BuiltinPresets::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of presets read from disk.
    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }
}

/// `<root>/platform/iOS.json` becomes `platform/iOS`.
fn preset_key(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}

impl PresetLibrary for DirectoryPresets {
    fn preset(&self, key: PresetKey<'_>) -> Option<Settings> {
        self.presets
            .get(&key.to_string())
            .cloned()
            .or_else(|| self.builtin.preset(key))
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pbxgen_core::domain::{ConfigKind, Platform, ProductType};

    use super::*;

    #[test]
    fn builtin_covers_every_platform_and_config() {
        let presets = BuiltinPresets::new();
        assert!(presets.preset(PresetKey::Base).is_some());
        for kind in [ConfigKind::Debug, ConfigKind::Release] {
            assert!(presets.preset(PresetKey::Config(kind)).is_some(), "{kind}");
        }
        for platform in Platform::ALL {
            assert!(presets.preset(PresetKey::Platform(platform)).is_some(), "{platform}");
        }
    }

    #[test]
    fn builtin_values_keep_lists() {
        let debug = BuiltinPresets::new()
            .preset(PresetKey::Config(ConfigKind::Debug))
            .unwrap();
        assert_eq!(
            debug.build_settings["GCC_PREPROCESSOR_DEFINITIONS"],
            SettingValue::from(vec!["$(inherited)".to_string(), "DEBUG=1".to_string()])
        );
    }

    #[test]
    fn named_lookup_uses_the_same_keys() {
        let presets = BuiltinPresets::new();
        assert!(presets.contains("base"));
        assert!(presets.contains("product/framework"));
        assert!(!presets.contains("nonsense"));
        assert!(presets.preset(PresetKey::Product(ProductType::CommandLineTool)).is_none());
    }

    #[test]
    fn directory_presets_override_builtin() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("platform")).unwrap();
        fs::write(
            dir.path().join("platform/iOS.json"),
            r#"{ "buildSettings": { "TARGETED_DEVICE_FAMILY": "1" } }"#,
        )
        .unwrap();
        fs::write(
            dir.path().join("team.json"),
            r#"{ "buildSettings": { "DEVELOPMENT_TEAM": "ABC" } }"#,
        )
        .unwrap();

        let presets = DirectoryPresets::load(dir.path()).unwrap();

        assert_eq!(presets.len(), 2);
        let ios = presets.preset(PresetKey::Platform(Platform::Ios)).unwrap();
        assert_eq!(ios.build_settings["TARGETED_DEVICE_FAMILY"], SettingValue::from("1"));
        assert!(presets.contains("team"));
        assert!(presets.preset(PresetKey::Base).is_some());
    }

    #[test]
    fn invalid_preset_fails_the_load() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("broken.json"), "{ not json").unwrap();

        let err = DirectoryPresets::load(dir.path()).unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: 1, .. }), "{err:?}");
    }

    #[test]
    fn missing_directory_falls_back() {
        let presets = DirectoryPresets::load("/definitely/not/here").unwrap();
        assert!(presets.is_empty());
        assert!(presets.preset(PresetKey::Base).is_some());
    }
}
