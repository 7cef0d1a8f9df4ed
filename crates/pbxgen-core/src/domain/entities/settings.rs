//! Layered build settings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A single build-setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    String(String),
    List(Vec<String>),
}

impl SettingValue {
    /// String form used in generated files (`YES`/`NO` for booleans).
    pub fn as_setting_string(&self) -> String {
        match self {
            Self::Bool(true) => "YES".into(),
            Self::Bool(false) => "NO".into(),
            Self::String(s) => s.clone(),
            Self::List(items) => items.join(" "),
        }
    }
}

impl From<&str> for SettingValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for SettingValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for SettingValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<String>> for SettingValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Flattened key/value build settings. Keys are unique and kept sorted,
/// so equality never depends on insertion order.
pub type BuildSettings = BTreeMap<String, SettingValue>;

/// Settings as declared on a project, target or settings group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    /// Named groups or presets merged first, in order.
    pub groups: Vec<String>,

    /// Explicit base mapping.
    pub build_settings: BuildSettings,

    /// Overrides for a config, matched by config name or kind.
    pub config_settings: Vec<ConfigSettings>,
}

/// Settings scoped to one config name or config kind (`debug`/`release`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSettings {
    pub config: String,
    pub settings: Settings,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settings with only a base mapping.
    pub fn from_build_settings(build_settings: BuildSettings) -> Self {
        Self {
            build_settings,
            ..Self::default()
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    pub fn with_setting(mut self, key: impl Into<String>, value: impl Into<SettingValue>) -> Self {
        self.build_settings.insert(key.into(), value.into());
        self
    }

    pub fn with_config(mut self, config: impl Into<String>, settings: Settings) -> Self {
        self.config_settings.push(ConfigSettings {
            config: config.into(),
            settings,
        });
        self
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.build_settings.is_empty() && self.config_settings.is_empty()
    }

    /// Every group name referenced here or in nested config settings.
    pub fn referenced_groups(&self) -> Vec<&str> {
        let mut groups: Vec<&str> = self.groups.iter().map(String::as_str).collect();
        for scoped in &self.config_settings {
            groups.extend(scoped.settings.referenced_groups());
        }
        groups
    }
}

/// Merge `overlay` into `base`; overlay keys win.
pub fn merge_settings(base: &mut BuildSettings, overlay: &BuildSettings) {
    for (key, value) in overlay {
        base.insert(key.clone(), value.clone());
    }
}
