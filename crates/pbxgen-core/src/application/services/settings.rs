//! Settings resolver: flattens layered settings per (target, config).
//!
//! Merge order is fixed. Named groups in declared order, then the explicit
//! base mapping, then config-specific overrides. Later layers win per key.

use std::borrow::Cow;

use crate::{
    application::{
        error::GenerationError,
        ports::{PresetKey, PresetLibrary},
    },
    domain::{
        AnyTarget, BuildSettings, Config, DomainError, ProjectSpec, SettingValue, Settings,
        capabilities, merge_settings,
    },
    error::PbxResult,
};

pub struct SettingsResolver<'a> {
    spec: &'a ProjectSpec,
    presets: &'a dyn PresetLibrary,
}

impl<'a> SettingsResolver<'a> {
    pub fn new(spec: &'a ProjectSpec, presets: &'a dyn PresetLibrary) -> Self {
        Self { spec, presets }
    }

    /// Flatten `settings` for one config.
    pub fn resolve(&self, settings: &Settings, config: &Config) -> PbxResult<BuildSettings> {
        let mut chain = Vec::new();
        self.resolve_layers(settings, config, &mut chain)
    }

    /// Project-level settings: base and config-kind presets, then the
    /// project's own settings.
    pub fn project_settings(&self, config: &Config) -> PbxResult<BuildSettings> {
        let mut out = BuildSettings::new();
        if self.spec.options.setting_presets.applies_to_project() {
            for key in [PresetKey::Base, PresetKey::Config(config.kind)] {
                self.merge_preset(&mut out, key, config)?;
            }
        }
        merge_settings(&mut out, &self.resolve(&self.spec.settings, config)?);
        Ok(out)
    }

    /// Target-level settings: platform and product presets, implied
    /// defaults, then the target's own settings.
    pub fn target_settings(&self, target: AnyTarget<'_>, config: &Config) -> PbxResult<BuildSettings> {
        let mut out = BuildSettings::new();

        if let Some(native) = target.as_native() {
            if self.spec.options.setting_presets.applies_to_targets() {
                for key in [
                    PresetKey::Platform(native.platform),
                    PresetKey::Product(native.product_type),
                    PresetKey::PlatformProduct(native.platform, native.product_type),
                ] {
                    self.merge_preset(&mut out, key, config)?;
                }
            }

            out.insert(
                "SDKROOT".into(),
                SettingValue::from(native.platform.sdk_root()),
            );
            if let Some(product_name) = &native.product_name {
                out.insert("PRODUCT_NAME".into(), SettingValue::from(product_name.as_str()));
            }
            if let Some(prefix) = &self.spec.options.bundle_id_prefix {
                out.insert(
                    "PRODUCT_BUNDLE_IDENTIFIER".into(),
                    SettingValue::from(format!("{prefix}.{}", bundle_id_component(&native.name))),
                );
            }
            if capabilities::needs_info_plist(native.product_type) || native.info.is_some() {
                out.insert(
                    "INFOPLIST_FILE".into(),
                    SettingValue::from(native.info_plist_path()),
                );
            }
        }

        merge_settings(&mut out, &self.resolve(target.settings(), config)?);
        Ok(out)
    }

    fn merge_preset(
        &self,
        out: &mut BuildSettings,
        key: PresetKey<'_>,
        config: &Config,
    ) -> PbxResult<()> {
        if let Some(preset) = self.presets.preset(key) {
            let mut chain = vec![key.to_string()];
            merge_settings(out, &self.resolve_layers(&preset, config, &mut chain)?);
        }
        Ok(())
    }

    fn resolve_layers(
        &self,
        settings: &Settings,
        config: &Config,
        chain: &mut Vec<String>,
    ) -> PbxResult<BuildSettings> {
        let mut out = BuildSettings::new();

        for group in &settings.groups {
            let resolved = self.resolve_group(group, config, chain)?;
            merge_settings(&mut out, &resolved);
        }

        merge_settings(&mut out, &settings.build_settings);

        // Kind-keyed overrides apply before name-keyed ones.
        let kind = config.kind.as_str();
        let by_kind = settings.config_settings.iter().filter(|s| {
            s.config.eq_ignore_ascii_case(kind) && !s.config.eq_ignore_ascii_case(&config.name)
        });
        let by_name = settings
            .config_settings
            .iter()
            .filter(|s| s.config.eq_ignore_ascii_case(&config.name));
        for scoped in by_kind.chain(by_name) {
            let resolved = self.resolve_layers(&scoped.settings, config, chain)?;
            merge_settings(&mut out, &resolved);
        }

        Ok(out)
    }

    fn resolve_group(
        &self,
        name: &str,
        config: &Config,
        chain: &mut Vec<String>,
    ) -> PbxResult<BuildSettings> {
        if chain.iter().any(|seen| seen == name) {
            let mut cycle = chain.clone();
            cycle.push(name.to_string());
            return Err(GenerationError::SettingsGroupCycle {
                chain: cycle.join(" -> "),
            }
            .into());
        }

        let group: Cow<'_, Settings> = match self.spec.setting_groups.get(name) {
            Some(group) => Cow::Borrowed(group),
            None => match self.presets.preset(PresetKey::Named(name)) {
                Some(preset) => Cow::Owned(preset),
                None => {
                    return Err(DomainError::UnknownSettingsGroup {
                        owner: chain.last().cloned().unwrap_or_else(|| "settings".into()),
                        group: name.to_string(),
                    }
                    .into());
                }
            },
        };

        chain.push(name.to_string());
        let resolved = self.resolve_layers(&group, config, chain);
        chain.pop();
        resolved
    }
}

/// Bundle identifiers allow alphanumerics, `-` and `.`.
fn bundle_id_component(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '-' })
        .collect()
}
