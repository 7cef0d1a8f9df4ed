//! Target dependencies.

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Linkage, Platform};

/// What a dependency points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DependencyKind {
    /// Another target in this project.
    Target(String),

    /// Products of a declared remote package.
    Package { name: String, products: Vec<String> },

    /// A framework built outside this tool and located under the
    /// per-platform prebuilt-framework root.
    Prebuilt {
        reference: String,
        #[serde(default)]
        linkage: Linkage,
        #[serde(default)]
        find_related: Option<bool>,
    },

    /// A system framework or library from the SDK.
    Sdk {
        reference: String,
        #[serde(default)]
        root: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dependency {
    #[serde(flatten)]
    pub kind: DependencyKind,

    /// Restrict the dependency to targets on one platform.
    #[serde(default)]
    pub platform: Option<Platform>,

    /// Link only into the declaring target, never transitively.
    #[serde(default)]
    pub target_only: bool,

    #[serde(default)]
    pub embed: Option<bool>,
    #[serde(default)]
    pub link: Option<bool>,
    #[serde(default)]
    pub code_sign: Option<bool>,
    #[serde(default)]
    pub weak: bool,
}

impl Dependency {
    pub fn new(kind: DependencyKind) -> Self {
        Self {
            kind,
            platform: None,
            target_only: false,
            embed: None,
            link: None,
            code_sign: None,
            weak: false,
        }
    }

    pub fn target(name: impl Into<String>) -> Self {
        Self::new(DependencyKind::Target(name.into()))
    }

    pub fn prebuilt(reference: impl Into<String>) -> Self {
        Self::new(DependencyKind::Prebuilt {
            reference: reference.into(),
            linkage: Linkage::Dynamic,
            find_related: None,
        })
    }

    pub fn sdk(reference: impl Into<String>) -> Self {
        Self::new(DependencyKind::Sdk {
            reference: reference.into(),
            root: None,
        })
    }

    pub fn package(name: impl Into<String>, products: Vec<String>) -> Self {
        Self::new(DependencyKind::Package {
            name: name.into(),
            products,
        })
    }

    pub fn for_platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Name used for ordering and de-duplication.
    pub fn reference(&self) -> &str {
        match &self.kind {
            DependencyKind::Target(name) => name,
            DependencyKind::Package { name, .. } => name,
            DependencyKind::Prebuilt { reference, .. } => reference,
            DependencyKind::Sdk { reference, .. } => reference,
        }
    }

    /// Whether the dependency applies to a target on `platform`.
    pub fn applies_to(&self, platform: Platform) -> bool {
        self.platform.is_none_or(|only| only == platform)
    }
}
