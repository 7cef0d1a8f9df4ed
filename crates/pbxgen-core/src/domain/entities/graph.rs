//! The identifier-addressed object graph.
//!
//! Objects live in one append-only table keyed by [`ObjectId`]. Objects refer
//! to each other only through ids stored in their field values; parent to
//! child relationships are explicit ordered id lists, never back-pointers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::domain::entities::scheme::Scheme;
use crate::domain::entities::target::PlistValue;

// ── Identity ─────────────────────────────────────────────────────────────────

/// Stable 24-character identifier of a graph object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of a graph object, written as its `isa`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Isa {
    AggregateTarget,
    BuildFile,
    BuildRule,
    ContainerItemProxy,
    CopyFilesBuildPhase,
    FileReference,
    FrameworksBuildPhase,
    Group,
    HeadersBuildPhase,
    NativeTarget,
    Project,
    ResourcesBuildPhase,
    ShellScriptBuildPhase,
    SourcesBuildPhase,
    TargetDependency,
    VariantGroup,
    BuildConfiguration,
    ConfigurationList,
    RemotePackageReference,
    PackageProductDependency,
    VersionGroup,
}

impl Isa {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AggregateTarget => "PBXAggregateTarget",
            Self::BuildFile => "PBXBuildFile",
            Self::BuildRule => "PBXBuildRule",
            Self::ContainerItemProxy => "PBXContainerItemProxy",
            Self::CopyFilesBuildPhase => "PBXCopyFilesBuildPhase",
            Self::FileReference => "PBXFileReference",
            Self::FrameworksBuildPhase => "PBXFrameworksBuildPhase",
            Self::Group => "PBXGroup",
            Self::HeadersBuildPhase => "PBXHeadersBuildPhase",
            Self::NativeTarget => "PBXNativeTarget",
            Self::Project => "PBXProject",
            Self::ResourcesBuildPhase => "PBXResourcesBuildPhase",
            Self::ShellScriptBuildPhase => "PBXShellScriptBuildPhase",
            Self::SourcesBuildPhase => "PBXSourcesBuildPhase",
            Self::TargetDependency => "PBXTargetDependency",
            Self::VariantGroup => "PBXVariantGroup",
            Self::BuildConfiguration => "XCBuildConfiguration",
            Self::ConfigurationList => "XCConfigurationList",
            Self::RemotePackageReference => "XCRemoteSwiftPackageReference",
            Self::PackageProductDependency => "XCSwiftPackageProductDependency",
            Self::VersionGroup => "XCVersionGroup",
        }
    }

    /// Objects written on a single line in the object table.
    pub const fn is_inline(&self) -> bool {
        matches!(self, Self::BuildFile | Self::FileReference)
    }
}

impl fmt::Display for Isa {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Values ───────────────────────────────────────────────────────────────────

/// A field value of a graph object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    String(String),
    Id(ObjectId),
    Array(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn ids(ids: impl IntoIterator<Item = ObjectId>) -> Self {
        Self::Array(ids.into_iter().map(Self::Id).collect())
    }

    pub fn strings<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Array(items.into_iter().map(|s| Self::String(s.into())).collect())
    }

    fn collect_ids<'a>(&'a self, out: &mut Vec<&'a ObjectId>) {
        match self {
            Self::Id(id) => out.push(id),
            Self::Array(items) => items.iter().for_each(|v| v.collect_ids(out)),
            Self::Map(map) => map.values().for_each(|v| v.collect_ids(out)),
            Self::String(_) => {}
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<ObjectId> for Value {
    fn from(value: ObjectId) -> Self {
        Self::Id(value)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(value: BTreeMap<String, Value>) -> Self {
        Self::Map(value)
    }
}

// ── Objects ──────────────────────────────────────────────────────────────────

/// One entry of the object table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Object {
    pub isa: Isa,
    /// Human-readable label written next to references to this object.
    pub comment: String,
    pub fields: BTreeMap<String, Value>,
}

impl Object {
    pub fn new(isa: Isa, comment: impl Into<String>) -> Self {
        Self {
            isa,
            comment: comment.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn with_opt(self, key: &str, value: Option<impl Into<Value>>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.fields.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    /// Ids listed under an array field such as `children` or `files`.
    pub fn id_list(&self, key: &str) -> Vec<&ObjectId> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::Id(id) => Some(id),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn references(&self) -> Vec<&ObjectId> {
        let mut out = Vec::new();
        self.fields.values().for_each(|v| v.collect_ids(&mut out));
        out
    }
}

// ── Auxiliary documents ──────────────────────────────────────────────────────

/// Link from a scheme to a target in the object table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildableReference {
    pub blueprint_id: ObjectId,
    pub buildable_name: String,
    pub blueprint_name: String,
    pub container: String,
}

/// A resolved scheme ready for serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemeDocument {
    pub scheme: Scheme,
    /// Buildable references keyed by target name.
    pub buildables: BTreeMap<String, BuildableReference>,
    /// Target launched by run/profile, if any.
    pub launch_target: Option<String>,
    /// Whether the launch target is directly runnable.
    pub launch_runnable: bool,
}

/// A per-target property-list file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// Path relative to the destination directory.
    pub path: String,
    pub properties: BTreeMap<String, PlistValue>,
}

// ── Graph ────────────────────────────────────────────────────────────────────

/// Complete output of one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectGraph {
    pub project_name: String,
    pub object_version: u32,
    objects: BTreeMap<ObjectId, Object>,
    root: Option<ObjectId>,
    pub schemes: Vec<SchemeDocument>,
    pub declarations: Vec<Declaration>,
}

impl ObjectGraph {
    pub const OBJECT_VERSION: u32 = 56;

    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
            object_version: Self::OBJECT_VERSION,
            objects: BTreeMap::new(),
            root: None,
            schemes: Vec::new(),
            declarations: Vec::new(),
        }
    }

    /// Append an object. Returns `false` and keeps the existing object if
    /// the id is taken.
    pub fn insert(&mut self, id: ObjectId, object: Object) -> bool {
        if self.objects.contains_key(&id) {
            return false;
        }
        self.objects.insert(id, object);
        true
    }

    pub fn get(&self, id: &ObjectId) -> Option<&Object> {
        self.objects.get(id)
    }

    pub fn get_mut(&mut self, id: &ObjectId) -> Option<&mut Object> {
        self.objects.get_mut(id)
    }

    pub fn set_root(&mut self, id: ObjectId) {
        self.root = Some(id);
    }

    pub fn root(&self) -> Option<&ObjectId> {
        self.root.as_ref()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Objects in canonical order: by kind, then by id.
    pub fn sorted_objects(&self) -> Vec<(&ObjectId, &Object)> {
        let mut objects: Vec<_> = self.objects.iter().collect();
        objects.sort_by(|(a_id, a), (b_id, b)| {
            a.isa.as_str().cmp(b.isa.as_str()).then_with(|| a_id.cmp(b_id))
        });
        objects
    }

    pub fn objects_of(&self, isa: Isa) -> impl Iterator<Item = (&ObjectId, &Object)> {
        self.objects.iter().filter(move |(_, o)| o.isa == isa)
    }

    /// Find an object of `isa` by its comment.
    pub fn find(&self, isa: Isa, comment: &str) -> Option<(&ObjectId, &Object)> {
        self.objects_of(isa).find(|(_, o)| o.comment == comment)
    }

    /// References that do not resolve to an object in the table.
    pub fn dangling_references(&self) -> BTreeSet<ObjectId> {
        let mut dangling = BTreeSet::new();
        for object in self.objects.values() {
            for id in object.references() {
                if !self.objects.contains_key(id) {
                    dangling.insert(id.clone());
                }
            }
        }
        if let Some(root) = &self.root {
            if !self.objects.contains_key(root) {
                dangling.insert(root.clone());
            }
        }
        dangling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> ObjectId {
        ObjectId::new(s)
    }

    #[test]
    fn insert_is_append_only() {
        let mut graph = ObjectGraph::new("Demo");
        assert!(graph.insert(id("A"), Object::new(Isa::Group, "first")));
        assert!(!graph.insert(id("A"), Object::new(Isa::Group, "second")));
        assert_eq!(graph.get(&id("A")).unwrap().comment, "first");
    }

    #[test]
    fn canonical_order_is_kind_then_id() {
        let mut graph = ObjectGraph::new("Demo");
        graph.insert(id("B"), Object::new(Isa::Group, "g2"));
        graph.insert(id("C"), Object::new(Isa::BuildFile, "bf"));
        graph.insert(id("A"), Object::new(Isa::Group, "g1"));

        let order: Vec<&str> = graph
            .sorted_objects()
            .into_iter()
            .map(|(id, _)| id.as_str())
            .collect();
        assert_eq!(order, ["C", "A", "B"]);
    }

    #[test]
    fn detects_dangling_references() {
        let mut graph = ObjectGraph::new("Demo");
        graph.insert(
            id("G"),
            Object::new(Isa::Group, "main").with("children", Value::ids([id("F"), id("X")])),
        );
        graph.insert(id("F"), Object::new(Isa::FileReference, "a.swift"));
        graph.set_root(id("G"));

        let dangling = graph.dangling_references();
        assert_eq!(dangling.into_iter().collect::<Vec<_>>(), vec![id("X")]);
    }
}
