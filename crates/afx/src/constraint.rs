//! Constraint references: the spec strings effects are authored with, and
//! the lookup interface the host scene answers them through.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};
use std::cell::Cell;
use std::fmt;
use std::str::FromStr;
use torque_common::{Aabb, ObjectId};

/// Where a constraint finds its object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintSource {
    Caster,
    Target,
    Camera,
    Effect,
    Scene,
    None,
}

impl ConstraintSource {
    fn keyword(self) -> &'static str {
        match self {
            Self::Caster => "caster",
            Self::Target => "target",
            Self::Camera => "camera",
            Self::Effect => "effect",
            Self::Scene => "scene",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintError {
    #[error("constraint spec is empty")]
    Empty,
    #[error("constraint spec `{0}` must start with '#'")]
    MissingHash(String),
    #[error("unknown constraint source `{0}`")]
    UnknownSource(String),
    #[error("`#{0}` constraints need an object name")]
    MissingName(&'static str),
    #[error("constraint spec `{0}` has more than three parts")]
    TooManyParts(String),
}

/// Parsed `#source[.name[.node]]` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConstraintSpec {
    pub source: ConstraintSource,
    pub name: Option<String>,
    pub node: Option<String>,
}

impl ConstraintSpec {
    pub fn new(source: ConstraintSource) -> Self {
        Self {
            source,
            name: None,
            node: None,
        }
    }

    pub fn named(source: ConstraintSource, name: impl Into<String>) -> Self {
        Self {
            source,
            name: Some(name.into()),
            node: None,
        }
    }

    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.node = Some(node.into());
        self
    }

    pub fn is_none(&self) -> bool {
        self.source == ConstraintSource::None
    }
}

impl FromStr for ConstraintSpec {
    type Err = ConstraintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ConstraintError::Empty);
        }
        let body = s
            .strip_prefix('#')
            .ok_or_else(|| ConstraintError::MissingHash(s.to_string()))?;
        let mut parts = body.splitn(4, '.');
        let keyword = parts.next().unwrap_or_default();
        let source = match keyword.to_ascii_lowercase().as_str() {
            "caster" => ConstraintSource::Caster,
            "target" => ConstraintSource::Target,
            "camera" => ConstraintSource::Camera,
            "effect" => ConstraintSource::Effect,
            "scene" => ConstraintSource::Scene,
            "none" => ConstraintSource::None,
            _ => return Err(ConstraintError::UnknownSource(keyword.to_string())),
        };
        let name = parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        let node = parts.next().filter(|p| !p.is_empty()).map(str::to_string);
        if parts.next().is_some() {
            return Err(ConstraintError::TooManyParts(s.to_string()));
        }
        if name.is_none() && matches!(source, ConstraintSource::Scene | ConstraintSource::Effect) {
            return Err(ConstraintError::MissingName(source.keyword()));
        }
        Ok(Self { source, name, node })
    }
}

impl fmt::Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.source.keyword())?;
        if let Some(name) = &self.name {
            write!(f, ".{name}")?;
        }
        if let Some(node) = &self.node {
            write!(f, ".{node}")?;
        }
        Ok(())
    }
}

/// Opaque handle issued by a [`ConstraintLookup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    #[default]
    Alive,
    Dying,
    Dead,
}

/// What the scene reports about a constrained object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneObjectInfo {
    pub id: ObjectId,
    pub world_box: Aabb,
    pub life: LifeState,
}

/// Host-side resolution of constraint references.
///
/// Every query may fail; callers treat `None` as "unavailable this tick".
pub trait ConstraintLookup {
    fn resolve(&self, spec: &ConstraintSpec) -> Option<ConstraintHandle>;
    fn position(&self, handle: ConstraintHandle, history_time: f32) -> Option<Vec3>;
    fn transform(&self, handle: ConstraintHandle, history_time: f32) -> Option<Mat4>;
    fn scene_object(&self, handle: ConstraintHandle) -> Option<SceneObjectInfo>;
    fn release(&self, _handle: ConstraintHandle) {}
}

#[derive(Debug, Clone)]
struct StaticEntry {
    spec: ConstraintSpec,
    transform: Mat4,
    object: Option<SceneObjectInfo>,
}

/// Fixed table of constraints, for tools and tests. History time is ignored.
#[derive(Debug, Default)]
pub struct StaticConstraints {
    entries: Vec<StaticEntry>,
    releases: Cell<usize>,
}

impl StaticConstraints {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, spec: ConstraintSpec, transform: Mat4) -> ConstraintHandle {
        self.push(spec, transform, None)
    }

    pub fn insert_object(
        &mut self,
        spec: ConstraintSpec,
        transform: Mat4,
        object: SceneObjectInfo,
    ) -> ConstraintHandle {
        self.push(spec, transform, Some(object))
    }

    fn push(
        &mut self,
        spec: ConstraintSpec,
        transform: Mat4,
        object: Option<SceneObjectInfo>,
    ) -> ConstraintHandle {
        let handle = ConstraintHandle(self.entries.len() as u32);
        self.entries.push(StaticEntry { spec, transform, object });
        handle
    }

    pub fn set_transform(&mut self, handle: ConstraintHandle, transform: Mat4) {
        if let Some(e) = self.entries.get_mut(handle.0 as usize) {
            e.transform = transform;
        }
    }

    pub fn set_life(&mut self, handle: ConstraintHandle, life: LifeState) {
        let entry = self.entries.get_mut(handle.0 as usize);
        if let Some(obj) = entry.and_then(|e| e.object.as_mut()) {
            obj.life = life;
        }
    }

    /// Number of `release` calls received.
    pub fn release_count(&self) -> usize {
        self.releases.get()
    }
}

impl ConstraintLookup for StaticConstraints {
    fn resolve(&self, spec: &ConstraintSpec) -> Option<ConstraintHandle> {
        if spec.is_none() {
            return None;
        }
        self.entries
            .iter()
            .position(|e| e.spec == *spec)
            .map(|i| ConstraintHandle(i as u32))
    }

    fn position(&self, handle: ConstraintHandle, _history_time: f32) -> Option<Vec3> {
        self.entries
            .get(handle.0 as usize)
            .map(|e| e.transform.w_axis.truncate())
    }

    fn transform(&self, handle: ConstraintHandle, _history_time: f32) -> Option<Mat4> {
        self.entries.get(handle.0 as usize).map(|e| e.transform)
    }

    fn scene_object(&self, handle: ConstraintHandle) -> Option<SceneObjectInfo> {
        self.entries.get(handle.0 as usize).and_then(|e| e.object)
    }

    fn release(&self, _handle: ConstraintHandle) {
        self.releases.set(self.releases.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<ConstraintSpec, ConstraintError> {
        text.parse()
    }

    #[test]
    fn parses_all_forms() {
        let s: ConstraintSpec = "#caster".parse().unwrap();
        assert_eq!(s, ConstraintSpec::new(ConstraintSource::Caster));

        let s: ConstraintSpec = "#target.Bip01 Head".parse().unwrap();
        assert_eq!(s.source, ConstraintSource::Target);
        assert_eq!(s.name.as_deref(), Some("Bip01 Head"));

        let s: ConstraintSpec = "#Scene.crate01.mount0".parse().unwrap();
        let crate01 = ConstraintSpec::named(ConstraintSource::Scene, "crate01");
        assert_eq!(s, crate01.with_node("mount0"));
        assert!("#none".parse::<ConstraintSpec>().unwrap().is_none());
    }

    #[test]
    fn rejects_malformed_specs() {
        assert_eq!(parse(""), Err(ConstraintError::Empty));
        assert!(matches!(parse("caster"), Err(ConstraintError::MissingHash(_))));
        assert!(matches!(parse("#pet"), Err(ConstraintError::UnknownSource(_))));
        assert_eq!(parse("#scene"), Err(ConstraintError::MissingName("scene")));
        assert!(matches!(parse("#scene.a.b.c"), Err(ConstraintError::TooManyParts(_))));
    }

    #[test]
    fn display_round_trips() {
        for text in ["#caster", "#effect.bolt", "#scene.crate01.mount0"] {
            let spec: ConstraintSpec = text.parse().unwrap();
            assert_eq!(spec.to_string(), text);
        }
    }

    #[test]
    fn static_lookup_resolves_and_counts_releases() {
        let mut table = StaticConstraints::new();
        let caster = ConstraintSpec::new(ConstraintSource::Caster);
        let at = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
        let h = table.insert(caster.clone(), at);
        assert_eq!(table.resolve(&caster), Some(h));
        assert_eq!(table.position(h, 0.0), Some(Vec3::new(1.0, 2.0, 3.0)));
        assert!(table.scene_object(h).is_none());
        let target = ConstraintSpec::new(ConstraintSource::Target);
        assert!(table.resolve(&target).is_none());
        assert!(table.position(ConstraintHandle(9), 0.0).is_none());
        table.release(h);
        assert_eq!(table.release_count(), 1);
    }

    #[test]
    fn life_state_updates_object() {
        let mut table = StaticConstraints::new();
        let info = SceneObjectInfo {
            id: ObjectId(7),
            world_box: Aabb::new(Vec3::ZERO, Vec3::ONE),
            life: LifeState::Alive,
        };
        let target = ConstraintSpec::new(ConstraintSource::Target);
        let h = table.insert_object(target, Mat4::IDENTITY, info);
        table.set_life(h, LifeState::Dying);
        let life = table.scene_object(h).map(|o| o.life);
        assert_eq!(life, Some(LifeState::Dying));
    }
}
