use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use torque_curve::{LoopKind, Path3D};

use crate::ConfigError;

/// Authored path: points, optional per-point times and roll, and how the
/// path is laid out in time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConfig {
    pub points: Vec<Vec3>,
    pub times: Option<Vec<f32>>,
    pub roll: Option<Vec<f32>>,
    pub delay: f32,
    pub lifetime: f32,
    pub loop_kind: LoopKind,
    /// Time multiplier applied before the per-modifier one.
    pub mult: f32,
    pub time_offset: f32,
    /// Run the points back to front.
    pub reverse: bool,
    /// Added to every point.
    pub offset: Vec3,
}

impl Default for PathConfig {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            times: None,
            roll: None,
            delay: 0.0,
            lifetime: 1.0,
            loop_kind: LoopKind::Constant,
            mult: 1.0,
            time_offset: 0.0,
            reverse: false,
            offset: Vec3::ZERO,
        }
    }
}

/// A built path plus its own time warp.
#[derive(Debug, Clone)]
pub struct PathEntry {
    pub path: Path3D,
    pub mult: f32,
    pub time_offset: f32,
}

impl PathEntry {
    pub fn build(name: &str, config: &PathConfig) -> Result<Self, ConfigError> {
        if !config.lifetime.is_finite() || config.lifetime < 0.0 {
            let reason = format!("path `{name}` has lifetime {}", config.lifetime);
            return Err(ConfigError::invalid("lifetime", reason));
        }
        let mut points: Vec<Vec3> = config.points.iter().map(|p| *p + config.offset).collect();
        let mut times = config.times.clone();
        let mut roll = config.roll.clone();
        if config.reverse {
            points.reverse();
            if let Some(times) = times.as_mut() {
                // keep times ascending, mirrored around the span
                let last = times.last().copied().unwrap_or(0.0);
                let first = times.first().copied().unwrap_or(0.0);
                times.reverse();
                for t in times.iter_mut() {
                    *t = first + last - *t;
                }
            }
            if let Some(roll) = roll.as_mut() {
                roll.reverse();
            }
        }
        let path_err = |source| ConfigError::Path {
            name: name.to_string(),
            source,
        };
        let mut path = Path3D::new(
            &points,
            times.as_deref(),
            config.delay,
            config.lifetime,
            config.loop_kind,
        )
        .map_err(path_err)?;
        if let Some(roll) = roll {
            path = path.with_roll(&roll).map_err(path_err)?;
        }
        Ok(Self {
            path,
            mult: config.mult,
            time_offset: config.time_offset,
        })
    }

    /// Offset at `elapsed`, after both time warps.
    pub fn offset_at(&self, elapsed: f32, mult: f32, time_offset: f32) -> Vec3 {
        self.path.evaluate_at_time(self.warp(elapsed, mult, time_offset))
    }

    pub fn warp(&self, elapsed: f32, mult: f32, time_offset: f32) -> f32 {
        elapsed * mult * self.mult + time_offset + self.time_offset
    }
}

/// Named paths available to modifiers at build time.
#[derive(Debug, Clone, Default)]
pub struct PathRegistry {
    paths: BTreeMap<String, PathEntry>,
}

impl PathRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_configs(configs: &BTreeMap<String, PathConfig>) -> Result<Self, ConfigError> {
        let mut registry = Self::new();
        for (name, config) in configs {
            registry.insert(name, config)?;
        }
        Ok(registry)
    }

    pub fn insert(&mut self, name: &str, config: &PathConfig) -> Result<(), ConfigError> {
        let entry = PathEntry::build(name, config)?;
        if self.paths.insert(name.to_string(), entry).is_some() {
            tracing::debug!(path = name, "path replaced");
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PathEntry> {
        self.paths.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
