use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use super::{ModifierContext, XfmModifier};
use crate::params::look_rotation;
use crate::{ConfigError, PathEntry, PathRegistry, TimingParams, Weighting, XfmParams};

/// Paths are named in a whitespace-separated list; `path_mult` and
/// `path_time_offset` give one value per listed path, missing trailing
/// values default to 1 and 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathConformConfig {
    pub paths: String,
    pub path_mult: String,
    pub path_time_offset: String,
    pub orient_to_path: bool,
    /// Offsets are rotated by the current orientation.
    pub local: bool,
    pub timing: TimingParams,
}

fn parse_floats(field: &'static str, text: &str, max: usize) -> Result<Vec<f32>, ConfigError> {
    let values = text
        .split_whitespace()
        .map(|tok| {
            tok.parse::<f32>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| ConfigError::MalformedPathSpec {
                    field,
                    reason: format!("`{tok}` is not a number"),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() > max {
        return Err(ConfigError::MalformedPathSpec {
            field,
            reason: format!("{} values for {max} paths", values.len()),
        });
    }
    Ok(values)
}

#[derive(Debug, Clone)]
struct Track {
    entry: PathEntry,
    mult: f32,
    time_offset: f32,
}

impl Track {
    fn time(&self, elapsed: f32) -> f32 {
        self.entry.warp(elapsed, self.mult, self.time_offset)
    }
}

/// Adds the summed offsets of one or more paths to the position.
#[derive(Debug)]
pub struct PathConformModifier {
    tracks: Vec<Track>,
    orient_to_path: bool,
    local: bool,
    weighting: Weighting,
}

impl PathConformModifier {
    pub fn new(config: &PathConformConfig, registry: &PathRegistry) -> Result<Self, ConfigError> {
        config.timing.validate()?;
        let names: Vec<&str> = config.paths.split_whitespace().collect();
        if names.is_empty() {
            return Err(ConfigError::EmptyPathList);
        }
        let mults = parse_floats("path_mult", &config.path_mult, names.len())?;
        let offsets = parse_floats("path_time_offset", &config.path_time_offset, names.len())?;
        let tracks = names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let entry = registry
                    .get(name)
                    .ok_or_else(|| ConfigError::UnknownPath(name.to_string()))?;
                Ok(Track {
                    entry: entry.clone(),
                    mult: mults.get(i).copied().unwrap_or(1.0),
                    time_offset: offsets.get(i).copied().unwrap_or(0.0),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self {
            tracks,
            orient_to_path: config.orient_to_path,
            local: config.local,
            weighting: Weighting::new(&config.timing),
        })
    }

    pub fn path_count(&self) -> usize {
        self.tracks.len()
    }

    /// Orientation along the first path at `elapsed`, rolled about its tangent.
    fn path_rotation(&self, elapsed: f32) -> Option<Quat> {
        let track = self.tracks.first()?;
        let t = track.time(elapsed);
        let facing = look_rotation(track.entry.path.tangent_at_time(t))?;
        let roll = track.entry.path.roll_at_time(t);
        Some(facing * Quat::from_rotation_y(roll.to_radians()))
    }
}

impl XfmModifier for PathConformModifier {
    fn name(&self) -> &'static str {
        "path_conform"
    }

    fn update_params(
        &mut self,
        _dt: f32,
        elapsed: f32,
        params: &mut XfmParams,
        _ctx: &mut ModifierContext<'_>,
    ) {
        let w = self.weighting.factor(elapsed);
        if w <= 0.0 {
            return;
        }
        let offset: Vec3 = self
            .tracks
            .iter()
            .map(|t| t.entry.path.evaluate_at_time(t.time(elapsed)))
            .sum::<Vec3>()
            * w;
        params.pos += if self.local {
            params.ori * offset
        } else {
            offset
        };

        if !self.orient_to_path {
            return;
        }
        let Some(rot) = self.path_rotation(elapsed) else {
            tracing::trace!("path conform tangent is degenerate");
            return;
        };
        params.ori = if self.local {
            (params.ori * Quat::IDENTITY.slerp(rot, w)).normalize()
        } else {
            params.ori.slerp(rot, w).normalize()
        };
    }
}
