use bitflags::bitflags;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{Aabb, ObjectId, ZoneId};

/// Zone queries served by the scene graph.
pub trait SceneQuery {
    /// Total number of zones in the scene (the outdoor zone included).
    fn num_zones(&self) -> u32;

    /// All zones overlapping `bounds`.
    fn find_zones(&self, bounds: &Aabb) -> Vec<ZoneId>;
}

bitflags! {
    /// Object categories a ray cast may hit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct TypeMask: u32 {
        const TERRAIN = 1 << 0;
        const INTERIOR = 1 << 1;
        const STATIC_SHAPE = 1 << 2;
        const PLAYER = 1 << 3;
        const VEHICLE = 1 << 4;
        const WATER = 1 << 5;
    }
}

impl Default for TypeMask {
    fn default() -> Self {
        TypeMask::TERRAIN | TypeMask::INTERIOR
    }
}

/// Result of a successful ray cast.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub point: Vec3,
    pub normal: Vec3,
    pub object: Option<ObjectId>,
}

/// Synchronous ray casts into the collision world.
pub trait CollisionQuery {
    /// First hit along the segment `from -> to` among objects in `mask`.
    fn cast_ray(&self, from: Vec3, to: Vec3, mask: TypeMask) -> Option<RayHit>;
}

/// A world with nothing in it. Every cast misses.
impl CollisionQuery for () {
    fn cast_ray(&self, _from: Vec3, _to: Vec3, _mask: TypeMask) -> Option<RayHit> {
        None
    }
}
