use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in world space.
///
/// `intersection` may produce an inverted box (`min > max` on some axis);
/// `is_valid` reports that case instead of the constructor rejecting it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Box centered on `center` with the same half extent on every axis.
    pub fn from_center_half_extent(center: Vec3, half_extent: f32) -> Self {
        let h = Vec3::splat(half_extent);
        Self {
            min: center - h,
            max: center + h,
        }
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Full size along each axis. Negative components mean the box is inverted.
    pub fn extents(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn is_valid(&self) -> bool {
        self.min.cmple(self.max).all()
    }

    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn intersection(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.cmple(other.max).all() && other.min.cmple(self.max).all()
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.min.cmple(p).all() && p.cmple(self.max).all()
    }

    /// Sphere through the box corners. An inverted box still yields a
    /// positive radius: the half length of its (negative) diagonal.
    pub fn bounding_sphere(&self) -> Sphere {
        let center = self.center();
        Sphere {
            center,
            radius: (self.max - center).length(),
        }
    }
}

/// World-space sphere.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sphere {
    pub center: Vec3,
    pub radius: f32,
}

impl Sphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    pub fn contains_point(&self, p: Vec3) -> bool {
        self.center.distance_squared(p) <= self.radius * self.radius
    }

    pub fn overlaps_sphere(&self, other: &Sphere) -> bool {
        let r = self.radius + other.radius;
        self.center.distance_squared(other.center) <= r * r
    }

    pub fn overlaps_aabb(&self, b: &Aabb) -> bool {
        let closest = self.center.clamp(b.min, b.max);
        self.center.distance_squared(closest) <= self.radius * self.radius
    }

    /// Cube enclosing the sphere (half extent = radius).
    pub fn to_aabb(&self) -> Aabb {
        Aabb::from_center_half_extent(self.center, self.radius)
    }
}
