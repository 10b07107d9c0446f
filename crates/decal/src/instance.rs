use bitflags::bitflags;
use glam::Vec3;
use slotmap::{SlotMap, new_key_type};
use torque_common::Aabb;

new_key_type! {
    /// Stable handle to a decal in the store's arena.
    pub struct DecalId;
}

/// Arena holding every decal of a store.
pub type DecalArena = SlotMap<DecalId, DecalInstance>;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct DecalFlags: u8 {
        /// Never fades or expires.
        const PERMANENT = 1 << 0;
        /// Written to the decal data file.
        const SAVE = 1 << 1;
        /// Geometry has been clipped against the scene.
        const CLIPPED = 1 << 2;
        /// Uses a custom texture rectangle.
        const CUSTOM = 1 << 3;
    }
}

/// A single placed decal.
#[derive(Debug, Clone, PartialEq)]
pub struct DecalInstance {
    pub position: Vec3,
    pub normal: Vec3,
    pub tangent: Vec3,
    pub size: f32,
    /// Rotation around the normal, radians.
    pub rot_around_normal: f32,
    /// Index of the decal's datablock.
    pub data_index: u32,
    pub render_priority: u8,
    /// Creation time in milliseconds.
    pub create_time: u32,
    pub flags: DecalFlags,
    pub(crate) sphere: Option<usize>,
}

impl DecalInstance {
    pub fn new(position: Vec3, normal: Vec3, tangent: Vec3, size: f32) -> Self {
        Self {
            position,
            normal,
            tangent,
            size,
            rot_around_normal: 0.0,
            data_index: 0,
            render_priority: 0,
            create_time: 0,
            flags: DecalFlags::empty(),
            sphere: None,
        }
    }

    /// Decal at `position` facing up.
    pub fn at(position: Vec3, size: f32) -> Self {
        Self::new(position, Vec3::Z, Vec3::X, size)
    }

    pub fn with_data_index(mut self, data_index: u32) -> Self {
        self.data_index = data_index;
        self
    }

    pub fn with_flags(mut self, flags: DecalFlags) -> Self {
        self.flags = flags;
        self
    }

    /// World box: a cube of edge `size` around the position.
    pub fn world_box(&self) -> Aabb {
        Aabb::from_center_half_extent(self.position, self.size * 0.5)
    }

    /// Index of the sphere holding this decal, if placed.
    pub fn sphere_index(&self) -> Option<usize> {
        self.sphere
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn world_box_spans_size() {
        let d = DecalInstance::at(Vec3::new(1.0, 2.0, 3.0), 4.0);
        let b = d.world_box();
        assert_eq!(b.min, Vec3::new(-1.0, 0.0, 1.0));
        assert_eq!(b.max, Vec3::new(3.0, 4.0, 5.0));
    }

    #[test]
    fn builder_sets_fields() {
        let d = DecalInstance::at(Vec3::ZERO, 1.0)
            .with_data_index(3)
            .with_flags(DecalFlags::SAVE | DecalFlags::PERMANENT);
        assert_eq!(d.data_index, 3);
        assert!(d.flags.contains(DecalFlags::SAVE));
        assert_eq!(d.sphere_index(), None);
    }
}
