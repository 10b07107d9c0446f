use glam::Vec3;
use torque_common::{Aabb, SceneQuery, Sphere, ZoneId};

use crate::instance::{DecalArena, DecalId};
use crate::store::{BoundsMode, DecalStoreConfig};

/// Extra radius added when testing whether a decal grows the sphere.
const GROWTH_PADDING: f32 = 0.5;

/// A bounding sphere owning a set of nearby decals.
///
/// The sphere only grows when an accepted decal pokes out of it; removing
/// decals never shrinks it. Zones are cached until the next growth.
#[derive(Debug, Clone)]
pub struct DecalSphere {
    world_sphere: Sphere,
    items: Vec<DecalId>,
    zones: Vec<ZoneId>,
}

impl DecalSphere {
    /// Empty sphere seeded at `center`.
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self {
            world_sphere: Sphere::new(center, radius),
            items: Vec::new(),
            zones: Vec::new(),
        }
    }

    pub fn world_sphere(&self) -> &Sphere {
        &self.world_sphere
    }

    pub fn items(&self) -> &[DecalId] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, id: DecalId) -> bool {
        self.items.contains(&id)
    }

    /// Cached zones. Empty means "not computed" or "single-zone scene".
    pub fn zones(&self) -> &[ZoneId] {
        &self.zones
    }

    pub fn needs_zoning(&self) -> bool {
        self.zones.is_empty()
    }

    /// Try to take ownership of decal `id`.
    ///
    /// Rejects decals farther than the distance tolerance and decals that
    /// would grow the sphere past the radius tolerance. Returns `false`
    /// without touching the sphere in both cases.
    pub fn try_add_item(
        &mut self,
        id: DecalId,
        decals: &DecalArena,
        config: &DecalStoreConfig,
    ) -> bool {
        let Some(decal) = decals.get(id) else {
            return false;
        };
        let half_size = decal.size * 0.5;
        let dist_center_to_center = self.world_sphere.center.distance(decal.position);
        let dist_bounds_to_center = dist_center_to_center - half_size;
        if dist_bounds_to_center > config.distance_tolerance {
            return false;
        }

        let new_radius = dist_center_to_center + half_size + GROWTH_PADDING;
        if new_radius > self.world_sphere.radius && new_radius > config.radius_tolerance {
            return false;
        }

        self.items.push(id);
        if new_radius > self.world_sphere.radius {
            self.update_world_sphere(decals, config.bounds_mode);
        }
        true
    }

    /// Add a decal without any tolerance test. Used when seeding a fresh sphere.
    pub(crate) fn force_add_item(&mut self, id: DecalId) {
        self.items.push(id);
    }

    /// Drop decal `id` from the sphere. Bounds are left as they are.
    pub fn remove_item(&mut self, id: DecalId) -> bool {
        match self.items.iter().position(|&i| i == id) {
            Some(idx) => {
                self.items.swap_remove(idx);
                true
            }
            None => false,
        }
    }

    /// Recompute the sphere from the boxes of all contained decals and
    /// invalidate the zone cache.
    pub fn update_world_sphere(&mut self, decals: &DecalArena, mode: BoundsMode) {
        let mut boxes = self
            .items
            .iter()
            .filter_map(|id| decals.get(*id))
            .map(|d| d.world_box());
        let Some(first) = boxes.next() else {
            return;
        };
        let bounds: Aabb = match mode {
            BoundsMode::Union => boxes.fold(first, |acc, b| acc.union(&b)),
            BoundsMode::Intersection => boxes.fold(first, |acc, b| acc.intersection(&b)),
        };
        if !bounds.is_valid() {
            tracing::warn!(
                items = self.items.len(),
                "decal sphere bounds are inverted; sphere may not contain its decals"
            );
        }
        self.world_sphere = bounds.bounding_sphere();
        self.zones.clear();
    }

    /// Refresh the zone cache from the scene.
    pub fn update_zoning(&mut self, scene: &dyn SceneQuery) {
        self.zones.clear();
        if scene.num_zones() == 1 {
            return;
        }
        let bounds = self.world_sphere.to_aabb();
        self.zones = scene.find_zones(&bounds);
        self.zones.sort_unstable();
        self.zones.dedup();
        tracing::trace!(zones = self.zones.len(), "decal sphere zoned");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DecalInstance;

    struct Zones {
        count: u32,
        cell: f32,
    }

    impl Zones {
        fn new(count: u32, cell: f32) -> Self {
            Self { count, cell }
        }
    }

    // Zones are slabs of `cell` width along X.
    impl SceneQuery for Zones {
        fn num_zones(&self) -> u32 {
            self.count
        }

        fn find_zones(&self, bounds: &Aabb) -> Vec<ZoneId> {
            let lo = (bounds.min.x / self.cell).floor().max(0.0) as u32;
            let hi = ((bounds.max.x / self.cell).floor().max(0.0) as u32).min(self.count - 1);
            (lo..=hi).map(ZoneId).collect()
        }
    }

    fn seeded(decals: &mut DecalArena, pos: Vec3, size: f32) -> DecalSphere {
        let id = decals.insert(DecalInstance::at(pos, size));
        let mut s = DecalSphere::new(pos, size * 0.5);
        s.force_add_item(id);
        s
    }

    #[test]
    fn accepts_nearby_item() {
        let config = DecalStoreConfig::default();
        let mut decals = DecalArena::with_key();
        let mut s = seeded(&mut decals, Vec3::ZERO, 1.0);
        let id = decals.insert(DecalInstance::at(Vec3::new(5.0, 0.0, 0.0), 1.0));
        assert!(s.try_add_item(id, &decals, &config));
        assert!(s.contains(id));
        assert!(s.world_sphere().contains_point(Vec3::new(5.0, 0.0, 0.0)));
    }

    #[test]
    fn rejects_distant_item_without_mutation() {
        let config = DecalStoreConfig::default();
        let mut decals = DecalArena::with_key();
        let mut s = seeded(&mut decals, Vec3::ZERO, 1.0);
        let before = *s.world_sphere();
        let id = decals.insert(DecalInstance::at(Vec3::new(31.0, 0.0, 0.0), 1.0));
        assert!(!s.try_add_item(id, &decals, &config));
        assert_eq!(s.len(), 1);
        assert_eq!(*s.world_sphere(), before);
    }

    #[test]
    fn rejects_growth_past_radius_tolerance() {
        let config = DecalStoreConfig {
            distance_tolerance: 30.0,
            radius_tolerance: 10.0,
            ..DecalStoreConfig::default()
        };
        let mut decals = DecalArena::with_key();
        let mut s = seeded(&mut decals, Vec3::ZERO, 1.0);
        // within distance tolerance, but new radius 20.5 + 0.5 > 10
        let id = decals.insert(DecalInstance::at(Vec3::new(20.0, 0.0, 0.0), 1.0));
        assert!(!s.try_add_item(id, &decals, &config));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn item_inside_radius_does_not_regrow() {
        let config = DecalStoreConfig::default();
        let mut decals = DecalArena::with_key();
        let id0 = decals.insert(DecalInstance::at(Vec3::ZERO, 1.0));
        let mut s = DecalSphere::new(Vec3::ZERO, 50.0);
        s.force_add_item(id0);
        s.zones.push(ZoneId(4));
        // new radius 45.5 exceeds the tolerance but not the current radius
        let id = decals.insert(DecalInstance::at(Vec3::new(0.0, 25.0, 0.0), 40.0));
        assert!(s.try_add_item(id, &decals, &config));
        assert_eq!(s.world_sphere().radius, 50.0);
        assert_eq!(s.zones(), &[ZoneId(4)]);
    }

    #[test]
    fn growth_clears_zone_cache() {
        let config = DecalStoreConfig::default();
        let mut decals = DecalArena::with_key();
        let mut s = seeded(&mut decals, Vec3::ZERO, 1.0);
        s.zones.push(ZoneId(1));
        let id = decals.insert(DecalInstance::at(Vec3::new(3.0, 0.0, 0.0), 1.0));
        assert!(s.try_add_item(id, &decals, &config));
        assert!(s.needs_zoning());
    }

    #[test]
    fn intersection_mode_degenerates_on_disjoint_items() {
        let config = DecalStoreConfig {
            bounds_mode: BoundsMode::Intersection,
            ..DecalStoreConfig::default()
        };
        let mut decals = DecalArena::with_key();
        let mut s = seeded(&mut decals, Vec3::ZERO, 1.0);
        let far = Vec3::new(10.0, 0.0, 0.0);
        let id = decals.insert(DecalInstance::at(far, 1.0));
        assert!(s.try_add_item(id, &decals, &config));
        // the intersected box does not reach either decal
        assert!(!s.world_sphere().contains_point(far));
    }

    #[test]
    fn zoning_single_zone_scene_stays_empty() {
        let mut decals = DecalArena::with_key();
        let mut s = seeded(&mut decals, Vec3::ZERO, 1.0);
        s.update_zoning(&Zones::new(1, 10.0));
        assert!(s.zones().is_empty());
    }

    #[test]
    fn zoning_is_idempotent() {
        let mut decals = DecalArena::with_key();
        let mut s = seeded(&mut decals, Vec3::new(10.0, 0.0, 0.0), 4.0);
        let scene = Zones::new(4, 10.0);
        s.update_zoning(&scene);
        let first = s.zones().to_vec();
        s.update_zoning(&scene);
        assert_eq!(first, s.zones());
        assert_eq!(first, vec![ZoneId(0), ZoneId(1)]);
    }

    #[test]
    fn remove_item_keeps_bounds() {
        let mut decals = DecalArena::with_key();
        let id = decals.insert(DecalInstance::at(Vec3::ZERO, 2.0));
        let mut s = DecalSphere::new(Vec3::ZERO, 1.0);
        s.force_add_item(id);
        assert!(s.remove_item(id));
        assert!(!s.remove_item(id));
        assert!(s.is_empty());
        assert_eq!(s.world_sphere().radius, 1.0);
    }
}
