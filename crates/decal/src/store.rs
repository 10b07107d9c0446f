use glam::Vec3;
use serde::{Deserialize, Serialize};
use torque_common::{SceneQuery, Sphere, ZoneId};

use crate::instance::{DecalArena, DecalId, DecalInstance};
use crate::sphere::DecalSphere;

/// How a sphere recomputes its bounds after growing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundsMode {
    /// Bound the union of all decal boxes.
    #[default]
    Union,
    /// Bound the intersection of all decal boxes. Matches the legacy decal
    /// files; degenerates when decals do not overlap.
    Intersection,
}

/// Tuning for sphere membership and arena growth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecalStoreConfig {
    /// Farthest a decal's bounds may sit from a sphere's center.
    pub distance_tolerance: f32,
    /// Largest radius a sphere may grow to.
    pub radius_tolerance: f32,
    pub bounds_mode: BoundsMode,
    /// Arena capacity is reserved in blocks of this many decals.
    pub chunk_size: usize,
}

impl Default for DecalStoreConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: 30.0,
            radius_tolerance: 40.0,
            bounds_mode: BoundsMode::Union,
            chunk_size: 256,
        }
    }
}

/// Owns every decal and the spheres that group them.
///
/// New decals try the sphere that accepted the previous decal first, then
/// every other sphere, then get a sphere of their own. Emptied spheres are
/// kept around until [`rebuild`](Self::rebuild) or [`clear`](Self::clear).
#[derive(Debug)]
pub struct DecalStore {
    config: DecalStoreConfig,
    decals: DecalArena,
    spheres: Vec<DecalSphere>,
    last_sphere: Option<usize>,
    dirty: bool,
}

impl DecalStore {
    pub fn new(config: DecalStoreConfig) -> Self {
        Self {
            config,
            decals: DecalArena::with_key(),
            spheres: Vec::new(),
            last_sphere: None,
            dirty: false,
        }
    }

    pub fn config(&self) -> &DecalStoreConfig {
        &self.config
    }

    /// Insert a decal and place it into a sphere.
    pub fn add_decal(&mut self, decal: DecalInstance) -> DecalId {
        if self.decals.len() == self.decals.capacity() {
            self.decals.reserve(self.config.chunk_size.max(1));
        }
        let id = self.decals.insert(decal);
        self.place(id);
        self.dirty = true;
        id
    }

    fn place(&mut self, id: DecalId) {
        if let Some(idx) = self.last_sphere
            && self.spheres[idx].try_add_item(id, &self.decals, &self.config)
        {
            self.decals[id].sphere = Some(idx);
            return;
        }

        for idx in 0..self.spheres.len() {
            if Some(idx) == self.last_sphere {
                continue;
            }
            if self.spheres[idx].try_add_item(id, &self.decals, &self.config) {
                self.decals[id].sphere = Some(idx);
                self.last_sphere = Some(idx);
                return;
            }
        }

        let decal = &self.decals[id];
        let mut sphere = DecalSphere::new(decal.position, decal.size * 0.5);
        sphere.force_add_item(id);
        let idx = self.spheres.len();
        self.spheres.push(sphere);
        self.decals[id].sphere = Some(idx);
        self.last_sphere = Some(idx);
        tracing::debug!(sphere = idx, "created decal sphere");
    }

    /// Remove a decal. Its sphere stays even when emptied.
    pub fn remove_decal(&mut self, id: DecalId) -> Option<DecalInstance> {
        let decal = self.decals.remove(id)?;
        if let Some(idx) = decal.sphere {
            self.spheres[idx].remove_item(id);
        }
        self.dirty = true;
        Some(decal)
    }

    /// Remove every decal created from datablock `data_index`.
    pub fn remove_by_datablock(&mut self, data_index: u32) -> usize {
        let doomed: Vec<DecalId> = self
            .decals
            .iter()
            .filter(|(_, d)| d.data_index == data_index)
            .map(|(id, _)| id)
            .collect();
        for id in &doomed {
            self.remove_decal(*id);
        }
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.decals.clear();
        self.spheres.clear();
        self.last_sphere = None;
        self.dirty = false;
    }

    /// Regroup every decal into fresh spheres, dropping emptied ones.
    pub fn rebuild(&mut self) {
        let _span = tracing::info_span!("decal_rebuild").entered();
        let ids: Vec<DecalId> = self.decals.keys().collect();
        self.spheres.clear();
        self.last_sphere = None;
        for id in ids {
            self.place(id);
        }
        self.dirty = true;
        tracing::debug!(
            decals = self.decals.len(),
            spheres = self.spheres.len(),
            "decal store rebuilt"
        );
    }

    /// Refresh zone caches of all spheres that lack one.
    pub fn update_zoning(&mut self, scene: &dyn SceneQuery) {
        for sphere in &mut self.spheres {
            if !sphere.is_empty() && sphere.needs_zoning() {
                sphere.update_zoning(scene);
            }
        }
    }

    /// Decals whose boxes overlap `view`. Empty spheres are skipped.
    pub fn cull(&self, view: &Sphere) -> Vec<DecalId> {
        let mut visible = Vec::new();
        for sphere in &self.spheres {
            if sphere.is_empty() || !sphere.world_sphere().overlaps_sphere(view) {
                continue;
            }
            for &id in sphere.items() {
                let Some(decal) = self.decals.get(id) else {
                    continue;
                };
                if view.overlaps_aabb(&decal.world_box()) {
                    visible.push(id);
                }
            }
        }
        visible
    }

    /// Decals in spheres overlapping `zone`.
    ///
    /// Spheres without a zone list (not yet zoned, or in a single-zone
    /// scene) are included.
    pub fn decals_in_zone(&self, zone: ZoneId) -> Vec<DecalId> {
        self.spheres
            .iter()
            .filter(|s| s.needs_zoning() || s.zones().contains(&zone))
            .flat_map(|s| s.items().iter().copied())
            .collect()
    }

    /// Nearest decal to `point` within `max_distance`.
    pub fn nearest(&self, point: Vec3, max_distance: f32) -> Option<DecalId> {
        let query = Sphere::new(point, max_distance);
        self.cull(&query)
            .into_iter()
            .filter_map(|id| Some((id, self.decals.get(id)?.position.distance_squared(point))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(id, _)| id)
    }

    pub fn get(&self, id: DecalId) -> Option<&DecalInstance> {
        self.decals.get(id)
    }

    /// Mutable access for non-spatial fields. Moving a decal requires a
    /// remove and re-add.
    pub fn get_mut(&mut self, id: DecalId) -> Option<&mut DecalInstance> {
        self.dirty = true;
        self.decals.get_mut(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DecalId, &DecalInstance)> {
        self.decals.iter()
    }

    pub fn len(&self) -> usize {
        self.decals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decals.is_empty()
    }

    pub fn spheres(&self) -> &[DecalSphere] {
        &self.spheres
    }

    pub fn sphere_count(&self) -> usize {
        self.spheres.len()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl Default for DecalStore {
    fn default() -> Self {
        Self::new(DecalStoreConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use torque_common::{Aabb, RandomSource, SplitMix64};

    fn cluster(
        store: &mut DecalStore,
        rng: &mut SplitMix64,
        center: Vec3,
        radius: f32,
        count: usize,
    ) -> Vec<DecalId> {
        (0..count)
            .map(|_| {
                let v = Vec3::new(rng.signed_unit(), rng.signed_unit(), rng.signed_unit());
                let pos = center + v.normalize_or_zero() * rng.range(0.0, radius);
                store.add_decal(DecalInstance::at(pos, 1.0))
            })
            .collect()
    }

    #[test]
    fn debug_output_names_the_store() {
        let mut store = DecalStore::default();
        store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        let text = format!("{store:?}");
        assert!(text.starts_with("DecalStore"));
        assert!(text.contains("last_sphere: Some(0)"));
    }

    #[test]
    fn clustered_decals_share_one_sphere() {
        let mut store = DecalStore::default();
        let mut rng = SplitMix64::new(42);
        cluster(&mut store, &mut rng, Vec3::ZERO, 10.0, 100);
        assert_eq!(store.len(), 100);
        assert_eq!(store.sphere_count(), 1);
        assert_eq!(store.spheres()[0].len(), 100);
    }

    #[test]
    fn separated_clusters_get_separate_spheres() {
        let mut store = DecalStore::default();
        let mut rng = SplitMix64::new(7);
        cluster(&mut store, &mut rng, Vec3::ZERO, 10.0, 50);
        cluster(&mut store, &mut rng, Vec3::new(200.0, 0.0, 0.0), 10.0, 50);
        assert_eq!(store.sphere_count(), 2);
    }

    #[test]
    fn returning_to_old_cluster_reuses_its_sphere() {
        let mut store = DecalStore::default();
        let a = store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        store.add_decal(DecalInstance::at(Vec3::new(500.0, 0.0, 0.0), 1.0));
        let c = store.add_decal(DecalInstance::at(Vec3::new(1.0, 0.0, 0.0), 1.0));
        assert_eq!(store.sphere_count(), 2);
        let sphere_of = |id| store.get(id).unwrap().sphere_index();
        assert_eq!(sphere_of(a), sphere_of(c));
    }

    #[test]
    fn remove_keeps_empty_sphere_and_marks_dirty() {
        let mut store = DecalStore::default();
        let id = store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        store.clear_dirty();
        let removed = store.remove_decal(id).unwrap();
        assert_eq!(removed.position, Vec3::ZERO);
        assert!(store.is_dirty());
        assert_eq!(store.sphere_count(), 1);
        assert!(store.spheres()[0].is_empty());
        assert!(store.remove_decal(id).is_none());
    }

    #[test]
    fn rebuild_drops_empty_spheres() {
        let mut store = DecalStore::default();
        let a = store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        store.add_decal(DecalInstance::at(Vec3::new(500.0, 0.0, 0.0), 1.0));
        store.remove_decal(a);
        store.rebuild();
        assert_eq!(store.sphere_count(), 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_resets_everything() {
        let mut store = DecalStore::default();
        store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        store.clear();
        assert!(store.is_empty());
        assert_eq!(store.sphere_count(), 0);
        assert!(!store.is_dirty());
        // first insert after clear seeds a new sphere
        store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        assert_eq!(store.sphere_count(), 1);
    }

    #[test]
    fn cull_returns_only_overlapping_decals() {
        let mut store = DecalStore::default();
        let near = store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        let also_near = store.add_decal(DecalInstance::at(Vec3::new(2.0, 0.0, 0.0), 1.0));
        let far = store.add_decal(DecalInstance::at(Vec3::new(300.0, 0.0, 0.0), 1.0));
        let visible = store.cull(&Sphere::new(Vec3::ZERO, 1.0));
        assert!(visible.contains(&near));
        assert!(!visible.contains(&also_near));
        assert!(!visible.contains(&far));
    }

    #[test]
    fn nearest_picks_closest() {
        let mut store = DecalStore::default();
        store.add_decal(DecalInstance::at(Vec3::new(5.0, 0.0, 0.0), 1.0));
        let close = store.add_decal(DecalInstance::at(Vec3::new(1.0, 0.0, 0.0), 1.0));
        assert_eq!(store.nearest(Vec3::ZERO, 10.0), Some(close));
        assert_eq!(store.nearest(Vec3::new(100.0, 0.0, 0.0), 1.0), None);
    }

    #[test]
    fn remove_by_datablock_only_hits_matching() {
        let mut store = DecalStore::default();
        store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0).with_data_index(1));
        store.add_decal(DecalInstance::at(Vec3::X, 1.0).with_data_index(2));
        store.add_decal(DecalInstance::at(Vec3::Y, 1.0).with_data_index(1));
        assert_eq!(store.remove_by_datablock(1), 2);
        assert_eq!(store.len(), 1);
    }

    struct TwoZones;

    impl SceneQuery for TwoZones {
        fn num_zones(&self) -> u32 {
            2
        }

        fn find_zones(&self, bounds: &Aabb) -> Vec<ZoneId> {
            if bounds.center().x < 100.0 {
                vec![ZoneId(0)]
            } else {
                vec![ZoneId(1)]
            }
        }
    }

    #[test]
    fn zone_lookup_after_zoning() {
        let mut store = DecalStore::default();
        let west = store.add_decal(DecalInstance::at(Vec3::ZERO, 1.0));
        let east = store.add_decal(DecalInstance::at(Vec3::new(300.0, 0.0, 0.0), 1.0));
        store.update_zoning(&TwoZones);
        assert_eq!(store.decals_in_zone(ZoneId(0)), vec![west]);
        assert_eq!(store.decals_in_zone(ZoneId(1)), vec![east]);
    }
}
