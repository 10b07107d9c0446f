//! Shared types for the decal index and the effect pipeline.
//!
//! Everything the two subsystems consume from the rest of the engine lives
//! here as a trait: zone queries, ray casts and random numbers. The engine
//! supplies real implementations; tests supply small fakes.

mod bounds;
mod random;
mod scene;
mod types;

pub use bounds::{Aabb, Sphere};
pub use random::{RandomSource, SplitMix64};
pub use scene::{CollisionQuery, RayHit, SceneQuery, TypeMask};
pub use types::{ObjectId, ZoneId};

pub fn crate_info() -> &'static str {
    "torque-common v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("common"));
    }
}
