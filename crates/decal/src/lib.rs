//! Decal indexing: spheres of nearby decals, zone lookup and culling.
//!
//! # Invariants
//! - The arena owns every decal; spheres and callers hold [`DecalId`]s.
//! - A sphere's zone list is lazily computed. Empty means "not computed"
//!   (or a single-zone scene), never "in no zone".
//! - Failing to fit a decal into a sphere is the normal signal to try the
//!   next one, not an error.

mod file;
mod instance;
mod sphere;
mod store;

pub use file::{DecalFileError, DecalRecord, FILE_VERSION};
pub use instance::{DecalArena, DecalFlags, DecalId, DecalInstance};
pub use sphere::DecalSphere;
pub use store::{BoundsMode, DecalStore, DecalStoreConfig};

pub fn crate_info() -> &'static str {
    "torque-decal v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("decal"));
    }
}
