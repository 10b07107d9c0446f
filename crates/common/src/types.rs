use serde::{Deserialize, Serialize};

/// Identifier of a portal-connected zone in the scene graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u32);

/// Identifier of a scene object known to the collision and constraint services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u32);

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn zone_ids_order_numerically() {
        let set: BTreeSet<ZoneId> = [ZoneId(3), ZoneId(1), ZoneId(2)].into_iter().collect();
        let ordered: Vec<u32> = set.into_iter().map(|z| z.0).collect();
        assert_eq!(ordered, vec![1, 2, 3]);
    }

    #[test]
    fn object_id_equality() {
        assert_eq!(ObjectId(7), ObjectId(7));
        assert_ne!(ObjectId(7), ObjectId(8));
    }
}
