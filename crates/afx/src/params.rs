use glam::{Mat3, Mat4, Quat, Vec3, Vec4};

/// The values a modifier pipeline reads and writes for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct XfmParams {
    pub pos: Vec3,
    pub ori: Quat,
    /// Secondary position, usually the aim point.
    pub pos2: Vec3,
    pub scale: Vec3,
    pub color: Vec4,
    pub vis: f32,
}

impl Default for XfmParams {
    fn default() -> Self {
        Self {
            pos: Vec3::ZERO,
            ori: Quat::IDENTITY,
            pos2: Vec3::ZERO,
            scale: Vec3::ONE,
            color: Vec4::ONE,
            vis: 1.0,
        }
    }
}

impl XfmParams {
    pub fn at(pos: Vec3) -> Self {
        Self {
            pos,
            pos2: pos,
            ..Self::default()
        }
    }

    pub fn transform(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.ori, self.pos)
    }

    /// Forward axis (+Y) in world space.
    pub fn forward(&self) -> Vec3 {
        self.ori * Vec3::Y
    }
}

/// Rotation whose +Y axis points along `dir` with +Z kept as close to up
/// as possible. Returns `None` for a zero direction.
pub fn look_rotation(dir: Vec3) -> Option<Quat> {
    let forward = dir.try_normalize()?;
    let right = forward.cross(Vec3::Z).try_normalize().unwrap_or(Vec3::X);
    let up = right.cross(forward);
    Some(Quat::from_mat3(&Mat3::from_cols(right, forward, up)).normalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_neutral() {
        let p = XfmParams::default();
        assert_eq!(p.scale, Vec3::ONE);
        assert_eq!(p.vis, 1.0);
        assert_eq!(p.transform(), Mat4::IDENTITY);
        assert_eq!(p.forward(), Vec3::Y);
    }

    #[test]
    fn look_rotation_points_forward_axis() {
        let q = look_rotation(Vec3::new(1.0, 0.0, 0.0)).unwrap();
        assert!((q * Vec3::Y).abs_diff_eq(Vec3::X, 1e-5));
        assert!((q * Vec3::Z).abs_diff_eq(Vec3::Z, 1e-5));

        let q = look_rotation(Vec3::new(0.0, 3.0, 4.0)).unwrap();
        assert!((q * Vec3::Y).abs_diff_eq(Vec3::new(0.0, 0.6, 0.8), 1e-5));
    }

    #[test]
    fn look_rotation_handles_vertical_and_zero() {
        let q = look_rotation(Vec3::Z).unwrap();
        assert!((q * Vec3::Y).abs_diff_eq(Vec3::Z, 1e-5));
        assert!(look_rotation(Vec3::ZERO).is_none());
    }
}
