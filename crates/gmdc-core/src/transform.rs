use std::fmt;

use glam::{Quat, Vec3};

/// Rigid transform: rotation followed by translation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self {
            translation,
            rotation,
        }
    }

    /// Returns the transform that applies `child` first and then `parent`.
    pub fn compose(parent: &Transform, child: &Transform) -> Transform {
        Transform {
            translation: parent.rotation * child.translation + parent.translation,
            rotation: parent.rotation * child.rotation,
        }
    }

    pub fn inverse(&self) -> Transform {
        let rotation = self.rotation.inverse();
        Transform {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    /// Rotation only, for directions such as normals.
    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.translation;
        let r = self.rotation;
        write!(
            f,
            "({:.6}, {:.6}, {:.6}) ({:.6}, {:.6}, {:.6}, {:.6})",
            t.x, t.y, t.z, r.x, r.y, r.z, r.w
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-5
    }

    #[test]
    fn test_compose_translations() {
        let parent = Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        let child = Transform::new(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY);
        let abs = Transform::compose(&parent, &child);
        assert!(approx(abs.translation, Vec3::new(1.0, 1.0, 0.0)));
    }

    #[test]
    fn test_compose_applies_parent_rotation_to_child_offset() {
        let parent = Transform::new(Vec3::ZERO, Quat::from_rotation_z(FRAC_PI_2));
        let child = Transform::new(Vec3::new(1.0, 0.0, 0.0), Quat::IDENTITY);
        let abs = Transform::compose(&parent, &child);
        assert!(approx(abs.translation, Vec3::new(0.0, 1.0, 0.0)));
    }

    #[test]
    fn test_inverse_round_trip() {
        let t = Transform::new(
            Vec3::new(1.0, -2.0, 0.5),
            Quat::from_rotation_y(0.3) * Quat::from_rotation_x(-1.1),
        );
        let p = Vec3::new(0.25, 4.0, -3.0);
        let back = t.inverse().transform_point(t.transform_point(p));
        assert!(approx(back, p));
    }
}
