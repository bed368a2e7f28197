//! Unit quaternion for 3D rotations

use bytemuck::{Pod, Zeroable};
use serde::{Serialize, Deserialize};
use crate::Vec3;

/// Rotation quaternion `w + xi + yj + zk`
///
/// Constructors produce unit quaternions; [`Quat::normalized`] restores unit
/// length after accumulating many multiplications.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Quat {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Quat {
    /// Identity rotation
    pub const IDENTITY: Self = Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 };

    /// Create a quaternion from raw components (not normalized)
    #[inline]
    pub const fn from_xyzw(x: f32, y: f32, z: f32, w: f32) -> Self {
        Self { x, y, z, w }
    }

    /// Rotation of `angle` radians around `axis`
    pub fn from_axis_angle(axis: Vec3, angle: f32) -> Self {
        let axis = axis.normalized();
        let (sin, cos) = (angle * 0.5).sin_cos();
        Self::from_xyzw(axis.x * sin, axis.y * sin, axis.z * sin, cos)
    }

    /// Rotation around the X axis
    pub fn from_rotation_x(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::X, angle)
    }

    /// Rotation around the Y axis
    pub fn from_rotation_y(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::Y, angle)
    }

    /// Rotation around the Z axis
    pub fn from_rotation_z(angle: f32) -> Self {
        Self::from_axis_angle(Vec3::Z, angle)
    }

    /// Squared norm
    #[inline]
    pub fn length_squared(self) -> f32 {
        self.x * self.x + self.y * self.y + self.z * self.z + self.w * self.w
    }

    /// Scale back to unit length (identity for a zero quaternion)
    pub fn normalized(self) -> Self {
        let len = self.length_squared().sqrt();
        if len > 0.0 {
            let inv = 1.0 / len;
            Self::from_xyzw(self.x * inv, self.y * inv, self.z * inv, self.w * inv)
        } else {
            Self::IDENTITY
        }
    }

    /// Inverse rotation for a unit quaternion
    #[inline]
    pub fn conjugate(self) -> Self {
        Self::from_xyzw(-self.x, -self.y, -self.z, self.w)
    }

    /// Rotate a vector
    pub fn rotate(self, v: Vec3) -> Vec3 {
        let q = Vec3::new(self.x, self.y, self.z);
        let t = q.cross(v) * 2.0;
        v + t * self.w + q.cross(t)
    }
}

/// Hamilton product: `a * b` applies `b` first, then `a`
impl std::ops::Mul for Quat {
    type Output = Self;

    fn mul(self, b: Self) -> Self {
        let a = self;
        Self::from_xyzw(
            a.w * b.x + a.x * b.w + a.y * b.z - a.z * b.y,
            a.w * b.y - a.x * b.z + a.y * b.w + a.z * b.x,
            a.w * b.z + a.x * b.y - a.y * b.x + a.z * b.w,
            a.w * b.w - a.x * b.x - a.y * b.y - a.z * b.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPSILON: f32 = 0.0001;

    fn vec_approx_eq(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    #[test]
    fn test_identity_rotation() {
        let v = Vec3::new(1.0, 2.0, 3.0);
        assert!(vec_approx_eq(Quat::IDENTITY.rotate(v), v));
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let q = Quat::from_rotation_z(FRAC_PI_2);
        let result = q.rotate(Vec3::X);
        assert!(vec_approx_eq(result, Vec3::Y), "X should become Y, got {:?}", result);
    }

    #[test]
    fn test_composition() {
        let q = Quat::from_rotation_y(FRAC_PI_2 / 2.0);
        let composed = q * q;
        let direct = Quat::from_rotation_y(FRAC_PI_2);
        let v = Vec3::new(1.0, 0.5, -2.0);
        assert!(vec_approx_eq(composed.rotate(v), direct.rotate(v)));
    }

    #[test]
    fn test_conjugate_undoes_rotation() {
        let q = Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0), 0.7);
        let v = Vec3::new(0.3, -1.0, 2.0);
        assert!(vec_approx_eq(q.conjugate().rotate(q.rotate(v)), v));
    }

    #[test]
    fn test_normalized() {
        let q = Quat::from_xyzw(0.0, 0.0, 2.0, 2.0).normalized();
        assert!((q.length_squared() - 1.0).abs() < EPSILON);
        assert_eq!(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0).normalized(), Quat::IDENTITY);
    }
}
