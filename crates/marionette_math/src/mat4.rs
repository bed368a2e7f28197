//! 4x4 Matrix utilities for affine transforms
//!
//! Matrices are column-major: `m[col][row]`. The translation lives in
//! column 3, matching what GPU uniform buffers expect.

use crate::{Quat, Vec3};

/// 4x4 matrix type (column-major)
pub type Mat4 = [[f32; 4]; 4];

/// Identity matrix
pub const IDENTITY: Mat4 = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// Translation matrix
pub fn from_translation(t: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[3][0] = t.x;
    m[3][1] = t.y;
    m[3][2] = t.z;
    m
}

/// Non-uniform scale matrix
pub fn from_scale(s: Vec3) -> Mat4 {
    let mut m = IDENTITY;
    m[0][0] = s.x;
    m[1][1] = s.y;
    m[2][2] = s.z;
    m
}

/// Rotation matrix from a unit quaternion
pub fn from_rotation(q: Quat) -> Mat4 {
    let (x2, y2, z2) = (q.x + q.x, q.y + q.y, q.z + q.z);
    let (xx, yy, zz) = (q.x * x2, q.y * y2, q.z * z2);
    let (xy, xz, yz) = (q.x * y2, q.x * z2, q.y * z2);
    let (wx, wy, wz) = (q.w * x2, q.w * y2, q.w * z2);

    [
        [1.0 - (yy + zz), xy + wz, xz - wy, 0.0],
        [xy - wz, 1.0 - (xx + zz), yz + wx, 0.0],
        [xz + wy, yz - wx, 1.0 - (xx + yy), 0.0],
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// Compose `translation * rotation * scale` without the intermediate products
pub fn compose(translation: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    let mut m = from_rotation(rotation);
    let s = [scale.x, scale.y, scale.z];
    for (col, factor) in s.iter().enumerate() {
        for row in 0..3 {
            m[col][row] *= factor;
        }
    }
    m[3][0] = translation.x;
    m[3][1] = translation.y;
    m[3][2] = translation.z;
    m
}

/// Multiply two 4x4 matrices: result = a * b
///
/// In column-major convention, this applies b first, then a.
#[allow(clippy::needless_range_loop)]
pub fn mul(a: Mat4, b: Mat4) -> Mat4 {
    let mut result = [[0.0f32; 4]; 4];

    for i in 0..4 {
        for j in 0..4 {
            for k in 0..4 {
                result[i][j] += a[k][j] * b[i][k];
            }
        }
    }

    result
}

/// Transform a point (w = 1) by an affine matrix
pub fn transform_point(m: Mat4, p: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * p.x + m[1][0] * p.y + m[2][0] * p.z + m[3][0],
        m[0][1] * p.x + m[1][1] * p.y + m[2][1] * p.z + m[3][1],
        m[0][2] * p.x + m[1][2] * p.y + m[2][2] * p.z + m[3][2],
    )
}

/// Translation part of an affine matrix
pub fn get_translation(m: Mat4) -> Vec3 {
    Vec3::new(m[3][0], m[3][1], m[3][2])
}

/// Transpose a matrix
pub fn transpose(m: Mat4) -> Mat4 {
    [
        [m[0][0], m[1][0], m[2][0], m[3][0]],
        [m[0][1], m[1][1], m[2][1], m[3][1]],
        [m[0][2], m[1][2], m[2][2], m[3][2]],
        [m[0][3], m[1][3], m[2][3], m[3][3]],
    ]
}

/// Element-wise comparison within `epsilon`
pub fn approx_eq(a: Mat4, b: Mat4, epsilon: f32) -> bool {
    a.iter()
        .flatten()
        .zip(b.iter().flatten())
        .all(|(x, y)| (x - y).abs() < epsilon)
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
    fn test_identity() {
        let p = Vec3::new(1.0, 2.0, 3.0);
        assert!(vec_approx_eq(transform_point(IDENTITY, p), p));
    }

    #[test]
    fn test_translation() {
        let m = from_translation(Vec3::new(1.0, -2.0, 3.0));
        let result = transform_point(m, Vec3::ONE);
        assert!(vec_approx_eq(result, Vec3::new(2.0, -1.0, 4.0)));
        assert_eq!(get_translation(m), Vec3::new(1.0, -2.0, 3.0));
    }

    #[test]
    fn test_rotation_matches_quaternion() {
        let q = Quat::from_axis_angle(Vec3::new(0.2, 1.0, -0.4), 1.1);
        let v = Vec3::new(0.5, -1.5, 2.0);
        assert!(vec_approx_eq(transform_point(from_rotation(q), v), q.rotate(v)));
    }

    #[test]
    fn test_compose_equals_product() {
        let t = Vec3::new(4.0, 5.0, 6.0);
        let r = Quat::from_rotation_z(FRAC_PI_2);
        let s = Vec3::new(2.0, 3.0, 4.0);

        let composed = compose(t, r, s);
        let product = mul(from_translation(t), mul(from_rotation(r), from_scale(s)));
        assert!(approx_eq(composed, product, EPSILON));

        // Scale first, then rotate X->Y, then translate
        let result = transform_point(composed, Vec3::X);
        assert!(vec_approx_eq(result, Vec3::new(4.0, 7.0, 6.0)), "got {:?}", result);
    }

    #[test]
    fn test_mul_identity() {
        let a = compose(Vec3::ONE, Quat::from_rotation_x(0.5), Vec3::splat(2.0));
        assert!(approx_eq(mul(IDENTITY, a), a, EPSILON));
        assert!(approx_eq(mul(a, IDENTITY), a, EPSILON));
    }

    #[test]
    fn test_mul_applies_right_first() {
        let translate = from_translation(Vec3::X);
        let rotate = from_rotation(Quat::from_rotation_z(FRAC_PI_2));

        // Rotate, then translate
        let result = transform_point(mul(translate, rotate), Vec3::X);
        assert!(vec_approx_eq(result, Vec3::new(1.0, 1.0, 0.0)), "got {:?}", result);
    }

    #[test]
    fn test_transpose_roundtrip() {
        let m = compose(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.3), Vec3::ONE);
        assert!(approx_eq(transpose(transpose(m)), m, EPSILON));
        assert_eq!(transpose(m)[0][3], 1.0);
    }
}
