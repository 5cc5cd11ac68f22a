//! Transform component for scene objects.
//!
//! This module provides the [`Transform`] struct for representing the
//! translation, scale, and orientation of scene objects, along with the
//! closed-form matrix evaluations the render systems consume every frame.

use glam::{Mat3, Mat4, Vec3, Vec4};

/// Translation, scale, and Euler orientation of a scene object.
///
/// The rotation field holds Tait-Bryan angles in radians, applied
/// intrinsically in Y (yaw), X (pitch), Z (roll) order. [`Transform::matrix`]
/// and [`Transform::normal_matrix`] expand this convention in closed form
/// rather than composing and inverting full matrices, since they run once per
/// object per frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform {
    /// Position in world space
    pub translation: Vec3,
    /// Per-axis scale factor
    pub scale: Vec3,
    /// Tait-Bryan angles in radians, applied in Y, X, Z order
    pub rotation: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            scale: Vec3::ONE,
            rotation: Vec3::ZERO,
        }
    }
}

impl Transform {
    /// Create an identity transform at the origin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transform with the given translation.
    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.translation = translation;
        self
    }

    /// Create a transform with the given scale.
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Create a transform with the given rotation angles.
    pub fn with_rotation(mut self, rotation: Vec3) -> Self {
        self.rotation = rotation;
        self
    }

    /// Get the model matrix: `Translate * Ry * Rx * Rz * Scale`.
    ///
    /// Equivalent to composing the five matrices in that order, expanded to
    /// avoid four matrix multiplies per object per frame.
    pub fn matrix(&self) -> Mat4 {
        let (s3, c3) = self.rotation.z.sin_cos();
        let (s2, c2) = self.rotation.x.sin_cos();
        let (s1, c1) = self.rotation.y.sin_cos();

        Mat4::from_cols(
            Vec4::new(
                self.scale.x * (c1 * c3 + s1 * s2 * s3),
                self.scale.x * (c2 * s3),
                self.scale.x * (c1 * s2 * s3 - c3 * s1),
                0.0,
            ),
            Vec4::new(
                self.scale.y * (c3 * s1 * s2 - c1 * s3),
                self.scale.y * (c2 * c3),
                self.scale.y * (c1 * c3 * s2 + s1 * s3),
                0.0,
            ),
            Vec4::new(
                self.scale.z * (c2 * s1),
                self.scale.z * (-s2),
                self.scale.z * (c1 * c2),
                0.0,
            ),
            Vec4::new(self.translation.x, self.translation.y, self.translation.z, 1.0),
        )
    }

    /// Get the normal matrix: the inverse transpose of the model matrix's
    /// upper-left 3x3.
    ///
    /// For a rotation composed with a non-uniform scale the inverse transpose
    /// reduces to `Rotation * Scale⁻¹`, which this evaluates directly instead
    /// of inverting a full 4x4. Used to transform normals so lighting stays
    /// correct under non-uniform scaling.
    pub fn normal_matrix(&self) -> Mat3 {
        let (s3, c3) = self.rotation.z.sin_cos();
        let (s2, c2) = self.rotation.x.sin_cos();
        let (s1, c1) = self.rotation.y.sin_cos();
        let inv_scale = self.scale.recip();

        Mat3::from_cols(
            Vec3::new(
                inv_scale.x * (c1 * c3 + s1 * s2 * s3),
                inv_scale.x * (c2 * s3),
                inv_scale.x * (c1 * s2 * s3 - c3 * s1),
            ),
            Vec3::new(
                inv_scale.y * (c3 * s1 * s2 - c1 * s3),
                inv_scale.y * (c2 * c3),
                inv_scale.y * (c1 * c3 * s2 + s1 * s3),
            ),
            Vec3::new(
                inv_scale.z * (c2 * s1),
                inv_scale.z * (-s2),
                inv_scale.z * (c1 * c2),
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq_mat4(a: Mat4, b: Mat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < EPSILON)
    }

    fn approx_eq_mat3(a: Mat3, b: Mat3) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < EPSILON)
    }

    /// The reference composition the closed form must match.
    fn composed(t: &Transform) -> Mat4 {
        Mat4::from_translation(t.translation)
            * Mat4::from_rotation_y(t.rotation.y)
            * Mat4::from_rotation_x(t.rotation.x)
            * Mat4::from_rotation_z(t.rotation.z)
            * Mat4::from_scale(t.scale)
    }

    #[test]
    fn test_default_is_identity() {
        let t = Transform::default();
        assert_eq!(t.matrix(), Mat4::IDENTITY);
        assert_eq!(t.normal_matrix(), Mat3::IDENTITY);
    }

    #[test]
    fn test_builder_methods() {
        let t = Transform::new()
            .with_translation(Vec3::new(1.0, 2.0, 3.0))
            .with_scale(Vec3::splat(2.0))
            .with_rotation(Vec3::new(0.1, 0.2, 0.3));

        assert_eq!(t.translation, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.scale, Vec3::splat(2.0));
        assert_eq!(t.rotation, Vec3::new(0.1, 0.2, 0.3));
    }

    #[test]
    fn test_matrix_translation_only() {
        let t = Transform::new().with_translation(Vec3::new(1.0, -2.0, 3.0));
        let m = t.matrix();

        assert_eq!(m.w_axis, Vec4::new(1.0, -2.0, 3.0, 1.0));
        assert_eq!(
            m.transform_point3(Vec3::ZERO),
            Vec3::new(1.0, -2.0, 3.0)
        );
    }

    #[test]
    fn test_matrix_matches_composition_single_axes() {
        for rotation in [
            Vec3::new(0.7, 0.0, 0.0),
            Vec3::new(0.0, 0.7, 0.0),
            Vec3::new(0.0, 0.0, 0.7),
        ] {
            let t = Transform::new().with_rotation(rotation);
            assert!(
                approx_eq_mat4(t.matrix(), composed(&t)),
                "closed form diverged for rotation {:?}",
                rotation
            );
        }
    }

    #[test]
    fn test_matrix_matches_composition_combined() {
        let t = Transform::new()
            .with_translation(Vec3::new(-0.5, 0.5, 2.0))
            .with_scale(Vec3::new(3.0, 1.5, 3.0))
            .with_rotation(Vec3::new(0.4, 1.1, -0.6));

        assert!(approx_eq_mat4(t.matrix(), composed(&t)));
    }

    #[test]
    fn test_rotation_order_is_y_x_z() {
        // With two axes set the result depends on application order; make
        // sure Y is applied before X.
        let t = Transform::new().with_rotation(Vec3::new(0.5, 0.8, 0.0));
        let yxz = composed(&t);
        let xyz = Mat4::from_rotation_x(0.5) * Mat4::from_rotation_y(0.8);

        assert!(approx_eq_mat4(t.matrix(), yxz));
        assert!(!approx_eq_mat4(t.matrix(), xyz));
    }

    #[test]
    fn test_normal_matrix_is_inverse_transpose() {
        let t = Transform::new()
            .with_translation(Vec3::new(5.0, -1.0, 0.25))
            .with_scale(Vec3::new(2.0, 0.5, 4.0))
            .with_rotation(Vec3::new(0.3, -0.9, 1.2));

        let expected = Mat3::from_mat4(t.matrix()).inverse().transpose();
        assert!(approx_eq_mat3(t.normal_matrix(), expected));
    }

    #[test]
    fn test_normal_matrix_uniform_scale_preserves_direction() {
        let t = Transform::new()
            .with_scale(Vec3::splat(2.0))
            .with_rotation(Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));

        // Uniform scale only rescales normals; direction must follow the
        // rotation. A +Z normal rotated 90 degrees about Y lands on +X.
        let n = t.normal_matrix() * Vec3::Z;
        let dir = n.normalize();
        assert!((dir - Vec3::X).length() < EPSILON, "got {:?}", dir);
    }

    #[test]
    fn test_normal_matrix_ignores_translation() {
        let a = Transform::new().with_rotation(Vec3::new(0.1, 0.2, 0.3));
        let b = Transform {
            translation: Vec3::new(10.0, 20.0, 30.0),
            ..a
        };

        assert_eq!(a.normal_matrix(), b.normal_matrix());
    }
}
