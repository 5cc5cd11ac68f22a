//! Camera with cached projection and view matrices.
//!
//! The world follows Vulkan's clip-space conventions directly: left-handed,
//! +Y pointing down, depth in `0..1`. Because the world itself is Y-down, the
//! projection needs no axis flip.

use glam::{Mat4, Vec3, Vec4};

/// A camera holding the projection, view, and inverse view matrices.
///
/// Matrices are recomputed only when one of the `set_*` methods runs; the
/// accessors return cached values. The inverse view is maintained alongside
/// the view so shaders can read the camera's world position from its last
/// column without a per-frame matrix inversion.
#[derive(Clone, Debug)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inverse_view: Mat4,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
        }
    }
}

impl Camera {
    /// Create a camera with identity matrices.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a perspective projection.
    ///
    /// `fov_y` is the vertical field of view in radians. Depth maps to
    /// `0..1` with `near` at 0.
    pub fn set_perspective_projection(&mut self, fov_y: f32, aspect: f32, near: f32, far: f32) {
        debug_assert!(aspect > f32::EPSILON);
        self.projection = Mat4::perspective_lh(fov_y, aspect, near, far);
    }

    /// Set an orthographic projection spanning the given clip planes.
    ///
    /// `top` is the Y value at the top of the screen, which is smaller than
    /// `bottom` in the Y-down convention.
    pub fn set_orthographic_projection(
        &mut self,
        left: f32,
        right: f32,
        top: f32,
        bottom: f32,
        near: f32,
        far: f32,
    ) {
        self.projection = Mat4::from_cols(
            Vec4::new(2.0 / (right - left), 0.0, 0.0, 0.0),
            Vec4::new(0.0, 2.0 / (bottom - top), 0.0, 0.0),
            Vec4::new(0.0, 0.0, 1.0 / (far - near), 0.0),
            Vec4::new(
                -(right + left) / (right - left),
                -(bottom + top) / (bottom - top),
                -near / (far - near),
                1.0,
            ),
        );
    }

    /// Point the camera at `position` looking along `direction`.
    pub fn set_view_direction(&mut self, position: Vec3, direction: Vec3, up: Vec3) {
        let w = direction.normalize();
        let u = w.cross(up).normalize();
        let v = w.cross(u);
        self.set_view_basis(position, u, v, w);
    }

    /// Point the camera at `position` looking toward `target`.
    pub fn set_view_target(&mut self, position: Vec3, target: Vec3, up: Vec3) {
        self.set_view_direction(position, target - position, up);
    }

    /// Point the camera at `position` with a Y-X-Z Euler orientation.
    ///
    /// Uses the same Tait-Bryan convention as
    /// [`Transform`](crate::Transform), so a camera driven by an object's
    /// transform sees the world consistently with how that object renders.
    pub fn set_view_yxz(&mut self, position: Vec3, rotation: Vec3) {
        let (s3, c3) = rotation.z.sin_cos();
        let (s2, c2) = rotation.x.sin_cos();
        let (s1, c1) = rotation.y.sin_cos();
        let u = Vec3::new(c1 * c3 + s1 * s2 * s3, c2 * s3, c1 * s2 * s3 - c3 * s1);
        let v = Vec3::new(c3 * s1 * s2 - c1 * s3, c2 * c3, c1 * c3 * s2 + s1 * s3);
        let w = Vec3::new(c2 * s1, -s2, c1 * c2);
        self.set_view_basis(position, u, v, w);
    }

    /// Build view and inverse view from an orthonormal camera basis.
    fn set_view_basis(&mut self, position: Vec3, u: Vec3, v: Vec3, w: Vec3) {
        self.view = Mat4::from_cols(
            Vec4::new(u.x, v.x, w.x, 0.0),
            Vec4::new(u.y, v.y, w.y, 0.0),
            Vec4::new(u.z, v.z, w.z, 0.0),
            Vec4::new(-u.dot(position), -v.dot(position), -w.dot(position), 1.0),
        );
        self.inverse_view = Mat4::from_cols(
            u.extend(0.0),
            v.extend(0.0),
            w.extend(0.0),
            position.extend(1.0),
        );
    }

    /// Get the projection matrix.
    #[inline]
    pub fn projection(&self) -> Mat4 {
        self.projection
    }

    /// Get the view matrix.
    #[inline]
    pub fn view(&self) -> Mat4 {
        self.view
    }

    /// Get the inverse view matrix.
    #[inline]
    pub fn inverse_view(&self) -> Mat4 {
        self.inverse_view
    }

    /// Get the camera's world position.
    #[inline]
    pub fn position(&self) -> Vec3 {
        self.inverse_view.w_axis.truncate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-5;

    fn approx_eq_vec3(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < EPSILON
    }

    fn approx_eq_mat4(a: Mat4, b: Mat4) -> bool {
        a.to_cols_array()
            .iter()
            .zip(b.to_cols_array().iter())
            .all(|(x, y)| (x - y).abs() < EPSILON)
    }

    #[test]
    fn test_new_is_identity() {
        let camera = Camera::new();
        assert_eq!(camera.projection(), Mat4::IDENTITY);
        assert_eq!(camera.view(), Mat4::IDENTITY);
        assert_eq!(camera.inverse_view(), Mat4::IDENTITY);
    }

    #[test]
    fn test_perspective_depth_range() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(50.0_f32.to_radians(), 4.0 / 3.0, 0.1, 100.0);
        let proj = camera.projection();

        // Points on the near and far planes land at NDC depth 0 and 1.
        let near = proj.project_point3(Vec3::new(0.0, 0.0, 0.1));
        let far = proj.project_point3(Vec3::new(0.0, 0.0, 100.0));
        assert!(near.z.abs() < EPSILON, "near plane depth {}", near.z);
        assert!((far.z - 1.0).abs() < EPSILON, "far plane depth {}", far.z);
    }

    #[test]
    fn test_perspective_closed_form() {
        let (fov_y, aspect, near, far) = (1.2_f32, 1.5_f32, 0.5_f32, 50.0_f32);
        let mut camera = Camera::new();
        camera.set_perspective_projection(fov_y, aspect, near, far);
        let proj = camera.projection();

        let tan_half = (fov_y / 2.0).tan();
        assert!((proj.x_axis.x - 1.0 / (aspect * tan_half)).abs() < EPSILON);
        assert!((proj.y_axis.y - 1.0 / tan_half).abs() < EPSILON);
        assert!((proj.z_axis.z - far / (far - near)).abs() < EPSILON);
        assert!((proj.z_axis.w - 1.0).abs() < EPSILON);
        assert!((proj.w_axis.z - -(far * near) / (far - near)).abs() < EPSILON);
    }

    #[test]
    fn test_view_yxz_zero_rotation_is_translation() {
        let mut camera = Camera::new();
        let position = Vec3::new(1.0, -2.0, 3.0);
        camera.set_view_yxz(position, Vec3::ZERO);

        // View with no rotation just subtracts the camera position.
        let p = camera.view().transform_point3(position);
        assert!(approx_eq_vec3(p, Vec3::ZERO));
        assert!(approx_eq_vec3(camera.position(), position));
    }

    #[test]
    fn test_view_target_centers_target_on_axis() {
        let mut camera = Camera::new();
        let position = Vec3::new(0.0, 0.0, -2.5);
        camera.set_view_target(position, Vec3::ZERO, Vec3::new(0.0, -1.0, 0.0));

        // The target sits on the +Z view axis at its world distance.
        let p = camera.view().transform_point3(Vec3::ZERO);
        assert!(approx_eq_vec3(p, Vec3::new(0.0, 0.0, 2.5)), "got {:?}", p);
    }

    #[test]
    fn test_inverse_view_inverts_view() {
        let mut camera = Camera::new();
        camera.set_view_yxz(Vec3::new(4.0, -1.0, 2.0), Vec3::new(0.3, 1.2, -0.4));

        let product = camera.view() * camera.inverse_view();
        assert!(approx_eq_mat4(product, Mat4::IDENTITY));
    }

    #[test]
    fn test_view_yxz_matches_view_direction() {
        // A pure yaw of 90 degrees looks down +X.
        let mut yxz = Camera::new();
        yxz.set_view_yxz(Vec3::ZERO, Vec3::new(0.0, std::f32::consts::FRAC_PI_2, 0.0));

        let mut dir = Camera::new();
        dir.set_view_direction(Vec3::ZERO, Vec3::X, Vec3::new(0.0, -1.0, 0.0));

        assert!(approx_eq_mat4(yxz.view(), dir.view()));
    }

    #[test]
    fn test_position_tracks_inverse_view_column() {
        let mut camera = Camera::new();
        let position = Vec3::new(-0.5, 0.5, -2.0);
        camera.set_view_yxz(position, Vec3::new(0.1, 0.2, 0.0));
        assert!(approx_eq_vec3(camera.position(), position));
    }
}
