//! GPU-visible uniform data for the frame.
//!
//! These structures are written verbatim into uniform buffers, so their
//! layout must match the shader-side std140 declarations exactly. All of
//! them are `#[repr(C)]` and `Pod`/`Zeroable` for byte casting.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

use ember_scene::{Camera, Transform};

/// Maximum number of point lights the global UBO can carry per frame.
///
/// The light pass asserts this bound during aggregation; exceeding it is a
/// scene-construction bug, not a runtime condition.
pub const MAX_LIGHTS: usize = 10;

/// One point light as the shaders see it.
///
/// # Memory Layout
///
/// | field    | offset | contents                |
/// |----------|--------|-------------------------|
/// | position | 0      | world position, w = 1   |
/// | color    | 16     | rgb, w = intensity      |
///
/// 32 bytes; matches the std140 array stride inside [`GlobalUbo`].
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct PointLightUbo {
    /// World position, w component fixed to 1.
    pub position: Vec4,
    /// Light color in rgb, intensity in w.
    pub color: Vec4,
}

/// Per-frame global uniform data: camera matrices plus the aggregated
/// light state.
///
/// One copy lives in each frame slot's uniform buffer, bound at set 0
/// binding 0 for every pass.
///
/// # Memory Layout
///
/// | field               | offset | size |
/// |---------------------|--------|------|
/// | projection          | 0      | 64   |
/// | view                | 64     | 64   |
/// | inverse_view        | 128    | 64   |
/// | ambient_light_color | 192    | 16   |
/// | point_lights        | 208    | 320  |
/// | num_lights          | 528    | 4    |
/// | _padding            | 532    | 12   |
///
/// Total size: 544 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct GlobalUbo {
    /// Camera projection matrix.
    pub projection: Mat4,
    /// Camera view matrix (world to view space).
    pub view: Mat4,
    /// Inverse view matrix; column 3 is the camera world position.
    pub inverse_view: Mat4,
    /// Ambient color in rgb, ambient intensity in w.
    pub ambient_light_color: Vec4,
    /// Aggregated point lights; only the first `num_lights` are valid.
    pub point_lights: [PointLightUbo; MAX_LIGHTS],
    /// Number of valid entries in `point_lights`.
    pub num_lights: u32,
    /// Padding for 16-byte alignment.
    pub _padding: [u32; 3],
}

impl GlobalUbo {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Copies the camera's matrices into the UBO.
    pub fn set_camera(&mut self, camera: &Camera) {
        self.projection = camera.projection();
        self.view = camera.view();
        self.inverse_view = camera.inverse_view();
    }
}

impl Default for GlobalUbo {
    fn default() -> Self {
        Self {
            projection: Mat4::IDENTITY,
            view: Mat4::IDENTITY,
            inverse_view: Mat4::IDENTITY,
            ambient_light_color: Vec4::new(1.0, 1.0, 1.0, 0.02),
            point_lights: [PointLightUbo::default(); MAX_LIGHTS],
            num_lights: 0,
            _padding: [0; 3],
        }
    }
}

/// Per-object uniform data: one slot of the object transform buffer.
///
/// # Memory Layout
///
/// | field         | offset | size |
/// |---------------|--------|------|
/// | model         | 0      | 64   |
/// | normal_matrix | 64     | 64   |
///
/// Total size: 128 bytes (the slot *stride* in the buffer is this size
/// rounded up to the device's uniform-offset/flush alignment).
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct ObjectUbo {
    /// Model matrix (object to world space).
    pub model: Mat4,
    /// Normal matrix: inverse-transpose of the model's 3x3, padded to 4x4.
    pub normal_matrix: Mat4,
}

impl ObjectUbo {
    /// Size of the struct in bytes.
    pub const SIZE: usize = std::mem::size_of::<Self>();

    /// Builds the slot data from an object's transform.
    ///
    /// Both matrices come from the transform's closed forms, so no general
    /// 4x4 inversion happens per object.
    pub fn from_transform(transform: &Transform) -> Self {
        Self {
            model: transform.matrix(),
            normal_matrix: Mat4::from_mat3(transform.normal_matrix()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, offset_of};

    use glam::Vec3;

    #[test]
    fn global_ubo_layout_matches_std140() {
        assert_eq!(GlobalUbo::SIZE, 544);
        assert_eq!(align_of::<GlobalUbo>(), 16);
        assert_eq!(offset_of!(GlobalUbo, projection), 0);
        assert_eq!(offset_of!(GlobalUbo, view), 64);
        assert_eq!(offset_of!(GlobalUbo, inverse_view), 128);
        assert_eq!(offset_of!(GlobalUbo, ambient_light_color), 192);
        assert_eq!(offset_of!(GlobalUbo, point_lights), 208);
        assert_eq!(offset_of!(GlobalUbo, num_lights), 528);
    }

    #[test]
    fn point_light_ubo_matches_array_stride() {
        assert_eq!(std::mem::size_of::<PointLightUbo>(), 32);
        assert_eq!(offset_of!(PointLightUbo, position), 0);
        assert_eq!(offset_of!(PointLightUbo, color), 16);
    }

    #[test]
    fn object_ubo_layout() {
        assert_eq!(ObjectUbo::SIZE, 128);
        assert_eq!(align_of::<ObjectUbo>(), 16);
        assert_eq!(offset_of!(ObjectUbo, model), 0);
        assert_eq!(offset_of!(ObjectUbo, normal_matrix), 64);
    }

    #[test]
    fn global_ubo_defaults() {
        let ubo = GlobalUbo::default();
        assert_eq!(ubo.projection, Mat4::IDENTITY);
        assert_eq!(ubo.view, Mat4::IDENTITY);
        assert_eq!(ubo.inverse_view, Mat4::IDENTITY);
        assert_eq!(ubo.ambient_light_color, Vec4::new(1.0, 1.0, 1.0, 0.02));
        assert_eq!(ubo.num_lights, 0);
    }

    #[test]
    fn set_camera_copies_all_three_matrices() {
        let mut camera = Camera::new();
        camera.set_perspective_projection(f32::to_radians(50.0), 4.0 / 3.0, 0.1, 100.0);
        camera.set_view_yxz(Vec3::new(0.0, 0.0, -2.5), Vec3::ZERO);

        let mut ubo = GlobalUbo::default();
        ubo.set_camera(&camera);

        assert_eq!(ubo.projection, camera.projection());
        assert_eq!(ubo.view, camera.view());
        assert_eq!(ubo.inverse_view, camera.inverse_view());
    }

    #[test]
    fn object_ubo_from_transform_uses_closed_forms() {
        let transform = Transform::new()
            .with_translation(Vec3::new(1.0, -2.0, 3.0))
            .with_rotation(Vec3::new(0.3, 1.1, -0.4))
            .with_scale(Vec3::new(2.0, 0.5, 1.5));

        let ubo = ObjectUbo::from_transform(&transform);
        assert_eq!(ubo.model, transform.matrix());
        assert_eq!(
            ubo.normal_matrix,
            Mat4::from_mat3(transform.normal_matrix())
        );
        // The padded row/column stay affine-identity.
        assert_eq!(ubo.normal_matrix.w_axis, Vec4::W);
    }

    #[test]
    fn ubos_cast_to_bytes() {
        let global = GlobalUbo::default();
        assert_eq!(bytemuck::bytes_of(&global).len(), GlobalUbo::SIZE);

        let object = ObjectUbo::default();
        assert_eq!(bytemuck::bytes_of(&object).len(), ObjectUbo::SIZE);
    }
}
