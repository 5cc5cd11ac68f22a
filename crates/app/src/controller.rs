//! Keyboard-driven camera movement.

use glam::Vec3;

use ember_platform::{InputState, KeyCode};
use ember_scene::SceneObject;

/// Pitch limit in radians, just short of straight up/down.
const MAX_PITCH: f32 = 1.5;

/// Moves an object in the XZ plane from WASD/arrow-key input.
///
/// Arrow keys turn, WASD strafes relative to the current yaw, and E/Q move
/// along the world vertical. Pitch never affects movement, so the camera
/// glides at a constant height no matter where it looks.
pub struct KeyboardMovementController {
    pub move_speed: f32,
    pub look_speed: f32,
}

impl Default for KeyboardMovementController {
    fn default() -> Self {
        Self {
            move_speed: 3.0,
            look_speed: 1.5,
        }
    }
}

impl KeyboardMovementController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one frame of movement to `object`'s transform.
    pub fn move_in_plane_xz(&self, input: &InputState, dt: f32, object: &mut SceneObject) {
        let rotate = Vec3::new(
            input.axis(KeyCode::ArrowDown, KeyCode::ArrowUp),
            input.axis(KeyCode::ArrowLeft, KeyCode::ArrowRight),
            0.0,
        );
        if rotate.length_squared() > f32::EPSILON {
            object.transform.rotation += self.look_speed * dt * rotate.normalize();
        }
        object.transform.rotation.x = object.transform.rotation.x.clamp(-MAX_PITCH, MAX_PITCH);
        object.transform.rotation.y = object.transform.rotation.y.rem_euclid(std::f32::consts::TAU);

        let yaw = object.transform.rotation.y;
        let forward = Vec3::new(yaw.sin(), 0.0, yaw.cos());
        let right = Vec3::new(forward.z, 0.0, -forward.x);
        // Y points down in this world, so "up" is negative Y.
        let up = Vec3::NEG_Y;

        let direction = input.axis(KeyCode::KeyS, KeyCode::KeyW) * forward
            + input.axis(KeyCode::KeyA, KeyCode::KeyD) * right
            + input.axis(KeyCode::KeyQ, KeyCode::KeyE) * up;
        if direction.length_squared() > f32::EPSILON {
            object.transform.translation += self.move_speed * dt * direction.normalize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_scene::ObjectRegistry;

    fn setup() -> (ObjectRegistry, KeyboardMovementController, InputState) {
        (
            ObjectRegistry::new(),
            KeyboardMovementController::new(),
            InputState::new(),
        )
    }

    #[test]
    fn idle_input_moves_nothing() {
        let (mut registry, controller, input) = setup();
        let object = registry.create_object();

        controller.move_in_plane_xz(&input, 0.016, object);

        assert_eq!(object.transform.translation, Vec3::ZERO);
        assert_eq!(object.transform.rotation, Vec3::ZERO);
    }

    #[test]
    fn forward_key_moves_along_facing_direction() {
        let (mut registry, controller, mut input) = setup();
        let object = registry.create_object();
        input.on_key_pressed(KeyCode::KeyW);

        controller.move_in_plane_xz(&input, 1.0, object);

        // Zero yaw faces +Z.
        assert!((object.transform.translation - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-5);
    }

    #[test]
    fn diagonal_movement_is_not_faster() {
        let (mut registry, controller, mut input) = setup();
        let object = registry.create_object();
        input.on_key_pressed(KeyCode::KeyW);
        input.on_key_pressed(KeyCode::KeyD);

        controller.move_in_plane_xz(&input, 1.0, object);

        let speed = object.transform.translation.length();
        assert!((speed - controller.move_speed).abs() < 1e-4);
    }

    #[test]
    fn up_key_moves_toward_negative_y() {
        let (mut registry, controller, mut input) = setup();
        let object = registry.create_object();
        input.on_key_pressed(KeyCode::KeyE);

        controller.move_in_plane_xz(&input, 1.0, object);

        assert!(object.transform.translation.y < 0.0);
    }

    #[test]
    fn pitch_is_clamped() {
        let (mut registry, controller, mut input) = setup();
        let object = registry.create_object();
        input.on_key_pressed(KeyCode::ArrowUp);

        controller.move_in_plane_xz(&input, 100.0, object);

        assert_eq!(object.transform.rotation.x, MAX_PITCH);
    }

    #[test]
    fn yaw_wraps_into_one_turn() {
        let (mut registry, controller, mut input) = setup();
        let object = registry.create_object();
        input.on_key_pressed(KeyCode::ArrowLeft);

        controller.move_in_plane_xz(&input, 100.0, object);

        let yaw = object.transform.rotation.y;
        assert!((0.0..std::f32::consts::TAU).contains(&yaw));
    }

    #[test]
    fn movement_follows_yaw() {
        let (mut registry, controller, mut input) = setup();
        let object = registry.create_object();
        object.transform.rotation.y = std::f32::consts::FRAC_PI_2;
        input.on_key_pressed(KeyCode::KeyW);

        controller.move_in_plane_xz(&input, 1.0, object);

        // Quarter turn left of +Z is +X.
        assert!((object.transform.translation - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-4);
    }
}
