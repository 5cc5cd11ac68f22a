//! Light component for scene objects.

/// Marks a scene object as a point light emitter.
///
/// The light's world position comes from the object's transform translation
/// and its billboard radius from `transform.scale.x`; only the emission
/// intensity lives here. Color is the object's `color` field.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointLight {
    /// Emission intensity multiplier applied to the object's color
    pub intensity: f32,
}

impl Default for PointLight {
    fn default() -> Self {
        Self { intensity: 1.0 }
    }
}

impl PointLight {
    /// Create a point light component with the given intensity.
    pub fn new(intensity: f32) -> Self {
        Self { intensity }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_intensity() {
        assert_eq!(PointLight::default().intensity, 1.0);
    }

    #[test]
    fn test_new() {
        assert_eq!(PointLight::new(10.0).intensity, 10.0);
    }
}
