//! Mesh vertex format and its Vulkan input descriptions.

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::{Vec2, Vec3};

/// Vertex format for loaded meshes.
///
/// Carries the full tangent frame so the fragment shader can perturb normals
/// from a tangent-space normal map. Tangent and bitangent are accumulated
/// per triangle from UV derivatives at load time; the other attributes come
/// straight from the source file.
///
/// # Memory Layout
///
/// `#[repr(C)]`, tightly packed, 68 bytes per vertex:
///
/// | field     | offset | shader location |
/// |-----------|--------|-----------------|
/// | position  | 0      | 0               |
/// | color     | 12     | 1               |
/// | normal    | 24     | 2               |
/// | uv        | 36     | 3               |
/// | tangent   | 44     | 4               |
/// | bitangent | 56     | 5               |
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
pub struct Vertex {
    /// Position in object space.
    pub position: Vec3,
    /// Per-vertex RGB color.
    pub color: Vec3,
    /// Surface normal, normalized at load time.
    pub normal: Vec3,
    /// Texture coordinates.
    pub uv: Vec2,
    /// Tangent along increasing U.
    pub tangent: Vec3,
    /// Bitangent along increasing V.
    pub bitangent: Vec3,
}

impl Vertex {
    /// Returns the binding description for binding 0, per-vertex rate.
    pub fn binding_description() -> vk::VertexInputBindingDescription {
        vk::VertexInputBindingDescription {
            binding: 0,
            stride: std::mem::size_of::<Self>() as u32,
            input_rate: vk::VertexInputRate::VERTEX,
        }
    }

    /// Returns the attribute descriptions for shader locations 0 through 5.
    pub fn attribute_descriptions() -> [vk::VertexInputAttributeDescription; 6] {
        [
            // location 0: position
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 0,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, position) as u32,
            },
            // location 1: color
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 1,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, color) as u32,
            },
            // location 2: normal
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 2,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, normal) as u32,
            },
            // location 3: uv
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 3,
                format: vk::Format::R32G32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, uv) as u32,
            },
            // location 4: tangent
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 4,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, tangent) as u32,
            },
            // location 5: bitangent
            vk::VertexInputAttributeDescription {
                binding: 0,
                location: 5,
                format: vk::Format::R32G32B32_SFLOAT,
                offset: std::mem::offset_of!(Vertex, bitangent) as u32,
            },
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vertex_is_tightly_packed() {
        use std::mem::offset_of;

        assert_eq!(std::mem::size_of::<Vertex>(), 68);
        assert_eq!(offset_of!(Vertex, position), 0);
        assert_eq!(offset_of!(Vertex, color), 12);
        assert_eq!(offset_of!(Vertex, normal), 24);
        assert_eq!(offset_of!(Vertex, uv), 36);
        assert_eq!(offset_of!(Vertex, tangent), 44);
        assert_eq!(offset_of!(Vertex, bitangent), 56);
    }

    #[test]
    fn binding_description_covers_whole_vertex() {
        let binding = Vertex::binding_description();
        assert_eq!(binding.binding, 0);
        assert_eq!(binding.stride, 68);
        assert_eq!(binding.input_rate, vk::VertexInputRate::VERTEX);
    }

    #[test]
    fn attribute_descriptions_cover_locations_in_order() {
        let attrs = Vertex::attribute_descriptions();
        assert_eq!(attrs.len(), 6);

        for (location, attr) in attrs.iter().enumerate() {
            assert_eq!(attr.binding, 0);
            assert_eq!(attr.location, location as u32);
        }

        // Only uv is two components wide.
        assert_eq!(attrs[3].format, vk::Format::R32G32_SFLOAT);
        for location in [0, 1, 2, 4, 5] {
            assert_eq!(attrs[location].format, vk::Format::R32G32B32_SFLOAT);
        }
    }

    #[test]
    fn vertex_casts_to_bytes() {
        let vertex = Vertex {
            position: Vec3::new(1.0, 2.0, 3.0),
            color: Vec3::ONE,
            normal: Vec3::Y,
            uv: Vec2::new(0.5, 0.5),
            ..Vertex::default()
        };

        let bytes: &[u8] = bytemuck::bytes_of(&vertex);
        assert_eq!(bytes.len(), 68);

        let back: &Vertex = bytemuck::from_bytes(bytes);
        assert_eq!(back.position, vertex.position);
        assert_eq!(back.uv, vertex.uv);
    }
}
