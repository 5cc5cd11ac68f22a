//! Mesh render pass.
//!
//! Draws every registry object carrying a mesh, in ascending id order. Each
//! draw binds a fresh per-object descriptor set built from the frame's
//! transient pool:
//!
//! | binding | resource                        | stages          |
//! |---------|---------------------------------|-----------------|
//! | 0       | object transform UBO slot       | vertex+fragment |
//! | 1       | diffuse map                     | fragment        |
//! | 2       | normal map                      | fragment        |
//! | 3       | ambient occlusion map           | fragment        |
//! | 4       | roughness map                   | fragment        |
//! | 5       | metallic map                    | fragment        |
//! | 6       | shadow map                      | fragment        |
//!
//! Material maps an object does not set resolve to the renderer's default
//! texture, as does the shadow slot until a shadow pass installs one. The
//! model and normal matrices are additionally pushed as push constants.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Mat4;
use tracing::info;

use ember_rhi::RhiResult;
use ember_rhi::descriptor::{DescriptorSetLayout, DescriptorWriter};
use ember_rhi::device::Device;
use ember_rhi::pipeline::{GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use ember_rhi::shader::{Shader, ShaderStage};
use ember_rhi::texture::Texture;
use ember_rhi::vertex::Vertex;
use ember_scene::{MaterialHandle, MeshHandle, ObjectId, ObjectRegistry};

use crate::assets::AssetStore;
use crate::frame::FrameContext;
use crate::object_buffer::ObjectTransformBuffer;

const VERT_SHADER_PATH: &str = "shaders/mesh.vert.spv";
const FRAG_SHADER_PATH: &str = "shaders/mesh.frag.spv";

/// Push constant block shared by the mesh shaders.
///
/// 128 bytes, the push constant budget every Vulkan device guarantees.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct MeshPushConstants {
    pub model: Mat4,
    pub normal_matrix: Mat4,
}

/// One resolved draw: a drawable object with its mesh and material handles.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MeshDraw {
    pub object: ObjectId,
    pub mesh: MeshHandle,
    pub material: MaterialHandle,
}

/// Collects the drawable objects in ascending id order.
///
/// Objects without a mesh (bare transforms, point lights) are skipped
/// without logging; an object whose material was cleared falls back to the
/// default material slot.
pub fn mesh_draw_list(registry: &ObjectRegistry) -> Vec<MeshDraw> {
    registry
        .iter()
        .filter_map(|object| {
            object.mesh.map(|mesh| MeshDraw {
                object: object.id(),
                mesh,
                material: object.material.unwrap_or(MaterialHandle::DEFAULT),
            })
        })
        .collect()
}

/// Forward pass over all mesh-carrying objects.
pub struct MeshSystem {
    pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
    object_layout: DescriptorSetLayout,
    /// Texture bound to the shadow slot; the default texture until a shadow
    /// pass installs a real map.
    shadow_map: Option<Arc<Texture>>,
}

impl MeshSystem {
    /// Builds the mesh pipeline against the pass's attachment formats.
    ///
    /// `global_layout` becomes set 0; the per-object layout documented on
    /// the module becomes set 1.
    ///
    /// # Errors
    ///
    /// Returns an error if shader loading or pipeline creation fails.
    pub fn new(
        device: Arc<Device>,
        global_layout: &DescriptorSetLayout,
        color_format: vk::Format,
        depth_format: vk::Format,
    ) -> RhiResult<Self> {
        let mut object_layout = DescriptorSetLayout::builder().binding(
            0,
            vk::DescriptorType::UNIFORM_BUFFER,
            vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
        );
        for binding in 1..=6 {
            object_layout = object_layout.binding(
                binding,
                vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                vk::ShaderStageFlags::FRAGMENT,
            );
        }
        let object_layout = object_layout.build(device.clone())?;

        let push_range = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(std::mem::size_of::<MeshPushConstants>() as u32);

        let pipeline_layout = PipelineLayout::new(
            device.clone(),
            &[global_layout.handle(), object_layout.handle()],
            &[push_range],
        )?;

        let vert = Shader::from_spirv_file(
            device.clone(),
            Path::new(VERT_SHADER_PATH),
            ShaderStage::Vertex,
            "main",
        )?;
        let frag = Shader::from_spirv_file(
            device.clone(),
            Path::new(FRAG_SHADER_PATH),
            ShaderStage::Fragment,
            "main",
        )?;

        let pipeline = GraphicsPipelineBuilder::new()
            .vertex_shader(&vert)
            .fragment_shader(&frag)
            .vertex_bindings(&[Vertex::binding_description()])
            .vertex_attributes(&Vertex::attribute_descriptions())
            .color_attachment_format(color_format)
            .depth_attachment_format(depth_format)
            .build(device, &pipeline_layout)?;

        info!("Mesh system ready");

        Ok(Self {
            pipeline,
            pipeline_layout,
            object_layout,
            shadow_map: None,
        })
    }

    /// Installs the texture bound to every draw's shadow slot, or restores
    /// the default-texture fallback with `None`.
    pub fn set_shadow_map(&mut self, texture: Option<Arc<Texture>>) {
        self.shadow_map = texture;
    }

    /// Records draws for every mesh-carrying object.
    ///
    /// Must run inside an active render pass. Reads the registry immutably;
    /// the transforms already uploaded for this frame slot are what the GPU
    /// sees.
    ///
    /// # Errors
    ///
    /// Returns [`RhiError::DescriptorPoolExhausted`](ember_rhi::RhiError)
    /// when the frame pool cannot serve another per-object set; draws
    /// recorded so far remain valid.
    pub fn render(
        &self,
        frame: &FrameContext,
        registry: &ObjectRegistry,
        assets: &AssetStore,
        transforms: &ObjectTransformBuffer,
    ) -> RhiResult<()> {
        let cmd = frame.cmd;
        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline_layout.handle(),
            0,
            &[frame.global_set],
            &[],
        );

        let fallback = assets.default_texture();

        for draw in mesh_draw_list(registry) {
            let Some(object) = registry.get(draw.object) else {
                continue;
            };
            let material = assets.material(draw.material);

            let set = DescriptorWriter::new(&self.object_layout)
                .write_buffer(
                    0,
                    transforms.descriptor_info(frame.frame_index, draw.object),
                )
                .write_image(1, map_info(&material.diffuse, fallback))
                .write_image(2, map_info(&material.normal, fallback))
                .write_image(3, map_info(&material.ambient_occlusion, fallback))
                .write_image(4, map_info(&material.roughness, fallback))
                .write_image(5, map_info(&material.metallic, fallback))
                .write_image(6, map_info(&self.shadow_map, fallback))
                .build(frame.frame_pool)?;

            cmd.bind_descriptor_sets(
                vk::PipelineBindPoint::GRAPHICS,
                self.pipeline_layout.handle(),
                1,
                &[set],
                &[],
            );

            let push = MeshPushConstants {
                model: object.transform.matrix(),
                normal_matrix: Mat4::from_mat3(object.transform.normal_matrix()),
            };
            cmd.push_constants(
                self.pipeline_layout.handle(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&push),
            );

            let mesh = assets.mesh(draw.mesh);
            mesh.bind(cmd);
            mesh.draw(cmd);
        }

        Ok(())
    }
}

/// Resolves an optional material map to its descriptor info, falling back to
/// the default texture.
fn map_info(map: &Option<Arc<Texture>>, fallback: &Texture) -> vk::DescriptorImageInfo {
    map.as_deref().unwrap_or(fallback).descriptor_info()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    use glam::Vec3;

    #[test]
    fn push_constants_fit_the_guaranteed_budget() {
        // 128 bytes is the minimum maxPushConstantsSize a device may report.
        assert_eq!(std::mem::size_of::<MeshPushConstants>(), 128);
        assert_eq!(offset_of!(MeshPushConstants, model), 0);
        assert_eq!(offset_of!(MeshPushConstants, normal_matrix), 64);
    }

    #[test]
    fn draw_list_skips_objects_without_mesh() {
        let mut registry = ObjectRegistry::new();
        registry.create_object();
        registry.create_point_light(1.0, 0.1, Vec3::ONE);
        let id = {
            let object = registry.create_object();
            object.mesh = Some(MeshHandle::new(0));
            object.id()
        };

        let draws = mesh_draw_list(&registry);
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].object, id);
        assert_eq!(draws[0].mesh, MeshHandle::new(0));
    }

    #[test]
    fn draw_list_orders_by_ascending_id() {
        let mut registry = ObjectRegistry::new();
        for index in 0..4 {
            registry.create_object().mesh = Some(MeshHandle::new(index));
        }

        let ids: Vec<ObjectId> = mesh_draw_list(&registry)
            .iter()
            .map(|draw| draw.object)
            .collect();
        assert_eq!(ids, vec![0, 1, 2, 3]);
    }

    #[test]
    fn draw_list_falls_back_to_default_material() {
        let mut registry = ObjectRegistry::new();
        let object = registry.create_object();
        object.mesh = Some(MeshHandle::new(0));
        object.material = None;

        let draws = mesh_draw_list(&registry);
        assert_eq!(draws[0].material, MaterialHandle::DEFAULT);
    }

    #[test]
    fn draw_list_repeats_shared_material_per_object() {
        let mut registry = ObjectRegistry::new();
        for _ in 0..2 {
            let object = registry.create_object();
            object.mesh = Some(MeshHandle::new(0));
            object.material = Some(MaterialHandle::new(1));
        }

        let draws = mesh_draw_list(&registry);
        assert_eq!(draws.len(), 2);
        assert!(draws.iter().all(|draw| draw.material == MaterialHandle::new(1)));
    }
}
