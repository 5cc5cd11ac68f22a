//! Point light pass.
//!
//! Two halves, called from different phases of the frame:
//!
//! - [`LightSystem::update`] runs in the update phase and copies every
//!   light-carrying object into the global UBO's light array, before the
//!   UBO is uploaded for the frame.
//! - [`LightSystem::render`] runs inside the render pass, after the mesh
//!   pass, and draws a camera-facing billboard per light. The quad is
//!   generated in the vertex shader, so the pipeline has no vertex input.
//!
//! Billboards blend additively and test against the depth buffer without
//! writing it, so overlapping lights accumulate and geometry still occludes
//! them.

use std::path::Path;
use std::sync::Arc;

use ash::vk;
use bytemuck::{Pod, Zeroable};
use glam::Vec4;
use tracing::info;

use ember_rhi::RhiResult;
use ember_rhi::descriptor::DescriptorSetLayout;
use ember_rhi::device::Device;
use ember_rhi::pipeline::{ColorBlendAttachment, GraphicsPipelineBuilder, Pipeline, PipelineLayout};
use ember_rhi::shader::{Shader, ShaderStage};
use ember_scene::ObjectRegistry;

use crate::frame::FrameContext;
use crate::ubo::{GlobalUbo, MAX_LIGHTS, PointLightUbo};

const VERT_SHADER_PATH: &str = "shaders/point_light.vert.spv";
const FRAG_SHADER_PATH: &str = "shaders/point_light.frag.spv";

/// Push constant block for one light billboard.
///
/// `position.w` is fixed at 1 and `color.w` carries the intensity, matching
/// the light array layout in the global UBO.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct LightPushConstants {
    pub position: Vec4,
    pub color: Vec4,
    pub radius: f32,
    _padding: [f32; 3],
}

/// Billboard pass over all light-carrying objects.
pub struct LightSystem {
    pipeline: Pipeline,
    pipeline_layout: PipelineLayout,
}

impl LightSystem {
    /// Builds the billboard pipeline against the pass's attachment formats.
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
        let push_range = vk::PushConstantRange::default()
            .stage_flags(vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT)
            .offset(0)
            .size(std::mem::size_of::<LightPushConstants>() as u32);

        let pipeline_layout =
            PipelineLayout::new(device.clone(), &[global_layout.handle()], &[push_range])?;

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
            .color_blend_attachment(ColorBlendAttachment::additive_blend())
            .depth_write_enable(false)
            .color_attachment_format(color_format)
            .depth_attachment_format(depth_format)
            .build(device, &pipeline_layout)?;

        info!("Point light system ready");

        Ok(Self {
            pipeline,
            pipeline_layout,
        })
    }

    /// Copies every light in the registry into the global UBO's light array,
    /// in ascending id order, and sets the active count.
    ///
    /// Stale entries past the count are left in place; shaders only read
    /// `num_lights` entries.
    ///
    /// # Panics
    ///
    /// Panics if the registry holds more than [`MAX_LIGHTS`] lights. The
    /// UBO array is fixed-size, so this is a scene construction error.
    pub fn update(registry: &ObjectRegistry, ubo: &mut GlobalUbo) {
        let mut count = 0;
        for object in registry.iter() {
            let Some(light) = object.point_light else {
                continue;
            };
            assert!(
                count < MAX_LIGHTS,
                "point light capacity ({}) exceeded",
                MAX_LIGHTS
            );
            ubo.point_lights[count] = PointLightUbo {
                position: object.transform.translation.extend(1.0),
                color: object.color.extend(light.intensity),
            };
            count += 1;
        }
        ubo.num_lights = count as u32;
    }

    /// Records one 6-vertex billboard draw per light.
    ///
    /// Must run inside an active render pass, after the opaque geometry so
    /// the depth test sees the final depth buffer.
    pub fn render(&self, frame: &FrameContext, registry: &ObjectRegistry) {
        let cmd = frame.cmd;
        cmd.bind_pipeline(vk::PipelineBindPoint::GRAPHICS, self.pipeline.handle());
        cmd.bind_descriptor_sets(
            vk::PipelineBindPoint::GRAPHICS,
            self.pipeline_layout.handle(),
            0,
            &[frame.global_set],
            &[],
        );

        for object in registry.iter() {
            let Some(light) = object.point_light else {
                continue;
            };

            let push = LightPushConstants {
                position: object.transform.translation.extend(1.0),
                color: object.color.extend(light.intensity),
                radius: object.transform.scale.x,
                _padding: [0.0; 3],
            };
            cmd.push_constants(
                self.pipeline_layout.handle(),
                vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                0,
                bytemuck::bytes_of(&push),
            );
            cmd.draw(6, 1, 0, 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::offset_of;

    use glam::Vec3;

    #[test]
    fn push_constants_match_shader_block_layout() {
        assert_eq!(std::mem::size_of::<LightPushConstants>(), 48);
        assert_eq!(offset_of!(LightPushConstants, position), 0);
        assert_eq!(offset_of!(LightPushConstants, color), 16);
        assert_eq!(offset_of!(LightPushConstants, radius), 32);
    }

    #[test]
    fn update_aggregates_lights_in_id_order() {
        let mut registry = ObjectRegistry::new();
        registry.create_object();
        registry
            .create_point_light(4.0, 0.1, Vec3::new(1.0, 0.0, 0.0))
            .transform
            .translation = Vec3::new(0.0, -1.0, 0.0);
        registry
            .create_point_light(0.5, 0.2, Vec3::new(0.0, 0.0, 1.0))
            .transform
            .translation = Vec3::new(2.0, 0.0, 2.0);

        let mut ubo = GlobalUbo::default();
        LightSystem::update(&registry, &mut ubo);

        assert_eq!(ubo.num_lights, 2);
        assert_eq!(ubo.point_lights[0].position, Vec4::new(0.0, -1.0, 0.0, 1.0));
        assert_eq!(ubo.point_lights[0].color, Vec4::new(1.0, 0.0, 0.0, 4.0));
        assert_eq!(ubo.point_lights[1].position, Vec4::new(2.0, 0.0, 2.0, 1.0));
        assert_eq!(ubo.point_lights[1].color, Vec4::new(0.0, 0.0, 1.0, 0.5));
    }

    #[test]
    fn update_resets_count_from_previous_frame() {
        let mut registry = ObjectRegistry::new();
        registry.create_point_light(1.0, 0.1, Vec3::ONE);

        let mut ubo = GlobalUbo::default();
        ubo.num_lights = MAX_LIGHTS as u32;
        LightSystem::update(&registry, &mut ubo);

        assert_eq!(ubo.num_lights, 1);
    }

    #[test]
    fn update_ignores_mesh_only_objects() {
        let mut registry = ObjectRegistry::new();
        registry.create_object();
        registry.create_object();

        let mut ubo = GlobalUbo::default();
        LightSystem::update(&registry, &mut ubo);

        assert_eq!(ubo.num_lights, 0);
    }

    #[test]
    #[should_panic(expected = "point light capacity")]
    fn update_panics_past_capacity() {
        let mut registry = ObjectRegistry::new();
        for _ in 0..=MAX_LIGHTS {
            registry.create_point_light(1.0, 0.1, Vec3::ONE);
        }

        let mut ubo = GlobalUbo::default();
        LightSystem::update(&registry, &mut ubo);
    }
}
