//! GPU-resident mesh: vertex and index buffers built from a parsed model.

use std::sync::Arc;

use ash::vk;
use tracing::debug;

use ember_resources::Model;
use ember_rhi::RhiResult;
use ember_rhi::buffer::{Buffer, BufferUsage};
use ember_rhi::command::CommandBuffer;
use ember_rhi::device::Device;

/// Uploaded mesh geometry.
///
/// The index buffer is optional; meshes whose source carried no index data
/// draw non-indexed over the raw vertex list.
pub struct Mesh {
    vertex_buffer: Buffer,
    index_buffer: Option<Buffer>,
    vertex_count: u32,
    index_count: u32,
}

impl Mesh {
    /// Uploads a parsed model's geometry to the GPU.
    ///
    /// # Panics
    ///
    /// Panics if the model holds fewer than three vertices; a mesh that
    /// cannot form a triangle is a content bug.
    ///
    /// # Errors
    ///
    /// Returns an error if buffer creation or the upload fails.
    pub fn from_model(device: Arc<Device>, model: &Model) -> RhiResult<Self> {
        let vertex_count = model.vertices.len() as u32;
        assert!(vertex_count >= 3, "mesh needs at least 3 vertices");

        let vertex_buffer = Buffer::new_with_data(
            device.clone(),
            BufferUsage::Vertex,
            bytemuck::cast_slice(&model.vertices),
        )?;

        let index_count = model.indices.len() as u32;
        let index_buffer = if model.indices.is_empty() {
            None
        } else {
            Some(Buffer::new_with_data(
                device,
                BufferUsage::Index,
                bytemuck::cast_slice(&model.indices),
            )?)
        };

        debug!(
            "Uploaded mesh: {} vertices, {} indices",
            vertex_count, index_count
        );

        Ok(Self {
            vertex_buffer,
            index_buffer,
            vertex_count,
            index_count,
        })
    }

    /// Binds the mesh's buffers for drawing.
    pub fn bind(&self, cmd: &CommandBuffer) {
        cmd.bind_vertex_buffers(0, &[self.vertex_buffer.handle()], &[0]);
        if let Some(ref index_buffer) = self.index_buffer {
            cmd.bind_index_buffer(index_buffer.handle(), 0, vk::IndexType::UINT32);
        }
    }

    /// Issues the draw call for the whole mesh; [`bind`](Self::bind) must
    /// have been recorded first.
    pub fn draw(&self, cmd: &CommandBuffer) {
        if self.index_buffer.is_some() {
            cmd.draw_indexed(self.index_count, 1, 0, 0, 0);
        } else {
            cmd.draw(self.vertex_count, 1, 0, 0);
        }
    }

    /// Returns the number of vertices after deduplication.
    #[inline]
    pub fn vertex_count(&self) -> u32 {
        self.vertex_count
    }

    /// Returns the number of indices (0 for non-indexed meshes).
    #[inline]
    pub fn index_count(&self) -> u32 {
        self.index_count
    }
}
