//! OBJ model loading with vertex deduplication.
//!
//! Parses Wavefront OBJ files into flat vertex/index lists ready for GPU
//! upload. OBJ faces index position, normal, and texcoord streams
//! independently; this module resolves them into a single interleaved
//! [`Vertex`] stream, deduplicating identical corners and generating
//! per-triangle tangent frames for normal mapping along the way.

use std::collections::HashMap;
use std::io::BufRead;
use std::path::Path;

use glam::{Vec2, Vec3};

use ember_rhi::vertex::Vertex;

use crate::error::{ResourceError, ResourceResult};

/// CPU-side model data: deduplicated vertices plus triangle indices.
///
/// The GPU mesh (vertex/index buffers) is built from this by the renderer;
/// keeping the parsed form GPU-free lets loading and deduplication be tested
/// without a device.
#[derive(Debug, Default)]
pub struct Model {
    /// Deduplicated vertex data
    pub vertices: Vec<Vertex>,
    /// Triangle list indices into `vertices`
    pub indices: Vec<u32>,
}

/// Dedup key: the bit patterns of position, color, normal, and uv.
///
/// Tangent and bitangent are deliberately not part of the key; two corners
/// that agree on these four attributes collapse into one vertex and keep the
/// tangent frame of whichever triangle inserted it first.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct VertexKey([u32; 11]);

impl VertexKey {
    fn of(vertex: &Vertex) -> Self {
        let p = vertex.position;
        let c = vertex.color;
        let n = vertex.normal;
        let t = vertex.uv;
        Self([
            p.x.to_bits(),
            p.y.to_bits(),
            p.z.to_bits(),
            c.x.to_bits(),
            c.y.to_bits(),
            c.z.to_bits(),
            n.x.to_bits(),
            n.y.to_bits(),
            n.z.to_bits(),
            t.x.to_bits(),
            t.y.to_bits(),
        ])
    }
}

impl Model {
    /// Load a model from an OBJ file on disk.
    ///
    /// # Errors
    /// Returns [`ResourceError::FileNotFound`] if the path does not exist,
    /// [`ResourceError::ObjLoad`] on parse failure, and
    /// [`ResourceError::EmptyModel`] if the file holds no triangles.
    pub fn load(path: impl AsRef<Path>) -> ResourceResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ResourceError::FileNotFound(path.to_path_buf()));
        }

        let options = tobj::LoadOptions {
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };
        let (models, _materials) =
            tobj::load_obj(path, &options).map_err(|source| ResourceError::ObjLoad {
                path: path.to_path_buf(),
                source,
            })?;

        let model = Self::from_obj_models(&models, path)?;
        tracing::info!(
            "Loaded OBJ model '{}': {} vertices, {} indices",
            path.display(),
            model.vertices.len(),
            model.indices.len()
        );
        Ok(model)
    }

    /// Parse a model from in-memory OBJ data.
    ///
    /// Material library references are ignored. Mainly useful for tests and
    /// generated geometry.
    pub fn from_obj_buf(reader: &mut impl BufRead) -> ResourceResult<Self> {
        let options = tobj::LoadOptions {
            triangulate: true,
            ignore_points: true,
            ignore_lines: true,
            ..Default::default()
        };
        let (models, _materials) = tobj::load_obj_buf(reader, &options, |_| Ok(Default::default()))?;
        Self::from_obj_models(&models, Path::new("<buffer>"))
    }

    /// Resolve parsed OBJ meshes into a deduplicated vertex/index pair.
    fn from_obj_models(models: &[tobj::Model], origin: &Path) -> ResourceResult<Self> {
        let mut vertices: Vec<Vertex> = Vec::new();
        let mut indices: Vec<u32> = Vec::new();
        let mut unique: HashMap<VertexKey, u32> = HashMap::new();

        for model in models {
            let mesh = &model.mesh;
            for face in 0..mesh.indices.len() / 3 {
                let mut corners = [Vertex::default(); 3];
                for (j, corner) in corners.iter_mut().enumerate() {
                    let i = face * 3 + j;

                    let p = mesh.indices[i] as usize;
                    corner.position = Vec3::new(
                        mesh.positions[3 * p],
                        mesh.positions[3 * p + 1],
                        mesh.positions[3 * p + 2],
                    );
                    corner.color = if mesh.vertex_color.is_empty() {
                        Vec3::ONE
                    } else {
                        Vec3::new(
                            mesh.vertex_color[3 * p],
                            mesh.vertex_color[3 * p + 1],
                            mesh.vertex_color[3 * p + 2],
                        )
                    };

                    if let Some(&n) = mesh.normal_indices.get(i) {
                        let n = n as usize;
                        corner.normal = Vec3::new(
                            mesh.normals[3 * n],
                            mesh.normals[3 * n + 1],
                            mesh.normals[3 * n + 2],
                        );
                    }

                    if let Some(&t) = mesh.texcoord_indices.get(i) {
                        let t = t as usize;
                        corner.uv = Vec2::new(mesh.texcoords[2 * t], mesh.texcoords[2 * t + 1]);
                    }
                }

                let (tangent, bitangent) = triangle_tangents(&corners);

                for mut corner in corners {
                    let key = VertexKey::of(&corner);
                    let index = match unique.get(&key) {
                        Some(&index) => index,
                        None => {
                            corner.tangent = tangent;
                            corner.bitangent = bitangent;
                            let index = vertices.len() as u32;
                            vertices.push(corner);
                            unique.insert(key, index);
                            index
                        }
                    };
                    indices.push(index);
                }
            }
        }

        if indices.is_empty() {
            return Err(ResourceError::EmptyModel(origin.to_path_buf()));
        }

        tracing::debug!(
            "Deduplicated {} corners into {} vertices",
            indices.len(),
            vertices.len()
        );

        Ok(Self { vertices, indices })
    }

    /// Number of deduplicated vertices.
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangle indices.
    pub fn index_count(&self) -> usize {
        self.indices.len()
    }
}

/// Tangent and bitangent of one triangle, from its position edges and UV
/// deltas.
fn triangle_tangents(corners: &[Vertex; 3]) -> (Vec3, Vec3) {
    let edge1 = corners[1].position - corners[0].position;
    let edge2 = corners[2].position - corners[0].position;
    let duv1 = corners[1].uv - corners[0].uv;
    let duv2 = corners[2].uv - corners[0].uv;

    let f = 1.0 / (duv1.x * duv2.y - duv2.x * duv1.y);
    let tangent = f * (duv2.y * edge1 - duv1.y * edge2);
    let bitangent = f * (-duv2.x * edge1 + duv1.x * edge2);
    (tangent, bitangent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const QUAD_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
vt 0 0
vt 1 0
vt 0 1
vt 1 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
f 2/2/1 4/4/1 3/3/1
";

    // Same quad but the fourth corner's UV is skewed, so the two triangles
    // produce different tangent frames.
    const SKEWED_QUAD_OBJ: &str = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
vt 0 0
vt 1 0
vt 0 1
vt 2 1
vn 0 0 1
f 1/1/1 2/2/1 3/3/1
f 2/2/1 4/4/1 3/3/1
";

    fn parse(text: &str) -> Model {
        Model::from_obj_buf(&mut Cursor::new(text)).expect("fixture should parse")
    }

    #[test]
    fn test_quad_dedup() {
        let model = parse(QUAD_OBJ);

        // Two triangles sharing an edge: 6 corners collapse to 4 vertices.
        assert_eq!(model.vertex_count(), 4);
        assert_eq!(model.index_count(), 6);
        assert_eq!(model.indices, vec![0, 1, 2, 1, 3, 2]);
    }

    #[test]
    fn test_attributes_resolved_per_corner() {
        let model = parse(QUAD_OBJ);

        assert_eq!(model.vertices[0].position, Vec3::ZERO);
        assert_eq!(model.vertices[3].position, Vec3::new(1.0, 1.0, 0.0));
        assert_eq!(model.vertices[3].uv, Vec2::new(1.0, 1.0));
        for v in &model.vertices {
            assert_eq!(v.normal, Vec3::Z);
        }
    }

    #[test]
    fn test_color_defaults_to_white() {
        let model = parse(QUAD_OBJ);
        for v in &model.vertices {
            assert_eq!(v.color, Vec3::ONE);
        }
    }

    #[test]
    fn test_vertex_colors_parsed() {
        let model = parse(
            "\
v 0 0 0 1 0 0
v 1 0 0 0 1 0
v 0 1 0 0 0 1
f 1 2 3
",
        );

        assert_eq!(model.vertices[0].color, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(model.vertices[1].color, Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(model.vertices[2].color, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_tangent_axes_of_flat_quad() {
        let model = parse(QUAD_OBJ);

        // UVs are aligned with X/Y, so the tangent frame is the world axes.
        for v in &model.vertices {
            assert_eq!(v.tangent, Vec3::X);
            assert_eq!(v.bitangent, Vec3::Y);
        }
    }

    #[test]
    fn test_shared_vertex_keeps_first_tangent() {
        let model = parse(SKEWED_QUAD_OBJ);
        assert_eq!(model.vertex_count(), 4);

        // Vertices 1 and 2 sit on the shared edge; the first triangle
        // inserted them, so its frame sticks even though the second
        // triangle's differs.
        assert_eq!(model.vertices[1].tangent, Vec3::X);
        assert_eq!(model.vertices[2].tangent, Vec3::X);
        // Vertex 3 first appears in the skewed triangle.
        assert_eq!(model.vertices[3].tangent, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(model.vertices[3].bitangent, Vec3::new(-0.5, 1.0, 0.0));
    }

    #[test]
    fn test_different_normals_stay_distinct() {
        // Same position referenced with two normals must produce two
        // vertices.
        let model = parse(
            "\
v 0 0 0
v 1 0 0
v 0 1 0
vn 0 0 1
vn 1 0 0
f 1//1 2//1 3//1
f 1//2 2//2 3//2
",
        );

        assert_eq!(model.vertex_count(), 6);
        assert_eq!(model.index_count(), 6);
    }

    #[test]
    fn test_empty_model_rejected() {
        let err = Model::from_obj_buf(&mut Cursor::new("v 0 0 0\n")).unwrap_err();
        assert!(matches!(err, ResourceError::EmptyModel(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = Model::load("does/not/exist.obj").unwrap_err();
        assert!(matches!(err, ResourceError::FileNotFound(_)));
    }
}
