//! Integration tests for OBJ model loading.

use std::io::Cursor;
use std::path::Path;

use ember_resources::Model;

/// A unit cube with per-face normals and a simple box UV layout, as an
/// exporter would write it: 8 positions referenced by 12 triangles.
const CUBE_OBJ: &str = "\
v -0.5 -0.5 -0.5
v  0.5 -0.5 -0.5
v  0.5  0.5 -0.5
v -0.5  0.5 -0.5
v -0.5 -0.5  0.5
v  0.5 -0.5  0.5
v  0.5  0.5  0.5
v -0.5  0.5  0.5
vt 0 0
vt 1 0
vt 1 1
vt 0 1
vn  0  0 -1
vn  0  0  1
vn -1  0  0
vn  1  0  0
vn  0 -1  0
vn  0  1  0
f 1/1/1 3/3/1 2/2/1
f 1/1/1 4/4/1 3/3/1
f 5/1/2 6/2/2 7/3/2
f 5/1/2 7/3/2 8/4/2
f 1/1/3 5/2/3 8/3/3
f 1/1/3 8/3/3 4/4/3
f 2/1/4 3/4/4 7/3/4
f 2/1/4 7/3/4 6/2/4
f 1/1/5 2/2/5 6/3/5
f 1/1/5 6/3/5 5/4/5
f 4/1/6 8/2/6 7/3/6
f 4/1/6 7/3/6 3/4/6
";

#[test]
fn test_cube_from_memory() {
    let model = Model::from_obj_buf(&mut Cursor::new(CUBE_OBJ)).expect("cube should parse");

    // 12 triangles worth of indices survive untouched.
    assert_eq!(model.index_count(), 36);

    // Corners shared by the two triangles of one face collapse, leaving 4
    // distinct vertices per face: 24 total instead of 36 raw corners.
    assert_eq!(model.vertex_count(), 24);

    // All indices stay in range.
    let max = *model.indices.iter().max().unwrap();
    assert!((max as usize) < model.vertex_count());
}

#[test]
fn test_cube_tangents_populated() {
    let model = Model::from_obj_buf(&mut Cursor::new(CUBE_OBJ)).expect("cube should parse");

    // Box UVs give every face a valid, axis-aligned tangent frame.
    for v in &model.vertices {
        assert!(
            v.tangent.length() > 0.5,
            "vertex has degenerate tangent {:?}",
            v.tangent
        );
        assert!(
            v.tangent.is_finite() && v.bitangent.is_finite(),
            "non-finite tangent frame"
        );
    }
}

#[test]
fn test_dedup_is_stable_across_reparses() {
    let a = Model::from_obj_buf(&mut Cursor::new(CUBE_OBJ)).unwrap();
    let b = Model::from_obj_buf(&mut Cursor::new(CUBE_OBJ)).unwrap();

    assert_eq!(a.vertex_count(), b.vertex_count());
    assert_eq!(a.indices, b.indices);
}

#[test]
fn test_load_cube_asset() {
    // Exercise the disk path against the demo asset when present.
    let model_path = Path::new("../../assets/models/cube.obj");
    if !model_path.exists() {
        println!("Skipping test: model file not found at {:?}", model_path);
        return;
    }

    let model = Model::load(model_path).expect("failed to load cube.obj");
    assert!(model.vertex_count() >= 8);
    assert_eq!(model.index_count() % 3, 0, "indices must form triangles");
}
