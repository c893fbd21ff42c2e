use std::io::Cursor;

use glam::Vec3;
use rand::prelude::*;
use tree_core::export::write_obj;
use tree_core::{GeometryBuffer, Grow, MeshConfig, Seed, Tree, TreeConfig, TreeParams};

fn reparse(obj: &[u8]) -> Vec<tobj::Model> {
    let (models, _) = tobj::load_obj_buf(
        &mut Cursor::new(obj),
        &tobj::LoadOptions::default(),
        |_| Err(tobj::LoadError::OpenFileFailed),
    )
    .unwrap();
    models
}

fn grow(config: &TreeConfig, seed: u64) -> GeometryBuffer {
    Seed.grow::<Tree>(&config.grow, &mut StdRng::seed_from_u64(seed))
        .unwrap()
        .grow::<GeometryBuffer>(&config.mesh, &mut ())
        .unwrap()
}

#[test]
fn bundled_config_parses() {
    let text = include_str!("../../../assets/tree_config.toml");
    let config: TreeConfig = toml::from_str(text).unwrap();
    assert_eq!(config.grow, TreeParams::default());
    assert_eq!(config.mesh, MeshConfig::default());
}

#[test]
fn mesh_section_is_optional() {
    let text = include_str!("../../../assets/tree_config.toml");
    let grow_only = text.split("[mesh]").next().unwrap();
    let config: TreeConfig = toml::from_str(grow_only).unwrap();
    assert_eq!(config.mesh, MeshConfig::default());
}

#[test]
fn obj_round_trip() {
    let mut buffer = grow(&TreeConfig::default(), 5);
    let mut obj = Vec::new();
    write_obj(&mut buffer, "tree", &mut obj).unwrap();
    assert!(buffer.is_consistent());

    let models = reparse(&obj);
    assert_eq!(models.len(), 1);
    assert_eq!(models[0].name, "tree");
    let mesh = &models[0].mesh;
    assert_eq!(mesh.positions.len(), 3 * buffer.vertex_count());
    assert_eq!(mesh.indices.len(), 3 * buffer.face_count());
    // the reader renumbers positions, so compare triangle by triangle
    let position = |i: u32| {
        let i = 3 * i as usize;
        Vec3::new(mesh.positions[i], mesh.positions[i + 1], mesh.positions[i + 2])
    };
    for (face, parsed) in buffer.faces().iter().zip(mesh.indices.chunks(3)) {
        for k in 0..3 {
            let expected = buffer.vertex(face.vertices[k]);
            assert!(expected.distance(position(parsed[k])) < 1e-4);
        }
    }
}

#[test]
fn trunk_only_pipeline() {
    let config = TreeConfig {
        grow: TreeParams::trunk_only(),
        ..TreeConfig::default()
    };
    let tree = Seed
        .grow::<Tree>(&config.grow, &mut StdRng::seed_from_u64(2))
        .unwrap();
    assert_eq!(tree.section_count(), config.grow.levels[0].curve_res + 1);
    assert_eq!(tree.roots().len(), 1);
    assert!(tree.leaves().is_empty());

    let mut buffer = grow(&config, 2);
    let stats = buffer.compact();
    // neighbouring tubes share their ring
    assert!(stats.vertices.1 < stats.vertices.0);
    assert!(buffer.is_consistent());
}

#[test]
fn seeds_change_the_tree() {
    let config = TreeConfig::default();
    assert_eq!(grow(&config, 9), grow(&config, 9));
    assert_ne!(grow(&config, 9), grow(&config, 10));
}
