pub mod compact;
pub mod mesh_builder;
pub mod surfaces;

use glam::Vec3;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub use compact::CompactionStats;
pub use mesh_builder::{Face, GeometryBuffer, Reservation, Scratch, StreamCounts};
pub use surfaces::{add_billboard, add_cone, add_oval, add_tube, Billboard, Cone, Oval, Ring};

use crate::error::GeometryError;
use crate::growing::{CrossSection, LeafShape, Tree};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshConfig {
    pub lod: u32,
    /// close every branch with a small cone over its last ring
    pub cap_tips: bool,
    pub leaves: bool,
    pub leaf_color: [f32; 4],
}

impl Default for MeshConfig {
    fn default() -> Self {
        Self {
            lod: 0,
            cap_tips: true,
            leaves: true,
            leaf_color: [0.25, 0.55, 0.2, 1.],
        }
    }
}

/// Normalizers for the tube vertex colors.
struct ColorScale {
    height: f32,
    depth: f32,
}

impl ColorScale {
    fn of(tree: &Tree) -> Self {
        Self {
            height: tree.height().max(f32::EPSILON),
            depth: tree.max_depth().unwrap_or(0).max(1) as f32,
        }
    }

    /// (height, position along the branch, depth, 1), each in [0, 1]
    fn encode(&self, section: &CrossSection, along: f32) -> [f32; 4] {
        [
            (section.position.y / self.height).clamp(0., 1.),
            along,
            section.depth as f32 / self.depth,
            1.,
        ]
    }
}

impl GeometryBuffer {
    /// Tube every branch of `tree` and put a primitive on each leaf.
    pub fn materialize(tree: &Tree, config: &MeshConfig) -> Result<Self, GeometryError> {
        let ring = surfaces::lod_vertex_count(config.lod);
        let mut buffer = Self::with_capacity(2 * ring * tree.section_count() + 12 * tree.leaves().len());
        let scale = ColorScale::of(tree);

        for root in tree.roots() {
            let chain: Vec<usize> = tree.branch_sections(root).collect();
            let last = chain.len().saturating_sub(1).max(1) as f32;
            let mut travelled = 0.;
            for (k, pair) in chain.windows(2).enumerate() {
                let (a, b) = (tree.section(pair[0]), tree.section(pair[1]));
                let step = a.position.distance(b.position);
                let base = Ring {
                    position: a.position,
                    axis: a.axis,
                    radius: a.radius,
                    v: travelled,
                    color: scale.encode(a, k as f32 / last),
                };
                let tip = Ring {
                    position: b.position,
                    axis: b.axis,
                    radius: b.radius,
                    v: travelled + step,
                    color: scale.encode(b, (k + 1) as f32 / last),
                };
                add_tube(&mut buffer, &base, &tip, config.lod)?;
                travelled += step;
            }

            let Some(&tip) = chain.last() else { continue };
            let tip = tree.section(tip);
            if config.cap_tips && tip.radius > 0. {
                let cone = Cone {
                    position: tip.position,
                    axis: tip.axis,
                    color: scale.encode(tip, 1.),
                    ..Cone::new(tip.radius, tip.radius)
                };
                add_cone(&mut buffer, &cone, config.lod)?;
            }
        }

        if config.leaves {
            for leaf in tree.leaves().iter().filter(|l| l.length > 0.) {
                match tree.leaf_shape() {
                    LeafShape::Billboard => add_billboard(
                        &mut buffer,
                        &Billboard {
                            position: leaf.position,
                            axis: leaf.axis,
                            length: leaf.length,
                            width: leaf.width,
                            color: config.leaf_color,
                        },
                    )?,
                    // flat on the foliage envelope
                    LeafShape::Oval => add_oval(
                        &mut buffer,
                        &Oval {
                            position: leaf.position,
                            facing: leaf.axis,
                            width: leaf.width,
                            height: leaf.length,
                            color: config.leaf_color,
                        },
                        config.lod,
                    )?,
                }
            }
        }

        debug!(
            vertices = buffer.vertex_count(),
            faces = buffer.face_count(),
            "materialized tree"
        );
        Ok(buffer)
    }

    /// Axis-aligned bounds of the positions, `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        Some(
            self.vertices
                .iter()
                .fold((first, first), |(lo, hi), &v| (lo.min(v), hi.max(v))),
        )
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::growing::{Leaf, TreeParams};
    use rand::prelude::*;
    use surfaces::BASE_NUM_VERTICES;

    #[test]
    fn trunk_is_one_tube_per_segment() {
        let params = TreeParams::trunk_only();
        let tree = Tree::generate(&params, &mut StdRng::seed_from_u64(1)).unwrap();
        let buffer = GeometryBuffer::materialize(&tree, &MeshConfig::default()).unwrap();
        let segments = params.levels[0].curve_res;
        // full taper: the tip ring is a point and gets no cap
        assert_eq!(buffer.face_count(), 2 * BASE_NUM_VERTICES * segments);
        assert_eq!(buffer.vertex_count(), 2 * BASE_NUM_VERTICES * segments);
        assert!(buffer.is_consistent());
    }

    #[test]
    fn caps_on_blunt_tips() {
        let mut params = TreeParams::trunk_only();
        params.levels[0].taper = 0.5;
        let tree = Tree::generate(&params, &mut StdRng::seed_from_u64(1)).unwrap();
        let capped = GeometryBuffer::materialize(&tree, &MeshConfig::default()).unwrap();
        let open = GeometryBuffer::materialize(
            &tree,
            &MeshConfig {
                cap_tips: false,
                ..MeshConfig::default()
            },
        )
        .unwrap();
        assert_eq!(capped.face_count(), open.face_count() + BASE_NUM_VERTICES);
    }

    #[test]
    fn leaves_follow_config() {
        let params = TreeParams::default();
        let tree = Tree::generate(&params, &mut StdRng::seed_from_u64(7)).unwrap();
        let visible = tree.leaves().iter().filter(|l| l.length > 0.).count();
        let bare = GeometryBuffer::materialize(
            &tree,
            &MeshConfig {
                leaves: false,
                ..MeshConfig::default()
            },
        )
        .unwrap();
        let full = GeometryBuffer::materialize(&tree, &MeshConfig::default()).unwrap();
        assert_eq!(full.face_count(), bare.face_count() + 6 * visible);
        assert!(full.is_consistent());
    }

    #[test]
    fn empty_leaves_are_skipped() {
        let mut tree = Tree::generate(&TreeParams::trunk_only(), &mut StdRng::seed_from_u64(4)).unwrap();
        let bare = GeometryBuffer::materialize(&tree, &MeshConfig::default()).unwrap();
        let leaf = Leaf {
            position: Vec3::new(0., 3., 0.),
            axis: Vec3::X,
            length: 0.2,
            width: 0.1,
            branch: 0,
            cluster: 0,
        };
        tree.leaves.push(Leaf {
            position: Vec3::ZERO,
            axis: Vec3::Y,
            length: 0.,
            width: 0.,
            ..leaf
        });
        let only_empty = GeometryBuffer::materialize(&tree, &MeshConfig::default()).unwrap();
        assert_eq!(only_empty, bare);

        tree.leaves.push(leaf);
        let one = GeometryBuffer::materialize(&tree, &MeshConfig::default()).unwrap();
        assert_eq!(one.face_count(), bare.face_count() + 6);
        assert_eq!(one.vertex_count(), bare.vertex_count() + 12);
    }

    #[test]
    fn oval_leaves() {
        let params = TreeParams {
            leaf_shape: LeafShape::Oval,
            ..TreeParams::default()
        };
        let tree = Tree::generate(&params, &mut StdRng::seed_from_u64(7)).unwrap();
        let visible = tree.leaves().iter().filter(|l| l.length > 0.).count();
        let config = MeshConfig::default();
        let bare = GeometryBuffer::materialize(&tree, &MeshConfig { leaves: false, ..config }).unwrap();
        let full = GeometryBuffer::materialize(&tree, &config).unwrap();
        assert_eq!(full.face_count(), bare.face_count() + BASE_NUM_VERTICES * visible);
    }

    #[test]
    fn colors_are_normalized() {
        let tree = Tree::generate(&TreeParams::default(), &mut StdRng::seed_from_u64(3)).unwrap();
        let buffer = GeometryBuffer::materialize(
            &tree,
            &MeshConfig {
                leaves: false,
                ..MeshConfig::default()
            },
        )
        .unwrap();
        for c in buffer.colors() {
            assert!(c.iter().all(|x| (0. ..=1.).contains(x)), "{c:?}");
        }
        let (lo, hi) = buffer.bounds().unwrap();
        assert!(lo.y <= 0. && hi.y > 1.);
    }
}
