use glam::Vec3;
use rand::{prelude::Distribution, Rng};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info, warn};

use super::sdf::{BranchSdf, Sphere, UniformSphere};
use super::{Branch, CrossSection, Leaf, Tree};
use crate::error::ConfigError;
use crate::utils::{orthogonal_part, rotate_around};

pub const MAX_LEVELS: usize = 4;

/// Envelope of the first level of branches along the trunk.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Conical,
    Spherical,
    Hemispherical,
    #[default]
    Cylindrical,
    TaperedCylindrical,
    Flame,
    InverseConical,
    TendFlame,
}

impl Shape {
    /// `ratio` is the relative position along the parent, 0 at the base.
    pub fn ratio(self, ratio: f32) -> f32 {
        let r = if ratio.is_nan() { 0. } else { ratio.clamp(0., 1.) };
        match self {
            Shape::Conical => 0.2 + 0.8 * r,
            Shape::Spherical => 0.2 + 0.8 * (std::f32::consts::PI * r).sin(),
            Shape::Hemispherical => 0.2 + 0.8 * (0.5 * std::f32::consts::PI * r).sin(),
            Shape::Cylindrical => 1.,
            Shape::TaperedCylindrical => 0.5 + 0.5 * r,
            Shape::Flame if r <= 0.7 => r / 0.7,
            Shape::Flame => (1. - r) / 0.3,
            Shape::InverseConical => 1. - 0.8 * r,
            Shape::TendFlame if r <= 0.7 => 0.5 + 0.5 * r / 0.7,
            Shape::TendFlame => 0.5 + 0.5 * (1. - r) / 0.3,
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeafShape {
    #[default]
    Billboard,
    Oval,
}

/// Parameters of one growth level. Angles are in degrees.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LevelParams {
    pub length: f32,
    pub length_v: f32,
    pub taper: f32,
    pub curve: f32,
    pub curve_v: f32,
    pub curve_res: usize,
    pub down_angle: f32,
    pub down_angle_v: f32,
    pub rotate: f32,
    pub rotate_v: f32,
    /// children spawned on each branch of the previous level
    pub branches: usize,
    /// Weber–Penn clone splitting. Read and validated, but every section
    /// grows a single child so no split is ever taken.
    #[serde(default)]
    pub seg_splits: f32,
    #[serde(default)]
    pub split_angle: f32,
    #[serde(default)]
    pub split_angle_v: f32,
}

impl LevelParams {
    fn floats(&self) -> [(&'static str, f32); 12] {
        [
            ("length", self.length),
            ("length_v", self.length_v),
            ("taper", self.taper),
            ("curve", self.curve),
            ("curve_v", self.curve_v),
            ("down_angle", self.down_angle),
            ("down_angle_v", self.down_angle_v),
            ("rotate", self.rotate),
            ("rotate_v", self.rotate_v),
            ("seg_splits", self.seg_splits),
            ("split_angle", self.split_angle),
            ("split_angle_v", self.split_angle_v),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub shape: Shape,
    pub base_size: f32,
    pub scale: f32,
    pub scale_v: f32,
    pub trunk_scale: f32,
    pub trunk_scale_v: f32,
    pub ratio: f32,
    pub ratio_power: f32,
    pub leaves: f32,
    #[serde(default)]
    pub leaf_shape: LeafShape,
    pub leaf_scale: f32,
    pub leaf_scale_x: f32,
    pub quality: f32,
    pub levels: Vec<LevelParams>,
}

impl Default for TreeParams {
    /// A three level deciduous tree.
    fn default() -> Self {
        Self {
            shape: Shape::TendFlame,
            base_size: 0.4,
            scale: 13.,
            scale_v: 3.,
            trunk_scale: 1.,
            trunk_scale_v: 0.,
            ratio: 0.015,
            ratio_power: 1.2,
            leaves: 25.,
            leaf_shape: LeafShape::Billboard,
            leaf_scale: 0.17,
            leaf_scale_x: 1.,
            quality: 1.,
            levels: vec![
                LevelParams {
                    length: 1.,
                    length_v: 0.,
                    taper: 1.,
                    curve: 0.,
                    curve_v: 20.,
                    curve_res: 3,
                    down_angle: 0.,
                    down_angle_v: 0.,
                    rotate: 0.,
                    rotate_v: 0.,
                    branches: 1,
                    seg_splits: 0.,
                    split_angle: 0.,
                    split_angle_v: 0.,
                },
                LevelParams {
                    length: 0.3,
                    length_v: 0.,
                    taper: 1.,
                    curve: -40.,
                    curve_v: 50.,
                    curve_res: 5,
                    down_angle: 60.,
                    down_angle_v: -50.,
                    rotate: 140.,
                    rotate_v: 0.,
                    branches: 30,
                    seg_splits: 0.,
                    split_angle: 0.,
                    split_angle_v: 0.,
                },
                LevelParams {
                    length: 0.6,
                    length_v: 0.,
                    taper: 1.,
                    curve: -40.,
                    curve_v: 75.,
                    curve_res: 3,
                    down_angle: 45.,
                    down_angle_v: 10.,
                    rotate: 140.,
                    rotate_v: 0.,
                    branches: 15,
                    seg_splits: 0.,
                    split_angle: 0.,
                    split_angle_v: 0.,
                },
            ],
        }
    }
}

impl TreeParams {
    /// A single straight trunk without branches nor leaves.
    pub fn trunk_only() -> Self {
        let mut params = Self::default();
        params.levels.truncate(1);
        params.levels[0].branches = 0;
        params
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.levels.is_empty() || self.levels.len() > MAX_LEVELS {
            return Err(ConfigError::LevelCount {
                got: self.levels.len(),
                max: MAX_LEVELS,
            });
        }
        if let Some(level) = self.levels.iter().position(|l| l.curve_res == 0) {
            return Err(ConfigError::CurveResolution { level });
        }
        if !(self.quality > 0.) {
            return Err(ConfigError::Quality(self.quality));
        }
        let globals = [
            ("base_size", self.base_size),
            ("scale", self.scale),
            ("scale_v", self.scale_v),
            ("trunk_scale", self.trunk_scale),
            ("trunk_scale_v", self.trunk_scale_v),
            ("ratio", self.ratio),
            ("ratio_power", self.ratio_power),
            ("leaves", self.leaves),
            ("leaf_scale", self.leaf_scale),
            ("leaf_scale_x", self.leaf_scale_x),
            ("quality", self.quality),
        ];
        if let Some((name, _)) = globals.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigError::NonFinite {
                field: name.to_string(),
            });
        }
        for (i, level) in self.levels.iter().enumerate() {
            if let Some((name, _)) = level.floats().iter().find(|(_, v)| !v.is_finite()) {
                return Err(ConfigError::NonFinite {
                    field: format!("levels[{i}].{name}"),
                });
            }
        }
        Ok(())
    }

    pub fn leaf_length(&self) -> f32 {
        self.leaf_scale / self.quality.sqrt()
    }

    pub fn leaf_width(&self) -> f32 {
        self.leaf_scale * self.leaf_scale_x / self.quality.sqrt()
    }
}

/// `mean ± variance`, uniformly.
struct Varied {
    mean: f32,
    variance: f32,
}

impl Varied {
    fn new(mean: f32, variance: f32) -> Self {
        Self { mean, variance }
    }
}

impl Distribution<f32> for Varied {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f32 {
        let v = self.variance.abs();
        if v == 0. {
            self.mean
        } else {
            self.mean + rng.gen_range(-v..=v)
        }
    }
}

/// Where and how a branch starts.
#[derive(Copy, Clone, Debug)]
struct BranchStart {
    position: Vec3,
    axis: Vec3,
    /// axis the branch bends around
    rotation_axis: Vec3,
    depth: usize,
    parent_length: f32,
    parent_radius: f32,
    /// distance from the parent's base
    offset: f32,
    parent: Option<usize>,
}

/// Growth state for one tree: the arenas under construction and the values
/// sampled once per tree.
struct Grower<'a, R: Rng + ?Sized> {
    params: &'a TreeParams,
    rng: &'a mut R,
    tree: Tree,
    scale: f32,
    trunk_scale: f32,
    base_length: f32,
}

impl Tree {
    /// Grow a whole tree from a single trunk rooted at the origin, growing along +Y.
    pub fn generate<R: Rng + ?Sized>(params: &TreeParams, rng: &mut R) -> Result<Tree, ConfigError> {
        params.validate()?;
        let scale = rng.sample(Varied::new(params.scale, params.scale_v));
        let trunk_scale = rng.sample(Varied::new(params.trunk_scale, params.trunk_scale_v));
        let mut grower = Grower {
            params,
            rng,
            tree: Tree {
                leaf_shape: params.leaf_shape,
                ..Tree::new()
            },
            scale,
            trunk_scale,
            base_length: params.base_size * scale,
        };
        grower.generate_branch(BranchStart {
            position: Vec3::ZERO,
            axis: Vec3::Y,
            rotation_axis: Vec3::X,
            depth: 0,
            parent_length: 0.,
            parent_radius: 0.,
            offset: 0.,
            parent: None,
        });
        let tree = grower.tree;
        info!(
            sections = tree.sections.len(),
            branches = tree.branches.len(),
            leaves = tree.leaves.len(),
            "grew tree"
        );
        Ok(tree)
    }
}

impl<R: Rng + ?Sized> Grower<'_, R> {
    fn generate_branch(&mut self, start: BranchStart) {
        let params = self.params;
        let depth = start.depth;
        let level = &params.levels[depth];

        let length_var = self.rng.sample(Varied::new(level.length, level.length_v));
        let length = match depth {
            0 => self.scale * length_var,
            1 => {
                let ratio = (start.parent_length - start.offset)
                    / (start.parent_length - self.base_length);
                start.parent_length * length_var * params.shape.ratio(ratio)
            }
            _ => length_var * (start.parent_length - 0.6 * start.offset),
        }
        .max(0.);

        let base_radius = if depth == 0 {
            length * params.ratio * self.trunk_scale
        } else if start.parent_length > 0. {
            start.parent_radius * (length / start.parent_length).powf(params.ratio_power)
        } else {
            0.
        };
        let tip_radius = base_radius * (1. - level.taper);

        let root = self.tree.sections.len();
        self.tree.branches.push(Branch {
            root,
            parent: start.parent,
            depth,
            length,
            base_radius,
            tip_radius,
            offset: start.offset,
        });

        let chain = self.emit_sections(&start, length, base_radius, tip_radius);
        let segment = length / level.curve_res as f32;
        if depth == 0 {
            self.tree.midpoint = self.point_at(&chain, segment, 0.5 * length).0;
        }
        debug!(root, depth, length, base_radius, "branch");

        if depth + 1 < params.levels.len() {
            self.generate_children(&start, &chain, length, base_radius);
        } else if depth > 0 {
            self.generate_leaves(&start, &chain, length, root);
        }
    }

    /// Lay down `curve_res + 1` rings, bending the axis a little at each step.
    fn emit_sections(
        &mut self,
        start: &BranchStart,
        length: f32,
        base_radius: f32,
        tip_radius: f32,
    ) -> SmallVec<[usize; 16]> {
        let params = self.params;
        let level = &params.levels[start.depth];
        let res = level.curve_res;
        let segment = length / res as f32;
        let mut axis = start.axis.try_normalize().unwrap_or(Vec3::Y);
        let mut position = start.position;
        let mut chain = SmallVec::new();

        for i in 0..=res {
            let t = i as f32 / res as f32;
            let id = self.tree.push_section(CrossSection {
                radius: base_radius * (1. - t) + tip_radius * t,
                position,
                axis,
                children: SmallVec::new(),
                depth: start.depth,
            });
            if let Some(&previous) = chain.last() {
                self.tree.link(previous, id);
            }
            chain.push(id);

            if i < res {
                position += segment * axis;
                let angle = self.rng.sample(Varied::new(level.curve, level.curve_v)) / res as f32;
                axis = rotate_around(axis, start.rotation_axis, angle.to_radians())
                    .try_normalize()
                    .unwrap_or(axis);
            }
        }
        chain
    }

    /// Point and growth direction at `offset` from the base of a branch.
    fn point_at(&self, chain: &[usize], segment: f32, offset: f32) -> (Vec3, Vec3) {
        let sections = &self.tree.sections;
        let last = chain.len() - 1;
        if segment <= 0. || last == 0 {
            let s = &sections[chain[0]];
            return (s.position, s.axis);
        }
        let steps = (offset / segment).max(0.);
        let i = (steps.floor() as usize).min(last - 1);
        let (a, b) = (&sections[chain[i]], &sections[chain[i + 1]]);
        let t = (steps - i as f32).clamp(0., 1.);
        (a.position.lerp(b.position, t), a.axis)
    }

    fn child_count(&self, start: &BranchStart, length: f32) -> usize {
        let level = &self.params.levels[start.depth];
        let next = &self.params.levels[start.depth + 1];
        let branches = next.branches as f32;
        let count = match start.depth {
            0 => branches,
            1 if start.parent_length > 0. && level.length > 0. => {
                branches * (0.2 + 0.8 * (length / start.parent_length) / level.length)
            }
            1 => branches,
            _ if start.parent_length > 0. => {
                branches * (1. - 0.5 * start.offset / start.parent_length)
            }
            _ => branches,
        };
        count.round().max(0.) as usize
    }

    fn generate_children(
        &mut self,
        start: &BranchStart,
        chain: &[usize],
        length: f32,
        base_radius: f32,
    ) {
        let params = self.params;
        let next = &params.levels[start.depth + 1];
        let count = self.child_count(start, length);
        let segment = length / params.levels[start.depth].curve_res as f32;
        let begin = if start.depth == 0 {
            self.base_length.min(length)
        } else {
            0.
        };
        let span = length - begin;
        let axis = self.tree.sections[chain[0]].axis;
        let mut current_rotation = orthogonal_part(start.rotation_axis, axis)
            .unwrap_or_else(|| axis.any_orthonormal_vector());

        for i in 0..count {
            let offset = begin + span * (i as f32 + 1.) / (count as f32 + 1.);
            let (position, tangent) = self.point_at(chain, segment, offset);

            let rotate = self.rng.sample(Varied::new(next.rotate, next.rotate_v));
            current_rotation = orthogonal_part(current_rotation, tangent)
                .unwrap_or_else(|| tangent.any_orthonormal_vector());
            current_rotation = rotate_around(current_rotation, tangent, rotate.to_radians());
            let rotation_axis = current_rotation
                .cross(tangent)
                .try_normalize()
                .unwrap_or_else(|| tangent.any_orthonormal_vector());

            let down = if next.down_angle_v > 0. {
                self.rng.sample(Varied::new(next.down_angle, next.down_angle_v))
            } else {
                let ratio = if span > 0. { (length - offset) / span } else { 0. };
                next.down_angle + next.down_angle_v * (1. - 2. * Shape::Conical.ratio(ratio))
            };
            let child_axis = rotate_around(tangent, rotation_axis, down.to_radians());

            self.generate_branch(BranchStart {
                position,
                axis: child_axis,
                rotation_axis,
                depth: start.depth + 1,
                parent_length: length,
                parent_radius: base_radius,
                offset,
                parent: Some(chain[0]),
            });
        }
    }

    fn generate_leaves(&mut self, start: &BranchStart, chain: &[usize], length: f32, root: usize) {
        let params = self.params;
        let fraction = if start.parent_length > 0. {
            start.offset / start.parent_length
        } else {
            0.
        };
        let count =
            (params.leaves * params.quality * Shape::Spherical.ratio(fraction)).round().max(0.) as usize;
        if count == 0 {
            return;
        }

        let segment = length / params.levels[start.depth].curve_res as f32;
        let center = self.point_at(chain, segment, 0.5 * length).0;
        let main_radius = (0.5 * length).max(1e-3);
        let bulge_direction = self.rng.sample(UniformSphere {
            center: Vec3::ZERO,
            radius: 1.,
        });
        let bulge_offset = 0.5 * main_radius * self.rng.gen_range(0f32..1f32);
        let anchor = self.tree.midpoint;
        let notch_radius = ((center - anchor).length() - 0.5 * main_radius).max(0.);
        let sdf = BranchSdf {
            main: Sphere::new(center, main_radius),
            additive: Sphere::new(center + bulge_offset * bulge_direction, 0.6 * main_radius),
            subtractive: Sphere::new(anchor, notch_radius),
            smoothing: 0.25 * main_radius,
        };
        let cluster = self.tree.clusters.len();
        self.tree.clusters.push(sdf);

        let shell = UniformSphere {
            center,
            radius: 2. * sdf.bounding_radius(),
        };
        let (leaf_length, leaf_width) = (params.leaf_length(), params.leaf_width());
        for _ in 0..count {
            let origin = self.rng.sample(&shell);
            let leaf = place_leaf(&sdf, origin, (leaf_length, leaf_width), root, cluster);
            self.tree.leaves.push(leaf);
        }
    }
}

/// March from `origin` onto the cluster envelope and put a leaf there. A
/// miss yields an empty leaf at the origin that meshing skips.
fn place_leaf(sdf: &BranchSdf, origin: Vec3, (length, width): (f32, f32), branch: usize, cluster: usize) -> Leaf {
    match sdf.raymarch(origin) {
        Some(hit) => Leaf {
            position: hit,
            axis: sdf.normal(hit),
            length,
            width,
            branch,
            cluster,
        },
        None => {
            warn!(branch, cluster, ?origin, "leaf raymarch missed, using an empty leaf");
            Leaf {
                position: Vec3::ZERO,
                axis: Vec3::Y,
                length: 0.,
                width: 0.,
                branch,
                cluster,
            }
        }
    }
}
