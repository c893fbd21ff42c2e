use glam::Vec3;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

pub mod generation;
pub mod sdf;

pub use generation::{LeafShape, LevelParams, Shape, TreeParams};
pub use sdf::BranchSdf;

/// Initial capacity of the cross-section arena; the other arenas use a fraction of it.
pub const DEFAULT_ARENA_CAPACITY: usize = 256;

/// One ring of a branch tube.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrossSection {
    pub radius: f32,
    pub position: Vec3,
    /// unit growth direction at this ring
    pub axis: Vec3,
    pub children: SmallVec<[usize; 3]>,
    pub depth: usize,
}

/// Per-branch bookkeeping. A branch is identified by its root section.
#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Branch {
    pub root: usize,
    pub parent: Option<usize>,
    pub depth: usize,
    pub length: f32,
    pub base_radius: f32,
    pub tip_radius: f32,
    /// distance from the parent's base at which this branch starts
    pub offset: f32,
}

#[derive(Copy, Clone, Debug, Serialize, Deserialize)]
pub struct Leaf {
    pub position: Vec3,
    pub axis: Vec3,
    pub length: f32,
    pub width: f32,
    /// root section of the owning branch
    pub branch: usize,
    /// index into the cluster arena
    pub cluster: usize,
}

/// Abstract tree: four flat arenas, cross-referenced by index only.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tree {
    pub(crate) sections: Vec<CrossSection>,
    pub(crate) branches: Vec<Branch>,
    pub(crate) leaves: Vec<Leaf>,
    pub(crate) clusters: Vec<BranchSdf>,
    pub(crate) midpoint: Vec3,
    pub(crate) leaf_shape: LeafShape,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    pub fn new() -> Self {
        Self {
            sections: Vec::with_capacity(DEFAULT_ARENA_CAPACITY),
            branches: Vec::with_capacity(DEFAULT_ARENA_CAPACITY / 8),
            leaves: Vec::with_capacity(DEFAULT_ARENA_CAPACITY),
            clusters: Vec::with_capacity(DEFAULT_ARENA_CAPACITY / 8),
            midpoint: Vec3::ZERO,
            leaf_shape: LeafShape::default(),
        }
    }

    pub(crate) fn push_section(&mut self, section: CrossSection) -> usize {
        let id = self.sections.len();
        self.sections.push(section);
        id
    }

    pub(crate) fn link(&mut self, parent: usize, child: usize) {
        self.sections[parent].children.push(child);
    }

    pub fn sections(&self) -> &[CrossSection] {
        &self.sections
    }
    pub fn section(&self, id: usize) -> &CrossSection {
        &self.sections[id]
    }
    pub fn section_count(&self) -> usize {
        self.sections.len()
    }
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }
    pub fn roots(&self) -> impl ExactSizeIterator<Item = usize> + '_ {
        self.branches.iter().map(|b| b.root)
    }
    pub fn leaves(&self) -> &[Leaf] {
        &self.leaves
    }
    pub fn clusters(&self) -> &[BranchSdf] {
        &self.clusters
    }
    /// middle of the trunk, the anchor of every foliage notch
    pub fn midpoint(&self) -> Vec3 {
        self.midpoint
    }
    /// how the leaves should be meshed
    pub fn leaf_shape(&self) -> LeafShape {
        self.leaf_shape
    }
    pub fn children(&self, id: usize) -> &[usize] {
        &self.sections[id].children
    }
    pub fn max_depth(&self) -> Option<usize> {
        self.sections.iter().map(|s| s.depth).max()
    }

    /// Highest ring, used to normalize vertex heights.
    pub fn height(&self) -> f32 {
        self.sections
            .iter()
            .map(|s| s.position.y)
            .fold(0., f32::max)
    }

    /// Section indices of the branch starting at `root`, base to tip.
    pub fn branch_sections(&self, root: usize) -> BranchSections<'_> {
        BranchSections {
            tree: self,
            next: Some(root),
        }
    }
}

pub struct BranchSections<'a> {
    tree: &'a Tree,
    next: Option<usize>,
}

impl Iterator for BranchSections<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<usize> {
        let current = self.next?;
        self.next = self.tree.children(current).first().copied();
        Some(current)
    }
}
