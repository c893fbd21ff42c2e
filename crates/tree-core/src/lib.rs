pub mod error;
pub mod export;
pub mod growing;
pub mod meshing;
pub mod utils;

use serde::{Deserialize, Serialize};

pub use error::{ConfigError, ExportError, GeometryError};
pub use growing::{Branch, BranchSdf, CrossSection, Leaf, LeafShape, LevelParams, Shape, Tree, TreeParams};
pub use meshing::{CompactionStats, GeometryBuffer, MeshConfig};

pub trait TreePipelinePhase: Sized {
    type Previous;
    type Config;
    type Builder;
    type Error;
    fn generate_from(prev: Self::Previous, config: &Self::Config, builder: &mut Self::Builder) -> Result<Self, Self::Error>;
}

pub trait Grow {
    fn grow<Next>(self, config: &Next::Config, builder: &mut Next::Builder) -> Result<Next, Next::Error>
    where
        Next: TreePipelinePhase<Previous = Self>;
}

impl<T> Grow for T {
    fn grow<Next>(
        self,
        config: &<Next as TreePipelinePhase>::Config,
        builder: &mut <Next as TreePipelinePhase>::Builder,
    ) -> Result<Next, <Next as TreePipelinePhase>::Error>
    where
        Next: TreePipelinePhase<Previous = T>,
    {
        Next::generate_from(self, config, builder)
    }
}

pub struct Seed;

impl TreePipelinePhase for Tree {
    type Previous = Seed;
    type Config = TreeParams;
    type Builder = rand::rngs::StdRng;
    type Error = ConfigError;
    fn generate_from(_: Self::Previous, config: &Self::Config, rng: &mut Self::Builder) -> Result<Self, Self::Error> {
        Tree::generate(config, rng)
    }
}

impl TreePipelinePhase for GeometryBuffer {
    type Previous = Tree;
    type Config = MeshConfig;
    type Builder = ();
    type Error = GeometryError;
    fn generate_from(prev: Self::Previous, config: &Self::Config, _: &mut Self::Builder) -> Result<Self, Self::Error> {
        GeometryBuffer::materialize(&prev, config)
    }
}

/// Everything needed to go from a seed to a mesh, as stored in `tree_config.toml`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    pub grow: TreeParams,
    #[serde(default)]
    pub mesh: MeshConfig,
}
