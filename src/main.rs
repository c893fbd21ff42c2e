use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use rand::{rngs::StdRng, SeedableRng};
use tracing::info;
use tracing_subscriber::EnvFilter;

use tree_core::export::save_obj;
use tree_core::{GeometryBuffer, Grow, Seed, Tree, TreeConfig};

#[derive(Parser)]
#[command(name = "tree-mesh")]
#[command(about = "Grow a procedural tree and write it as a Wavefront OBJ mesh", long_about = None)]
struct Cli {
    /// Growth and meshing parameters
    #[arg(long, default_value = "assets/tree_config.toml")]
    config: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long, default_value = "tree.obj")]
    output: PathBuf,

    /// Object name inside the OBJ file
    #[arg(long, default_value = "tree")]
    name: String,

    /// Mesh the branches only
    #[arg(long)]
    no_leaves: bool,
}

fn load_config(path: &Path) -> anyhow::Result<TreeConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    toml::from_str(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = load_config(&cli.config)?;
    if cli.no_leaves {
        config.mesh.leaves = false;
    }

    let mut rng = StdRng::seed_from_u64(cli.seed);
    let tree = Seed
        .grow::<Tree>(&config.grow, &mut rng)
        .context("Invalid growth parameters")?;
    info!(
        seed = cli.seed,
        sections = tree.section_count(),
        branches = tree.branches().len(),
        leaves = tree.leaves().len(),
        "tree grown"
    );

    let mut mesh = tree
        .grow::<GeometryBuffer>(&config.mesh, &mut ())
        .context("Failed to build the tree mesh")?;
    let (vertices, faces) = (mesh.vertex_count(), mesh.face_count());

    save_obj(&mut mesh, &cli.name, &cli.output)
        .with_context(|| format!("Failed to write {}", cli.output.display()))?;
    info!(
        vertices_before = vertices,
        vertices_after = mesh.vertex_count(),
        faces,
        output = %cli.output.display(),
        "mesh exported"
    );
    Ok(())
}
