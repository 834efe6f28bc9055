//! Command-line argument parsing for the terrain demo.

use std::path::PathBuf;

use clap::Parser;

use crate::{Config, DisplacementKind};

/// Spherical quadtree terrain command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "sqt", about = "Spherical quadtree terrain")]
pub struct CliArgs {
    /// Maximum quadtree depth.
    #[arg(long)]
    pub max_depth: Option<u8>,

    /// Requested grid resolution per cell edge.
    #[arg(long)]
    pub resolution: Option<u32>,

    /// Target on-screen triangle edge length in pixels.
    #[arg(long)]
    pub screen_length: Option<f32>,

    /// Disable terrain displacement (mesh stays on the unit sphere).
    #[arg(long)]
    pub flat: bool,

    /// Noise seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Mesh build worker threads (0 = auto).
    #[arg(long)]
    pub threads: Option<usize>,

    /// Number of simulated ticks in the demo flight.
    #[arg(long)]
    pub steps: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(depth) = args.max_depth {
            self.terrain.max_depth = depth;
        }
        if let Some(resolution) = args.resolution {
            self.terrain.resolution = resolution;
        }
        if let Some(length) = args.screen_length {
            self.terrain.desired_screen_space_length = length;
        }
        if args.flat {
            self.displacement.kind = DisplacementKind::None;
        }
        if let Some(seed) = args.seed {
            self.displacement.seed = seed;
        }
        if let Some(threads) = args.threads {
            self.workers.threads = threads;
        }
        if let Some(steps) = args.steps {
            self.camera.steps = steps;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
