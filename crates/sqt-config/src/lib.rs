//! Configuration system for the spherical quadtree terrain engine.
//!
//! Provides runtime-configurable settings that persist to disk as RON files.
//! Supports CLI overrides via clap, hot-reload detection, and forward/backward
//! compatible serialization.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CameraConfig, Config, DebugConfig, DisplacementConfig, DisplacementKind, TerrainConfig,
    MAX_SUPPORTED_DEPTH, MAX_SUPPORTED_RESOLUTION, WorkerConfig, default_config_dir,
};
pub use error::ConfigError;
