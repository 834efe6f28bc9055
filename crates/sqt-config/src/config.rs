//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Deepest quadtree level the engine will accept. Beyond this the per-depth
/// cell size drops below `f32` vertex precision on a unit sphere.
pub const MAX_SUPPORTED_DEPTH: u8 = 24;

/// Largest accepted `terrain.resolution` before normalization.
pub const MAX_SUPPORTED_RESOLUTION: u32 = 16;

/// Top-level terrain engine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Quadtree and mesh settings consumed by the reconciler.
    pub terrain: TerrainConfig,
    /// Displacement provider selection and noise parameters.
    pub displacement: DisplacementConfig,
    /// Mesh build worker pool settings.
    pub workers: WorkerConfig,
    /// Viewpoint used by the headless demo.
    pub camera: CameraConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Quadtree and mesh configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TerrainConfig {
    /// Maximum subdivision depth below each face root.
    pub max_depth: u8,
    /// Requested grid resolution per cell edge. The mesh uses
    /// [`grid_resolution`](Self::grid_resolution), which is always odd.
    pub resolution: u32,
    /// Target on-screen triangle edge length in pixels.
    pub desired_screen_space_length: f32,
    /// Seconds between two reconciliation passes.
    pub reconciliation_interval_s: f32,
}

/// Which displacement provider perturbs the raw sphere grid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum DisplacementKind {
    /// Identity displacement: the mesh stays on the unit sphere.
    None,
    /// Multi-octave Perlin noise along the vertex normals.
    #[default]
    Perlin,
}

/// Displacement configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DisplacementConfig {
    /// Provider selection.
    pub kind: DisplacementKind,
    /// Seed for the noise lattice.
    pub seed: u64,
    /// Amplitude of the first octave, in unit-sphere radii.
    pub strength: f32,
    /// Frequency of the first octave.
    pub frequency: f32,
    /// Frequency multiplier between successive octaves.
    pub lacunarity: f32,
    /// Amplitude multiplier between successive octaves.
    pub persistence: f32,
    /// Number of octaves to sum.
    pub octaves: u32,
}

/// Mesh build worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Worker thread count. `0` picks a count from the number of CPU cores.
    pub threads: usize,
    /// Maximum number of queued or running builds.
    pub max_in_flight: usize,
}

/// Viewpoint settings for the headless demo flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_deg: f64,
    /// Viewport width in pixels.
    pub viewport_width: u32,
    /// Viewport height in pixels.
    pub viewport_height: u32,
    /// Distance from the sphere centre at the start of the flight.
    pub start_distance: f64,
    /// Distance from the sphere centre at the end of the flight.
    pub end_distance: f64,
    /// Number of simulated ticks.
    pub steps: u32,
    /// Simulated seconds per tick.
    pub tick_s: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for TerrainConfig {
    fn default() -> Self {
        Self {
            max_depth: 10,
            resolution: 7,
            desired_screen_space_length: 10.0,
            reconciliation_interval_s: 0.1,
        }
    }
}

impl Default for DisplacementConfig {
    fn default() -> Self {
        Self {
            kind: DisplacementKind::Perlin,
            seed: 0,
            strength: 0.1,
            frequency: 1.0,
            lacunarity: 2.0,
            persistence: 0.5,
            octaves: 8,
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            max_in_flight: 256,
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_deg: 60.0,
            viewport_width: 1280,
            viewport_height: 720,
            start_distance: 4.0,
            end_distance: 1.002,
            steps: 120,
            tick_s: 0.05,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl TerrainConfig {
    /// Grid resolution actually used for meshes: `resolution * 2 - 1`.
    ///
    /// The triangulation tables need an odd vertex count per edge so every
    /// other boundary vertex lines up with a cell one level coarser.
    pub fn grid_resolution(&self) -> u32 {
        self.resolution.max(2).saturating_mul(2) - 1
    }
}

/// Default on-disk location for `config.ron`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("sqt"))
        .unwrap_or_else(|| PathBuf::from("."))
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            config.validate()?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
        new_config.validate()?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Reject values the terrain engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let terrain = &self.terrain;
        if terrain.max_depth > MAX_SUPPORTED_DEPTH {
            return Err(ConfigError::Invalid {
                field: "terrain.max_depth",
                reason: format!("must be at most {MAX_SUPPORTED_DEPTH}, got {}", terrain.max_depth),
            });
        }
        if !(2..=MAX_SUPPORTED_RESOLUTION).contains(&terrain.resolution) {
            return Err(ConfigError::Invalid {
                field: "terrain.resolution",
                reason: format!(
                    "must be in 2..={MAX_SUPPORTED_RESOLUTION}, got {}",
                    terrain.resolution
                ),
            });
        }
        if !(terrain.desired_screen_space_length > 0.0) {
            return Err(ConfigError::Invalid {
                field: "terrain.desired_screen_space_length",
                reason: format!("must be positive, got {}", terrain.desired_screen_space_length),
            });
        }
        if !(terrain.reconciliation_interval_s >= 0.0) {
            return Err(ConfigError::Invalid {
                field: "terrain.reconciliation_interval_s",
                reason: format!(
                    "must not be negative, got {}",
                    terrain.reconciliation_interval_s
                ),
            });
        }
        if !(self.displacement.lacunarity > 0.0) {
            return Err(ConfigError::Invalid {
                field: "displacement.lacunarity",
                reason: format!("must be positive, got {}", self.displacement.lacunarity),
            });
        }
        if self.workers.max_in_flight == 0 {
            return Err(ConfigError::Invalid {
                field: "workers.max_in_flight",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.camera.fov_y_deg > 0.0 && self.camera.fov_y_deg < 180.0) {
            return Err(ConfigError::Invalid {
                field: "camera.fov_y_deg",
                reason: format!("must be in (0, 180), got {}", self.camera.fov_y_deg),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("max_depth: 10"));
        assert!(ron_str.contains("octaves: 8"));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(terrain: (max_depth: 4))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.terrain.max_depth, 4);
        assert_eq!(config.terrain.resolution, 7);
        assert_eq!(config.displacement, DisplacementConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_displacement_kind_parses() {
        let config: Config = ron::from_str("(displacement: (kind: None))").unwrap();
        assert_eq!(config.displacement.kind, DisplacementKind::None);
    }

    #[test]
    fn test_grid_resolution_is_always_odd() {
        for resolution in 2..20 {
            let terrain = TerrainConfig {
                resolution,
                ..Default::default()
            };
            let grid = terrain.grid_resolution();
            assert_eq!(grid % 2, 1, "grid resolution {grid} must be odd");
            assert_eq!(grid, resolution * 2 - 1);
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.terrain.max_depth = 6;
        config.displacement.seed = 1234;
        config.debug.log_level = "debug".to_string();

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.ron").exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.terrain.resolution = 9;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().terrain.resolution, 9);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_validation_rejects_excessive_depth() {
        let mut config = Config::default();
        config.terrain.max_depth = MAX_SUPPORTED_DEPTH + 1;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "terrain.max_depth",
                ..
            }
        ));
    }

    #[test]
    fn test_validate_rejects_huge_resolution() {
        let mut config = Config::default();
        config.terrain.resolution = MAX_SUPPORTED_RESOLUTION;
        assert!(config.validate().is_ok(), "the cap itself is accepted");

        for resolution in [MAX_SUPPORTED_RESOLUTION + 1, 5000, 3_000_000_000] {
            config.terrain.resolution = resolution;
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::Invalid {
                        field: "terrain.resolution",
                        ..
                    })
                ),
                "resolution {resolution} must be rejected"
            );
        }
    }

    #[test]
    fn test_grid_resolution_saturates() {
        let terrain = TerrainConfig {
            resolution: 3_000_000_000,
            ..Default::default()
        };
        assert_eq!(terrain.grid_resolution(), u32::MAX - 1);
    }

    #[test]
    fn test_validation_rejects_tiny_resolution() {
        let mut config = Config::default();
        config.terrain.resolution = 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_positive_screen_length() {
        let mut config = Config::default();
        config.terrain.desired_screen_space_length = 0.0;
        assert!(config.validate().is_err());
        config.terrain.desired_screen_space_length = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(terrain: (resolution: 0))").unwrap();
        let result = Config::load_or_create(dir.path());
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }
}
