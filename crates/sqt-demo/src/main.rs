//! Headless terrain demo: flies a camera down to the sphere surface and logs
//! how the quadtree refines.
//!
//! Configuration is loaded from `config.ron` and can be overridden via CLI flags.
//! Run with `cargo run -p sqt-demo -- --max-depth 12 --steps 200`.

mod flight;

use std::time::{Duration, Instant};

use clap::Parser;
use sqt_config::{CliArgs, Config, default_config_dir};
use sqt_lod::TerrainManager;
use sqt_mesh::RecordingSink;
use tracing::{error, info, warn};

use crate::flight::Flight;

/// How long to wait for outstanding builds once the flight has landed.
const SETTLE_TIMEOUT: Duration = Duration::from_secs(10);

fn main() {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {e}");
        std::process::exit(2);
    }

    let log_dir = config_dir.join("logs");
    sqt_log::init_logging(Some(&log_dir), cfg!(debug_assertions), Some(&config));

    let mut manager = match TerrainManager::new(config.clone(), RecordingSink::new()) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Failed to create terrain: {e}");
            std::process::exit(1);
        }
    };

    let flight = Flight::new(config.camera.clone());
    let report_every = (config.camera.steps / 10).max(1);
    let mut last_time = 0.0;
    let mut last_viewpoint = flight.viewpoint_at(0);

    for (step, now_s, viewpoint) in flight {
        let stats = manager.update(now_s, &viewpoint);
        if step % report_every == 0 {
            info!(
                "step {step:>4}: altitude {:.5}, {} nodes, {} visible, {} triangles, {} builds pending{}",
                viewpoint.position.length() - 1.0,
                manager.tree().len(),
                manager.sink().visible_keys().len(),
                manager.sink().visible_triangles(),
                manager.pending_builds(),
                stats
                    .and_then(|s| s.leaf_depth)
                    .map(|depth| format!(", split to depth {depth}"))
                    .unwrap_or_default()
            );
        }
        // Give the workers a slice of real time per simulated tick.
        std::thread::sleep(Duration::from_millis(2));
        last_time = now_s;
        last_viewpoint = viewpoint;
    }

    // Let the remaining builds land at the final viewpoint.
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    let tick = f64::from(config.camera.tick_s);
    while manager.pending_builds() > 0 {
        if Instant::now() >= deadline {
            warn!(
                "{} builds still pending after {:?}",
                manager.pending_builds(),
                SETTLE_TIMEOUT
            );
            break;
        }
        last_time += tick;
        manager.update(last_time, &last_viewpoint);
        std::thread::sleep(Duration::from_millis(5));
    }
    manager.update(last_time + tick, &last_viewpoint);

    info!(
        "Landed: {} nodes, {} visible meshes, {} triangles",
        manager.tree().len(),
        manager.sink().visible_keys().len(),
        manager.sink().visible_triangles()
    );
    for (depth, count) in manager.tree().depth_histogram().iter().enumerate() {
        if *count > 0 {
            info!("  depth {depth:>2}: {count} nodes");
        }
    }

    manager.shutdown();
}
