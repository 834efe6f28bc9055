//! Owns the terrain state and drives reconciliation over time.

use std::sync::Arc;

use sqt_config::{Config, DisplacementConfig, DisplacementKind, WorkerConfig};
use sqt_mesh::MeshSink;
use sqt_terrain::{
    AsyncMeshBuilder, BuildError, DisplacementProvider, MaterialParams, MeshBuilder,
    NoDisplacement, PerlinDisplacement, PerlinSettings, SyncMeshBuilder, default_worker_count,
};
use tracing::{debug, info};

use crate::{Context, LodError, QuadTree, ReconcileStats, Reconciler, ReconciliationData, Viewpoint};

/// Creates the mesh builder for a provider and worker settings.
pub type BuilderFactory =
    fn(Arc<dyn DisplacementProvider>, &WorkerConfig) -> Result<Box<dyn MeshBuilder>, BuildError>;

/// Worker pool builder. `threads == 0` sizes the pool from the CPU count.
pub fn async_builder(
    provider: Arc<dyn DisplacementProvider>,
    workers: &WorkerConfig,
) -> Result<Box<dyn MeshBuilder>, BuildError> {
    let threads = match workers.threads {
        0 => default_worker_count(),
        n => n,
    };
    Ok(Box::new(AsyncMeshBuilder::new(
        provider,
        threads,
        workers.max_in_flight,
    )?))
}

/// Inline builder; meshes are produced when results are drained.
pub fn sync_builder(
    provider: Arc<dyn DisplacementProvider>,
    _workers: &WorkerConfig,
) -> Result<Box<dyn MeshBuilder>, BuildError> {
    Ok(Box::new(SyncMeshBuilder::new(provider)))
}

/// Displacement provider selected by the config.
pub fn provider_from_config(config: &DisplacementConfig) -> Arc<dyn DisplacementProvider> {
    match config.kind {
        DisplacementKind::None => Arc::new(NoDisplacement),
        DisplacementKind::Perlin => Arc::new(PerlinDisplacement::new(
            config.seed,
            PerlinSettings {
                strength: config.strength,
                frequency: config.frequency,
                lacunarity: config.lacunarity,
                persistence: config.persistence,
                octaves: config.octaves,
            },
        )),
    }
}

/// Terrain for one planet: quadtree, mesh builds, and the sink they land in.
pub struct TerrainManager<S: MeshSink> {
    config: Config,
    ctx: Context,
    tree: QuadTree,
    provider: Arc<dyn DisplacementProvider>,
    builder: Box<dyn MeshBuilder>,
    builder_factory: BuilderFactory,
    sink: S,
    material: MaterialParams,
    last_reconcile_s: Option<f64>,
}

impl<S: MeshSink> TerrainManager<S> {
    /// Manager building meshes on a worker pool.
    pub fn new(config: Config, sink: S) -> Result<Self, LodError> {
        Self::with_builder(config, sink, async_builder)
    }

    pub fn with_builder(
        config: Config,
        sink: S,
        builder_factory: BuilderFactory,
    ) -> Result<Self, LodError> {
        config.validate()?;
        let ctx = Context::from_config(&config.terrain)?;
        let provider = provider_from_config(&config.displacement);
        let builder = builder_factory(Arc::clone(&provider), &config.workers)?;

        let mut material = MaterialParams::new();
        provider.modify_material(&mut material);

        let mut manager = Self {
            tree: QuadTree::new(ctx.max_depth()),
            ctx,
            provider,
            builder,
            builder_factory,
            sink,
            material,
            last_reconcile_s: None,
            config,
        };
        let stats = manager.reconciler().initialize();
        info!(
            "Terrain initialized: depth {}, grid {}x{}, {} displacement, {} root builds",
            manager.ctx.max_depth(),
            manager.ctx.resolution(),
            manager.ctx.resolution(),
            manager.provider.name(),
            stats.requested
        );
        Ok(manager)
    }

    fn reconciler(&mut self) -> Reconciler<'_> {
        Reconciler::new(
            &self.ctx,
            &mut self.tree,
            self.builder.as_ref(),
            &mut self.sink,
        )
    }

    /// Advance to `now_s` seconds.
    ///
    /// Finished builds are committed every call. A reconcile pass runs when
    /// the configured interval has elapsed and the viewpoint projects onto a
    /// face. Returns the pass statistics if one ran.
    pub fn update(&mut self, now_s: f64, viewpoint: &dyn Viewpoint) -> Option<ReconcileStats> {
        let mut reconciler = self.reconciler();
        if reconciler.commit_finished_builds() > 0 {
            reconciler.refresh_visibility();
        }

        let Some(data) = ReconciliationData::from_viewpoint(&self.ctx, viewpoint) else {
            debug!("Viewpoint {} projects onto no face", viewpoint.position());
            return None;
        };

        let interval = f64::from(self.config.terrain.reconciliation_interval_s);
        if self
            .last_reconcile_s
            .is_some_and(|last| now_s < last + interval)
        {
            return None;
        }
        self.last_reconcile_s = Some(now_s);
        Some(self.reconciler().reconcile(&data))
    }

    /// Replace the config, rebuilding the terrain when a setting it depends
    /// on changed. Returns `true` if the terrain was rebuilt.
    pub fn apply_config(&mut self, config: Config) -> Result<bool, LodError> {
        config.validate()?;
        let rebuild = config.terrain != self.config.terrain
            || config.displacement != self.config.displacement
            || config.workers != self.config.workers;
        if !rebuild {
            self.config = config;
            return Ok(false);
        }

        let ctx = Context::from_config(&config.terrain)?;
        let provider = provider_from_config(&config.displacement);
        let builder = (self.builder_factory)(Arc::clone(&provider), &config.workers)?;

        self.shutdown();
        self.ctx = ctx;
        self.tree = QuadTree::new(self.ctx.max_depth());
        self.provider = provider;
        self.builder = builder;
        self.material = MaterialParams::new();
        self.provider.modify_material(&mut self.material);
        self.last_reconcile_s = None;
        self.config = config;

        let stats = self.reconciler().initialize();
        info!("Terrain rebuilt, {} root builds requested", stats.requested);
        Ok(true)
    }

    /// Cancel outstanding builds, release every mesh and the provider's resources.
    ///
    /// Build workers are joined before the provider is destroyed.
    pub fn shutdown(&mut self) {
        self.reconciler().destroy_all();
        self.builder.shutdown();
        self.provider.destroy();
        debug!("Terrain shut down");
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn context(&self) -> &Context {
        &self.ctx
    }

    pub fn tree(&self) -> &QuadTree {
        &self.tree
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Shader parameters published by the displacement provider.
    pub fn material(&self) -> &MaterialParams {
        &self.material
    }

    /// Builds queued or running.
    pub fn pending_builds(&self) -> u64 {
        self.builder.in_flight_count()
    }
}
