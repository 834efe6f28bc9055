//! Cell mesh builds: raw grid generation followed by displacement.
//!
//! [`AsyncMeshBuilder`] runs builds on a pool of named worker threads and
//! returns results through a bounded channel drained by the control thread.
//! [`SyncMeshBuilder`] runs the same work inline when drained, for
//! deterministic tests and single-threaded hosts.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam_channel::{Receiver, Sender, TrySendError, bounded};
use dashmap::DashMap;
use glam::DVec2;
use sqt_cubesphere::Face;
use sqt_mesh::{GridBuffers, MeshKey};
use tracing::{debug, warn};

use crate::{CancelToken, DisplacementError, DisplacementProvider};

/// Everything needed to build one cell's mesh.
#[derive(Clone, Debug, PartialEq)]
pub struct BuildRequest {
    pub key: MeshKey,
    pub face: Face,
    /// Cell centre in face-plane coordinates.
    pub offset: DVec2,
    /// Cell half-extent in face-plane coordinates.
    pub scale: f64,
    /// Vertices per grid edge.
    pub resolution: u32,
}

/// A finished (or failed) build. Cancelled builds never produce one.
#[derive(Debug)]
pub struct BuildResult {
    pub key: MeshKey,
    pub outcome: Result<GridBuffers, DisplacementError>,
    /// Build time in microseconds.
    pub build_time_us: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("build queue full ({in_flight} in flight), mesh {key} not queued")]
    QueueFull { key: MeshKey, in_flight: u64 },

    #[error("build workers have shut down")]
    Disconnected,

    #[error("failed to spawn build worker: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Accepts build requests and hands back finished meshes.
pub trait MeshBuilder {
    /// Queue a build. The returned token cancels it.
    fn submit(&self, request: BuildRequest) -> Result<CancelToken, BuildError>;

    /// Cancel a queued or running build. No-op once its result was drained.
    fn cancel(&self, key: MeshKey);

    /// Collect finished builds. Call once per update on the control thread.
    fn drain_results(&self) -> Vec<BuildResult>;

    /// Builds queued or running.
    fn in_flight_count(&self) -> u64;

    /// Cancel outstanding work. Returns once no build is running.
    fn shutdown(&mut self) {}
}

/// Generate the raw grid for `request` and displace it.
pub fn build_mesh_sync(
    request: &BuildRequest,
    provider: &dyn DisplacementProvider,
    cancel: &CancelToken,
) -> Result<GridBuffers, DisplacementError> {
    if cancel.is_cancelled() {
        return Err(DisplacementError::Cancelled);
    }
    let mut buffers = GridBuffers::generate(
        request.face,
        request.offset,
        request.scale,
        request.resolution,
    );
    provider.modify_vertices(&mut buffers, cancel)?;
    Ok(buffers)
}

// A provider panic becomes an error result instead of killing the worker.
fn run_build(
    request: &BuildRequest,
    provider: &dyn DisplacementProvider,
    cancel: &CancelToken,
) -> Result<GridBuffers, DisplacementError> {
    catch_unwind(AssertUnwindSafe(|| build_mesh_sync(request, provider, cancel))).unwrap_or_else(
        |_| {
            Err(DisplacementError::Provider(format!(
                "{} panicked building mesh {}",
                provider.name(),
                request.key
            )))
        },
    )
}

/// Worker count used when none is configured: one per core, minus the control thread.
pub fn default_worker_count() -> usize {
    num_cpus::get().saturating_sub(1).max(1)
}

struct QueuedBuild {
    request: BuildRequest,
    cancel: CancelToken,
}

/// Worker pool for cell mesh builds.
pub struct AsyncMeshBuilder {
    task_sender: Option<Sender<QueuedBuild>>,
    result_receiver: Option<Receiver<BuildResult>>,
    worker_handles: Vec<JoinHandle<()>>,
    /// Cancellation flag per queued or running build.
    active: Arc<DashMap<MeshKey, CancelToken>>,
    in_flight: Arc<AtomicU64>,
    max_in_flight: u64,
}

impl AsyncMeshBuilder {
    /// Spawn `thread_count` workers accepting at most `max_in_flight` builds.
    pub fn new(
        provider: Arc<dyn DisplacementProvider>,
        thread_count: usize,
        max_in_flight: usize,
    ) -> Result<Self, BuildError> {
        let max_in_flight = max_in_flight.max(1);
        let (task_sender, task_receiver) = bounded::<QueuedBuild>(max_in_flight);
        let (result_sender, result_receiver) = bounded::<BuildResult>(max_in_flight * 2);
        let in_flight = Arc::new(AtomicU64::new(0));

        let mut worker_handles = Vec::with_capacity(thread_count.max(1));
        for index in 0..thread_count.max(1) {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let in_flight = Arc::clone(&in_flight);
            let provider = Arc::clone(&provider);

            let handle = std::thread::Builder::new()
                .name(format!("sqt-mesh-worker-{index}"))
                .spawn(move || {
                    while let Ok(queued) = receiver.recv() {
                        if queued.cancel.is_cancelled() {
                            in_flight.fetch_sub(1, Ordering::Relaxed);
                            continue;
                        }

                        let start = Instant::now();
                        let outcome = run_build(&queued.request, provider.as_ref(), &queued.cancel);
                        let elapsed = start.elapsed().as_micros() as u64;

                        let cancelled = queued.cancel.is_cancelled()
                            || matches!(outcome, Err(DisplacementError::Cancelled));
                        let delivered = cancelled
                            || sender
                                .send(BuildResult {
                                    key: queued.request.key,
                                    outcome,
                                    build_time_us: elapsed,
                                })
                                .is_ok();

                        in_flight.fetch_sub(1, Ordering::Relaxed);
                        if !delivered {
                            // Receiver dropped by shutdown.
                            break;
                        }
                    }
                })
                .map_err(BuildError::Spawn)?;
            worker_handles.push(handle);
        }

        debug!(
            "Started {} mesh build workers (max {max_in_flight} in flight)",
            thread_count.max(1)
        );

        Ok(Self {
            task_sender: Some(task_sender),
            result_receiver: Some(result_receiver),
            worker_handles,
            active: Arc::new(DashMap::new()),
            in_flight,
            max_in_flight: max_in_flight as u64,
        })
    }

    /// Cancel every outstanding build.
    pub fn cancel_all(&self) {
        self.active.retain(|_, token| {
            token.cancel();
            false
        });
    }
}

impl MeshBuilder for AsyncMeshBuilder {
    fn submit(&self, request: BuildRequest) -> Result<CancelToken, BuildError> {
        let Some(task_sender) = &self.task_sender else {
            return Err(BuildError::Disconnected);
        };
        let in_flight = self.in_flight.load(Ordering::Relaxed);
        if in_flight >= self.max_in_flight {
            return Err(BuildError::QueueFull {
                key: request.key,
                in_flight,
            });
        }

        let key = request.key;
        let cancel = CancelToken::new();
        if let Some(previous) = self.active.insert(key, cancel.clone()) {
            previous.cancel();
        }
        self.in_flight.fetch_add(1, Ordering::Relaxed);

        let queued = QueuedBuild {
            request,
            cancel: cancel.clone(),
        };
        match task_sender.try_send(queued) {
            Ok(()) => Ok(cancel),
            Err(err) => {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                self.active.remove(&key);
                match err {
                    TrySendError::Full(_) => Err(BuildError::QueueFull {
                        key,
                        in_flight: self.in_flight.load(Ordering::Relaxed),
                    }),
                    TrySendError::Disconnected(_) => Err(BuildError::Disconnected),
                }
            }
        }
    }

    fn cancel(&self, key: MeshKey) {
        if let Some((_, token)) = self.active.remove(&key) {
            token.cancel();
        }
    }

    fn drain_results(&self) -> Vec<BuildResult> {
        let mut results = Vec::new();
        let Some(result_receiver) = &self.result_receiver else {
            return results;
        };
        while let Ok(result) = result_receiver.try_recv() {
            self.active.remove(&result.key);
            if let Err(err) = &result.outcome {
                warn!("Mesh build {} failed: {err}", result.key);
            }
            results.push(result);
        }
        results
    }

    fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    fn shutdown(&mut self) {
        self.cancel_all();
        // Closing both channels lets every worker fall out of its loop,
        // including one blocked on a full result channel.
        self.task_sender.take();
        self.result_receiver.take();
        for handle in self.worker_handles.drain(..) {
            let _ = handle.join();
        }
        self.in_flight.store(0, Ordering::Relaxed);
    }
}

impl Drop for AsyncMeshBuilder {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Builder that performs queued work inline when drained.
pub struct SyncMeshBuilder {
    provider: Arc<dyn DisplacementProvider>,
    queue: Mutex<Vec<QueuedBuild>>,
    paused: AtomicBool,
}

impl SyncMeshBuilder {
    pub fn new(provider: Arc<dyn DisplacementProvider>) -> Self {
        Self {
            provider,
            queue: Mutex::new(Vec::new()),
            paused: AtomicBool::new(false),
        }
    }

    /// While paused, `drain_results` leaves queued builds untouched.
    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Relaxed);
    }

    fn with_queue<R>(&self, f: impl FnOnce(&mut Vec<QueuedBuild>) -> R) -> R {
        match self.queue.lock() {
            Ok(mut guard) => f(&mut *guard),
            Err(poisoned) => f(&mut *poisoned.into_inner()),
        }
    }
}

impl MeshBuilder for SyncMeshBuilder {
    fn submit(&self, request: BuildRequest) -> Result<CancelToken, BuildError> {
        let cancel = CancelToken::new();
        self.with_queue(|queue| {
            for queued in queue.iter().filter(|q| q.request.key == request.key) {
                queued.cancel.cancel();
            }
            queue.push(QueuedBuild {
                request,
                cancel: cancel.clone(),
            });
        });
        Ok(cancel)
    }

    fn cancel(&self, key: MeshKey) {
        self.with_queue(|queue| {
            for queued in queue.iter().filter(|q| q.request.key == key) {
                queued.cancel.cancel();
            }
        });
    }

    fn drain_results(&self) -> Vec<BuildResult> {
        if self.paused.load(Ordering::Relaxed) {
            return Vec::new();
        }
        let queued = self.with_queue(std::mem::take);
        queued
            .into_iter()
            .filter(|q| !q.cancel.is_cancelled())
            .filter_map(|q| {
                let start = Instant::now();
                let outcome = run_build(&q.request, self.provider.as_ref(), &q.cancel);
                if matches!(outcome, Err(DisplacementError::Cancelled)) {
                    return None;
                }
                Some(BuildResult {
                    key: q.request.key,
                    outcome,
                    build_time_us: start.elapsed().as_micros() as u64,
                })
            })
            .collect()
    }

    fn in_flight_count(&self) -> u64 {
        self.with_queue(|queue| queue.iter().filter(|q| !q.cancel.is_cancelled()).count() as u64)
    }

    fn shutdown(&mut self) {
        for queued in self.with_queue(std::mem::take) {
            queued.cancel.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MaterialParams, NoDisplacement, PerlinDisplacement, PerlinSettings};
    use std::time::Duration;

    fn request(key: MeshKey) -> BuildRequest {
        BuildRequest {
            key,
            face: Face::ALL[(key % 6) as usize],
            offset: DVec2::ZERO,
            scale: 1.0,
            resolution: 5,
        }
    }

    fn drain_until(builder: &dyn MeshBuilder, expected: usize) -> Vec<BuildResult> {
        let mut results = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(30);
        while results.len() < expected && Instant::now() < deadline {
            results.extend(builder.drain_results());
            if results.len() < expected {
                std::thread::sleep(Duration::from_millis(5));
            }
        }
        results
    }

    struct PanickingProvider;

    impl DisplacementProvider for PanickingProvider {
        fn modify_vertices(
            &self,
            _buffers: &mut GridBuffers,
            _cancel: &CancelToken,
        ) -> Result<(), DisplacementError> {
            panic!("boom");
        }
        fn modify_material(&self, _material: &mut MaterialParams) {}
        fn destroy(&self) {}
        fn name(&self) -> &'static str {
            "panicking"
        }
    }

    struct SlowProvider;

    impl DisplacementProvider for SlowProvider {
        fn modify_vertices(
            &self,
            _buffers: &mut GridBuffers,
            _cancel: &CancelToken,
        ) -> Result<(), DisplacementError> {
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        }
        fn modify_material(&self, _material: &mut MaterialParams) {}
        fn destroy(&self) {}
        fn name(&self) -> &'static str {
            "slow"
        }
    }

    #[derive(Default)]
    struct CountingProvider {
        running: AtomicU64,
    }

    impl DisplacementProvider for CountingProvider {
        fn modify_vertices(
            &self,
            _buffers: &mut GridBuffers,
            _cancel: &CancelToken,
        ) -> Result<(), DisplacementError> {
            self.running.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(50));
            self.running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        }
        fn modify_material(&self, _material: &mut MaterialParams) {}
        fn destroy(&self) {}
        fn name(&self) -> &'static str {
            "counting"
        }
    }

    #[test]
    fn test_build_mesh_sync_produces_grid() {
        let grid = build_mesh_sync(&request(0), &NoDisplacement, &CancelToken::new()).unwrap();
        assert_eq!(grid.vertex_count(), 25);
    }

    #[test]
    fn test_concurrent_builds_all_complete() {
        let provider = Arc::new(PerlinDisplacement::new(1, PerlinSettings::default()));
        let builder = AsyncMeshBuilder::new(provider, 4, 64).unwrap();

        let mut submitted = 0;
        for key in 0..32 {
            if builder.submit(request(key)).is_ok() {
                submitted += 1;
            }
        }
        let results = drain_until(&builder, submitted);
        assert_eq!(
            results.len(),
            submitted,
            "Should receive all submitted builds: got {}/{submitted}",
            results.len()
        );
        assert!(results.iter().all(|r| r.outcome.is_ok()));
    }

    #[test]
    fn test_queue_full_rejects() {
        let builder = SyncMeshBuilder::new(Arc::new(NoDisplacement));
        assert!(builder.submit(request(1)).is_ok());

        let pool = AsyncMeshBuilder::new(Arc::new(SlowProvider), 1, 1).unwrap();
        let mut rejected = false;
        for key in 0..16 {
            if let Err(BuildError::QueueFull { key: k, .. }) = pool.submit(request(key)) {
                assert_eq!(k, key);
                rejected = true;
            }
        }
        assert!(rejected, "a one-slot pool must reject a burst of submissions");
    }

    #[test]
    fn test_cancelled_build_is_never_delivered() {
        let builder = SyncMeshBuilder::new(Arc::new(NoDisplacement));
        let token = builder.submit(request(3)).unwrap();
        builder.cancel(3);
        assert!(token.is_cancelled());
        assert_eq!(builder.in_flight_count(), 0);
        assert!(builder.drain_results().is_empty());
    }

    #[test]
    fn test_async_cancel_sets_token() {
        let builder = AsyncMeshBuilder::new(Arc::new(NoDisplacement), 1, 8).unwrap();
        let token = builder.submit(request(9)).unwrap();
        builder.cancel(9);
        assert!(token.is_cancelled());
        assert!(!builder.active.contains_key(&9));

        // A cancelled build may already have finished; it is simply not delivered
        // once cancellation is observed before the send.
        std::thread::sleep(Duration::from_millis(50));
        let _ = builder.drain_results();
    }

    #[test]
    fn test_resubmit_cancels_previous_token() {
        let builder = SyncMeshBuilder::new(Arc::new(NoDisplacement));
        let first = builder.submit(request(4)).unwrap();
        let second = builder.submit(request(4)).unwrap();
        assert!(first.is_cancelled());
        assert!(!second.is_cancelled());
        assert_eq!(builder.drain_results().len(), 1);
    }

    #[test]
    fn test_paused_sync_builder_holds_work() {
        let builder = SyncMeshBuilder::new(Arc::new(NoDisplacement));
        builder.set_paused(true);
        builder.submit(request(2)).unwrap();
        assert!(builder.drain_results().is_empty());
        assert_eq!(builder.in_flight_count(), 1);
        builder.set_paused(false);
        assert_eq!(builder.drain_results().len(), 1);
        assert_eq!(builder.in_flight_count(), 0);
    }

    #[test]
    fn test_provider_panic_becomes_error() {
        let builder = AsyncMeshBuilder::new(Arc::new(PanickingProvider), 1, 4).unwrap();
        builder.submit(request(5)).unwrap();
        let results = drain_until(&builder, 1);
        assert_eq!(results.len(), 1);
        assert!(matches!(
            results[0].outcome,
            Err(DisplacementError::Provider(_))
        ));

        // The worker survives and keeps serving.
        builder.submit(request(6)).unwrap();
        assert_eq!(drain_until(&builder, 1).len(), 1);
    }

    #[test]
    fn test_in_flight_count_returns_to_zero() {
        let builder = AsyncMeshBuilder::new(Arc::new(NoDisplacement), 2, 16).unwrap();
        for key in 0..5 {
            builder.submit(request(key)).unwrap();
        }
        let _ = drain_until(&builder, 5);
        let deadline = Instant::now() + Duration::from_secs(10);
        while builder.in_flight_count() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(builder.in_flight_count(), 0);
    }

    #[test]
    fn test_shutdown_joins_workers() {
        let provider = Arc::new(CountingProvider::default());
        let shared: Arc<dyn DisplacementProvider> = provider.clone();
        let mut builder = AsyncMeshBuilder::new(shared, 2, 8).unwrap();
        for key in 0..4 {
            builder.submit(request(key)).unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(10);
        while provider.running.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        assert!(provider.running.load(Ordering::SeqCst) > 0, "a build should be running");

        builder.shutdown();
        assert_eq!(
            provider.running.load(Ordering::SeqCst),
            0,
            "shutdown must wait for running builds"
        );
        assert!(builder.worker_handles.is_empty());
        assert_eq!(builder.in_flight_count(), 0);
        assert!(matches!(
            builder.submit(request(7)),
            Err(BuildError::Disconnected)
        ));
        assert!(builder.drain_results().is_empty());
    }

    #[test]
    fn test_shutdown_with_undrained_results() {
        let mut builder = AsyncMeshBuilder::new(Arc::new(NoDisplacement), 2, 2).unwrap();
        for _ in 0..20 {
            for key in 0..2 {
                let _ = builder.submit(request(key));
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        // The result channel may be full with workers blocked on it.
        builder.shutdown();
        assert!(builder.worker_handles.is_empty());
    }

    #[test]
    fn test_sync_shutdown_cancels_queue() {
        let mut builder = SyncMeshBuilder::new(Arc::new(NoDisplacement));
        let token = builder.submit(request(1)).unwrap();
        builder.shutdown();
        assert!(token.is_cancelled());
        assert_eq!(builder.in_flight_count(), 0);
        assert!(builder.drain_results().is_empty());
    }
}
