//! Background octant loader
//!
//! A single named OS thread drives a current-thread tokio runtime. The worker
//! sleeps on a channel until the traversal signals queued work, then drains
//! the pending set batch by batch in priority order. Loaded geometry goes
//! into the [`LoadedMeshCache`]; octree nodes are never touched here.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use tokio::sync::mpsc;

use crate::core::error::Error;
use crate::core::types::{Result, Uuid};
use crate::points::{MeshFactory, OctantMesh, PointAccessor};
use crate::streaming::cache::{dispose_all, LoadedMeshCache, LoadedOctant};
use crate::streaming::disk_io::OctantStore;
use crate::streaming::pending::PendingSet;

/// Messages understood by the worker
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoaderSignal {
    /// New work was queued
    Wake,
    /// Stop after the current octant
    Shutdown,
}

/// Running totals, updated by the worker
#[derive(Debug, Default)]
pub struct LoaderStats {
    loaded: AtomicU64,
    failed: AtomicU64,
    points_loaded: AtomicU64,
    batches: AtomicU64,
}

/// Point-in-time copy of [`LoaderStats`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoaderStatsSnapshot {
    pub loaded: u64,
    pub failed: u64,
    pub points_loaded: u64,
    pub batches: u64,
}

impl LoaderStats {
    pub fn snapshot(&self) -> LoaderStatsSnapshot {
        LoaderStatsSnapshot {
            loaded: self.loaded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            points_loaded: self.points_loaded.load(Ordering::Relaxed),
            batches: self.batches.load(Ordering::Relaxed),
        }
    }

    fn record_loaded(&self, points: u32) {
        self.loaded.fetch_add(1, Ordering::Relaxed);
        self.points_loaded.fetch_add(points as u64, Ordering::Relaxed);
    }

    fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }
}

/// Everything the worker needs to load octants
pub struct LoaderContext<A: PointAccessor, M> {
    pub store: OctantStore,
    pub accessor: Arc<A>,
    pub factory: MeshFactory<A, M>,
    pub pending: Arc<PendingSet>,
    pub cache: Arc<LoadedMeshCache<M>>,
    pub stats: Arc<LoaderStats>,
    /// Octants claimed per batch
    pub batch_size: usize,
}

impl<A: PointAccessor, M: OctantMesh> LoaderContext<A, M> {
    /// Load up to `batch_size` queued octants, highest priority first.
    ///
    /// Returns the number of octants processed, failed ones included. A
    /// failing octant is logged and marked failed; the rest of the batch
    /// still loads.
    pub async fn load_batch(&self) -> usize {
        let batch = self.pending.take_batch(self.batch_size);
        if batch.is_empty() {
            return 0;
        }

        log::debug!("Loading batch of {} octants", batch.len());
        self.stats.batches.fetch_add(1, Ordering::Relaxed);

        for (guid, _) in &batch {
            match self.load_octant(*guid).await {
                Ok(loaded) => {
                    let points = loaded.point_count;
                    if self.finish_octant(*guid, loaded) {
                        self.stats.record_loaded(points);
                    }
                }
                Err(e) => {
                    if e.is_node_local() {
                        log::warn!("Failed to load octant {}: {}", guid, e);
                    } else {
                        log::error!("Failed to load octant {}: {}", guid, e);
                    }
                    self.pending.mark_failed(guid);
                    self.stats.record_failed();
                }
            }
        }

        batch.len()
    }

    /// Move a loaded octant from the pending set into the cache.
    ///
    /// The cache insert happens under the pending entry's lock, so the octant
    /// is never renderable without geometry and a concurrent reset cannot
    /// orphan the entry. Returns `false` and disposes the meshes when the
    /// octant stopped being pending while it was read.
    pub(crate) fn finish_octant(&self, guid: Uuid, loaded: LoadedOctant<M>) -> bool {
        let mut slot = Some(loaded);
        self.pending.complete(&guid, || {
            if let Some(loaded) = slot.take() {
                self.cache.insert(guid, loaded);
            }
        });

        match slot {
            Some(stale) => {
                log::trace!("Dropping octant {}, no longer pending", guid);
                dispose_all(&stale.meshes);
                false
            }
            None => true,
        }
    }

    /// Read, decode and mesh a single octant
    pub async fn load_octant(&self, guid: Uuid) -> Result<LoadedOctant<M>> {
        let points = self.store.load_points(guid, self.accessor.as_ref()).await?;
        let point_count = u32::try_from(points.len())
            .map_err(|_| Error::Streaming(format!("octant {} has too many points", guid)))?;
        let meshes = (self.factory)(self.accessor.as_ref(), points);
        Ok(LoadedOctant::new(meshes, point_count))
    }
}

/// Handle to the background loader thread
pub struct StreamingLoader {
    signal_tx: mpsc::UnboundedSender<LoaderSignal>,
    worker: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    stats: Arc<LoaderStats>,
}

impl StreamingLoader {
    /// Start the loader thread
    pub fn spawn<A, M>(context: LoaderContext<A, M>) -> Result<Self>
    where
        A: PointAccessor,
        M: OctantMesh,
    {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let running = Arc::new(AtomicBool::new(true));
        let stats = Arc::clone(&context.stats);

        let worker_running = Arc::clone(&running);
        let worker = std::thread::Builder::new()
            .name("octant-loader".to_string())
            .spawn(move || {
                runtime.block_on(Self::worker_loop(context, signal_rx, worker_running));
            })?;

        Ok(Self {
            signal_tx,
            worker: Some(worker),
            running,
            stats,
        })
    }

    async fn worker_loop<A, M>(
        context: LoaderContext<A, M>,
        mut signal_rx: mpsc::UnboundedReceiver<LoaderSignal>,
        running: Arc<AtomicBool>,
    ) where
        A: PointAccessor,
        M: OctantMesh,
    {
        log::info!("Octant loader started (batch size {})", context.batch_size);

        'outer: while let Some(signal) = signal_rx.recv().await {
            if signal == LoaderSignal::Shutdown {
                break;
            }

            // Coalesce wake-ups that piled up while we were busy
            while let Ok(signal) = signal_rx.try_recv() {
                if signal == LoaderSignal::Shutdown {
                    break 'outer;
                }
            }

            while running.load(Ordering::Acquire) {
                if context.load_batch().await == 0 {
                    break;
                }
                tokio::task::yield_now().await;
            }

            if !running.load(Ordering::Acquire) {
                break;
            }
        }

        running.store(false, Ordering::Release);
        log::info!("Octant loader stopped");
    }

    /// Wake the worker; call after queuing new octants
    pub fn notify(&self) {
        if self.signal_tx.send(LoaderSignal::Wake).is_err() {
            log::debug!("Octant loader is not running, wake-up dropped");
        }
    }

    /// Stop the worker and wait for the thread to exit
    pub fn shutdown(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };

        self.running.store(false, Ordering::Release);
        let _ = self.signal_tx.send(LoaderSignal::Shutdown);

        if worker.join().is_err() {
            log::error!("Octant loader thread panicked");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> LoaderStatsSnapshot {
        self.stats.snapshot()
    }
}

impl Drop for StreamingLoader {
    fn drop(&mut self) {
        self.shutdown();
    }
}
