//! Background job pools for chunk generation and meshing
//!
//! Jobs are keyed by chunk; a key is either idle or has exactly one job
//! queued or running. Cancelled keys are shared with the workers so a job
//! that has not started yet is skipped, and any result that still arrives
//! for a cancelled key is dropped in `poll_results` before the manager sees
//! it.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender, TryRecvError, TrySendError, bounded};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;

use crate::core::block::BlockId;
use crate::core::chunk::{Chunk, ChunkDims, ChunkKey};
use crate::core::vertex::ChunkGeometry;
use crate::render::mesher::VoxelMesher;
use crate::world::generator::WorldGen;

/// What came back from a worker for one key.
pub enum JobOutcome<R> {
    Done(R),
    /// Cancelled before the worker started it.
    Skipped,
    /// The job panicked; the message is kept for logging.
    Failed(String),
}

pub struct JobResult<R> {
    pub key: ChunkKey,
    pub outcome: JobOutcome<R>,
}

/// Fixed set of worker threads running one kind of keyed job.
pub struct WorkerPool<J, R> {
    request_tx: Option<Sender<(ChunkKey, J)>>,
    result_rx: Receiver<JobResult<R>>,
    pending: FxHashSet<ChunkKey>,
    cancelled: Arc<Mutex<FxHashSet<ChunkKey>>>,
    capacity: usize,
    workers: Vec<JoinHandle<()>>,
}

impl<J, R> WorkerPool<J, R>
where
    J: Send + 'static,
    R: Send + 'static,
{
    pub fn new<F>(name: &str, worker_count: usize, handler: F) -> Self
    where
        F: Fn(ChunkKey, J) -> R + Send + Sync + 'static,
    {
        let worker_count = worker_count.max(1);
        // Results never outnumber in-flight jobs, so neither side blocks
        let capacity = worker_count * 4;
        let (request_tx, request_rx) = bounded::<(ChunkKey, J)>(capacity);
        let (result_tx, result_rx) = bounded::<JobResult<R>>(capacity);
        let cancelled = Arc::new(Mutex::new(FxHashSet::default()));
        let handler = Arc::new(handler);

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let rx = request_rx.clone();
            let tx = result_tx.clone();
            let cancelled = Arc::clone(&cancelled);
            let handler = Arc::clone(&handler);

            let spawned = thread::Builder::new()
                .name(format!("{}-{}", name, worker_id))
                .spawn(move || {
                    while let Ok((key, job)) = rx.recv() {
                        let outcome = if cancelled.lock().contains(&key) {
                            JobOutcome::Skipped
                        } else {
                            match catch_unwind(AssertUnwindSafe(|| handler(key, job))) {
                                Ok(result) => JobOutcome::Done(result),
                                Err(payload) => JobOutcome::Failed(panic_message(payload)),
                            }
                        };
                        if tx.send(JobResult { key, outcome }).is_err() {
                            // Owner is gone
                            break;
                        }
                    }
                });
            match spawned {
                Ok(handle) => workers.push(handle),
                Err(e) => tracing::error!("Failed to spawn {} worker {}: {}", name, worker_id, e),
            }
        }
        tracing::debug!("Started {} {} workers", workers.len(), name);

        WorkerPool {
            request_tx: Some(request_tx),
            result_rx,
            pending: FxHashSet::default(),
            cancelled,
            capacity,
            workers,
        }
    }

    /// A pool whose threads never started.
    #[cfg(test)]
    pub(crate) fn without_workers() -> Self {
        let (request_tx, _) = bounded(1);
        let (_, result_rx) = bounded(1);
        WorkerPool {
            request_tx: Some(request_tx),
            result_rx,
            pending: FxHashSet::default(),
            cancelled: Arc::new(Mutex::new(FxHashSet::default())),
            capacity: 0,
            workers: Vec::new(),
        }
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn is_pending(&self, key: ChunkKey) -> bool {
        self.pending.contains(&key)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn pending_keys(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.pending.iter().copied()
    }

    pub fn has_capacity(&self) -> bool {
        !self.workers.is_empty() && self.pending.len() < self.capacity
    }

    /// Hands a job to the workers. Refused when the key already has a job in
    /// flight or the pool is saturated; the caller keeps it queued.
    pub fn try_request(&mut self, key: ChunkKey, job: J) -> bool {
        if self.pending.contains(&key) || !self.has_capacity() {
            return false;
        }
        let Some(tx) = &self.request_tx else {
            return false;
        };
        match tx.try_send((key, job)) {
            Ok(()) => {
                self.pending.insert(key);
                true
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Marks an in-flight job as unwanted; its result will never be returned.
    pub fn cancel(&mut self, key: ChunkKey) {
        if self.pending.contains(&key) {
            self.cancelled.lock().insert(key);
        }
    }

    pub fn is_cancelled(&self, key: ChunkKey) -> bool {
        self.cancelled.lock().contains(&key)
    }

    /// Poll for completed jobs (non-blocking).
    /// Returns up to `max_results` results for keys that were not cancelled.
    pub fn poll_results(&mut self, max_results: usize) -> Vec<JobResult<R>> {
        let mut results = Vec::with_capacity(max_results.min(self.pending.len()));

        while results.len() < max_results {
            match self.result_rx.try_recv() {
                Ok(result) => {
                    self.pending.remove(&result.key);
                    if self.cancelled.lock().remove(&result.key) {
                        tracing::trace!(
                            "Dropped result for cancelled chunk {},{}",
                            result.key.cx,
                            result.key.cz
                        );
                        continue;
                    }
                    results.push(result);
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }

        results
    }
}

impl<J, R> Drop for WorkerPool<J, R> {
    fn drop(&mut self) {
        // Closing the request channel ends every worker loop
        self.request_tx.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Generation pool: each job is just the key of the chunk to build.
pub type ChunkLoader = WorkerPool<(), Chunk>;

pub fn spawn_chunk_loader(generator: WorldGen, worker_count: usize) -> ChunkLoader {
    WorkerPool::new("chunk-gen", worker_count, move |key: ChunkKey, ()| {
        generator.generate_chunk(key.cx, key.cz)
    })
}

/// Immutable view of a chunk and its four axis neighbors, enough to mesh it
/// without touching the live chunk map.
pub struct ChunkSnapshot {
    pub center: Chunk,
    /// Same order as `ChunkKey::neighbors`; `None` for unloaded neighbors.
    pub neighbors: [Option<Arc<[BlockId]>>; 4],
    pub epoch: u64,
}

impl ChunkSnapshot {
    pub fn block_at_world(&self, x: i32, y: i32, z: i32) -> BlockId {
        let dims: ChunkDims = self.center.dims;
        if y < 0 || y >= dims.height {
            return BlockId::Air;
        }
        let key = ChunkKey::from_block(x, z, dims.size);
        let lx = x.rem_euclid(dims.size);
        let lz = z.rem_euclid(dims.size);
        if key == self.center.key {
            return self.center.get_block(lx, y, lz);
        }
        self.center
            .key
            .neighbors()
            .iter()
            .position(|n| *n == key)
            .and_then(|i| self.neighbors[i].as_ref())
            .map(|blocks| blocks[dims.index(lx, y, lz)])
            .unwrap_or(BlockId::Air)
    }
}

pub struct MeshBuild {
    pub epoch: u64,
    pub geometry: Option<ChunkGeometry>,
}

pub type MeshLoader = WorkerPool<ChunkSnapshot, MeshBuild>;

pub fn spawn_mesh_loader(mesher: VoxelMesher, worker_count: usize) -> MeshLoader {
    WorkerPool::new(
        "mesh-worker",
        worker_count,
        move |_key: ChunkKey, snapshot: ChunkSnapshot| MeshBuild {
            epoch: snapshot.epoch,
            geometry: mesher.build_geometry(&snapshot.center, |x, y, z| {
                snapshot.block_at_world(x, y, z)
            }),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use std::time::{Duration, Instant};

    fn drain<J: Send + 'static, R: Send + 'static>(
        pool: &mut WorkerPool<J, R>,
        expected: usize,
    ) -> Vec<JobResult<R>> {
        let deadline = Instant::now() + Duration::from_secs(30);
        let mut out = Vec::new();
        while out.len() < expected && Instant::now() < deadline {
            out.extend(pool.poll_results(16));
            thread::sleep(Duration::from_millis(1));
        }
        out
    }

    #[test]
    fn generation_pool_matches_inline_generation() {
        let config = WorldConfig::default();
        let generator = WorldGen::from_config(&config);
        let mut pool = spawn_chunk_loader(generator.clone(), 2);
        let keys = [ChunkKey::new(0, 0), ChunkKey::new(-3, 5), ChunkKey::new(9, -1)];
        for key in keys {
            assert!(pool.try_request(key, ()));
            assert!(!pool.try_request(key, ()), "duplicate job for {:?}", key);
        }
        let results = drain(&mut pool, keys.len());
        assert_eq!(results.len(), keys.len());
        assert_eq!(pool.pending_count(), 0);
        for result in results {
            let JobOutcome::Done(chunk) = result.outcome else {
                panic!("job for {:?} did not finish", result.key);
            };
            let inline = generator.generate_chunk(result.key.cx, result.key.cz);
            assert_eq!(chunk.blocks(), inline.blocks());
        }
    }

    #[test]
    fn cancelled_jobs_never_surface() {
        let mut pool: WorkerPool<u32, u32> = WorkerPool::new("test", 1, |_, job| {
            thread::sleep(Duration::from_millis(5));
            job * 2
        });
        let kept = ChunkKey::new(1, 1);
        let dropped = ChunkKey::new(2, 2);
        assert!(pool.try_request(dropped, 1));
        assert!(pool.try_request(kept, 2));
        pool.cancel(dropped);
        assert!(pool.is_cancelled(dropped));

        let results = drain(&mut pool, 1);
        // Give the cancelled job time to come back and be discarded
        thread::sleep(Duration::from_millis(50));
        let late = pool.poll_results(16);
        assert!(late.is_empty());
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].key, kept);
        assert!(matches!(results[0].outcome, JobOutcome::Done(4)));
        assert_eq!(pool.pending_count(), 0);
        assert!(!pool.is_cancelled(dropped));
        // The key is free again once the stale result was consumed
        assert!(pool.try_request(dropped, 3));
    }

    #[test]
    fn panicking_jobs_are_reported() {
        let mut pool: WorkerPool<u32, u32> = WorkerPool::new("test", 1, |_, job| {
            if job == 0 {
                panic!("bad chunk");
            }
            job
        });
        assert!(pool.try_request(ChunkKey::new(0, 0), 0));
        assert!(pool.try_request(ChunkKey::new(0, 1), 7));
        let results = drain(&mut pool, 2);
        assert_eq!(results.len(), 2);
        let failed = results
            .iter()
            .find(|r| r.key == ChunkKey::new(0, 0))
            .unwrap();
        assert!(matches!(&failed.outcome, JobOutcome::Failed(msg) if msg.contains("bad chunk")));
        let ok = results
            .iter()
            .find(|r| r.key == ChunkKey::new(0, 1))
            .unwrap();
        assert!(matches!(ok.outcome, JobOutcome::Done(7)));
    }

    #[test]
    fn snapshot_lookup_crosses_into_neighbors() {
        let dims = ChunkDims {
            size: 4,
            height: 4,
        };
        let center = Chunk::from_blocks(0, 0, dims, vec![BlockId::Dirt; dims.volume()]);
        let east: Arc<[BlockId]> = vec![BlockId::Stone; dims.volume()].into();
        let snapshot = ChunkSnapshot {
            center,
            neighbors: [Some(east), None, None, None],
            epoch: 3,
        };
        assert_eq!(snapshot.block_at_world(0, 0, 0), BlockId::Dirt);
        assert_eq!(snapshot.block_at_world(4, 1, 2), BlockId::Stone);
        assert_eq!(snapshot.block_at_world(-1, 1, 2), BlockId::Air);
        assert_eq!(snapshot.block_at_world(5, 4, 0), BlockId::Air);
        assert_eq!(snapshot.block_at_world(4, 0, 4), BlockId::Air);
    }
}
