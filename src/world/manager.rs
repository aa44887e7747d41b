//! Chunk lifecycle around a moving viewpoint
//!
//! Each `update` enqueues missing chunks inside the load radius, unloads
//! chunks past the unload radius, then spends a fixed per-tick budget on
//! generation and on meshing. Work runs inline by default or on background
//! pools after `with_workers`; both paths apply at most one budget's worth
//! of results per tick.

use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::config::{ConfigError, WorldConfig};
use crate::core::block::BlockId;
use crate::core::chunk::{Chunk, ChunkDims, ChunkKey, ChunkState};
use crate::core::vertex::ChunkGeometry;
use crate::render::mesher::VoxelMesher;
use crate::world::field::Zone;
use crate::world::generator::WorldGen;
use crate::world::loader::{
    ChunkLoader, ChunkSnapshot, JobOutcome, MeshLoader, spawn_chunk_loader, spawn_mesh_loader,
};

/// Receives geometry as chunks gain, replace or lose it.
pub trait MeshSink {
    fn attach(&mut self, key: ChunkKey, geometry: &Arc<ChunkGeometry>);
    fn detach(&mut self, key: ChunkKey);
}

#[derive(Default, Debug)]
pub struct NullSink;

impl MeshSink for NullSink {
    fn attach(&mut self, _key: ChunkKey, _geometry: &Arc<ChunkGeometry>) {}
    fn detach(&mut self, _key: ChunkKey) {}
}

/// Keeps the latest geometry per chunk.
#[derive(Default, Debug)]
pub struct RecordingSink {
    pub meshes: FxHashMap<ChunkKey, Arc<ChunkGeometry>>,
    pub attaches: usize,
    pub detaches: usize,
}

impl RecordingSink {
    pub fn face_count(&self) -> usize {
        self.meshes.values().map(|g| g.face_count()).sum()
    }
}

impl MeshSink for RecordingSink {
    fn attach(&mut self, key: ChunkKey, geometry: &Arc<ChunkGeometry>) {
        self.attaches += 1;
        self.meshes.insert(key, Arc::clone(geometry));
    }

    fn detach(&mut self, key: ChunkKey) {
        self.detaches += 1;
        self.meshes.remove(&key);
    }
}

#[derive(Clone, Copy, PartialEq, Debug)]
pub struct DebugStats {
    pub loaded_chunks: usize,
    pub pending_generations: usize,
    pub pending_meshes: usize,
    pub in_flight_generations: usize,
    pub in_flight_meshes: usize,
    pub current_chunk_x: i32,
    pub current_chunk_z: i32,
    pub blend: f64,
    pub zone: Zone,
}

struct Workers {
    generation: ChunkLoader,
    meshes: MeshLoader,
}

/// Insertion-ordered key queue; the set answers membership in O(1).
#[derive(Default)]
struct KeyQueue {
    order: VecDeque<ChunkKey>,
    members: FxHashSet<ChunkKey>,
}

impl KeyQueue {
    fn push_back(&mut self, key: ChunkKey) -> bool {
        if self.members.insert(key) {
            self.order.push_back(key);
            true
        } else {
            false
        }
    }

    fn push_front(&mut self, key: ChunkKey) {
        if self.members.insert(key) {
            self.order.push_front(key);
        }
    }

    fn pop(&mut self) -> Option<ChunkKey> {
        let key = self.order.pop_front()?;
        self.members.remove(&key);
        Some(key)
    }

    fn remove(&mut self, key: ChunkKey) -> bool {
        if !self.members.remove(&key) {
            return false;
        }
        self.order.retain(|k| *k != key);
        true
    }

    fn contains(&self, key: ChunkKey) -> bool {
        self.members.contains(&key)
    }

    fn len(&self) -> usize {
        self.members.len()
    }

    fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    fn retain(&mut self, mut keep: impl FnMut(ChunkKey) -> bool) -> usize {
        let before = self.order.len();
        self.order.retain(|key| keep(*key));
        self.members = self.order.iter().copied().collect();
        before - self.order.len()
    }
}

/// Total block lookup over the loaded set.
fn block_in(
    chunks: &FxHashMap<ChunkKey, Chunk>,
    dims: ChunkDims,
    x: i32,
    y: i32,
    z: i32,
) -> BlockId {
    if y < 0 || y >= dims.height {
        return BlockId::Air;
    }
    let key = ChunkKey::from_block(x, z, dims.size);
    match chunks.get(&key) {
        Some(chunk) => chunk.get_block(x.rem_euclid(dims.size), y, z.rem_euclid(dims.size)),
        None => BlockId::Air,
    }
}

fn snapshot_of(chunks: &FxHashMap<ChunkKey, Chunk>, chunk: &Chunk) -> ChunkSnapshot {
    ChunkSnapshot {
        center: chunk.snapshot(),
        neighbors: chunk
            .key
            .neighbors()
            .map(|n| chunks.get(&n).map(|c| c.shared_blocks())),
        epoch: chunk.epoch,
    }
}

pub struct ChunkManager<S: MeshSink = NullSink> {
    config: WorldConfig,
    dims: ChunkDims,
    generator: WorldGen,
    mesher: VoxelMesher,
    chunks: FxHashMap<ChunkKey, Chunk>,
    generation_queue: KeyQueue,
    mesh_queue: KeyQueue,
    workers: Option<Workers>,
    sink: S,
    center: ChunkKey,
    viewpoint: (f64, f64),
    next_epoch: u64,
}

impl ChunkManager<NullSink> {
    pub fn new(config: WorldConfig) -> Result<Self, ConfigError> {
        Self::with_sink(config, NullSink)
    }
}

impl<S: MeshSink> ChunkManager<S> {
    pub fn with_sink(config: WorldConfig, sink: S) -> Result<Self, ConfigError> {
        config.validate()?;
        let generator = WorldGen::from_config(&config);
        let mesher = VoxelMesher::from_config(&config);
        Ok(ChunkManager {
            dims: config.dims(),
            config,
            generator,
            mesher,
            chunks: FxHashMap::default(),
            generation_queue: KeyQueue::default(),
            mesh_queue: KeyQueue::default(),
            workers: None,
            sink,
            center: ChunkKey::default(),
            viewpoint: (0.0, 0.0),
            next_epoch: 0,
        })
    }

    /// Moves generation and meshing onto background threads. Zero keeps
    /// everything inline.
    pub fn with_workers(self, worker_count: usize) -> Self {
        if worker_count == 0 {
            return self;
        }
        let generation = spawn_chunk_loader(self.generator.clone(), worker_count);
        let meshes = spawn_mesh_loader(self.mesher, worker_count);
        self.install_workers(generation, meshes)
    }

    fn install_workers(mut self, generation: ChunkLoader, meshes: MeshLoader) -> Self {
        if generation.worker_count() == 0 || meshes.worker_count() == 0 {
            tracing::warn!("No chunk workers could be started, building on the calling thread");
            return self;
        }
        tracing::info!(
            "Chunk workers: {} generation, {} meshing",
            generation.worker_count(),
            meshes.worker_count()
        );
        self.workers = Some(Workers { generation, meshes });
        self
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    pub fn generator(&self) -> &WorldGen {
        &self.generator
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn center(&self) -> ChunkKey {
        self.center
    }

    pub fn is_threaded(&self) -> bool {
        self.workers.is_some()
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        self.chunks.get(&key)
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.values()
    }

    pub fn loaded_count(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_loaded(&self, key: ChunkKey) -> bool {
        self.chunks.contains_key(&key)
    }

    /// True once nothing is queued or in flight.
    pub fn is_idle(&self) -> bool {
        self.generation_queue.is_empty()
            && self.mesh_queue.is_empty()
            && self.workers.as_ref().is_none_or(|w| {
                w.generation.pending_count() == 0 && w.meshes.pending_count() == 0
            })
    }

    /// Block at a world position; Air outside the vertical range or in
    /// chunks that are not loaded.
    pub fn block_at_world(&self, x: i32, y: i32, z: i32) -> BlockId {
        block_in(&self.chunks, self.dims, x, y, z)
    }

    /// Queues a loaded chunk for remeshing. Keys that are not loaded are ignored.
    pub fn queue_remesh(&mut self, key: ChunkKey) {
        if let Some(chunk) = self.chunks.get_mut(&key) {
            chunk.dirty = true;
            self.mesh_queue.push_back(key);
        }
    }

    fn queue_with_neighbors(&mut self, key: ChunkKey) {
        self.queue_remesh(key);
        for neighbor in key.neighbors() {
            self.queue_remesh(neighbor);
        }
    }

    fn generation_in_flight(&self, key: ChunkKey) -> bool {
        self.workers
            .as_ref()
            .is_some_and(|w| w.generation.is_pending(key) && !w.generation.is_cancelled(key))
    }

    pub fn update(&mut self, vx: f64, vz: f64) {
        let center = ChunkKey::from_world(vx, vz, self.dims.size);
        if center != self.center {
            tracing::debug!("Viewpoint entered chunk {},{}", center.cx, center.cz);
        }
        self.center = center;
        self.viewpoint = (vx, vz);

        self.enqueue_missing(center);
        self.unload_distant(center);
        self.build_queued_chunks();
        self.build_queued_meshes();
    }

    fn enqueue_missing(&mut self, center: ChunkKey) {
        for key in center.square(self.config.load_radius) {
            if self.chunks.contains_key(&key)
                || self.generation_queue.contains(key)
                || self.generation_in_flight(key)
            {
                continue;
            }
            self.generation_queue.push_back(key);
        }
    }

    fn unload_distant(&mut self, center: ChunkKey) {
        let radius = self.config.unload_radius;
        let distant: Vec<ChunkKey> = self
            .chunks
            .keys()
            .filter(|key| key.chebyshev(center) > radius)
            .copied()
            .collect();

        for key in &distant {
            self.unload_chunk(*key);
        }
        if !distant.is_empty() {
            tracing::debug!("Unloaded {} chunks around {},{}", distant.len(), center.cx, center.cz);
        }

        let pruned = self.generation_queue.retain(|key| key.chebyshev(center) <= radius);
        if pruned > 0 {
            tracing::trace!("Pruned {} queued generations", pruned);
        }

        if let Some(workers) = self.workers.as_mut() {
            let stale: Vec<ChunkKey> = workers
                .generation
                .pending_keys()
                .filter(|key| key.chebyshev(center) > radius)
                .collect();
            for key in stale {
                workers.generation.cancel(key);
            }
        }
    }

    fn unload_chunk(&mut self, key: ChunkKey) {
        let Some(chunk) = self.chunks.remove(&key) else {
            return;
        };
        if chunk.mesh.is_some() {
            self.sink.detach(key);
        }
        self.mesh_queue.remove(key);
        if let Some(workers) = self.workers.as_mut() {
            workers.meshes.cancel(key);
        }
        tracing::trace!("Unloaded chunk {},{}", key.cx, key.cz);

        for neighbor in key.neighbors() {
            self.queue_remesh(neighbor);
        }
    }

    fn insert_chunk(&mut self, mut chunk: Chunk) {
        let key = chunk.key;
        self.next_epoch += 1;
        chunk.epoch = self.next_epoch;
        chunk.state = ChunkState::Generated;
        chunk.mesh = None;
        chunk.dirty = true;
        self.chunks.insert(key, chunk);
        tracing::trace!("Loaded chunk {},{}", key.cx, key.cz);
        self.queue_with_neighbors(key);
    }

    fn build_queued_chunks(&mut self) {
        let budget = self.config.max_chunk_builds_per_frame;
        if self.workers.is_some() {
            self.apply_generation_results(budget);
            self.dispatch_generations();
            return;
        }

        let mut built = 0;
        while built < budget {
            let Some(key) = self.generation_queue.pop() else {
                break;
            };
            if self.chunks.contains_key(&key) {
                continue;
            }

            let generator = &self.generator;
            match catch_unwind(AssertUnwindSafe(|| generator.generate_chunk(key.cx, key.cz))) {
                Ok(chunk) => self.insert_chunk(chunk),
                Err(_) => tracing::warn!("Generation of chunk {},{} panicked", key.cx, key.cz),
            }
            built += 1;
        }
    }

    fn apply_generation_results(&mut self, budget: usize) {
        let results = match self.workers.as_mut() {
            Some(workers) => workers.generation.poll_results(budget),
            None => return,
        };

        for result in results {
            let key = result.key;
            match result.outcome {
                JobOutcome::Done(chunk) => {
                    if self.chunks.contains_key(&key)
                        || key.chebyshev(self.center) > self.config.unload_radius
                    {
                        tracing::trace!("Discarded generated chunk {},{}", key.cx, key.cz);
                        continue;
                    }
                    self.insert_chunk(chunk);
                }
                JobOutcome::Failed(message) => {
                    tracing::warn!("Generation of chunk {},{} failed: {}", key.cx, key.cz, message);
                }
                JobOutcome::Skipped => {
                    tracing::trace!("Generation of chunk {},{} skipped", key.cx, key.cz);
                }
            }
        }
    }

    fn dispatch_generations(&mut self) {
        let Some(workers) = self.workers.as_mut() else {
            return;
        };

        let mut deferred = Vec::new();
        while workers.generation.has_capacity() {
            let Some(key) = self.generation_queue.pop() else {
                break;
            };
            if self.chunks.contains_key(&key) {
                continue;
            }
            // An older job for this key (possibly cancelled) has to come back first
            if workers.generation.is_pending(key) {
                deferred.push(key);
                continue;
            }
            if !workers.generation.try_request(key, ()) {
                deferred.push(key);
                break;
            }
        }

        for key in deferred.into_iter().rev() {
            self.generation_queue.push_front(key);
        }
    }

    fn apply_mesh(&mut self, key: ChunkKey, geometry: Option<ChunkGeometry>) {
        let Some(chunk) = self.chunks.get_mut(&key) else {
            return;
        };
        match geometry {
            None => {
                if chunk.mesh.take().is_some() {
                    self.sink.detach(key);
                }
                chunk.state = ChunkState::Meshed;
            }
            Some(geometry) => {
                let geometry = Arc::new(geometry);
                self.sink.attach(key, &geometry);
                chunk.mesh = Some(geometry);
                chunk.state = ChunkState::Active;
            }
        }
        // A result from an older snapshot leaves the chunk queued
        chunk.dirty = self.mesh_queue.contains(key);
    }

    fn build_queued_meshes(&mut self) {
        let budget = self.config.max_mesh_builds_per_frame;
        if self.workers.is_some() {
            self.apply_mesh_results(budget);
            self.dispatch_meshes();
            return;
        }

        let mut built = 0;
        while built < budget {
            let Some(key) = self.mesh_queue.pop() else {
                break;
            };
            let Some(chunk) = self.chunks.get(&key) else {
                continue;
            };

            let chunks = &self.chunks;
            let dims = self.dims;
            let mesher = &self.mesher;
            let result = catch_unwind(AssertUnwindSafe(|| {
                mesher.build_geometry(chunk, |x, y, z| block_in(chunks, dims, x, y, z))
            }));
            match result {
                Ok(geometry) => self.apply_mesh(key, geometry),
                Err(_) => {
                    tracing::warn!("Meshing of chunk {},{} panicked", key.cx, key.cz);
                    self.queue_remesh(key);
                }
            }
            built += 1;
        }
    }

    fn apply_mesh_results(&mut self, budget: usize) {
        let results = match self.workers.as_mut() {
            Some(workers) => workers.meshes.poll_results(budget),
            None => return,
        };

        for result in results {
            let key = result.key;
            match result.outcome {
                JobOutcome::Done(build) => {
                    let current = self.chunks.get(&key).map(|c| c.epoch);
                    if current != Some(build.epoch) {
                        tracing::trace!("Discarded stale mesh for chunk {},{}", key.cx, key.cz);
                        continue;
                    }
                    self.apply_mesh(key, build.geometry);
                }
                JobOutcome::Failed(message) => {
                    tracing::warn!("Meshing of chunk {},{} failed: {}", key.cx, key.cz, message);
                    self.queue_remesh(key);
                }
                JobOutcome::Skipped => {
                    tracing::trace!("Meshing of chunk {},{} skipped", key.cx, key.cz);
                }
            }
        }
    }

    fn dispatch_meshes(&mut self) {
        let Some(workers) = self.workers.as_mut() else {
            return;
        };

        let mut deferred = Vec::new();
        while workers.meshes.has_capacity() {
            let Some(key) = self.mesh_queue.pop() else {
                break;
            };
            let Some(chunk) = self.chunks.get(&key) else {
                continue;
            };
            if workers.meshes.is_pending(key) {
                deferred.push(key);
                continue;
            }
            let snapshot = snapshot_of(&self.chunks, chunk);
            if !workers.meshes.try_request(key, snapshot) {
                deferred.push(key);
                break;
            }
        }

        for key in deferred.into_iter().rev() {
            self.mesh_queue.push_front(key);
        }
    }

    pub fn debug_stats(&self) -> DebugStats {
        let (vx, vz) = self.viewpoint;
        let blend = self.generator.field().blend_factor(vx, vz);
        let (in_flight_generations, in_flight_meshes) = self
            .workers
            .as_ref()
            .map(|w| (w.generation.pending_count(), w.meshes.pending_count()))
            .unwrap_or((0, 0));
        DebugStats {
            loaded_chunks: self.chunks.len(),
            pending_generations: self.generation_queue.len(),
            pending_meshes: self.mesh_queue.len(),
            in_flight_generations,
            in_flight_meshes,
            current_chunk_x: self.center.cx,
            current_chunk_z: self.center.cz,
            blend,
            zone: Zone::from_blend(blend),
        }
    }
}
