//! # Chunk Persistence
//!
//! Where chunk files and named blobs (player inventory, world manifest)
//! live between sessions.
//!
//! ## Design
//!
//! `ChunkStore` is the seam. Three implementations:
//!
//! - `FsChunkStore`: one file per chunk, `chunk_{cx}_{cy}.json`, plus
//!   `{name}` blobs, under a root directory. Writes go to a temporary file
//!   and are renamed into place, so a crash never leaves half a chunk.
//! - `MemoryChunkStore`: a shared map, for tests and throwaway sessions.
//! - `BackgroundStore`: wraps another store and moves writes onto a
//!   dedicated thread.
//!
//! ## Background Ordering
//!
//! A write handed to `BackgroundStore` is parked in a pending map before it
//! is queued. Reads consult the pending map first, so a chunk that is
//! unloaded and immediately reloaded always sees its own last save, even
//! if the writer thread has not reached it yet. A write that fails stays
//! pending and is retried on the next `flush`.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{Condvar, Mutex};
use serde::{Deserialize, Serialize};

use crate::chunk::ChunkCoord;
use crate::error::{StoreError, StoreResult};
use crate::generator::GENERATOR_VERSION;

/// Blob holding the world manifest.
pub const MANIFEST_BLOB: &str = "world.json";

/// Storage backend for chunks and named blobs.
pub trait ChunkStore: Send + Sync {
    /// Reads a chunk. `Ok(None)` if it was never saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load_chunk(&self, coord: ChunkCoord) -> StoreResult<Option<Vec<u8>>>;

    /// Writes a chunk, replacing any previous version.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be performed or queued.
    fn save_chunk(&self, coord: ChunkCoord, bytes: Vec<u8>) -> StoreResult<()>;

    /// Reads a named blob. `Ok(None)` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn load_blob(&self, name: &str) -> StoreResult<Option<Vec<u8>>>;

    /// Writes a named blob.
    ///
    /// # Errors
    ///
    /// Returns an error if the write cannot be performed or queued.
    fn save_blob(&self, name: &str, bytes: Vec<u8>) -> StoreResult<()>;

    /// Blocks until every accepted write is durable.
    ///
    /// # Errors
    ///
    /// Returns an error if some write could not be completed.
    fn flush(&self) -> StoreResult<()>;
}

/// Identity of one stored object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum StoreKey {
    Chunk(ChunkCoord),
    Blob(String),
}

impl StoreKey {
    fn file_name(&self) -> String {
        match self {
            Self::Chunk(c) => format!("chunk_{}_{}.json", c.x, c.y),
            Self::Blob(name) => name.clone(),
        }
    }
}

// =============================================================================
// Filesystem
// =============================================================================

/// Chunk files in a directory.
#[derive(Clone, Debug)]
pub struct FsChunkStore {
    root: PathBuf,
}

impl FsChunkStore {
    /// Opens (creating if needed) a save directory.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the directory cannot be created.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root).map_err(|source| StoreError::Io {
            path: root.clone(),
            source,
        })?;
        Ok(Self { root })
    }

    /// The save directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of a chunk file.
    #[must_use]
    pub fn chunk_path(&self, coord: ChunkCoord) -> PathBuf {
        self.root.join(StoreKey::Chunk(coord).file_name())
    }

    fn read(&self, key: &StoreKey) -> StoreResult<Option<Vec<u8>>> {
        let path = self.root.join(key.file_name());
        match std::fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn write(&self, key: &StoreKey, bytes: &[u8]) -> StoreResult<()> {
        let path = self.root.join(key.file_name());
        let tmp = path.with_extension("json.tmp");
        let io = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        let mut file = std::fs::File::create(&tmp).map_err(io)?;
        file.write_all(bytes).map_err(io)?;
        file.sync_all().map_err(io)?;
        drop(file);
        std::fs::rename(&tmp, &path).map_err(io)
    }
}

impl ChunkStore for FsChunkStore {
    fn load_chunk(&self, coord: ChunkCoord) -> StoreResult<Option<Vec<u8>>> {
        self.read(&StoreKey::Chunk(coord))
    }

    fn save_chunk(&self, coord: ChunkCoord, bytes: Vec<u8>) -> StoreResult<()> {
        self.write(&StoreKey::Chunk(coord), &bytes)
    }

    fn load_blob(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        self.read(&StoreKey::Blob(name.to_string()))
    }

    fn save_blob(&self, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.write(&StoreKey::Blob(name.to_string()), &bytes)
    }

    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

// =============================================================================
// Memory
// =============================================================================

/// In-memory store. Clones share the same contents.
#[derive(Clone, Debug, Default)]
pub struct MemoryChunkStore {
    entries: Arc<Mutex<HashMap<StoreKey, Vec<u8>>>>,
}

impl MemoryChunkStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chunks stored.
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.entries
            .lock()
            .keys()
            .filter(|k| matches!(k, StoreKey::Chunk(_)))
            .count()
    }

    /// Returns true if a chunk has been stored.
    #[must_use]
    pub fn has_chunk(&self, coord: ChunkCoord) -> bool {
        self.entries.lock().contains_key(&StoreKey::Chunk(coord))
    }
}

impl ChunkStore for MemoryChunkStore {
    fn load_chunk(&self, coord: ChunkCoord) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(&StoreKey::Chunk(coord)).cloned())
    }

    fn save_chunk(&self, coord: ChunkCoord, bytes: Vec<u8>) -> StoreResult<()> {
        self.entries.lock().insert(StoreKey::Chunk(coord), bytes);
        Ok(())
    }

    fn load_blob(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        Ok(self.entries.lock().get(&StoreKey::Blob(name.to_string())).cloned())
    }

    fn save_blob(&self, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.entries.lock().insert(StoreKey::Blob(name.to_string()), bytes);
        Ok(())
    }

    fn flush(&self) -> StoreResult<()> {
        Ok(())
    }
}

// =============================================================================
// Background writer
// =============================================================================

struct PendingWrite {
    generation: u64,
    bytes: Arc<Vec<u8>>,
}

#[derive(Default)]
struct Pending {
    writes: HashMap<StoreKey, PendingWrite>,
    failures: HashMap<StoreKey, String>,
    in_flight: usize,
    next_generation: u64,
}

struct Shared {
    pending: Mutex<Pending>,
    idle: Condvar,
}

/// Writer statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BackgroundStats {
    /// Writes accepted.
    pub queued: u64,
    /// Writes completed.
    pub written: u64,
    /// Write attempts that failed.
    pub failed: u64,
}

/// Store wrapper that performs writes on a dedicated thread.
pub struct BackgroundStore<S: ChunkStore + 'static> {
    inner: Arc<S>,
    shared: Arc<Shared>,
    stats: Arc<Mutex<BackgroundStats>>,
    sender: Option<Sender<StoreKey>>,
    writer_handle: Option<JoinHandle<()>>,
}

impl<S: ChunkStore + 'static> BackgroundStore<S> {
    /// Starts the writer thread over `inner`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Io` if the thread cannot be spawned.
    pub fn spawn(inner: S) -> StoreResult<Self> {
        let inner = Arc::new(inner);
        let shared = Arc::new(Shared {
            pending: Mutex::new(Pending::default()),
            idle: Condvar::new(),
        });
        let stats = Arc::new(Mutex::new(BackgroundStats::default()));
        let (sender, receiver) = unbounded();

        let writer_inner = Arc::clone(&inner);
        let writer_shared = Arc::clone(&shared);
        let writer_stats = Arc::clone(&stats);
        let writer_handle = thread::Builder::new()
            .name("quarry-chunk-writer".to_string())
            .spawn(move || Self::writer_loop(&*writer_inner, &writer_shared, &writer_stats, &receiver))
            .map_err(|source| StoreError::Io {
                path: PathBuf::from("<writer thread>"),
                source,
            })?;

        Ok(Self {
            inner,
            shared,
            stats,
            sender: Some(sender),
            writer_handle: Some(writer_handle),
        })
    }

    /// Writer thread main loop. Ends when the sender is dropped.
    fn writer_loop(
        inner: &S,
        shared: &Shared,
        stats: &Mutex<BackgroundStats>,
        receiver: &Receiver<StoreKey>,
    ) {
        for key in receiver {
            let job = shared
                .pending
                .lock()
                .writes
                .get(&key)
                .map(|w| (w.generation, Arc::clone(&w.bytes)));

            let result = job.as_ref().map(|(_, bytes)| match &key {
                StoreKey::Chunk(coord) => inner.save_chunk(*coord, bytes.to_vec()),
                StoreKey::Blob(name) => inner.save_blob(name, bytes.to_vec()),
            });

            let mut pending = shared.pending.lock();
            match (job, result) {
                (Some((generation, _)), Some(Ok(()))) => {
                    // A newer save may have replaced the entry meanwhile.
                    if pending.writes.get(&key).is_some_and(|w| w.generation == generation) {
                        pending.writes.remove(&key);
                    }
                    pending.failures.remove(&key);
                    stats.lock().written += 1;
                }
                (_, Some(Err(e))) => {
                    tracing::error!(file = %key.file_name(), error = %e, "background write failed, will retry on flush");
                    pending.failures.insert(key, e.to_string());
                    stats.lock().failed += 1;
                }
                _ => {}
            }
            pending.in_flight = pending.in_flight.saturating_sub(1);
            if pending.in_flight == 0 {
                shared.idle.notify_all();
            }
        }
    }

    fn enqueue(&self, key: StoreKey, bytes: Vec<u8>) -> StoreResult<()> {
        let sender = self.sender.as_ref().ok_or(StoreError::WorkerStopped)?;
        {
            let mut pending = self.shared.pending.lock();
            let generation = pending.next_generation;
            pending.next_generation += 1;
            pending.writes.insert(
                key.clone(),
                PendingWrite {
                    generation,
                    bytes: Arc::new(bytes),
                },
            );
            pending.in_flight += 1;
        }
        if sender.send(key).is_err() {
            let mut pending = self.shared.pending.lock();
            pending.in_flight = pending.in_flight.saturating_sub(1);
            return Err(StoreError::WorkerStopped);
        }
        self.stats.lock().queued += 1;
        Ok(())
    }

    fn read_through(&self, key: &StoreKey) -> Option<Vec<u8>> {
        self.shared
            .pending
            .lock()
            .writes
            .get(key)
            .map(|w| w.bytes.to_vec())
    }

    /// Writes accepted but not yet durable.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.shared.pending.lock().writes.len()
    }

    /// Returns current statistics.
    #[must_use]
    pub fn stats(&self) -> BackgroundStats {
        *self.stats.lock()
    }

    /// The wrapped store.
    #[must_use]
    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: ChunkStore + 'static> ChunkStore for BackgroundStore<S> {
    fn load_chunk(&self, coord: ChunkCoord) -> StoreResult<Option<Vec<u8>>> {
        match self.read_through(&StoreKey::Chunk(coord)) {
            Some(bytes) => Ok(Some(bytes)),
            None => self.inner.load_chunk(coord),
        }
    }

    fn save_chunk(&self, coord: ChunkCoord, bytes: Vec<u8>) -> StoreResult<()> {
        self.enqueue(StoreKey::Chunk(coord), bytes)
    }

    fn load_blob(&self, name: &str) -> StoreResult<Option<Vec<u8>>> {
        match self.read_through(&StoreKey::Blob(name.to_string())) {
            Some(bytes) => Ok(Some(bytes)),
            None => self.inner.load_blob(name),
        }
    }

    fn save_blob(&self, name: &str, bytes: Vec<u8>) -> StoreResult<()> {
        self.enqueue(StoreKey::Blob(name.to_string()), bytes)
    }

    fn flush(&self) -> StoreResult<()> {
        let sender = self.sender.as_ref().ok_or(StoreError::WorkerStopped)?;
        let mut pending = self.shared.pending.lock();

        let retry: Vec<StoreKey> = pending.failures.keys().cloned().collect();
        for key in retry {
            pending.in_flight += 1;
            if sender.send(key).is_err() {
                pending.in_flight -= 1;
                return Err(StoreError::WorkerStopped);
            }
        }

        while pending.in_flight > 0 {
            self.shared.idle.wait(&mut pending);
        }

        if let Some((key, message)) = pending.failures.iter().next() {
            return Err(StoreError::Io {
                path: PathBuf::from(key.file_name()),
                source: std::io::Error::new(std::io::ErrorKind::Other, message.clone()),
            });
        }
        drop(pending);
        self.inner.flush()
    }
}

impl<S: ChunkStore + 'static> Drop for BackgroundStore<S> {
    fn drop(&mut self) {
        // Closing the channel ends the writer loop once the queue drains.
        self.sender.take();
        if let Some(handle) = self.writer_handle.take() {
            let _ = handle.join();
        }
        let left = self.shared.pending.lock().writes.len();
        if left > 0 {
            tracing::error!(left, "background store dropped with unwritten chunks");
        }
    }
}

// =============================================================================
// Manifest
// =============================================================================

/// Identifies the world a save directory belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorldManifest {
    /// Algorithm that produced un-persisted cells.
    pub generator_version: u32,
    /// Seed of the coordinate rolls.
    pub seed: u64,
}

impl WorldManifest {
    /// Manifest for the running generator.
    #[must_use]
    pub const fn current(seed: u64) -> Self {
        Self {
            generator_version: GENERATOR_VERSION,
            seed,
        }
    }
}

/// Writes the manifest on first use; warns if an existing one disagrees.
///
/// Un-persisted cells regenerate from the running generator, so a save made
/// by a different generator version or seed silently shifts terrain that
/// was never touched. The stored manifest is kept as-is.
///
/// # Errors
///
/// Returns store errors from reading or writing the blob.
pub fn check_manifest(store: &dyn ChunkStore, current: WorldManifest) -> StoreResult<WorldManifest> {
    let existing = store
        .load_blob(MANIFEST_BLOB)?
        .and_then(|bytes| match serde_json::from_slice::<WorldManifest>(&bytes) {
            Ok(m) => Some(m),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable world manifest, rewriting");
                None
            }
        });

    match existing {
        Some(stored) => {
            if stored != current {
                tracing::warn!(
                    stored_version = stored.generator_version,
                    stored_seed = stored.seed,
                    running_version = current.generator_version,
                    running_seed = current.seed,
                    "save was made by a different generator, untouched terrain will differ"
                );
            }
            Ok(stored)
        }
        None => {
            store.save_blob(MANIFEST_BLOB, serde_json::to_vec_pretty(&current)?)?;
            Ok(current)
        }
    }
}
