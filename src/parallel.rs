// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Parallel chunk dispatch on a rayon worker pool
//!
//! A dispatch splits `[0, len)` into fixed-size chunks, starts one task per
//! worker slot and lets every slot pull chunks from a shared FIFO counter until
//! none are left. Each slot owns one reusable `ThreadIter`, re-bound per chunk.

use parking_lot::Mutex;
use smallvec::SmallVec;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::entity::EntityId;
use crate::error::{EcsError, Result};
use crate::mask::MaskSlice;
use crate::thread_iter::ThreadIter;
use crate::world::World;

/// Worker slots kept inline before the cursor arena spills to the heap
pub const INLINE_WORKER_SLOTS: usize = 16;

/// Static partition of an index domain into fixed-size chunks.
///
/// Chunk `0` is the top of the domain, matching the cursor's downward walk:
/// `len = 10, chunk_size = 4` gives `[6, 10)`, `[2, 6)`, `[0, 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    len: usize,
    chunk_size: usize,
}

impl ChunkPlan {
    pub fn new(len: usize, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(EcsError::InvalidChunkSize);
        }
        Ok(Self { len, chunk_size })
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_count(&self) -> usize {
        self.len.div_ceil(self.chunk_size)
    }

    /// `(from, before)` of chunk `index`; `index` must be below `chunk_count`
    pub fn bounds(&self, index: usize) -> (usize, usize) {
        debug_assert!(index < self.chunk_count());
        let before = self.len - index * self.chunk_size;
        (before.saturating_sub(self.chunk_size), before)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..self.chunk_count()).map(|index| self.bounds(index))
    }
}

/// Everything a worker needs to bind its cursor to a chunk
pub(crate) struct DispatchJob<'w> {
    pub world: &'w World,
    pub entities: &'w [EntityId],
    pub inc: MaskSlice<'w>,
    pub exc: Option<MaskSlice<'w>>,
    pub plan: ChunkPlan,
}

/// Bounded worker pool running chunk callbacks
pub struct WorkerPool {
    /// `None` runs on rayon's global pool
    pool: Option<rayon::ThreadPool>,
}

impl WorkerPool {
    /// Share rayon's global pool
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Dedicated pool with `threads` workers (0 lets rayon decide)
    pub fn with_threads(threads: usize, name_prefix: &str) -> Result<Self> {
        let prefix = name_prefix.to_owned();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(move |i| format!("{prefix}-{i}"))
            .build()?;
        Ok(Self { pool: Some(pool) })
    }

    /// Maximum number of chunks that can run at the same time
    pub fn worker_count(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }

    /// Resolve a caller's limit: 0 means all workers, larger values are clamped
    pub fn effective_workers(&self, workers_limit: usize) -> usize {
        let capacity = self.worker_count().max(1);
        match workers_limit {
            0 => capacity,
            limit if limit > capacity => {
                tracing::debug!(limit, capacity, "workers limit clamped to pool capacity");
                capacity
            }
            limit => limit,
        }
    }

    fn in_scope<'scope, OP, R>(&self, op: OP) -> R
    where
        OP: FnOnce(&rayon::Scope<'scope>) -> R + Send,
        R: Send,
    {
        match &self.pool {
            Some(pool) => pool.scope(op),
            None => rayon::scope(op),
        }
    }

    /// Run `callback` once per chunk and block until every chunk finished.
    ///
    /// Every chunk runs even if a sibling fails; the first failure is
    /// returned after the join.
    pub(crate) fn dispatch<F>(
        &self,
        job: DispatchJob<'_>,
        workers_limit: usize,
        callback: &F,
    ) -> Result<()>
    where
        F: Fn(&mut ThreadIter<'_>) -> Result<()> + Send + Sync,
    {
        let chunks = job.plan.chunk_count();
        if chunks == 0 {
            return Ok(());
        }

        let workers = self.effective_workers(workers_limit).min(chunks);
        tracing::debug!(
            len = job.plan.len(),
            chunk_size = job.plan.chunk_size(),
            chunks,
            workers,
            "dispatching parallel query"
        );

        #[cfg(feature = "profiling")]
        let _span = tracing::info_span!("run_parallel", chunks, workers).entered();

        let next = AtomicUsize::new(0);
        let failures = Mutex::new(Failures::default());
        // Cursors borrow the world for this dispatch only, so the arena lives
        // here; each slot is re-bound for every chunk it pulls.
        let mut arena: SmallVec<[ThreadIter<'_>; INLINE_WORKER_SLOTS]> =
            (0..workers).map(ThreadIter::new).collect();

        let job = &job;
        let next = &next;
        let failures_ref = &failures;
        let slots = arena.iter_mut();
        self.in_scope(move |scope| {
            for cursor in slots {
                scope.spawn(move |_| drain_chunks(cursor, job, next, failures_ref, callback));
            }
        });

        failures.into_inner().into_result()
    }
}

/// Pull chunks until the queue is empty
fn drain_chunks<'w, F>(
    cursor: &mut ThreadIter<'w>,
    job: &DispatchJob<'w>,
    next: &AtomicUsize,
    failures: &Mutex<Failures>,
    callback: &F,
) where
    F: Fn(&mut ThreadIter<'_>) -> Result<()> + Send + Sync,
{
    let chunks = job.plan.chunk_count();
    loop {
        let index = next.fetch_add(1, Ordering::Relaxed);
        if index >= chunks {
            break;
        }

        let (from, before) = job.plan.bounds(index);
        cursor.init(job.world, job.entities, job.inc, job.exc, from, before);

        #[cfg(feature = "profiling")]
        let _span =
            tracing::info_span!("chunk", worker = cursor.worker_id(), from, before).entered();

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(cursor)));
        cursor.clear();

        let error = match outcome {
            Ok(Ok(())) => continue,
            Ok(Err(err)) => err,
            Err(payload) => EcsError::ChunkPanicked {
                worker: cursor.worker_id(),
                from,
                before,
                message: panic_message(payload.as_ref()),
            },
        };
        tracing::warn!(worker = cursor.worker_id(), from, before, %error, "chunk failed");
        failures.lock().record(error);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[derive(Default)]
struct Failures {
    first: Option<EcsError>,
    count: usize,
}

impl Failures {
    fn record(&mut self, error: EcsError) {
        self.count += 1;
        if self.first.is_none() {
            self.first = Some(error);
        }
    }

    fn into_result(self) -> Result<()> {
        match self.first {
            Some(error) => {
                if self.count > 1 {
                    tracing::warn!(failed = self.count, "multiple chunks failed");
                }
                Err(error)
            }
            None => Ok(()),
        }
    }
}
