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

//! Query building and execution
//!
//! # Example
//! ```
//! use pool_ecs::{Query, World};
//!
//! struct Position(f32);
//! struct Velocity(f32);
//!
//! let mut world = World::new();
//! for i in 0..100 {
//!     let e = world.spawn().unwrap();
//!     world.add_component(e, Position(i as f32)).unwrap();
//!     world.add_component(e, Velocity(1.0)).unwrap();
//! }
//!
//! let query = Query::builder(&mut world)
//!     .with::<Position>()
//!     .with::<Velocity>()
//!     .build()
//!     .unwrap();
//!
//! query
//!     .run_parallel(&mut world, 16, 0, |it| {
//!         while it.advance().is_some() {
//!             if let Some((pos, vel)) = it.get_pair_mut::<Position, Velocity>() {
//!                 pos.0 += vel.0;
//!             }
//!         }
//!         Ok(())
//!     })
//!     .unwrap();
//! ```

use crate::component::Component;
use crate::error::{EcsError, Result};
use crate::mask::{Mask, MaskItem, MaskSlice};
use crate::parallel::{ChunkPlan, DispatchJob};
use crate::thread_iter::ThreadIter;
use crate::world::{World, WorldId};

#[cfg(debug_assertions)]
use crate::guard::{BlockerScope, PARALLEL_BLOCKER};

/// Builds a `Query`, registering pools for every named component
pub struct QueryBuilder<'w> {
    world: &'w mut World,
    inc: Mask,
    exc: Mask,
}

impl<'w> QueryBuilder<'w> {
    /// Require component `T`
    pub fn with<T: Component>(mut self) -> Self {
        let pool = self.world.register::<T>();
        self.inc.push(MaskItem::with(pool));
        self
    }

    /// Reject entities owning component `T`
    pub fn without<T: Component>(mut self) -> Self {
        let pool = self.world.register::<T>();
        self.exc.push(MaskItem::without(pool));
        self
    }

    pub fn build(self) -> Result<Query> {
        if self.inc.is_empty() {
            return Err(EcsError::EmptyQuery);
        }
        Ok(Query {
            world: self.world.id(),
            inc: self.inc,
            exc: self.exc,
        })
    }
}

/// Reusable filter over one world's entities
#[derive(Debug, Clone)]
pub struct Query {
    world: WorldId,
    inc: Mask,
    exc: Mask,
}

impl Query {
    pub fn builder(world: &mut World) -> QueryBuilder<'_> {
        QueryBuilder {
            world,
            inc: Mask::new(),
            exc: Mask::new(),
        }
    }

    /// Inclusion mask
    pub fn inc(&self) -> MaskSlice<'_> {
        self.inc.as_slice()
    }

    /// Exclusion mask, if any
    pub fn exc(&self) -> Option<MaskSlice<'_>> {
        (!self.exc.is_empty()).then(|| self.exc.as_slice())
    }

    fn check_world(&self, world: &World) -> Result<()> {
        if self.world != world.id() {
            return Err(EcsError::WorldMismatch);
        }
        Ok(())
    }

    /// Sequential cursor over every matching entity, on worker slot 0
    pub fn iter<'w>(&'w self, world: &'w mut World) -> Result<ThreadIter<'w>> {
        self.check_world(world)?;
        let world: &'w World = world;
        let (pool, len) = world.min_pool(self.inc())?;

        let mut it = ThreadIter::new(0);
        it.init(world, pool.entities(), self.inc(), self.exc(), 0, len);
        Ok(it)
    }

    /// Number of matching entities
    pub fn count(&self, world: &mut World) -> Result<usize> {
        Ok(self.iter(world)?.count())
    }

    /// Run `callback` once per chunk of at most `chunk_size` candidates,
    /// on at most `workers_limit` workers at a time (0 = every worker).
    ///
    /// Blocks until all chunks are done. Within a chunk entities come in
    /// strictly decreasing index order; chunks have no relative order. Each
    /// matching entity is seen by exactly one chunk.
    ///
    /// In debug builds the world's structural guard is held for the whole
    /// call and released on every exit path. If any chunk fails, the
    /// remaining chunks still run and the first failure is returned.
    pub fn run_parallel<F>(
        &self,
        world: &mut World,
        chunk_size: usize,
        workers_limit: usize,
        callback: F,
    ) -> Result<()>
    where
        F: Fn(&mut ThreadIter<'_>) -> Result<()> + Send + Sync,
    {
        if chunk_size == 0 {
            return Err(EcsError::InvalidChunkSize);
        }
        self.check_world(world)?;
        let world: &World = world;

        #[cfg(debug_assertions)]
        let _blocker = BlockerScope::new(world.guard(), PARALLEL_BLOCKER);

        let (pool, len) = world.min_pool(self.inc())?;
        let job = DispatchJob {
            world,
            entities: pool.entities(),
            inc: self.inc(),
            exc: self.exc(),
            plan: ChunkPlan::new(len, chunk_size)?,
        };
        world.workers().dispatch(job, workers_limit, &callback)
    }
}
