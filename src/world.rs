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

//! World: entity table, pool registry and mask compatibility checks

use rustc_hash::FxHashMap;
use slotmap::SlotMap;
use std::any::TypeId;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::bitset::BitSet;
use crate::component::Component;
use crate::entity::{EntityId, EntityRecord};
use crate::error::{EcsError, Result};
use crate::guard::StructuralGuard;
use crate::mask::MaskSlice;
use crate::parallel::WorkerPool;
use crate::pool::{AnyPool, Pool, PoolId};

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a world instance, used to reject queries built elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WorldId(u64);

/// World construction options
#[derive(Debug, Clone)]
pub struct WorldConfig {
    /// Dedicated worker threads; `None` shares rayon's global pool
    pub worker_threads: Option<usize>,
    /// Name prefix for dedicated worker threads
    pub thread_name_prefix: String,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            worker_threads: None,
            thread_name_prefix: "pool-ecs-worker".to_string(),
        }
    }
}

/// Central ECS world
pub struct World {
    id: WorldId,

    /// Live entities and their pool membership masks
    entities: SlotMap<EntityId, EntityRecord>,

    /// Pools indexed by `PoolId`
    pools: Vec<Box<dyn AnyPool>>,

    /// Component type -> pool lookup
    pool_index: FxHashMap<TypeId, PoolId>,

    /// Blocks structural changes while parallel work is in flight
    guard: StructuralGuard,

    workers: WorkerPool,
}

impl World {
    /// Create a new, empty world running parallel queries on rayon's global pool.
    pub fn new() -> Self {
        Self::from_parts(WorkerPool::global())
    }

    /// Create a world from explicit configuration.
    pub fn with_config(config: WorldConfig) -> Result<Self> {
        let workers = match config.worker_threads {
            Some(threads) => WorkerPool::with_threads(threads, &config.thread_name_prefix)?,
            None => WorkerPool::global(),
        };
        tracing::debug!(
            workers = workers.worker_count(),
            "world created with dedicated configuration"
        );
        Ok(Self::from_parts(workers))
    }

    fn from_parts(workers: WorkerPool) -> Self {
        Self {
            id: WorldId(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed)),
            entities: SlotMap::with_key(),
            pools: Vec::with_capacity(16),
            pool_index: FxHashMap::default(),
            guard: StructuralGuard::new(),
            workers,
        }
    }

    pub fn id(&self) -> WorldId {
        self.id
    }

    /// Worker pool used by parallel queries
    pub fn workers(&self) -> &WorkerPool {
        &self.workers
    }

    // ------------------------------------------------------------------
    // Pool registry
    // ------------------------------------------------------------------

    /// Get or create the pool for `T`
    pub fn register<T: Component>(&mut self) -> PoolId {
        let type_id = TypeId::of::<T>();
        if let Some(&id) = self.pool_index.get(&type_id) {
            return id;
        }

        let id = PoolId(self.pools.len() as u32);
        self.pools.push(Box::new(Pool::<T>::new(id)));
        self.pool_index.insert(type_id, id);
        tracing::trace!(pool = id.0, component = std::any::type_name::<T>(), "pool registered");
        id
    }

    pub fn pool_id<T: Component>(&self) -> Option<PoolId> {
        self.pool_index.get(&TypeId::of::<T>()).copied()
    }

    /// Typed pool access
    pub fn pool<T: Component>(&self) -> Option<&Pool<T>> {
        let id = self.pool_id::<T>()?;
        self.pools[id.index()].as_any().downcast_ref::<Pool<T>>()
    }

    fn pool_mut<T: Component>(&mut self) -> Option<&mut Pool<T>> {
        let id = self.pool_id::<T>()?;
        self.pools[id.index()].as_any_mut().downcast_mut::<Pool<T>>()
    }

    pub fn pool_by_id(&self, id: PoolId) -> Option<&dyn AnyPool> {
        self.pools.get(id.index()).map(|pool| pool.as_ref())
    }

    // ------------------------------------------------------------------
    // Structural changes
    // ------------------------------------------------------------------

    /// Spawn an entity without components
    pub fn spawn(&mut self) -> Result<EntityId> {
        self.guard.check()?;
        Ok(self.entities.insert(EntityRecord::default()))
    }

    /// Despawn entity and drop all its components
    pub fn despawn(&mut self, entity: EntityId) -> Result<()> {
        self.guard.check()?;
        let record = self
            .entities
            .remove(entity)
            .ok_or(EcsError::EntityNotFound)?;

        for index in record.mask.ones() {
            if let Some(pool) = self.pools.get_mut(index) {
                pool.remove_entity(entity);
            }
        }
        Ok(())
    }

    /// Attach a component; fails if the entity already has one of this type
    pub fn add_component<T: Component>(&mut self, entity: EntityId, component: T) -> Result<()> {
        self.guard.check()?;
        let id = self.register::<T>();
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::EntityNotFound)?;
        if record.mask.contains(id.index()) {
            return Err(EcsError::ComponentAlreadyExists);
        }
        record.mask.set(id.index());

        let pool = self.pool_mut::<T>().ok_or(EcsError::PoolNotFound(id))?;
        pool.insert(entity, component);
        Ok(())
    }

    /// Detach a component and return it
    pub fn remove_component<T: Component>(&mut self, entity: EntityId) -> Result<T> {
        self.guard.check()?;
        let id = self.pool_id::<T>().ok_or(EcsError::ComponentNotFound)?;
        let record = self
            .entities
            .get_mut(entity)
            .ok_or(EcsError::EntityNotFound)?;
        if !record.mask.contains(id.index()) {
            return Err(EcsError::ComponentNotFound);
        }
        record.mask.remove(id.index());

        self.pool_mut::<T>()
            .and_then(|pool| pool.remove(entity))
            .ok_or(EcsError::ComponentNotFound)
    }

    // ------------------------------------------------------------------
    // Component access
    // ------------------------------------------------------------------

    pub fn get<T: Component>(&self, entity: EntityId) -> Option<&T> {
        self.pool::<T>()?.get(entity)
    }

    pub fn get_mut<T: Component>(&mut self, entity: EntityId) -> Option<&mut T> {
        self.pool_mut::<T>()?.get_mut(entity)
    }

    pub fn has<T: Component>(&self, entity: EntityId) -> bool {
        match (self.pool_id::<T>(), self.entities.get(entity)) {
            (Some(id), Some(record)) => record.mask.contains(id.index()),
            _ => false,
        }
    }

    pub fn is_alive(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Number of components attached to an entity
    pub fn component_count(&self, entity: EntityId) -> Option<usize> {
        self.entities.get(entity).map(EntityRecord::component_count)
    }

    // ------------------------------------------------------------------
    // Mask compatibility
    // ------------------------------------------------------------------

    /// Entity satisfies every inclusion item
    #[inline]
    pub fn entity_compatible_with(&self, entity: EntityId, inc: MaskSlice<'_>) -> bool {
        match self.entities.get(entity) {
            Some(record) => satisfies(&record.mask, inc),
            None => false,
        }
    }

    /// Entity satisfies every inclusion item and owns none of the excluded pools
    #[inline]
    pub fn entity_compatible_with_and_without(
        &self,
        entity: EntityId,
        inc: MaskSlice<'_>,
        exc: MaskSlice<'_>,
    ) -> bool {
        match self.entities.get(entity) {
            Some(record) => {
                satisfies(&record.mask, inc)
                    && exc.iter().all(|item| !record.mask.contains(item.pool.index()))
            }
            None => false,
        }
    }

    /// Smallest pool among the required inclusion items, with its length.
    ///
    /// Every entity matching the full inclusion set is in this pool, so its
    /// entity array is a complete candidate domain.
    pub fn min_pool(&self, inc: MaskSlice<'_>) -> Result<(&dyn AnyPool, usize)> {
        let mut best: Option<&dyn AnyPool> = None;
        for id in inc.required_pools() {
            let pool = self.pool_by_id(id).ok_or(EcsError::PoolNotFound(id))?;
            if best.map_or(true, |current| pool.len() < current.len()) {
                best = Some(pool);
            }
        }

        let pool = best.ok_or(EcsError::EmptyQuery)?;
        Ok((pool, pool.len()))
    }

    // ------------------------------------------------------------------
    // Structural guard
    // ------------------------------------------------------------------

    /// Adjust the structural guard counter, returning the new value
    pub fn add_blocker(&self, delta: isize) -> isize {
        self.guard.add_blocker(delta)
    }

    pub fn blockers(&self) -> isize {
        self.guard.blockers()
    }

    pub fn guard(&self) -> &StructuralGuard {
        &self.guard
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
fn satisfies(mask: &BitSet, items: MaskSlice<'_>) -> bool {
    items
        .iter()
        .all(|item| mask.contains(item.pool.index()) == item.required)
}
