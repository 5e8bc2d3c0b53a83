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

//! Sparse-set component pools with swap-remove compaction

use std::any::Any;

use slotmap::SecondaryMap;

use crate::component::{Component, ComponentCell};
use crate::entity::EntityId;

/// Dense pool index, assigned in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub u32);

impl PoolId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Type-erased pool interface used by the world registry and the dispatcher
pub trait AnyPool: Send + Sync + 'static {
    fn id(&self) -> PoolId;

    /// Number of entities holding this component
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Dense entity array; index `i` owns component slot `i`
    fn entities(&self) -> &[EntityId];

    fn contains(&self, entity: EntityId) -> bool;

    /// Drop the entity's component, returning whether one was present
    fn remove_entity(&mut self, entity: EntityId) -> bool;

    fn component_name(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Pool: dense entities + dense component cells, sparse entity -> row lookup
pub struct Pool<T: Component> {
    id: PoolId,
    entities: Vec<EntityId>,
    data: Vec<ComponentCell<T>>,
    sparse: SecondaryMap<EntityId, usize>,
}

impl<T: Component> Pool<T> {
    /// Create empty pool
    pub fn new(id: PoolId) -> Self {
        Self {
            id,
            entities: Vec::new(),
            data: Vec::new(),
            sparse: SecondaryMap::new(),
        }
    }

    /// Insert or overwrite, returning the previous value
    pub fn insert(&mut self, entity: EntityId, value: T) -> Option<T> {
        if let Some(&row) = self.sparse.get(entity) {
            return Some(std::mem::replace(self.data[row].get_mut(), value));
        }

        let row = self.entities.len();
        self.entities.push(entity);
        self.data.push(ComponentCell::new(value));
        self.sparse.insert(entity, row);
        None
    }

    /// Remove component; the last row is swapped into the vacated slot
    pub fn remove(&mut self, entity: EntityId) -> Option<T> {
        let row = self.sparse.remove(entity)?;
        self.entities.swap_remove(row);
        let cell = self.data.swap_remove(row);

        if let Some(&moved) = self.entities.get(row) {
            self.sparse.insert(moved, row);
        }

        Some(cell.into_inner())
    }

    /// Get component for entity
    pub fn get(&self, entity: EntityId) -> Option<&T> {
        let cell = self.cell(entity)?;
        // SAFETY: writers need `&mut Pool` or an exclusively borrowed world,
        // neither of which can coexist with this `&self`.
        Some(unsafe { &*cell.as_ptr() })
    }

    /// Get mutable component for entity
    pub fn get_mut(&mut self, entity: EntityId) -> Option<&mut T> {
        let row = self.row(entity)?;
        Some(self.data[row].get_mut())
    }

    /// Row of the entity in the dense arrays
    pub fn row(&self, entity: EntityId) -> Option<usize> {
        self.sparse.get(entity).copied()
    }

    pub(crate) fn cell(&self, entity: EntityId) -> Option<&ComponentCell<T>> {
        let row = self.row(entity)?;
        self.data.get(row)
    }
}

impl<T: Component> AnyPool for Pool<T> {
    fn id(&self) -> PoolId {
        self.id
    }

    fn len(&self) -> usize {
        self.entities.len()
    }

    fn entities(&self) -> &[EntityId] {
        &self.entities
    }

    fn contains(&self, entity: EntityId) -> bool {
        self.sparse.contains_key(entity)
    }

    fn remove_entity(&mut self, entity: EntityId) -> bool {
        self.remove(entity).is_some()
    }

    fn component_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
