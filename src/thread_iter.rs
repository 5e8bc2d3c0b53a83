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

//! Per-worker cursor over one chunk of a query's entity array
//!
//! A `ThreadIter` walks the half-open index range `[from, before)` of the
//! minimum pool's entity array from the top down, yielding only entities that
//! satisfy the query masks. Walking downwards keeps swap-remove compaction of
//! already visited (higher) rows from shifting unvisited ones.
//!
//! The cursor is reusable: `init` binds it to a world and a range, `clear`
//! drops every borrowed reference so the slot can serve another dispatch.

use std::any::TypeId;

use crate::component::Component;
use crate::entity::EntityId;
use crate::mask::MaskSlice;
use crate::world::World;

/// Reusable, pull-based chunk cursor
#[derive(Default)]
pub struct ThreadIter<'w> {
    id: usize,
    from: usize,
    before: usize,
    world: Option<&'w World>,
    entities: Option<&'w [EntityId]>,
    inc: MaskSlice<'w>,
    exc: Option<MaskSlice<'w>>,
    cursor: usize,
    entity: Option<EntityId>,
}

impl<'w> ThreadIter<'w> {
    /// Unbound cursor for worker slot `id`
    pub fn new(id: usize) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    /// Worker slot running this cursor, stable for the whole chunk.
    ///
    /// Slots are numbered `0..workers`, so callbacks can index per-worker
    /// scratch buffers with it.
    #[inline]
    pub fn worker_id(&self) -> usize {
        self.id
    }

    /// Bind to a chunk. Callers must hold the world exclusively for `'w`.
    pub(crate) fn init(
        &mut self,
        world: &'w World,
        entities: &'w [EntityId],
        inc: MaskSlice<'w>,
        exc: Option<MaskSlice<'w>>,
        from: usize,
        before: usize,
    ) {
        debug_assert!(from <= before, "chunk bounds inverted: {from} > {before}");
        debug_assert!(before <= entities.len(), "chunk exceeds entity array");

        self.world = Some(world);
        self.entities = Some(entities);
        self.inc = inc;
        self.exc = exc;
        self.from = from;
        self.before = before;
        self.cursor = before;
        self.entity = None;
    }

    /// Release every reference and reset to the unbound state
    pub(crate) fn clear(&mut self) {
        self.world = None;
        self.entities = None;
        self.inc = MaskSlice::default();
        self.exc = None;
        self.from = 0;
        self.before = 0;
        self.cursor = 0;
        self.entity = None;
    }

    pub fn is_bound(&self) -> bool {
        self.world.is_some()
    }

    /// Structural guard count of the bound world
    #[cfg(test)]
    pub(crate) fn world_blockers(&self) -> Option<isize> {
        self.world.map(World::blockers)
    }

    /// Chunk range as `(from, before)`
    pub fn bounds(&self) -> (usize, usize) {
        (self.from, self.before)
    }

    /// Move to the next matching entity.
    ///
    /// Once this returns `None` the cursor stays exhausted until re-bound.
    ///
    /// # Panics
    /// Panics if the cursor is not bound to a chunk.
    pub fn advance(&mut self) -> Option<EntityId> {
        let (Some(world), Some(entities)) = (self.world, self.entities) else {
            panic!("ThreadIter::advance called on an unbound cursor");
        };

        while self.cursor != self.from {
            self.cursor -= 1;
            let entity = entities[self.cursor];
            let matched = match self.exc {
                Some(exc) => world.entity_compatible_with_and_without(entity, self.inc, exc),
                None => world.entity_compatible_with(entity, self.inc),
            };
            if matched {
                self.entity = Some(entity);
                return Some(entity);
            }
        }

        self.entity = None;
        None
    }

    /// Entity yielded by the last `advance`
    #[inline]
    pub fn current(&self) -> Option<EntityId> {
        self.entity
    }

    /// Index of the current entity in the entity array
    pub fn position(&self) -> Option<usize> {
        self.entity.map(|_| self.cursor)
    }

    /// Read a component of the current entity
    pub fn get<T: Component>(&self) -> Option<&T> {
        let entity = self.entity?;
        let cell = self.world?.pool::<T>()?.cell(entity)?;
        // SAFETY: the current entity belongs to this chunk only; no other
        // cursor can reach its cells, and writers through this cursor need
        // `&mut self`.
        Some(unsafe { &*cell.as_ptr() })
    }

    /// Write a component of the current entity
    pub fn get_mut<T: Component>(&mut self) -> Option<&mut T> {
        let entity = self.entity?;
        let cell = self.world?.pool::<T>()?.cell(entity)?;
        // SAFETY: chunks partition the minimum pool, which holds each entity
        // once, and the world is exclusively borrowed by the dispatcher for
        // `'w`. `&mut self` rules out a second live borrow from this cursor.
        Some(unsafe { &mut *cell.as_ptr() })
    }

    /// Write two different components of the current entity at once
    ///
    /// # Panics
    /// Panics if `A` and `B` are the same type.
    pub fn get_pair_mut<A: Component, B: Component>(&mut self) -> Option<(&mut A, &mut B)> {
        assert_ne!(
            TypeId::of::<A>(),
            TypeId::of::<B>(),
            "get_pair_mut requires two distinct component types"
        );
        let entity = self.entity?;
        let world = self.world?;
        let a = world.pool::<A>()?.cell(entity)?;
        let b = world.pool::<B>()?.cell(entity)?;
        // SAFETY: as in `get_mut`; distinct types live in distinct pools so
        // the two cells never alias.
        Some(unsafe { (&mut *a.as_ptr(), &mut *b.as_ptr()) })
    }
}

impl Iterator for ThreadIter<'_> {
    type Item = EntityId;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.cursor - self.from))
    }
}
