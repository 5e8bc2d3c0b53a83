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

//! Query masks
//!
//! A mask is a conjunction over (pool, required presence) pairs. Item order
//! carries no meaning.

use smallvec::SmallVec;

use crate::pool::PoolId;

/// Maximum number of mask items stored inline before spilling to the heap
pub const MAX_INLINE_MASK_ITEMS: usize = 8;

/// One filter term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MaskItem {
    pub pool: PoolId,
    pub required: bool,
}

impl MaskItem {
    pub fn with(pool: PoolId) -> Self {
        Self {
            pool,
            required: true,
        }
    }

    pub fn without(pool: PoolId) -> Self {
        Self {
            pool,
            required: false,
        }
    }
}

/// Immutable, non-owning view over a run of mask items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MaskSlice<'a> {
    items: &'a [MaskItem],
}

impl<'a> MaskSlice<'a> {
    pub fn new(items: &'a [MaskItem]) -> Self {
        Self { items }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'a, MaskItem> {
        self.items.iter()
    }

    pub fn as_slice(&self) -> &'a [MaskItem] {
        self.items
    }

    /// Pools whose component must be present
    pub fn required_pools(&self) -> impl Iterator<Item = PoolId> + 'a {
        self.items.iter().filter(|i| i.required).map(|i| i.pool)
    }
}

impl<'a> IntoIterator for MaskSlice<'a> {
    type Item = &'a MaskItem;
    type IntoIter = std::slice::Iter<'a, MaskItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Owned mask, typically held by a built query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mask {
    items: SmallVec<[MaskItem; MAX_INLINE_MASK_ITEMS]>,
}

impl Mask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item; a pool already present keeps its first entry
    pub fn push(&mut self, item: MaskItem) {
        if !self.contains_pool(item.pool) {
            self.items.push(item);
        }
    }

    pub fn contains_pool(&self, pool: PoolId) -> bool {
        self.items.iter().any(|i| i.pool == pool)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn as_slice(&self) -> MaskSlice<'_> {
        MaskSlice::new(&self.items)
    }
}
