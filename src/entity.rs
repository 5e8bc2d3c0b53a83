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

//! Entity identifiers and per-entity pool membership.

use slotmap::new_key_type;

use crate::bitset::BitSet;

new_key_type! {
    /// Unique entity identifier backed by slotmap's generational keys.
    pub struct EntityId;
}

/// Entity record: which pools currently hold a component for this entity
#[derive(Debug, Clone, Default)]
pub struct EntityRecord {
    pub mask: BitSet,
}

impl EntityRecord {
    /// Number of components attached
    pub fn component_count(&self) -> usize {
        self.mask.ones().count()
    }
}
