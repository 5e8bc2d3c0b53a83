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

//! Component trait and the shared storage cell
//!
//! Components are data attached to entities, one pool per component type.

use std::cell::UnsafeCell;

/// Marker trait for components
///
/// Components must be 'static (no borrowed data) and shareable across workers.
pub trait Component: 'static + Send + Sync {}

/// Automatically implement Component for all valid types
impl<T: 'static + Send + Sync> Component for T {}

/// Storage slot for one component value.
///
/// Parallel chunks receive `&mut T` for disjoint entities through a shared
/// `&World`, so the value lives behind an `UnsafeCell`.
#[repr(transparent)]
pub struct ComponentCell<T> {
    value: UnsafeCell<T>,
}

// SAFETY: a cell is only written through `&mut self` or through a
// `ThreadIter` whose chunk owns the entity exclusively while the world is
// mutably borrowed by the dispatcher. `T: Send + Sync` covers both paths.
unsafe impl<T: Component> Sync for ComponentCell<T> {}

impl<T> ComponentCell<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.value.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.value.into_inner()
    }

    /// Raw pointer to the value
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.value.get()
    }
}
