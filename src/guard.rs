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

//! Structural guard
//!
//! Per-world reentrant counter. While it is non-zero, spawning, despawning and
//! adding or removing components are rejected. Checks only run in debug
//! builds; in release builds a structural change during a parallel run is
//! undefined behavior at the API-contract level.

use std::sync::atomic::{AtomicIsize, Ordering};

use crate::error::Result;

/// Blocker delta held by one parallel dispatch
pub const PARALLEL_BLOCKER: isize = 2;

/// Reentrant structural-change counter
#[derive(Debug, Default)]
pub struct StructuralGuard {
    blockers: AtomicIsize,
}

impl StructuralGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adjust the counter, returning the new value
    pub fn add_blocker(&self, delta: isize) -> isize {
        let now = self.blockers.fetch_add(delta, Ordering::AcqRel) + delta;
        debug_assert!(now >= 0, "structural guard released more than acquired");
        now
    }

    pub fn blockers(&self) -> isize {
        self.blockers.load(Ordering::Acquire)
    }

    pub fn is_blocked(&self) -> bool {
        self.blockers() != 0
    }

    /// Fail if structural mutation is currently forbidden
    #[inline]
    pub fn check(&self) -> Result<()> {
        #[cfg(debug_assertions)]
        {
            let blockers = self.blockers();
            if blockers != 0 {
                tracing::error!(blockers, "structural change while world is blocked");
                return Err(crate::error::EcsError::StructuralChangeBlocked { blockers });
            }
        }
        Ok(())
    }
}

/// Holds `delta` blockers until dropped, including during unwinding
#[must_use = "the blocker is released as soon as the scope is dropped"]
pub struct BlockerScope<'a> {
    guard: &'a StructuralGuard,
    delta: isize,
}

impl<'a> BlockerScope<'a> {
    pub fn new(guard: &'a StructuralGuard, delta: isize) -> Self {
        guard.add_blocker(delta);
        Self { guard, delta }
    }
}

impl Drop for BlockerScope<'_> {
    fn drop(&mut self) {
        self.guard.add_blocker(-self.delta);
    }
}
