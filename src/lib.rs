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

//! Pool ECS - sparse-set Entity Component System
//!
//! Components live in one pool per type. Queries are (inclusion, exclusion)
//! masks over pools and run either sequentially or split into fixed-size
//! chunks across a bounded rayon worker pool.

pub mod bitset;
pub mod component;
pub mod entity;
pub mod error;
pub mod guard;
pub mod mask;
pub mod parallel;
pub mod pool;
pub mod prelude;
pub mod profiling;
pub mod query;
pub mod thread_iter;
pub mod world;

pub use component::*;
pub use entity::*;
pub use error::*;
pub use guard::*;
pub use mask::*;
pub use parallel::*;
pub use pool::*;
pub use query::*;
pub use thread_iter::*;
pub use world::*;
