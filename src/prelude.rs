//! Convenient re-exports of commonly used types.
//!
//! The prelude can be imported with:
//! ```
//! use pool_ecs::prelude::*;
//! ```

pub use crate::component::Component;
pub use crate::entity::EntityId;
pub use crate::error::{EcsError, Result};
pub use crate::query::Query;
pub use crate::thread_iter::ThreadIter;
pub use crate::world::{World, WorldConfig};
