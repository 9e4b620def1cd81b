//! Background Tasks Module
//!
//! Contains the background work a cache instance runs while it is alive.
//!
//! # Tasks
//! - Pruning: Removes expired cache entries at configured intervals

mod prune;
mod shutdown;

pub(crate) use prune::{prune_expired, spawn_prune_task, PruneSchedule};
pub(crate) use shutdown::Shutdown;
