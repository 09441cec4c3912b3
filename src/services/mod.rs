//! Service layer modules.
//!
//! Contains the Redis cache client and the periodic progress sweep.

pub mod cache;
pub mod progress_sweep;

pub use cache::RedisCache;
pub use progress_sweep::{run_sweep, spawn_progress_sweep, SweepReport};
