//! Response cache keyed by request fingerprint
//!
//! Two tiers: an in-memory map that is authoritative for the running process,
//! and a durable SQLite store that survives restarts.
//!
//! # Tiers
//!
//! | Tier | Bound | Eviction | Failure mode |
//! |------|-------|----------|--------------|
//! | Memory | `MAX_STORED_RESPONSES` | oldest write first | n/a |
//! | Durable | `MAX_STORED_RESPONSES` | oldest write timestamp first | logged, memory-only |

pub mod manager;
pub mod store;

pub use manager::{trim_to_capacity, CacheManager, MAX_STORED_RESPONSES};
pub use store::{CacheEntry, ResponseStore, SqliteStore};
