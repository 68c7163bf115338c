//! Taskdeck Cache - Query Cache and Key Derivation
//!
//! Client-side cache of remote query results. Keys are derived from the
//! normalized task filter; concurrent requests for one key share a single
//! fetch; stale data stays visible until its refetch resolves.

pub mod freshness;
pub mod key;
pub mod query_cache;
pub mod traits;

pub use freshness::{CacheConfig, CacheEntry, EntryStatus};
pub use key::{derive_task_list_key, CacheKey, DisplayNameKey, ProjectsKey, TaskListKey};
pub use query_cache::{CacheError, CacheResult, CacheSnapshot, QueryCache};
pub use traits::{CacheStats, QueryFetcher};
