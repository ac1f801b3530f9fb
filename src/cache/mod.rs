//! 缓存模块
//!
//! 提供已解析权限的缓存及其统计

pub mod grant_cache;
pub mod stats;

pub use grant_cache::{GrantCache, ScopeKey};
pub use stats::{CacheStats, CacheStatsSnapshot};
