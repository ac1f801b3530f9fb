//! 已解析权限缓存
//!
//! 按用户分组存放数据库级和集合级的有效权限：
//! - 失效以用户为单位，`invalidate_user` 只触及该用户的条目
//! - 条目超过 TTL 视为未命中
//! - 单个用户条目数超出上限时整体淘汰该用户的条目
//!
//! 缓存本身不保证与授权存储的一致性，一致性由 `GrantStore` 的
//! 用户级临界区保证：写入在持有写锁时失效，读取在持有读锁时回填。

use dashmap::DashMap;
use log::debug;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::cache::stats::{CacheStats, CacheStatsSnapshot};
use crate::config::CacheConfig;
use crate::core::permission::RightLevel;

/// 缓存键：一个用户下的某个作用域
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub enum ScopeKey {
    Database(String),
    Collection { database: String, collection: String },
}

impl ScopeKey {
    pub fn database(database: &str) -> Self {
        ScopeKey::Database(database.to_string())
    }

    pub fn collection(database: &str, collection: &str) -> Self {
        ScopeKey::Collection {
            database: database.to_string(),
            collection: collection.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedRight {
    level: RightLevel,
    inserted_at: Instant,
}

pub struct GrantCache {
    entries: DashMap<String, HashMap<ScopeKey, CachedRight>>,
    config: CacheConfig,
    ttl: Option<Duration>,
    stats: CacheStats,
}

impl GrantCache {
    pub fn new(config: CacheConfig) -> Self {
        let ttl = match config.ttl_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        Self {
            entries: DashMap::new(),
            config,
            ttl,
            stats: CacheStats::default(),
        }
    }

    /// 覆盖配置中的 TTL，精度不限于秒
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// 查询缓存，未命中返回 None
    pub fn get(&self, user: &str, key: &ScopeKey) -> Option<RightLevel> {
        if !self.config.enabled {
            return None;
        }

        let cached = self
            .entries
            .get(user)
            .and_then(|scopes| scopes.get(key).copied());

        match cached {
            Some(entry) => {
                let expired = self
                    .ttl
                    .map(|ttl| entry.inserted_at.elapsed() > ttl)
                    .unwrap_or(false);
                if expired {
                    if let Some(mut scopes) = self.entries.get_mut(user) {
                        scopes.remove(key);
                    }
                    self.stats.record_eviction();
                    self.stats.record_miss();
                    return None;
                }
                self.stats.record_hit();
                Some(entry.level)
            }
            None => {
                self.stats.record_miss();
                None
            }
        }
    }

    pub fn put(&self, user: &str, key: ScopeKey, level: RightLevel) {
        if !self.config.enabled {
            return;
        }

        let mut scopes = self.entries.entry(user.to_string()).or_default();
        if scopes.len() >= self.config.max_entries_per_user && !scopes.contains_key(&key) {
            scopes.clear();
            self.stats.record_eviction();
        }
        scopes.insert(
            key,
            CachedRight {
                level,
                inserted_at: Instant::now(),
            },
        );
        self.stats.record_insertion();
    }

    /// 失效某个用户的全部条目
    pub fn invalidate_user(&self, user: &str) {
        if self.entries.remove(user).is_some() {
            debug!("权限缓存失效: user={}", user);
        }
        self.stats.record_invalidation();
    }

    pub fn invalidate_all(&self) {
        self.entries.clear();
        self.stats.record_invalidation();
        debug!("权限缓存已全部失效");
    }

    /// 缓存条目总数
    pub fn len(&self) -> usize {
        self.entries.iter().map(|scopes| scopes.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot(self.len())
    }
}

impl Default for GrantCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
