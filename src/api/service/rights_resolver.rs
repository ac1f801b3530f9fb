//! 有效权限解析
//!
//! 作用域优先级：越窄越优先，缺失时回退到更宽的作用域
//! - 数据库：`Database(db)` → `Database("*")` → `System` → `None`
//! - 集合：`Collection(db, c)` → `Collection(db, "*")` → 数据库级
//!
//! 这是严格的覆盖关系：集合级 `None` 会覆盖继承来的数据库级 `ReadWrite`，反之亦然。
//! 解析器内部没有超级用户旁路。

use log::trace;
use std::sync::Arc;

use crate::api::service::grant_store::{GrantStore, UserGrants};
use crate::cache::{GrantCache, ScopeKey};
use crate::core::error::AccessResult;
use crate::core::permission::{GrantTarget, RightLevel, WILDCARD};

/// 持有某个用户读锁期间的解析视图
///
/// 同一个 `UserRights` 上的多次解析看到的是同一版本的授权
pub struct UserRights<'a> {
    user: &'a str,
    grants: &'a UserGrants,
    cache: &'a GrantCache,
}

impl<'a> UserRights<'a> {
    pub fn user(&self) -> &str {
        self.user
    }

    /// 系统级显式授权，未定义时为 None 级别
    pub fn system(&self) -> RightLevel {
        self.grants
            .get(&GrantTarget::System)
            .unwrap_or(RightLevel::None)
    }

    /// 数据库级有效权限
    pub fn database(&self, database: &str) -> RightLevel {
        let key = ScopeKey::database(database);
        if let Some(level) = self.cache.get(self.user, &key) {
            return level;
        }

        let level = self
            .grants
            .get(&GrantTarget::database(database))
            .or_else(|| self.grants.get(&GrantTarget::database(WILDCARD)))
            .or_else(|| self.grants.get(&GrantTarget::System))
            .unwrap_or(RightLevel::None);

        trace!("解析数据库权限: user={} db={} -> {}", self.user, database, level);
        self.cache.put(self.user, key, level);
        level
    }

    /// 集合级有效权限
    pub fn collection(&self, database: &str, collection: &str) -> RightLevel {
        let key = ScopeKey::collection(database, collection);
        if let Some(level) = self.cache.get(self.user, &key) {
            return level;
        }

        let explicit = self
            .grants
            .get(&GrantTarget::collection(database, collection))
            .or_else(|| self.grants.get(&GrantTarget::collection(database, WILDCARD)));
        let level = match explicit {
            Some(level) => level,
            None => self.database(database),
        };

        trace!(
            "解析集合权限: user={} db={} col={} -> {}",
            self.user,
            database,
            collection,
            level
        );
        self.cache.put(self.user, key, level);
        level
    }
}

/// 有效权限解析器
///
/// 自身不持有可变状态，缓存和授权都来自 `GrantStore`
#[derive(Clone)]
pub struct RightsResolver {
    store: Arc<GrantStore>,
}

impl RightsResolver {
    pub fn new(store: Arc<GrantStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<GrantStore> {
        &self.store
    }

    /// 在用户读锁内执行一组解析
    pub fn with_user<R>(&self, user: &str, f: impl FnOnce(&UserRights<'_>) -> R) -> AccessResult<R> {
        let cache = self.store.cache();
        self.store.read_user(user, |grants| {
            let rights = UserRights {
                user,
                grants,
                cache: cache.as_ref(),
            };
            f(&rights)
        })
    }

    pub fn resolve_system(&self, user: &str) -> AccessResult<RightLevel> {
        self.with_user(user, |rights| rights.system())
    }

    pub fn resolve_database(&self, user: &str, database: &str) -> AccessResult<RightLevel> {
        self.with_user(user, |rights| rights.database(database))
    }

    pub fn resolve_collection(
        &self,
        user: &str,
        database: &str,
        collection: &str,
    ) -> AccessResult<RightLevel> {
        self.with_user(user, |rights| rights.collection(database, collection))
    }
}
