use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

use crate::cache::GrantCache;
use crate::core::error::{AccessError, AccessResult};
use crate::core::permission::{Grant, GrantTarget, RightLevel};

/// 单个用户的显式授权集合
///
/// 外层的 `RwLock` 即该用户的临界区：写入方持有写锁完成存储更新和缓存失效，
/// 读取方持有读锁完成解析和缓存回填
#[derive(Debug, Default)]
pub struct UserGrants {
    grants: HashMap<GrantTarget, RightLevel>,
    dropped: bool,
}

impl UserGrants {
    /// 获取显式授权，未定义返回 None
    pub fn get(&self, target: &GrantTarget) -> Option<RightLevel> {
        self.grants.get(target).copied()
    }

    pub fn len(&self) -> usize {
        self.grants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grants.is_empty()
    }
}

/// 授权存储 - 数据层
///
/// 职责：
/// 1. 管理用户到显式授权的映射（username -> {target -> level}）
/// 2. 每次写入在返回前同步失效该用户的缓存
///
/// 注意：本层不做继承或覆盖判断，只提供原子的读写
pub struct GrantStore {
    users: DashMap<String, Arc<RwLock<UserGrants>>>,
    cache: Arc<GrantCache>,
}

impl GrantStore {
    pub fn new(cache: Arc<GrantCache>) -> Self {
        Self {
            users: DashMap::new(),
            cache,
        }
    }

    pub fn cache(&self) -> &Arc<GrantCache> {
        &self.cache
    }

    // ==================== 用户管理 ====================

    /// 登记用户，已存在时返回 false
    pub fn create_user(&self, user: &str) -> bool {
        let mut created = false;
        self.users.entry(user.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(RwLock::new(UserGrants::default()))
        });
        created
    }

    /// 删除用户及其全部授权
    pub fn drop_user(&self, user: &str) -> AccessResult<()> {
        let entry = self.user_entry(user)?;
        {
            let mut grants = entry.write();
            grants.dropped = true;
            grants.grants.clear();
            self.cache.invalidate_user(user);
        }
        self.users.remove_if(user, |_, current| Arc::ptr_eq(current, &entry));
        Ok(())
    }

    pub fn contains_user(&self, user: &str) -> bool {
        self.users.contains_key(user)
    }

    pub fn list_users(&self) -> Vec<String> {
        self.users.iter().map(|e| e.key().clone()).collect()
    }

    fn user_entry(&self, user: &str) -> AccessResult<Arc<RwLock<UserGrants>>> {
        // 先克隆出 Arc，避免在持有分片锁时等待用户锁
        self.users
            .get(user)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(|| AccessError::UnknownUser(user.to_string()))
    }

    // ==================== 授权读写 ====================

    /// 写入授权，相同键覆盖原有级别
    pub fn put(&self, grant: &Grant) -> AccessResult<()> {
        let entry = self.user_entry(&grant.user)?;
        let mut grants = entry.write();
        if grants.dropped {
            return Err(AccessError::UnknownUser(grant.user.clone()));
        }

        if grants.grants.get(&grant.target) == Some(&grant.level) {
            return Ok(());
        }
        grants.grants.insert(grant.target.clone(), grant.level);
        self.cache.invalidate_user(&grant.user);
        Ok(())
    }

    /// 获取显式授权
    pub fn get(&self, user: &str, target: &GrantTarget) -> AccessResult<Option<RightLevel>> {
        self.read_user(user, |grants| grants.get(target))
    }

    /// 删除授权，键不存在时为空操作
    pub fn remove(&self, user: &str, target: &GrantTarget) -> AccessResult<()> {
        let entry = self.user_entry(user)?;
        let mut grants = entry.write();
        if grants.dropped {
            return Err(AccessError::UnknownUser(user.to_string()));
        }

        if grants.grants.remove(target).is_some() {
            self.cache.invalidate_user(user);
        }
        Ok(())
    }

    /// 列出用户的所有显式授权，按目标排序
    pub fn list_for_user(&self, user: &str) -> AccessResult<Vec<Grant>> {
        self.read_user(user, |grants| {
            let mut list: Vec<Grant> = grants
                .grants
                .iter()
                .map(|(target, &level)| Grant::new(user, target.clone(), level))
                .collect();
            list.sort_by(|a, b| a.target.cmp(&b.target));
            list
        })
    }

    /// 在用户读锁内执行闭包
    ///
    /// 闭包执行期间该用户的授权不会被修改
    pub fn read_user<R>(&self, user: &str, f: impl FnOnce(&UserGrants) -> R) -> AccessResult<R> {
        let entry = self.user_entry(user)?;
        let grants = entry.read();
        if grants.dropped {
            return Err(AccessError::UnknownUser(user.to_string()));
        }
        Ok(f(&grants))
    }
}

impl Default for GrantStore {
    fn default() -> Self {
        Self::new(Arc::new(GrantCache::default()))
    }
}
