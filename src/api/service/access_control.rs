//! 访问控制入口
//!
//! 组合授权存储、权限解析、视图投影和权限检查，对外提供一个整体

use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::api::service::enforcement_gate::{Action, EnforcementGate, Verdict};
use crate::api::service::grant_store::GrantStore;
use crate::api::service::rights_resolver::RightsResolver;
use crate::api::service::view_projector::ViewRightsProjector;
use crate::cache::{CacheStatsSnapshot, GrantCache};
use crate::catalog::{SchemaLookup, ViewDescriptor};
use crate::config::{AuthConfig, ViewDenialPresentation};
use crate::core::error::{AccessError, AccessResult};
use crate::core::permission::{Grant, GrantTarget, RightLevel};

/// 外部授权请求
///
/// `level` 取 "rw" / "ro" / "none"，"undefined" 表示撤销显式授权；
/// 只给 `database` 为数据库级，两者都给为集合级，都不给为系统级
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantRequest {
    pub user: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub collection: Option<String>,
    pub level: String,
}

impl GrantRequest {
    pub fn new(user: impl Into<String>, level: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            database: None,
            collection: None,
            level: level.into(),
        }
    }

    pub fn on_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn on_collection(mut self, database: impl Into<String>, collection: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self.collection = Some(collection.into());
        self
    }

    pub fn target(&self) -> AccessResult<GrantTarget> {
        match (&self.database, &self.collection) {
            (None, None) => Ok(GrantTarget::System),
            (Some(db), None) => Ok(GrantTarget::database(db.as_str())),
            (Some(db), Some(col)) => Ok(GrantTarget::collection(db.as_str(), col.as_str())),
            (None, Some(col)) => Err(AccessError::InvalidGrantTarget(format!(
                "集合 {} 未指定所属数据库",
                col
            ))),
        }
    }
}

pub struct AccessControl {
    store: Arc<GrantStore>,
    resolver: RightsResolver,
    projector: ViewRightsProjector,
    gate: EnforcementGate,
    auth_config: AuthConfig,
}

impl AccessControl {
    pub fn new(auth_config: AuthConfig, schema: Arc<dyn SchemaLookup>) -> Self {
        let cache = Arc::new(GrantCache::new(auth_config.cache.clone()));
        let store = Arc::new(GrantStore::new(cache));
        let resolver = RightsResolver::new(Arc::clone(&store));
        let projector = ViewRightsProjector::new(resolver.clone(), Arc::clone(&schema));
        let gate = EnforcementGate::new(resolver.clone(), schema, auth_config.clone());
        Self {
            store,
            resolver,
            projector,
            gate,
            auth_config,
        }
    }

    pub fn store(&self) -> &Arc<GrantStore> {
        &self.store
    }

    pub fn gate(&self) -> &EnforcementGate {
        &self.gate
    }

    pub fn view_denial_presentation(&self) -> ViewDenialPresentation {
        self.auth_config.view_denial_presentation
    }

    // ==================== 用户管理 ====================

    /// 创建用户，已存在时返回 false
    pub fn create_user(&self, user: &str) -> bool {
        let created = self.store.create_user(user);
        if created {
            info!("创建用户: {}", user);
        }
        created
    }

    pub fn drop_user(&self, user: &str) -> AccessResult<()> {
        self.store.drop_user(user)?;
        info!("删除用户: {}", user);
        Ok(())
    }

    pub fn list_users(&self) -> Vec<String> {
        self.store.list_users()
    }

    // ==================== 授权管理 ====================

    pub fn grant_system(&self, user: &str, level: RightLevel) -> AccessResult<()> {
        self.grant(Grant::new(user, GrantTarget::System, level))
    }

    pub fn grant_database(&self, user: &str, database: &str, level: RightLevel) -> AccessResult<()> {
        self.grant(Grant::new(user, GrantTarget::database(database), level))
    }

    pub fn grant_collection(
        &self,
        user: &str,
        database: &str,
        collection: &str,
        level: RightLevel,
    ) -> AccessResult<()> {
        self.grant(Grant::new(
            user,
            GrantTarget::collection(database, collection),
            level,
        ))
    }

    pub fn revoke_system(&self, user: &str) -> AccessResult<()> {
        self.revoke(user, &GrantTarget::System)
    }

    pub fn revoke_database(&self, user: &str, database: &str) -> AccessResult<()> {
        self.revoke(user, &GrantTarget::database(database))
    }

    pub fn revoke_collection(&self, user: &str, database: &str, collection: &str) -> AccessResult<()> {
        self.revoke(user, &GrantTarget::collection(database, collection))
    }

    fn grant(&self, grant: Grant) -> AccessResult<()> {
        self.store.put(&grant)?;
        info!("授权: user={} target={} level={}", grant.user, grant.target, grant.level);
        Ok(())
    }

    fn revoke(&self, user: &str, target: &GrantTarget) -> AccessResult<()> {
        self.store.remove(user, target)?;
        info!("撤销授权: user={} target={}", user, target);
        Ok(())
    }

    /// 应用外部授权请求
    ///
    /// 级别字符串在修改任何状态之前解析，非法输入不会留下部分写入
    pub fn apply(&self, request: &GrantRequest) -> AccessResult<()> {
        let level = RightLevel::parse_optional(&request.level)?;
        let target = request.target()?;
        match level {
            Some(level) => self.grant(Grant::new(request.user.as_str(), target, level)),
            None => self.revoke(&request.user, &target),
        }
    }

    pub fn list_grants(&self, user: &str) -> AccessResult<Vec<Grant>> {
        self.store.list_for_user(user)
    }

    // ==================== 解析与检查 ====================

    pub fn resolve_system(&self, user: &str) -> AccessResult<RightLevel> {
        self.resolver.resolve_system(user)
    }

    pub fn resolve_database(&self, user: &str, database: &str) -> AccessResult<RightLevel> {
        self.resolver.resolve_database(user, database)
    }

    pub fn resolve_collection(&self, user: &str, database: &str, collection: &str) -> AccessResult<RightLevel> {
        self.resolver.resolve_collection(user, database, collection)
    }

    pub fn resolve_view(&self, user: &str, database: &str, view: &str) -> AccessResult<RightLevel> {
        self.projector.resolve_view(user, database, view)
    }

    pub fn authorize(&self, acting_as: &str, database: &str, action: Action<'_>) -> AccessResult<Verdict> {
        self.gate.authorize(acting_as, database, action)
    }

    pub fn check(&self, acting_as: &str, database: &str, action: Action<'_>) -> AccessResult<()> {
        self.gate.check(acting_as, database, action)
    }

    /// 检查视图操作，通过时返回判定所依据的视图快照
    pub fn check_view(&self, acting_as: &str, database: &str, action: Action<'_>) -> AccessResult<Arc<ViewDescriptor>> {
        self.gate.check_view(acting_as, database, action)
    }

    pub fn cache_stats(&self) -> CacheStatsSnapshot {
        self.store.cache().stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::SchemaCatalog;

    fn create_test_access() -> AccessControl {
        let catalog = Arc::new(SchemaCatalog::new());
        catalog.create_database("db").unwrap();
        catalog.create_collection("db", "c1").unwrap();
        let access = AccessControl::new(AuthConfig::default(), catalog);
        access.create_user("u1");
        access
    }

    #[test]
    fn test_grant_request_target() {
        assert_eq!(GrantRequest::new("u", "rw").target().unwrap(), GrantTarget::System);
        assert_eq!(
            GrantRequest::new("u", "rw").on_collection("db", "c").target().unwrap(),
            GrantTarget::collection("db", "c")
        );

        let request = GrantRequest {
            collection: Some("c".to_string()),
            ..GrantRequest::new("u", "rw")
        };
        assert!(matches!(request.target(), Err(AccessError::InvalidGrantTarget(_))));
    }

    #[test]
    fn test_grant_request_from_json() {
        let request: GrantRequest =
            serde_json::from_str(r#"{"user":"u1","database":"db","level":"ro"}"#).unwrap();
        assert_eq!(request.target().unwrap(), GrantTarget::database("db"));
        assert_eq!(request.level, "ro");
    }

    #[test]
    fn test_apply_and_undefined_revokes() {
        let access = create_test_access();
        access
            .apply(&GrantRequest::new("u1", "rw").on_database("db"))
            .unwrap();
        access
            .apply(&GrantRequest::new("u1", "none").on_collection("db", "c1"))
            .unwrap();
        assert_eq!(access.resolve_collection("u1", "db", "c1").unwrap(), RightLevel::None);

        access
            .apply(&GrantRequest::new("u1", "undefined").on_collection("db", "c1"))
            .unwrap();
        assert_eq!(
            access.resolve_collection("u1", "db", "c1").unwrap(),
            RightLevel::ReadWrite
        );
    }

    #[test]
    fn test_malformed_level_leaves_state_unchanged() {
        let access = create_test_access();
        access.grant_database("u1", "db", RightLevel::ReadOnly).unwrap();

        let result = access.apply(&GrantRequest::new("u1", "admin").on_database("db"));
        assert_eq!(result, Err(AccessError::InvalidRightLevel("admin".to_string())));
        assert_eq!(access.resolve_database("u1", "db").unwrap(), RightLevel::ReadOnly);
        assert_eq!(access.list_grants("u1").unwrap().len(), 1);
    }

    #[test]
    fn test_revoke_missing_grant_is_noop() {
        let access = create_test_access();
        assert!(access.revoke_collection("u1", "db", "c1").is_ok());
        assert!(access.revoke_system("u1").is_ok());
        assert!(access.list_grants("u1").unwrap().is_empty());
    }

    #[test]
    fn test_drop_user_removes_grants() {
        let access = create_test_access();
        access.grant_system("u1", RightLevel::ReadWrite).unwrap();
        access.drop_user("u1").unwrap();

        assert_eq!(
            access.resolve_system("u1"),
            Err(AccessError::UnknownUser("u1".to_string()))
        );
        assert!(access.create_user("u1"));
        assert_eq!(access.resolve_database("u1", "db").unwrap(), RightLevel::None);
    }
}
