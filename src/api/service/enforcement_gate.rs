use log::trace;
use std::sync::Arc;

use crate::api::service::rights_resolver::{RightsResolver, UserRights};
use crate::api::service::view_projector::ViewRightsProjector;
use crate::catalog::{SchemaLookup, ViewDescriptor};
use crate::config::AuthConfig;
use crate::core::error::{AccessError, AccessResult, DenyReason, TargetKind};

/// 操作类型 - 对应不同的权限检查
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    // 模式操作
    CreateCollection(&'a str),
    DropCollection(&'a str),
    TruncateCollection(&'a str),
    CreateView(&'a str),
    DropView(&'a str),
    /// 修改视图属性，`sources` 为新属性引用的集合
    UpdateViewProperties { view: &'a str, sources: &'a [String] },

    // 后台任务
    RegisterTask,

    // 数据操作
    ReadCollection(&'a str),
    WriteDocuments(&'a str),
    QueryView(&'a str),
    ReadViewProperties(&'a str),
}

impl Action<'_> {
    /// 操作的目标对象，创建类操作的目标尚不存在
    fn existing_target(&self) -> Option<(TargetKind, &str)> {
        match *self {
            Action::DropCollection(c)
            | Action::TruncateCollection(c)
            | Action::ReadCollection(c)
            | Action::WriteDocuments(c) => Some((TargetKind::Collection, c)),
            Action::DropView(v)
            | Action::QueryView(v)
            | Action::ReadViewProperties(v)
            | Action::UpdateViewProperties { view: v, .. } => Some((TargetKind::View, v)),
            Action::CreateCollection(_) | Action::CreateView(_) | Action::RegisterTask => None,
        }
    }
}

/// 检查结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Allow,
    Deny(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow)
    }

    /// 拒绝转换为对应的 `AccessError`，便于调用方用 `?` 中止操作
    pub fn into_result(self) -> AccessResult<()> {
        match self {
            Verdict::Allow => Ok(()),
            Verdict::Deny(reason) => Err(reason.into()),
        }
    }
}

fn require(allowed: bool, reason: DenyReason) -> Result<(), DenyReason> {
    if allowed {
        Ok(())
    } else {
        Err(reason)
    }
}

/// 权限检查器 - 业务层
///
/// 职责：
/// 1. 提供统一的权限检查入口 `authorize`
/// 2. 把操作映射为所需的最低权限级别和需要评估的作用域
/// 3. 区分"目标不存在"和"权限不足"
///
/// 不直接读取授权数据，通过 `RightsResolver` 和 `ViewRightsProjector` 访问
#[derive(Clone)]
pub struct EnforcementGate {
    resolver: RightsResolver,
    schema: Arc<dyn SchemaLookup>,
    auth_config: AuthConfig,
}

impl EnforcementGate {
    pub fn new(resolver: RightsResolver, schema: Arc<dyn SchemaLookup>, auth_config: AuthConfig) -> Self {
        Self {
            resolver,
            schema,
            auth_config,
        }
    }

    pub fn auth_config(&self) -> &AuthConfig {
        &self.auth_config
    }

    // ==================== 统一权限检查入口 ====================

    /// 判断 `acting_as` 能否在 `database` 上执行 `action`
    ///
    /// 用户或目标不存在时返回错误，权限不足时返回 `Verdict::Deny`
    pub fn authorize(&self, acting_as: &str, database: &str, action: Action<'_>) -> AccessResult<Verdict> {
        self.authorize_with_snapshot(acting_as, database, action)
            .map(|(verdict, _)| verdict)
    }

    /// 检查并把拒绝转换为错误
    pub fn check(&self, acting_as: &str, database: &str, action: Action<'_>) -> AccessResult<()> {
        self.authorize(acting_as, database, action)?.into_result()
    }

    /// 检查视图操作，通过时返回判定所依据的视图快照
    ///
    /// 调用方应只通过这个快照读取视图的源集合和属性，
    /// 否则判定与读取可能落在两个不同版本的源集合上
    pub fn check_view(
        &self,
        acting_as: &str,
        database: &str,
        action: Action<'_>,
    ) -> AccessResult<Arc<ViewDescriptor>> {
        let (verdict, view) = self.authorize_with_snapshot(acting_as, database, action)?;
        verdict.into_result()?;
        view.ok_or_else(|| {
            let name = action.existing_target().map(|(_, name)| name).unwrap_or_default();
            AccessError::unknown_target(TargetKind::View, name)
        })
    }

    fn authorize_with_snapshot(
        &self,
        acting_as: &str,
        database: &str,
        action: Action<'_>,
    ) -> AccessResult<(Verdict, Option<Arc<ViewDescriptor>>)> {
        if !self.resolver.store().contains_user(acting_as) {
            return Err(AccessError::UnknownUser(acting_as.to_string()));
        }
        let view = self.check_targets(database, &action)?;

        if !self.auth_config.enable_authorize {
            return Ok((Verdict::Allow, view));
        }

        let verdict = self.resolver.with_user(acting_as, |rights| {
            match Self::evaluate(rights, database, &action, view.as_deref()) {
                Ok(()) => Verdict::Allow,
                Err(reason) => Verdict::Deny(reason),
            }
        })?;
        trace!("权限检查: user={} db={} action={:?} -> {:?}", acting_as, database, action, verdict);
        Ok((verdict, view))
    }

    /// 目标存在性检查，视图操作返回本次检查使用的视图快照
    fn check_targets(&self, database: &str, action: &Action<'_>) -> AccessResult<Option<Arc<ViewDescriptor>>> {
        if !self.schema.has_database(database) {
            return Err(AccessError::unknown_target(TargetKind::Database, database));
        }

        match action.existing_target() {
            Some((TargetKind::Collection, collection)) => {
                if self.schema.has_collection(database, collection) {
                    Ok(None)
                } else {
                    Err(AccessError::unknown_target(TargetKind::Collection, collection))
                }
            }
            Some((TargetKind::View, view)) => self
                .schema
                .view_descriptor(database, view)
                .map(Some)
                .ok_or_else(|| AccessError::unknown_target(TargetKind::View, view)),
            _ => Ok(None),
        }
    }

    // ==================== 具体业务逻辑检查方法 ====================

    fn evaluate(
        rights: &UserRights<'_>,
        database: &str,
        action: &Action<'_>,
        view: Option<&ViewDescriptor>,
    ) -> Result<(), DenyReason> {
        match *action {
            Action::CreateCollection(_)
            | Action::CreateView(_)
            | Action::DropView(_)
            | Action::RegisterTask => Self::require_database_write(rights, database),

            Action::DropCollection(collection) | Action::TruncateCollection(collection) => {
                Self::require_database_write(rights, database)?;
                require(
                    rights.collection(database, collection).can_write(),
                    DenyReason::InsufficientCollectionRight,
                )
            }

            Action::ReadCollection(collection) => require(
                rights.collection(database, collection).can_read(),
                DenyReason::InsufficientCollectionRight,
            ),

            Action::WriteDocuments(collection) => require(
                rights.collection(database, collection).can_write(),
                DenyReason::InsufficientCollectionRight,
            ),

            Action::QueryView(_) | Action::ReadViewProperties(_) => {
                Self::check_view_read(rights, database, view)
            }

            Action::UpdateViewProperties { sources, .. } => {
                Self::require_database_write(rights, database)?;
                Self::check_view_read(rights, database, view)?;
                // 新链接的集合至少需要只读权限
                for collection in sources {
                    require(
                        rights.collection(database, collection).can_read(),
                        DenyReason::InsufficientCollectionRight,
                    )?;
                }
                Ok(())
            }
        }
    }

    fn require_database_write(rights: &UserRights<'_>, database: &str) -> Result<(), DenyReason> {
        require(
            rights.database(database).can_write(),
            DenyReason::InsufficientDatabaseRight,
        )
    }

    /// 视图数据查询与属性读取共用同一判定，保证两者的拒绝分类一致
    fn check_view_read(
        rights: &UserRights<'_>,
        database: &str,
        view: Option<&ViewDescriptor>,
    ) -> Result<(), DenyReason> {
        let projected = match view {
            Some(descriptor) => ViewRightsProjector::project(rights, descriptor),
            None => rights.database(database),
        };
        require(projected.can_read(), DenyReason::InsufficientViewRight)?;
        require(
            rights.database(database).can_read(),
            DenyReason::InsufficientDatabaseRight,
        )
    }
}
