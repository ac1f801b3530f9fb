//! 视图权限投影
//!
//! 视图的有效权限是其所有源集合有效权限的最小值（最严格者胜出），
//! 与作用域覆盖规则刻意不对称：任一源集合为 `None` 时整个视图不可读。
//! 没有源集合的视图退化为数据库级权限。

use std::sync::Arc;

use crate::api::service::rights_resolver::{RightsResolver, UserRights};
use crate::catalog::{SchemaLookup, ViewDescriptor};
use crate::core::error::{AccessError, AccessResult, TargetKind};
use crate::core::permission::RightLevel;

#[derive(Clone)]
pub struct ViewRightsProjector {
    resolver: RightsResolver,
    schema: Arc<dyn SchemaLookup>,
}

impl ViewRightsProjector {
    pub fn new(resolver: RightsResolver, schema: Arc<dyn SchemaLookup>) -> Self {
        Self { resolver, schema }
    }

    /// 获取视图描述快照，视图不存在时返回 `UnknownTarget`
    pub fn descriptor(&self, database: &str, view: &str) -> AccessResult<Arc<ViewDescriptor>> {
        self.schema
            .view_descriptor(database, view)
            .ok_or_else(|| AccessError::unknown_target(TargetKind::View, view))
    }

    pub fn resolve_view(&self, user: &str, database: &str, view: &str) -> AccessResult<RightLevel> {
        let descriptor = self.descriptor(database, view)?;
        self.resolver
            .with_user(user, |rights| Self::project(rights, &descriptor))
    }

    /// 在一个授权版本、一个视图快照上折叠源集合权限
    pub fn project(rights: &UserRights<'_>, descriptor: &ViewDescriptor) -> RightLevel {
        let database = descriptor.database.as_str();
        descriptor
            .sources()
            .iter()
            .map(|collection| rights.collection(database, collection))
            .min()
            .unwrap_or_else(|| rights.database(database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::service::grant_store::GrantStore;
    use crate::catalog::{IndexRef, SchemaCatalog, ViewProperties};
    use crate::core::permission::{Grant, GrantTarget};

    struct Fixture {
        store: Arc<GrantStore>,
        catalog: Arc<SchemaCatalog>,
        projector: ViewRightsProjector,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(GrantStore::default());
        store.create_user("u1");
        let catalog = Arc::new(SchemaCatalog::new());
        catalog.create_database("db").unwrap();
        catalog.create_collection("db", "a").unwrap();
        catalog.create_collection("db", "b").unwrap();
        let projector = ViewRightsProjector::new(RightsResolver::new(Arc::clone(&store)), catalog.clone());
        Fixture {
            store,
            catalog,
            projector,
        }
    }

    fn grant(f: &Fixture, target: GrantTarget, level: RightLevel) {
        f.store.put(&Grant::new("u1", target, level)).unwrap();
    }

    #[test]
    fn test_most_restrictive_source_wins() {
        let f = fixture();
        f.catalog
            .create_view("db", "v", ViewProperties::linked(["a", "b"]))
            .unwrap();
        grant(&f, GrantTarget::database("db"), RightLevel::ReadWrite);
        assert_eq!(f.projector.resolve_view("u1", "db", "v").unwrap(), RightLevel::ReadWrite);

        grant(&f, GrantTarget::collection("db", "b"), RightLevel::None);
        assert_eq!(f.projector.resolve_view("u1", "db", "v").unwrap(), RightLevel::None);

        grant(&f, GrantTarget::collection("db", "b"), RightLevel::ReadOnly);
        assert_eq!(f.projector.resolve_view("u1", "db", "v").unwrap(), RightLevel::ReadOnly);
    }

    #[test]
    fn test_empty_view_uses_database_level() {
        let f = fixture();
        f.catalog
            .create_view("db", "empty", ViewProperties::linked(Vec::<String>::new()))
            .unwrap();
        grant(&f, GrantTarget::database("db"), RightLevel::ReadOnly);
        grant(&f, GrantTarget::collection("db", "a"), RightLevel::None);

        assert_eq!(
            f.projector.resolve_view("u1", "db", "empty").unwrap(),
            RightLevel::ReadOnly
        );
    }

    #[test]
    fn test_indexed_view_projection() {
        let f = fixture();
        f.catalog
            .create_view(
                "db",
                "iv",
                ViewProperties::indexed(vec![IndexRef::new("a", "inv")]),
            )
            .unwrap();
        grant(&f, GrantTarget::database("db"), RightLevel::None);
        grant(&f, GrantTarget::collection("db", "a"), RightLevel::ReadOnly);

        assert_eq!(
            f.projector.resolve_view("u1", "db", "iv").unwrap(),
            RightLevel::ReadOnly
        );
    }

    #[test]
    fn test_source_change_is_visible_immediately() {
        let f = fixture();
        f.catalog
            .create_view("db", "v", ViewProperties::linked(["a"]))
            .unwrap();
        grant(&f, GrantTarget::database("db"), RightLevel::ReadWrite);
        grant(&f, GrantTarget::collection("db", "b"), RightLevel::None);
        assert_eq!(f.projector.resolve_view("u1", "db", "v").unwrap(), RightLevel::ReadWrite);

        f.catalog
            .update_view_properties("db", "v", ViewProperties::linked(["a", "b"]))
            .unwrap();
        assert_eq!(f.projector.resolve_view("u1", "db", "v").unwrap(), RightLevel::None);
    }

    #[test]
    fn test_unknown_view() {
        let f = fixture();
        assert_eq!(
            f.projector.resolve_view("u1", "db", "missing"),
            Err(AccessError::unknown_target(TargetKind::View, "missing"))
        );
    }
}
