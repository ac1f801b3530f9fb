use log::info;
use serde_json::Value;
use std::sync::Arc;

use crate::api::service::access_control::AccessControl;
use crate::api::service::enforcement_gate::Action;
use crate::catalog::{SchemaCatalog, ViewDescriptor, ViewProperties};
use crate::config::Config;
use crate::core::error::{DBError, DBResult, PublicError};

/// 带权限检查的数据库服务
///
/// 每个操作先由权限检查器判定，通过后才访问模式目录；
/// 被拒绝的操作不会产生任何副作用
pub struct DatabaseService {
    catalog: Arc<SchemaCatalog>,
    access: Arc<AccessControl>,
}

impl DatabaseService {
    pub fn new(config: &Config) -> Arc<Self> {
        let catalog = Arc::new(SchemaCatalog::new());
        let access = Arc::new(AccessControl::new(config.auth.clone(), catalog.clone()));
        Arc::new(Self { catalog, access })
    }

    pub fn catalog(&self) -> &Arc<SchemaCatalog> {
        &self.catalog
    }

    pub fn access(&self) -> &Arc<AccessControl> {
        &self.access
    }

    /// 按配置的掩码策略把错误转换为对外错误
    pub fn present(&self, error: &DBError) -> PublicError {
        error.present(self.access.view_denial_presentation())
    }

    // ==================== 数据库（管理入口，不经过权限检查） ====================

    pub fn create_database(&self, database: &str) -> DBResult<()> {
        self.catalog.create_database(database)?;
        info!("创建数据库: {}", database);
        Ok(())
    }

    pub fn drop_database(&self, database: &str) -> DBResult<()> {
        self.catalog.drop_database(database)?;
        info!("删除数据库: {}", database);
        Ok(())
    }

    // ==================== 集合 ====================

    pub fn create_collection(&self, acting_as: &str, database: &str, collection: &str) -> DBResult<()> {
        self.access
            .check(acting_as, database, Action::CreateCollection(collection))?;
        self.catalog.create_collection(database, collection)?;
        info!("{} 创建集合: {}/{}", acting_as, database, collection);
        Ok(())
    }

    pub fn drop_collection(&self, acting_as: &str, database: &str, collection: &str) -> DBResult<()> {
        self.access
            .check(acting_as, database, Action::DropCollection(collection))?;
        self.catalog.drop_collection(database, collection)?;
        info!("{} 删除集合: {}/{}", acting_as, database, collection);
        Ok(())
    }

    /// 清空集合，返回删除的文档数
    pub fn truncate_collection(&self, acting_as: &str, database: &str, collection: &str) -> DBResult<usize> {
        self.access
            .check(acting_as, database, Action::TruncateCollection(collection))?;
        let removed = self.catalog.truncate_collection(database, collection)?;
        info!(
            "{} 清空集合: {}/{}，删除 {} 个文档",
            acting_as, database, collection, removed
        );
        Ok(removed)
    }

    pub fn list_collections(&self, database: &str) -> DBResult<Vec<String>> {
        Ok(self.catalog.list_collections(database)?)
    }

    // ==================== 文档 ====================

    pub fn insert_document(
        &self,
        acting_as: &str,
        database: &str,
        collection: &str,
        key: Option<&str>,
        document: Value,
    ) -> DBResult<String> {
        self.access
            .check(acting_as, database, Action::WriteDocuments(collection))?;
        Ok(self
            .catalog
            .insert_document(database, collection, key, document)?)
    }

    /// 批量插入，权限只检查一次
    pub fn insert_documents(
        &self,
        acting_as: &str,
        database: &str,
        collection: &str,
        documents: Vec<Value>,
    ) -> DBResult<Vec<String>> {
        self.access
            .check(acting_as, database, Action::WriteDocuments(collection))?;
        let mut keys = Vec::with_capacity(documents.len());
        for document in documents {
            keys.push(
                self.catalog
                    .insert_document(database, collection, None, document)?,
            );
        }
        Ok(keys)
    }

    pub fn read_collection(&self, acting_as: &str, database: &str, collection: &str) -> DBResult<Vec<Value>> {
        self.access
            .check(acting_as, database, Action::ReadCollection(collection))?;
        Ok(self.catalog.documents(database, collection)?)
    }

    pub fn count(&self, acting_as: &str, database: &str, collection: &str) -> DBResult<usize> {
        self.access
            .check(acting_as, database, Action::ReadCollection(collection))?;
        Ok(self.catalog.count(database, collection)?)
    }

    // ==================== 视图 ====================

    pub fn create_view(
        &self,
        acting_as: &str,
        database: &str,
        view: &str,
        properties: ViewProperties,
    ) -> DBResult<Arc<ViewDescriptor>> {
        self.access
            .check(acting_as, database, Action::CreateView(view))?;
        let descriptor = self.catalog.create_view(database, view, properties)?;
        info!("{} 创建视图: {}/{}", acting_as, database, view);
        Ok(descriptor)
    }

    pub fn drop_view(&self, acting_as: &str, database: &str, view: &str) -> DBResult<()> {
        self.access
            .check(acting_as, database, Action::DropView(view))?;
        self.catalog.drop_view(database, view)?;
        info!("{} 删除视图: {}/{}", acting_as, database, view);
        Ok(())
    }

    /// 查询视图数据
    ///
    /// 只读取权限判定所依据的那个视图快照的源集合
    pub fn query_view(&self, acting_as: &str, database: &str, view: &str) -> DBResult<Vec<Value>> {
        let snapshot = self
            .access
            .check_view(acting_as, database, Action::QueryView(view))?;
        Ok(self.catalog.documents_for(&snapshot)?)
    }

    /// 读取视图属性，与数据查询使用相同的判定
    pub fn view_properties(&self, acting_as: &str, database: &str, view: &str) -> DBResult<ViewProperties> {
        let snapshot = self
            .access
            .check_view(acting_as, database, Action::ReadViewProperties(view))?;
        Ok(snapshot.properties.clone())
    }

    /// 修改视图属性
    ///
    /// 视图在权限检查之后被修改时返回 `ViewChanged`，调用方可重新提交
    pub fn update_view_properties(
        &self,
        acting_as: &str,
        database: &str,
        view: &str,
        properties: ViewProperties,
    ) -> DBResult<Arc<ViewDescriptor>> {
        let sources = properties.source_collections();
        let checked = self.access.check_view(
            acting_as,
            database,
            Action::UpdateViewProperties {
                view,
                sources: &sources,
            },
        )?;
        let descriptor = self
            .catalog
            .replace_view_properties(database, view, &checked, properties)?;
        info!("{} 修改视图属性: {}/{}", acting_as, database, view);
        Ok(descriptor)
    }
}
