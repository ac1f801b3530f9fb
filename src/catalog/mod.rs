//! 模式目录
//!
//! 数据库、集合和视图的内存目录，是权限引擎的外部协作方：
//! - 向视图权限投影器提供视图的源集合（`SchemaLookup`）
//! - 向权限检查器提供目标存在性判断
//!
//! 目录本身不做任何权限判断，受保护的入口在 `DatabaseService`

pub mod view;

pub use view::{IndexRef, ViewDescriptor, ViewKind, ViewProperties};

use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::core::error::{CatalogError, CatalogResult};

/// 目录只读接口
pub trait SchemaLookup: Send + Sync {
    fn has_database(&self, database: &str) -> bool;

    fn has_collection(&self, database: &str, collection: &str) -> bool;

    /// 视图描述快照，反映最近一次提交的属性更新
    fn view_descriptor(&self, database: &str, view: &str) -> Option<Arc<ViewDescriptor>>;

    /// 视图的源集合
    fn view_sources(&self, database: &str, view: &str) -> Option<Vec<String>> {
        self.view_descriptor(database, view)
            .map(|descriptor| descriptor.sources().to_vec())
    }
}

#[derive(Debug, Default)]
struct CollectionData {
    documents: BTreeMap<String, Value>,
    next_key: u64,
}

#[derive(Debug, Default)]
struct DatabaseEntry {
    collections: HashMap<String, CollectionData>,
    views: HashMap<String, Arc<ViewDescriptor>>,
}

impl DatabaseEntry {
    fn replace_view(
        &mut self,
        database: &str,
        view: &str,
        expected: Option<&Arc<ViewDescriptor>>,
        properties: ViewProperties,
    ) -> CatalogResult<Arc<ViewDescriptor>> {
        let current = self
            .views
            .get(view)
            .ok_or_else(|| view_not_found(database, view))?;
        if let Some(expected) = expected {
            if !Arc::ptr_eq(current, expected) {
                return Err(CatalogError::ViewChanged {
                    database: database.to_string(),
                    view: view.to_string(),
                });
            }
        }
        if current.kind() != properties.kind() {
            return Err(CatalogError::ViewKindMismatch(format!(
                "{} 是 {} 视图，不能改为 {}",
                view,
                current.kind(),
                properties.kind()
            )));
        }
        self.check_sources(database, &properties)?;
        let descriptor = Arc::new(ViewDescriptor::new(database, view, properties));
        self.views.insert(view.to_string(), Arc::clone(&descriptor));
        Ok(descriptor)
    }

    fn check_sources(&self, database: &str, properties: &ViewProperties) -> CatalogResult<()> {
        for collection in properties.source_collections() {
            if !self.collections.contains_key(&collection) {
                return Err(CatalogError::CollectionNotFound {
                    database: database.to_string(),
                    collection,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct SchemaCatalog {
    databases: RwLock<HashMap<String, DatabaseEntry>>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== 数据库 ====================

    pub fn create_database(&self, database: &str) -> CatalogResult<()> {
        let mut databases = self.databases.write();
        if databases.contains_key(database) {
            return Err(CatalogError::DatabaseAlreadyExists(database.to_string()));
        }
        databases.insert(database.to_string(), DatabaseEntry::default());
        Ok(())
    }

    pub fn drop_database(&self, database: &str) -> CatalogResult<()> {
        self.databases
            .write()
            .remove(database)
            .map(|_| ())
            .ok_or_else(|| CatalogError::DatabaseNotFound(database.to_string()))
    }

    pub fn list_databases(&self) -> Vec<String> {
        let mut names: Vec<String> = self.databases.read().keys().cloned().collect();
        names.sort();
        names
    }

    fn read_database<R>(
        &self,
        database: &str,
        f: impl FnOnce(&DatabaseEntry) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let databases = self.databases.read();
        let entry = databases
            .get(database)
            .ok_or_else(|| CatalogError::DatabaseNotFound(database.to_string()))?;
        f(entry)
    }

    fn write_database<R>(
        &self,
        database: &str,
        f: impl FnOnce(&mut DatabaseEntry) -> CatalogResult<R>,
    ) -> CatalogResult<R> {
        let mut databases = self.databases.write();
        let entry = databases
            .get_mut(database)
            .ok_or_else(|| CatalogError::DatabaseNotFound(database.to_string()))?;
        f(entry)
    }

    // ==================== 集合 ====================

    pub fn create_collection(&self, database: &str, collection: &str) -> CatalogResult<()> {
        self.write_database(database, |entry| {
            if entry.collections.contains_key(collection) {
                return Err(CatalogError::CollectionAlreadyExists {
                    database: database.to_string(),
                    collection: collection.to_string(),
                });
            }
            entry
                .collections
                .insert(collection.to_string(), CollectionData::default());
            Ok(())
        })
    }

    /// 删除集合，并在同一临界区内把它从所有视图的源集合中移除
    pub fn drop_collection(&self, database: &str, collection: &str) -> CatalogResult<()> {
        self.write_database(database, |entry| {
            if entry.collections.remove(collection).is_none() {
                return Err(collection_not_found(database, collection));
            }
            for descriptor in entry.views.values_mut() {
                if descriptor.links_collection(collection) {
                    let properties = descriptor.properties.without_collection(collection);
                    *descriptor = Arc::new(ViewDescriptor::new(
                        database,
                        descriptor.name.clone(),
                        properties,
                    ));
                }
            }
            Ok(())
        })
    }

    /// 清空集合，返回删除的文档数
    pub fn truncate_collection(&self, database: &str, collection: &str) -> CatalogResult<usize> {
        self.write_database(database, |entry| {
            let data = entry
                .collections
                .get_mut(collection)
                .ok_or_else(|| collection_not_found(database, collection))?;
            let removed = data.documents.len();
            data.documents.clear();
            Ok(removed)
        })
    }

    /// 插入文档，未指定键时自动生成，相同键覆盖
    pub fn insert_document(
        &self,
        database: &str,
        collection: &str,
        key: Option<&str>,
        document: Value,
    ) -> CatalogResult<String> {
        self.write_database(database, |entry| {
            let data = entry
                .collections
                .get_mut(collection)
                .ok_or_else(|| collection_not_found(database, collection))?;
            let key = match key {
                Some(key) => key.to_string(),
                // 跳过已被显式指定的数字键
                None => loop {
                    data.next_key += 1;
                    let candidate = data.next_key.to_string();
                    if !data.documents.contains_key(&candidate) {
                        break candidate;
                    }
                },
            };
            data.documents.insert(key.clone(), document);
            Ok(key)
        })
    }

    pub fn count(&self, database: &str, collection: &str) -> CatalogResult<usize> {
        self.read_database(database, |entry| {
            entry
                .collections
                .get(collection)
                .map(|data| data.documents.len())
                .ok_or_else(|| collection_not_found(database, collection))
        })
    }

    pub fn documents(&self, database: &str, collection: &str) -> CatalogResult<Vec<Value>> {
        self.read_database(database, |entry| {
            entry
                .collections
                .get(collection)
                .map(|data| data.documents.values().cloned().collect())
                .ok_or_else(|| collection_not_found(database, collection))
        })
    }

    pub fn list_collections(&self, database: &str) -> CatalogResult<Vec<String>> {
        self.read_database(database, |entry| {
            let mut names: Vec<String> = entry.collections.keys().cloned().collect();
            names.sort();
            Ok(names)
        })
    }

    // ==================== 视图 ====================

    pub fn create_view(
        &self,
        database: &str,
        view: &str,
        properties: ViewProperties,
    ) -> CatalogResult<Arc<ViewDescriptor>> {
        self.write_database(database, |entry| {
            if entry.views.contains_key(view) {
                return Err(CatalogError::ViewAlreadyExists {
                    database: database.to_string(),
                    view: view.to_string(),
                });
            }
            entry.check_sources(database, &properties)?;
            let descriptor = Arc::new(ViewDescriptor::new(database, view, properties));
            entry.views.insert(view.to_string(), Arc::clone(&descriptor));
            Ok(descriptor)
        })
    }

    /// 整体替换视图属性，调用返回后新的源集合立即可见
    pub fn update_view_properties(
        &self,
        database: &str,
        view: &str,
        properties: ViewProperties,
    ) -> CatalogResult<Arc<ViewDescriptor>> {
        self.write_database(database, |entry| entry.replace_view(database, view, None, properties))
    }

    /// 仅当视图仍是 `expected` 这个快照时才替换属性
    ///
    /// 视图在检查之后被其他调用修改时返回 `ViewChanged`，不做任何修改
    pub fn replace_view_properties(
        &self,
        database: &str,
        view: &str,
        expected: &Arc<ViewDescriptor>,
        properties: ViewProperties,
    ) -> CatalogResult<Arc<ViewDescriptor>> {
        self.write_database(database, |entry| {
            entry.replace_view(database, view, Some(expected), properties)
        })
    }

    pub fn drop_view(&self, database: &str, view: &str) -> CatalogResult<()> {
        self.write_database(database, |entry| {
            entry
                .views
                .remove(view)
                .map(|_| ())
                .ok_or_else(|| view_not_found(database, view))
        })
    }

    pub fn view(&self, database: &str, view: &str) -> CatalogResult<Arc<ViewDescriptor>> {
        self.read_database(database, |entry| {
            entry
                .views
                .get(view)
                .cloned()
                .ok_or_else(|| view_not_found(database, view))
        })
    }

    /// 按给定的视图快照读取其源集合中的文档
    ///
    /// 只读取快照记录的源集合，不重新查找视图的当前定义；
    /// 快照之后已删除的集合跳过
    pub fn documents_for(&self, descriptor: &ViewDescriptor) -> CatalogResult<Vec<Value>> {
        self.read_database(&descriptor.database, |entry| {
            let mut documents = Vec::new();
            for collection in descriptor.sources() {
                if let Some(data) = entry.collections.get(collection) {
                    documents.extend(data.documents.values().cloned());
                }
            }
            Ok(documents)
        })
    }
}

impl SchemaLookup for SchemaCatalog {
    fn has_database(&self, database: &str) -> bool {
        self.databases.read().contains_key(database)
    }

    fn has_collection(&self, database: &str, collection: &str) -> bool {
        self.databases
            .read()
            .get(database)
            .map(|entry| entry.collections.contains_key(collection))
            .unwrap_or(false)
    }

    fn view_descriptor(&self, database: &str, view: &str) -> Option<Arc<ViewDescriptor>> {
        self.view(database, view).ok()
    }
}

fn collection_not_found(database: &str, collection: &str) -> CatalogError {
    CatalogError::CollectionNotFound {
        database: database.to_string(),
        collection: collection.to_string(),
    }
}

fn view_not_found(database: &str, view: &str) -> CatalogError {
    CatalogError::ViewNotFound {
        database: database.to_string(),
        view: view.to_string(),
    }
}
