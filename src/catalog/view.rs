//! 视图描述
//!
//! 视图到集合的关系被显式建模为边集：无论视图是链接型还是索引型，
//! 最终都归约为一个有序、去重的源集合列表

use serde::{Deserialize, Serialize};

/// 视图类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViewKind {
    /// 全文检索型，通过 links 关联集合
    Linked,
    /// 组合索引型，通过绑定到集合的命名索引关联
    Indexed,
}

impl std::fmt::Display for ViewKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ViewKind::Linked => write!(f, "LINKED"),
            ViewKind::Indexed => write!(f, "INDEXED"),
        }
    }
}

/// 绑定到单个集合的命名索引
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IndexRef {
    pub collection: String,
    pub index: String,
}

impl IndexRef {
    pub fn new(collection: impl Into<String>, index: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            index: index.into(),
        }
    }
}

/// 视图属性
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViewProperties {
    Linked { links: Vec<String> },
    Indexed { indexes: Vec<IndexRef> },
}

impl ViewProperties {
    pub fn linked<I, S>(links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ViewProperties::Linked {
            links: links.into_iter().map(Into::into).collect(),
        }
    }

    pub fn indexed(indexes: Vec<IndexRef>) -> Self {
        ViewProperties::Indexed { indexes }
    }

    pub fn kind(&self) -> ViewKind {
        match self {
            ViewProperties::Linked { .. } => ViewKind::Linked,
            ViewProperties::Indexed { .. } => ViewKind::Indexed,
        }
    }

    /// 归约为有序去重的源集合列表
    pub fn source_collections(&self) -> Vec<String> {
        let names: Vec<&String> = match self {
            ViewProperties::Linked { links } => links.iter().collect(),
            ViewProperties::Indexed { indexes } => indexes.iter().map(|i| &i.collection).collect(),
        };

        let mut sources: Vec<String> = Vec::with_capacity(names.len());
        for name in names {
            if !sources.contains(name) {
                sources.push(name.clone());
            }
        }
        sources
    }

    /// 去掉指向某个集合的边
    pub(crate) fn without_collection(&self, collection: &str) -> Self {
        match self {
            ViewProperties::Linked { links } => ViewProperties::Linked {
                links: links.iter().filter(|c| *c != collection).cloned().collect(),
            },
            ViewProperties::Indexed { indexes } => ViewProperties::Indexed {
                indexes: indexes
                    .iter()
                    .filter(|i| i.collection != collection)
                    .cloned()
                    .collect(),
            },
        }
    }
}

/// 视图描述快照，创建后不可变，更新时整体替换
///
/// 反序列化时源集合总是由属性重新计算，输入中的 `sources` 被忽略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ViewRecord")]
pub struct ViewDescriptor {
    pub name: String,
    pub database: String,
    pub properties: ViewProperties,
    sources: Vec<String>,
}

#[derive(Deserialize)]
struct ViewRecord {
    name: String,
    database: String,
    properties: ViewProperties,
}

impl From<ViewRecord> for ViewDescriptor {
    fn from(record: ViewRecord) -> Self {
        ViewDescriptor::new(record.database, record.name, record.properties)
    }
}

impl ViewDescriptor {
    pub fn new(database: impl Into<String>, name: impl Into<String>, properties: ViewProperties) -> Self {
        let sources = properties.source_collections();
        Self {
            name: name.into(),
            database: database.into(),
            properties,
            sources,
        }
    }

    pub fn kind(&self) -> ViewKind {
        self.properties.kind()
    }

    /// 视图的源集合（边集）
    pub fn sources(&self) -> &[String] {
        &self.sources
    }

    pub fn links_collection(&self, collection: &str) -> bool {
        self.sources.iter().any(|c| c == collection)
    }
}
