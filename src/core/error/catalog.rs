//! 模式目录错误类型
//!
//! 涵盖数据库、集合和视图的增删改查错误

use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};

/// 目录操作结果类型别名
pub type CatalogResult<T> = Result<T, CatalogError>;

/// 模式目录相关错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    #[error("数据库不存在: {0}")]
    DatabaseNotFound(String),

    #[error("数据库已存在: {0}")]
    DatabaseAlreadyExists(String),

    #[error("集合不存在: {database}/{collection}")]
    CollectionNotFound { database: String, collection: String },

    #[error("集合已存在: {database}/{collection}")]
    CollectionAlreadyExists { database: String, collection: String },

    #[error("视图不存在: {database}/{view}")]
    ViewNotFound { database: String, view: String },

    #[error("视图已存在: {database}/{view}")]
    ViewAlreadyExists { database: String, view: String },

    #[error("视图类型不匹配: {0}")]
    ViewKindMismatch(String),

    #[error("视图已被并发修改: {database}/{view}")]
    ViewChanged { database: String, view: String },
}

impl ToPublicError for CatalogError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            CatalogError::DatabaseNotFound(_)
            | CatalogError::CollectionNotFound { .. }
            | CatalogError::ViewNotFound { .. } => ErrorCode::ResourceNotFound,
            CatalogError::DatabaseAlreadyExists(_)
            | CatalogError::CollectionAlreadyExists { .. }
            | CatalogError::ViewAlreadyExists { .. } => ErrorCode::ResourceAlreadyExists,
            CatalogError::ViewKindMismatch(_) => ErrorCode::InvalidInput,
            CatalogError::ViewChanged { .. } => ErrorCode::Conflict,
        }
    }

    fn to_public_message(&self) -> String {
        self.to_string()
    }
}
