//! 统一错误处理系统
//!
//! ## 设计理念
//!
//! 1. **按关注点拆分**：权限、目录、任务各自一个枚举，互不依赖
//! 2. **分层转换**：子错误通过 `#[from]` 自动转换为 `DBError`
//! 3. **统一接口**：引擎核心返回 `AccessResult<T>`，服务层返回 `DBResult<T>`

use thiserror::Error;

pub mod catalog;
pub mod codes;
pub mod permission;
pub mod task;

pub use catalog::{CatalogError, CatalogResult};
pub use codes::{ErrorCode, PublicError, ToPublicError};
pub use permission::{AccessError, AccessResult, DenyReason, TargetKind};
pub use task::{TaskError, TaskResult};

use crate::config::ViewDenialPresentation;

/// 统一的服务层错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DBError {
    #[error("权限错误: {0}")]
    Access(#[from] AccessError),

    #[error("目录错误: {0}")]
    Catalog(#[from] CatalogError),

    #[error("任务错误: {0}")]
    Task(#[from] TaskError),
}

/// 统一的结果类型
pub type DBResult<T> = Result<T, DBError>;

impl DBError {
    /// 若为权限错误，返回其引用
    pub fn as_access(&self) -> Option<&AccessError> {
        match self {
            DBError::Access(e) => Some(e),
            _ => None,
        }
    }

    /// 按掩码策略转换为对外错误
    pub fn present(&self, presentation: ViewDenialPresentation) -> PublicError {
        match self {
            DBError::Access(e) => e.present(presentation),
            other => other.to_public_error(),
        }
    }
}

impl ToPublicError for DBError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            DBError::Access(e) => e.to_error_code(),
            DBError::Catalog(e) => e.to_error_code(),
            DBError::Task(e) => e.to_error_code(),
        }
    }

    fn to_public_message(&self) -> String {
        match self {
            DBError::Access(e) => e.to_public_message(),
            DBError::Catalog(e) => e.to_public_message(),
            DBError::Task(e) => e.to_public_message(),
        }
    }
}
