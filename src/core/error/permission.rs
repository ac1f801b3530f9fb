//! 权限错误类型
//!
//! 涵盖权限解析与权限检查相关的错误

use thiserror::Error;

use crate::config::ViewDenialPresentation;
use crate::core::error::codes::{ErrorCode, PublicError, ToPublicError};

/// 权限操作结果类型别名
pub type AccessResult<T> = Result<T, AccessError>;

/// 目标对象种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetKind {
    Database,
    Collection,
    View,
}

impl std::fmt::Display for TargetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TargetKind::Database => write!(f, "数据库"),
            TargetKind::Collection => write!(f, "集合"),
            TargetKind::View => write!(f, "视图"),
        }
    }
}

/// 拒绝原因 - 由权限检查器给出的分类结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    InsufficientDatabaseRight,
    InsufficientCollectionRight,
    InsufficientViewRight,
}

/// 权限相关错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccessError {
    #[error("数据库权限不足")]
    InsufficientDatabaseRight,

    #[error("集合权限不足")]
    InsufficientCollectionRight,

    #[error("视图权限不足")]
    InsufficientViewRight,

    #[error("用户不存在: {0}")]
    UnknownUser(String),

    #[error("{kind}不存在: {name}")]
    UnknownTarget { kind: TargetKind, name: String },

    #[error("无效的权限级别: {0}")]
    InvalidRightLevel(String),

    #[error("无效的授权目标: {0}")]
    InvalidGrantTarget(String),
}

impl AccessError {
    pub fn unknown_target(kind: TargetKind, name: impl Into<String>) -> Self {
        AccessError::UnknownTarget {
            kind,
            name: name.into(),
        }
    }

    /// 是否为权限不足导致的拒绝（区别于目标不存在）
    pub fn is_denial(&self) -> bool {
        self.deny_reason().is_some()
    }

    pub fn deny_reason(&self) -> Option<DenyReason> {
        match self {
            AccessError::InsufficientDatabaseRight => Some(DenyReason::InsufficientDatabaseRight),
            AccessError::InsufficientCollectionRight => {
                Some(DenyReason::InsufficientCollectionRight)
            }
            AccessError::InsufficientViewRight => Some(DenyReason::InsufficientViewRight),
            _ => None,
        }
    }

    /// 按掩码策略转换为对外错误
    ///
    /// 视图权限不足统一按配置呈现为"禁止访问"或"未找到"，
    /// 不区分触发它的是数据查询还是属性读取
    pub fn present(&self, presentation: ViewDenialPresentation) -> PublicError {
        match (self, presentation) {
            (AccessError::InsufficientViewRight, ViewDenialPresentation::NotFound) => {
                PublicError::with_default_message(ErrorCode::ResourceNotFound)
            }
            _ => self.to_public_error(),
        }
    }
}

impl From<DenyReason> for AccessError {
    fn from(reason: DenyReason) -> Self {
        match reason {
            DenyReason::InsufficientDatabaseRight => AccessError::InsufficientDatabaseRight,
            DenyReason::InsufficientCollectionRight => AccessError::InsufficientCollectionRight,
            DenyReason::InsufficientViewRight => AccessError::InsufficientViewRight,
        }
    }
}

impl ToPublicError for AccessError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            AccessError::InsufficientDatabaseRight
            | AccessError::InsufficientCollectionRight
            | AccessError::InsufficientViewRight => ErrorCode::Forbidden,
            AccessError::UnknownUser(_) | AccessError::UnknownTarget { .. } => {
                ErrorCode::ResourceNotFound
            }
            AccessError::InvalidRightLevel(_) | AccessError::InvalidGrantTarget(_) => {
                ErrorCode::InvalidInput
            }
        }
    }

    fn to_public_message(&self) -> String {
        match self {
            // 不向未授权方暴露具体缺少哪一级权限
            AccessError::InsufficientDatabaseRight
            | AccessError::InsufficientCollectionRight
            | AccessError::InsufficientViewRight => ErrorCode::Forbidden.default_message().to_string(),
            _ => self.to_string(),
        }
    }
}
