pub mod error;
pub mod permission;

// 错误和结果类型
pub use error::{
    AccessError, AccessResult, CatalogError, CatalogResult, DBError, DBResult, DenyReason,
    ErrorCode, PublicError, TargetKind, TaskError, TaskResult, ToPublicError,
};

// 权限模型
pub use permission::{Grant, GrantScope, GrantTarget, RightLevel, WILDCARD};
