//! 后台任务错误类型

use thiserror::Error;

use crate::core::error::codes::{ErrorCode, ToPublicError};

/// 任务操作结果类型别名
pub type TaskResult<T> = Result<T, TaskError>;

/// 后台任务相关错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    #[error("任务ID已存在: {0}")]
    DuplicateTaskId(String),

    #[error("任务不存在: {0}")]
    TaskNotFound(String),

    #[error("任务执行中断: {0}")]
    Aborted(String),
}

impl ToPublicError for TaskError {
    fn to_error_code(&self) -> ErrorCode {
        match self {
            TaskError::DuplicateTaskId(_) => ErrorCode::Conflict,
            TaskError::TaskNotFound(_) => ErrorCode::ResourceNotFound,
            TaskError::Aborted(_) => ErrorCode::ExecutionError,
        }
    }

    fn to_public_message(&self) -> String {
        self.to_string()
    }
}
