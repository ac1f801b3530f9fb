//! 对外错误码定义
//!
//! 引擎内部只产生分类后的拒绝原因，错误码与 HTTP 状态码的映射属于边界层，
//! 本模块为边界层提供统一的错误码体系。
//!
//! 错误码按百位分段: 0xx 成功, 1xx 输入, 2xx 执行, 4xx 权限, 5xx 资源, 9xx 系统

use serde::{Deserialize, Serialize};

/// 对外错误码 - 用于客户端响应
///
/// 错误码一旦定义不应随意修改，保证客户端兼容性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    Success = 0,

    // ==================== 输入错误 (01xx) ====================
    /// 无效输入（如非法的权限级别字符串）
    InvalidInput = 100,

    // ==================== 执行错误 (02xx) ====================
    /// 后台任务执行失败
    ExecutionError = 200,
    /// 并发冲突（如重复的任务ID）
    Conflict = 201,

    // ==================== 权限错误 (04xx) ====================
    /// 禁止访问
    Forbidden = 400,

    // ==================== 资源错误 (05xx) ====================
    /// 资源未找到
    ResourceNotFound = 500,
    /// 资源已存在
    ResourceAlreadyExists = 501,

    // ==================== 系统错误 (09xx) ====================
    /// 内部服务器错误
    InternalError = 900,
}

impl ErrorCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// 获取默认的错误消息
    pub fn default_message(&self) -> &'static str {
        match self {
            ErrorCode::Success => "成功",
            ErrorCode::InvalidInput => "无效输入",
            ErrorCode::ExecutionError => "执行错误",
            ErrorCode::Conflict => "并发冲突",
            ErrorCode::Forbidden => "禁止访问",
            ErrorCode::ResourceNotFound => "资源未找到",
            ErrorCode::ResourceAlreadyExists => "资源已存在",
            ErrorCode::InternalError => "内部服务器错误",
        }
    }

    /// 边界层使用的 HTTP 状态码
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorCode::Success => 200,
            ErrorCode::InvalidInput => 400,
            ErrorCode::Forbidden => 403,
            ErrorCode::ResourceNotFound => 404,
            ErrorCode::ResourceAlreadyExists | ErrorCode::Conflict => 409,
            ErrorCode::ExecutionError | ErrorCode::InternalError => 500,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// 判断是否为客户端错误 (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}

impl Default for ErrorCode {
    fn default() -> Self {
        ErrorCode::Success
    }
}

impl std::fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_i32(), self.default_message())
    }
}

/// 对外错误信息 - 用于序列化到响应中
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicError {
    pub code: ErrorCode,
    pub message: String,
}

impl PublicError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// 使用默认消息创建错误
    pub fn with_default_message(code: ErrorCode) -> Self {
        Self {
            code,
            message: code.default_message().to_string(),
        }
    }

    pub fn http_status(&self) -> u16 {
        self.code.http_status()
    }
}

/// 内部错误到对外错误的转换 trait
pub trait ToPublicError {
    /// 转换为对外错误
    fn to_public_error(&self) -> PublicError {
        PublicError::new(self.to_error_code(), self.to_public_message())
    }

    /// 获取对外错误码
    fn to_error_code(&self) -> ErrorCode;

    /// 获取对外错误消息（过滤敏感信息）
    fn to_public_message(&self) -> String;
}
