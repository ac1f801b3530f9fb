//! AccessGate - hierarchical rights resolution and enforcement
//!
//! Grants are attached at system, database and collection scope; the narrowest
//! defined grant wins. Views take the most restrictive right over the
//! collections they read from. Every schema or data operation passes through
//! a single enforcement gate before it touches the catalog.

pub mod api;
pub mod cache;
pub mod catalog;
pub mod config;
pub mod core;
pub mod task;
pub mod utils;

// 错误和结果类型
pub use crate::core::error::{AccessError, AccessResult, DBError, DBResult, DenyReason};

// 权限模型
pub use crate::core::permission::{Grant, GrantTarget, RightLevel};

// 服务入口
pub use api::service::{AccessControl, Action, DatabaseService, GrantRequest, Verdict};
pub use task::{TaskScheduler, TaskSpec, TaskStatus};
