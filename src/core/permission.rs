//! 权限类型定义
//!
//! 提供核心的权限级别、授权范围和授权记录定义

use serde::{Deserialize, Serialize};

use crate::core::error::AccessError;

/// 通配符目标：对所有数据库（或某数据库下所有集合）生效的默认授权
pub const WILDCARD: &str = "*";

/// 权限级别 - 全序：None < ReadOnly < ReadWrite
///
/// "未定义"（没有显式授权）不是一个级别，用 `Option<RightLevel>` 的 `None` 表示
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RightLevel {
    #[serde(rename = "none")]
    None,
    #[serde(rename = "ro")]
    ReadOnly,
    #[serde(rename = "rw")]
    ReadWrite,
}

impl RightLevel {
    /// 是否允许读取
    pub fn can_read(&self) -> bool {
        *self >= RightLevel::ReadOnly
    }

    /// 是否允许写入
    pub fn can_write(&self) -> bool {
        *self == RightLevel::ReadWrite
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RightLevel::None => "none",
            RightLevel::ReadOnly => "ro",
            RightLevel::ReadWrite => "rw",
        }
    }

    /// 解析管理请求中的级别字符串
    ///
    /// `"undefined"` 表示撤销显式授权，返回 `Ok(None)`
    pub fn parse_optional(s: &str) -> Result<Option<Self>, AccessError> {
        match s.trim().to_lowercase().as_str() {
            "undefined" => Ok(None),
            other => other.parse().map(Some),
        }
    }
}

impl std::fmt::Display for RightLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for RightLevel {
    type Err = AccessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(RightLevel::None),
            "ro" | "read_only" => Ok(RightLevel::ReadOnly),
            "rw" | "read_write" => Ok(RightLevel::ReadWrite),
            _ => Err(AccessError::InvalidRightLevel(s.to_string())),
        }
    }
}

/// 授权范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GrantScope {
    System,
    Database,
    Collection,
}

impl std::fmt::Display for GrantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantScope::System => write!(f, "SYSTEM"),
            GrantScope::Database => write!(f, "DATABASE"),
            GrantScope::Collection => write!(f, "COLLECTION"),
        }
    }
}

/// 授权目标，同时决定了授权范围
///
/// 同一用户下，目标即为授权记录的唯一键
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GrantTarget {
    System,
    Database(String),
    Collection { database: String, collection: String },
}

impl GrantTarget {
    pub fn database(database: impl Into<String>) -> Self {
        GrantTarget::Database(database.into())
    }

    pub fn collection(database: impl Into<String>, collection: impl Into<String>) -> Self {
        GrantTarget::Collection {
            database: database.into(),
            collection: collection.into(),
        }
    }

    pub fn scope(&self) -> GrantScope {
        match self {
            GrantTarget::System => GrantScope::System,
            GrantTarget::Database(_) => GrantScope::Database,
            GrantTarget::Collection { .. } => GrantScope::Collection,
        }
    }

    /// 是否为通配符默认授权
    pub fn is_wildcard(&self) -> bool {
        match self {
            GrantTarget::System => false,
            GrantTarget::Database(db) => db == WILDCARD,
            GrantTarget::Collection { collection, .. } => collection == WILDCARD,
        }
    }
}

impl std::fmt::Display for GrantTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GrantTarget::System => write!(f, "system"),
            GrantTarget::Database(db) => write!(f, "database {}", db),
            GrantTarget::Collection { database, collection } => {
                write!(f, "collection {}/{}", database, collection)
            }
        }
    }
}

/// 一条显式授权记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grant {
    pub user: String,
    pub target: GrantTarget,
    pub level: RightLevel,
}

impl Grant {
    pub fn new(user: impl Into<String>, target: GrantTarget, level: RightLevel) -> Self {
        Self {
            user: user.into(),
            target,
            level,
        }
    }

    pub fn scope(&self) -> GrantScope {
        self.target.scope()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_right_level_ordering() {
        assert!(RightLevel::None < RightLevel::ReadOnly);
        assert!(RightLevel::ReadOnly < RightLevel::ReadWrite);
        assert_eq!(
            [RightLevel::ReadWrite, RightLevel::None, RightLevel::ReadOnly]
                .into_iter()
                .min(),
            Some(RightLevel::None)
        );
    }

    #[test]
    fn test_right_level_capabilities() {
        assert!(!RightLevel::None.can_read());
        assert!(RightLevel::ReadOnly.can_read());
        assert!(!RightLevel::ReadOnly.can_write());
        assert!(RightLevel::ReadWrite.can_write());
    }

    #[test]
    fn test_parse_levels() {
        assert_eq!("rw".parse::<RightLevel>().ok(), Some(RightLevel::ReadWrite));
        assert_eq!("RO".parse::<RightLevel>().ok(), Some(RightLevel::ReadOnly));
        assert_eq!(" none ".parse::<RightLevel>().ok(), Some(RightLevel::None));
        assert!(matches!(
            "admin".parse::<RightLevel>(),
            Err(AccessError::InvalidRightLevel(_))
        ));

        // undefined 表示撤销
        assert_eq!(RightLevel::parse_optional("undefined").ok(), Some(None));
        assert_eq!(
            RightLevel::parse_optional("ro").ok(),
            Some(Some(RightLevel::ReadOnly))
        );
    }

    #[test]
    fn test_target_scope_and_wildcard() {
        assert_eq!(GrantTarget::System.scope(), GrantScope::System);
        assert_eq!(GrantTarget::database("db").scope(), GrantScope::Database);
        assert_eq!(
            GrantTarget::collection("db", "c1").scope(),
            GrantScope::Collection
        );

        assert!(GrantTarget::database(WILDCARD).is_wildcard());
        assert!(GrantTarget::collection("db", WILDCARD).is_wildcard());
        assert!(!GrantTarget::collection("db", "c1").is_wildcard());
    }

    #[test]
    fn test_level_serde_names() {
        let json = serde_json::to_string(&RightLevel::ReadOnly).unwrap();
        assert_eq!(json, "\"ro\"");
        let level: RightLevel = serde_json::from_str("\"rw\"").unwrap();
        assert_eq!(level, RightLevel::ReadWrite);
    }
}
