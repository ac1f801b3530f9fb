//! 集成测试共享工具模块
//!
//! 授权组合以不可变的表格形式传入每个场景，不使用进程级全局状态

#![allow(dead_code)]

use std::sync::Arc;

use accessgate::catalog::ViewProperties;
use accessgate::config::Config;
use accessgate::{DatabaseService, RightLevel};
use serde_json::json;

pub const DATABASE: &str = "testdb";
pub const COLLECTION: &str = "c1";
pub const OTHER_COLLECTION: &str = "c2";
pub const VIEW: &str = "v1";
pub const ADMIN: &str = "admin";

pub const LEVELS: [RightLevel; 3] = [RightLevel::None, RightLevel::ReadOnly, RightLevel::ReadWrite];

/// 单个测试用户的授权输入，`None` 表示该作用域不设显式授权
#[derive(Debug, Clone)]
pub struct UserFixture {
    pub name: String,
    pub system: Option<RightLevel>,
    pub database: Option<RightLevel>,
    pub collection: Option<RightLevel>,
}

impl UserFixture {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            system: None,
            database: None,
            collection: None,
        }
    }

    pub fn system(mut self, level: RightLevel) -> Self {
        self.system = Some(level);
        self
    }

    pub fn database(mut self, level: RightLevel) -> Self {
        self.database = Some(level);
        self
    }

    pub fn collection(mut self, level: RightLevel) -> Self {
        self.collection = Some(level);
        self
    }

    pub fn db_level(&self) -> RightLevel {
        self.database.unwrap_or(RightLevel::None)
    }

    pub fn col_level(&self) -> RightLevel {
        self.collection.unwrap_or(self.db_level())
    }
}

/// dbLevel × colLevel 的全部组合
pub fn level_matrix() -> Vec<UserFixture> {
    let mut users = Vec::new();
    for db in LEVELS {
        for col in LEVELS {
            users.push(
                UserFixture::new(format!("user_{}_{}", db, col))
                    .database(db)
                    .collection(col),
            );
        }
    }
    users
}

/// 创建测试数据库、集合、视图和用户
///
/// 集合级授权只作用于 `COLLECTION`
pub fn setup(config: &Config, users: &[UserFixture]) -> Arc<DatabaseService> {
    let service = DatabaseService::new(config);
    service.create_database(DATABASE).expect("创建数据库应该成功");

    let access = service.access();
    access.create_user(ADMIN);
    access
        .grant_system(ADMIN, RightLevel::ReadWrite)
        .expect("授予管理员权限应该成功");

    for collection in [COLLECTION, OTHER_COLLECTION] {
        service
            .create_collection(ADMIN, DATABASE, collection)
            .expect("创建集合应该成功");
        service
            .insert_documents(
                ADMIN,
                DATABASE,
                collection,
                vec![json!({"value": 1}), json!({"value": 2})],
            )
            .expect("插入文档应该成功");
    }
    service
        .create_view(
            ADMIN,
            DATABASE,
            VIEW,
            ViewProperties::linked([COLLECTION, OTHER_COLLECTION]),
        )
        .expect("创建视图应该成功");

    for user in users {
        access.create_user(&user.name);
        if let Some(level) = user.system {
            access.grant_system(&user.name, level).expect("授权应该成功");
        }
        if let Some(level) = user.database {
            access
                .grant_database(&user.name, DATABASE, level)
                .expect("授权应该成功");
        }
        if let Some(level) = user.collection {
            access
                .grant_collection(&user.name, DATABASE, COLLECTION, level)
                .expect("授权应该成功");
        }
    }
    service
}
