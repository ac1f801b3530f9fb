//! 视图权限集成测试
//!
//! 测试范围:
//! - 最严格者胜出的权限聚合
//! - 数据查询与属性读取的一致判定
//! - 视图拒绝的对外呈现（403 / 404）
//! - 修改视图属性后的权限变化
//! - 并发修改视图时查询只读取判定时的源集合

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use accessgate::catalog::{IndexRef, ViewProperties};
use accessgate::config::{Config, ViewDenialPresentation};
use accessgate::core::error::ErrorCode;
use accessgate::{AccessError, DBError, RightLevel};
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_view_takes_most_restrictive_source() {
    let users = [UserFixture::new("u1")
        .database(RightLevel::ReadWrite)
        .collection(RightLevel::None)];
    let service = setup(&Config::default(), &users);

    assert_eq!(
        service
            .access()
            .resolve_collection("u1", DATABASE, OTHER_COLLECTION)
            .expect("解析应该成功"),
        RightLevel::ReadWrite
    );
    assert_eq!(
        service
            .access()
            .resolve_view("u1", DATABASE, VIEW)
            .expect("解析应该成功"),
        RightLevel::None,
        "任一源集合为 None 时视图不可访问"
    );

    let query = service.query_view("u1", DATABASE, VIEW);
    let props = service.view_properties("u1", DATABASE, VIEW);
    assert_eq!(query, Err(DBError::Access(AccessError::InsufficientViewRight)));
    assert_eq!(props, Err(DBError::Access(AccessError::InsufficientViewRight)));
}

#[tokio::test]
async fn test_view_readable_when_all_sources_readable() {
    let users = [UserFixture::new("u1")
        .database(RightLevel::ReadOnly)
        .collection(RightLevel::ReadWrite)];
    let service = setup(&Config::default(), &users);

    assert_eq!(
        service
            .access()
            .resolve_view("u1", DATABASE, VIEW)
            .expect("解析应该成功"),
        RightLevel::ReadOnly
    );
    let documents = service
        .query_view("u1", DATABASE, VIEW)
        .expect("查询视图应该成功");
    assert_eq!(documents.len(), 4);
    assert_eq!(
        service
            .view_properties("u1", DATABASE, VIEW)
            .expect("读取属性应该成功"),
        ViewProperties::linked([COLLECTION, OTHER_COLLECTION])
    );
}

#[tokio::test]
async fn test_view_denial_matrix_is_uniform() {
    for presentation in [ViewDenialPresentation::Forbidden, ViewDenialPresentation::NotFound] {
        let mut config = Config::default();
        config.auth.view_denial_presentation = presentation;
        let users = level_matrix();
        let service = setup(&config, &users);

        for user in &users {
            let query = service.query_view(&user.name, DATABASE, VIEW);
            let props = service.view_properties(&user.name, DATABASE, VIEW);
            assert_eq!(
                query.is_ok(),
                props.is_ok(),
                "{} 查询与属性读取的结果应该一致",
                user.name
            );

            if let (Err(query), Err(props)) = (query, props) {
                let query = service.present(&query);
                let props = service.present(&props);
                assert_eq!(query, props, "{} 两种拒绝的呈现应该一致", user.name);

                let expected = match presentation {
                    ViewDenialPresentation::Forbidden => ErrorCode::Forbidden,
                    ViewDenialPresentation::NotFound => ErrorCode::ResourceNotFound,
                };
                if user.db_level().can_read() {
                    assert_eq!(query.code, expected, "{}", user.name);
                }
            }
        }
    }
}

#[tokio::test]
async fn test_missing_view_is_not_found_regardless_of_rights() {
    let service = setup(&Config::default(), &[UserFixture::new("nobody")]);

    for user in [ADMIN, "nobody"] {
        let err = service
            .view_properties(user, DATABASE, "missing")
            .expect_err("视图不存在应该失败");
        assert_eq!(service.present(&err).http_status(), 404);
    }
}

#[tokio::test]
async fn test_update_properties_changes_effective_right() {
    let users = [UserFixture::new("u1")
        .database(RightLevel::ReadWrite)
        .collection(RightLevel::None)];
    let service = setup(&Config::default(), &users);

    service
        .update_view_properties(
            ADMIN,
            DATABASE,
            VIEW,
            ViewProperties::linked([OTHER_COLLECTION]),
        )
        .expect("修改属性应该成功");
    assert!(service.query_view("u1", DATABASE, VIEW).is_ok());

    // u1 不能把自己无权读取的集合加入视图
    let err = service
        .update_view_properties(
            "u1",
            DATABASE,
            VIEW,
            ViewProperties::linked([COLLECTION, OTHER_COLLECTION]),
        )
        .expect_err("链接无权集合应该失败");
    assert_eq!(err, DBError::Access(AccessError::InsufficientCollectionRight));
    assert_eq!(
        service
            .view_properties(ADMIN, DATABASE, VIEW)
            .expect("读取属性应该成功"),
        ViewProperties::linked([OTHER_COLLECTION])
    );
}

#[tokio::test]
async fn test_dropping_source_collection_updates_view() {
    let users = [UserFixture::new("u1")
        .database(RightLevel::ReadWrite)
        .collection(RightLevel::None)];
    let service = setup(&Config::default(), &users);
    assert!(service.query_view("u1", DATABASE, VIEW).is_err());

    service
        .drop_collection(ADMIN, DATABASE, COLLECTION)
        .expect("删除集合应该成功");
    let documents = service
        .query_view("u1", DATABASE, VIEW)
        .expect("源集合删除后视图应该可读");
    assert_eq!(documents.len(), 2);
}

#[tokio::test]
async fn test_indexed_view_projection() {
    let users = [UserFixture::new("u1")
        .database(RightLevel::None)
        .collection(RightLevel::ReadOnly)];
    let service = setup(&Config::default(), &users);
    service
        .create_view(
            ADMIN,
            DATABASE,
            "iv",
            ViewProperties::indexed(vec![IndexRef::new(COLLECTION, "inverted")]),
        )
        .expect("创建视图应该成功");

    assert_eq!(
        service
            .access()
            .resolve_view("u1", DATABASE, "iv")
            .expect("解析应该成功"),
        RightLevel::ReadOnly
    );
    // 数据库级没有读权限，视图仍不可访问
    assert_eq!(
        service.query_view("u1", DATABASE, "iv"),
        Err(DBError::Access(AccessError::InsufficientDatabaseRight))
    );
}

#[test]
fn test_query_reads_only_checked_sources_while_view_changes() {
    let users = [UserFixture::new("u1").database(RightLevel::ReadOnly)];
    let service = setup(&Config::default(), &users);
    service
        .access()
        .grant_collection("u1", DATABASE, OTHER_COLLECTION, RightLevel::None)
        .expect("授权应该成功");
    service
        .insert_document(ADMIN, DATABASE, OTHER_COLLECTION, None, json!({"secret": true}))
        .expect("插入文档应该成功");

    let stop = Arc::new(AtomicBool::new(false));
    let flipper = {
        let service = Arc::clone(&service);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let narrow = ViewProperties::linked([COLLECTION]);
            let wide = ViewProperties::linked([COLLECTION, OTHER_COLLECTION]);
            while !stop.load(Ordering::SeqCst) {
                for properties in [&narrow, &wide] {
                    service
                        .update_view_properties(ADMIN, DATABASE, VIEW, properties.clone())
                        .expect("修改属性应该成功");
                }
            }
        })
    };

    for _ in 0..20_000 {
        match service.query_view("u1", DATABASE, VIEW) {
            Ok(documents) => {
                assert_eq!(documents.len(), 2, "只应返回 {} 的文档", COLLECTION);
                assert!(
                    documents.iter().all(|doc| doc.get("secret").is_none()),
                    "不应读到无权集合的文档"
                );
            }
            Err(err) => assert_eq!(err, DBError::Access(AccessError::InsufficientViewRight)),
        }
        match service.view_properties("u1", DATABASE, VIEW) {
            Ok(properties) => assert_eq!(properties, ViewProperties::linked([COLLECTION])),
            Err(err) => assert_eq!(err, DBError::Access(AccessError::InsufficientViewRight)),
        }
    }

    stop.store(true, Ordering::SeqCst);
    flipper.join().expect("修改线程不应 panic");
}
