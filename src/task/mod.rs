//! 后台任务调度
//!
//! 注册任务需要数据库级读写权限；任务以注册者身份执行，
//! 任务内部的每个操作仍然单独经过权限检查

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use log::{info, warn};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::watch;
use uuid::Uuid;

use crate::api::service::{Action, DatabaseService};
use crate::core::error::{DBResult, ErrorCode, TaskError, TaskResult, ToPublicError};

/// 任务处理函数
pub type TaskHandler = Arc<dyn Fn(&TaskContext) -> DBResult<()> + Send + Sync>;

/// 任务执行上下文
pub struct TaskContext {
    pub task_id: String,
    pub user: String,
    pub database: String,
    service: Arc<DatabaseService>,
}

impl TaskContext {
    pub fn service(&self) -> &DatabaseService {
        &self.service
    }
}

/// 任务定义
#[derive(Clone)]
pub struct TaskSpec {
    /// 未指定时自动生成
    pub id: Option<String>,
    pub name: String,
    pub handler: TaskHandler,
}

impl TaskSpec {
    pub fn new<F>(name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&TaskContext) -> DBResult<()> + Send + Sync + 'static,
    {
        Self {
            id: None,
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// 清空集合的任务
    pub fn truncate_collection(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        let name = format!("truncate {}", collection);
        Self::new(name, move |ctx| {
            ctx.service()
                .truncate_collection(&ctx.user, &ctx.database, &collection)
                .map(|_| ())
        })
    }
}

impl std::fmt::Debug for TaskSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskSpec")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Succeeded,
    Failed { code: ErrorCode, message: String },
}

impl TaskStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed { .. })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskRecord {
    pub id: String,
    pub name: String,
    pub user: String,
    pub database: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

struct TaskEntry {
    record: RwLock<TaskRecord>,
    status_tx: watch::Sender<TaskStatus>,
}

impl TaskEntry {
    fn set_status(&self, status: TaskStatus) {
        {
            let mut record = self.record.write();
            if status.is_finished() {
                record.finished_at = Some(Utc::now());
            }
            record.status = status.clone();
        }
        self.status_tx.send_replace(status);
    }
}

/// 任务调度器
pub struct TaskScheduler {
    service: Arc<DatabaseService>,
    tasks: DashMap<String, Arc<TaskEntry>>,
}

impl TaskScheduler {
    pub fn new(service: Arc<DatabaseService>) -> Self {
        Self {
            service,
            tasks: DashMap::new(),
        }
    }

    /// 以 `acting_as` 身份在 `database` 上注册并启动任务，返回任务ID
    pub async fn register(&self, acting_as: &str, database: &str, spec: TaskSpec) -> DBResult<String> {
        self.service
            .access()
            .check(acting_as, database, Action::RegisterTask)?;

        let id = spec.id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
        let record = TaskRecord {
            id: id.clone(),
            name: spec.name.clone(),
            user: acting_as.to_string(),
            database: database.to_string(),
            status: TaskStatus::Queued,
            created_at: Utc::now(),
            finished_at: None,
        };
        let (status_tx, _) = watch::channel(TaskStatus::Queued);
        let entry = Arc::new(TaskEntry {
            record: RwLock::new(record),
            status_tx,
        });

        match self.tasks.entry(id.clone()) {
            Entry::Occupied(_) => return Err(TaskError::DuplicateTaskId(id).into()),
            Entry::Vacant(vacant) => {
                vacant.insert(Arc::clone(&entry));
            }
        }
        info!("注册任务: id={} name={} user={} db={}", id, spec.name, acting_as, database);

        let ctx = TaskContext {
            task_id: id.clone(),
            user: acting_as.to_string(),
            database: database.to_string(),
            service: Arc::clone(&self.service),
        };
        tokio::spawn(Self::run(entry, spec.handler, ctx));
        Ok(id)
    }

    async fn run(entry: Arc<TaskEntry>, handler: TaskHandler, ctx: TaskContext) {
        let running = Arc::clone(&entry);
        let task_id = ctx.task_id.clone();
        let result = tokio::task::spawn_blocking(move || {
            running.set_status(TaskStatus::Running);
            handler(&ctx)
        })
        .await;

        let status = match result {
            Ok(Ok(())) => {
                info!("任务完成: {}", task_id);
                TaskStatus::Succeeded
            }
            Ok(Err(e)) => {
                warn!("任务失败: {}: {}", task_id, e);
                TaskStatus::Failed {
                    code: e.to_error_code(),
                    message: e.to_public_message(),
                }
            }
            Err(e) => {
                let e = TaskError::Aborted(e.to_string());
                warn!("任务失败: {}: {}", task_id, e);
                TaskStatus::Failed {
                    code: e.to_error_code(),
                    message: e.to_public_message(),
                }
            }
        };
        entry.set_status(status);
    }

    pub fn status(&self, id: &str) -> TaskResult<TaskRecord> {
        self.entry(id).map(|entry| entry.record.read().clone())
    }

    /// 等待任务结束并返回最终记录
    pub async fn wait(&self, id: &str) -> TaskResult<TaskRecord> {
        let entry = self.entry(id)?;
        let mut rx = entry.status_tx.subscribe();
        rx.wait_for(TaskStatus::is_finished)
            .await
            .map_err(|e| TaskError::Aborted(e.to_string()))?;
        let record = entry.record.read().clone();
        Ok(record)
    }

    pub fn list(&self) -> Vec<TaskRecord> {
        let mut records: Vec<TaskRecord> = self
            .tasks
            .iter()
            .map(|entry| entry.record.read().clone())
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        records
    }

    fn entry(&self, id: &str) -> TaskResult<Arc<TaskEntry>> {
        self.tasks
            .get(id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TaskError::TaskNotFound(id.to_string()))
    }
}
