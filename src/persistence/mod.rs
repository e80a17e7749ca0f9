//! 持久化层：Run / Task / Context 三个窄接口与两种后端
//!
//! 组件只依赖自己需要的那一个能力（Orchestrator 用 RunStore + ContextStore，TodoManager 只用 TaskStore）。
//! 所有操作都以 run_id 作用域隔离；方法要么成功，要么返回 StoreError，不存在静默 no-op。

pub mod memory;
pub mod path;
pub mod sqlite;

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::config::{StoreBackend, StoreSection};
use crate::core::{Phase, RunState, RunStatus, Task};

pub use memory::MemoryStore;
pub use path::{validate_db_path, MEMORY_DB};
pub use sqlite::SqliteStore;

/// 存储层错误
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// 数据库路径逃逸出允许目录（如 ../../etc/passwd）
    #[error("Database path '{path}' escapes allowed directory '{allowed}'")]
    PathEscape { path: String, allowed: String },

    #[error("Invalid database path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Run '{0}' already exists")]
    RunExists(String),

    #[error("Run '{0}' does not exist")]
    RunNotFound(String),

    #[error("Task '{task_id}' does not exist in run '{run_id}'")]
    TaskNotFound { run_id: String, task_id: String },

    /// 持久化的枚举 / 数值无法解析
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("Store lock poisoned")]
    Poisoned,

    #[error("Store is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 单次运行的生命周期与检查点
pub trait RunStore: Send + Sync {
    /// 新建运行（PLANNING, iteration = 0）；run_id 已存在时报 RunExists
    fn create(&self, run_id: &str, goal: &str, max_iterations: usize) -> Result<(), StoreError>;

    /// 不存在返回 Ok(None)，与错误区分
    fn get(&self, run_id: &str) -> Result<Option<RunState>, StoreError>;

    /// 全部 run_id，最新创建的在前
    fn list(&self) -> Result<Vec<String>, StoreError>;

    /// 覆盖 phase / iteration / current_task_id 三元组
    fn update_loop_state(
        &self,
        run_id: &str,
        phase: Phase,
        iteration: usize,
        current_task_id: Option<&str>,
    ) -> Result<(), StoreError>;

    /// 写入 DONE 检查点与终态（一次写入）
    fn finish(&self, run_id: &str, iteration: usize, outcome: RunStatus) -> Result<(), StoreError>;
}

/// 运行内任务队列的 CRUD
pub trait TaskStore: Send + Sync {
    /// 按任务 ID upsert；运行不存在时报 RunNotFound
    fn save(&self, run_id: &str, task: &Task) -> Result<(), StoreError>;

    /// 按优先级降序、插入顺序升序
    fn get_all(&self, run_id: &str) -> Result<Vec<Task>, StoreError>;

    /// 仅 Pending，排序同 get_all
    fn get_pending(&self, run_id: &str) -> Result<Vec<Task>, StoreError>;
}

/// task_id → 结果 的上下文映射
pub trait ContextStore: Send + Sync {
    /// 任务必须已存在于该运行中
    fn save_result(&self, run_id: &str, task_id: &str, result: &str) -> Result<(), StoreError>;

    fn get_all(&self, run_id: &str) -> Result<HashMap<String, String>, StoreError>;
}

/// 三个存储的组合（通常由同一个后端实现）
#[derive(Clone)]
pub struct Stores {
    pub runs: Arc<dyn RunStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub context: Arc<dyn ContextStore>,
}

impl Stores {
    /// 用同一个后端实例同时充当三个存储
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: RunStore + TaskStore + ContextStore + 'static,
    {
        Self {
            runs: backend.clone(),
            tasks: backend.clone(),
            context: backend,
        }
    }

    /// 进程内存后端
    pub fn memory() -> Self {
        Self::from_backend(Arc::new(MemoryStore::new()))
    }
}

impl std::fmt::Debug for Stores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stores").finish_non_exhaustive()
    }
}

/// 按配置创建存储
///
/// 与会话存储不同，这里打开失败直接返回错误，不会降级到内存后端。
pub fn create_stores(cfg: &StoreSection) -> Result<Stores, StoreError> {
    match cfg.backend {
        StoreBackend::Memory => {
            tracing::info!("Using in-memory store");
            Ok(Stores::memory())
        }
        StoreBackend::Sqlite => {
            let store = SqliteStore::open_with_timeout(
                &cfg.db_path,
                cfg.allowed_dir.as_deref(),
                std::time::Duration::from_millis(cfg.busy_timeout_ms),
            )?;
            tracing::info!(path = %store.db_path().display(), "Using sqlite store");
            Ok(Stores::from_backend(Arc::new(store)))
        }
    }
}
