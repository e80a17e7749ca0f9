//! Nanoagent - 可恢复的任务编排循环
//!
//! 模块划分：
//! - **agents**: 外部协作者契约（Planner / Executor / Reflector）与脚本化 Mock
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 任务模型、TodoManager 队列、Orchestrator 状态机（检查点 + 恢复）
//! - **observability**: tracing 日志初始化
//! - **persistence**: Run / Task / Context 三个存储接口，内存与 SQLite 两种后端

pub mod agents;
pub mod config;
pub mod core;
pub mod observability;
pub mod persistence;

pub use crate::core::{
    Agents, FinalResult, Orchestrator, OrchestratorBuilder, OrchestratorError, Phase, RunState,
    RunStatus, Task, TaskStatus, TodoManager,
};
pub use persistence::{ContextStore, MemoryStore, RunStore, SqliteStore, StoreError, Stores, TaskStore};
