//! 编排错误类型
//!
//! 配置错误在构造时同步返回；存储与协作者错误原样向上冒泡；完整性错误（未知任务、可疑任务描述）显式拒绝。

use thiserror::Error;

use crate::agents::AgentError;
use crate::persistence::StoreError;

/// Orchestrator / TodoManager 对外暴露的错误
#[derive(Error, Debug)]
pub enum OrchestratorError {
    /// 构造参数错误（部分注入存储、空目标、非正迭代预算等），不可重试
    #[error("Config error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Agent error: {0}")]
    Agent(#[from] AgentError),

    /// mark_done / cancel 指向不存在的任务
    #[error("Unknown task: {task_id}")]
    UnknownTask { task_id: String },

    /// 任务字段非法（空描述、优先级越界）
    #[error("Invalid task: {0}")]
    InvalidTask(String),

    /// 反思产出的任务描述命中注入黑名单
    #[error("Suspicious task description rejected (pattern {pattern}): {description}")]
    SuspiciousTask { pattern: String, description: String },

    /// Reflector 未给出可用的结论
    #[error("Reflection returned no verdict at iteration {iteration}")]
    MissingVerdict { iteration: usize },
}

impl OrchestratorError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
