//! 外部协作者：Planner / Executor / Reflector 的契约
//!
//! 编排器只依赖这里的 trait 与输出结构；具体实现（LLM、脚本、人工）不在本 crate 范围内。
//! mock 模块提供脚本化实现，供测试与离线演练使用。

pub mod mock;
pub mod parse;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::Task;

pub use mock::{ScriptedExecutor, ScriptedPlanner, ScriptedReflector};
pub use parse::parse_structured;

/// 输出结构的长度上限
pub const MAX_PLAN_TASKS: usize = 50;
pub const MAX_PLAN_QUESTIONS: usize = 20;
pub const MAX_REFLECTION_GAPS: usize = 20;
pub const MAX_REFLECTION_NEW_TASKS: usize = 20;
pub const MAX_REFLECTION_COMPLETE_IDS: usize = 50;

/// 协作者调用失败
#[derive(Error, Debug)]
pub enum AgentError {
    /// 后端不可用（网络、API、进程崩溃）
    #[error("Agent unavailable: {0}")]
    Unavailable(String),

    /// 输出不满足结构约束
    #[error("Malformed agent output: {0}")]
    Malformed(String),

    #[error("JSON parse error: {0}")]
    Json(String),
}

/// Planner 输出：任务描述与需要人工澄清的问题
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub tasks: Vec<String>,
    #[serde(default)]
    pub questions: Vec<String>,
}

impl TaskPlan {
    pub fn new(tasks: Vec<String>) -> Self {
        Self {
            tasks,
            questions: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        check_len("tasks", self.tasks.len(), MAX_PLAN_TASKS)?;
        check_len("questions", self.questions.len(), MAX_PLAN_QUESTIONS)?;
        check_non_blank("tasks", &self.tasks)
    }
}

/// Executor 输出；success = false 是正常数据，不是错误
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub output: String,
}

impl ExecutionResult {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Reflector 结论
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reflection {
    pub done: bool,
    pub gaps: Vec<String>,
    pub new_tasks: Vec<String>,
    /// 已无意义、需要取消的待办任务 ID
    #[serde(default)]
    pub complete_ids: Vec<String>,
}

impl Reflection {
    pub fn done() -> Self {
        Self {
            done: true,
            ..Self::default()
        }
    }

    pub fn continue_with(new_tasks: Vec<String>) -> Self {
        Self {
            new_tasks,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), AgentError> {
        check_len("gaps", self.gaps.len(), MAX_REFLECTION_GAPS)?;
        check_len("new_tasks", self.new_tasks.len(), MAX_REFLECTION_NEW_TASKS)?;
        check_len("complete_ids", self.complete_ids.len(), MAX_REFLECTION_COMPLETE_IDS)?;
        check_non_blank("new_tasks", &self.new_tasks)
    }
}

fn check_len(field: &str, len: usize, max: usize) -> Result<(), AgentError> {
    if len > max {
        return Err(AgentError::Malformed(format!(
            "{} has {} entries (max {})",
            field, len, max
        )));
    }
    Ok(())
}

fn check_non_blank(field: &str, items: &[String]) -> Result<(), AgentError> {
    if let Some(idx) = items.iter().position(|s| s.trim().is_empty()) {
        return Err(AgentError::Malformed(format!("{}[{}] is blank", field, idx)));
    }
    Ok(())
}

/// 目标分解
#[async_trait]
pub trait TaskPlanner: Send + Sync {
    async fn plan(&self, goal: &str) -> Result<TaskPlan, AgentError>;
}

/// 单任务执行；capabilities 为可用能力（工具）名
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(
        &self,
        description: &str,
        capabilities: &[String],
    ) -> Result<ExecutionResult, AgentError>;
}

/// 进度反思；Ok(None) 表示没有给出结论，编排器视为致命错误
#[async_trait]
pub trait Reflector: Send + Sync {
    async fn reflect(
        &self,
        goal: &str,
        completed: &[Task],
        pending: &[Task],
    ) -> Result<Option<Reflection>, AgentError>;
}
