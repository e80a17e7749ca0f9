//! 运行状态：阶段、RunState 记录与最终结果
//!
//! phase / iteration / current_task_id 三元组在每次检查点被整体覆盖；RunState 由 RunStore 持久化。

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 编排循环阶段
///
/// PLANNING → EXECUTING → REFLECTING → (EXECUTING | DONE)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Planning,
    Executing,
    Reflecting,
    Done,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Planning => "planning",
            Phase::Executing => "executing",
            Phase::Reflecting => "reflecting",
            Phase::Done => "done",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Phase::Done)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "planning" => Ok(Phase::Planning),
            "executing" => Ok(Phase::Executing),
            "reflecting" => Ok(Phase::Reflecting),
            "done" => Ok(Phase::Done),
            other => Err(format!("unknown phase '{}'", other)),
        }
    }
}

/// 运行终态：Reflector 宣布完成，或预算耗尽
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Completed,
    Incomplete,
}

impl RunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RunStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(RunStatus::Completed),
            "incomplete" => Ok(RunStatus::Incomplete),
            other => Err(format!("unknown run status '{}'", other)),
        }
    }
}

/// 一次编排运行的持久化记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunState {
    pub run_id: String,
    pub goal: String,
    pub max_iterations: usize,
    pub phase: Phase,
    /// 已完成（或正在进行）的 execute / reflect 步数
    pub iteration: usize,
    /// 仅在任务执行中时有值
    pub current_task_id: Option<String>,
    pub created_at: DateTime<Utc>,
    /// 进入 DONE 时写入
    pub outcome: Option<RunStatus>,
}

impl RunState {
    /// 新建运行：PLANNING，iteration = 0
    pub fn new(run_id: impl Into<String>, goal: impl Into<String>, max_iterations: usize) -> Self {
        Self {
            run_id: run_id.into(),
            goal: goal.into(),
            max_iterations,
            phase: Phase::Planning,
            iteration: 0,
            current_task_id: None,
            created_at: Utc::now(),
            outcome: None,
        }
    }
}

/// run() 的最终产出
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FinalResult {
    pub output: String,
    pub status: RunStatus,
}

/// 生成新的 run_id（调用方未指定时使用）
pub fn new_run_id() -> String {
    format!("run_{}", uuid::Uuid::new_v4().simple())
}
