//! 任务实体：不可变 ID，可变状态 / 结果 / 优先级

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 默认优先级（1-10 的中段）
pub const DEFAULT_PRIORITY: i64 = 5;
pub const MIN_PRIORITY: i64 = 1;
pub const MAX_PRIORITY: i64 = 10;

/// 任务 ID 长度
const TASK_ID_LEN: usize = 8;

/// 生成 8 位任务 ID，来源是 v4 UUID（操作系统 CSPRNG），不依赖时间戳等可预测输入
pub fn generate_task_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(TASK_ID_LEN);
    id
}

/// 任务状态：只会被标记为取消，不会被删除
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Done,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Done => "done",
            TaskStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "done" => Ok(TaskStatus::Done),
            "cancelled" => Ok(TaskStatus::Cancelled),
            other => Err(format!("unknown task status '{}'", other)),
        }
    }
}

/// 队列中的单个任务
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// 运行内唯一
    pub id: String,
    /// 交给 Executor 的指令
    pub description: String,
    pub status: TaskStatus,
    /// 越大越先执行
    pub priority: i64,
    /// 状态变为 Done 时写入
    pub result: Option<String>,
}

impl Task {
    pub fn new(description: impl Into<String>, priority: i64) -> Self {
        Self {
            id: generate_task_id(),
            description: description.into(),
            status: TaskStatus::Pending,
            priority,
            result: None,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    pub fn is_done(&self) -> bool {
        self.status == TaskStatus::Done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_task_id_shape() {
        let id = generate_task_id();
        assert_eq!(id.len(), 8);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_task_ids_are_not_sequential() {
        let ids: HashSet<String> = (0..100).map(|_| generate_task_id()).collect();
        assert_eq!(ids.len(), 100);
    }

    #[test]
    fn test_status_round_trips_through_str() {
        for status in [TaskStatus::Pending, TaskStatus::Done, TaskStatus::Cancelled] {
            assert_eq!(status.as_str().parse::<TaskStatus>().unwrap(), status);
        }
        assert!("finished".parse::<TaskStatus>().is_err());
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("write docs", DEFAULT_PRIORITY);
        assert!(task.is_pending());
        assert!(task.result.is_none());
        assert_eq!(task.priority, 5);
    }
}
