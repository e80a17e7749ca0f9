//! TodoManager：按优先级排序的任务队列
//!
//! 两种模式：
//! - Standalone：进程内任务表 + 已完成集合，不持久化
//! - Delegating：包装 TaskStore + run_id，每个操作直接映射到存储调用
//!
//! 两种模式下 get_next 都返回优先级最高的待办任务，同优先级按插入顺序。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, error};

use crate::core::task::{MAX_PRIORITY, MIN_PRIORITY};
use crate::core::{OrchestratorError, Task, TaskStatus};
use crate::persistence::TaskStore;

enum Backend {
    Standalone {
        /// 插入顺序
        tasks: Vec<Task>,
        index: HashMap<String, usize>,
        completed: HashSet<String>,
    },
    Delegating {
        store: Arc<dyn TaskStore>,
        run_id: String,
    },
}

/// 任务队列
pub struct TodoManager {
    backend: Backend,
}

impl TodoManager {
    /// store 与 run_id 必须同时提供或同时省略
    pub fn new(
        store: Option<Arc<dyn TaskStore>>,
        run_id: Option<String>,
    ) -> Result<Self, OrchestratorError> {
        match (store, run_id) {
            (Some(store), Some(run_id)) => Ok(Self::with_store(store, run_id)),
            (None, None) => Ok(Self::standalone()),
            (Some(_), None) => Err(OrchestratorError::config(
                "run_id is required when a task store is provided",
            )),
            (None, Some(_)) => Err(OrchestratorError::config(
                "a task store is required when run_id is provided",
            )),
        }
    }

    pub fn standalone() -> Self {
        Self {
            backend: Backend::Standalone {
                tasks: Vec::new(),
                index: HashMap::new(),
                completed: HashSet::new(),
            },
        }
    }

    pub fn with_store(store: Arc<dyn TaskStore>, run_id: impl Into<String>) -> Self {
        Self {
            backend: Backend::Delegating {
                store,
                run_id: run_id.into(),
            },
        }
    }

    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, Backend::Delegating { .. })
    }

    /// 批量入队，返回新建的任务
    pub fn add_tasks<S: AsRef<str>>(
        &mut self,
        descriptions: &[S],
        priority: i64,
    ) -> Result<Vec<Task>, OrchestratorError> {
        if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&priority) {
            return Err(OrchestratorError::InvalidTask(format!(
                "priority {} outside {}..={}",
                priority, MIN_PRIORITY, MAX_PRIORITY
            )));
        }
        if let Some(idx) = descriptions.iter().position(|d| d.as_ref().trim().is_empty()) {
            return Err(OrchestratorError::InvalidTask(format!(
                "description #{} is empty",
                idx
            )));
        }

        let mut known: HashSet<String> = self.get_all()?.into_iter().map(|t| t.id).collect();
        let mut created = Vec::with_capacity(descriptions.len());
        for description in descriptions {
            let mut task = Task::new(description.as_ref(), priority);
            while known.contains(&task.id) {
                task = Task::new(description.as_ref(), priority);
            }
            known.insert(task.id.clone());

            match &mut self.backend {
                Backend::Standalone { tasks, index, .. } => {
                    index.insert(task.id.clone(), tasks.len());
                    tasks.push(task.clone());
                }
                Backend::Delegating { store, run_id } => store.save(run_id, &task)?,
            }
            created.push(task);
        }
        debug!(count = created.len(), priority, "Tasks added");
        Ok(created)
    }

    /// 优先级最高的待办任务；队列为空返回 None
    pub fn get_next(&self) -> Result<Option<Task>, OrchestratorError> {
        Ok(self.get_pending()?.into_iter().next())
    }

    /// 标记完成；未知 ID 报错
    pub fn mark_done(&mut self, task_id: &str, result: &str) -> Result<(), OrchestratorError> {
        match &mut self.backend {
            Backend::Standalone {
                tasks,
                index,
                completed,
            } => {
                let Some(&pos) = index.get(task_id) else {
                    error!(task_id, total_tasks = tasks.len(), "Cannot mark nonexistent task as done");
                    return Err(OrchestratorError::UnknownTask {
                        task_id: task_id.to_string(),
                    });
                };
                let task = &mut tasks[pos];
                task.status = TaskStatus::Done;
                task.result = Some(result.to_string());
                if !completed.insert(task_id.to_string()) {
                    debug!(task_id, "Task marked done again");
                }
                Ok(())
            }
            Backend::Delegating { store, run_id } => {
                let mut task = find_in_store(&**store, run_id, task_id)?;
                task.status = TaskStatus::Done;
                task.result = Some(result.to_string());
                store.save(run_id, &task)?;
                Ok(())
            }
        }
    }

    /// 取消待办任务（已完成的任务保持不变）；返回是否发生了状态变化
    pub fn cancel(&mut self, task_id: &str) -> Result<bool, OrchestratorError> {
        let mut task = match &self.backend {
            Backend::Standalone { tasks, index, .. } => index
                .get(task_id)
                .map(|&pos| tasks[pos].clone())
                .ok_or_else(|| OrchestratorError::UnknownTask {
                    task_id: task_id.to_string(),
                })?,
            Backend::Delegating { store, run_id } => find_in_store(&**store, run_id, task_id)?,
        };
        if task.status != TaskStatus::Pending {
            debug!(task_id, status = %task.status, "Skip cancelling non-pending task");
            return Ok(false);
        }
        task.status = TaskStatus::Cancelled;
        match &mut self.backend {
            Backend::Standalone { tasks, index, .. } => {
                if let Some(&pos) = index.get(task_id) {
                    tasks[pos] = task;
                }
            }
            Backend::Delegating { store, run_id } => store.save(run_id, &task)?,
        }
        Ok(true)
    }

    /// 取消全部待办任务，返回取消的数量
    pub fn cancel_pending(&mut self) -> Result<usize, OrchestratorError> {
        let pending = self.get_pending()?;
        for task in &pending {
            self.cancel(&task.id)?;
        }
        Ok(pending.len())
    }

    /// 按 ID 查找
    pub fn find(&self, task_id: &str) -> Result<Option<Task>, OrchestratorError> {
        Ok(self.get_all()?.into_iter().find(|t| t.id == task_id))
    }

    pub fn get_pending(&self) -> Result<Vec<Task>, OrchestratorError> {
        match &self.backend {
            Backend::Standalone { tasks, .. } => Ok(sorted(tasks, |t| t.is_pending())),
            Backend::Delegating { store, run_id } => Ok(store.get_pending(run_id)?),
        }
    }

    pub fn get_done(&self) -> Result<Vec<Task>, OrchestratorError> {
        match &self.backend {
            Backend::Standalone {
                tasks, completed, ..
            } => Ok(sorted(tasks, |t| t.is_done() && completed.contains(&t.id))),
            Backend::Delegating { store, run_id } => Ok(store
                .get_all(run_id)?
                .into_iter()
                .filter(Task::is_done)
                .collect()),
        }
    }

    /// 全部任务（含已取消），排序同 get_pending
    pub fn get_all(&self) -> Result<Vec<Task>, OrchestratorError> {
        match &self.backend {
            Backend::Standalone { tasks, .. } => Ok(sorted(tasks, |_| true)),
            Backend::Delegating { store, run_id } => Ok(store.get_all(run_id)?),
        }
    }
}

impl std::fmt::Debug for TodoManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.backend {
            Backend::Standalone { tasks, .. } => f
                .debug_struct("TodoManager")
                .field("mode", &"standalone")
                .field("tasks", &tasks.len())
                .finish(),
            Backend::Delegating { run_id, .. } => f
                .debug_struct("TodoManager")
                .field("mode", &"delegating")
                .field("run_id", run_id)
                .finish(),
        }
    }
}

fn find_in_store(store: &dyn TaskStore, run_id: &str, task_id: &str) -> Result<Task, OrchestratorError> {
    store
        .get_all(run_id)?
        .into_iter()
        .find(|t| t.id == task_id)
        .ok_or_else(|| {
            error!(task_id, run_id, "Cannot mark nonexistent task");
            OrchestratorError::UnknownTask {
                task_id: task_id.to_string(),
            }
        })
}

/// 优先级降序，稳定排序保留插入顺序
fn sorted(tasks: &[Task], filter: impl Fn(&Task) -> bool) -> Vec<Task> {
    let mut out: Vec<Task> = tasks.iter().filter(|t| filter(t)).cloned().collect();
    out.sort_by(|a, b| b.priority.cmp(&a.priority));
    out
}
