//! 内存存储：三个接口的进程内实现
//!
//! 快速、易失，用于非持久化模式与测试。假设每个 run 同一时刻只有一个写者，RwLock 只保护映射结构本身。

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::core::{Phase, RunState, RunStatus, Task, TaskStatus};

use super::{ContextStore, RunStore, StoreError, TaskStore};

/// 单个运行的任务：保留插入顺序
#[derive(Debug, Default)]
struct RunTasks {
    order: Vec<String>,
    by_id: HashMap<String, Task>,
}

impl RunTasks {
    fn sorted(&self, filter: impl Fn(&Task) -> bool) -> Vec<Task> {
        let mut tasks: Vec<Task> = self
            .order
            .iter()
            .filter_map(|id| self.by_id.get(id))
            .filter(|t| filter(t))
            .cloned()
            .collect();
        // 稳定排序：同优先级保持插入顺序
        tasks.sort_by(|a, b| b.priority.cmp(&a.priority));
        tasks
    }
}

#[derive(Debug, Default)]
struct Inner {
    runs: HashMap<String, RunState>,
    /// 创建顺序
    run_order: Vec<String>,
    tasks: HashMap<String, RunTasks>,
    context: HashMap<String, HashMap<String, String>>,
}

/// 基于 HashMap 的内存存储
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner.read().map_err(|_| StoreError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner.write().map_err(|_| StoreError::Poisoned)
    }

    fn with_run_mut<T>(
        &self,
        run_id: &str,
        f: impl FnOnce(&mut RunState) -> T,
    ) -> Result<T, StoreError> {
        let mut inner = self.write()?;
        let run = inner
            .runs
            .get_mut(run_id)
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;
        Ok(f(run))
    }
}

impl RunStore for MemoryStore {
    fn create(&self, run_id: &str, goal: &str, max_iterations: usize) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if inner.runs.contains_key(run_id) {
            return Err(StoreError::RunExists(run_id.to_string()));
        }
        inner
            .runs
            .insert(run_id.to_string(), RunState::new(run_id, goal, max_iterations));
        inner.run_order.push(run_id.to_string());
        inner.tasks.insert(run_id.to_string(), RunTasks::default());
        inner.context.insert(run_id.to_string(), HashMap::new());
        Ok(())
    }

    fn get(&self, run_id: &str) -> Result<Option<RunState>, StoreError> {
        Ok(self.read()?.runs.get(run_id).cloned())
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.read()?.run_order.iter().rev().cloned().collect())
    }

    fn update_loop_state(
        &self,
        run_id: &str,
        phase: Phase,
        iteration: usize,
        current_task_id: Option<&str>,
    ) -> Result<(), StoreError> {
        self.with_run_mut(run_id, |run| {
            run.phase = phase;
            run.iteration = iteration;
            run.current_task_id = current_task_id.map(str::to_string);
        })
    }

    fn finish(&self, run_id: &str, iteration: usize, outcome: RunStatus) -> Result<(), StoreError> {
        self.with_run_mut(run_id, |run| {
            run.phase = Phase::Done;
            run.iteration = iteration;
            run.current_task_id = None;
            run.outcome = Some(outcome);
        })
    }
}

impl TaskStore for MemoryStore {
    fn save(&self, run_id: &str, task: &Task) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let tasks = inner
            .tasks
            .get_mut(run_id)
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;
        if tasks.by_id.insert(task.id.clone(), task.clone()).is_none() {
            tasks.order.push(task.id.clone());
        }
        Ok(())
    }

    fn get_all(&self, run_id: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .read()?
            .tasks
            .get(run_id)
            .map(|t| t.sorted(|_| true))
            .unwrap_or_default())
    }

    fn get_pending(&self, run_id: &str) -> Result<Vec<Task>, StoreError> {
        Ok(self
            .read()?
            .tasks
            .get(run_id)
            .map(|t| t.sorted(|task| task.status == TaskStatus::Pending))
            .unwrap_or_default())
    }
}

impl ContextStore for MemoryStore {
    fn save_result(&self, run_id: &str, task_id: &str, result: &str) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        let task_known = inner
            .tasks
            .get(run_id)
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?
            .by_id
            .contains_key(task_id);
        if !task_known {
            return Err(StoreError::TaskNotFound {
                run_id: run_id.to_string(),
                task_id: task_id.to_string(),
            });
        }
        inner
            .context
            .entry(run_id.to_string())
            .or_default()
            .insert(task_id.to_string(), result.to_string());
        Ok(())
    }

    fn get_all(&self, run_id: &str) -> Result<HashMap<String, String>, StoreError> {
        Ok(self.read()?.context.get(run_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(desc: &str, priority: i64) -> Task {
        Task::new(desc, priority)
    }

    #[test]
    fn test_create_and_get_run() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        let run = store.get("r1").unwrap().unwrap();
        assert_eq!(run.goal, "goal");
        assert_eq!(run.max_iterations, 5);
        assert_eq!(run.phase, Phase::Planning);
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_duplicate_create_fails() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        assert!(matches!(store.create("r1", "goal", 5), Err(StoreError::RunExists(_))));
    }

    #[test]
    fn test_list_newest_first() {
        let store = MemoryStore::new();
        store.create("a", "g", 1).unwrap();
        store.create("b", "g", 1).unwrap();
        store.create("c", "g", 1).unwrap();
        assert_eq!(store.list().unwrap(), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_update_loop_state_unknown_run_is_error() {
        let store = MemoryStore::new();
        let err = store
            .update_loop_state("ghost", Phase::Executing, 1, None)
            .unwrap_err();
        assert!(matches!(err, StoreError::RunNotFound(_)));
        assert!(store.finish("ghost", 1, RunStatus::Completed).is_err());
    }

    #[test]
    fn test_update_loop_state_and_finish() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        store
            .update_loop_state("r1", Phase::Executing, 2, Some("t1"))
            .unwrap();
        let run = store.get("r1").unwrap().unwrap();
        assert_eq!(run.phase, Phase::Executing);
        assert_eq!(run.iteration, 2);
        assert_eq!(run.current_task_id.as_deref(), Some("t1"));

        store.finish("r1", 3, RunStatus::Incomplete).unwrap();
        let run = store.get("r1").unwrap().unwrap();
        assert_eq!(run.phase, Phase::Done);
        assert_eq!(run.iteration, 3);
        assert!(run.current_task_id.is_none());
        assert_eq!(run.outcome, Some(RunStatus::Incomplete));
    }

    #[test]
    fn test_tasks_ordered_by_priority_then_insertion() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        let a = task("a", 5);
        let b = task("b", 9);
        let c = task("c", 5);
        for t in [&a, &b, &c] {
            store.save("r1", t).unwrap();
        }
        let ids: Vec<String> = TaskStore::get_all(&store, "r1")
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![b.id.clone(), a.id.clone(), c.id.clone()]);
    }

    #[test]
    fn test_upsert_keeps_insertion_position() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        let mut a = task("a", 5);
        let b = task("b", 5);
        store.save("r1", &a).unwrap();
        store.save("r1", &b).unwrap();
        a.status = TaskStatus::Done;
        a.result = Some("ok".into());
        store.save("r1", &a).unwrap();

        let all = TaskStore::get_all(&store, "r1").unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, a.id);
        assert_eq!(all[0].result.as_deref(), Some("ok"));
        let pending = store.get_pending("r1").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, b.id);
    }

    #[test]
    fn test_save_task_unknown_run_is_error() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.save("ghost", &task("a", 5)),
            Err(StoreError::RunNotFound(_))
        ));
    }

    #[test]
    fn test_context_requires_existing_task() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        let err = store.save_result("r1", "nope", "x").unwrap_err();
        assert!(matches!(err, StoreError::TaskNotFound { .. }));
    }

    #[test]
    fn test_context_round_trip_independent_of_order() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        let tasks: Vec<Task> = (0..4).map(|i| task(&format!("t{i}"), 5)).collect();
        for t in &tasks {
            store.save("r1", t).unwrap();
        }
        let mut expected = HashMap::new();
        for t in tasks.iter().rev() {
            store.save_result("r1", &t.id, &format!("result of {}", t.description)).unwrap();
            expected.insert(t.id.clone(), format!("result of {}", t.description));
        }
        assert_eq!(ContextStore::get_all(&store, "r1").unwrap(), expected);
    }

    #[test]
    fn test_runs_are_isolated() {
        let store = MemoryStore::new();
        store.create("r1", "goal", 5).unwrap();
        store.create("r2", "goal", 5).unwrap();
        let t = task("only in r1", 5);
        store.save("r1", &t).unwrap();
        store.save_result("r1", &t.id, "x").unwrap();

        assert!(TaskStore::get_all(&store, "r2").unwrap().is_empty());
        assert!(ContextStore::get_all(&store, "r2").unwrap().is_empty());
        assert!(store.save_result("r2", &t.id, "x").is_err());
    }
}
