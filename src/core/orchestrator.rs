//! 主控循环：Plan → Execute → Reflect 状态机
//!
//! 每个对外可见的动作（调用 Executor / Reflector、写 DONE）之前先写检查点，
//! 崩溃后 resume 从最后一个检查点继续；检查点之后、下一个检查点之前崩溃的任务会被重新执行。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::agents::Reflection;
use crate::config::OrchestratorSection;
use crate::core::builder::Agents;
use crate::core::{
    validate_task_description, FinalResult, OrchestratorError, Phase, RunStatus, Task, TodoManager,
};
use crate::persistence::{ContextStore, RunStore, StoreError, TaskStore};

/// 合成结果中单条任务结果的最大字符数
const RESULT_PREVIEW_CHARS: usize = 200;

/// 循环参数
#[derive(Debug, Clone)]
pub(crate) struct LoopSettings {
    pub max_iterations: usize,
    pub reflection_frequency: usize,
    pub planned_task_priority: i64,
    pub default_task_priority: i64,
    pub capabilities: Vec<String>,
}

impl From<&OrchestratorSection> for LoopSettings {
    fn from(section: &OrchestratorSection) -> Self {
        Self {
            max_iterations: section.max_iterations,
            reflection_frequency: section.reflection_frequency,
            planned_task_priority: section.planned_task_priority,
            default_task_priority: section.default_task_priority,
            capabilities: section.capabilities.clone(),
        }
    }
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self::from(&OrchestratorSection::default())
    }
}

/// 注入存储时的运行绑定（任务存储由 TodoManager 持有）
pub(crate) struct Persistence {
    pub runs: Arc<dyn RunStore>,
    pub context: Arc<dyn ContextStore>,
    pub run_id: String,
}

/// 编排器
pub struct Orchestrator {
    goal: String,
    agents: Agents,
    settings: LoopSettings,
    todo: TodoManager,
    persistence: Option<Persistence>,
    phase: Phase,
    iteration: usize,
    current_task_id: Option<String>,
    /// task_id → 成功执行的输出
    context: HashMap<String, String>,
    outcome: Option<RunStatus>,
}

impl Orchestrator {
    pub(crate) fn new(
        goal: String,
        agents: Agents,
        settings: LoopSettings,
        todo: TodoManager,
        persistence: Option<Persistence>,
    ) -> Self {
        Self {
            goal,
            agents,
            settings,
            todo,
            persistence,
            phase: Phase::Planning,
            iteration: 0,
            current_task_id: None,
            context: HashMap::new(),
            outcome: None,
        }
    }

    /// 从存储恢复运行：重建迭代计数、检查点与上下文，之后调用 run() 继续
    ///
    /// 迭代预算取自运行记录；其余循环参数用默认值，可再用 with_config 覆盖。
    pub fn resume(
        run_id: &str,
        agents: Agents,
        run_store: Arc<dyn RunStore>,
        task_store: Arc<dyn TaskStore>,
        context_store: Arc<dyn ContextStore>,
    ) -> Result<Self, OrchestratorError> {
        let state = run_store
            .get(run_id)?
            .ok_or_else(|| StoreError::RunNotFound(run_id.to_string()))?;
        let context = context_store.get_all(run_id)?;

        let outcome = match (state.phase, state.outcome) {
            (Phase::Done, None) if state.iteration >= state.max_iterations => {
                Some(RunStatus::Incomplete)
            }
            (Phase::Done, None) => Some(RunStatus::Completed),
            (_, outcome) => outcome,
        };

        info!(
            run_id,
            phase = %state.phase,
            iteration = state.iteration,
            current_task_id = ?state.current_task_id,
            "Resuming run"
        );

        let settings = LoopSettings {
            max_iterations: state.max_iterations,
            ..LoopSettings::default()
        };
        Ok(Self {
            goal: state.goal,
            agents,
            settings,
            todo: TodoManager::with_store(task_store, run_id),
            persistence: Some(Persistence {
                runs: run_store,
                context: context_store,
                run_id: run_id.to_string(),
            }),
            phase: state.phase,
            iteration: state.iteration,
            current_task_id: state.current_task_id,
            context,
            outcome,
        })
    }

    /// 覆盖反思频率、优先级与能力列表；迭代预算以运行记录为准，不受影响
    pub fn with_config(mut self, section: &OrchestratorSection) -> Result<Self, OrchestratorError> {
        let settings = LoopSettings {
            max_iterations: self.settings.max_iterations,
            ..LoopSettings::from(section)
        };
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn goal(&self) -> &str {
        &self.goal
    }

    pub fn run_id(&self) -> Option<&str> {
        self.persistence.as_ref().map(|p| p.run_id.as_str())
    }

    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn max_iterations(&self) -> usize {
        self.settings.max_iterations
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn context(&self) -> &HashMap<String, String> {
        &self.context
    }

    pub fn todo(&self) -> &TodoManager {
        &self.todo
    }

    /// 运行到 DONE；已处于 DONE 时直接返回合成结果，不调用任何协作者
    pub async fn run(&mut self) -> Result<FinalResult, OrchestratorError> {
        if self.phase.is_terminal() {
            let status = self.outcome.unwrap_or(RunStatus::Completed);
            debug!(run_id = ?self.run_id(), status = %status, "Run already finished");
            return self.final_result(status);
        }

        info!(run_id = ?self.run_id(), goal = %self.goal, phase = %self.phase, "Run started");
        let status = self.drive().await?;
        self.finish(status)?;
        info!(
            run_id = ?self.run_id(),
            status = %status,
            iteration = self.iteration,
            "Run finished"
        );
        self.final_result(status)
    }

    /// 从当前阶段进入循环，返回终态
    async fn drive(&mut self) -> Result<RunStatus, OrchestratorError> {
        match self.phase {
            Phase::Planning => {
                // 首个检查点前崩溃时，上次入队的任务作废，从头规划
                let stale = self.todo.cancel_pending()?;
                if stale > 0 {
                    warn!(count = stale, "Cancelled tasks left by an interrupted planning step");
                }
                self.plan().await?
            }
            Phase::Executing => {
                if let Some(task_id) = self.current_task_id.clone() {
                    let task = self
                        .todo
                        .find(&task_id)?
                        .ok_or(OrchestratorError::UnknownTask { task_id })?;
                    info!(task_id = %task.id, iteration = self.iteration, "Re-executing interrupted task");
                    self.execute(task).await?;
                    if let Some(status) = self.reflect_if_due().await? {
                        return Ok(status);
                    }
                }
            }
            Phase::Reflecting => {
                if let Some(status) = self.reflect().await? {
                    return Ok(status);
                }
            }
            Phase::Done => return Ok(self.outcome.unwrap_or(RunStatus::Completed)),
        }

        while self.iteration < self.settings.max_iterations {
            self.iteration += 1;
            match self.todo.get_next()? {
                Some(task) => {
                    self.execute(task).await?;
                    if let Some(status) = self.reflect_if_due().await? {
                        return Ok(status);
                    }
                }
                None => {
                    if let Some(status) = self.reflect().await? {
                        return Ok(status);
                    }
                }
            }
        }

        warn!(
            run_id = ?self.run_id(),
            max_iterations = self.settings.max_iterations,
            "Iteration budget exhausted"
        );
        Ok(RunStatus::Incomplete)
    }

    async fn plan(&mut self) -> Result<(), OrchestratorError> {
        info!(goal = %self.goal, "Planning");
        let plan = self.agents.planner.plan(&self.goal).await?;
        plan.validate()?;

        for question in &plan.questions {
            info!(question = %question, "Planner raised a question");
        }
        if plan.tasks.is_empty() {
            warn!("Planner returned no tasks");
        }
        let added = self
            .todo
            .add_tasks(&plan.tasks, self.settings.planned_task_priority)?;
        info!(count = added.len(), "Plan loaded");

        self.checkpoint(Phase::Executing, None)
    }

    async fn execute(&mut self, task: Task) -> Result<(), OrchestratorError> {
        self.checkpoint(Phase::Executing, Some(&task.id))?;
        debug!(task_id = %task.id, iteration = self.iteration, "Executing task");

        let result = self
            .agents
            .executor
            .execute(&task.description, &self.settings.capabilities)
            .await?;

        if result.success {
            self.save_result(&task.id, &result.output)?;
            self.todo.mark_done(&task.id, &result.output)?;
            info!(task_id = %task.id, iteration = self.iteration, "Task done");
        } else {
            warn!(
                task_id = %task.id,
                iteration = self.iteration,
                output = %result.output,
                "Task failed, left pending"
            );
        }
        Ok(())
    }

    async fn reflect_if_due(&mut self) -> Result<Option<RunStatus>, OrchestratorError> {
        let scheduled = self.iteration % self.settings.reflection_frequency == 0;
        if scheduled || self.todo.get_pending()?.is_empty() {
            self.reflect().await
        } else {
            Ok(None)
        }
    }

    /// 反思一次；宣布完成时返回 Some(Completed)
    async fn reflect(&mut self) -> Result<Option<RunStatus>, OrchestratorError> {
        self.checkpoint(Phase::Reflecting, None)?;

        let completed = self.todo.get_done()?;
        let pending = self.todo.get_pending()?;
        debug!(
            iteration = self.iteration,
            completed = completed.len(),
            pending = pending.len(),
            "Reflecting"
        );

        let reflection = self
            .agents
            .reflector
            .reflect(&self.goal, &completed, &pending)
            .await?
            .ok_or(OrchestratorError::MissingVerdict {
                iteration: self.iteration,
            })?;
        reflection.validate()?;

        if reflection.done {
            info!(iteration = self.iteration, "Reflector declared goal complete");
            return Ok(Some(RunStatus::Completed));
        }

        self.apply_reflection(&reflection)?;
        self.checkpoint(Phase::Executing, None)?;
        Ok(None)
    }

    fn apply_reflection(&mut self, reflection: &Reflection) -> Result<(), OrchestratorError> {
        for gap in &reflection.gaps {
            debug!(gap = %gap, "Reflection gap");
        }

        let mut accepted = Vec::with_capacity(reflection.new_tasks.len());
        for description in &reflection.new_tasks {
            match validate_task_description(description) {
                Ok(()) => accepted.push(description.as_str()),
                Err(e) => warn!(error = %e, "Rejected task from reflection"),
            }
        }
        if !accepted.is_empty() {
            self.todo
                .add_tasks(&accepted, self.settings.default_task_priority)?;
            info!(count = accepted.len(), "Tasks added from reflection");
        }

        for task_id in &reflection.complete_ids {
            match self.todo.cancel(task_id) {
                Ok(true) => info!(task_id = %task_id, "Task cancelled by reflection"),
                Ok(false) => {}
                Err(OrchestratorError::UnknownTask { .. }) => {
                    warn!(task_id = %task_id, "Reflection referenced unknown task")
                }
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    /// 先写存储再更新内存状态
    fn checkpoint(&mut self, phase: Phase, current_task_id: Option<&str>) -> Result<(), OrchestratorError> {
        if let Some(p) = &self.persistence {
            p.runs
                .update_loop_state(&p.run_id, phase, self.iteration, current_task_id)?;
        }
        self.phase = phase;
        self.current_task_id = current_task_id.map(str::to_string);
        Ok(())
    }

    fn finish(&mut self, status: RunStatus) -> Result<(), OrchestratorError> {
        if let Some(p) = &self.persistence {
            p.runs.finish(&p.run_id, self.iteration, status)?;
        }
        self.phase = Phase::Done;
        self.current_task_id = None;
        self.outcome = Some(status);
        Ok(())
    }

    fn save_result(&mut self, task_id: &str, output: &str) -> Result<(), OrchestratorError> {
        if let Some(p) = &self.persistence {
            p.context.save_result(&p.run_id, task_id, output)?;
        }
        self.context.insert(task_id.to_string(), output.to_string());
        Ok(())
    }

    fn final_result(&self, status: RunStatus) -> Result<FinalResult, OrchestratorError> {
        Ok(FinalResult {
            output: synthesize(&self.todo.get_done()?),
            status,
        })
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("run_id", &self.run_id())
            .field("phase", &self.phase)
            .field("iteration", &self.iteration)
            .field("max_iterations", &self.settings.max_iterations)
            .finish_non_exhaustive()
    }
}

/// 已完成任务的文本汇总
fn synthesize(completed: &[Task]) -> String {
    if completed.is_empty() {
        return "No tasks completed.".to_string();
    }
    let mut lines = vec![format!("Completed {} task(s):", completed.len())];
    for (i, task) in completed.iter().enumerate() {
        lines.push(format!("{}. {}", i + 1, task.description));
        if let Some(result) = task.result.as_deref().filter(|r| !r.is_empty()) {
            lines.push(format!("   Result: {}", preview(result)));
        }
    }
    lines.join("\n")
}

fn preview(result: &str) -> String {
    if result.chars().count() > RESULT_PREVIEW_CHARS {
        let head: String = result.chars().take(RESULT_PREVIEW_CHARS).collect();
        format!("{}...", head)
    } else {
        result.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{AgentError, ScriptedExecutor, ScriptedPlanner, ScriptedReflector};
    use crate::core::{OrchestratorBuilder, TaskStatus};
    use crate::persistence::Stores;

    struct Harness {
        planner: Arc<ScriptedPlanner>,
        executor: Arc<ScriptedExecutor>,
        reflector: Arc<ScriptedReflector>,
    }

    impl Harness {
        fn new(planner: ScriptedPlanner, executor: ScriptedExecutor, reflector: ScriptedReflector) -> Self {
            Self {
                planner: Arc::new(planner),
                executor: Arc::new(executor),
                reflector: Arc::new(reflector),
            }
        }

        fn agents(&self) -> Agents {
            Agents::new(self.planner.clone(), self.executor.clone(), self.reflector.clone())
        }
    }

    #[tokio::test]
    async fn test_done_on_second_iteration_is_completed() {
        let h = Harness::new(
            ScriptedPlanner::new(["a", "b", "c", "d"]),
            ScriptedExecutor::new(),
            ScriptedReflector::always_done(),
        );
        let stores = Stores::memory();
        let mut orch = OrchestratorBuilder::new("goal", h.agents())
            .with_stores(stores.clone())
            .with_run_id("r1")
            .with_max_iterations(10)
            .with_reflection_frequency(2)
            .build()
            .unwrap();

        let result = orch.run().await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(orch.iteration(), 2);
        assert_eq!(orch.phase(), Phase::Done);
        assert_eq!(h.executor.calls(), vec!["a", "b"]);

        let state = stores.runs.get("r1").unwrap().unwrap();
        assert_eq!(state.phase, Phase::Done);
        assert_eq!(state.iteration, 2);
        assert_eq!(state.outcome, Some(RunStatus::Completed));
        assert!(state.current_task_id.is_none());
    }

    #[tokio::test]
    async fn test_budget_exhausted_is_incomplete() {
        let h = Harness::new(
            ScriptedPlanner::new(["a", "b", "c", "d", "e"]),
            ScriptedExecutor::new(),
            ScriptedReflector::new(),
        );
        let mut orch = OrchestratorBuilder::new("goal", h.agents())
            .with_max_iterations(3)
            .build()
            .unwrap();

        let result = orch.run().await.unwrap();
        assert_eq!(result.status, RunStatus::Incomplete);
        assert_eq!(orch.iteration(), 3);
        assert_eq!(h.executor.call_count(), 3);
        // 第 3 次迭代触发一次定期反思
        assert_eq!(h.reflector.call_count(), 1);
        assert!(result.output.starts_with("Completed 3 task(s):"));
    }

    #[tokio::test]
    async fn test_failed_task_stays_pending() {
        let h = Harness::new(
            ScriptedPlanner::new(["good", "bad"]),
            ScriptedExecutor::new().fail_on("bad"),
            ScriptedReflector::new()
                .then(Reflection::default())
                .then(Reflection::done()),
        );
        let mut orch = OrchestratorBuilder::new("goal", h.agents())
            .with_max_iterations(10)
            .build()
            .unwrap();

        let result = orch.run().await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);

        let pending = orch.todo().get_pending().unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].description, "bad");
        assert_eq!(pending[0].status, TaskStatus::Pending);
        assert!(pending[0].result.is_none());
        // 仍在待办的任务没有上下文条目
        assert!(!orch.context().contains_key(&pending[0].id));

        // 反思只看到真正完成的任务
        let first = &h.reflector.calls()[0];
        assert_eq!(first.completed, vec!["good"]);
        assert_eq!(first.pending, vec!["bad"]);
        assert!(!result.output.contains("bad"));
    }

    #[tokio::test]
    async fn test_failed_task_writes_no_context() {
        let h = Harness::new(
            ScriptedPlanner::new(["bad"]),
            ScriptedExecutor::new().fail_on("bad"),
            ScriptedReflector::new(),
        );
        let stores = Stores::memory();
        let mut orch = OrchestratorBuilder::new("goal", h.agents())
            .with_stores(stores.clone())
            .with_run_id("r1")
            .with_max_iterations(2)
            .build()
            .unwrap();

        let result = orch.run().await.unwrap();
        assert_eq!(result.status, RunStatus::Incomplete);
        assert_eq!(h.executor.call_count(), 2);

        let task = stores.tasks.get_all("r1").unwrap().remove(0);
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(stores.context.get_all("r1").unwrap().is_empty());
        assert!(orch.context().is_empty());
    }

    #[tokio::test]
    async fn test_empty_plan_reflects_immediately() {
        let h = Harness::new(
            ScriptedPlanner::new(Vec::<String>::new()),
            ScriptedExecutor::new(),
            ScriptedReflector::always_done(),
        );
        let mut orch = OrchestratorBuilder::new("goal", h.agents()).build().unwrap();
        let result = orch.run().await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.output, "No tasks completed.");
        assert_eq!(orch.iteration(), 1);
        assert_eq!(h.executor.call_count(), 0);
    }

    #[tokio::test]
    async fn test_missing_verdict_is_fatal() {
        let h = Harness::new(
            ScriptedPlanner::new(["a"]),
            ScriptedExecutor::new(),
            ScriptedReflector::new().then_none(),
        );
        let stores = Stores::memory();
        let mut orch = OrchestratorBuilder::new("goal", h.agents())
            .with_stores(stores.clone())
            .with_run_id("r1")
            .build()
            .unwrap();

        let err = orch.run().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::MissingVerdict { iteration: 1 }));
        let state = stores.runs.get("r1").unwrap().unwrap();
        assert_eq!(state.phase, Phase::Reflecting);
        assert!(state.outcome.is_none());
    }

    #[tokio::test]
    async fn test_malformed_reflection_is_fatal() {
        let h = Harness::new(
            ScriptedPlanner::new(["a"]),
            ScriptedExecutor::new(),
            ScriptedReflector::new().then(Reflection::continue_with(vec!["   ".into()])),
        );
        let mut orch = OrchestratorBuilder::new("goal", h.agents()).build().unwrap();
        let err = orch.run().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Agent(AgentError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_planner_failure_propagates() {
        let h = Harness::new(
            ScriptedPlanner::failing("model offline"),
            ScriptedExecutor::new(),
            ScriptedReflector::always_done(),
        );
        let mut orch = OrchestratorBuilder::new("goal", h.agents()).build().unwrap();
        let err = orch.run().await.unwrap_err();
        assert!(matches!(err, OrchestratorError::Agent(AgentError::Unavailable(_))));
        assert_eq!(orch.phase(), Phase::Planning);
    }

    #[tokio::test]
    async fn test_reflection_adds_tasks_and_drops_suspicious() {
        let h = Harness::new(
            ScriptedPlanner::new(["a"]),
            ScriptedExecutor::new(),
            ScriptedReflector::new()
                .then(Reflection::continue_with(vec![
                    "write summary".into(),
                    "cleanup; rm -rf /".into(),
                ]))
                .then(Reflection::done()),
        );
        let mut orch = OrchestratorBuilder::new("goal", h.agents()).build().unwrap();
        let result = orch.run().await.unwrap();

        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(h.executor.calls(), vec!["a", "write summary"]);
        assert_eq!(orch.todo().get_all().unwrap().len(), 2);
        let added = orch
            .todo()
            .get_all()
            .unwrap()
            .into_iter()
            .find(|t| t.description == "write summary")
            .unwrap();
        assert_eq!(added.priority, crate::core::DEFAULT_PRIORITY);
    }

    #[tokio::test]
    async fn test_reflection_cancels_complete_ids() {
        let planner = ScriptedPlanner::new(["a", "b", "c"]);
        let h = Harness::new(planner, ScriptedExecutor::new(), ScriptedReflector::always_done());
        let mut orch = OrchestratorBuilder::new("goal", h.agents()).build().unwrap();
        orch.plan().await.unwrap();

        let pending = orch.todo().get_pending().unwrap();
        let reflection = Reflection {
            complete_ids: vec![pending[2].id.clone(), "unknown0".into()],
            ..Reflection::default()
        };
        orch.apply_reflection(&reflection).unwrap();

        let all = orch.todo().get_all().unwrap();
        let cancelled: Vec<&Task> = all.iter().filter(|t| t.status == TaskStatus::Cancelled).collect();
        assert_eq!(cancelled.len(), 1);
        assert_eq!(cancelled[0].description, "c");
        assert_eq!(orch.todo().get_pending().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_checkpoint_precedes_execution() {
        // 执行器崩溃时，存储里已经记录了正在执行的任务
        let h = Harness::new(
            ScriptedPlanner::new(["first", "second"]),
            ScriptedExecutor::new().crash_on_call(2),
            ScriptedReflector::new(),
        );
        let stores = Stores::memory();
        let mut orch = OrchestratorBuilder::new("goal", h.agents())
            .with_stores(stores.clone())
            .with_run_id("r1")
            .build()
            .unwrap();
        assert!(orch.run().await.is_err());

        let state = stores.runs.get("r1").unwrap().unwrap();
        assert_eq!(state.phase, Phase::Executing);
        assert_eq!(state.iteration, 2);
        let second = stores
            .tasks
            .get_all("r1")
            .unwrap()
            .into_iter()
            .find(|t| t.description == "second")
            .unwrap();
        assert_eq!(state.current_task_id.as_deref(), Some(second.id.as_str()));
        assert!(second.is_pending());
        assert!(!stores.context.get_all("r1").unwrap().contains_key(&second.id));
    }

    #[tokio::test]
    async fn test_run_after_done_returns_cached_result() {
        let h = Harness::new(
            ScriptedPlanner::new(["a"]),
            ScriptedExecutor::new(),
            ScriptedReflector::always_done(),
        );
        let mut orch = OrchestratorBuilder::new("goal", h.agents()).build().unwrap();
        let first = orch.run().await.unwrap();
        let second = orch.run().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(h.planner.call_count(), 1);
        assert_eq!(h.executor.call_count(), 1);
    }

    #[test]
    fn test_synthesize_format() {
        assert_eq!(synthesize(&[]), "No tasks completed.");

        let mut a = Task::new("short", 5);
        a.status = TaskStatus::Done;
        a.result = Some("ok".into());
        let mut b = Task::new("long", 5);
        b.status = TaskStatus::Done;
        b.result = Some("x".repeat(250));

        let out = synthesize(&[a, b]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Completed 2 task(s):");
        assert_eq!(lines[1], "1. short");
        assert_eq!(lines[2], "   Result: ok");
        assert_eq!(lines[3], "2. long");
        assert_eq!(lines[4], format!("   Result: {}...", "x".repeat(200)));
    }
}
