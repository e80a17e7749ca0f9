//! 脚本化协作者（用于测试，无需 LLM）
//!
//! - ScriptedPlanner：返回固定任务列表
//! - ScriptedExecutor：回显任务描述，可指定失败描述与「崩溃」调用序号
//! - ScriptedReflector：按队列依次返回预设结论，耗尽后返回兜底结论

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use super::{AgentError, ExecutionResult, Reflection, Reflector, TaskExecutor, TaskPlan, TaskPlanner};
use crate::core::Task;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 固定计划
#[derive(Debug)]
pub struct ScriptedPlanner {
    plan: TaskPlan,
    fail_with: Option<String>,
    calls: AtomicUsize,
}

impl ScriptedPlanner {
    pub fn new<S: Into<String>>(tasks: impl IntoIterator<Item = S>) -> Self {
        Self {
            plan: TaskPlan::new(tasks.into_iter().map(Into::into).collect()),
            fail_with: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_questions<S: Into<String>>(mut self, questions: impl IntoIterator<Item = S>) -> Self {
        self.plan.questions = questions.into_iter().map(Into::into).collect();
        self
    }

    /// 每次调用都返回 Unavailable
    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            plan: TaskPlan::default(),
            fail_with: Some(msg.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskPlanner for ScriptedPlanner {
    async fn plan(&self, _goal: &str) -> Result<TaskPlan, AgentError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.fail_with {
            Some(msg) => Err(AgentError::Unavailable(msg.clone())),
            None => Ok(self.plan.clone()),
        }
    }
}

/// 回显执行器
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    failing: HashSet<String>,
    crash_on_call: Option<usize>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// 该描述的执行结果为 success = false
    pub fn fail_on(mut self, description: impl Into<String>) -> Self {
        self.failing.insert(description.into());
        self
    }

    /// 第 n 次调用（从 1 开始）返回 Unavailable，模拟进程在执行中崩溃
    pub fn crash_on_call(mut self, n: usize) -> Self {
        self.crash_on_call = Some(n);
        self
    }

    /// 已执行的任务描述（含崩溃那一次）
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn output_for(description: &str) -> String {
        format!("done: {}", description)
    }
}

#[async_trait]
impl TaskExecutor for ScriptedExecutor {
    async fn execute(
        &self,
        description: &str,
        _capabilities: &[String],
    ) -> Result<ExecutionResult, AgentError> {
        let n = {
            let mut calls = lock(&self.calls);
            calls.push(description.to_string());
            calls.len()
        };
        if self.crash_on_call == Some(n) {
            return Err(AgentError::Unavailable(format!(
                "executor crashed while running '{}'",
                description
            )));
        }
        if self.failing.contains(description) {
            return Ok(ExecutionResult::failed(format!("failed: {}", description)));
        }
        Ok(ExecutionResult::ok(Self::output_for(description)))
    }
}

/// 反思调用时看到的队列快照（任务描述）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReflectCall {
    pub completed: Vec<String>,
    pub pending: Vec<String>,
}

/// 预设结论队列
#[derive(Debug, Default)]
pub struct ScriptedReflector {
    verdicts: Mutex<VecDeque<Option<Reflection>>>,
    fallback: Reflection,
    crash_on_call: Option<usize>,
    calls: Mutex<Vec<ReflectCall>>,
}

impl ScriptedReflector {
    /// 默认兜底：未完成，无新任务
    pub fn new() -> Self {
        Self::default()
    }

    /// 总是宣布完成
    pub fn always_done() -> Self {
        Self::new().with_fallback(Reflection::done())
    }

    pub fn then(self, verdict: Reflection) -> Self {
        lock(&self.verdicts).push_back(Some(verdict));
        self
    }

    /// 下一次返回 Ok(None)
    pub fn then_none(self) -> Self {
        lock(&self.verdicts).push_back(None);
        self
    }

    pub fn with_fallback(mut self, verdict: Reflection) -> Self {
        self.fallback = verdict;
        self
    }

    pub fn crash_on_call(mut self, n: usize) -> Self {
        self.crash_on_call = Some(n);
        self
    }

    pub fn calls(&self) -> Vec<ReflectCall> {
        lock(&self.calls).clone()
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }
}

#[async_trait]
impl Reflector for ScriptedReflector {
    async fn reflect(
        &self,
        _goal: &str,
        completed: &[Task],
        pending: &[Task],
    ) -> Result<Option<Reflection>, AgentError> {
        let n = {
            let mut calls = lock(&self.calls);
            calls.push(ReflectCall {
                completed: completed.iter().map(|t| t.description.clone()).collect(),
                pending: pending.iter().map(|t| t.description.clone()).collect(),
            });
            calls.len()
        };
        if self.crash_on_call == Some(n) {
            return Err(AgentError::Unavailable("reflector crashed".to_string()));
        }
        let next = lock(&self.verdicts).pop_front();
        Ok(next.unwrap_or_else(|| Some(self.fallback.clone())))
    }
}
