//! Orchestrator 构建器：统一参数校验与运行记录创建
//!
//! 三个存储要么全部注入、要么全部省略；注入存储时必须给出 run_id，未注入时不允许给 run_id。

use std::sync::Arc;

use tracing::info;

use crate::agents::{Reflector, TaskExecutor, TaskPlanner};
use crate::config::OrchestratorSection;
use crate::core::orchestrator::{LoopSettings, Orchestrator, Persistence};
use crate::core::task::{MAX_PRIORITY, MIN_PRIORITY};
use crate::core::{OrchestratorError, TodoManager};
use crate::persistence::{ContextStore, RunStore, Stores, TaskStore};

/// 三个协作者
#[derive(Clone)]
pub struct Agents {
    pub planner: Arc<dyn TaskPlanner>,
    pub executor: Arc<dyn TaskExecutor>,
    pub reflector: Arc<dyn Reflector>,
}

impl Agents {
    pub fn new<P, E, R>(planner: Arc<P>, executor: Arc<E>, reflector: Arc<R>) -> Self
    where
        P: TaskPlanner + 'static,
        E: TaskExecutor + 'static,
        R: Reflector + 'static,
    {
        Self {
            planner,
            executor,
            reflector,
        }
    }
}

impl std::fmt::Debug for Agents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agents").finish_non_exhaustive()
    }
}

/// Orchestrator 构建器
pub struct OrchestratorBuilder {
    goal: String,
    agents: Agents,
    settings: LoopSettings,
    run_store: Option<Arc<dyn RunStore>>,
    task_store: Option<Arc<dyn TaskStore>>,
    context_store: Option<Arc<dyn ContextStore>>,
    run_id: Option<String>,
}

impl OrchestratorBuilder {
    pub fn new(goal: impl Into<String>, agents: Agents) -> Self {
        Self {
            goal: goal.into(),
            agents,
            settings: LoopSettings::default(),
            run_store: None,
            task_store: None,
            context_store: None,
            run_id: None,
        }
    }

    /// 用 [orchestrator] 配置段覆盖全部循环参数
    pub fn from_config(mut self, section: &OrchestratorSection) -> Self {
        self.settings = LoopSettings::from(section);
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.settings.max_iterations = max_iterations;
        self
    }

    pub fn with_reflection_frequency(mut self, every: usize) -> Self {
        self.settings.reflection_frequency = every;
        self
    }

    pub fn with_planned_task_priority(mut self, priority: i64) -> Self {
        self.settings.planned_task_priority = priority;
        self
    }

    pub fn with_default_task_priority(mut self, priority: i64) -> Self {
        self.settings.default_task_priority = priority;
        self
    }

    pub fn with_capabilities<S: Into<String>>(mut self, caps: impl IntoIterator<Item = S>) -> Self {
        self.settings.capabilities = caps.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_run_store(mut self, store: Arc<dyn RunStore>) -> Self {
        self.run_store = Some(store);
        self
    }

    pub fn with_task_store(mut self, store: Arc<dyn TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    pub fn with_context_store(mut self, store: Arc<dyn ContextStore>) -> Self {
        self.context_store = Some(store);
        self
    }

    /// 一次注入三个存储
    pub fn with_stores(self, stores: Stores) -> Self {
        self.with_run_store(stores.runs)
            .with_task_store(stores.tasks)
            .with_context_store(stores.context)
    }

    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    /// 校验参数；注入存储时立即创建运行记录
    pub fn build(self) -> Result<Orchestrator, OrchestratorError> {
        if self.goal.trim().is_empty() {
            return Err(OrchestratorError::config("goal must not be empty"));
        }
        self.settings.validate()?;

        let persistence = match (self.run_store, self.task_store, self.context_store) {
            (Some(runs), Some(tasks), Some(context)) => {
                let run_id = self.run_id.ok_or_else(|| {
                    OrchestratorError::config("run_id is required when stores are provided")
                })?;
                if run_id.trim().is_empty() {
                    return Err(OrchestratorError::config("run_id must not be empty"));
                }
                runs.create(&run_id, &self.goal, self.settings.max_iterations)?;
                info!(run_id = %run_id, max_iterations = self.settings.max_iterations, "Run created");
                Some((
                    Persistence {
                        runs,
                        context,
                        run_id: run_id.clone(),
                    },
                    TodoManager::with_store(tasks, run_id),
                ))
            }
            (None, None, None) => {
                if self.run_id.is_some() {
                    return Err(OrchestratorError::config(
                        "run_id requires run, task and context stores",
                    ));
                }
                None
            }
            _ => {
                return Err(OrchestratorError::config(
                    "run, task and context stores must be provided together",
                ))
            }
        };

        let (persistence, todo) = match persistence {
            Some((p, todo)) => (Some(p), todo),
            None => (None, TodoManager::standalone()),
        };
        Ok(Orchestrator::new(self.goal, self.agents, self.settings, todo, persistence))
    }
}

impl LoopSettings {
    pub(crate) fn validate(&self) -> Result<(), OrchestratorError> {
        if self.max_iterations == 0 {
            return Err(OrchestratorError::config("max_iterations must be positive"));
        }
        if self.reflection_frequency == 0 {
            return Err(OrchestratorError::config("reflection_frequency must be positive"));
        }
        for (name, p) in [
            ("planned_task_priority", self.planned_task_priority),
            ("default_task_priority", self.default_task_priority),
        ] {
            if !(MIN_PRIORITY..=MAX_PRIORITY).contains(&p) {
                return Err(OrchestratorError::config(format!(
                    "{} must be within {}..={}, got {}",
                    name, MIN_PRIORITY, MAX_PRIORITY, p
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agents::{ScriptedExecutor, ScriptedPlanner, ScriptedReflector};
    use crate::core::Phase;
    use crate::persistence::MemoryStore;

    fn agents() -> Agents {
        Agents::new(
            Arc::new(ScriptedPlanner::new(["a"])),
            Arc::new(ScriptedExecutor::new()),
            Arc::new(ScriptedReflector::always_done()),
        )
    }

    #[test]
    fn test_stores_without_run_id_rejected() {
        let err = OrchestratorBuilder::new("goal", agents())
            .with_stores(Stores::memory())
            .build()
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(_)));
    }

    #[test]
    fn test_partial_stores_rejected() {
        let store = Arc::new(MemoryStore::new());
        let err = OrchestratorBuilder::new("goal", agents())
            .with_run_store(store.clone())
            .with_task_store(store)
            .with_run_id("r1")
            .build()
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(_)));
    }

    #[test]
    fn test_run_id_without_stores_rejected() {
        let err = OrchestratorBuilder::new("goal", agents())
            .with_run_id("r1")
            .build()
            .unwrap_err();
        assert!(matches!(err, OrchestratorError::Config(_)));
    }

    #[test]
    fn test_invalid_settings_rejected() {
        for builder in [
            OrchestratorBuilder::new("  ", agents()),
            OrchestratorBuilder::new("goal", agents()).with_max_iterations(0),
            OrchestratorBuilder::new("goal", agents()).with_reflection_frequency(0),
            OrchestratorBuilder::new("goal", agents()).with_planned_task_priority(11),
            OrchestratorBuilder::new("goal", agents()).with_default_task_priority(0),
        ] {
            assert!(matches!(builder.build(), Err(OrchestratorError::Config(_))));
        }
    }

    #[test]
    fn test_build_with_stores_creates_run() {
        let stores = Stores::memory();
        let orch = OrchestratorBuilder::new("goal", agents())
            .with_stores(stores.clone())
            .with_run_id("r1")
            .with_max_iterations(4)
            .build()
            .unwrap();
        assert_eq!(orch.run_id(), Some("r1"));

        let state = stores.runs.get("r1").unwrap().unwrap();
        assert_eq!(state.phase, Phase::Planning);
        assert_eq!(state.max_iterations, 4);
        assert_eq!(state.goal, "goal");

        let dup = OrchestratorBuilder::new("goal", agents())
            .with_stores(stores)
            .with_run_id("r1")
            .build();
        assert!(matches!(dup, Err(OrchestratorError::Store(_))));
    }

    #[test]
    fn test_from_config() {
        let section = OrchestratorSection {
            max_iterations: 2,
            capabilities: vec!["search".into()],
            ..OrchestratorSection::default()
        };
        let orch = OrchestratorBuilder::new("goal", agents())
            .from_config(&section)
            .build()
            .unwrap();
        assert_eq!(orch.max_iterations(), 2);
        assert!(orch.run_id().is_none());
    }
}
