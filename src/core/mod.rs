//! 核心编排层：任务与运行状态、任务队列、注入检测、主控循环

pub mod builder;
pub mod error;
pub mod guard;
pub mod orchestrator;
pub mod state;
pub mod task;
pub mod todo;

pub use builder::{Agents, OrchestratorBuilder};
pub use error::OrchestratorError;
pub use guard::validate_task_description;
pub use orchestrator::Orchestrator;
pub use state::{new_run_id, FinalResult, Phase, RunState, RunStatus};
pub use task::{generate_task_id, Task, TaskStatus, DEFAULT_PRIORITY};
pub use todo::TodoManager;
