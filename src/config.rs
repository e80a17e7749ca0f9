//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `NANOAGENT__*` 覆盖（双下划线表示嵌套，如 `NANOAGENT__STORE__BACKEND=sqlite`）。

use std::path::PathBuf;

use serde::Deserialize;

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    #[serde(default)]
    pub orchestrator: OrchestratorSection,
    #[serde(default)]
    pub store: StoreSection,
}

/// [orchestrator] 段：迭代预算、反思频率、任务优先级
#[derive(Debug, Clone, Deserialize)]
pub struct OrchestratorSection {
    #[serde(default = "default_max_iterations")]
    pub max_iterations: usize,
    /// 每 N 次迭代反思一次（队列为空时也会反思）
    #[serde(default = "default_reflection_frequency")]
    pub reflection_frequency: usize,
    /// Planner 产出任务的入队优先级
    #[serde(default = "default_planned_task_priority")]
    pub planned_task_priority: i64,
    /// Reflector 追加任务的入队优先级
    #[serde(default = "default_task_priority")]
    pub default_task_priority: i64,
    /// 透传给 Executor 的能力名列表
    #[serde(default)]
    pub capabilities: Vec<String>,
}

fn default_max_iterations() -> usize {
    10
}

fn default_reflection_frequency() -> usize {
    3
}

fn default_planned_task_priority() -> i64 {
    8
}

fn default_task_priority() -> i64 {
    crate::core::DEFAULT_PRIORITY
}

impl Default for OrchestratorSection {
    fn default() -> Self {
        Self {
            max_iterations: default_max_iterations(),
            reflection_frequency: default_reflection_frequency(),
            planned_task_priority: default_planned_task_priority(),
            default_task_priority: default_task_priority(),
            capabilities: Vec::new(),
        }
    }
}

/// 存储后端
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// 进程内存，不持久化
    #[default]
    Memory,
    /// SQLite 文件（WAL）
    Sqlite,
}

/// [store] 段：后端选择、数据库路径与允许目录
#[derive(Debug, Clone, Deserialize)]
pub struct StoreSection {
    #[serde(default)]
    pub backend: StoreBackend,
    /// 数据库文件；相对路径相对 allowed_dir 解析，":memory:" 表示内存库
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
    /// 允许存放数据库文件的目录；未设置时不做目录校验
    pub allowed_dir: Option<PathBuf>,
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("nanoagent.db")
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for StoreSection {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            db_path: default_db_path(),
            allowed_dir: None,
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// 从 config 目录加载配置，环境变量 NANOAGENT__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 NANOAGENT__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{}.toml", name);
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(ref path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path.clone()).required(false));
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("NANOAGENT")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.orchestrator.max_iterations, 10);
        assert_eq!(cfg.orchestrator.reflection_frequency, 3);
        assert_eq!(cfg.orchestrator.default_task_priority, 5);
        assert_eq!(cfg.store.backend, StoreBackend::Memory);
        assert!(cfg.store.allowed_dir.is_none());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        std::fs::write(
            &path,
            r#"
[orchestrator]
max_iterations = 4
capabilities = ["search"]

[store]
backend = "sqlite"
db_path = "runs.db"
"#,
        )
        .unwrap();

        let cfg = load_config(Some(path)).unwrap();
        assert_eq!(cfg.orchestrator.max_iterations, 4);
        assert_eq!(cfg.orchestrator.reflection_frequency, 3);
        assert_eq!(cfg.orchestrator.capabilities, vec!["search".to_string()]);
        assert_eq!(cfg.store.backend, StoreBackend::Sqlite);
        assert_eq!(cfg.store.db_path, PathBuf::from("runs.db"));
    }
}
