//! SQLite 存储：三个接口的持久化实现
//!
//! WAL 模式让同一文件内多个 run_id 可以并发读写；外键显式开启，保证不会出现孤立的 task / context 行。
//! 连接归 SqliteStore 所有，close 幂等且只记录失败。

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use tracing::{debug, error, info, warn};

use crate::core::{Phase, RunState, RunStatus, Task, TaskStatus};

use super::path::{validate_db_path, MEMORY_DB};
use super::{ContextStore, RunStore, StoreError, TaskStore};

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS runs (
    run_id TEXT PRIMARY KEY,
    goal TEXT NOT NULL,
    max_iterations INTEGER NOT NULL,
    phase TEXT NOT NULL,
    iteration INTEGER NOT NULL,
    current_task_id TEXT,
    created_at TEXT NOT NULL,
    outcome TEXT
);

CREATE TABLE IF NOT EXISTS tasks (
    run_id TEXT NOT NULL,
    task_id TEXT NOT NULL,
    description TEXT NOT NULL,
    status TEXT NOT NULL,
    priority INTEGER NOT NULL,
    result TEXT,
    PRIMARY KEY (run_id, task_id),
    FOREIGN KEY (run_id) REFERENCES runs(run_id)
);

CREATE TABLE IF NOT EXISTS context (
    run_id TEXT NOT NULL,
    task_id TEXT NOT NULL,
    result TEXT NOT NULL,
    PRIMARY KEY (run_id, task_id),
    FOREIGN KEY (run_id, task_id) REFERENCES tasks(run_id, task_id)
);

CREATE INDEX IF NOT EXISTS idx_tasks_run_status ON tasks(run_id, status);
";

/// 同优先级按 rowid（插入顺序）排序；upsert 使用 ON CONFLICT DO UPDATE 以保留 rowid
const TASK_COLUMNS: &str = "task_id, description, status, priority, result";

/// 持久化存储：单连接 + Mutex
pub struct SqliteStore {
    conn: Mutex<Option<Connection>>,
    db_path: PathBuf,
}

impl SqliteStore {
    /// 打开（或创建）数据库文件
    ///
    /// allowed_dir 有值时先做路径校验，逃逸直接拒绝，不会触碰文件系统。
    pub fn open(db_path: impl AsRef<Path>, allowed_dir: Option<&Path>) -> Result<Self, StoreError> {
        Self::open_with_timeout(db_path, allowed_dir, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_timeout(
        db_path: impl AsRef<Path>,
        allowed_dir: Option<&Path>,
        busy_timeout: Duration,
    ) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();
        let resolved = match allowed_dir {
            Some(dir) => validate_db_path(db_path, dir).map_err(|e| {
                error!(path = %db_path.display(), allowed = %dir.display(), "Rejected database path: {}", e);
                e
            })?,
            None => db_path.to_path_buf(),
        };
        Self::open_resolved(resolved, busy_timeout)
    }

    /// 内存数据库（测试用）
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::open_resolved(PathBuf::from(MEMORY_DB), DEFAULT_BUSY_TIMEOUT)
    }

    fn open_resolved(db_path: PathBuf, busy_timeout: Duration) -> Result<Self, StoreError> {
        let conn = open_connection(&db_path, busy_timeout).map_err(|e| {
            error!(path = %db_path.display(), "Failed to connect to database: {}", e);
            e
        })?;

        if let Err(e) = conn.execute_batch(SCHEMA) {
            error!(path = %db_path.display(), "Failed to initialize database schema: {}", e);
            // 释放已打开的句柄再返回错误
            if let Err((_, close_err)) = conn.close() {
                warn!("Error closing database after failed init: {}", close_err);
            }
            return Err(e.into());
        }

        info!(path = %db_path.display(), "Sqlite store opened");
        Ok(Self {
            conn: Mutex::new(Some(conn)),
            db_path,
        })
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// 关闭连接；可重复调用，失败只记录日志
    pub fn close(&self) {
        let conn = match self.conn.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        if let Some(conn) = conn {
            match conn.close() {
                Ok(()) => debug!(path = %self.db_path.display(), "Sqlite store closed"),
                Err((_, e)) => warn!(path = %self.db_path.display(), "Error closing database connection: {}", e),
            }
        }
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().map(|c| c.is_none()).unwrap_or(true)
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let guard = self.conn.lock().map_err(|_| StoreError::Poisoned)?;
        let conn = guard.as_ref().ok_or(StoreError::Closed)?;
        f(conn)
    }

    fn query_tasks(&self, sql: &str, run_id: &str) -> Result<Vec<Task>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params![run_id], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i64>(3)?,
                    row.get::<_, Option<String>>(4)?,
                ))
            })?;
            let mut tasks = Vec::new();
            for row in rows {
                let (id, description, status, priority, result) = row?;
                tasks.push(Task {
                    id,
                    description,
                    status: status.parse::<TaskStatus>().map_err(StoreError::Corrupt)?,
                    priority,
                    result,
                });
            }
            Ok(tasks)
        })
    }
}

impl Drop for SqliteStore {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("db_path", &self.db_path)
            .field("closed", &self.is_closed())
            .finish()
    }
}

/// 打开连接并设置 WAL / 外键 / busy timeout；任一步失败时连接随 Err 一起被释放
fn open_connection(path: &Path, busy_timeout: Duration) -> Result<Connection, StoreError> {
    let conn = Connection::open(path)?;
    conn.busy_timeout(busy_timeout)?;
    // journal_mode 会返回一行；内存库返回 "memory"
    let mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    debug!(path = %path.display(), journal_mode = %mode, "Sqlite connection configured");
    Ok(conn)
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation)
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn to_usize(value: i64, field: &str) -> Result<usize, StoreError> {
    usize::try_from(value).map_err(|_| StoreError::Corrupt(format!("negative {}: {}", field, value)))
}

impl RunStore for SqliteStore {
    fn create(&self, run_id: &str, goal: &str, max_iterations: usize) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO runs (run_id, goal, max_iterations, phase, iteration, current_task_id, created_at, outcome)
                 VALUES (?1, ?2, ?3, ?4, 0, NULL, ?5, NULL)",
                params![run_id, goal, to_i64(max_iterations), Phase::Planning.as_str(), Utc::now()],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::RunExists(run_id.to_string())
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    fn get(&self, run_id: &str) -> Result<Option<RunState>, StoreError> {
        let row = self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    "SELECT run_id, goal, max_iterations, phase, iteration, current_task_id, created_at, outcome
                     FROM runs WHERE run_id = ?1",
                    params![run_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, i64>(4)?,
                            row.get::<_, Option<String>>(5)?,
                            row.get::<_, DateTime<Utc>>(6)?,
                            row.get::<_, Option<String>>(7)?,
                        ))
                    },
                )
                .optional()?)
        })?;

        let Some((run_id, goal, max_iterations, phase, iteration, current_task_id, created_at, outcome)) =
            row
        else {
            return Ok(None);
        };

        Ok(Some(RunState {
            run_id,
            goal,
            max_iterations: to_usize(max_iterations, "max_iterations")?,
            phase: phase.parse::<Phase>().map_err(StoreError::Corrupt)?,
            iteration: to_usize(iteration, "iteration")?,
            current_task_id,
            created_at,
            outcome: outcome
                .map(|o| o.parse::<RunStatus>())
                .transpose()
                .map_err(StoreError::Corrupt)?,
        }))
    }

    fn list(&self) -> Result<Vec<String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT run_id FROM runs ORDER BY rowid DESC")?;
            let ids = stmt
                .query_map([], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ids)
        })
    }

    fn update_loop_state(
        &self,
        run_id: &str,
        phase: Phase,
        iteration: usize,
        current_task_id: Option<&str>,
    ) -> Result<(), StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE runs SET phase = ?1, iteration = ?2, current_task_id = ?3 WHERE run_id = ?4",
                params![phase.as_str(), to_i64(iteration), current_task_id, run_id],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        Ok(())
    }

    fn finish(&self, run_id: &str, iteration: usize, outcome: RunStatus) -> Result<(), StoreError> {
        let changed = self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE runs SET phase = ?1, iteration = ?2, current_task_id = NULL, outcome = ?3
                 WHERE run_id = ?4",
                params![Phase::Done.as_str(), to_i64(iteration), outcome.as_str(), run_id],
            )?)
        })?;
        if changed == 0 {
            return Err(StoreError::RunNotFound(run_id.to_string()));
        }
        Ok(())
    }
}

impl TaskStore for SqliteStore {
    fn save(&self, run_id: &str, task: &Task) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO tasks (run_id, task_id, description, status, priority, result)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                 ON CONFLICT(run_id, task_id) DO UPDATE SET
                    description = excluded.description,
                    status = excluded.status,
                    priority = excluded.priority,
                    result = excluded.result",
                params![
                    run_id,
                    task.id,
                    task.description,
                    task.status.as_str(),
                    task.priority,
                    task.result
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::RunNotFound(run_id.to_string())
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    fn get_all(&self, run_id: &str) -> Result<Vec<Task>, StoreError> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE run_id = ?1 ORDER BY priority DESC, rowid ASC"
            ),
            run_id,
        )
    }

    fn get_pending(&self, run_id: &str) -> Result<Vec<Task>, StoreError> {
        self.query_tasks(
            &format!(
                "SELECT {TASK_COLUMNS} FROM tasks WHERE run_id = ?1 AND status = 'pending'
                 ORDER BY priority DESC, rowid ASC"
            ),
            run_id,
        )
    }
}

impl ContextStore for SqliteStore {
    fn save_result(&self, run_id: &str, task_id: &str, result: &str) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT OR REPLACE INTO context (run_id, task_id, result) VALUES (?1, ?2, ?3)",
                params![run_id, task_id, result],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    StoreError::TaskNotFound {
                        run_id: run_id.to_string(),
                        task_id: task_id.to_string(),
                    }
                } else {
                    e.into()
                }
            })?;
            Ok(())
        })
    }

    fn get_all(&self, run_id: &str) -> Result<HashMap<String, String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT task_id, result FROM context WHERE run_id = ?1")?;
            let map = stmt
                .query_map(params![run_id], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<Result<HashMap<_, _>, _>>()?;
            Ok(map)
        })
    }
}
