//! 数据库路径校验：绑定允许目录，纯词法解析，禁止 ../ 与绝对路径逃逸
//!
//! 校验发生在任何文件系统访问之前（不 canonicalize，不创建文件）。
//!
//! 限制：只检查路径文本，不跟随符号链接。allowed_dir 内指向目录外的符号链接会通过校验，
//! allowed_dir 需由部署方保证不含这类链接。

use std::path::{Component, Path, PathBuf};

use super::StoreError;

/// 内存数据库哨兵，始终允许
pub const MEMORY_DB: &str = ":memory:";

/// 将 db_path 解析到 allowed_dir 下；逃逸时返回 PathEscape
///
/// 相对路径相对 allowed_dir；绝对路径必须本身位于 allowed_dir 内。
pub fn validate_db_path(db_path: &Path, allowed_dir: &Path) -> Result<PathBuf, StoreError> {
    if db_path.as_os_str() == MEMORY_DB {
        return Ok(db_path.to_path_buf());
    }
    if db_path.as_os_str().is_empty() {
        return Err(StoreError::InvalidPath {
            path: String::new(),
            reason: "empty path".to_string(),
        });
    }

    let allowed = if allowed_dir.is_absolute() {
        normalize(allowed_dir)
    } else {
        normalize(&std::env::current_dir()?.join(allowed_dir))
    }
    .ok_or_else(|| StoreError::InvalidPath {
        path: allowed_dir.display().to_string(),
        reason: "allowed directory escapes filesystem root".to_string(),
    })?;

    let escape = || StoreError::PathEscape {
        path: db_path.display().to_string(),
        allowed: allowed.display().to_string(),
    };

    let resolved = normalize(&allowed.join(db_path)).ok_or_else(escape)?;
    if resolved == allowed || !resolved.starts_with(&allowed) {
        return Err(escape());
    }
    Ok(resolved)
}

/// 词法规范化：消去 `.` 与 `..`；`..` 越过根时返回 None
fn normalize(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() || out.as_os_str().is_empty() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}
