//! 任务描述注入检测：Reflector 追加的任务在入队前必须通过黑名单
//!
//! 命中 shell 元字符、破坏性命令或代码执行标记即拒绝。

use std::sync::OnceLock;

use regex::Regex;

use crate::core::OrchestratorError;

/// 可疑模式（大小写不敏感）
const SUSPICIOUS_PATTERNS: &[&str] = &[
    r"[;|&$`]",                                         // shell 元字符
    r"\brm\s+(-r|-f|--)",                               // 破坏性删除
    r"\b(del|delete|drop|truncate)\s+(table|database)", // 数据库破坏
    r"\bexec\s*\(",
    r"\beval\s*\(",
    r"\bsystem\s*\(",
    r"__import__",
];

fn compiled() -> &'static [(&'static str, Regex)] {
    static PATTERNS: OnceLock<Vec<(&'static str, Regex)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        SUSPICIOUS_PATTERNS
            .iter()
            .filter_map(|p| match Regex::new(&format!("(?i){}", p)) {
                Ok(re) => Some((*p, re)),
                Err(e) => {
                    tracing::error!(pattern = %p, "Invalid suspicious pattern: {}", e);
                    None
                }
            })
            .collect()
    })
}

/// 校验任务描述；命中任一模式返回 SuspiciousTask
pub fn validate_task_description(description: &str) -> Result<(), OrchestratorError> {
    for (pattern, re) in compiled() {
        if re.is_match(description) {
            return Err(OrchestratorError::SuspiciousTask {
                pattern: (*pattern).to_string(),
                description: description.chars().take(100).collect(),
            });
        }
    }
    Ok(())
}
