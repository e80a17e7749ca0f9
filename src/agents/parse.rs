//! 从模型原始文本中提取结构化输出
//!
//! 支持 ```json ... ``` 代码块或首个 `{` 到最后一个 `}` 的片段；找不到 JSON 或字段不符时返回错误，不做猜测。
//!
//! 公开 API：crate 内不含 LLM 适配器，把模型文本接到 TaskPlanner / Reflector 的外部实现用它把
//! 原始输出转成 TaskPlan / Reflection，失败时得到 AgentError::Json。

use serde::de::DeserializeOwned;

use super::AgentError;

/// 提取 JSON 并反序列化为 T
pub fn parse_structured<T: DeserializeOwned>(raw: &str) -> Result<T, AgentError> {
    let trimmed = raw.trim();

    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```").map(|end| rest[..end].trim()).unwrap_or(rest.trim())
    } else if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if end < start {
            return Err(AgentError::Json(format!("no JSON object in output: {}", trimmed)));
        }
        &trimmed[start..=end]
    } else {
        return Err(AgentError::Json(format!("no JSON object in output: {}", trimmed)));
    };

    serde_json::from_str(json_str).map_err(|e| AgentError::Json(format!("{}: {}", e, json_str)))
}
