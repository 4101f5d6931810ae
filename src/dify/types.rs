//! Dify 接口通用类型与负载解析工具
//!
//! 远端返回的是松散的 JSON，所有标量字段都按同一套规则提取：
//! 缺失或类型不符时回落到调用方给定的默认值，数值型（含数字字符串）统一截断为整数。

use anyhow::Context;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, error};

/// JSON 对象类型别名
pub type Payload = Map<String, Value>;

/// Dify 错误响应体（非 2xx 时返回）
#[derive(Debug, Deserialize)]
pub struct DifyErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: Option<u16>,
}

/// 通用 HTTP 响应处理：非 2xx 转为错误，成功时解析为 JSON 值
///
/// 这里不要求响应体一定是对象，形状校验交给调用方（同步引擎会把非对象视为硬错误）。
pub async fn handle_http_response(
    response: reqwest::Response,
    operation_name: &str,
) -> anyhow::Result<Value> {
    let status = response.status();

    let body_bytes = response.bytes().await.context("读取响应 body 失败")?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        if let Ok(err_body) = serde_json::from_slice::<DifyErrorBody>(&body_bytes) {
            if !err_body.code.is_empty() || !err_body.message.is_empty() {
                return Err(anyhow::anyhow!(
                    "Dify API 错误 {} ({}): {}",
                    status,
                    err_body.code,
                    err_body.message
                ));
            }
        }
        return Err(anyhow::anyhow!("HTTP 错误 {}: {}", status, body_str));
    }

    serde_json::from_slice::<Value>(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        anyhow::anyhow!("解析 JSON 失败: {}", e)
    })
}

/// 把响应转换为 JSON 对象，非对象时报错
pub fn into_payload(value: Value) -> anyhow::Result<Payload> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(anyhow::anyhow!(
            "响应体不是 JSON 对象，实际类型: {}",
            json_type_name(&other)
        )),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// 提取字符串字段；缺失、null 或非字符串时返回 `default`
pub fn extract_string(data: &Payload, key: &str, default: Option<&str>) -> Option<String> {
    match data.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        _ => default.map(str::to_string),
    }
}

/// 提取整数字段；数字与数字字符串截断为整数，其他情况返回 `default`
pub fn extract_int(data: &Payload, key: &str, default: i64) -> i64 {
    data.get(key).and_then(numeric_to_int).unwrap_or(default)
}

fn numeric_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<i64>().ok().or_else(|| {
                trimmed
                    .parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// 提取结构化字段（对象或数组），其他类型一律视为缺失
pub fn extract_structured(data: &Payload, key: &str) -> Option<Value> {
    match data.get(key) {
        Some(v @ (Value::Object(_) | Value::Array(_))) => Some(v.clone()),
        _ => None,
    }
}

/// 提取 `feedback.rating`；feedback 不是对象、没有 rating 或 rating 非字符串时返回 None
pub fn extract_feedback_rating(data: &Payload) -> Option<String> {
    data.get("feedback")
        .and_then(Value::as_object)
        .and_then(|feedback| feedback.get("rating"))
        .and_then(Value::as_str)
        .map(str::to_string)
}

/// 按字符截取前 `max_chars` 个字符
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
