//! 响应数组提取 - 业务能力层
//!
//! 分析服务返回的不一定是干净的 JSON，可能在数组前后夹杂日志文本，
//! 甚至包含多段数组。本模块负责从任意文本中找出 JSON 数组片段并展平。

use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::error::ConfigError;
use crate::models::FieldRecord;

/// 数组片段的发现策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractStrategy {
    /// 整段能解析就用整段，否则按多片段处理
    #[default]
    Auto,
    /// 非贪婪匹配每个 `[...]`，分别解析后拼接
    #[serde(alias = "multi-fragment")]
    Multi,
    /// 从第一个 `[` 到最后一个 `]` 作为一个整体解析
    Span,
}

impl FromStr for ExtractStrategy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "multi" | "multi-fragment" => Ok(Self::Multi),
            "span" => Ok(Self::Span),
            other => Err(ConfigError::InvalidValue {
                key: "extract_strategy".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

fn fragment_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[[\s\S]*?\]").expect("静态正则表达式合法"))
}

/// 响应数组提取器
///
/// 职责：
/// - 从任意文本中找出 JSON 数组
/// - 解析失败的片段直接跳过，从不报错
/// - 不关心字段含义，也不关心流程
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseArrayExtractor {
    strategy: ExtractStrategy,
}

impl ResponseArrayExtractor {
    pub fn new(strategy: ExtractStrategy) -> Self {
        Self { strategy }
    }

    /// 提取字段记录
    ///
    /// 无法规范化的元素（如纯数字）会被跳过；一个都没找到时返回空列表，
    /// 调用方应将其视为"未检测到字段"，而不是错误
    pub fn extract(&self, response_text: &str) -> Vec<FieldRecord> {
        let raw = self.extract_values(response_text);
        let total = raw.len();
        let records: Vec<FieldRecord> = raw.iter().filter_map(FieldRecord::from_raw).collect();

        if records.len() < total {
            debug!(
                "跳过 {} 个无法识别的元素 (共 {} 个)",
                total - records.len(),
                total
            );
        }

        records
    }

    /// 提取展平后的原始数组元素
    pub fn extract_values(&self, response_text: &str) -> Vec<JsonValue> {
        match self.strategy {
            ExtractStrategy::Multi => multi_fragment(response_text),
            ExtractStrategy::Span => span_fragment(response_text).unwrap_or_default(),
            ExtractStrategy::Auto => {
                span_fragment(response_text).unwrap_or_else(|| multi_fragment(response_text))
            }
        }
    }
}

/// 非贪婪地匹配所有 `[...]` 片段，只保留能解析为非空数组的片段
fn multi_fragment(text: &str) -> Vec<JsonValue> {
    let mut values = Vec::new();

    for (idx, m) in fragment_regex().find_iter(text).enumerate() {
        match serde_json::from_str::<JsonValue>(m.as_str()) {
            Ok(JsonValue::Array(items)) if !items.is_empty() => {
                debug!("片段 #{} 解析成功，{} 个元素", idx + 1, items.len());
                values.extend(items);
            }
            Ok(_) => debug!("片段 #{} 为空数组，跳过", idx + 1),
            Err(e) => debug!("片段 #{} 解析失败，跳过: {}", idx + 1, e),
        }
    }

    values
}

/// 把第一个 `[` 到最后一个 `]` 之间的文本当作一个数组解析
fn span_fragment(text: &str) -> Option<Vec<JsonValue>> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    if end <= start {
        return None;
    }

    match serde_json::from_str::<JsonValue>(&text[start..=end]) {
        Ok(JsonValue::Array(items)) if !items.is_empty() => Some(items),
        Ok(_) => None,
        Err(e) => {
            debug!("整段 JSON 解析失败: {}", e);
            None
        }
    }
}
