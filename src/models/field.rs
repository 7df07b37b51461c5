use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// 检测到的字段在原文档中的坐标
///
/// 核心逻辑不解释坐标含义，只原样转发
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// 检测到的单个个人信息字段
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRecord {
    /// 字段类型标签（如 "이름"、"주민등록번호"）
    #[serde(rename = "type")]
    pub field_type: String,
    /// 检测到的值
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    /// 本地选择状态，默认选中
    #[serde(default = "default_selected")]
    pub selected: bool,
}

fn default_selected() -> bool {
    true
}

impl FieldRecord {
    pub fn new(field_type: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field_type: field_type.into(),
            value: value.into(),
            position: None,
            selected: true,
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Some(Position { x, y });
        self
    }

    /// 将分析服务返回的原始元素规范化为字段记录
    ///
    /// 支持两种形态：
    /// - 元组 `["이름", "홍길동", 225, 266]`（类型、值、x、y）
    /// - 对象 `{"type": .., "value": .., "x": .., "y": ..}` 或带 `position` 子对象
    ///
    /// 无法识别的元素（标量、空数组、不含 type/value 的对象）返回 `None`
    pub fn from_raw(raw: &Value) -> Option<Self> {
        match raw {
            Value::Array(items) => {
                let field_type = items.first().map(label_text)?;
                let value = items.get(1).map(label_text).unwrap_or_default();
                let position = match (
                    items.get(2).and_then(Value::as_f64),
                    items.get(3).and_then(Value::as_f64),
                ) {
                    (Some(x), Some(y)) => Some(Position { x, y }),
                    _ => None,
                };
                Some(Self {
                    field_type,
                    value,
                    position,
                    selected: true,
                })
            }
            Value::Object(map) => {
                if !map.contains_key("type") && !map.contains_key("value") {
                    return None;
                }
                let field_type = map.get("type").map(label_text).unwrap_or_default();
                let value = map.get("value").map(label_text).unwrap_or_default();
                let position = map
                    .get("position")
                    .and_then(position_from_object)
                    .or_else(|| position_from_object(raw));
                let selected = map
                    .get("selected")
                    .and_then(Value::as_bool)
                    .unwrap_or(true);
                Some(Self {
                    field_type,
                    value,
                    position,
                    selected,
                })
            }
            _ => None,
        }
    }

    /// 转换为发送给外部服务的字段对象（去掉本地的 `selected` 标记）
    pub fn to_transmit(&self) -> TransmitField {
        TransmitField {
            field_type: self.field_type.clone(),
            value: self.value.clone(),
            x: self.position.map(|p| p.x),
            y: self.position.map(|p| p.y),
        }
    }
}

/// 发送给外部服务的字段对象
///
/// 坐标以扁平的 `x` / `y` 键发送，与接收方的约定一致
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransmitField {
    #[serde(rename = "type")]
    pub field_type: String,
    pub value: String,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_coord"
    )]
    pub x: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_coord"
    )]
    pub y: Option<f64>,
}

/// 整数坐标按整数输出，避免把 `225` 变成 `225.0`
fn serialize_coord<S>(coord: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match coord {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            serializer.serialize_i64(*v as i64)
        }
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

fn label_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn position_from_object(value: &Value) -> Option<Position> {
    let x = value.get("x").and_then(Value::as_f64)?;
    let y = value.get("y").and_then(Value::as_f64)?;
    Some(Position { x, y })
}
