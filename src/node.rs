use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A block placed on the canvas
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInstance {
    pub id: String,

    /// Registry identifier of the block type
    pub type_id: String,

    /// Canvas coordinates (pixels)
    pub position: Position,

    /// Block configuration, shaped like the type's default payload
    pub payload: Value,

    pub selectable: bool,

    /// `false` only for the start node
    pub deletable: bool,
}

impl NodeInstance {
    pub fn new(
        id: impl Into<String>,
        type_id: impl Into<String>,
        position: Position,
        payload: Value,
    ) -> Self {
        Self {
            id: id.into(),
            type_id: type_id.into(),
            position,
            payload,
            selectable: true,
            deletable: true,
        }
    }

    pub fn set_position(&mut self, position: Position) {
        self.position = position;
    }

    pub fn set_payload(&mut self, payload: Value) {
        self.payload = payload;
    }
}

/// Point on the canvas
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// NaN and infinities have no JSON representation
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Shift by an offset
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

/// Check that `payload` has the same shape as `template`.
///
/// Objects must have the same key set with values of the same JSON kind,
/// recursively. An empty template object accepts any object (free-form map);
/// array contents are not checked.
pub fn payload_conforms(template: &Value, payload: &Value) -> bool {
    match (template, payload) {
        (Value::Object(expected), Value::Object(actual)) => {
            if expected.is_empty() {
                return true;
            }
            expected.len() == actual.len()
                && expected.iter().all(|(key, expected_value)| {
                    actual
                        .get(key)
                        .is_some_and(|actual_value| payload_conforms(expected_value, actual_value))
                })
        }
        (Value::Null, Value::Null)
        | (Value::Bool(_), Value::Bool(_))
        | (Value::Number(_), Value::Number(_))
        | (Value::String(_), Value::String(_))
        | (Value::Array(_), Value::Array(_)) => true,
        _ => false,
    }
}
