use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Wrapper around any fetched or derived value exposed through a data context.
///
/// `loading` is true exactly while no result (success or error) has landed
/// for the current fetch cycle. `value` is the transform-specific headline
/// that consumers should prefer over `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    #[serde(default)]
    pub data: Value,
    pub loading: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docs: Option<Vec<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sum: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl Default for Envelope {
    fn default() -> Self {
        Self::pending()
    }
}

impl Envelope {
    /// `{ data: null, loading: true }`, the state before any result landed.
    pub fn pending() -> Self {
        Self {
            data: Value::Null,
            loading: true,
            error: None,
            docs: None,
            count: None,
            sum: None,
            average: None,
            value: None,
            raw: None,
        }
    }

    /// A landed result carrying `data` and nothing else.
    pub fn ready(data: Value) -> Self {
        Self {
            data,
            loading: false,
            ..Self::pending()
        }
    }

    /// A landed failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            loading: false,
            error: Some(message.into()),
            ..Self::pending()
        }
    }

    pub fn is_ready(&self) -> bool {
        !self.loading && self.error.is_none()
    }

    /// The value consumers should display: `value` when present, else `data`.
    pub fn headline(&self) -> &Value {
        self.value.as_ref().unwrap_or(&self.data)
    }
}
