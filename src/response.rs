//! The response envelope sent back to the grid client.

use serde::Serialize;
use serde_json::Value;

/// The stable payload shape: draw token echoed back, both counts, the page
/// of rows, and an `error` field only on the failure path. Debug fields are
/// attached only when the engine runs with `debug` enabled.
#[derive(Debug, Serialize)]
pub struct ResponseEnvelope {
    pub draw: u64,
    #[serde(rename = "recordsTotal")]
    pub records_total: u64,
    #[serde(rename = "recordsFiltered")]
    pub records_filtered: u64,
    pub data: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub queries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

impl ResponseEnvelope {
    pub fn new(draw: u64, records_total: u64, records_filtered: u64, data: Vec<Value>) -> Self {
        Self {
            draw,
            records_total,
            records_filtered,
            data,
            error: None,
            queries: None,
            input: None,
        }
    }

    /// The failure shape: zero filtered records, no data, the message in
    /// `error`.
    pub fn failure(draw: u64, message: impl Into<String>) -> Self {
        Self {
            draw,
            records_total: 0,
            records_filtered: 0,
            data: Vec::new(),
            error: Some(message.into()),
            queries: None,
            input: None,
        }
    }
}
