use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

pub const DATA_FORMAT_VERSION: &str = "0.2.0";

const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Top-level record of one measurement as submitted to the collector.
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    pub data_format_version: String,
    /// Data format extensions in use, name to version. Allocated on
    /// first registration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extensions: Option<BTreeMap<String, i64>>,
    pub input: Option<String>,
    pub measurement_start_time: String,
    pub test_keys: Value,
    pub test_name: String,
    pub test_runtime: f64,
    pub test_version: String,
}

impl Measurement {
    pub fn new(
        test_name: impl Into<String>,
        test_version: impl Into<String>,
        input: Option<String>,
        start: DateTime<Utc>,
    ) -> Self {
        Self {
            data_format_version: DATA_FORMAT_VERSION.to_string(),
            extensions: None,
            input,
            measurement_start_time: start.format(START_TIME_FORMAT).to_string(),
            test_keys: Value::Null,
            test_name: test_name.into(),
            test_runtime: 0.0,
            test_version: test_version.into(),
        }
    }
}
