// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const MISSING_FILE_NAME: &str = "N/A";

/// One parsed line of a file. Upstream producers are inconsistent about key
/// casing, so deserialization accepts `text`/`Text`, `number`/`Number` and
/// `hex`/`Hex`, preferring the lower-case spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct LineRecord {
    pub text: String,
    pub number: String,
    pub hex: String,
}

impl LineRecord {
    pub fn new(text: impl Into<String>, number: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            number: number.into(),
            hex: hex.into(),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        Self {
            text: pick_field(value, "text", "Text"),
            number: pick_field(value, "number", "Number"),
            hex: pick_field(value, "hex", "Hex"),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.is_empty() && self.number.is_empty() && self.hex.is_empty()
    }
}

impl From<Value> for LineRecord {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

/// One ingested file and its parsed lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Value")]
pub struct FileRecord {
    pub file: String,
    pub lines: Vec<LineRecord>,
}

impl Default for FileRecord {
    fn default() -> Self {
        Self {
            file: MISSING_FILE_NAME.to_owned(),
            lines: Vec::new(),
        }
    }
}

impl FileRecord {
    pub fn new(file: impl Into<String>, lines: Vec<LineRecord>) -> Self {
        let file = file.into();
        Self {
            file: if file.is_empty() {
                MISSING_FILE_NAME.to_owned()
            } else {
                file
            },
            lines,
        }
    }

    pub fn from_json(value: &Value) -> Self {
        let file = value
            .get("file")
            .and_then(scalar_text)
            .unwrap_or_else(|| MISSING_FILE_NAME.to_owned());
        let lines = value
            .get("lines")
            .and_then(Value::as_array)
            .map(|lines| lines.iter().map(LineRecord::from_json).collect())
            .unwrap_or_default();
        Self { file, lines }
    }

    /// Decodes the all-files payload. Anything but a JSON array is treated as
    /// "no files".
    pub fn list_from_json(value: &Value) -> Vec<Self> {
        value
            .as_array()
            .map(|records| records.iter().map(Self::from_json).collect())
            .unwrap_or_default()
    }

    /// Decodes a by-name payload: a single record, an array of records, or
    /// nothing at all (`null`, `false`, empty string).
    pub fn search_result_from_json(value: &Value) -> Option<Vec<Self>> {
        match value {
            Value::Null | Value::Bool(false) => None,
            Value::String(text) if text.is_empty() => None,
            Value::Array(records) => Some(records.iter().map(Self::from_json).collect()),
            other => Some(vec![Self::from_json(other)]),
        }
    }
}

impl From<Value> for FileRecord {
    fn from(value: Value) -> Self {
        Self::from_json(&value)
    }
}

fn pick_field(value: &Value, lower: &str, capitalized: &str) -> String {
    [lower, capitalized]
        .into_iter()
        .filter_map(|key| value.get(key))
        .find_map(scalar_text)
        .unwrap_or_default()
}

// Null and empty strings count as missing so the capitalized key can fill in.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}
