// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::FileRecord;

pub const COLUMN_LABELS: [&str; 4] = ["File Name", "Text", "Number", "Hex"];

/// One renderable table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatRow {
    pub key: String,
    pub file: String,
    pub text: String,
    pub number: String,
    pub hex: String,
}

impl FlatRow {
    fn placeholder(file: &str, file_index: usize) -> Self {
        Self {
            key: format!("{file}-empty-{file_index}"),
            file: file.to_owned(),
            text: String::new(),
            number: String::new(),
            hex: String::new(),
        }
    }

    pub fn cells(&self) -> [&str; 4] {
        [
            self.file.as_str(),
            self.text.as_str(),
            self.number.as_str(),
            self.hex.as_str(),
        ]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowStripe {
    Secondary,
    White,
}

impl RowStripe {
    pub const fn for_index(index: usize) -> Self {
        if index % 2 == 0 {
            Self::Secondary
        } else {
            Self::White
        }
    }

    pub const fn class_name(self) -> &'static str {
        match self {
            Self::Secondary => "table-secondary",
            Self::White => "bg-white",
        }
    }
}

/// Flattens records into table rows, preserving record and line order. A
/// record without lines still contributes one blank row so the file stays
/// visible.
pub fn flatten_records(records: &[FileRecord]) -> Vec<FlatRow> {
    records
        .iter()
        .enumerate()
        .flat_map(|(file_index, record)| {
            if record.lines.is_empty() {
                return vec![FlatRow::placeholder(&record.file, file_index)];
            }
            record
                .lines
                .iter()
                .enumerate()
                .map(|(line_index, line)| FlatRow {
                    key: format!("{}-{line_index}", record.file),
                    file: record.file.clone(),
                    text: line.text.clone(),
                    number: line.number.clone(),
                    hex: line.hex.clone(),
                })
                .collect()
        })
        .collect()
}
