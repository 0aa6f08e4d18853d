// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod mock;

pub use mock::{MockBackend, MockResponse, RecordedRequest};

use anyhow::{Context, Result};
use filedeck_app::{FileRecord, LineRecord};
use serde_json::{Value, json};

const FILE_STEMS: [&str; 12] = [
    "access", "audit", "billing", "cache", "deploy", "events", "inventory", "ledger", "metrics",
    "orders", "payroll", "sessions",
];

const FILE_EXTENSIONS: [&str; 4] = ["csv", "txt", "log", "dat"];

const LINE_WORDS: [&str; 16] = [
    "alpha", "bravo", "charlie", "delta", "echo", "foxtrot", "golf", "hotel", "india", "juliet",
    "kilo", "lima", "mike", "november", "oscar", "papa",
];

/// The record the backend returns for `test.txt` in the documented examples.
pub fn test_file_record() -> FileRecord {
    FileRecord::new(
        "test.txt",
        vec![LineRecord::new(
            "RgTya",
            "64075909",
            "70ad29aacf0b690b0467fe2b2767f765",
        )],
    )
}

/// JSON array in the backend's wire shape.
pub fn records_json(records: &[FileRecord]) -> Result<Value> {
    serde_json::to_value(records).context("serialize file records")
}

/// Same records with capitalized line keys, as some producers send them.
pub fn capitalized_records_json(records: &[FileRecord]) -> Value {
    Value::Array(
        records
            .iter()
            .map(|record| {
                let lines = record
                    .lines
                    .iter()
                    .map(|line| json!({"Text": line.text, "Number": line.number, "Hex": line.hex}))
                    .collect::<Vec<_>>();
                json!({"file": record.file, "lines": lines})
            })
            .collect(),
    )
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }
}

/// Seeded generator of file records; the same seed always yields the same
/// data.
#[derive(Debug, Clone)]
pub struct FileFaker {
    rng: DeterministicRng,
}

impl FileFaker {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: DeterministicRng::new(seed.max(1)),
        }
    }

    pub fn file_name(&mut self) -> String {
        let stem = self.pick(&FILE_STEMS);
        let extension = self.pick(&FILE_EXTENSIONS);
        format!("{stem}-{}.{extension}", self.rng.int_n(100))
    }

    pub fn line(&mut self) -> LineRecord {
        let text = self.pick(&LINE_WORDS).to_owned();
        let number = self.rng.next_u64() % 100_000_000;
        let hex = format!("{:016x}{:016x}", self.rng.next_u64(), self.rng.next_u64());
        LineRecord::new(text, number.to_string(), hex)
    }

    /// A record with `line_count` lines.
    pub fn record(&mut self, line_count: usize) -> FileRecord {
        let file = self.file_name();
        let lines = (0..line_count).map(|_| self.line()).collect();
        FileRecord::new(file, lines)
    }

    /// `count` records with one to three lines each.
    pub fn records(&mut self, count: usize) -> Vec<FileRecord> {
        (0..count)
            .map(|_| {
                let line_count = 1 + self.rng.int_n(3);
                self.record(line_count)
            })
            .collect()
    }

    fn pick<'a>(&mut self, values: &'a [&'a str]) -> &'a str {
        values[self.rng.int_n(values.len())]
    }
}
