// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use filedeck_api::FilesApi;
use filedeck_app::{
    COLUMN_LABELS, NO_DATA_LABEL, TableBody, TableView, ViewCommand, ViewEvent,
};

const COLUMN_GAP: &str = "  ";

/// Drives a view to completion synchronously: all files first, then the
/// optional search, following the same merge rules as the UI.
pub fn load_view(api: &FilesApi, search: Option<&str>) -> TableView {
    let mut view = TableView::default();
    view.dispatch(ViewCommand::Mount);
    view.dispatch(match api.files_data() {
        Ok(records) => ViewCommand::FilesLoaded(records),
        Err(error) => ViewCommand::FilesFailed(error.to_string()),
    });

    let Some(search) = search else {
        return view;
    };
    view.dispatch(ViewCommand::SetInput(search.to_owned()));
    for event in view.dispatch(ViewCommand::CommitSearch) {
        if let ViewEvent::SearchCommitted { request_id, name } = event {
            view.dispatch(match api.file_by_name(&name) {
                Ok(records) => ViewCommand::FileByNameLoaded {
                    request_id,
                    records,
                },
                Err(error) => ViewCommand::FileByNameFailed {
                    request_id,
                    error: error.to_string(),
                },
            });
        }
    }
    view
}

/// Plain-text table with space-aligned columns.
pub fn render_dump(view: &TableView) -> Result<String> {
    let rows = match view.body() {
        TableBody::Error { message, detail } => bail!("{message}: {detail}"),
        TableBody::Loading => bail!("file data is still loading"),
        TableBody::Empty => Vec::new(),
        TableBody::Rows(rows) => rows,
    };

    let mut widths = COLUMN_LABELS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row.cells()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, COLUMN_LABELS, &widths);
    if rows.is_empty() {
        out.push_str(NO_DATA_LABEL);
        out.push('\n');
    }
    for row in &rows {
        push_line(&mut out, row.cells(), &widths);
    }
    Ok(out)
}

fn push_line(out: &mut String, cells: [&str; 4], widths: &[usize; 4]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{cell:<width$}"))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::{load_view, render_dump};
    use anyhow::Result;
    use filedeck_api::{FilesApi, QueryClient, QueryDefaults, RetryDelay};
    use filedeck_app::{FileRecord, LineRecord, TableView, ViewCommand};
    use filedeck_testkit::{MockBackend, MockResponse, records_json, test_file_record};
    use serde_json::json;
    use std::time::Duration;

    fn api(backend: &MockBackend) -> Result<FilesApi> {
        let client = QueryClient::with_defaults(
            Duration::from_secs(2),
            QueryDefaults {
                retry: 0,
                retry_delay: RetryDelay::Fixed(Duration::ZERO),
                ..QueryDefaults::default()
            },
        )?;
        FilesApi::new(backend.base_url(), client)
    }

    fn loaded(records: Vec<FileRecord>) -> TableView {
        let mut view = TableView::default();
        view.dispatch(ViewCommand::Mount);
        view.dispatch(ViewCommand::FilesLoaded(records));
        view
    }

    #[test]
    fn dump_aligns_columns() -> Result<()> {
        let view = loaded(vec![
            FileRecord::new(
                "a.txt",
                vec![
                    LineRecord::new("Hello", "1", "0x48"),
                    LineRecord::new("World", "22", "0x57"),
                ],
            ),
            FileRecord::new("empty.csv", Vec::new()),
        ]);

        let dump = render_dump(&view)?;
        assert_eq!(
            dump,
            concat!(
                "File Name  Text   Number  Hex\n",
                "a.txt      Hello  1       0x48\n",
                "a.txt      World  22      0x57\n",
                "empty.csv\n",
            )
        );
        Ok(())
    }

    #[test]
    fn dump_of_empty_view_says_no_data() -> Result<()> {
        let dump = render_dump(&loaded(Vec::new()))?;
        assert_eq!(dump, "File Name  Text  Number  Hex\nNo Data\n");
        Ok(())
    }

    #[test]
    fn dump_of_failed_view_is_an_error() {
        let mut view = TableView::default();
        view.dispatch(ViewCommand::FilesFailed("500 Internal Server Error".to_owned()));
        let error = render_dump(&view).expect_err("failed view should not dump");
        assert_eq!(
            error.to_string(),
            "Error loading table, please try again: 500 Internal Server Error"
        );
    }

    #[test]
    fn load_view_applies_search() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route(
            "/files/data",
            MockResponse::json(json!([
                {"file": "other.txt", "lines": []},
                {"file": "test.txt", "lines": [{"Text": "RgTya", "Number": 64075909, "Hex": "70ad29aacf0b690b0467fe2b2767f765"}]},
            ])),
        );
        backend.route(
            "/files/data?filename=test.txt",
            MockResponse::json(records_json(&[test_file_record()])?),
        );

        let view = load_view(&api(&backend)?, Some("test.txt"));
        assert_eq!(view.base_records(), [test_file_record()]);
        assert!(view.search_error().is_none());
        Ok(())
    }

    #[test]
    fn load_view_keeps_all_files_when_search_fails() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route("/files/data", MockResponse::json(records_json(&[test_file_record()])?));
        backend.route(
            "/files/data?filename=gone.txt",
            MockResponse::json(json!({"message": "File not found"})).status(404),
        );

        let view = load_view(&api(&backend)?, Some("gone.txt"));
        assert_eq!(view.rows().len(), 1);
        assert_eq!(
            view.search_error().as_deref(),
            Some("file \"gone.txt\" failed to load: 404 File not found")
        );
        Ok(())
    }
}
