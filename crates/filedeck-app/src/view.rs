// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{FileRecord, FlatRow, flatten_records};

pub const TABLE_TITLE: &str = "filedeck";
pub const TABLE_ERROR_MESSAGE: &str = "Error loading table, please try again";
pub const RETRY_LABEL: &str = "Try again";
pub const NO_DATA_LABEL: &str = "No Data";
pub const SEARCH_PLACEHOLDER: &str = "File Name";
pub const SEARCH_LABEL: &str = "Search";
pub const CLEAN_LABEL: &str = "Clean";

/// Loading/error/data tri-state for one query as the view sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchStatus<T> {
    pub data: Option<T>,
    pub error: Option<String>,
    pub is_loading: bool,
    pub is_fetching: bool,
}

impl<T> Default for FetchStatus<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_loading: false,
            is_fetching: false,
        }
    }
}

impl<T> FetchStatus<T> {
    pub fn idle() -> Self {
        Self::default()
    }

    /// A request is going out. Only a query with nothing to show yet counts as
    /// loading; a refetch keeps its previous data or error on screen.
    pub fn begin_fetch(&mut self) {
        self.is_fetching = true;
        self.is_loading = self.data.is_none() && self.error.is_none();
    }

    pub fn finish(&mut self, data: Option<T>) {
        self.data = data;
        self.error = None;
        self.is_loading = false;
        self.is_fetching = false;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.is_loading = false;
        self.is_fetching = false;
    }

    pub fn is_settled(&self) -> bool {
        !self.is_fetching && (self.data.is_some() || self.error.is_some())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewCommand {
    Mount,
    InsertChar(char),
    Backspace,
    SetInput(String),
    CommitSearch,
    Clean,
    Retry,
    Refresh,
    FilesLoaded(Vec<FileRecord>),
    FilesFailed(String),
    FileByNameLoaded {
        request_id: u64,
        records: Option<Vec<FileRecord>>,
    },
    FileByNameFailed {
        request_id: u64,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    FilesRequested,
    RefetchRequested,
    InputChanged(String),
    SearchCommitted { request_id: u64, name: String },
    SearchCleared,
    FilesLoaded { count: usize },
    FilesFailed(String),
    FileLoaded { name: String, rows: usize },
    FileFailed { name: String, error: String },
    StaleResultDropped { request_id: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableBody {
    Error { message: &'static str, detail: String },
    Loading,
    Empty,
    Rows(Vec<FlatRow>),
}

/// State behind the file table: the all-files query, the by-name query, the
/// search box contents and the committed search term.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TableView {
    pub files: FetchStatus<Vec<FileRecord>>,
    pub by_name: FetchStatus<Vec<FileRecord>>,
    pub input_value: String,
    pub search_name: String,
    search_request: u64,
}

impl TableView {
    /// Fresh view with the search box prefilled. Nothing is committed yet.
    pub fn with_input(input_value: impl Into<String>) -> Self {
        Self {
            input_value: input_value.into(),
            ..Self::default()
        }
    }

    pub fn dispatch(&mut self, command: ViewCommand) -> Vec<ViewEvent> {
        match command {
            ViewCommand::Mount => {
                self.files.begin_fetch();
                vec![ViewEvent::FilesRequested]
            }
            ViewCommand::InsertChar(ch) => {
                self.input_value.push(ch);
                vec![ViewEvent::InputChanged(self.input_value.clone())]
            }
            ViewCommand::Backspace => {
                if self.input_value.pop().is_none() {
                    return Vec::new();
                }
                vec![ViewEvent::InputChanged(self.input_value.clone())]
            }
            ViewCommand::SetInput(value) => {
                self.input_value = value;
                vec![ViewEvent::InputChanged(self.input_value.clone())]
            }
            ViewCommand::CommitSearch => self.commit_search(),
            ViewCommand::Clean => {
                if self.search_name.is_empty() {
                    return Vec::new();
                }
                self.input_value.clear();
                self.reset_search();
                vec![ViewEvent::SearchCleared]
            }
            ViewCommand::Retry => {
                if self.files.error.is_none() {
                    return Vec::new();
                }
                self.files.begin_fetch();
                vec![ViewEvent::RefetchRequested]
            }
            ViewCommand::Refresh => {
                self.files.begin_fetch();
                vec![ViewEvent::RefetchRequested]
            }
            ViewCommand::FilesLoaded(records) => {
                let count = records.len();
                self.files.finish(Some(records));
                vec![ViewEvent::FilesLoaded { count }]
            }
            ViewCommand::FilesFailed(error) => {
                self.files.fail(error.clone());
                vec![ViewEvent::FilesFailed(error)]
            }
            ViewCommand::FileByNameLoaded {
                request_id,
                records,
            } => {
                if !self.is_current_search(request_id) {
                    return vec![ViewEvent::StaleResultDropped { request_id }];
                }
                let rows = records.as_deref().map(flatten_records).map_or(0, |rows| rows.len());
                self.by_name.finish(records);
                vec![ViewEvent::FileLoaded {
                    name: self.search_name.clone(),
                    rows,
                }]
            }
            ViewCommand::FileByNameFailed { request_id, error } => {
                if !self.is_current_search(request_id) {
                    return vec![ViewEvent::StaleResultDropped { request_id }];
                }
                self.by_name.fail(error.clone());
                vec![ViewEvent::FileFailed {
                    name: self.search_name.clone(),
                    error,
                }]
            }
        }
    }

    fn commit_search(&mut self) -> Vec<ViewEvent> {
        let name = self.input_value.trim().to_owned();
        if name.is_empty() {
            let had_search = !self.search_name.is_empty();
            self.reset_search();
            return if had_search {
                vec![ViewEvent::SearchCleared]
            } else {
                Vec::new()
            };
        }

        // Same term, already answered: nothing to redo.
        if name == self.search_name && self.by_name.data.is_some() && !self.by_name.is_fetching {
            return Vec::new();
        }

        self.search_name = name.clone();
        self.search_request = self.search_request.saturating_add(1);
        self.by_name = FetchStatus::idle();
        self.by_name.begin_fetch();
        vec![ViewEvent::SearchCommitted {
            request_id: self.search_request,
            name,
        }]
    }

    fn reset_search(&mut self) {
        self.search_name.clear();
        self.by_name = FetchStatus::idle();
        // Results of searches committed before the reset must not land.
        self.search_request = self.search_request.saturating_add(1);
    }

    fn is_current_search(&self, request_id: u64) -> bool {
        !self.search_name.is_empty() && request_id == self.search_request
    }

    pub fn search_request(&self) -> u64 {
        self.search_request
    }

    pub fn is_searching(&self) -> bool {
        !self.search_name.is_empty()
    }

    /// Records the table is built from: the searched file when a search is
    /// active and answered, otherwise every file.
    pub fn base_records(&self) -> &[FileRecord] {
        if self.is_searching()
            && let Some(records) = &self.by_name.data
        {
            return records;
        }
        self.files.data.as_deref().unwrap_or(&[])
    }

    pub fn rows(&self) -> Vec<FlatRow> {
        flatten_records(self.base_records())
    }

    pub fn body(&self) -> TableBody {
        if let Some(detail) = &self.files.error {
            return TableBody::Error {
                message: TABLE_ERROR_MESSAGE,
                detail: detail.clone(),
            };
        }
        if self.files.is_loading || self.by_name.is_loading {
            return TableBody::Loading;
        }
        let rows = self.rows();
        if rows.is_empty() {
            TableBody::Empty
        } else {
            TableBody::Rows(rows)
        }
    }

    /// Failure of the by-name lookup. The table keeps showing every file
    /// while this is set.
    pub fn search_error(&self) -> Option<String> {
        if !self.is_searching() {
            return None;
        }
        self.by_name
            .error
            .as_ref()
            .map(|error| format!("file {:?} failed to load: {error}", self.search_name))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        FetchStatus, TABLE_ERROR_MESSAGE, TableBody, TableView, ViewCommand, ViewEvent,
    };
    use crate::{FileRecord, LineRecord};

    fn test_file() -> FileRecord {
        FileRecord::new(
            "test.txt",
            vec![
                LineRecord::new("Hello", "1", "0x48"),
                LineRecord::new("World", "2", "0x57"),
            ],
        )
    }

    fn other_file() -> FileRecord {
        FileRecord::new("other.txt", vec![LineRecord::new("Bye", "3", "0x42")])
    }

    fn loaded_view(records: Vec<FileRecord>) -> TableView {
        let mut view = TableView::default();
        view.dispatch(ViewCommand::Mount);
        view.dispatch(ViewCommand::FilesLoaded(records));
        view
    }

    fn commit(view: &mut TableView, input: &str) -> u64 {
        view.dispatch(ViewCommand::SetInput(input.to_owned()));
        let events = view.dispatch(ViewCommand::CommitSearch);
        match events.as_slice() {
            [ViewEvent::SearchCommitted { request_id, .. }] => *request_id,
            other => panic!("expected search commit, got {other:?}"),
        }
    }

    #[test]
    fn mount_requests_files_and_shows_loading() {
        let mut view = TableView::default();
        let events = view.dispatch(ViewCommand::Mount);
        assert_eq!(events, vec![ViewEvent::FilesRequested]);
        assert_eq!(view.body(), TableBody::Loading);
    }

    #[test]
    fn prefilled_input_commits_on_demand() {
        let mut view = TableView::with_input("  test.txt ");
        assert_eq!(view.input_value, "  test.txt ");
        assert!(!view.is_searching());

        let events = view.dispatch(ViewCommand::CommitSearch);
        assert_eq!(
            events,
            vec![ViewEvent::SearchCommitted {
                request_id: 1,
                name: "test.txt".to_owned(),
            }]
        );
    }

    #[test]
    fn empty_file_list_renders_no_data() {
        let view = loaded_view(Vec::new());
        assert_eq!(view.body(), TableBody::Empty);
    }

    #[test]
    fn single_file_renders_its_lines() {
        let view = loaded_view(vec![test_file()]);
        let TableBody::Rows(rows) = view.body() else {
            panic!("expected rows");
        };
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|row| row.file == "test.txt"));
    }

    #[test]
    fn files_error_takes_priority_over_loading() {
        let mut view = TableView::default();
        view.dispatch(ViewCommand::Mount);
        view.dispatch(ViewCommand::FilesFailed("Network error".to_owned()));
        view.by_name.is_loading = true;

        assert_eq!(
            view.body(),
            TableBody::Error {
                message: TABLE_ERROR_MESSAGE,
                detail: "Network error".to_owned(),
            }
        );
    }

    #[test]
    fn retry_requests_refetch_once_per_invocation() {
        let mut view = TableView::default();
        view.dispatch(ViewCommand::Mount);
        view.dispatch(ViewCommand::FilesFailed("Network error".to_owned()));

        let events = view.dispatch(ViewCommand::Retry);
        assert_eq!(events, vec![ViewEvent::RefetchRequested]);
        assert!(view.files.is_fetching);
        // Error banner stays until the refetch settles.
        assert!(matches!(view.body(), TableBody::Error { .. }));

        let events = view.dispatch(ViewCommand::Retry);
        assert_eq!(events, vec![ViewEvent::RefetchRequested]);

        view.dispatch(ViewCommand::FilesLoaded(vec![test_file()]));
        assert!(matches!(view.body(), TableBody::Rows(_)));
    }

    #[test]
    fn retry_without_error_is_ignored() {
        let mut view = loaded_view(vec![test_file()]);
        assert!(view.dispatch(ViewCommand::Retry).is_empty());
    }

    #[test]
    fn typing_does_not_commit() {
        let mut view = loaded_view(vec![test_file()]);
        for ch in "test".chars() {
            view.dispatch(ViewCommand::InsertChar(ch));
        }
        assert_eq!(view.input_value, "test");
        assert!(view.search_name.is_empty());
        view.dispatch(ViewCommand::Backspace);
        assert_eq!(view.input_value, "tes");
    }

    #[test]
    fn commit_trims_input_and_shows_loading() {
        let mut view = loaded_view(vec![test_file(), other_file()]);
        view.dispatch(ViewCommand::SetInput("  test.txt ".to_owned()));
        let events = view.dispatch(ViewCommand::CommitSearch);

        assert_eq!(
            events,
            vec![ViewEvent::SearchCommitted {
                request_id: 1,
                name: "test.txt".to_owned(),
            }]
        );
        assert_eq!(view.search_name, "test.txt");
        assert_eq!(view.body(), TableBody::Loading);
    }

    #[test]
    fn blank_commit_issues_no_search() {
        let mut view = loaded_view(vec![test_file()]);
        view.dispatch(ViewCommand::SetInput("   ".to_owned()));
        assert!(view.dispatch(ViewCommand::CommitSearch).is_empty());
        assert!(!view.is_searching());
    }

    #[test]
    fn search_then_clean_round_trips_rows() {
        let mut view = loaded_view(vec![test_file(), other_file()]);
        let before = view.rows();

        let request_id = commit(&mut view, "other.txt");
        view.dispatch(ViewCommand::FileByNameLoaded {
            request_id,
            records: Some(vec![other_file()]),
        });
        let searched = view.rows();
        assert_eq!(searched.len(), 1);
        assert_eq!(searched[0].file, "other.txt");

        let events = view.dispatch(ViewCommand::Clean);
        assert_eq!(events, vec![ViewEvent::SearchCleared]);
        assert!(view.input_value.is_empty());
        assert!(view.search_name.is_empty());
        assert_eq!(view.rows(), before);
    }

    #[test]
    fn clean_without_search_is_noop() {
        let mut view = loaded_view(vec![test_file()]);
        view.dispatch(ViewCommand::SetInput("draft".to_owned()));
        assert!(view.dispatch(ViewCommand::Clean).is_empty());
        assert_eq!(view.input_value, "draft");
    }

    #[test]
    fn repeated_identical_search_is_stable() {
        let mut view = loaded_view(vec![test_file(), other_file()]);
        let request_id = commit(&mut view, "test.txt");
        view.dispatch(ViewCommand::FileByNameLoaded {
            request_id,
            records: Some(vec![test_file()]),
        });
        let first = view.body();

        let events = view.dispatch(ViewCommand::CommitSearch);
        assert!(events.is_empty());
        assert_eq!(view.body(), first);
    }

    #[test]
    fn last_commit_wins_over_late_results() {
        let mut view = loaded_view(vec![test_file(), other_file()]);
        let first = commit(&mut view, "test.txt");
        let second = commit(&mut view, "other.txt");

        view.dispatch(ViewCommand::FileByNameLoaded {
            request_id: second,
            records: Some(vec![other_file()]),
        });
        let events = view.dispatch(ViewCommand::FileByNameLoaded {
            request_id: first,
            records: Some(vec![test_file()]),
        });

        assert_eq!(
            events,
            vec![ViewEvent::StaleResultDropped { request_id: first }]
        );
        let rows = view.rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].file, "other.txt");
    }

    #[test]
    fn results_after_clean_are_dropped() {
        let mut view = loaded_view(vec![test_file(), other_file()]);
        let request_id = commit(&mut view, "test.txt");
        view.dispatch(ViewCommand::Clean);

        let events = view.dispatch(ViewCommand::FileByNameLoaded {
            request_id,
            records: Some(vec![test_file()]),
        });
        assert_eq!(events, vec![ViewEvent::StaleResultDropped { request_id }]);
        assert_eq!(view.rows().len(), 3);
    }

    #[test]
    fn by_name_failure_keeps_all_files_and_reports() {
        let mut view = loaded_view(vec![test_file(), other_file()]);
        let request_id = commit(&mut view, "missing.txt");
        let events = view.dispatch(ViewCommand::FileByNameFailed {
            request_id,
            error: "404 Not Found".to_owned(),
        });

        assert_eq!(
            events,
            vec![ViewEvent::FileFailed {
                name: "missing.txt".to_owned(),
                error: "404 Not Found".to_owned(),
            }]
        );
        assert_eq!(view.rows().len(), 3);
        assert_eq!(
            view.search_error().as_deref(),
            Some("file \"missing.txt\" failed to load: 404 Not Found")
        );
    }

    #[test]
    fn empty_search_result_shows_all_files() {
        let mut view = loaded_view(vec![test_file()]);
        let request_id = commit(&mut view, "test.txt");
        view.dispatch(ViewCommand::FileByNameLoaded {
            request_id,
            records: None,
        });
        assert_eq!(view.rows().len(), 2);
    }

    #[test]
    fn fetch_status_refetch_keeps_previous_data() {
        let mut status = FetchStatus::idle();
        status.begin_fetch();
        assert!(status.is_loading);
        status.finish(Some(vec![1, 2]));
        status.begin_fetch();
        assert!(!status.is_loading);
        assert!(status.is_fetching);
        assert_eq!(status.data, Some(vec![1, 2]));
    }
}
