// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use filedeck_api::{FetchError, FilesApi};
use filedeck_app::FileRecord;
use filedeck_tui::{DataRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::debug;

/// Feeds the UI from the HTTP API. Loads run on worker threads and report
/// back over the UI's internal channel.
pub struct ApiRuntime {
    api: FilesApi,
}

impl ApiRuntime {
    pub fn new(api: FilesApi) -> Self {
        Self { api }
    }
}

fn files_data(api: &FilesApi, force: bool) -> Result<Vec<FileRecord>, FetchError> {
    if force {
        api.refetch_files_data()
    } else {
        api.files_data()
    }
}

impl DataRuntime for ApiRuntime {
    fn load_files_data(&mut self, force: bool) -> Result<Vec<FileRecord>> {
        Ok(files_data(&self.api, force)?)
    }

    fn load_file_by_name(&mut self, name: &str) -> Result<Option<Vec<FileRecord>>> {
        Ok(self.api.file_by_name(name)?)
    }

    fn spawn_files_data(&mut self, force: bool, tx: Sender<InternalEvent>) -> Result<()> {
        let api = self.api.clone();
        thread::Builder::new()
            .name("filedeck-files".to_owned())
            .spawn(move || {
                let result = files_data(&api, force).map_err(|error| error.to_string());
                if tx.send(InternalEvent::FilesData(result)).is_err() {
                    debug!("ui gone before file data arrived");
                }
            })
            .context("spawn file data worker")?;
        Ok(())
    }

    fn spawn_file_by_name(
        &mut self,
        request_id: u64,
        name: &str,
        tx: Sender<InternalEvent>,
    ) -> Result<()> {
        let api = self.api.clone();
        let name = name.to_owned();
        thread::Builder::new()
            .name("filedeck-search".to_owned())
            .spawn(move || {
                let result = api.file_by_name(&name).map_err(|error| error.to_string());
                if tx
                    .send(InternalEvent::FileByName { request_id, result })
                    .is_err()
                {
                    debug!(request_id, "ui gone before search result arrived");
                }
            })
            .context("spawn file search worker")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::ApiRuntime;
    use anyhow::Result;
    use filedeck_api::{FilesApi, QueryClient, QueryDefaults, RetryDelay};
    use filedeck_testkit::{MockBackend, MockResponse, records_json, test_file_record};
    use filedeck_tui::{DataRuntime, InternalEvent};
    use serde_json::json;
    use std::sync::mpsc;
    use std::time::Duration;

    fn runtime(backend: &MockBackend) -> Result<ApiRuntime> {
        let client = QueryClient::with_defaults(
            Duration::from_secs(2),
            QueryDefaults {
                retry: 0,
                retry_delay: RetryDelay::Fixed(Duration::ZERO),
                ..QueryDefaults::default()
            },
        )?;
        Ok(ApiRuntime::new(FilesApi::new(backend.base_url(), client)?))
    }

    #[test]
    fn spawned_files_load_reports_over_channel() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route(
            "/files/data",
            MockResponse::json(records_json(&[test_file_record()])?),
        );
        let mut runtime = runtime(&backend)?;
        let (tx, rx) = mpsc::channel();

        runtime.spawn_files_data(false, tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(event, InternalEvent::FilesData(Ok(vec![test_file_record()])));
        Ok(())
    }

    #[test]
    fn forced_load_bypasses_cache() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route("/files/data", MockResponse::json(json!([])));
        let mut runtime = runtime(&backend)?;

        runtime.load_files_data(false)?;
        runtime.load_files_data(false)?;
        assert_eq!(backend.hits("/files/data"), 1);
        runtime.load_files_data(true)?;
        assert_eq!(backend.hits("/files/data"), 2);
        Ok(())
    }

    #[test]
    fn spawned_search_failure_carries_status_text() -> Result<()> {
        let backend = MockBackend::start()?;
        backend.route(
            "/files/data?filename=nope.txt",
            MockResponse::empty(404),
        );
        let mut runtime = runtime(&backend)?;
        let (tx, rx) = mpsc::channel();

        runtime.spawn_file_by_name(7, "nope.txt", tx)?;
        let event = rx.recv_timeout(Duration::from_secs(5))?;
        assert_eq!(
            event,
            InternalEvent::FileByName {
                request_id: 7,
                result: Err("404 Not Found".to_owned()),
            }
        );
        Ok(())
    }
}
