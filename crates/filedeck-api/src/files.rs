// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{ApiQuery, FetchError, Payload, QueryClient, QueryOptions, QueryState};
use anyhow::{Result, bail};
use filedeck_app::FileRecord;
use std::sync::Arc;
use url::Url;

const FILES_SCOPE: &str = "files";

/// Escapes everything except unreserved characters, so spaces and
/// parentheses are escaped too.
pub fn encode_query_value(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

/// Validates an API base URL and returns it without trailing slashes.
pub fn parse_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("API base URL must not be empty");
    }
    let parsed = match Url::parse(trimmed) {
        Ok(parsed) => parsed,
        Err(error) => bail!("API base URL {trimmed:?} is not a valid URL: {error}"),
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "API base URL {trimmed:?} must use http or https, got {:?}",
            parsed.scheme()
        );
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        bail!("API base URL {trimmed:?} must not carry a query string or fragment");
    }
    Ok(trimmed.to_owned())
}

/// The three file queries of the backend, bound to one base URL and one
/// query cache.
#[derive(Debug, Clone)]
pub struct FilesApi {
    base_url: String,
    client: QueryClient,
}

impl FilesApi {
    pub fn new(base_url: &str, client: QueryClient) -> Result<Self> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn client(&self) -> &QueryClient {
        &self.client
    }

    pub fn files_list_query(&self) -> ApiQuery {
        self.files_list_query_with(QueryOptions::default())
    }

    pub fn files_list_query_with(&self, options: QueryOptions) -> ApiQuery {
        ApiQuery::new(
            [FILES_SCOPE, "list"],
            format!("{}/files/list", self.base_url),
        )
        .with_options(options)
    }

    pub fn files_data_query(&self) -> ApiQuery {
        self.files_data_query_with(QueryOptions::default())
    }

    pub fn files_data_query_with(&self, options: QueryOptions) -> ApiQuery {
        ApiQuery::new(
            [FILES_SCOPE, "data"],
            format!("{}/files/data", self.base_url),
        )
        .with_options(options)
    }

    pub fn file_by_name_query(&self, file_name: &str) -> ApiQuery {
        self.file_by_name_query_with(file_name, QueryOptions::default())
    }

    /// An empty name disables the query regardless of `options`.
    pub fn file_by_name_query_with(&self, file_name: &str, options: QueryOptions) -> ApiQuery {
        let enabled = !file_name.is_empty() && options.is_enabled();
        ApiQuery::new(
            [FILES_SCOPE, "data", file_name],
            format!(
                "{}/files/data?filename={}",
                self.base_url,
                encode_query_value(file_name)
            ),
        )
        .with_options(options.enabled(enabled))
    }

    pub fn files_list(&self) -> Result<Vec<String>, FetchError> {
        let query = self.files_list_query();
        let Some(payload) = self.client.fetch(&query).into_result()? else {
            return Ok(Vec::new());
        };
        decode_files_list(query.url(), &payload)
    }

    pub fn files_data(&self) -> Result<Vec<FileRecord>, FetchError> {
        let state = self.client.fetch(&self.files_data_query());
        decode_files_data(state)
    }

    pub fn refetch_files_data(&self) -> Result<Vec<FileRecord>, FetchError> {
        let state = self.client.refetch(&self.files_data_query());
        decode_files_data(state)
    }

    /// `None` when the name is empty or the backend answered with nothing.
    pub fn file_by_name(&self, file_name: &str) -> Result<Option<Vec<FileRecord>>, FetchError> {
        let state = self.client.fetch(&self.file_by_name_query(file_name));
        Ok(state
            .into_result()?
            .and_then(|payload| FileRecord::search_result_from_json(&payload.to_json())))
    }
}

fn decode_files_list(url: &str, payload: &Arc<Payload>) -> Result<Vec<String>, FetchError> {
    let Some(names) = payload.as_json().and_then(|value| value.as_array()) else {
        return Err(FetchError::Unexpected {
            url: url.to_owned(),
            expected: "a JSON array of file names",
        });
    };
    Ok(names
        .iter()
        .filter_map(|name| name.as_str().map(str::to_owned))
        .collect())
}

fn decode_files_data(state: QueryState) -> Result<Vec<FileRecord>, FetchError> {
    Ok(state
        .into_result()?
        .map(|payload| FileRecord::list_from_json(&payload.to_json()))
        .unwrap_or_default())
}
