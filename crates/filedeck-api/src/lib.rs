// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod error;
pub mod fetch;
pub mod files;
pub mod query;

pub use error::FetchError;
pub use fetch::{CacheMode, FetchOptions, Payload, fetch_json};
pub use files::{FilesApi, encode_query_value, parse_base_url};
pub use query::{
    ApiQuery, DEFAULT_RETRY, DEFAULT_STALE_TIME, QueryClient, QueryDefaults, QueryKey,
    QueryOptions, QueryState, RetryDelay,
};
