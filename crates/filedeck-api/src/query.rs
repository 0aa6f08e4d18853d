// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Keyed query cache in front of [`fetch_json`].
//!
//! Every query is identified by a [`QueryKey`]. Data younger than the stale
//! time is served without touching the network, and callers racing on the
//! same key share a single in-flight request. Failed fetches are retried a
//! fixed number of times before the error is stored on the entry.

use crate::{FetchError, FetchOptions, Payload, fetch_json};
use anyhow::{Context, Result};
use reqwest::blocking::Client as HttpClient;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_STALE_TIME: Duration = Duration::from_secs(30);
pub const DEFAULT_RETRY: u32 = 2;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(segments.into_iter().map(Into::into).collect())
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

impl From<&str> for QueryKey {
    fn from(value: &str) -> Self {
        Self(vec![value.to_owned()])
    }
}

impl From<String> for QueryKey {
    fn from(value: String) -> Self {
        Self(vec![value])
    }
}

impl From<Vec<String>> for QueryKey {
    fn from(value: Vec<String>) -> Self {
        Self(value)
    }
}

impl<const N: usize> From<[&str; N]> for QueryKey {
    fn from(value: [&str; N]) -> Self {
        Self::new(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDelay {
    /// 1s, 2s, 4s, ... capped at 30s.
    Exponential,
    Fixed(Duration),
}

impl RetryDelay {
    pub fn for_attempt(self, attempt: u32) -> Duration {
        match self {
            Self::Exponential => {
                let millis = 1_000_u64.saturating_mul(1_u64 << attempt.min(16));
                Duration::from_millis(millis).min(MAX_RETRY_DELAY)
            }
            Self::Fixed(delay) => delay,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryDefaults {
    pub stale_time: Duration,
    pub retry: u32,
    pub retry_delay: RetryDelay,
}

impl Default for QueryDefaults {
    fn default() -> Self {
        Self {
            stale_time: DEFAULT_STALE_TIME,
            retry: DEFAULT_RETRY,
            retry_delay: RetryDelay::Exponential,
        }
    }
}

/// Per-query overrides of the client defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryOptions {
    pub enabled: Option<bool>,
    pub stale_time: Option<Duration>,
    pub retry: Option<u32>,
    pub retry_delay: Option<RetryDelay>,
}

impl QueryOptions {
    pub fn disabled() -> Self {
        Self {
            enabled: Some(false),
            ..Self::default()
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn stale_time(mut self, stale_time: Duration) -> Self {
        self.stale_time = Some(stale_time);
        self
    }

    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn retry_delay(mut self, retry_delay: RetryDelay) -> Self {
        self.retry_delay = Some(retry_delay);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiQuery {
    key: QueryKey,
    url: String,
    fetch: FetchOptions,
    options: QueryOptions,
}

impl ApiQuery {
    pub fn new(key: impl Into<QueryKey>, url: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            url: url.into(),
            fetch: FetchOptions::default(),
            options: QueryOptions::default(),
        }
    }

    pub fn with_fetch_options(mut self, fetch: FetchOptions) -> Self {
        self.fetch = fetch;
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryState {
    pub data: Option<Arc<Payload>>,
    pub error: Option<FetchError>,
    pub is_loading: bool,
    pub is_fetching: bool,
    pub updated_at: Option<Instant>,
}

impl QueryState {
    pub fn is_success(&self) -> bool {
        self.data.is_some() && self.error.is_none()
    }

    /// Settled outcome: the stored error wins over any older data.
    pub fn into_result(self) -> Result<Option<Arc<Payload>>, FetchError> {
        match self.error {
            Some(error) => Err(error),
            None => Ok(self.data),
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    data: Option<Arc<Payload>>,
    error: Option<FetchError>,
    updated_at: Option<Instant>,
    in_flight: bool,
    invalidated: bool,
}

impl Entry {
    fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.invalidated
            && self.data.is_some()
            && self
                .updated_at
                .is_some_and(|updated_at| updated_at.elapsed() < stale_time)
    }

    fn snapshot(&self) -> QueryState {
        QueryState {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.in_flight && self.data.is_none() && self.error.is_none(),
            is_fetching: self.in_flight,
            updated_at: self.updated_at,
        }
    }
}

struct Inner {
    http: HttpClient,
    defaults: QueryDefaults,
    store: Mutex<HashMap<QueryKey, Entry>>,
    settled: Condvar,
}

/// Shared query cache. Clones share the same store.
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryClient")
            .field("defaults", &self.inner.defaults)
            .finish_non_exhaustive()
    }
}

impl QueryClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Self::with_defaults(timeout, QueryDefaults::default())
    }

    pub fn with_defaults(timeout: Duration, defaults: QueryDefaults) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;
        Ok(Self::from_http(http, defaults))
    }

    pub fn from_http(http: HttpClient, defaults: QueryDefaults) -> Self {
        Self {
            inner: Arc::new(Inner {
                http,
                defaults,
                store: Mutex::new(HashMap::new()),
                settled: Condvar::new(),
            }),
        }
    }

    pub fn defaults(&self) -> QueryDefaults {
        self.inner.defaults
    }

    /// Cached data while fresh, otherwise a network fetch shared with any
    /// concurrent caller for the same key. Disabled queries never fetch.
    pub fn fetch(&self, query: &ApiQuery) -> QueryState {
        self.run(query, false)
    }

    /// Like [`Self::fetch`] but ignores freshness.
    pub fn refetch(&self, query: &ApiQuery) -> QueryState {
        self.run(query, true)
    }

    /// Current cache state for a key without fetching.
    pub fn peek(&self, key: &QueryKey) -> QueryState {
        self.lock_store()
            .get(key)
            .map(Entry::snapshot)
            .unwrap_or_default()
    }

    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(entry) = self.lock_store().get_mut(key) {
            entry.invalidated = true;
        }
    }

    pub fn clear(&self) {
        self.lock_store().clear();
        self.inner.settled.notify_all();
    }

    fn run(&self, query: &ApiQuery, force: bool) -> QueryState {
        let key = query.key();
        let mut store = self.lock_store();

        if !query.options.is_enabled() {
            debug!(%key, "query disabled");
            return store.get(key).map(Entry::snapshot).unwrap_or_default();
        }

        let stale_time = query
            .options
            .stale_time
            .unwrap_or(self.inner.defaults.stale_time);
        let entry = store.entry(key.clone()).or_default();
        if entry.in_flight {
            debug!(%key, "joining in-flight request");
            while store.get(key).is_some_and(|entry| entry.in_flight) {
                store = self.wait_settled(store);
            }
            return store.get(key).map(Entry::snapshot).unwrap_or_default();
        }
        if !force && entry.is_fresh(stale_time) {
            debug!(%key, "cache hit");
            return entry.snapshot();
        }
        entry.in_flight = true;
        drop(store);

        let guard = InFlight { client: self, key };
        let outcome = self.fetch_with_retry(query);
        guard.settle(outcome)
    }

    fn fetch_with_retry(&self, query: &ApiQuery) -> Result<Payload, FetchError> {
        let defaults = self.inner.defaults;
        let retries = query.options.retry.unwrap_or(defaults.retry);
        let delay = query.options.retry_delay.unwrap_or(defaults.retry_delay);

        let mut attempt = 0;
        loop {
            info!(key = %query.key, url = %query.url, attempt, "fetching");
            match fetch_json(&self.inner.http, &query.url, &query.fetch) {
                Ok(payload) => return Ok(payload),
                Err(error) if attempt < retries => {
                    let wait = delay.for_attempt(attempt);
                    warn!(key = %query.key, %error, ?wait, "fetch failed; retrying");
                    thread::sleep(wait);
                    attempt += 1;
                }
                Err(error) => {
                    warn!(key = %query.key, %error, attempts = attempt + 1, "fetch failed");
                    return Err(error);
                }
            }
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, HashMap<QueryKey, Entry>> {
        match self.inner.store.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn wait_settled<'a>(
        &'a self,
        store: MutexGuard<'a, HashMap<QueryKey, Entry>>,
    ) -> MutexGuard<'a, HashMap<QueryKey, Entry>> {
        match self.inner.settled.wait(store) {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Owns the in-flight flag of one key; releases waiters even if the fetch
/// unwinds.
struct InFlight<'a> {
    client: &'a QueryClient,
    key: &'a QueryKey,
}

impl InFlight<'_> {
    fn settle(self, outcome: Result<Payload, FetchError>) -> QueryState {
        let mut store = self.client.lock_store();
        let entry = store.entry(self.key.clone()).or_default();
        match outcome {
            Ok(payload) => {
                entry.data = Some(Arc::new(payload));
                entry.error = None;
                entry.updated_at = Some(Instant::now());
                entry.invalidated = false;
            }
            Err(error) => {
                entry.error = Some(error);
            }
        }
        entry.in_flight = false;
        // Waiters are woken by `Drop` after the store lock is released.
        entry.snapshot()
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(entry) = self.client.lock_store().get_mut(self.key) {
            entry.in_flight = false;
        }
        self.client.inner.settled.notify_all();
    }
}
