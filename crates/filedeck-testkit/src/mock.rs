// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use serde_json::{Value, json};
use std::collections::{HashMap, VecDeque};
use std::io::Read;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Request, Response, Server};

#[derive(Debug, Clone, PartialEq)]
pub struct MockResponse {
    status: u16,
    content_type: Option<&'static str>,
    body: String,
    delay: Duration,
}

impl MockResponse {
    pub fn json(value: Value) -> Self {
        Self {
            status: 200,
            content_type: Some("application/json"),
            body: value.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: Some("text/plain"),
            body: body.into(),
            delay: Duration::ZERO,
        }
    }

    pub fn empty(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: String::new(),
            delay: Duration::ZERO,
        }
    }

    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn content_type(mut self, content_type: &'static str) -> Self {
        self.content_type = Some(content_type);
        self
    }

    /// Holds the response back, which keeps a request in flight.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn into_response(self) -> Response<std::io::Cursor<Vec<u8>>> {
        let mut response = Response::from_string(self.body).with_status_code(self.status);
        if let Some(content_type) = self.content_type
            && let Ok(header) = Header::from_bytes("Content-Type", content_type)
        {
            response = response.with_header(header);
        }
        response
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(field, _)| field.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Debug, Default)]
struct Routes {
    // The last queued response repeats once the others are used up.
    responses: HashMap<String, VecDeque<MockResponse>>,
    requests: Vec<RecordedRequest>,
}

impl Routes {
    fn next_response(&mut self, url: &str) -> MockResponse {
        let Some(queue) = self.responses.get_mut(url) else {
            return MockResponse::json(json!({"message": "no route"})).status(404);
        };
        if queue.len() > 1
            && let Some(response) = queue.pop_front()
        {
            return response;
        }
        queue
            .front()
            .cloned()
            .unwrap_or_else(|| MockResponse::empty(404))
    }

    fn answer(&mut self, request: RecordedRequest) -> MockResponse {
        let response = self.next_response(&request.url);
        self.requests.push(request);
        response
    }
}

/// Local HTTP server that answers by exact path and query, recording every
/// request it sees.
pub struct MockBackend {
    server: Arc<Server>,
    routes: Arc<Mutex<Routes>>,
    base_url: String,
    handle: Option<JoinHandle<()>>,
}

impl MockBackend {
    pub fn start() -> Result<Self> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());
        let server = Arc::new(server);
        let routes = Arc::new(Mutex::new(Routes::default()));

        let handle = {
            let server = Arc::clone(&server);
            let routes = Arc::clone(&routes);
            thread::spawn(move || {
                while let Ok(mut request) = server.recv() {
                    let recorded = recorded_request(&mut request);
                    let response = lock(&routes).answer(recorded);
                    thread::spawn(move || respond(request, response));
                }
            })
        };

        Ok(Self {
            server,
            routes,
            base_url,
            handle: Some(handle),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn route(&self, path: &str, response: MockResponse) -> &Self {
        self.route_sequence(path, vec![response])
    }

    /// Answers successive requests to `path` in order.
    pub fn route_sequence(&self, path: &str, responses: Vec<MockResponse>) -> &Self {
        lock(&self.routes)
            .responses
            .insert(path.to_owned(), responses.into());
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.routes).requests.clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        lock(&self.routes)
            .requests
            .iter()
            .filter(|request| request.url == path)
            .count()
    }
}

impl Drop for MockBackend {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn recorded_request(request: &mut Request) -> RecordedRequest {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    RecordedRequest {
        method: request.method().to_string(),
        url: request.url().to_owned(),
        headers: request
            .headers()
            .iter()
            .map(|header| (header.field.to_string(), header.value.to_string()))
            .collect(),
        body,
    }
}

fn respond(request: Request, response: MockResponse) {
    if !response.delay.is_zero() {
        thread::sleep(response.delay);
    }
    let _ = request.respond(response.into_response());
}

fn lock(routes: &Mutex<Routes>) -> MutexGuard<'_, Routes> {
    match routes.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}
