//! Transport capability and the default `ureq` implementation.
//!
//! # Design
//! A transport turns an `HttpRequest` into an `HttpResponse` or a
//! `TransportError`. It has two call styles: `execute` blocks the calling
//! thread, `enqueue` returns immediately and hands the result to a one-shot
//! completion on a worker the transport owns. Non-2xx statuses are responses,
//! not errors.

use std::sync::{Arc, Mutex};
use std::thread;

use crate::config::ClientConfig;
use crate::error::TransportError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Receives the result of an enqueued call. Invoked exactly once.
pub type Completion = Box<dyn FnOnce(Result<HttpResponse, TransportError>) + Send + 'static>;

pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;

    fn enqueue(&self, request: HttpRequest, completion: Completion);
}

/// Blocking HTTP transport backed by a shared `ureq::Agent`.
#[derive(Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build an agent with the configured timeouts. The read timeout bounds
    /// both waiting for the response head and reading the body.
    pub fn new(config: &ClientConfig) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_connect(Some(config.connect_timeout))
            .timeout_recv_response(Some(config.read_timeout))
            .timeout_recv_body(Some(config.read_timeout))
            .build()
            .new_agent();
        Self { agent }
    }

    pub fn from_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

impl Transport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        send(&self.agent, request)
    }

    fn enqueue(&self, request: HttpRequest, completion: Completion) {
        let agent = self.agent.clone();
        let slot = Arc::new(Mutex::new(Some(completion)));
        let worker_slot = Arc::clone(&slot);

        let spawned = thread::Builder::new()
            .name("apiworker-call".to_string())
            .spawn(move || {
                let result = send(&agent, &request);
                if let Some(done) = take(&worker_slot) {
                    done(result);
                }
            });

        if let Err(e) = spawned {
            tracing::warn!(target: "apiworker", error = %e, "failed to spawn call worker");
            if let Some(done) = take(&slot) {
                done(Err(e.into()));
            }
        }
    }
}

/// Transport for clients whose host performs HTTP itself. Every call fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTransport;

impl NoTransport {
    fn refuse() -> Result<HttpResponse, TransportError> {
        Err(TransportError::Io("no transport configured".to_string()))
    }
}

impl Transport for NoTransport {
    fn execute(&self, _request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        Self::refuse()
    }

    fn enqueue(&self, _request: HttpRequest, completion: Completion) {
        completion(Self::refuse());
    }
}

fn take(slot: &Mutex<Option<Completion>>) -> Option<Completion> {
    slot.lock().ok().and_then(|mut guard| guard.take())
}

fn send(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
    let result = match request.method {
        HttpMethod::Get => {
            let mut builder = agent.get(request.url.as_str());
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            builder.call()
        }
        HttpMethod::Post => {
            let mut builder = agent.post(request.url.as_str());
            for (key, value) in &request.headers {
                builder = builder.header(key.as_str(), value.as_str());
            }
            match &request.body {
                Some(body) => builder.send(body.as_bytes()),
                None => builder.send_empty(),
            }
        }
    };

    let mut response = result.map_err(TransportError::from)?;
    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or_default().to_string()))
        .collect();
    // Response size is bounded by the read timeout, not by a byte limit.
    // An unreadable body counts as no body at all.
    let body = match response.body_mut().with_config().limit(u64::MAX).read_to_string() {
        Ok(body) => Some(body),
        Err(e) => {
            tracing::warn!(target: "apiworker", status, error = %e, "failed to read response body");
            None
        }
    };

    Ok(HttpResponse {
        status,
        headers,
        body,
    })
}

impl From<ureq::Error> for TransportError {
    fn from(err: ureq::Error) -> Self {
        match &err {
            ureq::Error::Timeout(_) => Self::Timeout(err.to_string()),
            ureq::Error::ConnectionFailed | ureq::Error::HostNotFound => {
                Self::Connect(err.to_string())
            }
            _ => Self::Io(err.to_string()),
        }
    }
}
