//! Request dispatch: connectivity check, transport call, classification,
//! delivery.
//!
//! # Design
//! `ApiClient` is immutable after construction and cheap to clone; every
//! collaborator sits behind an `Arc`. Each call goes through the same
//! pipeline regardless of method or call style:
//!
//! 1. `prepare_*` checks connectivity. Offline calls are finished right
//!    there with a `NO_CONNECTION` envelope and never reach a transport.
//! 2. The transport executes the `HttpRequest` (blocking) or enqueues it
//!    (callback on the transport's worker).
//! 3. `classify` maps the result to an `Outcome`, `deliver` turns that into
//!    the caller's `T`, passing it through the observer first.
//!
//! Hosts that perform their own I/O can drive steps 1 and 3 directly.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::connectivity::Connectivity;
use crate::dispatch::{ErrorTexts, Outcome};
use crate::error::TransportError;
use crate::http::{HttpRequest, HttpResponse};
use crate::request::{ApiRequest, RequestInit};
use crate::transport::{NoTransport, Transport, UreqTransport};
use crate::types::{ApiResponse, Envelope};

/// Sees every response the client delivers, successful or not.
pub trait ResponseObserver: Send + Sync {
    fn on_response(&self, response: &ApiResponse);
}

impl<F> ResponseObserver for F
where
    F: Fn(&ApiResponse) + Send + Sync,
{
    fn on_response(&self, response: &ApiResponse) {
        self(response)
    }
}

/// Result of preparing a call.
#[derive(Debug)]
pub enum Prepared<T> {
    /// Online: send this request, then pass the result to `ApiClient::finish`.
    Send(HttpRequest),
    /// Already finished and delivered to the observer.
    Done(T),
}

#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
    connectivity: Arc<dyn Connectivity>,
    request_init: Option<Arc<dyn RequestInit>>,
    delivery: Delivery,
}

impl ApiClient {
    /// Create a client using the default `UreqTransport` built from `config`.
    pub fn new(config: ClientConfig, connectivity: impl Connectivity + 'static) -> Self {
        let transport = UreqTransport::new(&config);
        Self::with_parts(config, Arc::new(transport), Arc::new(connectivity))
    }

    /// Create a client for a host that executes HTTP itself through
    /// `prepare_*` and `finish`. No HTTP agent is built; calls that would
    /// need one finish as transport faults.
    pub fn host_driven(config: ClientConfig, connectivity: impl Connectivity + 'static) -> Self {
        Self::with_parts(config, Arc::new(NoTransport), Arc::new(connectivity))
    }

    fn with_parts(
        config: ClientConfig,
        transport: Arc<dyn Transport>,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self {
        let delivery = Delivery {
            texts: ErrorTexts::from(&config),
            observer: None,
            logging: config.logging,
        };
        Self {
            config,
            transport,
            connectivity,
            request_init: None,
            delivery,
        }
    }

    /// Replace the default transport.
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Arc::new(transport);
        self
    }

    pub fn with_observer(mut self, observer: impl ResponseObserver + 'static) -> Self {
        self.delivery.observer = Some(Arc::new(observer));
        self
    }

    /// Hook applied to every request created by `request()`.
    pub fn with_request_init(mut self, init: impl RequestInit + 'static) -> Self {
        self.request_init = Some(Arc::new(init));
        self
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// A new request body, pre-populated by the configured init hook.
    pub fn request(&self) -> ApiRequest {
        match &self.request_init {
            Some(init) => ApiRequest::with_init(init.as_ref()),
            None => ApiRequest::new(),
        }
    }

    // --- blocking ---

    pub fn get<T: Envelope>(&self, url: &str) -> T {
        self.get_via(self.transport.as_ref(), url)
    }

    pub fn get_via<T: Envelope>(&self, transport: &dyn Transport, url: &str) -> T {
        self.call(transport, self.prepare_get(url))
    }

    pub fn post<T: Envelope>(&self, url: &str, request: &ApiRequest) -> T {
        self.post_via(self.transport.as_ref(), url, request)
    }

    pub fn post_via<T: Envelope>(
        &self,
        transport: &dyn Transport,
        url: &str,
        request: &ApiRequest,
    ) -> T {
        self.call(transport, self.prepare_post(url, request))
    }

    // --- callback ---

    /// Issue a GET and hand the response to `handler` exactly once.
    ///
    /// Online, `handler` runs on the transport's worker. Offline, it runs
    /// on the calling thread before this method returns.
    pub fn get_with<T, F>(&self, url: &str, handler: F)
    where
        T: Envelope,
        F: FnOnce(T) + Send + 'static,
    {
        self.get_with_via(self.transport.as_ref(), url, handler)
    }

    pub fn get_with_via<T, F>(&self, transport: &dyn Transport, url: &str, handler: F)
    where
        T: Envelope,
        F: FnOnce(T) + Send + 'static,
    {
        self.call_with(transport, self.prepare_get(url), handler)
    }

    pub fn post_with<T, F>(&self, url: &str, request: &ApiRequest, handler: F)
    where
        T: Envelope,
        F: FnOnce(T) + Send + 'static,
    {
        self.post_with_via(self.transport.as_ref(), url, request, handler)
    }

    pub fn post_with_via<T, F>(
        &self,
        transport: &dyn Transport,
        url: &str,
        request: &ApiRequest,
        handler: F,
    ) where
        T: Envelope,
        F: FnOnce(T) + Send + 'static,
    {
        self.call_with(transport, self.prepare_post(url, request), handler)
    }

    // --- host-does-IO ---

    pub fn prepare_get<T: Envelope>(&self, url: &str) -> Prepared<T> {
        self.prepare(|| HttpRequest::get(url))
    }

    pub fn prepare_post<T: Envelope>(&self, url: &str, request: &ApiRequest) -> Prepared<T> {
        self.prepare(|| HttpRequest::post(url, request))
    }

    pub fn classify<T: Envelope>(&self, result: Result<HttpResponse, TransportError>) -> Outcome<T> {
        self.delivery.classify(result)
    }

    pub fn deliver<T: Envelope>(&self, outcome: Outcome<T>) -> T {
        self.delivery.deliver(outcome)
    }

    /// Classify and deliver a transport result.
    pub fn finish<T: Envelope>(&self, result: Result<HttpResponse, TransportError>) -> T {
        self.delivery.finish(result)
    }

    fn prepare<T: Envelope>(&self, build: impl FnOnce() -> HttpRequest) -> Prepared<T> {
        if !self.is_online() {
            tracing::debug!(target: "apiworker", "offline, skipping transport");
            return Prepared::Done(self.deliver(Outcome::NoConnection));
        }
        let request = build();
        if self.config.logging {
            tracing::debug!(
                target: "apiworker::http",
                method = request.method.as_str(),
                url = %request.url,
                headers = ?request.headers,
                body = request.body.as_deref().unwrap_or(""),
                "--> request"
            );
        }
        Prepared::Send(request)
    }

    fn call<T: Envelope>(&self, transport: &dyn Transport, prepared: Prepared<T>) -> T {
        match prepared {
            Prepared::Done(response) => response,
            Prepared::Send(request) => self.finish(transport.execute(&request)),
        }
    }

    fn call_with<T, F>(&self, transport: &dyn Transport, prepared: Prepared<T>, handler: F)
    where
        T: Envelope,
        F: FnOnce(T) + Send + 'static,
    {
        match prepared {
            Prepared::Done(response) => handler(response),
            Prepared::Send(request) => {
                let delivery = self.delivery.clone();
                transport.enqueue(
                    request,
                    Box::new(move |result| handler(delivery.finish(result))),
                );
            }
        }
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("observer", &self.delivery.observer.is_some())
            .field("request_init", &self.request_init.is_some())
            .finish()
    }
}

/// The part of the client that travels to transport workers.
#[derive(Clone)]
struct Delivery {
    texts: ErrorTexts,
    observer: Option<Arc<dyn ResponseObserver>>,
    logging: bool,
}

impl Delivery {
    fn classify<T: Envelope>(&self, result: Result<HttpResponse, TransportError>) -> Outcome<T> {
        if self.logging {
            match &result {
                Ok(response) => tracing::debug!(
                    target: "apiworker::http",
                    status = response.status,
                    headers = ?response.headers,
                    body = response.body.as_deref().unwrap_or(""),
                    "<-- response"
                ),
                Err(e) => tracing::debug!(target: "apiworker::http", error = %e, "<-- failed"),
            }
        }
        if let Err(e) = &result {
            tracing::warn!(target: "apiworker", error = %e, "transport fault");
        }
        Outcome::classify(result)
    }

    fn deliver<T: Envelope>(&self, outcome: Outcome<T>) -> T {
        let response = outcome.into_response(&self.texts);
        if let Some(observer) = &self.observer {
            observer.on_response(response.envelope());
        }
        response
    }

    fn finish<T: Envelope>(&self, result: Result<HttpResponse, TransportError>) -> T {
        let outcome = self.classify(result);
        self.deliver(outcome)
    }
}
