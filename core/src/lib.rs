//! Typed JSON API client for mobile hosts.
//!
//! # Overview
//! Sends GET and POST requests, short-circuits while the device is offline,
//! and decodes every result into one response envelope of the caller's
//! chosen shape. A call never fails with a Rust error: offline, transport
//! faults, missing or malformed bodies and server-reported errors all arrive
//! as an `ApiError` inside the envelope.
//!
//! # Design
//! - `ApiRequest` builds the `{"params": .., "store_params": ..}` body.
//! - `ApiClient` runs connectivity check, transport call, classification and
//!   delivery, in blocking (`get`, `post`) or callback (`get_with`,
//!   `post_with`) style.
//! - `Transport` and `Connectivity` are capabilities the host can replace;
//!   `UreqTransport` is the default transport.
//! - `prepare_*` / `finish` expose the same pipeline to hosts that execute
//!   HTTP themselves.

pub mod client;
pub mod config;
pub mod connectivity;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod request;
pub mod transport;
pub mod types;

pub use client::{ApiClient, Prepared, ResponseObserver};
pub use config::ClientConfig;
pub use connectivity::{AlwaysOnline, Connectivity, ConnectivityFlag};
pub use dispatch::{ErrorTexts, Outcome};
pub use error::{ApiError, ErrorKind, TransportError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use request::{ApiRequest, Params, RequestInit};
pub use transport::{Completion, NoTransport, Transport, UreqTransport};
pub use types::{ApiResponse, Envelope};
