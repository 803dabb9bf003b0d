//! Blocking API client core for the Neutrino backend.
//!
//! # Overview
//! Turns typed method calls into authenticated HTTP requests and decodes the
//! JSON responses into generic records. A request passes through four
//! stages: options encoding, request building, dispatch over a `Transport`,
//! and shape-directed decoding.
//!
//! # Design
//! - `ClientRegistry` is created by the application and hands out one shared
//!   `NeutrinoClient` per application id.
//! - Building (`NeutrinoClient::build_*`) never touches the network; only the
//!   `Transport` does I/O, so the rest of the pipeline is deterministic.
//! - Endpoints are rows in a table (`Endpoint::route`), not one bespoke
//!   request function each.
//! - Results are `Payload` values; fields are read through accessors that
//!   return `ApiError::Field` rather than panicking.

pub mod client;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod options;
pub mod record;
pub mod registry;
pub mod response;
pub mod transport;

pub use client::NeutrinoClient;
pub use config::ClientConfig;
pub use endpoint::{Endpoint, PathParams, Route};
pub use error::{ApiError, ApiResult};
pub use http::{HttpMethod, HttpRequest, HttpResponse, OPTIONS_HEADER};
pub use options::RequestOptions;
pub use record::{Payload, Record, Shape};
pub use registry::ClientRegistry;
pub use response::{decode, parse_response};
pub use transport::{Transport, UreqTransport};
