//! Backend API: typed payloads, the request client and its transports.

pub mod client;
pub mod stub;
pub mod types;

pub use client::{
    ApiClient, ApiRequest, Body, HttpTransport, Method, MultipartForm, RawResponse, RequestError,
    Transport,
};
pub use stub::StubTransport;
pub use types::*;
