//! Request proxy
//!
//! Generic HTTP relay for UI surfaces that cannot reach the analytics API
//! directly.

pub mod client;
pub mod transport;
pub mod types;

pub use client::{backoff_delay, build_url, ApiProxy};
pub use transport::{HttpTransport, ReqwestTransport};
pub use types::{OutgoingRequest, ProxyRequest, ProxyResponse, RawResponse};
