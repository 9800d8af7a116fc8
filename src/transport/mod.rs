//! Transports exposing the background service
//!
//! - HTTP: JSON messages, tab navigation reports and an SSE push stream
//! - Stdio: newline-delimited URLs driving an in-process watcher

#[cfg(feature = "http_transport")]
pub mod http;

pub mod stdio;
