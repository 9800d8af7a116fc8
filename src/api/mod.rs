//! Analytics API client
//!
//! Token handling and the report endpoints used by the popup.

pub mod auth;
pub mod report;

pub use auth::{is_auth_request, TokenStore, DEFAULT_LANGUAGE, SUPPORTED_LANGUAGES};
pub use report::{ReportClient, ReportOutcome};
