//! Access to the media-catalog server
//!
//! `client` speaks HTTP to the server; `query` holds the query-string helpers
//! used to build request URLs.

mod client;
pub mod query;

pub use client::{check_for_server_error, request_headers, ApiClient, ApiError};
