//! catalog-cache library
//!
//! Exposes the response cache, the catalog API client and the CLI model for
//! use by the binary and integration tests.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod fetch;
pub mod title;
