//! Remote wiki access
//!
//! This module contains everything that talks to or interprets the remote
//! wiki:
//! - HTTP client construction and request URL layout
//! - Error classification for transport failures
//! - Document parsers turning fetched markup into typed records

mod client;
mod parser;

pub use client::{build_http_client, SourceClient};
pub use parser::{DocumentParser, WikiParser};

pub(crate) use client::send_get;
