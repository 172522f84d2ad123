//! platbench - minimal HTTP/1.1 benchmark server
//!
//! Answers `/plaintext` and `/json` straight off the wire with pre-rendered
//! templates and a cached `Date` header.

pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod server;

/// Name printed at startup.
pub const APPLICATION_NAME: &str = "platbench";
