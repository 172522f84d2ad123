//! HTTP/1.1 request handling for the benchmark endpoints.
//!
//! # Architecture
//!
//! - **`connection`**: the per-connection loop driving read, parse, dispatch, write and flush
//! - **`parser`**: resumable request-head parser working on the raw input buffer
//! - **`request`**: `Method`, `Route` and the stack-only `ParsedRequest`
//! - **`response`**: status codes, fixed bodies and pre-rendered header templates
//! - **`writer`**: appends complete responses to a connection's output buffer
//!
//! # Connection State Machine
//!
//! ```text
//!        ┌─────────────┐
//!   ┌──▶ │   Reading   │ ← wait for bytes (or shutdown)
//!   │    └──────┬──────┘
//!   │           ▼
//!   │    ┌─────────────┐  Partial, output empty → Reading
//!   │    │   Parsing   │  Partial, output pending → Flushing
//!   │    └──────┬──────┘  Error → Flushing/Closing
//!   │           ▼ Complete
//!   │    ┌─────────────┐
//!   │    │ Dispatching │ ← Route chosen by closed match
//!   │    └──────┬──────┘
//!   │           ▼
//!   │    ┌─────────────┐  keep-alive → Parsing (next pipelined request)
//!   │    │   Writing   │
//!   │    └──────┬──────┘  close → Flushing
//!   │           ▼
//!   │    ┌─────────────┐
//!   └─── │  Flushing   │ → Closing → Closed
//!        └─────────────┘
//! ```
//!
//! Pipelined requests that arrive in one read are all answered into the
//! output buffer before a single flush. A declared request body is skipped
//! in Parsing before the next head is read; a `Transfer-Encoding` body
//! cannot be skipped, so that response carries `Connection: close`.

pub mod connection;
pub mod parser;
pub mod request;
pub mod response;
pub mod writer;
