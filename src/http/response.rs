use serde::{Deserialize, Serialize};

use crate::http::request::{ParsedRequest, Route};

macro_rules! server_name {
    () => {
        "platbench"
    };
}

/// Body of every plaintext response.
pub const PLAINTEXT_BODY: &[u8] = b"Hello, World!";

/// Message carried in the JSON response.
pub const JSON_MESSAGE: &str = "Hello, World!";

/// Value of the `Server` header on every response.
pub const SERVER_NAME: &str = server_name!();

/// HTTP status codes this server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 404 Not Found
    NotFound,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use platbench::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::NotFound.as_u16(), 404);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::NotFound => 404,
        }
    }

    /// Status answered for a route.
    pub fn for_route(route: Route) -> Self {
        match route {
            Route::Plaintext | Route::Json => StatusCode::Ok,
            Route::Unknown => StatusCode::NotFound,
        }
    }
}

/// What a response says about the connection after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionHeader {
    /// HTTP/1.1 keep-alive; persistence is the default, no header is sent.
    Implicit,
    /// `Connection: keep-alive`, for HTTP/1.0 clients that asked for it.
    KeepAlive,
    /// `Connection: close`; the server closes after this response.
    Close,
}

impl ConnectionHeader {
    pub fn for_request(request: &ParsedRequest) -> Self {
        match (request.keep_alive, request.http10) {
            (false, _) => ConnectionHeader::Close,
            (true, true) => ConnectionHeader::KeepAlive,
            (true, false) => ConnectionHeader::Implicit,
        }
    }

    /// Whether the connection stays open after the response.
    pub fn keeps_alive(self) -> bool {
        self != ConnectionHeader::Close
    }

    pub(crate) fn line(self) -> &'static [u8] {
        match self {
            ConnectionHeader::Implicit => b"",
            ConnectionHeader::KeepAlive => CONNECTION_KEEP_ALIVE,
            ConnectionHeader::Close => CONNECTION_CLOSE,
        }
    }
}

/// The fixed-shape record served on `/json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonMessage<'a> {
    pub message: &'a str,
}

impl JsonMessage<'static> {
    pub fn hello() -> Self {
        Self {
            message: JSON_MESSAGE,
        }
    }
}

// Header templates. Everything up to the Connection and Date lines is known
// ahead of time, so it is copied in one piece; those two lines and the blank
// line follow.

pub(crate) const PLAINTEXT_HEAD: &[u8] = concat!(
    "HTTP/1.1 200 OK\r\n",
    "Content-Type: text/plain\r\n",
    "Server: ",
    server_name!(),
    "\r\n",
    "Content-Length: 13\r\n",
)
.as_bytes();

/// Followed by the decimal body length and CRLF.
pub(crate) const JSON_HEAD: &[u8] = concat!(
    "HTTP/1.1 200 OK\r\n",
    "Content-Type: application/json\r\n",
    "Server: ",
    server_name!(),
    "\r\n",
    "Content-Length: ",
)
.as_bytes();

pub(crate) const NOT_FOUND_HEAD: &[u8] = concat!(
    "HTTP/1.1 404 Not Found\r\n",
    "Server: ",
    server_name!(),
    "\r\n",
    "Content-Length: 0\r\n",
)
.as_bytes();

const CONNECTION_KEEP_ALIVE: &[u8] = b"Connection: keep-alive\r\n";
const CONNECTION_CLOSE: &[u8] = b"Connection: close\r\n";

pub(crate) const CRLF: &[u8] = b"\r\n";
