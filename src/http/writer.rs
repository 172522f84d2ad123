use bytes::{BufMut, BytesMut};

use crate::clock::ClockCache;
use crate::http::request::Route;
use crate::http::response::{
    CRLF, ConnectionHeader, JSON_HEAD, JsonMessage, NOT_FOUND_HEAD, PLAINTEXT_BODY,
    PLAINTEXT_HEAD, StatusCode,
};

/// Serializes responses into a connection's output buffer.
///
/// One writer per connection. The JSON scratch buffer is kept between
/// requests so steady-state writes do not allocate.
pub struct ResponseWriter {
    scratch: Vec<u8>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        Self {
            scratch: Vec::with_capacity(64),
        }
    }

    /// Appends the full response for `route` to `out`.
    ///
    /// `connection` must match what the caller does after this response:
    /// close on [`ConnectionHeader::Close`], stay open otherwise. Never
    /// flushes; the caller decides when `out` goes to the transport.
    pub fn write(
        &mut self,
        route: Route,
        connection: ConnectionHeader,
        clock: &ClockCache,
        out: &mut BytesMut,
    ) -> Result<StatusCode, serde_json::Error> {
        let date = clock.current();
        let connection = connection.line();

        match route {
            Route::Plaintext => {
                out.reserve(
                    PLAINTEXT_HEAD.len()
                        + connection.len()
                        + date.line().len()
                        + 2
                        + PLAINTEXT_BODY.len(),
                );
                out.put_slice(PLAINTEXT_HEAD);
                out.put_slice(connection);
                out.put_slice(date.line());
                out.put_slice(CRLF);
                out.put_slice(PLAINTEXT_BODY);
            }
            Route::Json => {
                self.scratch.clear();
                serde_json::to_writer(&mut self.scratch, &JsonMessage::hello())?;

                out.reserve(
                    JSON_HEAD.len()
                        + 24
                        + connection.len()
                        + date.line().len()
                        + self.scratch.len(),
                );
                out.put_slice(JSON_HEAD);
                put_decimal(out, self.scratch.len());
                out.put_slice(CRLF);
                out.put_slice(connection);
                out.put_slice(date.line());
                out.put_slice(CRLF);
                out.put_slice(&self.scratch);
            }
            Route::Unknown => {
                out.reserve(NOT_FOUND_HEAD.len() + connection.len() + date.line().len() + 2);
                out.put_slice(NOT_FOUND_HEAD);
                out.put_slice(connection);
                out.put_slice(date.line());
                out.put_slice(CRLF);
            }
        }

        Ok(StatusCode::for_route(route))
    }
}

impl Default for ResponseWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Writes `n` in decimal without going through `fmt`.
fn put_decimal(out: &mut BytesMut, mut n: usize) {
    let mut digits = [0u8; 20];
    let mut pos = digits.len();
    loop {
        pos -= 1;
        digits[pos] = b'0' + (n % 10) as u8;
        n /= 10;
        if n == 0 {
            break;
        }
    }
    out.put_slice(&digits[pos..]);
}
