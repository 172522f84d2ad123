//! Resumable HTTP/1.1 request-head parser.
//!
//! The parser works directly on the connection's input buffer. When the
//! buffer ends mid-request it returns [`ParseStatus::Partial`] and remembers
//! where it stopped; the next call must pass the same bytes with more
//! appended, and scanning continues from the saved cursor.
//!
//! Headers are read shallowly: only `Connection`, `Content-Length` and
//! `Transfer-Encoding` are looked at, everything else is stepped over. This
//! is enough for a benchmark load generator and not meant for arbitrary
//! clients. The parser never consumes a body; it reports the declared
//! length so the caller can discard it.

use crate::error::ParseError;
use crate::http::request::{Method, ParsedRequest, Route};

/// Longest accepted request line, CRLF excluded.
pub const MAX_REQUEST_LINE: usize = 8 * 1024;
/// Longest accepted single header line.
pub const MAX_HEADER_LINE: usize = 8 * 1024;
/// Longest accepted request head, request line through the blank line.
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Where the parser is within the current request head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseState {
    AwaitingRequestLine,
    ParsingMethod,
    ParsingPath,
    ParsingVersion,
    AwaitingHeaders,
    ParsingHeaderLine,
    Complete,
    Error(ParseError),
}

/// Outcome of one [`RequestParser::parse`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStatus {
    /// A full head was parsed; `consumed` bytes belong to it.
    Complete {
        request: ParsedRequest,
        consumed: usize,
    },
    /// The buffer ended mid-request; call again with more bytes.
    Partial,
}

#[derive(Debug, Clone)]
pub struct RequestParser {
    state: ParseState,
    /// Next byte to examine.
    cursor: usize,
    /// Start of the token or header line being scanned.
    token_start: usize,
    /// Start of the request line, after any leading empty lines.
    line_start: usize,
    method: Method,
    route: Route,
    http10: bool,
    connection_close: bool,
    connection_keep_alive: bool,
    content_length: Option<u64>,
    /// `Transfer-Encoding` was sent; the body length is unknown.
    unframed_body: bool,
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParseState::AwaitingRequestLine,
            cursor: 0,
            token_start: 0,
            line_start: 0,
            method: Method::Other,
            route: Route::Unknown,
            http10: false,
            connection_close: false,
            connection_keep_alive: false,
            content_length: None,
            unframed_body: false,
        }
    }

    /// Current state, for inspection.
    pub fn state(&self) -> ParseState {
        self.state
    }

    /// Forgets all progress, including a previous error.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Advances over `buf`.
    ///
    /// `buf` must start at the first byte of the current request and must
    /// extend whatever was passed on the previous `Partial` call. After
    /// `Complete` the parser is reset and expects the next request at the
    /// start of the buffer the caller passes next.
    pub fn parse(&mut self, buf: &[u8]) -> Result<ParseStatus, ParseError> {
        loop {
            match self.state {
                ParseState::Error(e) => return Err(e),

                ParseState::Complete => self.reset(),

                ParseState::AwaitingRequestLine => {
                    while self.cursor < buf.len() && matches!(buf[self.cursor], b'\r' | b'\n') {
                        self.cursor += 1;
                    }
                    if self.cursor > MAX_REQUEST_LINE {
                        return self.fail(ParseError::TooLarge);
                    }
                    if self.cursor == buf.len() {
                        return Ok(ParseStatus::Partial);
                    }
                    self.line_start = self.cursor;
                    self.token_start = self.cursor;
                    self.state = ParseState::ParsingMethod;
                }

                ParseState::ParsingMethod => match self.scan_token(buf) {
                    None => return self.need_more_request_line(),
                    Some(b' ') if self.cursor > self.token_start => {
                        self.method = Method::from_bytes(&buf[self.token_start..self.cursor]);
                        self.begin_next_token();
                        self.state = ParseState::ParsingPath;
                    }
                    Some(_) => return self.fail(ParseError::Malformed),
                },

                ParseState::ParsingPath => match self.scan_token(buf) {
                    None => return self.need_more_request_line(),
                    Some(b' ') if self.cursor > self.token_start => {
                        self.route = Route::from_path(&buf[self.token_start..self.cursor]);
                        self.begin_next_token();
                        self.state = ParseState::ParsingVersion;
                    }
                    Some(_) => return self.fail(ParseError::Malformed),
                },

                ParseState::ParsingVersion => match self.scan_token(buf) {
                    None => return self.need_more_request_line(),
                    Some(b'\r') if self.cursor > self.token_start => {
                        if self.cursor - self.line_start > MAX_REQUEST_LINE {
                            return self.fail(ParseError::TooLarge);
                        }
                        if self.cursor + 1 == buf.len() {
                            return Ok(ParseStatus::Partial);
                        }
                        if buf[self.cursor + 1] != b'\n' {
                            return self.fail(ParseError::Malformed);
                        }
                        match &buf[self.token_start..self.cursor] {
                            b"HTTP/1.1" => self.http10 = false,
                            b"HTTP/1.0" => self.http10 = true,
                            _ => return self.fail(ParseError::UnsupportedVersion),
                        }
                        self.cursor += 2;
                        self.state = ParseState::AwaitingHeaders;
                    }
                    Some(_) => return self.fail(ParseError::Malformed),
                },

                ParseState::AwaitingHeaders => {
                    if self.cursor == buf.len() {
                        return Ok(ParseStatus::Partial);
                    }
                    if buf[self.cursor] != b'\r' {
                        self.token_start = self.cursor;
                        self.state = ParseState::ParsingHeaderLine;
                        continue;
                    }
                    if self.cursor + 1 == buf.len() {
                        return Ok(ParseStatus::Partial);
                    }
                    if buf[self.cursor + 1] != b'\n' {
                        return self.fail(ParseError::Malformed);
                    }

                    let consumed = self.cursor + 2;
                    let request = self.finish();
                    self.state = ParseState::Complete;
                    return Ok(ParseStatus::Complete { request, consumed });
                }

                ParseState::ParsingHeaderLine => {
                    let Some(offset) = buf[self.cursor..].iter().position(|&b| b == b'\n') else {
                        self.cursor = buf.len();
                        return self.need_more_header_line();
                    };
                    let lf = self.cursor + offset;
                    if buf[lf - 1] != b'\r' || lf - 1 == self.token_start {
                        return self.fail(ParseError::Malformed);
                    }

                    self.cursor = lf;
                    if let Err(e) = self.check_header_bounds() {
                        return self.fail(e);
                    }
                    if let Err(e) = self.inspect_header(&buf[self.token_start..lf - 1]) {
                        return self.fail(e);
                    }
                    self.cursor = lf + 1;
                    self.state = ParseState::AwaitingHeaders;
                }
            }
        }
    }

    /// Advances the cursor over visible ASCII and returns the byte that
    /// stopped it, or `None` if the buffer ran out.
    #[inline]
    fn scan_token(&mut self, buf: &[u8]) -> Option<u8> {
        while self.cursor < buf.len() {
            let b = buf[self.cursor];
            if b <= b' ' || b == 0x7f {
                return Some(b);
            }
            self.cursor += 1;
        }
        None
    }

    fn begin_next_token(&mut self) {
        self.cursor += 1;
        self.token_start = self.cursor;
    }

    fn need_more_request_line(&mut self) -> Result<ParseStatus, ParseError> {
        if self.cursor - self.line_start > MAX_REQUEST_LINE {
            return self.fail(ParseError::TooLarge);
        }
        Ok(ParseStatus::Partial)
    }

    fn need_more_header_line(&mut self) -> Result<ParseStatus, ParseError> {
        match self.check_header_bounds() {
            Ok(()) => Ok(ParseStatus::Partial),
            Err(e) => self.fail(e),
        }
    }

    fn check_header_bounds(&self) -> Result<(), ParseError> {
        if self.cursor - self.token_start > MAX_HEADER_LINE
            || self.cursor - self.line_start > MAX_HEAD_SIZE
        {
            return Err(ParseError::TooLarge);
        }
        Ok(())
    }

    fn inspect_header(&mut self, line: &[u8]) -> Result<(), ParseError> {
        let Some(colon) = line.iter().position(|&b| b == b':') else {
            return Ok(());
        };
        let (name, value) = (&line[..colon], line[colon + 1..].trim_ascii());

        if name.eq_ignore_ascii_case(b"connection") {
            for option in value.split(|&b| b == b',') {
                let option = option.trim_ascii();
                if option.eq_ignore_ascii_case(b"close") {
                    self.connection_close = true;
                } else if option.eq_ignore_ascii_case(b"keep-alive") {
                    self.connection_keep_alive = true;
                }
            }
        } else if name.eq_ignore_ascii_case(b"content-length") {
            let len = parse_content_length(value).ok_or(ParseError::Malformed)?;
            // Repeats are tolerated only when they agree.
            if self.content_length.is_some_and(|prev| prev != len) {
                return Err(ParseError::Malformed);
            }
            self.content_length = Some(len);
        } else if name.eq_ignore_ascii_case(b"transfer-encoding") {
            self.unframed_body = true;
        }
        Ok(())
    }

    fn finish(&self) -> ParsedRequest {
        // A body we cannot frame leaves the stream position unknown, so the
        // connection cannot be reused.
        let keep_alive = if self.connection_close || self.unframed_body {
            false
        } else if self.http10 {
            self.connection_keep_alive
        } else {
            true
        };

        ParsedRequest {
            method: self.method,
            route: self.route,
            keep_alive,
            http10: self.http10,
            content_length: if self.unframed_body {
                0
            } else {
                self.content_length.unwrap_or(0)
            },
        }
    }

    fn fail(&mut self, error: ParseError) -> Result<ParseStatus, ParseError> {
        self.state = ParseState::Error(error);
        Err(error)
    }
}

/// Decimal digits only; no sign, no whitespace, no overflow.
fn parse_content_length(value: &[u8]) -> Option<u64> {
    if value.is_empty() {
        return None;
    }
    value.iter().try_fold(0u64, |n, &b| {
        if !b.is_ascii_digit() {
            return None;
        }
        n.checked_mul(10)?.checked_add(u64::from(b - b'0'))
    })
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}
