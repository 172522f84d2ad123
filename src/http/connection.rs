use std::sync::Arc;

use bytes::{Buf, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;
use tracing::{debug, trace};

use crate::clock::ClockCache;
use crate::config::ConnectionConfig;
use crate::error::{ConnectionError, ParseError};
use crate::http::parser::{ParseStatus, RequestParser};
use crate::http::request::{ParsedRequest, Route};
use crate::http::response::ConnectionHeader;
use crate::http::writer::ResponseWriter;

/// One accepted connection, driven from accept to close.
///
/// Generic over the transport so tests can use an in-memory duplex pipe.
pub struct Connection<S> {
    stream: S,
    input: BytesMut,
    output: BytesMut,
    read_chunk: usize,
    parser: RequestParser,
    writer: ResponseWriter,
    clock: Arc<ClockCache>,
    shutdown: watch::Receiver<bool>,
    state: ConnectionState,
    requests_served: u64,
    /// Body bytes of the last request still to be discarded.
    body_remaining: u64,
    failure: Option<ParseError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Reading,
    Parsing,
    Dispatching(ParsedRequest),
    Writing {
        route: Route,
        connection: ConnectionHeader,
    },
    Flushing { close_after: bool },
    Closing,
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(
        stream: S,
        clock: Arc<ClockCache>,
        shutdown: watch::Receiver<bool>,
        config: &ConnectionConfig,
    ) -> Self {
        Self {
            stream,
            input: BytesMut::with_capacity(config.read_buffer_size),
            output: BytesMut::with_capacity(config.write_buffer_size),
            read_chunk: config.read_buffer_size,
            parser: RequestParser::new(),
            writer: ResponseWriter::new(),
            clock,
            shutdown,
            state: ConnectionState::Reading,
            requests_served: 0,
            body_remaining: 0,
            failure: None,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn requests_served(&self) -> u64 {
        self.requests_served
    }

    /// Runs the loop until the connection is closed.
    ///
    /// A rejected request still closes the connection cleanly but is
    /// reported as [`ConnectionError::Parse`].
    pub async fn run(&mut self) -> Result<(), ConnectionError> {
        while self.state != ConnectionState::Closed {
            self.step().await?;
        }

        match self.failure.take() {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Performs exactly one state transition.
    pub async fn step(&mut self) -> Result<(), ConnectionError> {
        match self.state {
            ConnectionState::Reading => {
                if *self.shutdown.borrow() {
                    self.state = ConnectionState::Closing;
                    return Ok(());
                }

                // Reclaims the space of already-consumed requests when it can.
                self.input.reserve(self.read_chunk);

                let read = tokio::select! {
                    res = self.stream.read_buf(&mut self.input) => Ok(res),
                    changed = self.shutdown.changed() => Err(changed.is_err()),
                };

                match read {
                    // Only `true` or a dropped sender means shut down; any
                    // other change leaves the connection reading.
                    Err(sender_gone) => {
                        if sender_gone || *self.shutdown.borrow() {
                            debug!("Closing idle connection on shutdown");
                            self.state = ConnectionState::Closing;
                        }
                    }
                    Ok(Ok(0)) => {
                        trace!(unparsed = self.input.len(), "Peer closed connection");
                        self.state = ConnectionState::Closing;
                    }
                    Ok(Ok(n)) => {
                        trace!(bytes = n, "Read");
                        self.state = ConnectionState::Parsing;
                    }
                    Ok(Err(e)) => {
                        self.state = ConnectionState::Closed;
                        return Err(e.into());
                    }
                }
            }

            ConnectionState::Parsing => {
                if !self.discard_body() {
                    self.await_more_input();
                    return Ok(());
                }

                match self.parser.parse(&self.input) {
                    Ok(ParseStatus::Complete { request, consumed }) => {
                        self.input.advance(consumed);
                        self.body_remaining = request.content_length;
                        self.state = ConnectionState::Dispatching(request);
                    }
                    Ok(ParseStatus::Partial) => self.await_more_input(),
                    Err(e) => {
                        debug!(error = %e, "Rejecting request");
                        self.failure = Some(e);
                        self.state = if self.output.is_empty() {
                            ConnectionState::Closing
                        } else {
                            ConnectionState::Flushing { close_after: true }
                        };
                    }
                }
            }

            ConnectionState::Dispatching(request) => {
                self.state = ConnectionState::Writing {
                    route: request.dispatch_route(),
                    connection: ConnectionHeader::for_request(&request),
                };
            }

            ConnectionState::Writing { route, connection } => {
                let written = self
                    .writer
                    .write(route, connection, &self.clock, &mut self.output);
                let status = match written {
                    Ok(status) => status,
                    Err(e) => {
                        self.state = ConnectionState::Closed;
                        return Err(e.into());
                    }
                };
                self.requests_served += 1;
                let keep_alive = connection.keeps_alive();
                trace!(?route, status = status.as_u16(), keep_alive, "Response written");

                self.state = if keep_alive {
                    ConnectionState::Parsing
                } else {
                    ConnectionState::Flushing { close_after: true }
                };
            }

            ConnectionState::Flushing { close_after } => {
                if let Err(e) = self.flush_output().await {
                    self.state = ConnectionState::Closed;
                    return Err(e.into());
                }

                self.state = if close_after {
                    ConnectionState::Closing
                } else {
                    ConnectionState::Reading
                };
            }

            ConnectionState::Closing => {
                // Best effort; the peer may already be gone.
                let _ = self.stream.shutdown().await;
                debug!(requests = self.requests_served, "Connection closed");
                self.state = ConnectionState::Closed;
            }

            ConnectionState::Closed => {}
        }

        Ok(())
    }

    /// Drops buffered body bytes of the previous request. Returns `false`
    /// while part of the body has not arrived yet.
    fn discard_body(&mut self) -> bool {
        if self.body_remaining == 0 {
            return true;
        }
        let skip = usize::try_from(self.body_remaining)
            .map_or(self.input.len(), |remaining| remaining.min(self.input.len()));
        self.input.advance(skip);
        self.body_remaining -= skip as u64;
        trace!(skipped = skip, remaining = self.body_remaining, "Discarded request body");
        self.body_remaining == 0
    }

    /// Everything buffered has been answered; flush the batch before
    /// waiting for more.
    fn await_more_input(&mut self) {
        self.state = if self.output.is_empty() {
            ConnectionState::Reading
        } else {
            ConnectionState::Flushing { close_after: false }
        };
    }

    async fn flush_output(&mut self) -> std::io::Result<()> {
        self.stream.write_all(&self.output).await?;
        self.stream.flush().await?;
        trace!(bytes = self.output.len(), "Flushed");
        self.output.clear();
        Ok(())
    }
}
