//! Helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use platbench::clock::ClockCache;
use platbench::config::ConnectionConfig;
use platbench::http::connection::Connection;
use tokio::io::{AsyncReadExt, DuplexStream};
use tokio::sync::watch;

/// One response split out of a byte stream.
#[derive(Debug)]
pub struct RawResponse {
    pub status_line: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn content_length(&self) -> usize {
        self.header("Content-Length").unwrap().parse().unwrap()
    }
}

/// Splits as many complete responses as `bytes` holds, using Content-Length.
pub fn parse_responses(mut bytes: &[u8]) -> Vec<RawResponse> {
    let mut out = Vec::new();

    while let Some(head_end) = bytes.windows(4).position(|w| w == b"\r\n\r\n") {
        let head = std::str::from_utf8(&bytes[..head_end]).unwrap();
        let mut lines = head.split("\r\n");
        let status_line = lines.next().unwrap().to_string();
        let headers: Vec<(String, String)> = lines
            .map(|line| {
                let (k, v) = line.split_once(':').unwrap();
                (k.trim().to_string(), v.trim().to_string())
            })
            .collect();

        let len: usize = headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case("Content-Length"))
            .map(|(_, v)| v.parse().unwrap())
            .unwrap_or(0);
        let body_start = head_end + 4;
        if bytes.len() < body_start + len {
            break;
        }

        out.push(RawResponse {
            status_line,
            headers,
            body: bytes[body_start..body_start + len].to_vec(),
        });
        bytes = &bytes[body_start + len..];
    }

    out
}

/// Reads from `stream` until `n` complete responses have arrived.
pub async fn read_responses(stream: &mut DuplexStream, n: usize) -> Vec<RawResponse> {
    let mut buf = Vec::new();
    loop {
        let responses = parse_responses(&buf);
        if responses.len() >= n {
            return responses;
        }
        let mut chunk = [0u8; 4096];
        let read = stream.read(&mut chunk).await.unwrap();
        assert!(read > 0, "stream closed after {} responses", responses.len());
        buf.extend_from_slice(&chunk[..read]);
    }
}

/// A connection over an in-memory pipe plus the client end.
pub struct Harness {
    pub client: DuplexStream,
    pub conn: Connection<DuplexStream>,
    pub shutdown: watch::Sender<bool>,
}

pub fn harness() -> Harness {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let (shutdown, shutdown_rx) = watch::channel(false);
    let conn = Connection::new(
        server,
        Arc::new(ClockCache::new()),
        shutdown_rx,
        &ConnectionConfig::default(),
    );
    Harness {
        client,
        conn,
        shutdown,
    }
}
