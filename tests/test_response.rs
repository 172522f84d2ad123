mod common;

use bytes::BytesMut;
use common::parse_responses;
use platbench::clock::ClockCache;
use platbench::http::request::Route;
use platbench::http::response::{
    ConnectionHeader, JSON_MESSAGE, JsonMessage, PLAINTEXT_BODY, StatusCode,
};
use platbench::http::writer::ResponseWriter;

fn render(route: Route, clock: &ClockCache) -> (StatusCode, BytesMut) {
    let mut out = BytesMut::new();
    let status = ResponseWriter::new()
        .write(route, ConnectionHeader::Implicit, clock, &mut out)
        .unwrap();
    (status, out)
}

#[test]
fn test_plaintext_response() {
    let clock = ClockCache::new();
    let (status, out) = render(Route::Plaintext, &clock);

    assert_eq!(status, StatusCode::Ok);
    assert!(out.starts_with(b"HTTP/1.1 200 OK\r\n"));
    assert!(out.ends_with(b"\r\n\r\nHello, World!"));

    let responses = parse_responses(&out);
    assert_eq!(responses.len(), 1);
    let resp = &responses[0];
    assert_eq!(resp.header("Content-Type"), Some("text/plain"));
    assert_eq!(resp.header("Content-Length"), Some("13"));
    assert_eq!(resp.content_length(), PLAINTEXT_BODY.len());
    assert_eq!(resp.body, PLAINTEXT_BODY);
}

#[test]
fn test_json_response_round_trips() {
    let clock = ClockCache::new();
    let (status, out) = render(Route::Json, &clock);

    assert_eq!(status, StatusCode::Ok);
    let responses = parse_responses(&out);
    let resp = &responses[0];

    assert_eq!(resp.status_line, "HTTP/1.1 200 OK");
    assert_eq!(resp.header("Content-Type"), Some("application/json"));
    assert_eq!(resp.content_length(), resp.body.len());

    let decoded: JsonMessage = serde_json::from_slice(&resp.body).unwrap();
    assert_eq!(decoded.message, JSON_MESSAGE);
    assert_eq!(resp.body, br#"{"message":"Hello, World!"}"#);
}

#[test]
fn test_unknown_route_is_empty_404() {
    let clock = ClockCache::new();
    let (status, out) = render(Route::Unknown, &clock);

    assert_eq!(status, StatusCode::NotFound);
    let responses = parse_responses(&out);
    let resp = &responses[0];

    assert_eq!(resp.status_line, "HTTP/1.1 404 Not Found");
    assert_eq!(resp.header("Content-Length"), Some("0"));
    assert!(resp.body.is_empty());
    assert!(out.ends_with(b"\r\n\r\n"));
}

#[test]
fn test_every_response_carries_cached_date() {
    let clock = ClockCache::new();
    let expected = std::str::from_utf8(clock.current().value()).unwrap().to_string();

    for route in [Route::Plaintext, Route::Json, Route::Unknown] {
        let (_, out) = render(route, &clock);
        let responses = parse_responses(&out);
        assert_eq!(responses[0].header("Date"), Some(expected.as_str()));
        assert_eq!(responses[0].header("Server"), Some("platbench"));
    }
}

#[test]
fn test_writer_appends_without_clearing() {
    let clock = ClockCache::new();
    let mut writer = ResponseWriter::new();
    let mut out = BytesMut::new();

    writer
        .write(Route::Plaintext, ConnectionHeader::Implicit, &clock, &mut out)
        .unwrap();
    writer
        .write(Route::Json, ConnectionHeader::Implicit, &clock, &mut out)
        .unwrap();
    writer
        .write(Route::Unknown, ConnectionHeader::Implicit, &clock, &mut out)
        .unwrap();

    let statuses: Vec<_> = parse_responses(&out)
        .into_iter()
        .map(|r| r.status_line)
        .collect();
    assert_eq!(
        statuses,
        ["HTTP/1.1 200 OK", "HTTP/1.1 200 OK", "HTTP/1.1 404 Not Found"]
    );
}

#[test]
fn test_connection_header_announces_persistence() {
    let clock = ClockCache::new();
    let mut writer = ResponseWriter::new();

    let cases = [
        (ConnectionHeader::Implicit, None),
        (ConnectionHeader::KeepAlive, Some("keep-alive")),
        (ConnectionHeader::Close, Some("close")),
    ];
    for (connection, expected) in cases {
        for route in [Route::Plaintext, Route::Json, Route::Unknown] {
            let mut out = BytesMut::new();
            writer.write(route, connection, &clock, &mut out).unwrap();

            let responses = parse_responses(&out);
            assert_eq!(responses.len(), 1);
            assert_eq!(responses[0].header("Connection"), expected);
            assert!(responses[0].header("Date").is_some());
        }
    }
}
