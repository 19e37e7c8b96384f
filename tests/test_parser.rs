use std::collections::HashMap;
use std::time::Duration;

use minihttp::http::parser::{
    ParseError, ParseOutcome, parse_http_request, parse_query, parse_request_head, read_request,
};
use minihttp::http::request::{Method, Request};
use tokio::io::{AsyncWriteExt, BufReader};

fn parsed(req: &[u8]) -> Request {
    match parse_http_request(req) {
        ParseOutcome::Parsed(request) => request,
        other => panic!("expected a parsed request, got {:?}", other),
    }
}

fn parse_error(req: &[u8]) -> ParseError {
    match parse_http_request(req) {
        ParseOutcome::Malformed(bad) => bad.error,
        other => panic!("expected a malformed request, got {:?}", other),
    }
}

#[test]
fn test_parse_simple_get_request() {
    let req = parsed(b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n");

    assert_eq!(req.method, Method::GET);
    assert_eq!(req.path, "/");
    assert_eq!(req.version, "HTTP/1.1");
    assert_eq!(req.headers.get("host").unwrap(), "example.com");
    assert!(req.params.is_empty());
}

#[test]
fn test_parse_hello_with_query() {
    let req = parsed(b"GET /hello?name=Ann HTTP/1.1\r\nHost: x\r\n\r\n");

    assert_eq!(req.method, Method::GET);
    assert_eq!(req.path, "/hello");
    assert_eq!(req.params.len(), 1);
    assert_eq!(req.param("name"), Some("Ann"));
}

#[test]
fn test_parse_request_without_headers() {
    let req = parsed(b"HEAD /index.html HTTP/1.1\r\n\r\n");

    assert_eq!(req.method, Method::HEAD);
    assert_eq!(req.path, "/index.html");
    assert!(req.headers.is_empty());
    assert_eq!(req.lines, vec!["HEAD /index.html HTTP/1.1".to_string()]);
}

#[test]
fn test_parse_multiple_headers_lowercases_names() {
    let req = parsed(
        b"GET /path HTTP/1.1\r\nHost: example.com\r\nUser-Agent: test-client\r\nAccept: */*\r\n\r\n",
    );

    assert_eq!(req.headers.get("host").unwrap(), "example.com");
    assert_eq!(req.headers.get("user-agent").unwrap(), "test-client");
    assert_eq!(req.headers.get("accept").unwrap(), "*/*");
    assert_eq!(req.header("USER-AGENT"), Some("test-client"));
}

#[test]
fn test_parse_repeated_header_overwrites() {
    let req = parsed(b"GET / HTTP/1.1\r\nX-Tag: first\r\nx-tag: second\r\n\r\n");

    assert_eq!(req.headers.len(), 1);
    assert_eq!(req.header("X-Tag"), Some("second"));
}

#[test]
fn test_parse_decodes_path_and_params() {
    let req = parsed(b"GET /some%20dir/a+b.txt?q=rust+lang&emoji=%F0%9F%A6%80&eq=a%3Db HTTP/1.1\r\n\r\n");

    assert_eq!(req.path, "/some dir/a b.txt");
    assert_eq!(req.param("q"), Some("rust lang"));
    assert_eq!(req.param("emoji"), Some("🦀"));
    assert_eq!(req.param("eq"), Some("a=b"));
}

#[test]
fn test_parse_query_splits_on_first_equals() {
    let params = parse_query("expr=1+1=2");
    assert_eq!(params.get("expr").map(String::as_str), Some("1 1=2"));
}

#[test]
fn test_parse_query_skips_pairs_without_equals() {
    let params = parse_query("flag&name=Ann&&empty=");

    assert_eq!(params.len(), 2);
    assert_eq!(params.get("name").map(String::as_str), Some("Ann"));
    assert_eq!(params.get("empty").map(String::as_str), Some(""));
    assert!(!params.contains_key("flag"));
}

#[test]
fn test_parse_query_skips_pairs_with_broken_escapes() {
    let req = parsed(b"GET /calc?x=100%&y=1&z=%4&w=%zz HTTP/1.1\r\n\r\n");

    assert_eq!(req.params.len(), 1);
    assert_eq!(req.param("y"), Some("1"));
}

#[test]
fn test_parse_query_last_duplicate_wins() {
    let req = parsed(b"GET /?a=1&a=2&a=3 HTTP/1.1\r\n\r\n");
    assert_eq!(req.param("a"), Some("3"));
}

#[test]
fn test_query_round_trip() {
    let pairs = [
        ("name", "Ann Lee"),
        ("city", "São Paulo"),
        ("note", "50% off / today?"),
        ("empty", ""),
    ];

    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs.iter())
        .finish();

    let expected: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    assert_eq!(parse_query(&query), expected);

    let req = parsed(format!("GET /form?{} HTTP/1.1\r\n\r\n", query).as_bytes());
    assert_eq!(req.path, "/form");
    assert_eq!(req.params, expected);
}

#[test]
fn test_parse_every_method() {
    let methods = vec![
        ("GET", Method::GET),
        ("HEAD", Method::HEAD),
        ("POST", Method::POST),
        ("PUT", Method::PUT),
        ("DELETE", Method::DELETE),
        ("CONNECT", Method::CONNECT),
        ("OPTIONS", Method::OPTIONS),
        ("TRACE", Method::TRACE),
        ("PATCH", Method::PATCH),
    ];

    for (method_str, expected_method) in methods {
        let req = format!("{} /x?k=v HTTP/1.1\r\n\r\n", method_str);
        let parsed = parsed(req.as_bytes());
        assert_eq!(parsed.method, expected_method);
        assert_eq!(parsed.path, "/x");
        assert_eq!(parsed.param("k"), Some("v"));
    }
}

#[test]
fn test_parse_garbage_request_line() {
    assert!(matches!(
        parse_error(b"XYZZY\r\n\r\n"),
        ParseError::InvalidRequestLine(_)
    ));
}

#[test]
fn test_parse_invalid_http_method() {
    assert!(matches!(
        parse_error(b"INVALID / HTTP/1.1\r\n\r\n"),
        ParseError::InvalidMethod(_)
    ));
    assert!(matches!(
        parse_error(b"get / HTTP/1.1\r\n\r\n"),
        ParseError::InvalidMethod(_)
    ));
}

#[test]
fn test_parse_missing_version() {
    assert!(matches!(
        parse_error(b"GET /\r\n\r\n"),
        ParseError::InvalidRequestLine(_)
    ));
}

#[test]
fn test_parse_malformed_header() {
    assert!(matches!(
        parse_error(b"GET / HTTP/1.1\r\nBrokenHeader\r\n\r\n"),
        ParseError::InvalidHeader(_)
    ));
}

#[test]
fn test_parse_path_with_invalid_utf8_escape() {
    assert!(matches!(
        parse_error(b"GET /%C3%28 HTTP/1.1\r\n\r\n"),
        ParseError::InvalidTarget(_)
    ));
}

#[test]
fn test_parse_path_with_broken_escape() {
    assert!(matches!(
        parse_error(b"GET /a%zz HTTP/1.1\r\n\r\n"),
        ParseError::InvalidTarget(_)
    ));
    assert!(matches!(
        parse_error(b"GET /100% HTTP/1.1\r\n\r\n"),
        ParseError::InvalidTarget(_)
    ));
}

#[test]
fn test_malformed_request_keeps_headers() {
    let ParseOutcome::Malformed(bad) =
        parse_http_request(b"XYZZY\r\nConnection: Keep-Alive\r\nHost: x\r\n\r\n")
    else {
        panic!("expected a malformed request");
    };

    assert!(bad.keep_alive());
    assert_eq!(bad.request_line(), "XYZZY");
    assert_eq!(bad.headers.get("host").unwrap(), "x");
}

#[test]
fn test_parse_error_message_names_line() {
    let err = parse_error(b"BREW /pot HTTP/1.1\r\n\r\n");
    assert!(err.to_string().contains("BREW /pot HTTP/1.1"));
}

#[test]
fn test_empty_head_is_no_request() {
    assert!(matches!(parse_request_head(vec![]), ParseOutcome::NoRequest));
    assert!(matches!(parse_http_request(b""), ParseOutcome::NoRequest));
    assert!(matches!(parse_http_request(b"\r\n"), ParseOutcome::NoRequest));
}

#[tokio::test]
async fn test_read_request_consumes_exactly_one_head() {
    let input: &[u8] = b"GET /one HTTP/1.1\r\nConnection: keep-alive\r\n\r\nGET /two HTTP/1.1\r\n\r\n";
    let mut reader = BufReader::new(input);

    let ParseOutcome::Parsed(first) = read_request(&mut reader, Duration::from_secs(1)).await.unwrap()
    else {
        panic!("expected first request");
    };
    assert_eq!(first.path, "/one");
    assert!(first.keep_alive());

    let ParseOutcome::Parsed(second) =
        read_request(&mut reader, Duration::from_secs(1)).await.unwrap()
    else {
        panic!("expected second request");
    };
    assert_eq!(second.path, "/two");
    assert!(!second.keep_alive());

    let third = read_request(&mut reader, Duration::from_secs(1)).await.unwrap();
    assert!(matches!(third, ParseOutcome::NoRequest));
}

#[tokio::test]
async fn test_read_request_accepts_bare_newlines_and_eof() {
    let input: &[u8] = b"GET /lf HTTP/1.1\nHost: x\n";
    let mut reader = BufReader::new(input);

    let ParseOutcome::Parsed(req) = read_request(&mut reader, Duration::from_secs(1)).await.unwrap()
    else {
        panic!("expected a request terminated by end of stream");
    };
    assert_eq!(req.path, "/lf");
    assert_eq!(req.header("host"), Some("x"));
}

#[tokio::test]
async fn test_read_request_idle_timeout_is_no_request() {
    let (client, server) = tokio::io::duplex(64);
    let mut reader = BufReader::new(server);

    let outcome = read_request(&mut reader, Duration::from_millis(50)).await.unwrap();
    assert!(matches!(outcome, ParseOutcome::NoRequest));
    drop(client);
}

#[tokio::test]
async fn test_read_request_timeout_mid_head_is_error() {
    let (mut client, server) = tokio::io::duplex(64);
    let mut reader = BufReader::new(server);

    client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

    let err = read_request(&mut reader, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::TimedOut);
}
