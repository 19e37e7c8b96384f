use minihttp::http::response::{Body, Response, StatusCode, error_page, escape_html};
use std::path::Path;

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::NoContent.as_u16(), 204);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::RequestTimeout.as_u16(), 408);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::NoContent.reason_phrase(), "No Content");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(StatusCode::RequestTimeout.reason_phrase(), "Request Timeout");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
    assert_eq!(StatusCode::NotImplemented.reason_phrase(), "Not Implemented");
}

#[test]
fn test_status_code_display() {
    assert_eq!(StatusCode::NotFound.to_string(), "404 Not Found");
}

#[test]
fn test_response_defaults() {
    let response = Response::new();

    assert_eq!(response.status(), None);
    assert_eq!(response.content_type(), None);
    assert_eq!(response.body(), &Body::Empty);
    assert!(response.headers().is_empty());
}

#[test]
fn test_response_fluent_setters() {
    let mut response = Response::new();
    response
        .set_status(StatusCode::Forbidden)
        .set_content_type("application/json")
        .set_header("X-Custom", "value")
        .set_body("{}");

    assert_eq!(response.status(), Some(StatusCode::Forbidden));
    assert_eq!(response.content_type(), Some("application/json"));
    assert_eq!(response.header("X-Custom"), Some("value"));
    assert_eq!(response.body(), &Body::Bytes("{}".into()));
}

#[test]
fn test_last_body_setter_wins() {
    let mut response = Response::new();

    response.set_body("in memory").set_body_file("/tmp/file.txt");
    assert_eq!(response.body_file(), Some(Path::new("/tmp/file.txt")));

    response.set_body(b"bytes".to_vec());
    assert_eq!(response.body_file(), None);
    assert_eq!(response.body(), &Body::Bytes(b"bytes".to_vec().into()));
}

#[test]
fn test_headers_are_single_valued_and_case_sensitive() {
    let mut response = Response::new();
    response
        .add_header("X-Tag", "one")
        .add_header("X-Tag", "two")
        .set_header("x-tag", "lower");

    assert_eq!(response.header("X-Tag"), Some("two"));
    assert_eq!(response.header("x-tag"), Some("lower"));
    assert_eq!(response.headers().len(), 2);

    response.remove_header("X-Tag");
    assert_eq!(response.header("X-Tag"), None);
    assert_eq!(response.headers().len(), 1);
}

#[test]
fn test_set_error_status() {
    let mut response = Response::new();
    response
        .set_content_type("image/png")
        .set_body_file("/tmp/x.png")
        .set_error_status(StatusCode::NotFound, Some("/missing"));

    assert_eq!(response.status(), Some(StatusCode::NotFound));
    assert_eq!(response.content_type(), Some("text/html"));

    let Body::Bytes(body) = response.body() else {
        panic!("error page should be in memory");
    };
    let page = String::from_utf8(body.to_vec()).unwrap();
    assert!(page.contains("404 Not Found"));
    assert!(page.contains("/missing"));
}

#[test]
fn test_internal_error_helper() {
    let response = Response::internal_error();

    assert_eq!(response.status(), Some(StatusCode::InternalServerError));
    let Body::Bytes(body) = response.body() else {
        panic!("error page should be in memory");
    };
    assert!(String::from_utf8_lossy(body).contains("500 Internal Server Error"));
}

#[test]
fn test_bad_request_helper() {
    let response = Response::bad_request();

    assert_eq!(response.status(), Some(StatusCode::BadRequest));
    let Body::Bytes(body) = response.body() else {
        panic!("error page should be in memory");
    };
    assert!(String::from_utf8_lossy(body).contains("Bad Request"));
}

#[test]
fn test_error_page_escapes_subtitle() {
    let page = error_page("400 Bad Request", Some("<script>alert('x')</script>"));

    assert!(page.starts_with("<!DOCTYPE html>"));
    assert!(page.contains("&lt;script&gt;"));
    assert!(!page.contains("<script>"));
    assert!(page.contains("GMT"));
}

#[test]
fn test_escape_html() {
    assert_eq!(escape_html("a & b < c > \"d\""), "a &amp; b &lt; c &gt; &quot;d&quot;");
    assert_eq!(escape_html("plain"), "plain");
}
