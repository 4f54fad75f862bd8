/*!
Response writing: the editor-compatible Status payload and raw HTTP/1.1
writers. Every response closes the connection.
*/

use std::io::Write;
use std::path::Path;

use serde::Serialize;

pub const SEV_ERR: &str = "Error";
pub const SEV_WARN: &str = "Warning";
pub const SEV_INFO: &str = "Info";
pub const SEV_CNCL: &str = "Cancel";
pub const SEV_OK: &str = "Ok";

/// Status object understood by the editor frontend.
#[derive(Debug, Clone, Serialize)]
pub struct Status {
    #[serde(rename = "Severity")]
    pub severity: String,
    #[serde(rename = "HttpCode")]
    pub http_code: u32,
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "DetailedMessage")]
    pub detailed_message: String,
}

pub fn reason_phrase(code: u32) -> &'static str {
    match code {
        200 => "OK",
        302 => "Found",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        405 => "Method Not Allowed",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        _ => "",
    }
}

/// Write a full response: status line, supplied headers, Content-Length and
/// Connection: close, then the body. Write errors are ignored; the client
/// has already gone away and this request is over either way.
pub fn write_response<W: Write + ?Sized>(
    w: &mut W,
    code: u32,
    headers: &[(&str, &str)],
    body: &[u8],
) {
    let mut head = format!("HTTP/1.1 {} {}\r\n", code, reason_phrase(code));
    for (k, v) in headers {
        head.push_str(&format!("{}: {}\r\n", k, v));
    }
    head.push_str(&format!(
        "Content-Length: {}\r\nConnection: close\r\n\r\n",
        body.len()
    ));
    let _ = w.write_all(head.as_bytes());
    let _ = w.write_all(body);
    let _ = w.flush();
}

/// Write an editor-compatible error Status with severity Error.
/// Serialization of the Status itself cannot legitimately fail; if it does,
/// that is a defect, not a request error.
pub fn show_error<W: Write + ?Sized>(w: &mut W, http_code: u32, message: &str, detail: &str) {
    let status = Status {
        severity: SEV_ERR.to_string(),
        http_code,
        message: message.to_string(),
        detailed_message: detail.to_string(),
    };
    let body = serde_json::to_vec(&status).expect("status serialization");
    write_response(
        w,
        http_code,
        &[("Content-Type", "application/json")],
        &body,
    );
}

/// Write an arbitrary JSON document with optional extra headers.
/// Same invariant as `show_error`: the documents serialized here are
/// in-memory maps whose serialization failing is a defect.
pub fn show_json<W: Write + ?Sized, T: Serialize>(
    w: &mut W,
    http_code: u32,
    value: &T,
    extra_headers: &[(&str, &str)],
) {
    let body = serde_json::to_vec(value).expect("json serialization");
    let mut headers: Vec<(&str, &str)> = vec![("Content-Type", "application/json")];
    headers.extend_from_slice(extra_headers);
    write_response(w, http_code, &headers, &body);
}

/// 302 redirect, optionally setting a cookie alongside.
pub fn show_redirect<W: Write + ?Sized>(w: &mut W, location: &str, set_cookie: Option<&str>) {
    let mut headers: Vec<(&str, &str)> = vec![("Location", location)];
    if let Some(c) = set_cookie {
        headers.push(("Set-Cookie", c));
    }
    write_response(w, 302, &headers, b"");
}

/// Content type by file extension; bundle assets are a small closed set.
pub fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "json" | "map" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "woff" => "font/woff",
        "woff2" => "font/woff2",
        "ttf" => "font/ttf",
        "txt" | "md" => "text/plain; charset=utf-8",
        "wasm" => "application/wasm",
        _ => "application/octet-stream",
    }
}
