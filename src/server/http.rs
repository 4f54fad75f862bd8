/*!
HTTP helpers: tolerant request parsing for the development server.

This is a minimal request model and a parser for a single HTTP request from
a Read stream, with compatibility for both CRLFCRLF and LFLF header
termination, a 64 KiB header cap, and a Content-Length body read with a
1 MiB soft cap. The server closes every connection after one response, so
nothing here handles keep-alive.
*/

use std::collections::HashMap;
use std::io::{self, Read};

use crate::util::{find_header_end, parse_form_urlencoded};

/// Supported HTTP methods (minimal)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other(String),
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Other(s) => s.as_str(),
        }
    }
}

/// Simple case-insensitive header map (keys lowercased)
pub type HeaderMap = HashMap<String, String>;

/// Parsed HTTP request. The path keeps its original case (bundle assets are
/// case-sensitive) and is percent-decoded; headers are normalized.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub path: String,
    pub raw_query: String,
    pub query: Vec<(String, String)>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// First value for a query key, if present.
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Value of a named cookie from the Cookie header, if present.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.headers.get("cookie")?;
        for part in header.split(';') {
            if let Some((k, v)) = part.trim().split_once('=') {
                if k.trim() == name {
                    return Some(v.trim().to_string());
                }
            }
        }
        None
    }
}

/// Parse a single HTTP request from a reader with a 64 KiB header cap.
/// Tolerant to CRLFCRLF and LFLF as header terminators. Body is read per
/// Content-Length up to a 1 MiB soft cap.
pub fn read_http_request<R: Read>(reader: &mut R) -> io::Result<HttpRequest> {
    const HDR_CAP: usize = 64 * 1024;
    const BODY_CAP: usize = 1024 * 1024;
    let mut buf = Vec::new();
    let mut tmp = [0u8; 1024];
    let mut header_end: Option<usize> = None;

    // Read until we find the end of headers or hit the cap/EOF
    while header_end.is_none() && buf.len() < HDR_CAP {
        let n = reader.read(&mut tmp)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&tmp[..n]);
        if let Some(end_idx) = find_header_end(&buf) {
            header_end = Some(end_idx);
        }
    }

    if buf.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "empty request",
        ));
    }

    let hend = header_end.unwrap_or(buf.len());
    let (header_bytes, body_start) = if let Some(end_idx) = header_end {
        // Determine which terminator was used by inspecting bytes before end_idx
        let header_bytes: &[u8] = if end_idx >= 4 && &buf[end_idx - 4..end_idx] == b"\r\n\r\n" {
            &buf[..end_idx - 4]
        } else if end_idx >= 2 && &buf[end_idx - 2..end_idx] == b"\n\n" {
            &buf[..end_idx - 2]
        } else {
            &buf[..end_idx]
        };
        (header_bytes, end_idx)
    } else {
        (&buf[..hend], hend)
    };

    let header_str = String::from_utf8_lossy(header_bytes);
    let mut lines = header_str.lines();
    let request_line = lines.next().unwrap_or_default().trim().to_string();
    let (method, path, raw_query, query) = parse_request_line(&request_line);
    let headers = parse_headers(lines);

    let mut body = Vec::new();
    if buf.len() > body_start {
        body.extend_from_slice(&buf[body_start..]);
    }

    // Honor Content-Length if present; keep any already-read bytes after headers.
    let mut content_len: usize = 0;
    if let Some(v) = headers.get("content-length") {
        content_len = v.trim().parse().unwrap_or(0);
    }
    if content_len > BODY_CAP {
        content_len = BODY_CAP;
    }
    let mut remaining = content_len.saturating_sub(body.len());
    while remaining > 0 {
        let chunk = remaining.min(8 * 1024);
        let mut rem_buf = vec![0u8; chunk];
        let got: usize = reader.read(&mut rem_buf).unwrap_or_default();
        if got == 0 {
            break;
        }
        let allowed = BODY_CAP.saturating_sub(body.len()).min(got);
        body.extend_from_slice(&rem_buf[..allowed]);
        if allowed < got {
            break;
        }
        remaining -= got;
    }

    Ok(HttpRequest {
        method,
        path,
        raw_query,
        query,
        headers,
        body,
    })
}

fn parse_headers<'a, I: Iterator<Item = &'a str>>(lines: I) -> HeaderMap {
    let mut map = HeaderMap::new();
    for line in lines {
        if let Some((k, v)) = line.split_once(':') {
            map.insert(k.trim().to_ascii_lowercase(), v.trim().to_string());
        }
    }
    map
}

fn parse_request_line(request_line: &str) -> (Method, String, String, Vec<(String, String)>) {
    let mut parts = request_line.split_whitespace();
    let method = match parts.next().unwrap_or("").to_ascii_uppercase().as_str() {
        "GET" => Method::Get,
        "POST" => Method::Post,
        other => Method::Other(other.to_string()),
    };
    let target = parts.next().unwrap_or("/");
    let (raw_path, raw_query) = match target.find('?') {
        Some(idx) => (&target[..idx], &target[idx + 1..]),
        None => (target, ""),
    };
    let path = match urlencoding::decode(raw_path) {
        Ok(p) => p.into_owned(),
        Err(_) => raw_path.to_string(),
    };
    let query = parse_form_urlencoded(raw_query);
    (method, path, raw_query.to_string(), query)
}
