#![allow(clippy::module_name_repetitions)]
//! Small utilities: HTTP header scanning, form decoding, hex encoding.

pub mod exec;

pub use exec::{ExecOutput, ExecRequest, ExecService};

pub fn find_crlfcrlf(buf: &[u8]) -> Option<usize> {
    if buf.len() < 4 {
        return None;
    }
    let pattern: &[u8; 4] = b"\r\n\r\n";
    buf.windows(4).position(|w| w == pattern)
}

/// Find end of HTTP headers, accepting either CRLF-CRLF or LF-LF separators.
/// Returns the index just after the header terminator when found.
pub fn find_header_end(buf: &[u8]) -> Option<usize> {
    if let Some(pos) = find_crlfcrlf(buf) {
        return Some(pos + 4);
    }
    buf.windows(2).position(|w| w == b"\n\n").map(|pos| pos + 2)
}

/// Decode one application/x-www-form-urlencoded value ('+' as space, then percent-decoding).
/// Invalid percent sequences leave the input unchanged rather than failing the request.
pub fn form_decode(s: &str) -> String {
    let plus = s.replace('+', " ");
    match urlencoding::decode(&plus) {
        Ok(v) => v.into_owned(),
        Err(_) => plus,
    }
}

/// Parse application/x-www-form-urlencoded pairs; supports repeated keys.
pub fn parse_form_urlencoded(body: &str) -> Vec<(String, String)> {
    let mut res = Vec::new();
    for pair in body.split('&') {
        if pair.is_empty() {
            continue;
        }
        let mut it = pair.splitn(2, '=');
        let k = it.next().unwrap_or_default();
        let v = it.next().unwrap_or_default();
        res.push((form_decode(k), form_decode(v)));
    }
    res
}

pub fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}
