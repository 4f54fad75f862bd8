/*!
Bundle CGI bridge.

A bundle may ship host-side extension programs; they live in the `bin`
directory next to a configured source root and are invoked with a fixed
flag and a deliberately small environment. The program name check and the
explicit whitelist are the security boundary here.
*/

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use once_cell::sync::Lazy;

use crate::context::ServerContext;
use crate::server::http::HttpRequest;
use crate::server::response::{show_error, write_response};
use crate::util::{find_header_end, ExecRequest, ExecService};

/// Fixed flag passed to every bundle extension program.
pub const CGI_FLAG: &str = "-devserve";

pub const CGI_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment variables a CGI program inherits from the server.
static CGI_PASS_ENV: Lazy<Vec<&'static str>> = Lazy::new(|| vec!["PATH", "DEVSERVE_PATH"]);

/// Resolve a program name against the source roots' sibling bin directories.
/// Any '.' in the name is rejected outright (blocks ../../ style escapes).
pub fn resolve_program(source_roots: &[PathBuf], name: &str) -> Option<PathBuf> {
    if name.is_empty() || name.contains('.') {
        return None;
    }
    for root in source_roots {
        let candidate = root.join("..").join("bin").join(name);
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Serve one `/bundle-cgi/<program>[/<path-info>]` request. Returns false
/// when the program is not recognized (dispatcher answers 404).
pub fn serve<W: Write + ?Sized>(
    ctx: &ServerContext,
    req: &HttpRequest,
    rest: &str,
    w: &mut W,
) -> bool {
    let (program, path_info) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, ""),
    };

    let cmd = match resolve_program(&ctx.source_roots, program) {
        Some(c) => c,
        None => {
            if ctx.debug {
                eprintln!("devserve: cgi miss: {}", program);
            }
            return false;
        }
    };
    if ctx.debug {
        eprintln!("devserve: cgi call: {}", cmd.display());
    }

    let svc = ExecService::with_allowed_env(CGI_TIMEOUT, CGI_PASS_ENV.iter().copied());
    let mut request = ExecRequest::new(cmd.as_os_str())
        .arg(CGI_FLAG)
        .env("REQUEST_METHOD", req.method.as_str())
        .env("SCRIPT_NAME", format!("/bundle-cgi/{}", program))
        .env("PATH_INFO", path_info)
        .env("QUERY_STRING", &req.raw_query)
        .env("CONTENT_LENGTH", req.body.len().to_string());
    if let Some(ct) = req.headers.get("content-type") {
        request = request.env("CONTENT_TYPE", ct);
    }
    if !req.body.is_empty() {
        request = request.stdin(req.body.clone());
    }

    match svc.run(request) {
        Ok(out) => {
            if !out.status.success() {
                show_error(
                    w,
                    502,
                    "CGI program failed",
                    String::from_utf8_lossy(&out.stderr).trim(),
                );
                return true;
            }
            let (code, headers, body) = parse_cgi_output(&out.stdout);
            let header_refs: Vec<(&str, &str)> = headers
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect();
            write_response(w, code, &header_refs, &body);
            true
        }
        Err(e) => {
            show_error(w, 500, "CGI execution failed", &format!("{e:#}"));
            true
        }
    }
}

/// Split CGI output into (status code, pass-through headers, body).
/// A `Status:` header overrides the default 200; output without a header
/// block is served whole as plain text.
fn parse_cgi_output(stdout: &[u8]) -> (u32, Vec<(String, String)>, Vec<u8>) {
    let Some(end) = find_header_end(stdout) else {
        return (
            200,
            vec![(
                "Content-Type".to_string(),
                "text/plain; charset=utf-8".to_string(),
            )],
            stdout.to_vec(),
        );
    };

    let header_text = String::from_utf8_lossy(&stdout[..end]);
    let mut code: u32 = 200;
    let mut headers: Vec<(String, String)> = Vec::new();
    for line in header_text.lines() {
        let Some((k, v)) = line.split_once(':') else {
            continue;
        };
        let k = k.trim();
        let v = v.trim();
        if k.eq_ignore_ascii_case("status") {
            code = v
                .split_whitespace()
                .next()
                .and_then(|s| s.parse().ok())
                .unwrap_or(200);
        } else {
            headers.push((k.to_string(), v.to_string()));
        }
    }
    (code, headers, stdout[end..].to_vec())
}
