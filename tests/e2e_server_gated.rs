use std::fs;
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;

use devserve::{session_cookie_name, start_server, ChainedFs};

fn write_file(path: &std::path::Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn http_get(port: u16, target: &str, extra_headers: &str) -> String {
    let mut stream = TcpStream::connect(("127.0.0.1", port)).unwrap();
    let req = format!(
        "GET {} HTTP/1.1\r\nHost: 127.0.0.1\r\n{}\r\n",
        target, extra_headers
    );
    stream.write_all(req.as_bytes()).unwrap();
    let mut out = String::new();
    stream.read_to_string(&mut out).unwrap();
    out
}

#[test]
fn remote_bind_requires_the_session_cookie() {
    let root = tempfile::tempdir().unwrap();
    write_file(&root.path().join("core/web/app.js"), "boot();");

    let cfs = Arc::new(ChainedFs::initialize(root.path(), false).unwrap());
    let handle = start_server("0.0.0.0", 0, cfs, Vec::new(), false).unwrap();
    let ctx = handle.context();
    let port = handle.port();
    let secret = ctx.secret.clone().expect("remote bind generates a secret");

    // No cookie: rejected before any handler runs.
    let text = http_get(port, "/app.js", "");
    assert!(text.starts_with("HTTP/1.1 401 Unauthorized\r\n"));

    // Login with the printed magic value issues the cookie.
    let text = http_get(port, &format!("/login?MAGIC={}", secret), "");
    assert!(text.starts_with("HTTP/1.1 302 Found\r\n"));
    assert!(text.contains(&format!(
        "Set-Cookie: {}={}",
        session_cookie_name(port),
        secret
    )));

    // The cookie unlocks the same request that was just rejected.
    let cookie_header = format!("Cookie: {}={}\r\n", session_cookie_name(port), secret);
    let text = http_get(port, "/app.js", &cookie_header);
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.ends_with("boot();"));

    handle.stop();
}
