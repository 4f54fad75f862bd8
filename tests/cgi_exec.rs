#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use devserve::{ChainedFs, HeaderMap, HttpRequest, Method, Router, ServerContext};

fn install_script(dir: &std::path::Path, name: &str, script: &str) -> std::path::PathBuf {
    let src = dir.join("src");
    let bin = dir.join("bin");
    fs::create_dir_all(&src).unwrap();
    fs::create_dir_all(&bin).unwrap();
    let path = bin.join(name);
    fs::write(&path, script).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    src
}

fn dispatch(ctx: &ServerContext, req: &HttpRequest) -> String {
    let router = Router::with_default_routes();
    let mut out: Vec<u8> = Vec::new();
    router.dispatch(ctx, req, &mut out);
    String::from_utf8_lossy(&out).to_string()
}

fn post(path: &str, body: &[u8]) -> HttpRequest {
    HttpRequest {
        method: Method::Post,
        path: path.to_string(),
        raw_query: String::new(),
        query: Vec::new(),
        headers: HeaderMap::new(),
        body: body.to_vec(),
    }
}

#[test]
fn cgi_program_response_is_relayed() {
    let dir = tempfile::tempdir().unwrap();
    let src = install_script(
        dir.path(),
        "hello",
        "#!/bin/sh\nprintf 'Content-Type: text/plain\\n\\nhello from cgi'\n",
    );
    let ctx = ServerContext::new(
        "127.0.0.1",
        2022,
        Arc::new(ChainedFs::empty(false)),
        vec![src],
        false,
    )
    .unwrap();

    let text = dispatch(&ctx, &post("/bundle-cgi/hello", b""));
    assert!(text.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(text.contains("Content-Type: text/plain"));
    assert!(text.ends_with("hello from cgi"));
}

#[test]
fn cgi_status_header_overrides_the_code() {
    let dir = tempfile::tempdir().unwrap();
    let src = install_script(
        dir.path(),
        "created",
        "#!/bin/sh\nprintf 'Status: 201 Created\\nContent-Type: text/plain\\n\\ndone'\n",
    );
    let ctx = ServerContext::new(
        "127.0.0.1",
        2022,
        Arc::new(ChainedFs::empty(false)),
        vec![src],
        false,
    )
    .unwrap();

    let text = dispatch(&ctx, &post("/bundle-cgi/created", b""));
    assert!(text.starts_with("HTTP/1.1 201"));
    assert!(text.ends_with("done"));
}

#[test]
fn cgi_environment_is_whitelisted() {
    let dir = tempfile::tempdir().unwrap();
    // The script echoes whether a server-side secret leaked through.
    let src = install_script(
        dir.path(),
        "envcheck",
        "#!/bin/sh\nprintf 'Content-Type: text/plain\\n\\nsecret=[%s] method=[%s]' \"$DEVSERVE_TEST_SECRET\" \"$REQUEST_METHOD\"\n",
    );
    std::env::set_var("DEVSERVE_TEST_SECRET", "leak-me");
    let ctx = ServerContext::new(
        "127.0.0.1",
        2022,
        Arc::new(ChainedFs::empty(false)),
        vec![src],
        false,
    )
    .unwrap();

    let text = dispatch(&ctx, &post("/bundle-cgi/envcheck", b""));
    assert!(text.contains("secret=[]"));
    assert!(text.contains("method=[POST]"));
}

#[test]
fn unknown_program_is_the_uniform_404() {
    let ctx = ServerContext::new(
        "127.0.0.1",
        2022,
        Arc::new(ChainedFs::empty(false)),
        Vec::new(),
        false,
    )
    .unwrap();
    let text = dispatch(&ctx, &post("/bundle-cgi/ghost", b""));
    assert!(text.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert!(text.contains("Unrecognized service"));
}

#[test]
fn failing_program_maps_to_bad_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let src = install_script(
        dir.path(),
        "broken",
        "#!/bin/sh\necho 'boom' >&2\nexit 3\n",
    );
    let ctx = ServerContext::new(
        "127.0.0.1",
        2022,
        Arc::new(ChainedFs::empty(false)),
        vec![src],
        false,
    )
    .unwrap();

    let text = dispatch(&ctx, &post("/bundle-cgi/broken", b""));
    assert!(text.starts_with("HTTP/1.1 502 Bad Gateway\r\n"));
    assert!(text.contains("boom"));
}
