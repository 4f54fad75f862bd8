/*!
Server surface: request parsing (http), response writing (response), typed
route dispatch (routes), the bundle CGI bridge (cgi), and the accept loop.

One thread per connection; every connection carries exactly one request and
is closed after the response. The accept loop polls a nonblocking listener
so the running flag can stop it deterministically.
*/

pub mod cgi;
pub mod http;
pub mod response;
pub mod routes;

use std::io;
use std::net::TcpStream;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::context::ServerContext;
use crate::errors::{display_for_server_error, ServerError};
use crate::vfs::ChainedFs;
use self::routes::Router;

/// Running server: url, shared context, and the accept-loop thread.
pub struct ServerHandle {
    url: String,
    ctx: Arc<ServerContext>,
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ServerHandle {
    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn port(&self) -> u16 {
        self.ctx.port
    }

    pub fn context(&self) -> Arc<ServerContext> {
        self.ctx.clone()
    }

    /// Stop accepting and join the accept loop. In-flight connection
    /// threads finish on their own.
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }

    /// Block for the life of the accept loop (normal foreground operation).
    pub fn join(mut self) {
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Bind and start serving. Port 0 binds an ephemeral port (tests); the
/// context's session secret is generated here for non-loopback hosts, before
/// the first connection thread exists. Bind failure is startup-fatal.
pub fn start_server(
    host: &str,
    port: u16,
    fs: Arc<ChainedFs>,
    source_roots: Vec<PathBuf>,
    debug: bool,
) -> io::Result<ServerHandle> {
    let listener = std::net::TcpListener::bind((host, port)).map_err(|e| {
        io::Error::new(
            e.kind(),
            display_for_server_error(&ServerError::Message(format!(
                "bind {host}:{port} failed: {e}"
            ))),
        )
    })?;
    let port = listener.local_addr()?.port();
    let _ = listener.set_nonblocking(true);

    let ctx = Arc::new(ServerContext::new(host, port, fs, source_roots, debug)?);
    let router = Arc::new(Router::with_default_routes());
    let running = Arc::new(AtomicBool::new(true));
    let running_cl = running.clone();
    let ctx_cl = ctx.clone();

    let join = std::thread::spawn(move || {
        if ctx_cl.debug {
            eprintln!("devserve: listening on {}:{}", ctx_cl.host, ctx_cl.port);
        }
        loop {
            if !running_cl.load(Ordering::SeqCst) {
                break;
            }
            let (stream, _addr) = match listener.accept() {
                Ok(pair) => pair,
                Err(e) => {
                    if e.kind() != io::ErrorKind::WouldBlock && ctx_cl.debug {
                        eprintln!("devserve: accept error: {}", e);
                    }
                    std::thread::sleep(Duration::from_millis(50));
                    continue;
                }
            };
            let _ = stream.set_nonblocking(false);
            let _ = stream.set_read_timeout(Some(Duration::from_secs(30)));
            let _ = stream.set_write_timeout(None);

            let ctx2 = ctx_cl.clone();
            let router2 = router.clone();
            std::thread::spawn(move || {
                let mut s = stream;
                handle_connection(&ctx2, &router2, &mut s);
            });
        }
        if ctx_cl.debug {
            eprintln!("devserve: server stopped");
        }
    });

    let url = format!("http://{}:{}", ctx.host, ctx.port);
    Ok(ServerHandle {
        url,
        ctx,
        running,
        join: Some(join),
    })
}

fn handle_connection(ctx: &ServerContext, router: &Router, stream: &mut TcpStream) {
    let req = match http::read_http_request(stream) {
        Ok(r) => r,
        Err(_) => {
            response::show_error(stream, 400, "Malformed request", "");
            return;
        }
    };
    if ctx.debug {
        eprintln!("devserve: handler: {} {}", req.method.as_str(), req.path);
    }
    router.dispatch(ctx, &req, stream);
}
