/*!
Typed dispatch by path prefix.

Routes are probed in registration order; the first prefix match wins and its
handler either serves the request (true) or declines (false), in which case
the uniform "Unrecognized service" Status is returned. The gatekeeper runs in
front of every gated route before its handler sees the request.
*/

use std::collections::BTreeMap;
use std::io::Write;

use serde::Serialize;

use crate::context::ServerContext;
use crate::gate::{self, session_cookie_name, GateOutcome};
use crate::server::cgi;
use crate::server::http::{HttpRequest, Method};
use crate::server::response::{
    content_type_for, show_error, show_json, show_redirect, write_response,
};

/// One feature's entry point. Returning false means the request was not
/// recognized; the dispatcher turns that into the uniform 404.
pub trait Handler: Send + Sync {
    fn handle(
        &self,
        ctx: &ServerContext,
        req: &HttpRequest,
        rest: &str,
        w: &mut dyn Write,
    ) -> bool;

    /// Whether the gatekeeper runs in front of this handler.
    fn gated(&self) -> bool {
        true
    }
}

pub struct Route {
    pub prefix: &'static str,
    pub handler: Box<dyn Handler>,
}

pub struct Router {
    routes: Vec<Route>,
}

fn prefix_matches(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    path == prefix || path.starts_with(&format!("{}/", prefix))
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Router {
        Router { routes }
    }

    /// The server's route table. Order matters: the static file route is the
    /// catch-all and must come last.
    pub fn with_default_routes() -> Router {
        Router::new(vec![
            Route {
                prefix: "/defaults.pref",
                handler: Box::new(DefaultsHandler),
            },
            Route {
                prefix: "/login",
                handler: Box::new(LoginHandler),
            },
            Route {
                prefix: "/logout",
                handler: Box::new(LogoutHandler),
            },
            Route {
                prefix: "/bundle-cgi",
                handler: Box::new(CgiHandler),
            },
            Route {
                prefix: "/",
                handler: Box::new(StaticHandler),
            },
        ])
    }

    /// Dispatch one parsed request: first matching prefix wins; gate, then
    /// handler; anything unrecognized gets the uniform Status 404.
    pub fn dispatch(&self, ctx: &ServerContext, req: &HttpRequest, w: &mut dyn Write) {
        for route in &self.routes {
            if !prefix_matches(&req.path, route.prefix) {
                continue;
            }

            if route.handler.gated() {
                match gate::check(ctx, req) {
                    GateOutcome::Allowed => {}
                    GateOutcome::RateExceeded => {
                        show_error(w, 503, "Too many requests", "");
                        return;
                    }
                    GateOutcome::Unauthorized => {
                        show_error(w, 401, "Permission Denied", "");
                        return;
                    }
                }
            }

            let rest = if route.prefix == "/" {
                req.path.as_str()
            } else {
                req.path[route.prefix.len()..].trim_start_matches('/')
            };

            if route.handler.handle(ctx, req, rest, w) {
                return;
            }
            break;
        }

        if ctx.debug {
            eprintln!("devserve: unrecognized service {}", req.path);
        }
        show_error(
            w,
            404,
            &format!("Unrecognized service {}:{}", req.method.as_str(), req.path),
            "",
        );
    }
}

#[derive(Serialize)]
struct DefaultsDoc {
    #[serde(rename = "Plugins")]
    plugins: BTreeMap<String, bool>,
}

/// Read-only view of the enabled-plugin map, reflecting the live layer
/// store at request time.
struct DefaultsHandler;

impl Handler for DefaultsHandler {
    fn handle(
        &self,
        ctx: &ServerContext,
        req: &HttpRequest,
        _rest: &str,
        w: &mut dyn Write,
    ) -> bool {
        if req.method != Method::Get {
            return false;
        }
        let doc = DefaultsDoc {
            plugins: ctx.fs.plugins_snapshot(),
        };
        // Plugins can be installed or removed at any time; neither the
        // browser nor a proxy may cache this document.
        show_json(w, 200, &doc, &[("cache-control", "no-cache, no-store")]);
        true
    }
}

/// Issues the session cookie when the MAGIC query value matches the secret.
/// Runs outside the gate; it is how a remote client obtains the cookie.
struct LoginHandler;

impl Handler for LoginHandler {
    fn gated(&self) -> bool {
        false
    }

    fn handle(
        &self,
        ctx: &ServerContext,
        req: &HttpRequest,
        _rest: &str,
        w: &mut dyn Write,
    ) -> bool {
        if req.method != Method::Get {
            return false;
        }
        match ctx.secret.as_deref() {
            None => {
                // Loopback bind: there is nothing to log into.
                show_redirect(w, "/", None);
            }
            Some(secret) => {
                if req.query_value("MAGIC") == Some(secret) {
                    let cookie = format!(
                        "{}={}; Path=/; HttpOnly",
                        session_cookie_name(ctx.port),
                        secret
                    );
                    show_redirect(w, "/", Some(&cookie));
                } else {
                    show_error(w, 401, "Permission Denied", "");
                }
            }
        }
        true
    }
}

struct LogoutHandler;

impl Handler for LogoutHandler {
    fn gated(&self) -> bool {
        false
    }

    fn handle(
        &self,
        ctx: &ServerContext,
        req: &HttpRequest,
        _rest: &str,
        w: &mut dyn Write,
    ) -> bool {
        if req.method != Method::Get {
            return false;
        }
        let cookie = format!("{}=; Path=/; Max-Age=0", session_cookie_name(ctx.port));
        show_redirect(w, "/", Some(&cookie));
        true
    }
}

/// Bundle extension programs under the source roots' sibling bin directories.
struct CgiHandler;

impl Handler for CgiHandler {
    fn handle(
        &self,
        ctx: &ServerContext,
        req: &HttpRequest,
        rest: &str,
        w: &mut dyn Write,
    ) -> bool {
        cgi::serve(ctx, req, rest, w)
    }
}

/// Serves bundle assets through the layered virtual filesystem.
struct StaticHandler;

impl Handler for StaticHandler {
    fn handle(
        &self,
        ctx: &ServerContext,
        req: &HttpRequest,
        _rest: &str,
        w: &mut dyn Write,
    ) -> bool {
        if req.method != Method::Get {
            return false;
        }
        let opened = match ctx.fs.open(&req.path) {
            Ok(f) => f,
            Err(_) => return false,
        };
        let file = if opened.is_dir() {
            // Directory contents are never listed; only an index page may
            // stand in for the directory itself.
            let index = format!("{}/index.html", req.path.trim_end_matches('/'));
            match ctx.fs.open(&index) {
                Ok(f) if !f.is_dir() => f,
                _ => return false,
            }
        } else {
            opened
        };
        let ctype = content_type_for(file.path());
        match file.read_all() {
            Ok(data) => {
                write_response(w, 200, &[("Content-Type", ctype)], &data);
            }
            Err(e) => {
                show_error(w, 500, "Unable to read bundle asset", &e.to_string());
            }
        }
        true
    }
}
