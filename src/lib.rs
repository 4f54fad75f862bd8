/*!
devserve: local development server over layered editor asset bundles.

Architecture
- Binary glue (src/main.rs) resolves configuration, builds the filesystem,
  and starts the accept loop plus the two background jobs.
- vfs: layered virtual filesystem (Layer / LayerSet / ChainedFs) with
  copy-on-write snapshot swapping and live bundle discovery.
- scanner: periodic source-root walk keeping the layer store current.
- gate: session-cookie authentication and per-second rate limiting, bypassed
  for loopback binds.
- server: HTTP parsing, response writing, typed route dispatch, CGI bridge,
  accept loop.
- util: header scanning, form decoding, subprocess execution with env
  whitelisting.

Environment invariants
- DEVSERVE_HOST: bind host; anything other than 127.0.0.1 arms the gate.
- DEVSERVE_PATH: colon-separated source roots scanned for installable
  bundles; also the only environment (with PATH) a CGI program inherits.
- The session cookie is MAGIC<port>; its value is the per-process secret.
*/

pub mod context;
pub mod errors;
pub mod gate;
pub mod scanner;
pub mod server;
pub mod util;
pub mod vfs;

pub use context::ServerContext;
pub use errors::{
    display_for_server_error, exit_code_for_io_error, exit_code_for_server_error, ServerError,
};
pub use gate::{
    check as gate_check, cookie_value_matches, generate_session_secret, session_cookie_name,
    start_rate_reset, GateOutcome, RateWindow, ResetHandle, LOOPBACK_HOST, MAX_RATE_PER_SECOND,
};
pub use scanner::{BundleScanner, ScannerHandle, SCAN_PERIOD};
pub use server::http::{read_http_request, HeaderMap, HttpRequest, Method};
pub use server::response::{
    content_type_for, show_error, show_json, show_redirect, write_response, Status, SEV_CNCL,
    SEV_ERR, SEV_INFO, SEV_OK, SEV_WARN,
};
pub use server::routes::{Handler, Route, Router};
pub use server::{start_server, ServerHandle};
pub use vfs::{BundleFile, ChainedFs, Layer, LayerSet, BUNDLE_MARKER};
