/*!
Process-wide server state as an explicit context object.

Everything the original kept as package globals (bind host, session secret,
rate window, the composed filesystem) lives here and is passed to
components, so tests can run several independent server instances in one
process.
*/

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use crate::gate::{generate_session_secret, RateWindow, LOOPBACK_HOST};
use crate::vfs::ChainedFs;

pub struct ServerContext {
    pub host: String,
    pub port: u16,
    /// Present only when the bind host is reachable from outside the machine.
    pub secret: Option<String>,
    pub rate: Arc<RateWindow>,
    pub fs: Arc<ChainedFs>,
    pub source_roots: Vec<PathBuf>,
    pub debug: bool,
}

impl ServerContext {
    pub fn new(
        host: &str,
        port: u16,
        fs: Arc<ChainedFs>,
        source_roots: Vec<PathBuf>,
        debug: bool,
    ) -> io::Result<ServerContext> {
        let secret = if host == LOOPBACK_HOST {
            None
        } else {
            Some(generate_session_secret()?)
        };
        Ok(ServerContext {
            host: host.to_string(),
            port,
            secret,
            rate: Arc::new(RateWindow::new()),
            fs,
            source_roots,
            debug,
        })
    }

    pub fn is_loopback(&self) -> bool {
        self.host == LOOPBACK_HOST
    }
}
