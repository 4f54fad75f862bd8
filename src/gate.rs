/*!
Request gatekeeper: per-second rate limiting and session-cookie
authentication in front of dispatch.

Both checks are skipped entirely when the server is bound to the loopback
interface; local access is implicitly trusted. The rate window is a single
counter behind its own mutex, zeroed wholesale by a periodic job; there is
no sliding window.
*/

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::context::ServerContext;
use crate::server::http::HttpRequest;
use crate::util::hex_encode;

pub const LOOPBACK_HOST: &str = "127.0.0.1";
pub const MAX_RATE_PER_SECOND: u32 = 1000;

/// Shared per-second request counter. All connection threads increment the
/// same window; the reset job zeroes it once per second regardless of how
/// high it climbed.
#[derive(Debug, Default)]
pub struct RateWindow {
    count: Mutex<u32>,
}

impl RateWindow {
    pub fn new() -> RateWindow {
        RateWindow::default()
    }

    /// Count one request against the window. Returns false once the ceiling
    /// is exceeded; the count is not decremented on rejection.
    pub fn tick(&self) -> bool {
        let mut count = self.count.lock().expect("rate window lock");
        *count = count.saturating_add(1);
        *count <= MAX_RATE_PER_SECOND
    }

    pub fn reset(&self) {
        let mut count = self.count.lock().expect("rate window lock");
        *count = 0;
    }

    pub fn current(&self) -> u32 {
        *self.count.lock().expect("rate window lock")
    }
}

/// Handle for the periodic rate-window reset job.
pub struct ResetHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ResetHandle {
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

/// Zero the rate window once per second for the life of the process.
/// The sleep runs in short slices so `stop` stays responsive in tests.
pub fn start_rate_reset(rate: Arc<RateWindow>) -> ResetHandle {
    let running = Arc::new(AtomicBool::new(true));
    let running_cl = running.clone();
    let join = std::thread::spawn(move || {
        let mut slept = Duration::ZERO;
        while running_cl.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(50));
            slept += Duration::from_millis(50);
            if slept >= Duration::from_secs(1) {
                rate.reset();
                slept = Duration::ZERO;
            }
        }
    });
    ResetHandle {
        running,
        join: Some(join),
    }
}

/// Generate the per-process session secret from the OS entropy source.
pub fn generate_session_secret() -> io::Result<String> {
    let mut buf = [0u8; 16];
    getrandom::getrandom(&mut buf).map_err(|e| {
        io::Error::new(
            io::ErrorKind::Other,
            format!("entropy source unavailable: {e}"),
        )
    })?;
    Ok(hex_encode(&buf))
}

/// Cookie name carrying the session secret; the listening port disambiguates
/// concurrent server instances on one machine.
pub fn session_cookie_name(port: u16) -> String {
    format!("MAGIC{port}")
}

/// Per-request gate decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateOutcome {
    Allowed,
    RateExceeded,
    Unauthorized,
}

/// Return true when a presented cookie value authorizes against the secret.
/// An empty secret never authorizes anything.
pub fn cookie_value_matches(value: Option<&str>, secret: &str) -> bool {
    match value {
        Some(v) => !secret.is_empty() && v == secret,
        None => false,
    }
}

/// Run the gate for one request: loopback bypass, then the rate window, then
/// the session cookie.
pub fn check(ctx: &ServerContext, req: &HttpRequest) -> GateOutcome {
    if ctx.is_loopback() {
        return GateOutcome::Allowed;
    }

    if !ctx.rate.tick() {
        return GateOutcome::RateExceeded;
    }

    let name = session_cookie_name(ctx.port);
    let presented = req.cookie(&name);
    match ctx.secret.as_deref() {
        Some(secret) if cookie_value_matches(presented.as_deref(), secret) => GateOutcome::Allowed,
        _ => GateOutcome::Unauthorized,
    }
}
