/*!
Background bundle discovery.

A periodic job walks every configured source root, prunes layers whose
backing directory disappeared, and registers every marker directory it
encounters. Requests keep serving from the previous snapshot while a walk is
in flight; freshness is bounded only by the scan period.
*/

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use walkdir::WalkDir;

use crate::vfs::{ChainedFs, BUNDLE_MARKER};

pub const SCAN_PERIOD: Duration = Duration::from_secs(5);

pub struct BundleScanner;

impl BundleScanner {
    /// One full scan cycle: a single stale-layer prune, then a walk of every
    /// source root registering marker directories. Unreadable subtrees are
    /// skipped without aborting the walk.
    pub fn scan_once(fs: &ChainedFs, source_roots: &[PathBuf]) {
        fs.prune_stale();
        for root in source_roots {
            for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_dir()
                    && entry.file_name().to_str() == Some(BUNDLE_MARKER)
                {
                    fs.register_candidate(entry.path());
                }
            }
        }
    }

    /// Run `scan_once` every `SCAN_PERIOD` until stopped.
    pub fn start(fs: Arc<ChainedFs>, source_roots: Vec<PathBuf>) -> ScannerHandle {
        let running = Arc::new(AtomicBool::new(true));
        let running_cl = running.clone();
        let join = std::thread::spawn(move || {
            while running_cl.load(Ordering::SeqCst) {
                Self::scan_once(&fs, &source_roots);
                // Sleep in short slices so stop() stays responsive.
                let mut slept = Duration::ZERO;
                while slept < SCAN_PERIOD && running_cl.load(Ordering::SeqCst) {
                    std::thread::sleep(Duration::from_millis(50));
                    slept += Duration::from_millis(50);
                }
            }
        });
        ScannerHandle {
            running,
            join: Some(join),
        }
    }
}

/// Handle for the periodic scan job.
pub struct ScannerHandle {
    running: Arc<AtomicBool>,
    join: Option<JoinHandle<()>>,
}

impl ScannerHandle {
    pub fn stop(mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}
