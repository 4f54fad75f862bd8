use clap::Parser;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use devserve::{
    display_for_server_error, exit_code_for_server_error, start_rate_reset, start_server,
    BundleScanner, ChainedFs, ServerError, LOOPBACK_HOST,
};

#[derive(Parser, Debug)]
#[command(
    name = "devserve",
    version,
    about = "Serve editor asset bundles over HTTP with live bundle discovery and gated remote access."
)]
struct Cli {
    /// HTTP port for the development server
    #[arg(long, default_value_t = 2022)]
    port: u16,

    /// Source root scanned for installable bundles (repeatable; DEVSERVE_PATH adds more)
    #[arg(long = "source-root")]
    source_roots: Vec<PathBuf>,

    /// Directory containing the statically configured bundles; defaults to
    /// the first source root with a `bundles` subdirectory
    #[arg(long = "bundle-root")]
    bundle_root: Option<PathBuf>,

    /// Put the development server in debug mode with detailed logging
    #[arg(long)]
    debug: bool,
}

/// CLI roots first, then DEVSERVE_PATH entries, then a home-directory
/// fallback when nothing was configured.
fn resolve_source_roots(cli_roots: &[PathBuf]) -> Vec<PathBuf> {
    let mut roots: Vec<PathBuf> = cli_roots.to_vec();
    if let Ok(path) = env::var("DEVSERVE_PATH") {
        for p in env::split_paths(&path) {
            if !p.as_os_str().is_empty() {
                roots.push(p);
            }
        }
    }
    if roots.is_empty() {
        if let Some(hd) = home::home_dir() {
            roots.push(hd.join("devserve"));
        }
    }
    roots
}

fn resolve_bundle_root(flag: Option<PathBuf>, roots: &[PathBuf]) -> Option<PathBuf> {
    if let Some(dir) = flag {
        return dir.is_dir().then_some(dir);
    }
    roots
        .iter()
        .map(|r| r.join("bundles"))
        .find(|c| c.is_dir())
}

fn run(cli: Cli, host: &str) -> Result<(), ServerError> {
    let roots = resolve_source_roots(&cli.source_roots);
    let bundle_root = resolve_bundle_root(cli.bundle_root.clone(), &roots).ok_or_else(|| {
        ServerError::Message(
            "no bundle root found.\nEither install bundles under a source root (DEVSERVE_PATH or --source-root) or pass --bundle-root.".to_string(),
        )
    })?;

    if cli.debug {
        eprintln!(
            "devserve: build={} target={} profile={} rust={} ver={}",
            env!("DEVSERVE_BUILD_DATE"),
            env!("DEVSERVE_BUILD_TARGET"),
            env!("DEVSERVE_BUILD_PROFILE"),
            env!("DEVSERVE_BUILD_RUSTC"),
            env!("CARGO_PKG_VERSION")
        );
        eprintln!("devserve: bundle root {}", bundle_root.display());
    }

    let fs = Arc::new(ChainedFs::initialize(&bundle_root, cli.debug)?);
    let handle = start_server(host, cli.port, fs.clone(), roots.clone(), cli.debug)?;
    let ctx = handle.context();

    let _scanner = BundleScanner::start(fs, roots);
    let _reset = start_rate_reset(ctx.rate.clone());

    if ctx.is_loopback() {
        println!("http://{}:{}", ctx.host, ctx.port);
    } else {
        println!(
            "http://{}:{}/login?MAGIC={}",
            ctx.host,
            ctx.port,
            ctx.secret.as_deref().unwrap_or_default()
        );
    }

    handle.join();
    Ok(())
}

fn main() -> ExitCode {
    // Best-effort .env load; explicit environment always wins.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let host = env::var("DEVSERVE_HOST")
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| LOOPBACK_HOST.to_string());

    match run(cli, &host) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("devserve: {}", display_for_server_error(&e));
            ExitCode::from(exit_code_for_server_error(&e))
        }
    }
}
