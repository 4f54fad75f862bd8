//! Error mapping guide:
//! - Map io::ErrorKind::NotFound to exit code 2 (missing bundle root or unusable listener); all others to 1.
//! - Prefer ServerError for internal clarity while preserving user-visible strings via display_* helpers.
use std::io;

/// Map an io::Error to a process exit code:
/// - 2 for NotFound (bundle root or source root missing at startup)
/// - 1 for all other errors
pub fn exit_code_for_io_error(e: &io::Error) -> u8 {
    if e.kind() == io::ErrorKind::NotFound {
        2
    } else {
        1
    }
}

/// Lightweight error enum to improve internal error clarity without changing external messages.
#[derive(Debug)]
pub enum ServerError {
    Io(std::io::Error),
    Message(String),
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::Io(e)
    }
}

/// Convert ServerError to exit code (parity with io::Error mapping).
pub fn exit_code_for_server_error(e: &ServerError) -> u8 {
    match e {
        ServerError::Io(ioe) => exit_code_for_io_error(ioe),
        ServerError::Message(_) => 1,
    }
}

/// Render a user-facing string for ServerError.
pub fn display_for_server_error(e: &ServerError) -> String {
    match e {
        ServerError::Io(ioe) => ioe.to_string(),
        ServerError::Message(s) => s.clone(),
    }
}
