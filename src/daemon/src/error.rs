//! Daemon-local error type, wrapping [`mstp_proto::MstpError`] plus the I/O
//! and codec errors the adaptation layer itself can raise (ambient stack,
//! SPEC_FULL.md "Error handling" — same shape as the teacher's `CliError`
//! wrapping `NipartError` plus `serde_yaml::Error`/`std::io::Error`).

use mstp_proto::MstpError;

#[derive(Debug)]
pub struct DaemonError {
    msg: String,
}

impl std::fmt::Display for DaemonError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for DaemonError {}

impl From<MstpError> for DaemonError {
    fn from(e: MstpError) -> Self {
        Self { msg: format!("{e}") }
    }
}

impl From<std::io::Error> for DaemonError {
    fn from(e: std::io::Error) -> Self {
        Self { msg: format!("I/O error: {e}") }
    }
}

impl From<serde_json::Error> for DaemonError {
    fn from(e: serde_json::Error) -> Self {
        Self { msg: format!("malformed control-socket payload: {e}") }
    }
}

impl From<nix::Error> for DaemonError {
    fn from(e: nix::Error) -> Self {
        Self { msg: format!("socket error: {e}") }
    }
}

impl From<String> for DaemonError {
    fn from(msg: String) -> Self {
        Self { msg }
    }
}

impl From<&str> for DaemonError {
    fn from(msg: &str) -> Self {
        Self { msg: msg.to_string() }
    }
}
