//! CLI-local error type, wrapping the daemon's structured `Reply::Error`
//! plus the I/O and codec errors the control-socket client itself can
//! raise (same shape as the teacher's `CliError`).

#[derive(Clone, Debug)]
pub(crate) struct CliError {
    msg: String,
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.msg)
    }
}

impl std::error::Error for CliError {}

impl From<mstp_proto::MstpError> for CliError {
    fn from(e: mstp_proto::MstpError) -> Self {
        Self { msg: format!("{e}") }
    }
}

impl From<std::io::Error> for CliError {
    fn from(e: std::io::Error) -> Self {
        Self { msg: format!("I/O error: {e}") }
    }
}

impl From<serde_json::Error> for CliError {
    fn from(e: serde_json::Error) -> Self {
        Self { msg: format!("malformed control-socket payload: {e}") }
    }
}

impl From<&str> for CliError {
    fn from(msg: &str) -> Self {
        Self { msg: msg.to_string() }
    }
}

impl From<String> for CliError {
    fn from(msg: String) -> Self {
        Self { msg }
    }
}
