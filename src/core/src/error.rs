// Try not to implement From for MstpError here unless you are sure this
// error should always convert to a certain ErrorKind.

use serde::{Deserialize, Serialize};

/// Classification of a [`MstpError`], following the error kinds of
/// spec.md §7.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// §7.1 MalformedFrame: a BPDU failed codec validation.
    MalformedFrame,
    /// §7.2 UnknownEntity: event referenced an unknown bridge/port/tree.
    UnknownEntity,
    /// §7.3 OutOfRange: a configuration value is outside its bounds.
    OutOfRange,
    /// A `mode`/enum-like configuration value is not one of the accepted
    /// tokens (§7.3 carve-out: these are rejected, not clamped).
    InvalidArgument,
    /// §7.4 ResourceExhaustion: allocation failed while ingesting config.
    ResourceExhaustion,
    /// §7.5 KernelInterfaceError: an adaptation-layer callback failed.
    KernelInterfaceError,
    /// §7.6 InvariantViolation: a contract the core relies on was broken.
    /// Callers must abort the process after observing this kind.
    InvariantViolation,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MstpError {
    pub kind: ErrorKind,
    pub msg: String,
}

impl MstpError {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self { kind, msg: msg.into() }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind == ErrorKind::InvariantViolation
    }
}

impl std::fmt::Display for MstpError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind, self.msg)
    }
}

impl std::error::Error for MstpError {}

pub type MstpResult<T> = Result<T, MstpError>;
