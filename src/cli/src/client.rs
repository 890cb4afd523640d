//! Control-socket client (grounded on `src/lib/client.rs`'s `NipartClient`:
//! a thin struct around one connection, each call a `send` immediately
//! followed by the matching `recv`). `mstpd` answers one request per
//! connection, so `call` opens a fresh `UnixStream` every time rather than
//! keeping one alive across invocations — `mstpctl` is a one-shot CLI, not
//! a long-lived client.

use tokio::net::UnixStream;

use mstp_proto::protocol::{Reply, Request};

use crate::error::CliError;
use crate::framing::{read_frame, write_frame};

pub(crate) struct MstpClient {
    socket_path: std::path::PathBuf,
}

impl MstpClient {
    pub(crate) const DEFAULT_SOCKET_PATH: &'static str = "/run/mstpd.sock";

    pub(crate) fn new(socket_path: impl Into<std::path::PathBuf>) -> Self {
        Self { socket_path: socket_path.into() }
    }

    pub(crate) async fn call(&self, request: Request) -> Result<Reply, CliError> {
        let mut stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|e| CliError::from(format!("connecting to {}: {e}", self.socket_path.display())))?;
        let payload = serde_json::to_vec(&request)?;
        write_frame(&mut stream, &payload).await?;
        let reply_bytes = read_frame(&mut stream).await?;
        let reply: Reply = serde_json::from_slice(&reply_bytes)?;
        match reply {
            Reply::Error { kind, msg } => Err(CliError::from(format!("{kind}: {msg}"))),
            reply => Ok(reply),
        }
    }
}
