//! Control-socket listener. Holds every connected client's stream directly
//! and multiplexes reads with a per-call `FuturesUnordered` instead of
//! `tokio::spawn`-ing a task per connection, so the whole daemon stays on
//! the single logical thread spec.md §5 requires.

use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use futures_util::stream::{FuturesUnordered, StreamExt};
use mstp_proto::protocol::{Reply, Request};
use tokio::net::{UnixListener, UnixStream};

use super::framing;
use crate::error::DaemonError;

pub(crate) struct ControlListener {
    listener: UnixListener,
    conns: Vec<UnixStream>,
}

impl ControlListener {
    pub(crate) fn bind(path: &Path) -> Result<Self, DaemonError> {
        std::fs::remove_file(path).ok();
        let listener = UnixListener::bind(path)?;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o660))?;
        Ok(Self { listener, conns: Vec::new() })
    }

    pub(crate) async fn accept(&mut self) -> Result<(), DaemonError> {
        let (stream, _addr) = self.listener.accept().await?;
        self.conns.push(stream);
        Ok(())
    }

    /// Waits for the next complete request from any connected client.
    /// Never resolves while there are no connections, so it is safe to race
    /// against `accept()` in the same `select!` without busy-looping.
    pub(crate) async fn next_request(&mut self) -> (usize, Result<Option<Request>, DaemonError>) {
        if self.conns.is_empty() {
            std::future::pending::<()>().await;
            unreachable!("pending future never resolves");
        }
        let mut pending = FuturesUnordered::new();
        for (idx, conn) in self.conns.iter_mut().enumerate() {
            pending.push(async move {
                let frame = framing::read_frame(conn).await;
                (idx, frame)
            });
        }
        let (idx, frame) = pending.next().await.expect("pending holds at least one connection");
        let decoded = match frame {
            Ok(None) => Ok(None),
            Ok(Some(bytes)) => serde_json::from_slice::<Request>(&bytes).map(Some).map_err(DaemonError::from),
            Err(e) => Err(e),
        };
        (idx, decoded)
    }

    pub(crate) async fn send_reply(&mut self, idx: usize, reply: &Reply) -> Result<(), DaemonError> {
        let bytes = serde_json::to_vec(reply)?;
        let conn = self.conns.get_mut(idx).ok_or("control-socket reply to a connection that no longer exists")?;
        framing::write_frame(conn, &bytes).await
    }

    pub(crate) fn drop_conn(&mut self, idx: usize) {
        if idx < self.conns.len() {
            self.conns.swap_remove(idx);
        }
    }
}
