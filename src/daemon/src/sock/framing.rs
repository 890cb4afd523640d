//! Control-socket framing: a 4-byte big-endian length prefix followed by a
//! `serde_json` payload (SPEC_FULL.md "Control socket wire format"). The
//! write side loops until the whole frame lands or the socket errors —
//! Open Question (c) calls out `original_source/lib/io_buffer.c`'s
//! short-write bug by name and requires this not be replicated; `write_all`
//! already loops to completion, matching `lib/ipc.rs`'s `ipc_send`.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::error::DaemonError;

/// Refuses to allocate a receive buffer larger than this for an unauthenticated
/// peer (teacher's `IPC_SAFE_SIZE`).
const SAFE_FRAME_SIZE: usize = 10 * 1024 * 1024;

pub(crate) async fn write_frame(stream: &mut UnixStream, payload: &[u8]) -> Result<(), DaemonError> {
    stream.write_u32(payload.len() as u32).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

/// Reads one frame. `Ok(None)` means the peer closed the connection cleanly.
pub(crate) async fn read_frame(stream: &mut UnixStream) -> Result<Option<Vec<u8>>, DaemonError> {
    let len = match stream.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    if len > SAFE_FRAME_SIZE {
        return Err(format!("control-socket frame of {len} bytes exceeds the {SAFE_FRAME_SIZE}-byte limit").into());
    }
    let mut buf = vec![0u8; len];
    match stream.read_exact(&mut buf).await {
        Ok(_) => Ok(Some(buf)),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(None),
        Err(e) => Err(e.into()),
    }
}
