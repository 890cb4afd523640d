//! Control-socket framing: a 4-byte big-endian length prefix followed by a
//! `serde_json` payload. Deliberately duplicated from `mstpd`'s
//! `sock::framing` rather than shared — this workspace has no fourth
//! library crate both binaries could depend on (see DESIGN.md), so the two
//! sides agree on the wire format by convention, the way `mstpd`'s
//! `sock::framing` and `mstp-proto`'s `protocol` module already agree on
//! the opcode shapes without sharing code.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::UnixStream;

use crate::error::CliError;

const SAFE_FRAME_SIZE: usize = 10 * 1024 * 1024;

pub(crate) async fn write_frame(stream: &mut UnixStream, payload: &[u8]) -> Result<(), CliError> {
    stream.write_u32(payload.len() as u32).await?;
    stream.write_all(payload).await?;
    stream.flush().await?;
    Ok(())
}

pub(crate) async fn read_frame(stream: &mut UnixStream) -> Result<Vec<u8>, CliError> {
    let len = stream.read_u32().await? as usize;
    if len > SAFE_FRAME_SIZE {
        return Err(format!("control-socket frame of {len} bytes exceeds the {SAFE_FRAME_SIZE}-byte limit").into());
    }
    let mut buf = vec![0u8; len];
    stream.read_exact(&mut buf).await?;
    Ok(buf)
}
