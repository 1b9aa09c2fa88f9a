// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Frame codec: a big-endian `u32` payload length followed by that many
//! bytes of JSON.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Build version both sides compare in `Hello`.
pub const PROTOCOL_VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

/// Largest accepted payload. A full `DISPLAY WORKER ALL` on a busy server is
/// the biggest thing sent.
pub const MAX_FRAME_LEN: usize = 4 << 20;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame of {0} bytes is over the {MAX_FRAME_LEN} byte limit")]
    FrameTooLarge(usize),

    #[error("peer closed the connection")]
    ConnectionClosed,

    #[error("no frame within {0:?}")]
    Timeout(Duration),
}

fn frame_len(len: usize) -> Result<u32, ProtocolError> {
    match u32::try_from(len) {
        Ok(prefix) if len <= MAX_FRAME_LEN => Ok(prefix),
        _ => Err(ProtocolError::FrameTooLarge(len)),
    }
}

/// Serialize `msg` as one complete frame, prefix included.
pub fn to_frame<T: Serialize>(msg: &T) -> Result<Vec<u8>, ProtocolError> {
    let mut frame = vec![0u8; 4];
    serde_json::to_writer(&mut frame, msg)?;
    let prefix = frame_len(frame.len() - 4)?;
    frame[..4].copy_from_slice(&prefix.to_be_bytes());
    Ok(frame)
}

/// Read one frame and return its payload.
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Vec<u8>, ProtocolError> {
    let len = match reader.read_u32().await {
        Ok(len) => len as usize,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(ProtocolError::ConnectionClosed)
        }
        Err(e) => return Err(e.into()),
    };
    frame_len(len)?;
    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// [`read_frame`], giving up after `timeout`.
pub async fn recv_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    timeout: Duration,
) -> Result<Vec<u8>, ProtocolError> {
    tokio::time::timeout(timeout, read_frame(reader))
        .await
        .map_err(|_| ProtocolError::Timeout(timeout))?
}

/// Receive one frame and decode it as `T`.
pub async fn recv<R, T>(reader: &mut R, timeout: Duration) -> Result<T, ProtocolError>
where
    R: AsyncRead + Unpin,
    T: DeserializeOwned,
{
    let payload = recv_frame(reader, timeout).await?;
    Ok(serde_json::from_slice(&payload)?)
}

/// Send `msg` as one frame and flush it.
pub async fn send<W, T>(writer: &mut W, msg: &T, timeout: Duration) -> Result<(), ProtocolError>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let frame = to_frame(msg)?;
    let write = async {
        writer.write_all(&frame).await?;
        writer.flush().await
    };
    tokio::time::timeout(timeout, write)
        .await
        .map_err(|_| ProtocolError::Timeout(timeout))??;
    Ok(())
}
