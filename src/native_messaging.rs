//! Chrome native-messaging framing: a 4-byte length in native byte order
//! followed by that many bytes of UTF-8 JSON.

use std::io::ErrorKind;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Chrome refuses host messages larger than 1 MiB.
pub const MAX_MESSAGE_BYTES: usize = 1024 * 1024;

/// Read one frame. `Ok(None)` means the extension closed the pipe between
/// frames.
pub async fn read_frame<R>(reader: &mut R) -> Result<Option<Vec<u8>>>
where
    R: AsyncRead + Unpin,
{
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(err).context("failed to read message length"),
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_MESSAGE_BYTES {
        bail!("incoming message of {len} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit");
    }

    let mut payload = vec![0u8; len];
    reader
        .read_exact(&mut payload)
        .await
        .context("message ended before its declared length")?;
    Ok(Some(payload))
}

pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    if payload.len() > MAX_MESSAGE_BYTES {
        bail!(
            "outgoing message of {} bytes exceeds the {MAX_MESSAGE_BYTES} byte limit",
            payload.len()
        );
    }

    let len = payload.len() as u32;
    writer
        .write_all(&len.to_ne_bytes())
        .await
        .context("failed to write message length")?;
    writer
        .write_all(payload)
        .await
        .context("failed to write message body")?;
    writer.flush().await.context("failed to flush message")?;
    Ok(())
}

pub async fn write_message<W, T>(writer: &mut W, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize + ?Sized,
{
    let payload = serde_json::to_vec(message).context("failed to encode message")?;
    write_frame(writer, &payload).await
}
