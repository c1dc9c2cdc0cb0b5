//! Native-messaging session: decode requests from the extension, hand them
//! to the background task and write responses, browser commands and state
//! events back on a single writer.

use anyhow::Result;
use log::{error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::{broadcast::error::RecvError, mpsc},
};
use tokio_util::sync::CancellationToken;

use crate::{
    background::BackgroundHandle,
    browser::BrowserCommand,
    native_messaging::{read_frame, write_message},
    protocol::{decode_incoming, HostMessage, Response},
};

/// Serve one extension connection until it closes, then cancel `shutdown`.
///
/// Requests are handled strictly in arrival order, so responses leave in
/// the same order. Commands and events are interleaved as they happen.
pub async fn serve<R, W>(
    handle: BackgroundHandle,
    mut commands: mpsc::UnboundedReceiver<BrowserCommand>,
    mut reader: R,
    writer: W,
    shutdown: CancellationToken,
) -> Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<HostMessage>();

    let writer_task = tokio::spawn(async move {
        let mut writer = writer;
        while let Some(message) = out_rx.recv().await {
            if let Err(err) = write_message(&mut writer, &message).await {
                error!("Failed to write to extension: {err:#}");
                break;
            }
        }
    });

    let command_tx = out_tx.clone();
    let command_task = tokio::spawn(async move {
        while let Some(command) = commands.recv().await {
            if command_tx.send(HostMessage::Command { command }).is_err() {
                break;
            }
        }
    });

    let event_tx = out_tx.clone();
    let mut events = handle.subscribe();
    let event_shutdown = shutdown.clone();
    let event_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                received = events.recv() => match received {
                    Ok(event) => {
                        if event_tx.send(HostMessage::Event { event }).is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!("Dropped {skipped} state event(s) for a slow writer");
                    }
                    Err(RecvError::Closed) => break,
                },
                _ = event_shutdown.cancelled() => break,
            }
        }
    });

    let result = read_requests(&handle, &mut reader, &out_tx).await;

    shutdown.cancel();
    drop(handle);
    drop(out_tx);

    for task in [event_task, command_task, writer_task] {
        if let Err(err) = task.await {
            error!("Host task panicked: {err:?}");
        }
    }
    result
}

async fn read_requests<R>(
    handle: &BackgroundHandle,
    reader: &mut R,
    out: &mpsc::UnboundedSender<HostMessage>,
) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    while let Some(frame) = read_frame(reader).await? {
        let incoming = match decode_incoming(&frame) {
            Ok(incoming) => incoming,
            Err(err) => {
                warn!("Dropping malformed message: {err:#}");
                continue;
            }
        };

        let body = match incoming.request {
            Ok(request) => handle.request(request).await?,
            Err(err) if incoming.id.is_some() => Some(Response::failure(&err)),
            Err(err) => {
                warn!("Dropping request without id: {err:#}");
                None
            }
        };

        if let Some(body) = body {
            if out
                .send(HostMessage::Response {
                    id: incoming.id,
                    body,
                })
                .is_err()
            {
                break;
            }
        }
    }

    info!("Extension closed the connection");
    Ok(())
}
