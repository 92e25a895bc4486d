//! Transport session: one physical connection to one endpoint.
//!
//! A session is a background task that owns the stream exclusively. It
//! drains an outbox channel of pre-encoded frames, parses inbound frames
//! from the read side, and reports exactly one close event when the
//! connection ends. Every event carries the session's generation number so
//! late events from a superseded session can be ignored upstream.

use liveline_core::{JsonCodec, TaskProvider};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use crate::events::DisconnectReason;
use crate::wire::{self, Operation};

/// An event raised by a session task.
#[derive(Debug)]
pub(crate) struct SessionEvent {
    /// Generation of the session that produced the event.
    pub generation: u64,
    /// What happened.
    pub kind: SessionEventKind,
}

#[derive(Debug)]
pub(crate) enum SessionEventKind {
    /// A complete inbound operation frame arrived.
    Inbound(Operation),
    /// The session ended. Raised exactly once per session.
    Closed(DisconnectReason),
}

/// Handle to a running session task.
///
/// Dropping the handle closes the outbox, which the task treats as a
/// deliberate local close.
#[derive(Debug)]
pub(crate) struct SessionHandle {
    generation: u64,
    outbox: mpsc::UnboundedSender<Vec<u8>>,
}

impl SessionHandle {
    #[cfg(test)]
    pub(crate) fn for_tests(generation: u64, outbox: mpsc::UnboundedSender<Vec<u8>>) -> Self {
        Self { generation, outbox }
    }

    /// Generation of the session this handle controls.
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Hand a pre-encoded frame to the session for delivery.
    ///
    /// Never raises: returns `false` if the session has already ended, in
    /// which case the frame is lost (at-most-once delivery).
    pub(crate) fn try_send(&self, frame: Vec<u8>) -> bool {
        self.outbox.send(frame).is_ok()
    }
}

/// Spawn the background task for a freshly connected stream.
pub(crate) fn spawn_session<T, S>(
    task: &T,
    generation: u64,
    stream: S,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
) -> SessionHandle
where
    T: TaskProvider,
    S: AsyncRead + AsyncWrite + Unpin + 'static,
{
    let (outbox_tx, outbox_rx) = mpsc::unbounded_channel();
    task.spawn_task(
        &format!("session-{generation}"),
        session_task(generation, stream, outbox_rx, events_tx),
    );
    SessionHandle {
        generation,
        outbox: outbox_tx,
    }
}

async fn session_task<S>(
    generation: u64,
    mut stream: S,
    mut outbox_rx: mpsc::UnboundedReceiver<Vec<u8>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
) where
    S: AsyncRead + AsyncWrite + Unpin + 'static,
{
    let codec = JsonCodec;
    let mut read_buffer: Vec<u8> = Vec::with_capacity(4096);

    let reason = 'io: loop {
        tokio::select! {
            maybe_frame = outbox_rx.recv() => {
                match maybe_frame {
                    Some(frame) => {
                        if let Err(e) = stream.write_all(&frame).await {
                            tracing::warn!(generation, "write failed, frame dropped: {}", e);
                            break 'io DisconnectReason::TransportClose;
                        }
                    }
                    // Handle dropped: deliberate local teardown.
                    None => break 'io DisconnectReason::LocalClose,
                }
            }

            read_result = async {
                let mut buf = vec![0u8; 4096];
                stream.read(&mut buf).await.map(|n| (buf, n))
            } => {
                match read_result {
                    Ok((_, 0)) => break 'io DisconnectReason::ServerClose,
                    Ok((buf, n)) => {
                        read_buffer.extend_from_slice(&buf[..n]);
                        loop {
                            match wire::try_decode_frame(&codec, &read_buffer) {
                                Ok(Some((op, consumed))) => {
                                    read_buffer.drain(..consumed);
                                    let event = SessionEvent {
                                        generation,
                                        kind: SessionEventKind::Inbound(op),
                                    };
                                    if events_tx.send(event).is_err() {
                                        return;
                                    }
                                }
                                Ok(None) => break,
                                Err(e) => {
                                    tracing::warn!(
                                        generation,
                                        "wire error, tearing down connection: {}",
                                        e
                                    );
                                    break 'io DisconnectReason::TransportClose;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        tracing::debug!(generation, "read failed: {}", e);
                        break 'io DisconnectReason::TransportClose;
                    }
                }
            }
        }
    };

    let _ = events_tx.send(SessionEvent {
        generation,
        kind: SessionEventKind::Closed(reason),
    });
}
