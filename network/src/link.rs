//! Per-peer send and receive pipelines.
//!
//! Each connected peer gets one sender task (outbound queue → frame
//! writer) and one receiver task (frame reader → inbound queue). The two
//! tasks are scheduled independently, so a slow or stalled peer cannot
//! starve another peer's link.
//!
//! Lifecycle signalling is out of band, never on the wire:
//! - the sender stops after draining everything queued ahead of an
//!   explicit [`Outbound::Flush`] marker (or once every producer handle
//!   is gone);
//! - the receiver stops when the shutdown broadcast fires, checked at
//!   loop-top alongside the pending read;
//! - channel closure doubles as the liveness signal: a dead pipeline is
//!   observed by the façade as a closed queue, with no polling.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;

use conclave_types::PartyId;

use crate::error::{Direction, NetworkError};
use crate::wire;

/// An entry on a peer's outbound queue.
pub(crate) enum Outbound {
    /// A payload to frame and write.
    Payload(Vec<u8>),
    /// Stop marker queued by teardown. Payloads queued ahead of it are
    /// still written; the sender exits when it reaches the marker.
    Flush,
}

/// The sender+receiver pipeline pair serving one remote party.
pub(crate) struct PeerLink {
    party: PartyId,
    outbound: mpsc::UnboundedSender<Outbound>,
    /// Consumer side of the inbound queue; exclusively owned by the
    /// `receive` path.
    inbound: Mutex<mpsc::UnboundedReceiver<Vec<u8>>>,
    sender_task: Mutex<Option<JoinHandle<io::Result<()>>>>,
    receiver_task: Mutex<Option<JoinHandle<io::Result<()>>>>,
}

impl PeerLink {
    /// Split the channel into its two halves and spawn both pipelines.
    pub(crate) fn spawn(
        party: PartyId,
        stream: TcpStream,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        let (read_half, write_half) = stream.into_split();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        let sender_task = tokio::spawn(sender_loop(party, out_rx, write_half));
        let receiver_task = tokio::spawn(receiver_loop(party, read_half, in_tx, shutdown));

        Self {
            party,
            outbound: out_tx,
            inbound: Mutex::new(in_rx),
            sender_task: Mutex::new(Some(sender_task)),
            receiver_task: Mutex::new(Some(receiver_task)),
        }
    }

    /// Queue a payload for transmission. Never blocks. Fails if the
    /// sender pipeline has already terminated.
    pub(crate) fn enqueue(&self, payload: Vec<u8>) -> Result<(), NetworkError> {
        self.outbound
            .send(Outbound::Payload(payload))
            .map_err(|_| NetworkError::LinkFailed {
                party: self.party,
                direction: Direction::Send,
            })
    }

    /// Ask the sender to drain its queue and stop. A sender that already
    /// terminated is left alone.
    pub(crate) fn request_flush(&self) {
        let _ = self.outbound.send(Outbound::Flush);
    }

    /// Next inbound payload, in arrival order. `None` once the receiver
    /// pipeline has terminated and the queue is drained.
    pub(crate) async fn next_inbound(&self) -> Option<Vec<u8>> {
        self.inbound.lock().await.recv().await
    }

    /// Await both pipeline tasks, logging (never raising) any errors they
    /// carried out of the session.
    pub(crate) async fn join(&self) {
        if let Some(handle) = self.sender_task.lock().await.take() {
            log_pipeline_exit(self.party, "sender", handle.await);
        }
        if let Some(handle) = self.receiver_task.lock().await.take() {
            log_pipeline_exit(self.party, "receiver", handle.await);
        }
    }
}

fn log_pipeline_exit(
    party: PartyId,
    pipeline: &str,
    result: Result<io::Result<()>, tokio::task::JoinError>,
) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::warn!(party, pipeline, error = %e, "pipeline failed during session");
        }
        Err(e) => {
            tracing::warn!(party, pipeline, error = %e, "pipeline task aborted");
        }
    }
}

/// Serialize queued payloads as frames, in submission order, until the
/// flush marker (or the loss of every producer handle).
async fn sender_loop<W>(
    party: PartyId,
    mut queue: mpsc::UnboundedReceiver<Outbound>,
    mut writer: W,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(entry) = queue.recv().await {
        match entry {
            Outbound::Payload(payload) => wire::write_frame(&mut writer, &payload).await?,
            Outbound::Flush => break,
        }
    }
    tracing::debug!(party, "sender pipeline stopped");
    Ok(())
}

/// Decode arriving frames onto the inbound queue until stopped.
///
/// The shutdown signal is raced against the pending read, so teardown is
/// never stuck behind a peer that stops mid-frame. A read failure while
/// no stop was requested terminates the pipeline with the error.
async fn receiver_loop<R>(
    party: PartyId,
    mut reader: R,
    queue: mpsc::UnboundedSender<Vec<u8>>,
    mut shutdown: broadcast::Receiver<()>,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
{
    loop {
        tokio::select! {
            _ = shutdown.recv() => {
                tracing::debug!(party, "receiver pipeline stopped");
                return Ok(());
            }
            frame = wire::read_frame(&mut reader) => {
                let payload = frame?;
                if queue.send(payload).is_err() {
                    // Consumer side is gone; nothing left to deliver to.
                    return Ok(());
                }
            }
        }
    }
}
