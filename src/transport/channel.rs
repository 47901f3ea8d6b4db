use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::codec::{BytesCodec, FramedWrite};
use tracing::{debug, instrument};

use crate::error::{constants, ProtocolError, Result};
use crate::transport::{PeerIdentity, Transport};
use crate::utils::metrics::global_metrics;

/// Instructions consumed by the writer task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCommand {
    Write(Bytes),
    Close,
}

/// [`Transport`] backed by an unbounded queue.
///
/// Writes and the close request are ordered on the same queue, so a close
/// issued right after a write still lets that write reach the peer.
#[derive(Debug)]
pub struct ChannelTransport {
    peer: PeerIdentity,
    tx: mpsc::UnboundedSender<TransportCommand>,
    closed: AtomicBool,
}

impl ChannelTransport {
    /// Create a transport and the receiving end of its command queue
    pub fn new(peer: PeerIdentity) -> (Arc<Self>, mpsc::UnboundedReceiver<TransportCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let transport = Arc::new(Self {
            peer,
            tx,
            closed: AtomicBool::new(false),
        });
        (transport, rx)
    }
}

impl Transport for ChannelTransport {
    fn write(&self, data: Bytes) -> Result<()> {
        if self.is_closed() {
            return Err(ProtocolError::TransportError(
                constants::ERR_TRANSPORT_CLOSED.to_string(),
            ));
        }

        self.tx
            .send(TransportCommand::Write(data))
            .map_err(|_| ProtocolError::TransportError(constants::ERR_TRANSPORT_CLOSED.to_string()))
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            // Writer already gone means the socket is gone too
            let _ = self.tx.send(TransportCommand::Close);
        }
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn peer(&self) -> &PeerIdentity {
        &self.peer
    }
}

/// Drain a transport's command queue into `writer` until it is closed.
///
/// Returns once a `Close` command arrives or every sender is dropped; the
/// writer is flushed and shut down either way.
#[instrument(skip(writer, commands, peer), fields(peer = %peer))]
pub async fn run_writer<W>(
    writer: W,
    commands: mpsc::UnboundedReceiver<TransportCommand>,
    peer: PeerIdentity,
) -> Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, BytesCodec::new());
    let mut commands = UnboundedReceiverStream::new(commands);

    while let Some(command) = commands.next().await {
        match command {
            TransportCommand::Write(data) => {
                let len = data.len() as u64;
                sink.send(data).await?;
                global_metrics().bytes_written(len);
            }
            TransportCommand::Close => break,
        }
    }

    debug!("Writer finished, shutting down write half");
    SinkExt::<Bytes>::close(&mut sink).await?;
    Ok(())
}
