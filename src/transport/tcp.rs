//! TCP listener for the protocol switch.
//!
//! Each accepted connection gets its own task that owns a [`Multiplexer`],
//! reads fragments in order and feeds them to it one at a time. Output goes
//! through a [`ChannelTransport`] drained by a separate writer task.

use futures::StreamExt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::codec::{BytesCodec, FramedRead};
use tracing::{debug, error, info, instrument, warn};

use crate::config::{ServerConfig, SwitchConfig};
use crate::error::Result;
use crate::protocol::detector::{Detector, RuleDetector};
use crate::protocol::factory::{DefaultHandlerFactory, HandlerFactory};
use crate::protocol::multiplexer::Multiplexer;
use crate::registry::ResourceRegistry;
use crate::transport::channel::{run_writer, ChannelTransport};
use crate::transport::{PeerIdentity, Transport};
use crate::utils::metrics::global_metrics;

/// Bind `config.server.address` and serve until CTRL+C
#[instrument(skip(config, registry), fields(address = %config.server.address))]
pub async fn start_server(config: SwitchConfig, registry: Arc<ResourceRegistry>) -> Result<()> {
    config.validate_strict()?;

    let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>(1);

    tokio::spawn(async move {
        if let Ok(()) = tokio::signal::ctrl_c().await {
            info!("Received CTRL+C signal, shutting down");
            let _ = shutdown_tx.send(()).await;
        }
    });

    let listener = TcpListener::bind(&config.server.address).await?;
    start_server_with_shutdown(listener, config, registry, shutdown_rx).await
}

/// Serve on an already bound listener with the standard detector and handlers
pub async fn start_server_with_shutdown(
    listener: TcpListener,
    config: SwitchConfig,
    registry: Arc<ResourceRegistry>,
    shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let detector: Arc<dyn Detector> =
        Arc::new(RuleDetector::new(config.detection, Arc::clone(&registry)));
    let factory: Arc<dyn HandlerFactory> = Arc::new(DefaultHandlerFactory::new(registry));

    serve(listener, detector, factory, config.server, shutdown_rx).await
}

/// Accept loop with graceful shutdown.
///
/// On shutdown the listener stops accepting and waits up to
/// `server.shutdown_timeout` for open connections to finish.
pub async fn serve(
    listener: TcpListener,
    detector: Arc<dyn Detector>,
    factory: Arc<dyn HandlerFactory>,
    server: ServerConfig,
    mut shutdown_rx: mpsc::Receiver<()>,
) -> Result<()> {
    let local_addr = listener.local_addr()?;
    info!(address = %local_addr, "Listening for connections");

    let active_connections = Arc::new(AtomicUsize::new(0));

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("Shutting down server. Waiting for connections to close...");
                let timeout = tokio::time::sleep(server.shutdown_timeout);
                tokio::pin!(timeout);

                loop {
                    let connections = active_connections.load(Ordering::Acquire);
                    if connections == 0 {
                        info!("All connections closed, shutting down");
                        break;
                    }

                    tokio::select! {
                        _ = &mut timeout => {
                            warn!(connections, "Shutdown timeout reached, forcing exit");
                            break;
                        }
                        _ = tokio::time::sleep(Duration::from_millis(50)) => {
                            debug!(connections, "Waiting for connections to close");
                        }
                    }
                }

                global_metrics().log_metrics();
                return Ok(());
            }

            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, addr)) => {
                        if active_connections.load(Ordering::Acquire) >= server.max_connections {
                            warn!(peer = %addr, limit = server.max_connections, "Connection limit reached, refusing connection");
                            global_metrics().connection_refused();
                            drop(stream);
                            continue;
                        }

                        if let Err(e) = stream.set_nodelay(true) {
                            debug!(peer = %addr, error = %e, "Failed to set TCP_NODELAY");
                        }

                        active_connections.fetch_add(1, Ordering::AcqRel);
                        let active_connections = Arc::clone(&active_connections);
                        let detector = Arc::clone(&detector);
                        let factory = Arc::clone(&factory);
                        let read_buffer_size = server.read_buffer_size;

                        tokio::spawn(async move {
                            if let Err(e) = serve_connection(
                                stream,
                                PeerIdentity::from(addr),
                                detector,
                                factory,
                                read_buffer_size,
                            )
                            .await
                            {
                                debug!(peer = %addr, error = %e, "Connection ended with error");
                            }
                            active_connections.fetch_sub(1, Ordering::AcqRel);
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "Error accepting connection");
                    }
                }
            }
        }
    }
}

/// Drive one connection from open to close.
///
/// Fragments are fed to the multiplexer strictly in arrival order. Reading
/// stops as soon as the transport is closed, by the peer, by the handler, or
/// by the multiplexer rejecting the connection.
#[instrument(skip(stream, peer, detector, factory), fields(peer = %peer))]
pub async fn serve_connection<S>(
    stream: S,
    peer: PeerIdentity,
    detector: Arc<dyn Detector>,
    factory: Arc<dyn HandlerFactory>,
    read_buffer_size: usize,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    global_metrics().connection_established();

    let (read_half, write_half) = tokio::io::split(stream);
    let (transport, commands) = ChannelTransport::new(peer.clone());
    let mut writer = tokio::spawn(run_writer(write_half, commands, peer.clone()));

    let mut multiplexer = Multiplexer::new(detector, factory);
    multiplexer.on_open(Arc::clone(&transport) as Arc<dyn Transport>, peer.clone());

    let mut reader = FramedRead::with_capacity(read_half, BytesCodec::new(), read_buffer_size);
    let mut writer_result = None;

    while !transport.is_closed() {
        tokio::select! {
            finished = &mut writer => {
                writer_result = Some(finished);
                break;
            }
            frame = reader.next() => match frame {
                Some(Ok(fragment)) => {
                    if let Err(e) = multiplexer.on_data(&fragment) {
                        debug!(error = %e, "Multiplexer stopped the connection");
                        break;
                    }
                }
                Some(Err(e)) => {
                    warn!(error = %e, "Read error");
                    break;
                }
                None => {
                    debug!("Peer closed the connection");
                    break;
                }
            }
        }
    }

    multiplexer.on_close();
    transport.close();
    drop(transport);

    let writer_result = match writer_result {
        Some(result) => result,
        None => writer.await,
    };

    global_metrics().connection_closed();

    match writer_result {
        Ok(result) => result,
        Err(e) => {
            error!(error = %e, "Writer task failed");
            Ok(())
        }
    }
}
