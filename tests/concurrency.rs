#![allow(clippy::expect_used, clippy::unwrap_used)]

use protocol_switch::config::SwitchConfig;
use protocol_switch::core::packet::Packet;
use protocol_switch::registry::ResourceRegistry;
use protocol_switch::transport::tcp::start_server_with_shutdown;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::timeout;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_mixed_protocol_connections() {
    let config = SwitchConfig::default();
    let registry = Arc::new(ResourceRegistry::from_config(&config.resources).unwrap());
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let server = tokio::spawn(start_server_with_shutdown(
        listener,
        config,
        registry,
        shutdown_rx,
    ));

    let connections = 200usize;
    let mut tasks = JoinSet::new();
    for i in 0..connections {
        tasks.spawn(async move {
            let mut stream = TcpStream::connect(addr).await.unwrap();
            match i % 3 {
                0 => {
                    stream
                        .write_all(b"GET /index.html HTTP/1.1\r\n\r\n")
                        .await
                        .unwrap();
                    let mut response = Vec::new();
                    stream.read_to_end(&mut response).await.unwrap();
                    assert!(response.starts_with(b"HTTP/1.1 200 OK\r\n"));
                }
                1 => {
                    stream.write_all(b"I\n").await.unwrap();
                    let mut response = Vec::new();
                    stream.read_to_end(&mut response).await.unwrap();
                    assert_eq!(
                        response,
                        protocol_switch::config::DEFAULT_INDEX_HTML.as_bytes()
                    );
                }
                _ => {
                    let packet = Packet::new(vec![(i & 0xFF) as u8; i]).to_bytes();
                    stream.write_all(&packet).await.unwrap();
                    let mut echoed = vec![0u8; packet.len()];
                    stream.read_exact(&mut echoed).await.unwrap();
                    assert_eq!(echoed, packet);
                }
            }
        });
    }

    let all = async {
        while let Some(res) = tasks.join_next().await {
            res.unwrap();
        }
    };
    timeout(Duration::from_secs(30), all)
        .await
        .expect("connections should complete");

    shutdown_tx.send(()).await.unwrap();
    timeout(Duration::from_secs(15), server)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
}
