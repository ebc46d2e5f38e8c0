// Server loop module
// Accepts connections until shutdown is requested

use hyper_util::server::graceful::GracefulShutdown;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;

use super::connection::accept_connection;
use super::signal::Shutdown;
use crate::config::PerformanceConfig;
use crate::handler::Handler;
use crate::logger;

/// Configuration for server loop behavior
pub struct ServerLoopConfig {
    pub performance: PerformanceConfig,
    pub shutdown: Shutdown,
}

/// Accepts connections on `listener` and serves them with `handler`
///
/// Once shutdown is requested the listener is closed and the loop waits for every accepted
/// connection to finish its current response before returning. Transfers are never cut short.
pub async fn start_server_loop<H>(listener: TcpListener, handler: Arc<H>, config: ServerLoopConfig)
where
    H: Handler + 'static,
{
    let active_connections = Arc::new(AtomicUsize::new(0));
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accept_result = listener.accept() => {
                match accept_result {
                    Ok((stream, peer_addr)) => {
                        accept_connection(
                            stream,
                            peer_addr,
                            &handler,
                            &active_connections,
                            &config.performance,
                            &graceful,
                        );
                    }
                    Err(e) => logger::log_error(&format!("Failed to accept connection: {e}")),
                }
            }

            () = config.shutdown.wait() => {
                logger::log_info("Update server stopped accepting connections");
                break;
            }
        }
    }

    drop(listener);
    let draining = active_connections.load(Ordering::SeqCst);
    if draining > 0 {
        logger::log_info(&format!("Waiting for {draining} connection(s) to finish"));
    }
    graceful.shutdown().await;
    logger::log_info("Update server stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FilesConfig, MetricsConfig};
    use crate::handler::{CompletionFileServer, InstrumentedServer, StaticFiles};
    use crate::metrics::ServerMetrics;
    use crate::server::listener::bind;
    use prometheus::Registry;
    use std::net::SocketAddr;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    async fn roundtrip(addr: SocketAddr, request: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(request.as_bytes()).await.unwrap();
        let mut response = Vec::new();
        stream.read_to_end(&mut response).await.unwrap();
        String::from_utf8_lossy(&response).into_owned()
    }

    struct Running {
        addr: SocketAddr,
        shutdown: Shutdown,
        metrics: Arc<ServerMetrics>,
        server: tokio::task::JoinHandle<()>,
    }

    fn start(files: FilesConfig) -> Running {
        let registry = Registry::new();
        let metrics = Arc::new(ServerMetrics::new(&registry, &MetricsConfig::default()).unwrap());
        let handler = Arc::new(InstrumentedServer::new(
            CompletionFileServer::new(StaticFiles::new(&files)),
            Arc::clone(&metrics),
        ));

        let listener = bind("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Shutdown::new();
        let config = ServerLoopConfig {
            performance: PerformanceConfig {
                keep_alive: true,
                max_connections: None,
            },
            shutdown: shutdown.clone(),
        };
        let server = tokio::spawn(start_server_loop(listener, handler, config));
        Running {
            addr,
            shutdown,
            metrics,
            server,
        }
    }

    #[tokio::test]
    async fn test_serves_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("update/r1/42")).unwrap();
        std::fs::write(dir.path().join("update/r1/42/delta.pack"), b"0123456789").unwrap();
        let Running {
            addr,
            shutdown,
            metrics,
            server,
        } = start(FilesConfig::with_root(dir.path()));

        let full = roundtrip(
            addr,
            "GET /update/r1/42/delta.pack HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(full.starts_with("HTTP/1.1 200 OK"), "{full}");
        assert!(full.ends_with("0123456789"), "{full}");

        let probe = roundtrip(
            addr,
            "GET /update/r1/42/delta.pack HTTP/1.1\r\nHost: test\r\nRange: bytes=10-\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(probe.starts_with("HTTP/1.1 200 OK"), "{probe}");
        assert!(probe.ends_with("\r\n\r\n"), "{probe}");

        let missing = roundtrip(
            addr,
            "GET /update/r1/43/delta.pack HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n",
        )
        .await;
        assert!(missing.starts_with("HTTP/1.1 404 Not Found"), "{missing}");

        assert_eq!(
            metrics
                .update_downloads_total
                .with_label_values(&["200", "r1", "42"])
                .get(),
            2
        );
        assert_eq!(metrics.in_flight.get(), 0);

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_lets_transfer_finish() {
        // Larger than loopback socket buffers, so the handler blocks on a slow reader
        const IMAGE_SIZE: usize = 32 * 1024 * 1024;

        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("images/r1")).unwrap();
        std::fs::write(dir.path().join("images/r1/clear.img"), vec![7u8; IMAGE_SIZE]).unwrap();
        let Running {
            addr,
            shutdown,
            metrics,
            server,
        } = start(FilesConfig::with_root(dir.path()));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /images/r1/clear.img HTTP/1.1\r\nHost: test\r\n\r\n")
            .await
            .unwrap();
        let mut status = [0u8; 15];
        stream.read_exact(&mut status).await.unwrap();
        assert_eq!(&status, b"HTTP/1.1 200 OK");

        shutdown.trigger();
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!server.is_finished());
        assert!(TcpStream::connect(addr).await.is_err());

        // Keep-alive was requested, the drained connection still closes afterwards
        let mut rest = Vec::new();
        stream.read_to_end(&mut rest).await.unwrap();
        let head_end = rest.windows(4).position(|w| w == b"\r\n\r\n").unwrap() + 4;
        assert_eq!(rest.len() - head_end, IMAGE_SIZE);

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metrics.in_flight.get(), 0);
        assert_eq!(
            metrics
                .image_downloads_total
                .with_label_values(&["200", "r1", "clear.img"])
                .get(),
            1
        );
    }
}
