// Connection handling module
// Accepts TCP connections and serves HTTP/1.1 on them

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use hyper_util::server::graceful::GracefulShutdown;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpStream;

use super::bridge::dispatch;
use crate::config::PerformanceConfig;
use crate::handler::{FileRequest, Handler};
use crate::logger;

/// Accept a connection, enforcing the connection limit
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `handler` - Handler serving every request on the connection
/// * `conn_counter` - Active connection counter
/// * `performance` - Keep-alive and connection limit settings
/// * `graceful` - Watcher that lets the connection drain on shutdown
pub fn accept_connection<H>(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: &Arc<H>,
    conn_counter: &Arc<AtomicUsize>,
    performance: &PerformanceConfig,
    graceful: &GracefulShutdown,
) where
    H: Handler + 'static,
{
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection from {peer_addr} rejected."
            ));
            drop(stream);
            return;
        }
    }

    handle_connection(
        stream,
        peer_addr,
        Arc::clone(handler),
        Arc::clone(conn_counter),
        performance.keep_alive,
        graceful,
    );
}

/// Serve one connection in a spawned task, releasing its slot in `conn_counter` when done
///
/// The connection is registered with `graceful`: on shutdown the response in progress
/// completes and the connection closes instead of waiting for another request.
fn handle_connection<H>(
    stream: TcpStream,
    peer_addr: SocketAddr,
    handler: Arc<H>,
    conn_counter: Arc<AtomicUsize>,
    keep_alive: bool,
    graceful: &GracefulShutdown,
) where
    H: Handler + 'static,
{
    let io = TokioIo::new(stream);

    let service = service_fn(move |req: Request<Incoming>| {
        let handler = Arc::clone(&handler);
        async move {
            let (parts, _body) = req.into_parts();
            let request = FileRequest::from_parts(&parts, Some(peer_addr));
            Ok::<_, Infallible>(dispatch(handler, request).await)
        }
    });

    let connection = graceful.watch(
        http1::Builder::new()
            .keep_alive(keep_alive)
            .serve_connection(io, service),
    );

    tokio::spawn(async move {
        if let Err(err) = connection.await {
            logger::log_connection_error(&err);
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}
