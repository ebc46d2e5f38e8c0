//! Response sink abstraction
//!
//! Handlers write their response incrementally: headers, then a status line, then body
//! chunks. The transport decides when the head is actually flushed to the client.

use async_trait::async_trait;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use std::io;

/// Destination a handler writes its response into
///
/// Follows the contract of [`std::io::Write`]: a successful `write` reports how many bytes
/// were accepted, which may be fewer than offered, and an error means nothing was accepted.
#[async_trait]
pub trait ResponseWriter: Send {
    /// Headers that will be sent with the status line. Changes made after the head has
    /// been sent have no effect.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Sends the status line and headers. Only the first call has any effect.
    fn write_head(&mut self, status: StatusCode);

    /// Writes a body chunk, sending a `200 OK` head first if none was sent yet
    async fn write(&mut self, data: Bytes) -> io::Result<usize>;
}

/// Writes the whole buffer, retrying partial writes
pub async fn write_all(sink: &mut dyn ResponseWriter, mut data: Bytes) -> io::Result<()> {
    while !data.is_empty() {
        let n = sink.write(data.clone()).await?;
        if n == 0 {
            return Err(io::Error::from(io::ErrorKind::WriteZero));
        }
        data = data.slice(n..);
    }
    Ok(())
}
