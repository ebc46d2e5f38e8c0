//! Bridge between handlers and hyper
//!
//! Handlers push their response into a [`ResponseWriter`] while hyper expects a returned
//! `Response`. Each request runs its handler in its own task: the head travels back through
//! a oneshot channel and body chunks through a bounded channel, so slow clients apply
//! back-pressure and a dropped connection surfaces as a failed write.

use hyper::body::{Body, Bytes, Frame};
use hyper::header::HeaderMap;
use hyper::{Response, StatusCode};
use std::convert::Infallible;
use std::io;
use std::mem;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

use async_trait::async_trait;

use crate::handler::{FileRequest, Handler, ResponseWriter};
use crate::logger;

/// Body chunks buffered between the handler task and the connection
const BODY_CHANNEL_CAPACITY: usize = 4;

/// Response body fed by a [`ChannelWriter`]
#[derive(Debug)]
pub struct ChannelBody {
    rx: Option<mpsc::Receiver<Bytes>>,
}

impl ChannelBody {
    pub const fn empty() -> Self {
        Self { rx: None }
    }
}

impl Body for ChannelBody {
    type Data = Bytes;
    type Error = Infallible;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let Some(rx) = self.get_mut().rx.as_mut() else {
            return Poll::Ready(None);
        };
        rx.poll_recv(cx).map(|chunk| chunk.map(|data| Ok(Frame::data(data))))
    }

    fn is_end_stream(&self) -> bool {
        self.rx.is_none()
    }
}

/// [`ResponseWriter`] that hands its output to hyper
///
/// The head is held back until the first body chunk or [`ChannelWriter::finish`], so
/// responses without a body go out with an empty, known-length body.
pub struct ChannelWriter {
    headers: HeaderMap,
    pending: Option<(StatusCode, HeaderMap)>,
    head_tx: Option<oneshot::Sender<Response<ChannelBody>>>,
    body_tx: Option<mpsc::Sender<Bytes>>,
}

/// Creates a writer and the receiver its response head arrives on
pub fn channel() -> (ChannelWriter, oneshot::Receiver<Response<ChannelBody>>) {
    let (head_tx, head_rx) = oneshot::channel();
    let writer = ChannelWriter {
        headers: HeaderMap::new(),
        pending: None,
        head_tx: Some(head_tx),
        body_tx: None,
    };
    (writer, head_rx)
}

impl ChannelWriter {
    fn head_sent(&self) -> bool {
        self.head_tx.is_none()
    }

    fn send_head(&mut self, body: ChannelBody) {
        let Some(head_tx) = self.head_tx.take() else {
            return;
        };
        let (status, headers) = self
            .pending
            .take()
            .unwrap_or_else(|| (StatusCode::OK, mem::take(&mut self.headers)));

        let mut response = Response::new(body);
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        // A closed receiver means the connection is gone, the next write reports it
        let _ = head_tx.send(response);
    }

    /// Completes the response, sending a `200 OK` head if the handler never wrote one
    pub fn finish(mut self) {
        self.send_head(ChannelBody::empty());
    }
}

#[async_trait]
impl ResponseWriter for ChannelWriter {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_head(&mut self, status: StatusCode) {
        if self.pending.is_some() || self.head_sent() {
            logger::log_debug(&format!("Superfluous response status {status} ignored"));
            return;
        }
        self.pending = Some((status, mem::take(&mut self.headers)));
    }

    async fn write(&mut self, data: Bytes) -> io::Result<usize> {
        if !self.head_sent() {
            let (tx, rx) = mpsc::channel(BODY_CHANNEL_CAPACITY);
            self.body_tx = Some(tx);
            self.send_head(ChannelBody { rx: Some(rx) });
        }
        if data.is_empty() {
            return Ok(0);
        }

        let len = data.len();
        let tx = self
            .body_tx
            .as_ref()
            .ok_or_else(|| io::Error::from(io::ErrorKind::BrokenPipe))?;
        tx.send(data)
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "client disconnected"))?;
        Ok(len)
    }
}

fn internal_error() -> Response<ChannelBody> {
    let mut response = Response::new(ChannelBody::empty());
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

/// Runs `handler` for one request and returns the head as soon as it is available. The
/// body keeps streaming from the handler task afterwards.
pub async fn dispatch<H>(handler: Arc<H>, mut request: FileRequest) -> Response<ChannelBody>
where
    H: Handler + ?Sized + 'static,
{
    let (mut writer, head) = channel();
    tokio::spawn(async move {
        if let Err(e) = handler.serve(&mut request, &mut writer).await {
            logger::log_debug(&format!(
                "{} {} not completed: {e}",
                request.method, request.path
            ));
        }
        writer.finish();
    });

    head.await.unwrap_or_else(|_| {
        logger::log_error("Request handler ended without producing a response");
        internal_error()
    })
}
