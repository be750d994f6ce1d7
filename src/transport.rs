//! Duplex stream abstraction for broadcast sessions
//!
//! The handler reads envelopes and writes responses through
//! `BroadcastStream`. Only the receive loop touches the stream, so
//! implementations need not support concurrent calls.

use crate::error::{BroadcastError, Result};
use crate::types::{BroadcastResponse, Envelope};
use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio::sync::mpsc;

/// Server side of a client's broadcast connection
#[async_trait]
pub trait BroadcastStream: Send {
    /// Receive the next envelope
    ///
    /// A cleanly finished inbound side yields `BroadcastError::StreamClosed`.
    async fn recv(&mut self) -> Result<Envelope>;

    /// Send one acknowledgment back to the client
    async fn send(&mut self, response: BroadcastResponse) -> Result<()>;
}

/// Adapts a `futures` stream/sink pair into a `BroadcastStream`
///
/// Transport layers that already expose framed envelope streams (a codec
/// over a socket, a gRPC bidi call) plug in here.
pub struct StreamSession<St, Si> {
    inbound: St,
    outbound: Si,
}

impl<St, Si> StreamSession<St, Si> {
    pub fn new(inbound: St, outbound: Si) -> Self {
        Self { inbound, outbound }
    }

    /// Split back into the inbound stream and outbound sink
    pub fn into_inner(self) -> (St, Si) {
        (self.inbound, self.outbound)
    }
}

#[async_trait]
impl<St, Si> BroadcastStream for StreamSession<St, Si>
where
    St: Stream<Item = Result<Envelope>> + Unpin + Send,
    Si: Sink<BroadcastResponse> + Unpin + Send,
    Si::Error: Into<BroadcastError>,
{
    async fn recv(&mut self) -> Result<Envelope> {
        match self.inbound.next().await {
            Some(item) => item,
            None => Err(BroadcastError::StreamClosed),
        }
    }

    async fn send(&mut self, response: BroadcastResponse) -> Result<()> {
        self.outbound.send(response).await.map_err(Into::into)
    }
}

/// In-process duplex stream backed by tokio channels
///
/// Created together with its `ChannelClient` by `ChannelStream::pair`.
pub struct ChannelStream {
    inbound: mpsc::Receiver<Result<Envelope>>,
    outbound: mpsc::Sender<BroadcastResponse>,
}

/// Client half of a `ChannelStream`
pub struct ChannelClient {
    requests: Option<mpsc::Sender<Result<Envelope>>>,
    responses: mpsc::Receiver<BroadcastResponse>,
}

impl ChannelStream {
    /// Create a connected stream/client pair, each direction buffering
    /// up to `buffer` items
    pub fn pair(buffer: usize) -> (ChannelStream, ChannelClient) {
        let (req_tx, req_rx) = mpsc::channel(buffer.max(1));
        let (resp_tx, resp_rx) = mpsc::channel(buffer.max(1));
        (
            ChannelStream {
                inbound: req_rx,
                outbound: resp_tx,
            },
            ChannelClient {
                requests: Some(req_tx),
                responses: resp_rx,
            },
        )
    }
}

#[async_trait]
impl BroadcastStream for ChannelStream {
    async fn recv(&mut self) -> Result<Envelope> {
        match self.inbound.recv().await {
            Some(item) => item,
            None => Err(BroadcastError::StreamClosed),
        }
    }

    async fn send(&mut self, response: BroadcastResponse) -> Result<()> {
        self.outbound
            .send(response)
            .await
            .map_err(|_| {
                BroadcastError::Transport("client dropped response channel".to_string())
            })
    }
}

impl ChannelClient {
    /// Submit an envelope to the server side
    pub async fn send(&self, envelope: Envelope) -> Result<()> {
        self.push(Ok(envelope)).await
    }

    /// Make the server's next `recv` fail with `error`
    pub async fn fail(&self, error: BroadcastError) -> Result<()> {
        self.push(Err(error)).await
    }

    async fn push(&self, item: Result<Envelope>) -> Result<()> {
        let requests = self
            .requests
            .as_ref()
            .ok_or_else(|| BroadcastError::Transport("send side already closed".to_string()))?;
        requests
            .send(item)
            .await
            .map_err(|_| BroadcastError::Transport("server stream dropped".to_string()))
    }

    /// Wait for the next acknowledgment; `None` once the server side is gone
    pub async fn recv(&mut self) -> Option<BroadcastResponse> {
        self.responses.recv().await
    }

    /// Finish the inbound side; the server sees `StreamClosed` after
    /// draining what was already sent
    pub fn close_send(&mut self) {
        self.requests = None;
    }

    /// Collect every remaining acknowledgment until the server side is gone
    pub async fn collect_responses(&mut self) -> Vec<BroadcastResponse> {
        let mut out = Vec::new();
        while let Some(resp) = self.responses.recv().await {
            out.push(resp);
        }
        out
    }
}
