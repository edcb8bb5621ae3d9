//! Connection transport abstraction.
//!
//! A transport wraps one physical bidirectional socket per client and splits
//! into independent read and write halves so the session's inbound and
//! outbound loops can run concurrently. The production implementation wraps
//! a tokio-tungstenite websocket stream; [`ChannelTransport`] is a
//! channel-backed double for tests and simulation.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{
    SinkExt, StreamExt,
    stream::{SplitSink, SplitStream},
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};
use tokio_tungstenite::{
    WebSocketStream,
    tungstenite::{Error as WsError, Message},
};

/// Errors from transport operations.
///
/// Terminal for the affected session only; never propagates to the room or
/// to other sessions.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The peer closed the connection.
    #[error("connection closed")]
    Closed,

    /// An I/O or protocol error on the underlying socket.
    #[error("transport i/o: {0}")]
    Io(String),
}

/// Read half of a transport.
#[async_trait]
pub trait TransportReader: Send + 'static {
    /// Receive the next frame.
    ///
    /// Returns `Ok(None)` on orderly closure by the peer. Any error is
    /// terminal for the session.
    async fn receive(&mut self) -> Result<Option<Bytes>, TransportError>;
}

/// Write half of a transport.
#[async_trait]
pub trait TransportWriter: Send + 'static {
    /// Send one frame.
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError>;

    /// Close the write side. Idempotent; errors during close are ignored.
    async fn close(&mut self);
}

/// One bidirectional client connection, splittable into its two halves.
pub trait Transport: Send + 'static {
    /// Read half type.
    type Reader: TransportReader;
    /// Write half type.
    type Writer: TransportWriter;

    /// Split into independent write and read halves.
    fn split(self) -> (Self::Writer, Self::Reader);
}

/// Websocket transport over an already-upgraded tokio-tungstenite stream.
///
/// The upgrade handshake happens in the accept glue; the core only ever sees
/// the established stream. Frames map to websocket messages: text and binary
/// messages carry payloads, ping/pong is handled by the library, and a close
/// message ends the read side.
pub struct WsTransport<S> {
    stream: WebSocketStream<S>,
}

impl<S> WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Wrap an established websocket stream.
    pub fn new(stream: WebSocketStream<S>) -> Self {
        Self { stream }
    }
}

impl<S> Transport for WsTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    type Reader = WsReader<S>;
    type Writer = WsWriter<S>;

    fn split(self) -> (Self::Writer, Self::Reader) {
        let (sink, stream) = self.stream.split();
        (WsWriter { sink }, WsReader { stream })
    }
}

/// Read half of a [`WsTransport`].
pub struct WsReader<S> {
    stream: SplitStream<WebSocketStream<S>>,
}

#[async_trait]
impl<S> TransportReader for WsReader<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        loop {
            match self.stream.next().await {
                Some(Ok(message)) => match message {
                    Message::Text(_) | Message::Binary(_) => return Ok(Some(message.into_data())),
                    Message::Close(_) => return Ok(None),
                    // Ping/pong and raw frames carry no payload for us.
                    Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {},
                },
                Some(Err(WsError::ConnectionClosed | WsError::AlreadyClosed)) | None => {
                    return Ok(None);
                },
                Some(Err(err)) => return Err(TransportError::Io(err.to_string())),
            }
        }
    }
}

/// Write half of a [`WsTransport`].
pub struct WsWriter<S> {
    sink: SplitSink<WebSocketStream<S>, Message>,
}

#[async_trait]
impl<S> TransportWriter for WsWriter<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        self.sink.send(Message::Binary(payload)).await.map_err(|err| match err {
            WsError::ConnectionClosed | WsError::AlreadyClosed => TransportError::Closed,
            other => TransportError::Io(other.to_string()),
        })
    }

    async fn close(&mut self) {
        let _ = self.sink.close().await;
    }
}

/// Channel-backed transport for tests and simulation.
///
/// Created together with a [`TransportPeer`] which plays the remote client:
/// frames the peer sends appear on the session's read half, frames the
/// session writes appear on the peer's receive side. The outgoing channel is
/// bounded, so a peer that stops reading makes the session's writes block -
/// exactly how a stalled socket behaves, which is what the backpressure
/// tests need.
pub struct ChannelTransport {
    incoming: mpsc::Receiver<Bytes>,
    outgoing: mpsc::Sender<Bytes>,
}

/// The remote end of a [`ChannelTransport`].
///
/// Dropping the peer closes both directions: the session's read half sees
/// orderly closure and its writes start failing.
pub struct TransportPeer {
    incoming: mpsc::Sender<Bytes>,
    outgoing: mpsc::Receiver<Bytes>,
}

/// Create a connected transport/peer pair with the given channel capacity.
///
/// # Panics
///
/// Panics if `capacity` is zero.
pub fn channel_pair(capacity: usize) -> (ChannelTransport, TransportPeer) {
    assert!(capacity > 0, "channel capacity must be non-zero, got {capacity}");
    let (in_tx, in_rx) = mpsc::channel(capacity);
    let (out_tx, out_rx) = mpsc::channel(capacity);
    (
        ChannelTransport { incoming: in_rx, outgoing: out_tx },
        TransportPeer { incoming: in_tx, outgoing: out_rx },
    )
}

impl TransportPeer {
    /// Send a frame to the session. Returns `false` if the session's read
    /// half is gone.
    pub async fn send(&self, payload: impl Into<Bytes> + Send) -> bool {
        self.incoming.send(payload.into()).await.is_ok()
    }

    /// Receive the next frame the session wrote. Returns `None` once the
    /// session closed its write side.
    pub async fn recv(&mut self) -> Option<Bytes> {
        self.outgoing.recv().await
    }

    /// Receive without waiting.
    pub fn try_recv(&mut self) -> Option<Bytes> {
        self.outgoing.try_recv().ok()
    }
}

impl Transport for ChannelTransport {
    type Reader = ChannelReader;
    type Writer = ChannelWriter;

    fn split(self) -> (Self::Writer, Self::Reader) {
        (ChannelWriter { tx: Some(self.outgoing) }, ChannelReader { rx: self.incoming })
    }
}

/// Read half of a [`ChannelTransport`].
pub struct ChannelReader {
    rx: mpsc::Receiver<Bytes>,
}

#[async_trait]
impl TransportReader for ChannelReader {
    async fn receive(&mut self) -> Result<Option<Bytes>, TransportError> {
        Ok(self.rx.recv().await)
    }
}

/// Write half of a [`ChannelTransport`].
pub struct ChannelWriter {
    tx: Option<mpsc::Sender<Bytes>>,
}

#[async_trait]
impl TransportWriter for ChannelWriter {
    async fn send(&mut self, payload: Bytes) -> Result<(), TransportError> {
        match &self.tx {
            Some(tx) => tx.send(payload).await.map_err(|_| TransportError::Closed),
            None => Err(TransportError::Closed),
        }
    }

    async fn close(&mut self) {
        self.tx = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_pair_round_trip() {
        let (transport, mut peer) = channel_pair(4);
        let (mut writer, mut reader) = transport.split();

        assert!(peer.send(Bytes::from_static(b"in")).await);
        assert_eq!(reader.receive().await.unwrap().unwrap(), Bytes::from_static(b"in"));

        writer.send(Bytes::from_static(b"out")).await.unwrap();
        assert_eq!(peer.recv().await.unwrap(), Bytes::from_static(b"out"));
    }

    #[tokio::test]
    async fn dropping_peer_closes_the_read_half() {
        let (transport, peer) = channel_pair(4);
        let (mut writer, mut reader) = transport.split();
        drop(peer);

        assert!(reader.receive().await.unwrap().is_none());
        assert!(matches!(
            writer.send(Bytes::from_static(b"x")).await,
            Err(TransportError::Closed)
        ));
    }

    #[tokio::test]
    async fn closing_the_write_half_is_observable_and_idempotent() {
        let (transport, mut peer) = channel_pair(4);
        let (mut writer, _reader) = transport.split();

        writer.close().await;
        writer.close().await;

        assert!(peer.recv().await.is_none());
        assert!(matches!(
            writer.send(Bytes::from_static(b"x")).await,
            Err(TransportError::Closed)
        ));
    }
}
