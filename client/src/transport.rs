//! WebSocket transport to the gateway.
//!
//! One connection carries one conversation: JSON envelopes as text
//! frames, in send order, with a periodic `ping` keepalive driven by the
//! main event loop.

use futures_util::SinkExt;
use futures_util::stream::{SplitSink, SplitStream, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::info;

use voxrelay_protocol::Envelope;

use crate::error::{ClientError, ClientResult};

/// Keepalive interval between `ping` envelopes
pub const KEEPALIVE_INTERVAL_SECS: u64 = 30;

pub type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
pub type WsStream = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Connect to the gateway relay endpoint and split the socket.
pub async fn connect(url: &str) -> ClientResult<(WsSink, WsStream)> {
    info!("Connecting to gateway at {}", url);

    let (socket, _response) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionFailed(e.to_string()))?;

    info!("Connected to gateway");
    Ok(socket.split())
}

/// Serialize and send one envelope as a text frame.
pub async fn send_envelope(sink: &mut WsSink, envelope: &Envelope) -> ClientResult<()> {
    let json = serde_json::to_string(envelope)
        .map_err(|e| ClientError::ProtocolError(e.to_string()))?;

    sink.send(Message::Text(json.into()))
        .await
        .map_err(|e| ClientError::TransportError(e.to_string()))
}

/// Parse an inbound text frame into an envelope.
pub fn parse_envelope(text: &str) -> ClientResult<Envelope> {
    serde_json::from_str(text).map_err(|e| ClientError::ProtocolError(e.to_string()))
}

/// Close the connection cleanly.
pub async fn close(sink: &mut WsSink) {
    let _ = sink.send(Message::Close(None)).await;
}
