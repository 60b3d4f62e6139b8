//! Relay WebSocket handler
//!
//! Bridges one client WebSocket channel to one upstream Gemini Live
//! session. The upstream session is created when the channel opens and
//! released when the channel closes; nothing is shared between channels.

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use voxrelay_protocol::{Envelope, OUTPUT_SAMPLE_RATE};

use crate::core::live::{BaseLive, GeminiLive, LiveConfig, LiveError};
use crate::state::AppState;

use super::messages::RelayRoute;

/// Channel buffer size for outbound envelope routing
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// Relay WebSocket handler
///
/// Upgrades the HTTP connection to a WebSocket speaking the envelope
/// protocol and bridges it to a dedicated Gemini Live session.
pub async fn relay_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    info!("Relay WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state))
}

/// Handle the relay WebSocket connection
async fn handle_relay_socket(socket: WebSocket, app_state: Arc<AppState>) {
    let channel_id = uuid::Uuid::new_v4();
    info!(%channel_id, "Relay WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (route_tx, mut route_rx) = mpsc::channel::<RelayRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing envelopes. Draining a single channel keeps
    // envelope order identical to send order.
    let sender_task = tokio::spawn(async move {
        while let Some(route) = route_rx.recv().await {
            let result = match route {
                RelayRoute::Envelope(envelope) => match serde_json::to_string(&envelope) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!("Failed to serialize envelope: {}", e);
                        continue;
                    }
                },
                RelayRoute::Close => {
                    info!("Closing relay WebSocket connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    // One upstream session per channel, created before any envelope is
    // served. Connection failure is fatal: error envelope, close, no retry.
    let live_config = LiveConfig {
        api_key: app_state.config.gemini_api_key.clone(),
        model: app_state.config.gemini_model.clone(),
        system_instruction: Some(app_state.config.system_instruction.clone()),
        manual_activity: app_state.config.manual_activity,
    };

    let mut session: Box<dyn BaseLive> = match GeminiLive::new(live_config) {
        Ok(session) => Box::new(session),
        Err(e) => {
            error!(%channel_id, "Failed to create upstream session: {}", e);
            fail_channel(&route_tx, &e).await;
            let _ = sender_task.await;
            return;
        }
    };

    // Callbacks registered before connect so no early event is lost
    if let Err(e) = register_session_callbacks(session.as_mut(), &route_tx) {
        error!(%channel_id, "Failed to register session callbacks: {}", e);
        fail_channel(&route_tx, &e).await;
        let _ = sender_task.await;
        return;
    }

    if let Err(e) = session.connect().await {
        error!(%channel_id, "Upstream connection failed: {}", e);
        fail_channel(&route_tx, &e).await;
        let _ = sender_task.await;
        return;
    }

    let mut bridge = RelayBridge::new(session, route_tx.clone());

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(Message::Text(text)) => {
                let envelope: Envelope = match serde_json::from_str(&text) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!(%channel_id, "Ignoring malformed envelope: {}", e);
                        continue;
                    }
                };
                bridge.handle_envelope(envelope).await;
            }
            Ok(Message::Close(_)) => {
                info!(%channel_id, "Relay WebSocket close received");
                break;
            }
            Ok(Message::Ping(_) | Message::Pong(_)) => {
                debug!(%channel_id, "WebSocket control frame");
            }
            Ok(Message::Binary(_)) => {
                debug!(%channel_id, "Ignoring binary frame, envelopes are JSON text");
            }
            Err(e) => {
                warn!(%channel_id, "Relay WebSocket error: {}", e);
                break;
            }
        }
    }

    // Cleanup
    sender_task.abort();

    if let Err(e) = bridge.shutdown().await {
        error!(%channel_id, "Failed to close upstream session: {:?}", e);
    }

    info!(%channel_id, "Relay WebSocket connection terminated");
}

/// Emit an error envelope followed by a close marker.
async fn fail_channel(route_tx: &mpsc::Sender<RelayRoute>, error: &LiveError) {
    let _ = route_tx
        .send(RelayRoute::Envelope(Envelope::Error {
            error: error.to_string(),
        }))
        .await;
    let _ = route_tx.send(RelayRoute::Close).await;
}

/// Wire upstream session events to outbound envelopes.
///
/// Synthesized 24 kHz PCM is wrapped in a WAV container and re-encoded to
/// base64 so the client can feed it to a generic media decoder. Upstream
/// errors surface as `error` envelopes without closing the channel;
/// upstream close tears the channel down.
pub fn register_session_callbacks(
    session: &mut dyn BaseLive,
    route_tx: &mpsc::Sender<RelayRoute>,
) -> Result<(), LiveError> {
    let tx = route_tx.clone();
    session.on_audio(Arc::new(move |pcm| {
        let tx = tx.clone();
        Box::pin(async move {
            let samples = match voxrelay_protocol::bytes_to_pcm16(&pcm) {
                Ok(samples) => samples,
                Err(e) => {
                    error!("Discarding malformed upstream audio: {}", e);
                    return;
                }
            };
            let wav = match voxrelay_protocol::wrap_wav(&samples, OUTPUT_SAMPLE_RATE) {
                Ok(wav) => wav,
                Err(e) => {
                    error!("Failed to wrap upstream audio: {}", e);
                    return;
                }
            };
            let data = voxrelay_protocol::encode_base64_chunked(&wav);
            let _ = tx.send(RelayRoute::Envelope(Envelope::Audio { data })).await;
        })
    }))?;

    let tx = route_tx.clone();
    session.on_transcript(Arc::new(move |text| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx
                .send(RelayRoute::Envelope(Envelope::Transcript { text }))
                .await;
        })
    }))?;

    let tx = route_tx.clone();
    session.on_turn_complete(Arc::new(move || {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(RelayRoute::Envelope(Envelope::TurnComplete)).await;
        })
    }))?;

    let tx = route_tx.clone();
    session.on_error(Arc::new(move |error| {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx
                .send(RelayRoute::Envelope(Envelope::Error {
                    error: error.to_string(),
                }))
                .await;
        })
    }))?;

    let tx = route_tx.clone();
    session.on_close(Arc::new(move || {
        let tx = tx.clone();
        Box::pin(async move {
            let _ = tx.send(RelayRoute::Close).await;
        })
    }))?;

    Ok(())
}

/// Per-channel bridge between inbound envelopes and the upstream session.
pub struct RelayBridge {
    session: Box<dyn BaseLive>,
    route_tx: mpsc::Sender<RelayRoute>,
}

impl RelayBridge {
    pub fn new(session: Box<dyn BaseLive>, route_tx: mpsc::Sender<RelayRoute>) -> Self {
        Self { session, route_tx }
    }

    /// Dispatch one inbound envelope.
    ///
    /// `send_audio_chunk` enqueues onto the session's writer channel, so
    /// this never blocks on upstream I/O and chunk order is preserved.
    /// Forwarding failures are logged and the channel stays open.
    pub async fn handle_envelope(&mut self, envelope: Envelope) {
        match envelope {
            Envelope::Audio { data } => match voxrelay_protocol::decode_base64(&data) {
                Ok(pcm) => {
                    if let Err(e) = self.session.send_audio_chunk(pcm).await {
                        warn!("Failed to forward audio chunk: {}", e);
                    }
                }
                Err(e) => {
                    warn!("Discarding audio envelope with invalid base64: {}", e);
                }
            },
            Envelope::Stop => {
                if self.session.supports_turn_interrupt() {
                    if let Err(e) = self.session.end_turn().await {
                        warn!("Failed to interrupt turn: {}", e);
                    }
                } else {
                    debug!("Upstream session has no turn interrupt, ignoring stop");
                }
            }
            Envelope::Ping => {
                let _ = self.route_tx.send(RelayRoute::Envelope(Envelope::Pong)).await;
            }
            other => {
                debug!("Ignoring unexpected inbound envelope: {:?}", other);
            }
        }
    }

    /// Release the upstream session. Idempotent on the session side.
    pub async fn shutdown(mut self) -> Result<(), LiveError> {
        self.session.close().await
    }
}
