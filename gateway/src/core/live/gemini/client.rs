//! Gemini Live session implementation.
//!
//! Implements `BaseLive` over the BidiGenerateContent WebSocket protocol:
//! query-parameter key auth, a `setup` handshake acknowledged by
//! `setupComplete`, then streaming `realtimeInput` frames up and
//! `serverContent` frames down.
//!
//! Gemini Live delivers all frames as WebSocket Binary, including JSON
//! control messages, so the read loop parses Binary frames that start
//! with `{` as JSON before anything else.
//!
//! There is no reconnection: when the upstream connection drops, the
//! error and close callbacks fire and the session is finished.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use super::config::{GEMINI_LIVE_URL, SETUP_TIMEOUT_SECS};
use super::messages::{
    ActivityDetection, ClientMessage, GenerationConfig, RealtimeInputConfig, ServerMessage, Setup,
    SystemInstruction, TextPart,
};
use crate::core::live::base::{
    AudioCallback, BaseLive, CloseCallback, LiveConfig, LiveError, LiveErrorCallback, LiveResult,
    TranscriptCallback, TurnCompleteCallback,
};

/// Channel capacity for the upstream writer.
const WS_CHANNEL_CAPACITY: usize = 256;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Gemini Live session client.
///
/// Mutable state is held behind `Arc` so it can be shared with the
/// spawned connection task; the `connected` flag allows lock-free
/// readiness checks.
pub struct GeminiLive {
    config: LiveConfig,

    connected: Arc<AtomicBool>,

    /// Writer channel into the connection task
    ws_sender: Arc<Mutex<Option<mpsc::Sender<ClientMessage>>>>,

    audio_callback: Arc<Mutex<Option<AudioCallback>>>,
    transcript_callback: Arc<Mutex<Option<TranscriptCallback>>>,
    turn_complete_callback: Arc<Mutex<Option<TurnCompleteCallback>>>,
    error_callback: Arc<Mutex<Option<LiveErrorCallback>>>,
    close_callback: Arc<Mutex<Option<CloseCallback>>>,

    connection_handle: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Suppresses the close callback when the gateway initiated the close
    intentional_close: Arc<AtomicBool>,
}

impl GeminiLive {
    fn build_ws_url(&self) -> String {
        format!("{}?key={}", GEMINI_LIVE_URL, self.config.api_key)
    }

    fn build_setup(&self) -> ClientMessage {
        ClientMessage::Setup {
            setup: Setup {
                model: format!("models/{}", self.config.model),
                generation_config: GenerationConfig {
                    response_modalities: vec!["AUDIO".to_string()],
                },
                system_instruction: self.config.system_instruction.as_ref().map(|text| {
                    SystemInstruction {
                        parts: vec![TextPart { text: text.clone() }],
                    }
                }),
                realtime_input_config: self.config.manual_activity.then(|| RealtimeInputConfig {
                    automatic_activity_detection: ActivityDetection { disabled: true },
                }),
            },
        }
    }

    /// Extract JSON text from a server frame. Gemini sends JSON in both
    /// Text and Binary frames.
    fn frame_json(msg: &Message) -> Option<&str> {
        match msg {
            Message::Text(text) => Some(text.as_str()),
            Message::Binary(data) if data.first() == Some(&b'{') => {
                std::str::from_utf8(data).ok()
            }
            _ => None,
        }
    }

    /// Wait for the setupComplete acknowledgement on the unsplit stream.
    async fn await_setup_complete(ws_stream: &mut WsStream) -> LiveResult<()> {
        let timeout = std::time::Duration::from_secs(SETUP_TIMEOUT_SECS);

        let result = tokio::time::timeout(timeout, async {
            while let Some(msg_result) = ws_stream.next().await {
                let msg = msg_result.map_err(|e| LiveError::WebSocketError(e.to_string()))?;

                if let Message::Close(frame) = &msg {
                    return Err(LiveError::ConnectionFailed(format!(
                        "closed before setupComplete: {frame:?}"
                    )));
                }

                if let Some(text) = Self::frame_json(&msg) {
                    match serde_json::from_str::<ServerMessage>(text) {
                        Ok(server_msg) => {
                            if let Some(err) = server_msg.error {
                                return Err(LiveError::UpstreamError(
                                    err.message.unwrap_or_else(|| "setup rejected".to_string()),
                                ));
                            }
                            if server_msg.setup_complete.is_some() {
                                return Ok(());
                            }
                        }
                        Err(e) => {
                            tracing::warn!("Unparseable frame during setup: {}", e);
                        }
                    }
                }
            }
            Err(LiveError::ConnectionFailed(
                "stream ended before setupComplete".to_string(),
            ))
        })
        .await;

        match result {
            Ok(inner) => inner,
            Err(_) => Err(LiveError::ConnectionFailed(format!(
                "setupComplete timeout ({SETUP_TIMEOUT_SECS}s)"
            ))),
        }
    }

    /// Dispatch a parsed server message to the registered callbacks.
    async fn handle_server_message(
        msg: ServerMessage,
        audio_cb: &Arc<Mutex<Option<AudioCallback>>>,
        transcript_cb: &Arc<Mutex<Option<TranscriptCallback>>>,
        turn_complete_cb: &Arc<Mutex<Option<TurnCompleteCallback>>>,
        error_cb: &Arc<Mutex<Option<LiveErrorCallback>>>,
    ) {
        if let Some(err) = msg.error {
            let message = err.message.unwrap_or_else(|| "unknown error".to_string());
            tracing::error!(code = ?err.code, "Gemini Live error: {}", message);
            if let Some(cb) = error_cb.lock().await.as_ref() {
                cb(LiveError::UpstreamError(message)).await;
            }
        }

        let Some(content) = msg.server_content else {
            return;
        };

        if let Some(turn) = content.model_turn {
            let mut texts: Vec<&str> = Vec::new();

            for part in &turn.parts {
                if let Some(inline) = &part.inline_data {
                    match voxrelay_protocol::decode_base64(&inline.data) {
                        Ok(pcm) => {
                            tracing::trace!(
                                bytes = pcm.len(),
                                mime = %inline.mime_type,
                                "Gemini audio part"
                            );
                            if let Some(cb) = audio_cb.lock().await.as_ref() {
                                cb(pcm).await;
                            }
                        }
                        Err(e) => {
                            tracing::error!("Failed to decode inline audio data: {}", e);
                        }
                    }
                }
                if let Some(text) = part.text.as_deref() {
                    texts.push(text);
                }
            }

            // Textual parts of one turn event are delivered as a single
            // newline-joined transcript, and only when non-empty.
            let transcript = texts.join("\n");
            if !transcript.is_empty()
                && let Some(cb) = transcript_cb.lock().await.as_ref()
            {
                cb(transcript).await;
            }
        }

        if content.interrupted {
            tracing::debug!("Gemini Live turn interrupted");
        }

        if content.turn_complete
            && let Some(cb) = turn_complete_cb.lock().await.as_ref()
        {
            cb().await;
        }
    }
}

#[async_trait]
impl BaseLive for GeminiLive {
    fn new(config: LiveConfig) -> LiveResult<Self> {
        if config.api_key.is_empty() {
            return Err(LiveError::AuthenticationFailed(
                "API key is required".to_string(),
            ));
        }
        if config.model.is_empty() {
            return Err(LiveError::InvalidConfiguration(
                "model is required".to_string(),
            ));
        }

        Ok(Self {
            config,
            connected: Arc::new(AtomicBool::new(false)),
            ws_sender: Arc::new(Mutex::new(None)),
            audio_callback: Arc::new(Mutex::new(None)),
            transcript_callback: Arc::new(Mutex::new(None)),
            turn_complete_callback: Arc::new(Mutex::new(None)),
            error_callback: Arc::new(Mutex::new(None)),
            close_callback: Arc::new(Mutex::new(None)),
            connection_handle: Arc::new(Mutex::new(None)),
            intentional_close: Arc::new(AtomicBool::new(false)),
        })
    }

    async fn connect(&mut self) -> LiveResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            return Ok(());
        }

        self.intentional_close.store(false, Ordering::SeqCst);

        let url = self.build_ws_url();
        let (mut ws_stream, _response) = tokio_tungstenite::connect_async(&url)
            .await
            .map_err(|e| LiveError::ConnectionFailed(e.to_string()))?;

        // Setup handshake happens on the unsplit stream so no other frame
        // can interleave before setupComplete.
        let setup = self.build_setup();
        let setup_json = serde_json::to_string(&setup)
            .map_err(|e| LiveError::SerializationError(e.to_string()))?;
        ws_stream
            .send(Message::Text(setup_json.into()))
            .await
            .map_err(|e| LiveError::WebSocketError(e.to_string()))?;

        Self::await_setup_complete(&mut ws_stream).await?;

        tracing::info!(model = %self.config.model, "Gemini Live session ready");

        let (mut ws_sink, mut ws_reader) = ws_stream.split();

        let (tx, mut rx) = mpsc::channel::<ClientMessage>(WS_CHANNEL_CAPACITY);
        *self.ws_sender.lock().await = Some(tx);

        let audio_cb = self.audio_callback.clone();
        let transcript_cb = self.transcript_callback.clone();
        let turn_complete_cb = self.turn_complete_callback.clone();
        let error_cb = self.error_callback.clone();
        let close_cb = self.close_callback.clone();
        let connected = self.connected.clone();
        let intentional_close = self.intentional_close.clone();
        let ws_sender = self.ws_sender.clone();

        self.connected.store(true, Ordering::SeqCst);

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(event) = rx.recv() => {
                        let json = match serde_json::to_string(&event) {
                            Ok(j) => j,
                            Err(e) => {
                                tracing::error!("Failed to serialize client message: {}", e);
                                continue;
                            }
                        };

                        if let Err(e) = ws_sink.send(Message::Text(json.into())).await {
                            tracing::error!("Failed to send to Gemini Live: {}", e);
                            break;
                        }
                    }

                    Some(msg) = ws_reader.next() => {
                        match msg {
                            Ok(Message::Close(_)) => {
                                tracing::info!("Gemini Live closed the connection");
                                break;
                            }
                            Ok(Message::Ping(data)) => {
                                if let Err(e) = ws_sink.send(Message::Pong(data)).await {
                                    tracing::error!("Failed to send pong: {}", e);
                                }
                            }
                            Ok(frame) => {
                                if let Some(text) = Self::frame_json(&frame) {
                                    match serde_json::from_str::<ServerMessage>(text) {
                                        Ok(server_msg) => {
                                            Self::handle_server_message(
                                                server_msg,
                                                &audio_cb,
                                                &transcript_cb,
                                                &turn_complete_cb,
                                                &error_cb,
                                            ).await;
                                        }
                                        Err(e) => {
                                            tracing::warn!("Failed to parse server message: {}", e);
                                        }
                                    }
                                }
                            }
                            Err(e) => {
                                tracing::error!("Gemini Live WebSocket error: {}", e);
                                if let Some(cb) = error_cb.lock().await.as_ref() {
                                    cb(LiveError::WebSocketError(e.to_string())).await;
                                }
                                break;
                            }
                        }
                    }

                    else => break,
                }
            }

            connected.store(false, Ordering::SeqCst);
            *ws_sender.lock().await = None;

            if !intentional_close.load(Ordering::SeqCst)
                && let Some(cb) = close_cb.lock().await.as_ref()
            {
                cb().await;
            }

            tracing::debug!("Gemini Live connection task ended");
        });

        *self.connection_handle.lock().await = Some(handle);

        Ok(())
    }

    async fn close(&mut self) -> LiveResult<()> {
        self.intentional_close.store(true, Ordering::SeqCst);

        *self.ws_sender.lock().await = None;

        if let Some(handle) = self.connection_handle.lock().await.take() {
            handle.abort();
        }

        self.connected.store(false, Ordering::SeqCst);
        tracing::info!("Gemini Live session closed");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn supports_turn_interrupt(&self) -> bool {
        // activityEnd is only legal when automatic activity detection was
        // disabled at setup.
        self.config.manual_activity
    }

    async fn send_audio_chunk(&mut self, pcm: Bytes) -> LiveResult<()> {
        if !self.is_ready() {
            return Err(LiveError::NotConnected);
        }

        let sender = self.ws_sender.lock().await;
        let Some(tx) = sender.as_ref() else {
            return Err(LiveError::NotConnected);
        };

        tx.send(ClientMessage::audio_chunk(&pcm))
            .await
            .map_err(|_| LiveError::WebSocketError("writer channel closed".to_string()))
    }

    async fn end_turn(&mut self) -> LiveResult<()> {
        if !self.supports_turn_interrupt() {
            return Err(LiveError::InvalidConfiguration(
                "automatic activity detection is enabled".to_string(),
            ));
        }
        if !self.is_ready() {
            return Err(LiveError::NotConnected);
        }

        let sender = self.ws_sender.lock().await;
        let Some(tx) = sender.as_ref() else {
            return Err(LiveError::NotConnected);
        };

        tx.send(ClientMessage::activity_end())
            .await
            .map_err(|_| LiveError::WebSocketError("writer channel closed".to_string()))
    }

    fn on_audio(&mut self, callback: AudioCallback) -> LiveResult<()> {
        *self
            .audio_callback
            .try_lock()
            .map_err(|_| LiveError::InvalidConfiguration("callback registration race".to_string()))? =
            Some(callback);
        Ok(())
    }

    fn on_transcript(&mut self, callback: TranscriptCallback) -> LiveResult<()> {
        *self
            .transcript_callback
            .try_lock()
            .map_err(|_| LiveError::InvalidConfiguration("callback registration race".to_string()))? =
            Some(callback);
        Ok(())
    }

    fn on_turn_complete(&mut self, callback: TurnCompleteCallback) -> LiveResult<()> {
        *self
            .turn_complete_callback
            .try_lock()
            .map_err(|_| LiveError::InvalidConfiguration("callback registration race".to_string()))? =
            Some(callback);
        Ok(())
    }

    fn on_error(&mut self, callback: LiveErrorCallback) -> LiveResult<()> {
        *self
            .error_callback
            .try_lock()
            .map_err(|_| LiveError::InvalidConfiguration("callback registration race".to_string()))? =
            Some(callback);
        Ok(())
    }

    fn on_close(&mut self, callback: CloseCallback) -> LiveResult<()> {
        *self
            .close_callback
            .try_lock()
            .map_err(|_| LiveError::InvalidConfiguration("callback registration race".to_string()))? =
            Some(callback);
        Ok(())
    }
}
