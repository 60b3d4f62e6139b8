use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use clap::Parser;
use futures_util::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, warn};

use anyhow::anyhow;

use voxrelay_client::audio::{Capture, Playback, PlaybackEvent, forward_frames};
use voxrelay_client::controller::{Controller, VoicePipeline};
use voxrelay_client::transport::{self, KEEPALIVE_INTERVAL_SECS};
use voxrelay_protocol::{Envelope, decode_base64};

/// Voxrelay Client - push-to-talk voice client for the voxrelay gateway
#[derive(Parser, Debug)]
#[command(name = "voxrelay-client")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Gateway relay WebSocket URL
    #[arg(
        short = 'u',
        long = "url",
        value_name = "URL",
        default_value = "ws://127.0.0.1:3001/relay"
    )]
    url: String,

    /// Start with outbound audio and playback muted
    #[arg(long = "muted")]
    muted: bool,
}

/// Concrete pipeline wiring the controller to the audio threads and the
/// outbound envelope channel.
struct NativePipeline {
    capture: Capture,
    playback: Playback,
    out_tx: mpsc::UnboundedSender<Envelope>,
}

impl VoicePipeline for NativePipeline {
    fn start_capture(&mut self) {
        self.capture.start();
    }

    fn stop_capture(&mut self) {
        self.capture.stop();
    }

    fn start_playback(&mut self, container: Vec<u8>) {
        self.playback.play(container);
    }

    fn stop_playback(&mut self) {
        self.playback.stop();
    }

    fn send_stop(&mut self) {
        let _ = self.out_tx.send(Envelope::Stop);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Initialize crypto provider for TLS connections
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let (mut ws_sink, mut ws_stream) = transport::connect(&cli.url)
        .await
        .map_err(|e| anyhow!(e.to_string()))?;

    // Outbound envelopes funnel through one channel so send order matches
    // event order
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Envelope>();
    let (playback_event_tx, mut playback_event_rx) = mpsc::unbounded_channel::<PlaybackEvent>();

    let muted = Arc::new(AtomicBool::new(cli.muted));

    let capture = Capture::spawn()?;
    let frames = capture.frames();
    let playback = Playback::spawn(playback_event_tx)?;

    // Capture sender task: drains the latest-frame slot into audio
    // envelopes, gated by the mute flag
    let frame_task = tokio::spawn(forward_frames(frames, muted.clone(), out_tx.clone()));

    let pipeline = NativePipeline {
        capture,
        playback,
        out_tx: out_tx.clone(),
    };
    let mut controller = Controller::new(pipeline, cli.muted);

    println!("Connected. Press Enter to talk / interrupt, 'm' to toggle mute, 'q' to quit.");

    let mut stdin_lines = BufReader::new(tokio::io::stdin()).lines();
    let mut keepalive = tokio::time::interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECS));
    keepalive.tick().await; // first tick fires immediately

    loop {
        tokio::select! {
            line = stdin_lines.next_line() => {
                match line {
                    Ok(Some(input)) => match input.trim() {
                        "" => controller.press(),
                        "m" => {
                            let now_muted = !controller.is_muted();
                            muted.store(now_muted, Ordering::Relaxed);
                            controller.set_muted(now_muted);
                            println!("{}", if now_muted { "Muted" } else { "Unmuted" });
                        }
                        "q" => break,
                        other => println!("Unknown command: {:?}", other),
                    },
                    // Ctrl-D or stdin closed
                    Ok(None) | Err(_) => break,
                }
            }

            envelope = out_rx.recv() => {
                let Some(envelope) = envelope else { break };
                if let Err(e) = transport::send_envelope(&mut ws_sink, &envelope).await {
                    error!("Failed to send envelope: {}", e);
                    break;
                }
            }

            event = playback_event_rx.recv() => {
                if let Some(PlaybackEvent::Finished) = event {
                    controller.on_playback_finished();
                }
            }

            _ = keepalive.tick() => {
                let _ = out_tx.send(Envelope::Ping);
            }

            msg = ws_stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match transport::parse_envelope(&text) {
                            Ok(envelope) => handle_envelope(&mut controller, envelope),
                            Err(e) => warn!("Ignoring malformed envelope: {}", e),
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        println!("Gateway closed the connection");
                        break;
                    }
                    Some(Ok(_)) => debug!("Ignoring non-text frame"),
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    // Cleanup: audio threads shut down via their Drop handles
    frame_task.abort();
    transport::close(&mut ws_sink).await;

    Ok(())
}

fn handle_envelope(controller: &mut Controller<NativePipeline>, envelope: Envelope) {
    match envelope {
        Envelope::Audio { data } => match decode_base64(&data) {
            Ok(container) => controller.on_audio(container.to_vec()),
            Err(e) => warn!("Dropping audio envelope with invalid base64: {}", e),
        },
        Envelope::Transcript { text } => println!("[assistant] {}", text),
        Envelope::TurnComplete => {
            controller.on_turn_complete();
            debug!("Turn complete");
        }
        Envelope::Error { error } => eprintln!("[gateway error] {}", error),
        Envelope::Pong => debug!("Keepalive pong"),
        other => debug!("Ignoring unexpected envelope: {:?}", other),
    }
}
