//! Speaker playback on a dedicated thread.
//!
//! The rodio `OutputStream` is not `Send`, so a dedicated thread owns the
//! output device and the single outstanding `Sink`. Commands arrive over a
//! std mpsc channel; natural end of playback is detected by polling the
//! sink between commands and reported back as a `PlaybackEvent`.

use std::io::Cursor;
use std::sync::mpsc;
use std::thread::JoinHandle;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, info, warn};

use crate::error::{ClientError, ClientResult};

/// Poll interval for detecting natural end of playback
const POLL_INTERVAL: Duration = Duration::from_millis(50);

enum PlaybackCmd {
    /// Play a self-describing audio container (WAV), replacing any
    /// current playback
    Play(Vec<u8>),
    /// Stop the current playback without a finished event
    Stop,
    Shutdown,
}

/// Events reported by the playback thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The current audio finished playing on its own
    Finished,
}

/// Handle to the playback thread.
pub struct Playback {
    cmd_tx: mpsc::Sender<PlaybackCmd>,
    handle: Option<JoinHandle<()>>,
}

impl Playback {
    /// Spawn the playback thread. Completion events are delivered on
    /// `event_tx`.
    pub fn spawn(event_tx: UnboundedSender<PlaybackEvent>) -> ClientResult<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("voxrelay-playback".to_string())
            .spawn(move || playback_thread(cmd_rx, event_tx))
            .map_err(|e| {
                ClientError::AudioDeviceError(format!("Failed to spawn playback thread: {}", e))
            })?;

        Ok(Self {
            cmd_tx,
            handle: Some(handle),
        })
    }

    /// Play a WAV container, stopping any current playback first.
    pub fn play(&self, container: Vec<u8>) {
        let _ = self.cmd_tx.send(PlaybackCmd::Play(container));
    }

    /// Stop the current playback. No finished event is emitted.
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(PlaybackCmd::Stop);
    }

    /// Shut the playback thread down.
    pub fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(PlaybackCmd::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Playback {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn playback_thread(cmd_rx: mpsc::Receiver<PlaybackCmd>, event_tx: UnboundedSender<PlaybackEvent>) {
    // Device is opened lazily on first play so headless runs stay quiet
    let mut output: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut sink: Option<Sink> = None;

    loop {
        match cmd_rx.recv_timeout(POLL_INTERVAL) {
            Ok(PlaybackCmd::Play(container)) => {
                // One outstanding sink: the previous one is stopped before
                // the replacement starts
                if let Some(old) = sink.take() {
                    old.stop();
                }

                if output.is_none() {
                    match OutputStream::try_default() {
                        Ok(pair) => output = Some(pair),
                        Err(e) => {
                            error!("Failed to open output device: {}", e);
                            continue;
                        }
                    }
                }
                let Some((_, handle)) = output.as_ref() else {
                    continue;
                };

                let source = match Decoder::new(Cursor::new(container)) {
                    Ok(source) => source,
                    Err(e) => {
                        warn!("Failed to decode audio container: {}", e);
                        continue;
                    }
                };

                match Sink::try_new(handle) {
                    Ok(new_sink) => {
                        new_sink.append(source);
                        info!("Playback started");
                        sink = Some(new_sink);
                    }
                    Err(e) => error!("Failed to create playback sink: {}", e),
                }
            }
            Ok(PlaybackCmd::Stop) => {
                if let Some(old) = sink.take() {
                    old.stop();
                    info!("Playback stopped");
                }
            }
            Ok(PlaybackCmd::Shutdown) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                if let Some(current) = &sink
                    && current.empty()
                {
                    sink = None;
                    let _ = event_tx.send(PlaybackEvent::Finished);
                }
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Some(old) = sink.take() {
        old.stop();
    }
    drop(output);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_thread_lifecycle() {
        // Stop without play and shutdown must not panic, with or without
        // an audio device present
        let (event_tx, _event_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut playback = Playback::spawn(event_tx).expect("Should spawn playback thread");
        playback.stop();
        playback.shutdown();
    }

    #[test]
    fn test_undecodable_container_is_dropped() {
        let (event_tx, mut event_rx) = tokio::sync::mpsc::unbounded_channel();
        let mut playback = Playback::spawn(event_tx).expect("Should spawn playback thread");

        playback.play(vec![0, 1, 2, 3]);
        std::thread::sleep(Duration::from_millis(150));

        // No finished event for audio that never started
        assert!(event_rx.try_recv().is_err());
        playback.shutdown();
    }
}
