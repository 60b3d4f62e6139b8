//! Microphone capture on a dedicated thread.
//!
//! The cpal `Stream` is not `Send`, so a dedicated thread owns it and
//! takes start/stop commands over a std mpsc channel. The input callback
//! resamples each hardware block to 16 kHz PCM16 and publishes it into a
//! single-slot latest-frame buffer; a slow consumer overwrites the slot
//! rather than stalling the audio callback.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use voxrelay_protocol::{Envelope, encode_base64_chunked, pcm16_to_bytes};

use super::resampler::{downmix_to_mono, resample_to_pcm16};
use crate::error::{ClientError, ClientResult};

// =============================================================================
// Latest-frame buffer
// =============================================================================

/// Single-slot buffer between the capture callback and the sender task.
///
/// The capture callback is the sole producer; pushing into an occupied
/// slot overwrites the pending frame and counts the drop.
pub struct FrameSlot {
    slot: std::sync::Mutex<Option<Vec<i16>>>,
    notify: Notify,
    dropped: AtomicU64,
}

impl FrameSlot {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: std::sync::Mutex::new(None),
            notify: Notify::new(),
            dropped: AtomicU64::new(0),
        })
    }

    /// Publish a frame, overwriting any pending one.
    pub fn push(&self, frame: Vec<i16>) {
        {
            let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
            if slot.replace(frame).is_some() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.notify.notify_one();
    }

    /// Wait for and take the next pending frame.
    pub async fn pop(&self) -> Vec<i16> {
        loop {
            {
                let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
                if let Some(frame) = slot.take() {
                    return frame;
                }
            }
            self.notify.notified().await;
        }
    }

    /// Number of frames overwritten before the consumer took them.
    pub fn dropped_frames(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Take and reset the overwrite count, so each capture session
    /// reports its own drops.
    pub fn take_dropped(&self) -> u64 {
        self.dropped.swap(0, Ordering::Relaxed)
    }
}

/// Drains capture frames into `audio` envelopes.
///
/// Frames taken while `muted` is set are discarded without producing an
/// envelope. Runs until the envelope channel closes.
pub async fn forward_frames(
    slot: Arc<FrameSlot>,
    muted: Arc<std::sync::atomic::AtomicBool>,
    out_tx: tokio::sync::mpsc::UnboundedSender<Envelope>,
) {
    loop {
        let frame = slot.pop().await;
        if muted.load(Ordering::Relaxed) {
            continue;
        }
        let data = encode_base64_chunked(&pcm16_to_bytes(&frame));
        if out_tx.send(Envelope::Audio { data }).is_err() {
            break;
        }
    }
}

// =============================================================================
// Capture thread
// =============================================================================

enum CaptureCmd {
    Start,
    Stop,
    Shutdown,
}

/// Handle to the capture thread.
pub struct Capture {
    cmd_tx: mpsc::Sender<CaptureCmd>,
    handle: Option<JoinHandle<()>>,
    slot: Arc<FrameSlot>,
}

impl Capture {
    /// Spawn the capture thread. The microphone is not opened until
    /// `start()` is called.
    pub fn spawn() -> ClientResult<Self> {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let slot = FrameSlot::new();
        let thread_slot = slot.clone();

        let handle = std::thread::Builder::new()
            .name("voxrelay-capture".to_string())
            .spawn(move || capture_thread(cmd_rx, thread_slot))
            .map_err(|e| {
                ClientError::AudioDeviceError(format!("Failed to spawn capture thread: {}", e))
            })?;

        Ok(Self {
            cmd_tx,
            handle: Some(handle),
            slot,
        })
    }

    /// Frame buffer fed by the capture callback.
    pub fn frames(&self) -> Arc<FrameSlot> {
        self.slot.clone()
    }

    /// Open the microphone and begin streaming frames.
    pub fn start(&self) {
        let _ = self.cmd_tx.send(CaptureCmd::Start);
    }

    /// Stop streaming and release the microphone.
    pub fn stop(&self) {
        let _ = self.cmd_tx.send(CaptureCmd::Stop);
    }

    /// Shut the capture thread down.
    pub fn shutdown(&mut self) {
        let _ = self.cmd_tx.send(CaptureCmd::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for Capture {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn capture_thread(cmd_rx: mpsc::Receiver<CaptureCmd>, slot: Arc<FrameSlot>) {
    // The stream lives here so drop order releases the device on this thread
    let mut stream: Option<cpal::Stream> = None;

    while let Ok(cmd) = cmd_rx.recv() {
        match cmd {
            CaptureCmd::Start => {
                if stream.is_some() {
                    warn!("Capture already running");
                    continue;
                }
                match build_input_stream(slot.clone()) {
                    Ok(s) => {
                        if let Err(e) = s.play() {
                            error!("Failed to start capture stream: {}", e);
                            continue;
                        }
                        info!("Microphone capture started");
                        stream = Some(s);
                    }
                    Err(e) => error!("Failed to open microphone: {}", e),
                }
            }
            CaptureCmd::Stop => {
                if stream.take().is_some() {
                    let dropped = slot.take_dropped();
                    if dropped > 0 {
                        debug!(dropped, "Frames overwritten during capture");
                    }
                    info!("Microphone capture stopped");
                }
            }
            CaptureCmd::Shutdown => break,
        }
    }
    drop(stream);
}

fn build_input_stream(slot: Arc<FrameSlot>) -> ClientResult<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| ClientError::AudioDeviceError("No input device available".to_string()))?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let config: cpal::StreamConfig = device
        .default_input_config()
        .map_err(|e| ClientError::AudioDeviceError(format!("Failed to get input config: {}", e)))?
        .into();

    let channels = config.channels as usize;
    let src_rate = config.sample_rate.0;

    let err_fn = |err| {
        error!("Audio input stream error: {}", err);
    };

    let stream = device
        .build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let mono = downmix_to_mono(data, channels);
                let frame = resample_to_pcm16(&mono, src_rate);
                if !frame.is_empty() {
                    slot.push(frame);
                }
            },
            err_fn,
            None,
        )
        .map_err(|e| {
            ClientError::AudioDeviceError(format!("Failed to build input stream: {}", e))
        })?;

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_frame_slot_delivers_frame() {
        let slot = FrameSlot::new();
        slot.push(vec![1, 2, 3]);

        assert_eq!(slot.pop().await, vec![1, 2, 3]);
        assert_eq!(slot.dropped_frames(), 0);
    }

    #[tokio::test]
    async fn test_frame_slot_overwrites_and_counts() {
        let slot = FrameSlot::new();
        slot.push(vec![1]);
        slot.push(vec![2]);
        slot.push(vec![3]);

        // Only the latest frame survives
        assert_eq!(slot.pop().await, vec![3]);
        assert_eq!(slot.dropped_frames(), 2);
    }

    #[tokio::test]
    async fn test_frame_slot_wakes_waiting_consumer() {
        let slot = FrameSlot::new();
        let consumer_slot = slot.clone();

        let consumer = tokio::spawn(async move { consumer_slot.pop().await });
        tokio::task::yield_now().await;
        slot.push(vec![7, 7]);

        let frame = tokio::time::timeout(std::time::Duration::from_secs(1), consumer)
            .await
            .expect("Consumer should wake")
            .expect("Task should complete");
        assert_eq!(frame, vec![7, 7]);
    }

    #[tokio::test]
    async fn test_take_dropped_resets_count() {
        let slot = FrameSlot::new();
        slot.push(vec![1]);
        slot.push(vec![2]);
        slot.push(vec![3]);

        assert_eq!(slot.take_dropped(), 2);
        // A later session starts from zero
        assert_eq!(slot.take_dropped(), 0);
    }

    #[tokio::test]
    async fn test_forward_frames_drops_muted_frames() {
        use std::sync::atomic::AtomicBool;

        let slot = FrameSlot::new();
        let muted = Arc::new(AtomicBool::new(true));
        let (out_tx, mut out_rx) = tokio::sync::mpsc::unbounded_channel();

        let task = tokio::spawn(forward_frames(slot.clone(), muted.clone(), out_tx));

        slot.push(vec![1, 2, 3]);
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert!(out_rx.try_recv().is_err(), "Muted frame must not be sent");

        muted.store(false, Ordering::Relaxed);
        slot.push(vec![4, 5]);
        let env = tokio::time::timeout(std::time::Duration::from_secs(1), out_rx.recv())
            .await
            .expect("Should receive within timeout")
            .expect("Channel should stay open");
        match env {
            Envelope::Audio { data } => {
                let bytes = voxrelay_protocol::decode_base64(&data).expect("Should decode");
                assert_eq!(bytes, pcm16_to_bytes(&[4, 5]));
            }
            other => panic!("Expected Audio envelope, got {:?}", other),
        }

        task.abort();
    }

    #[tokio::test]
    async fn test_forward_frames_stops_on_closed_channel() {
        use std::sync::atomic::AtomicBool;

        let slot = FrameSlot::new();
        let muted = Arc::new(AtomicBool::new(false));
        let (out_tx, out_rx) = tokio::sync::mpsc::unbounded_channel();
        drop(out_rx);

        let task = tokio::spawn(forward_frames(slot.clone(), muted, out_tx));
        slot.push(vec![1]);

        tokio::time::timeout(std::time::Duration::from_secs(1), task)
            .await
            .expect("Forwarder should exit")
            .expect("Task should complete");
    }

    #[test]
    fn test_capture_thread_lifecycle() {
        // Start/stop without a device must not panic; errors are logged
        let mut capture = Capture::spawn().expect("Should spawn capture thread");
        capture.start();
        capture.stop();
        capture.shutdown();
    }
}
