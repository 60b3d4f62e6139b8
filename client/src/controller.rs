//! Push-to-talk conversation state machine.
//!
//! The controller owns the pipeline state and drives all capture and
//! playback side effects through the `VoicePipeline` trait, which keeps
//! the transition table testable against a mock pipeline.

use tracing::debug;

/// Conversation pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Nothing in flight; waiting for the user or the model
    Idle,
    /// Microphone open, streaming the user's turn
    Listening,
    /// User turn ended, awaiting the model's response
    Processing,
    /// Playing synthesized model speech
    Speaking,
}

/// Side effects the controller drives.
///
/// Implementations must release the underlying hardware handle on every
/// stop before the next start acquires it again.
pub trait VoicePipeline {
    /// Open the microphone and begin streaming frames.
    fn start_capture(&mut self);

    /// Stop streaming and release the microphone.
    fn stop_capture(&mut self);

    /// Play a self-describing audio container, replacing any current
    /// playback.
    fn start_playback(&mut self, container: Vec<u8>);

    /// Stop the current playback.
    fn stop_playback(&mut self);

    /// Send a `stop` envelope to interrupt the model's turn.
    fn send_stop(&mut self);
}

/// Drives `PipelineState` transitions in response to user input, gateway
/// envelopes, and playback completion.
pub struct Controller<P: VoicePipeline> {
    state: PipelineState,
    muted: bool,
    pipeline: P,
}

impl<P: VoicePipeline> Controller<P> {
    pub fn new(pipeline: P, muted: bool) -> Self {
        Self {
            state: PipelineState::Idle,
            muted,
            pipeline,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Handle the push-to-talk control.
    ///
    /// From `speaking` this is a barge-in: playback stops, exactly one
    /// `stop` envelope goes out, and capture begins without passing
    /// through `idle`.
    pub fn press(&mut self) {
        match self.state {
            PipelineState::Idle => {
                self.pipeline.stop_playback();
                self.pipeline.start_capture();
                self.state = PipelineState::Listening;
            }
            PipelineState::Listening => {
                self.pipeline.stop_capture();
                self.state = PipelineState::Processing;
            }
            PipelineState::Speaking => {
                self.pipeline.stop_playback();
                self.pipeline.send_stop();
                self.pipeline.start_capture();
                self.state = PipelineState::Listening;
            }
            PipelineState::Processing => {
                debug!("Press ignored while awaiting model response");
            }
        }
    }

    /// Handle a decoded inbound audio container from the gateway.
    ///
    /// When muted the audio is dropped without a state change.
    pub fn on_audio(&mut self, container: Vec<u8>) {
        if self.muted {
            debug!("Muted, dropping inbound audio");
            return;
        }
        match self.state {
            PipelineState::Idle | PipelineState::Processing | PipelineState::Speaking => {
                if self.state == PipelineState::Speaking {
                    self.pipeline.stop_playback();
                }
                self.pipeline.start_playback(container);
                self.state = PipelineState::Speaking;
            }
            PipelineState::Listening => {
                debug!("Dropping inbound audio while listening");
            }
        }
    }

    /// Handle a `turnComplete` envelope. Only meaningful while awaiting
    /// the model's response.
    pub fn on_turn_complete(&mut self) {
        if self.state == PipelineState::Processing {
            self.state = PipelineState::Idle;
        } else {
            debug!(state = ?self.state, "Ignoring turnComplete");
        }
    }

    /// Handle natural end of playback reported by the playback thread.
    pub fn on_playback_finished(&mut self) {
        if self.state == PipelineState::Speaking {
            self.state = PipelineState::Idle;
        }
    }

    /// Toggle or set the mute flag. Enabling mute while speaking stops
    /// the current output.
    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted && self.state == PipelineState::Speaking {
            self.pipeline.stop_playback();
            self.state = PipelineState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    enum Effect {
        StartCapture,
        StopCapture,
        StartPlayback,
        StopPlayback,
        SendStop,
    }

    #[derive(Default)]
    struct MockPipeline {
        effects: Vec<Effect>,
    }

    impl VoicePipeline for MockPipeline {
        fn start_capture(&mut self) {
            self.effects.push(Effect::StartCapture);
        }
        fn stop_capture(&mut self) {
            self.effects.push(Effect::StopCapture);
        }
        fn start_playback(&mut self, _container: Vec<u8>) {
            self.effects.push(Effect::StartPlayback);
        }
        fn stop_playback(&mut self) {
            self.effects.push(Effect::StopPlayback);
        }
        fn send_stop(&mut self) {
            self.effects.push(Effect::SendStop);
        }
    }

    fn controller() -> Controller<MockPipeline> {
        Controller::new(MockPipeline::default(), false)
    }

    #[test]
    fn test_normal_turn_cycle() {
        let mut c = controller();
        assert_eq!(c.state(), PipelineState::Idle);

        c.press();
        assert_eq!(c.state(), PipelineState::Listening);

        c.press();
        assert_eq!(c.state(), PipelineState::Processing);

        c.on_turn_complete();
        assert_eq!(c.state(), PipelineState::Idle);

        assert_eq!(
            c.pipeline.effects,
            vec![Effect::StopPlayback, Effect::StartCapture, Effect::StopCapture]
        );
    }

    #[test]
    fn test_audio_starts_playback() {
        let mut c = controller();
        c.on_audio(vec![1, 2, 3]);

        assert_eq!(c.state(), PipelineState::Speaking);
        assert_eq!(c.pipeline.effects, vec![Effect::StartPlayback]);
    }

    #[test]
    fn test_playback_finished_returns_to_idle() {
        let mut c = controller();
        c.on_audio(vec![1]);
        c.on_playback_finished();

        assert_eq!(c.state(), PipelineState::Idle);
    }

    #[test]
    fn test_barge_in_sends_exactly_one_stop() {
        let mut c = controller();
        c.on_audio(vec![1]);
        assert_eq!(c.state(), PipelineState::Speaking);

        c.press();

        assert_eq!(c.state(), PipelineState::Listening);
        let stops = c
            .pipeline
            .effects
            .iter()
            .filter(|e| **e == Effect::SendStop)
            .count();
        assert_eq!(stops, 1);
        // Playback must stop before the new capture starts
        assert_eq!(
            c.pipeline.effects,
            vec![
                Effect::StartPlayback,
                Effect::StopPlayback,
                Effect::SendStop,
                Effect::StartCapture,
            ]
        );
    }

    #[test]
    fn test_press_ignored_while_processing() {
        let mut c = controller();
        c.press();
        c.press();
        assert_eq!(c.state(), PipelineState::Processing);

        let effects_before = c.pipeline.effects.len();
        c.press();

        assert_eq!(c.state(), PipelineState::Processing);
        assert_eq!(c.pipeline.effects.len(), effects_before);
    }

    #[test]
    fn test_turn_complete_only_from_processing() {
        let mut c = controller();
        c.on_turn_complete();
        assert_eq!(c.state(), PipelineState::Idle);

        c.press();
        c.on_turn_complete();
        assert_eq!(c.state(), PipelineState::Listening);

        c.on_audio(vec![1]);
        assert_eq!(c.state(), PipelineState::Listening);
    }

    #[test]
    fn test_audio_replaces_current_playback() {
        let mut c = controller();
        c.on_audio(vec![1]);
        c.on_audio(vec![2]);

        assert_eq!(c.state(), PipelineState::Speaking);
        assert_eq!(
            c.pipeline.effects,
            vec![
                Effect::StartPlayback,
                Effect::StopPlayback,
                Effect::StartPlayback,
            ]
        );
    }

    #[test]
    fn test_mute_drops_inbound_audio() {
        let mut c = Controller::new(MockPipeline::default(), true);
        c.on_audio(vec![1, 2]);

        assert_eq!(c.state(), PipelineState::Idle);
        assert!(c.pipeline.effects.is_empty());
    }

    #[test]
    fn test_mute_during_speaking_stops_playback() {
        let mut c = controller();
        c.on_audio(vec![1]);
        assert_eq!(c.state(), PipelineState::Speaking);

        c.set_muted(true);

        assert_eq!(c.state(), PipelineState::Idle);
        assert_eq!(
            c.pipeline.effects,
            vec![Effect::StartPlayback, Effect::StopPlayback]
        );
    }

    #[test]
    fn test_scenario_processing_to_idle_on_turn_complete() {
        // Full silence-turn scenario: capture a turn, release, then the
        // model completes without audio
        let mut c = controller();
        c.press();
        c.press();
        assert_eq!(c.state(), PipelineState::Processing);

        c.on_turn_complete();
        assert_eq!(c.state(), PipelineState::Idle);
    }
}
