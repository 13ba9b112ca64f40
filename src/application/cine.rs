// SPDX-License-Identifier: MPL-2.0
//! Cine playback engine.
//!
//! The engine is a plain state machine; it does not own a timer. Whoever
//! drives it (the runtime) reads [`CinePlaybackEngine::timer`] after every
//! operation and keeps exactly one repeating timer matching that [`TimerSpec`].
//!
//! Every `stop()` bumps the generation. Loads started by a tick carry the
//! generation they were issued under, and [`CinePlaybackEngine::accepts`]
//! rejects anything from an older session.

use crate::domain::playback::{CineState, FrameRate};
use crate::domain::sequence::SequenceNavigator;
use std::fmt;
use std::time::Duration;

/// Called with the new index after every cine step.
pub type FrameCallback = Box<dyn FnMut(usize) + Send>;

/// What the driving timer should look like while playing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSpec {
    pub interval: Duration,
    pub generation: u64,
}

pub struct CinePlaybackEngine {
    state: CineState,
    frame_rate: FrameRate,
    generation: u64,
    on_frame: Option<FrameCallback>,
    failure_reported: bool,
}

impl CinePlaybackEngine {
    #[must_use]
    pub fn new(frame_rate: FrameRate) -> Self {
        Self {
            state: CineState::Stopped,
            frame_rate,
            generation: 0,
            on_frame: None,
            failure_reported: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> CineState {
        self.state
    }

    #[must_use]
    pub fn is_playing(&self) -> bool {
        self.state.is_playing()
    }

    #[must_use]
    pub fn frame_rate(&self) -> FrameRate {
        self.frame_rate
    }

    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_frame_callback(&mut self, callback: FrameCallback) {
        self.on_frame = Some(callback);
    }

    #[must_use]
    pub fn has_frame_callback(&self) -> bool {
        self.on_frame.is_some()
    }

    /// Enters the playing state. Returns `false` if it was already playing.
    pub fn play(&mut self) -> bool {
        if self.is_playing() {
            log::debug!("cine already running");
            return false;
        }
        self.state = CineState::Playing;
        self.failure_reported = false;
        log::info!("cine started at {} fps", self.frame_rate.fps());
        true
    }

    /// Leaves the playing state and starts a new generation. Returns `false`
    /// if it was not playing.
    pub fn stop(&mut self) -> bool {
        if !self.is_playing() {
            log::debug!("cine not running");
            return false;
        }
        self.state = CineState::Stopped;
        self.generation += 1;
        log::info!("cine stopped");
        true
    }

    /// Flips between playing and stopped; returns whether it now plays.
    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.stop();
        } else {
            self.play();
        }
        self.is_playing()
    }

    /// Changes the rate. A running session is restarted at the new interval.
    pub fn set_frame_rate(&mut self, frame_rate: FrameRate) {
        self.frame_rate = frame_rate;
        if self.is_playing() {
            self.stop();
            self.play();
        }
    }

    /// Stops and drops the frame callback. Safe to call repeatedly.
    pub fn dispose(&mut self) {
        if self.is_playing() {
            self.stop();
        } else {
            self.generation += 1;
        }
        self.on_frame = None;
    }

    /// Timer the engine wants right now, `None` when stopped.
    #[must_use]
    pub fn timer(&self) -> Option<TimerSpec> {
        self.is_playing().then(|| TimerSpec {
            interval: self.frame_rate.interval(),
            generation: self.generation,
        })
    }

    /// Advances the navigator by one wrapping step.
    ///
    /// Returns the new index, or `None` when stopped or the sequence is empty.
    pub fn tick(&mut self, navigator: &mut SequenceNavigator) -> Option<usize> {
        if !self.is_playing() {
            return None;
        }
        let index = navigator.cine_step()?;
        if let Some(callback) = self.on_frame.as_mut() {
            callback(index);
        }
        Some(index)
    }

    /// Whether a load issued under `generation` still belongs to the running
    /// session.
    #[must_use]
    pub fn accepts(&self, generation: u64) -> bool {
        self.is_playing() && generation == self.generation
    }

    /// Records a failed frame. Returns `true` only for the first failure of a
    /// run of consecutive failures.
    pub fn record_failure(&mut self) -> bool {
        !std::mem::replace(&mut self.failure_reported, true)
    }

    /// Records a displayed frame, ending any failure run.
    pub fn record_success(&mut self) {
        self.failure_reported = false;
    }
}

impl Default for CinePlaybackEngine {
    fn default() -> Self {
        Self::new(FrameRate::default())
    }
}

impl fmt::Debug for CinePlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CinePlaybackEngine")
            .field("state", &self.state)
            .field("frame_rate", &self.frame_rate)
            .field("generation", &self.generation)
            .field("has_frame_callback", &self.on_frame.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sequence::ImageId;
    use proptest::prelude::*;
    use std::sync::{Arc, Mutex};

    fn navigator(len: usize) -> SequenceNavigator {
        SequenceNavigator::from_ids((0..len).map(|i| ImageId::new(format!("img-{i}"))).collect())
    }

    #[test]
    fn play_is_idempotent() {
        let mut engine = CinePlaybackEngine::default();
        assert!(engine.play());
        assert!(!engine.play());
        assert!(engine.is_playing());
        assert_eq!(engine.generation(), 0);
    }

    #[test]
    fn stop_bumps_generation_and_keeps_index() {
        let mut engine = CinePlaybackEngine::default();
        let mut nav = navigator(10);
        engine.play();
        engine.tick(&mut nav);
        engine.tick(&mut nav);

        assert!(engine.stop());
        assert!(!engine.stop());
        assert_eq!(engine.generation(), 1);
        assert_eq!(nav.current_index(), Some(2));
        assert!(engine.timer().is_none());
    }

    #[test]
    fn tick_is_ignored_when_stopped() {
        let mut engine = CinePlaybackEngine::default();
        let mut nav = navigator(3);
        assert_eq!(engine.tick(&mut nav), None);
        assert_eq!(nav.current_index(), Some(0));
    }

    #[test]
    fn toggle_reports_resulting_state() {
        let mut engine = CinePlaybackEngine::default();
        assert!(engine.toggle());
        assert!(!engine.toggle());
        assert!(engine.toggle());
    }

    #[test]
    fn frame_rate_change_restarts_session() {
        let mut engine = CinePlaybackEngine::default();
        engine.play();
        let before = engine.timer().unwrap();

        engine.set_frame_rate(FrameRate::new(20));
        let after = engine.timer().unwrap();

        assert!(engine.is_playing());
        assert_eq!(after.interval, Duration::from_millis(50));
        assert_eq!(after.generation, before.generation + 1);
        assert!(!engine.accepts(before.generation));
    }

    #[test]
    fn frame_rate_change_while_stopped_keeps_generation() {
        let mut engine = CinePlaybackEngine::default();
        engine.set_frame_rate(FrameRate::new(5));
        assert!(!engine.is_playing());
        assert_eq!(engine.generation(), 0);
        assert_eq!(engine.frame_rate().fps(), 5);
    }

    #[test]
    fn dispose_releases_callback_and_is_idempotent() {
        let mut engine = CinePlaybackEngine::default();
        engine.set_frame_callback(Box::new(|_| {}));
        engine.play();

        engine.dispose();
        let generation = engine.generation();
        assert!(!engine.is_playing());
        assert!(!engine.has_frame_callback());

        engine.dispose();
        assert!(!engine.is_playing());
        assert!(engine.generation() > generation);
    }

    #[test]
    fn callback_sees_every_index() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut engine = CinePlaybackEngine::default();
        engine.set_frame_callback(Box::new(move |index| sink.lock().unwrap().push(index)));
        engine.play();

        let mut nav = navigator(3);
        for _ in 0..4 {
            engine.tick(&mut nav);
        }
        assert_eq!(*seen.lock().unwrap(), vec![1, 2, 0, 1]);
    }

    #[test]
    fn failures_are_reported_once_per_run() {
        let mut engine = CinePlaybackEngine::default();
        engine.play();
        assert!(engine.record_failure());
        assert!(!engine.record_failure());
        engine.record_success();
        assert!(engine.record_failure());
    }

    #[test]
    fn accepts_only_current_generation_while_playing() {
        let mut engine = CinePlaybackEngine::default();
        assert!(!engine.accepts(0));
        engine.play();
        assert!(engine.accepts(0));
        engine.stop();
        engine.play();
        assert!(!engine.accepts(0));
        assert!(engine.accepts(1));
    }

    proptest! {
        #[test]
        fn ticks_follow_wrap_around(fps in 1u32..=30, len in 1usize..25, ticks in 0usize..120) {
            let mut engine = CinePlaybackEngine::new(FrameRate::new(fps));
            let mut nav = navigator(len);
            engine.play();
            for _ in 0..ticks {
                engine.tick(&mut nav);
            }
            prop_assert_eq!(nav.current_index(), Some(ticks % len));
        }
    }
}
