//! Ring sequencer.
//!
//! Drives one media handle through the rings of the bound thread in the
//! configured [`RingOrder`], advancing automatically at the end of each clip
//! after a short pause. Everything runs on the caller's event loop: the host
//! pumps [`Sequencer::tick`] and the sequencer reacts to media events and its
//! own timers from there. Every public operation leaves [`PlaybackState`]
//! fully updated before it returns.

use std::{collections::BTreeSet, fmt};

use serde::{Deserialize, Serialize};

use crate::{
    audio::{MediaBackend, MediaEvent, MediaHandle},
    config::{PlaybackConfig, RenderConfig},
    model::{Ring, Thread},
    scene::{compose_rings, mark_failed, RingVisual},
    timeline::{PlaybackClock, TimerKind, TimerQueue},
    ForestalkError, Result, RingOrder,
};

/// Playback snapshot shared with the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackState {
    pub is_playing: bool,
    pub current_ring_index: Option<usize>,
    /// Fraction of the current ring already played, within `[0, 1]`.
    pub progress: f64,
}

impl PlaybackState {
    pub const IDLE: PlaybackState = PlaybackState {
        is_playing: false,
        current_ring_index: None,
        progress: 0.0,
    };

    fn started(index: usize) -> Self {
        Self {
            is_playing: true,
            current_ring_index: Some(index),
            progress: 0.0,
        }
    }
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self::IDLE
    }
}

/// Internal state machine of the sequencer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackPhase {
    #[default]
    Idle,
    Playing(usize),
    /// Paused mid-ring; resuming continues from the paused position.
    Paused(usize),
    /// A ring ended and the next one starts once the inter-ring pause elapses.
    Advancing { from: usize, next: usize },
    /// The next ring was paused before it got to start; resuming starts it.
    Cued(usize),
}

/// Notifications delivered to subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum SequencerEvent {
    StateChanged(PlaybackState),
    /// A ring could not be played. The sequencer is idle again and other
    /// rings can still be selected.
    RingFailed {
        index: usize,
        ring_id: String,
        error: String,
    },
    /// The last ring of the sequence finished.
    SequenceFinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&SequencerEvent)>;

struct Session<H> {
    thread: Thread,
    media: H,
}

/// Owner of the playback cursor and the single media handle of the bound
/// thread.
pub struct Sequencer<B: MediaBackend> {
    backend: B,
    config: PlaybackConfig,
    session: Option<Session<B::Handle>>,
    state: PlaybackState,
    phase: PlaybackPhase,
    clock: PlaybackClock,
    timers: TimerQueue,
    failed: BTreeSet<usize>,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
}

impl<B: MediaBackend> Sequencer<B> {
    pub fn new(backend: B, config: PlaybackConfig) -> Self {
        Self {
            backend,
            config,
            session: None,
            state: PlaybackState::IDLE,
            phase: PlaybackPhase::Idle,
            clock: PlaybackClock::default(),
            timers: TimerQueue::new(),
            failed: BTreeSet::new(),
            listeners: Vec::new(),
            next_subscription: 0,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn order(&self) -> RingOrder {
        self.config.order
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn phase(&self) -> PlaybackPhase {
        self.phase
    }

    pub fn thread(&self) -> Option<&Thread> {
        self.session.as_ref().map(|session| &session.thread)
    }

    pub fn media(&self) -> Option<&B::Handle> {
        self.session.as_ref().map(|session| &session.media)
    }

    /// Event-loop time in seconds since the sequencer was created.
    pub fn now(&self) -> f64 {
        self.clock.time_seconds
    }

    /// Rings whose last play attempt failed.
    pub fn failed_rings(&self) -> Vec<usize> {
        self.failed.iter().copied().collect()
    }

    /// Ring visuals of the bound thread for the current state, with failed
    /// rings flagged. Empty when nothing is bound.
    pub fn ring_visuals(&self, render: &RenderConfig) -> Vec<RingVisual> {
        let Some(thread) = self.thread() else {
            return Vec::new();
        };
        let mut visuals = compose_rings(thread, &self.state, self.config.order, render);
        mark_failed(&mut visuals, &self.failed_rings());
        visuals
    }

    pub fn has_pending_timers(&self) -> bool {
        !self.timers.is_empty()
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&SequencerEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        before != self.listeners.len()
    }

    /// Opens `thread` for playback. Any previously bound thread is torn down
    /// first so its audio cannot keep playing.
    pub fn bind(&mut self, thread: Thread) -> Result<()> {
        self.release();
        self.failed.clear();
        // Reset before acquiring so a failed acquire leaves nothing bound and
        // nothing reported as playing.
        self.set_state(PlaybackState::IDLE);

        let media = self.backend.acquire()?;
        tracing::debug!(thread = %thread.id, rings = thread.ring_count(), "bound thread");
        self.session = Some(Session { thread, media });
        Ok(())
    }

    /// Closes the bound thread, stopping audio and cancelling every pending
    /// timer.
    pub fn unbind(&mut self) {
        if self.session.is_none() {
            return;
        }
        self.release();
        self.failed.clear();
        self.set_state(PlaybackState::IDLE);
    }

    /// Appends a freshly recorded ring to the bound thread without touching
    /// the current playback.
    pub fn append_ring(&mut self, ring: Ring) -> Result<()> {
        let session = self.session.as_mut().ok_or(ForestalkError::NotBound)?;
        tracing::debug!(thread = %session.thread.id, ring = %ring.id, "ring appended");
        // Existing indices stay valid, so playback in progress is unaffected.
        session.thread.append_ring(ring);
        Ok(())
    }

    /// Starts `index` from its beginning, abandoning whatever was playing.
    ///
    /// # Panics
    ///
    /// Panics when `index` is not a ring of the bound thread. Indices must
    /// come from the ordering policy or from the rendered ring visuals; use
    /// [`Sequencer::try_play_ring`] for anything else.
    pub fn play_ring(&mut self, index: usize) {
        match self.try_play_ring(index) {
            Ok(()) => {}
            Err(err @ ForestalkError::InvalidIndex { .. }) => panic!("{err}"),
            Err(err) => tracing::warn!(%err, index, "play request ignored"),
        }
    }

    /// Checked variant of [`Sequencer::play_ring`]. Media failures are not
    /// returned; they are reported through [`SequencerEvent::RingFailed`].
    pub fn try_play_ring(&mut self, index: usize) -> Result<()> {
        let session = self.session.as_mut().ok_or(ForestalkError::NotBound)?;
        let len = session.thread.ring_count();
        let ring = session
            .thread
            .ring(index)
            .ok_or(ForestalkError::InvalidIndex { index, len })?;
        let url = ring.audio_url.clone();
        let duration = ring.duration_seconds;

        self.timers.cancel_all();
        self.phase = PlaybackPhase::Playing(index);
        self.state = PlaybackState::started(index);

        let outcome = match session.media.load(&url, duration) {
            Ok(()) => session.media.play(),
            Err(err) => Err(err),
        };

        match outcome {
            Ok(()) => {
                self.failed.remove(&index);
                tracing::info!(index, %url, duration, "playing ring");
                self.schedule_poll();
                self.emit(SequencerEvent::StateChanged(self.state));
            }
            Err(err) => self.fail_ring(index, err),
        }
        Ok(())
    }

    /// Plays the whole thread from the first ring of the ordering policy.
    pub fn play_sequence_from_start(&mut self) {
        let len = self.thread().map(Thread::ring_count).unwrap_or(0);
        match self.config.order.first_index(len) {
            Some(first) => self.play_ring(first),
            None => tracing::debug!("nothing to play"),
        }
    }

    pub fn pause(&mut self) {
        match self.phase {
            PlaybackPhase::Playing(index) => {
                self.timers.cancel_all();
                if let Some(session) = self.session.as_mut() {
                    session.media.pause();
                }
                // Capture the position reached since the last poll.
                let progress = self.current_progress(index);
                self.phase = PlaybackPhase::Paused(index);
                self.set_state(PlaybackState {
                    is_playing: false,
                    current_ring_index: Some(index),
                    progress,
                });
                tracing::debug!(index, progress, "paused");
            }
            PlaybackPhase::Advancing { next, .. } => {
                self.timers.cancel_all();
                self.phase = PlaybackPhase::Cued(next);
                self.set_state(PlaybackState {
                    is_playing: false,
                    current_ring_index: Some(next),
                    progress: 0.0,
                });
                tracing::debug!(next, "paused between rings");
            }
            phase => tracing::debug!(?phase, "pause ignored"),
        }
    }

    pub fn resume(&mut self) {
        match self.phase {
            PlaybackPhase::Paused(index) => {
                let outcome = match self.session.as_mut() {
                    Some(session) => session.media.play(),
                    None => Err(ForestalkError::NotBound),
                };
                match outcome {
                    Ok(()) => {
                        self.phase = PlaybackPhase::Playing(index);
                        self.state.is_playing = true;
                        self.schedule_poll();
                        self.emit(SequencerEvent::StateChanged(self.state));
                        tracing::debug!(index, "resumed");
                    }
                    Err(err) => self.fail_ring(index, err),
                }
            }
            PlaybackPhase::Cued(index) => self.play_ring(index),
            phase => tracing::debug!(?phase, "resume ignored"),
        }
    }

    /// Play/pause button semantics.
    pub fn toggle(&mut self) {
        match self.phase {
            PlaybackPhase::Playing(_) => self.pause(),
            PlaybackPhase::Paused(_) | PlaybackPhase::Cued(_) => self.resume(),
            PlaybackPhase::Advancing { next, .. } => self.play_ring(next),
            PlaybackPhase::Idle => self.play_sequence_from_start(),
        }
    }

    /// Click on a ring: pauses it when it is the one playing, otherwise jumps
    /// to it.
    pub fn select_ring(&mut self, index: usize) {
        if self.phase == PlaybackPhase::Playing(index) {
            self.pause();
        } else {
            self.play_ring(index);
        }
    }

    /// Lets `delta` seconds pass on the event loop: the media reports what
    /// happened meanwhile and due timers fire in deadline order.
    pub fn tick(&mut self, delta: f64) {
        self.clock.advance(delta);

        if let PlaybackPhase::Playing(index) = self.phase {
            let event = self
                .session
                .as_mut()
                .and_then(|session| session.media.advance(delta));
            match event {
                Some(MediaEvent::Ended) => self.on_ring_ended(index),
                Some(MediaEvent::Failed(reason)) => {
                    let url = self.ring_url(index);
                    self.fail_ring(index, ForestalkError::MediaPlayback { url, reason });
                }
                None => {}
            }
        }

        let now = self.clock.time_seconds;
        while let Some(timer) = self.timers.pop_due(now) {
            match timer.kind {
                TimerKind::ProgressPoll => self.poll_progress(),
                TimerKind::Advance { next } => {
                    if matches!(self.phase, PlaybackPhase::Advancing { next: pending, .. } if pending == next)
                    {
                        self.play_ring(next);
                    }
                }
            }
        }
    }

    fn on_ring_ended(&mut self, index: usize) {
        self.timers.cancel_all();
        let len = self.thread().map(Thread::ring_count).unwrap_or(0);
        self.set_state(PlaybackState {
            is_playing: false,
            current_ring_index: Some(index),
            progress: 1.0,
        });

        match self.config.order.next_index(index, len) {
            Some(next) => {
                self.phase = PlaybackPhase::Advancing { from: index, next };
                let due = self.clock.time_seconds + self.config.advance_delay_seconds();
                self.timers.schedule(due, TimerKind::Advance { next });
                tracing::debug!(index, next, "ring ended, advancing");
            }
            None => {
                self.phase = PlaybackPhase::Idle;
                self.set_state(PlaybackState::IDLE);
                tracing::info!(rings = len, "sequence finished");
                self.emit(SequencerEvent::SequenceFinished);
            }
        }
    }

    fn poll_progress(&mut self) {
        let PlaybackPhase::Playing(index) = self.phase else {
            return;
        };
        let progress = self.current_progress(index);
        if progress != self.state.progress {
            self.set_state(PlaybackState {
                progress,
                ..self.state
            });
        }
        self.schedule_poll();
    }

    fn schedule_poll(&mut self) {
        let due = self.clock.time_seconds + self.config.poll_interval_seconds();
        self.timers.schedule(due, TimerKind::ProgressPoll);
    }

    fn current_progress(&self, index: usize) -> f64 {
        let Some(session) = self.session.as_ref() else {
            return 0.0;
        };
        let duration = session
            .thread
            .ring(index)
            .map(|ring| ring.duration_seconds)
            .unwrap_or(0.0);
        if !(duration.is_finite() && duration > 0.0) {
            return 0.0;
        }
        let fraction = session.media.current_time() / duration;
        if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        }
    }

    fn ring_url(&self, index: usize) -> String {
        self.thread()
            .and_then(|thread| thread.ring(index))
            .map(|ring| ring.audio_url.clone())
            .unwrap_or_default()
    }

    /// Abandons `index` after a media failure and falls back to idle.
    fn fail_ring(&mut self, index: usize, err: ForestalkError) {
        tracing::warn!(%err, index, "ring playback failed");
        self.timers.cancel_all();
        let ring_id = match self.session.as_mut() {
            Some(session) => {
                session.media.stop();
                session
                    .thread
                    .ring(index)
                    .map(|ring| ring.id.clone())
                    .unwrap_or_default()
            }
            None => String::new(),
        };
        self.failed.insert(index);
        self.phase = PlaybackPhase::Idle;
        self.state = PlaybackState::IDLE;
        self.emit(SequencerEvent::RingFailed {
            index,
            ring_id,
            error: err.to_string(),
        });
        self.emit(SequencerEvent::StateChanged(self.state));
    }

    /// Stops audio, cancels timers and drops the media handle.
    fn release(&mut self) {
        self.timers.cancel_all();
        self.phase = PlaybackPhase::Idle;
        if let Some(mut session) = self.session.take() {
            session.media.stop();
            tracing::debug!(thread = %session.thread.id, "released thread");
        }
    }

    fn set_state(&mut self, state: PlaybackState) {
        self.state = state;
        self.emit(SequencerEvent::StateChanged(state));
    }

    fn emit(&mut self, event: SequencerEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
    }
}

impl<B: MediaBackend> Drop for Sequencer<B> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<B: MediaBackend> fmt::Debug for Sequencer<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequencer")
            .field("thread", &self.thread().map(|thread| thread.id.as_str()))
            .field("phase", &self.phase)
            .field("state", &self.state)
            .field("pending_timers", &self.timers.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
