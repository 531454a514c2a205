//! Media abstraction owned by the sequencer.
//!
//! A [`MediaBackend`] hands out one [`MediaHandle`] per bound thread. The
//! handle plays one clip at a time and is released when dropped, so the
//! sequencer cannot leak playback past a teardown.

use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    rc::Rc,
};

use crate::{ForestalkError, Result};

/// Notifications raised by a media handle while time passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    /// The loaded clip played to its end.
    Ended,
    /// Playback broke off mid-clip.
    Failed(String),
}

/// A single audio element.
pub trait MediaHandle {
    /// Points the element at a new clip, discarding whatever was loaded.
    /// `duration_hint` is the length recorded in the ring metadata.
    fn load(&mut self, url: &str, duration_hint: f64) -> Result<()>;
    /// Starts or resumes playback from the current position.
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    /// Halts playback and rewinds; the loaded source is dropped.
    fn stop(&mut self);
    /// Playback position of the loaded clip in seconds.
    fn current_time(&self) -> f64;
    /// Lets `delta` seconds of event-loop time pass. Backends that play in
    /// real time use this only to report events that happened meanwhile.
    fn advance(&mut self, delta: f64) -> Option<MediaEvent>;
}

/// Factory for media handles.
pub trait MediaBackend {
    type Handle: MediaHandle;

    fn acquire(&mut self) -> Result<Self::Handle>;
}

/// Calls observed by the simulated backend, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Acquired(u64),
    Load { handle: u64, url: String },
    Play { handle: u64 },
    Pause { handle: u64 },
    Stop { handle: u64 },
    Released(u64),
}

/// Shared record of every call made against simulated handles.
#[derive(Debug, Clone, Default)]
pub struct MediaLog {
    calls: Rc<RefCell<Vec<MediaCall>>>,
}

impl MediaLog {
    pub fn calls(&self) -> Vec<MediaCall> {
        self.calls.borrow().clone()
    }

    /// URLs loaded so far, in order.
    pub fn loaded_urls(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter_map(|call| match call {
                MediaCall::Load { url, .. } => Some(url.clone()),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: MediaCall) {
        tracing::trace!(?call, "media call");
        self.calls.borrow_mut().push(call);
    }
}

#[derive(Debug, Default)]
struct FailurePlan {
    loads: HashSet<String>,
    plays: HashSet<String>,
    /// Position in seconds at which a playing clip breaks off.
    mid_clip: HashMap<String, f64>,
}

/// Deterministic backend whose clips advance only when the event loop is
/// pumped. Used by the command line host and by tests.
#[derive(Debug, Default)]
pub struct SimulatedBackend {
    log: MediaLog,
    failures: Rc<RefCell<FailurePlan>>,
    next_handle: u64,
}

impl SimulatedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&self) -> MediaLog {
        self.log.clone()
    }

    /// Makes every later `load` of `url` fail, as if the file were missing.
    pub fn fail_load(&self, url: impl Into<String>) {
        self.failures.borrow_mut().loads.insert(url.into());
    }

    /// Makes every later `play` of `url` be rejected.
    pub fn reject_play(&self, url: impl Into<String>) {
        self.failures.borrow_mut().plays.insert(url.into());
    }

    /// Makes playback of `url` break off once it reaches `at_seconds`, as if
    /// the stream dropped. Failures at or past the clip's end never fire.
    pub fn fail_mid_clip(&self, url: impl Into<String>, at_seconds: f64) {
        self.failures
            .borrow_mut()
            .mid_clip
            .insert(url.into(), at_seconds);
    }

    pub fn clear_failures(&self) {
        let mut failures = self.failures.borrow_mut();
        failures.loads.clear();
        failures.plays.clear();
        failures.mid_clip.clear();
    }
}

impl MediaBackend for SimulatedBackend {
    type Handle = SimulatedMedia;

    fn acquire(&mut self) -> Result<SimulatedMedia> {
        let id = self.next_handle;
        self.next_handle += 1;
        self.log.push(MediaCall::Acquired(id));
        Ok(SimulatedMedia {
            id,
            source: None,
            duration: 0.0,
            position: 0.0,
            playing: false,
            ended: false,
            log: self.log.clone(),
            failures: Rc::clone(&self.failures),
        })
    }
}

/// Audio element simulated from ring metadata.
#[derive(Debug)]
pub struct SimulatedMedia {
    id: u64,
    source: Option<String>,
    duration: f64,
    position: f64,
    playing: bool,
    ended: bool,
    log: MediaLog,
    failures: Rc<RefCell<FailurePlan>>,
}

impl SimulatedMedia {
    fn interruption(&self) -> Option<f64> {
        let source = self.source.as_deref()?;
        self.failures.borrow().mid_clip.get(source).copied()
    }
}

impl MediaHandle for SimulatedMedia {
    fn load(&mut self, url: &str, duration_hint: f64) -> Result<()> {
        self.log.push(MediaCall::Load {
            handle: self.id,
            url: url.to_string(),
        });
        self.playing = false;
        self.ended = false;
        self.position = 0.0;

        if url.is_empty() || self.failures.borrow().loads.contains(url) {
            self.source = None;
            return Err(ForestalkError::MediaLoad {
                url: url.to_string(),
                reason: "source could not be fetched".to_string(),
            });
        }

        self.source = Some(url.to_string());
        self.duration = if duration_hint.is_finite() {
            duration_hint.max(0.0)
        } else {
            0.0
        };
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        let Some(source) = self.source.as_deref() else {
            return Err(ForestalkError::MediaPlayback {
                url: String::new(),
                reason: "no source loaded".to_string(),
            });
        };
        if self.failures.borrow().plays.contains(source) {
            return Err(ForestalkError::MediaPlayback {
                url: source.to_string(),
                reason: "playback not allowed".to_string(),
            });
        }

        self.log.push(MediaCall::Play { handle: self.id });
        if self.ended {
            self.position = 0.0;
            self.ended = false;
        }
        self.playing = true;
        Ok(())
    }

    fn pause(&mut self) {
        self.log.push(MediaCall::Pause { handle: self.id });
        self.playing = false;
    }

    fn stop(&mut self) {
        self.log.push(MediaCall::Stop { handle: self.id });
        self.playing = false;
        self.ended = false;
        self.position = 0.0;
        self.source = None;
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn advance(&mut self, delta: f64) -> Option<MediaEvent> {
        if !self.playing || !delta.is_finite() || delta <= 0.0 {
            return None;
        }
        let from = self.position;
        self.position += delta;

        if let Some(at) = self.interruption() {
            if from < at && self.position >= at && at < self.duration {
                self.position = at;
                self.playing = false;
                return Some(MediaEvent::Failed(format!("stream interrupted at {at:.2}s")));
            }
        }

        if self.position >= self.duration {
            self.position = self.duration;
            self.playing = false;
            self.ended = true;
            return Some(MediaEvent::Ended);
        }
        None
    }
}

impl Drop for SimulatedMedia {
    fn drop(&mut self) {
        self.log.push(MediaCall::Released(self.id));
    }
}
