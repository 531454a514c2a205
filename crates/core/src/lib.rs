//! Core library for Forestalk voice threads.
//!
//! A thread is an ordered set of voice clips ("rings"). This crate plays a
//! thread's rings back to back through an owned media handle and lays them
//! out as concentric radial waveforms. Each module owns one subsystem
//! (media, sequencing, rendering, persistence, etc.); hosts drive everything
//! from a single event loop.

pub mod audio;
pub mod config;
pub mod error;
pub mod model;
pub mod order;
pub mod record;
pub mod render;
pub mod scene;
pub mod sequencer;
pub mod store;
pub mod timeline;
pub mod waveform;

pub use audio::{MediaBackend, MediaEvent, MediaHandle, SimulatedBackend, SimulatedMedia};
pub use config::{AppConfig, PlaybackConfig, RenderConfig};
pub use error::{ForestalkError, Result};
pub use model::{Mood, Ring, RingColor, Thread, ThreadFilter};
pub use order::RingOrder;
pub use record::RecordedClip;
pub use render::{pulse_scale, BarDescriptor, RadialRenderer};
pub use scene::{compose_rings, hit_test, RingVisual};
pub use sequencer::{PlaybackPhase, PlaybackState, Sequencer, SequencerEvent};
pub use store::{MemoryThreadStore, NewThread, ThreadStore};
pub use timeline::{PlaybackClock, TimerQueue};
