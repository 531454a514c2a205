//! Concentric composition of a thread's rings.

use serde::{Deserialize, Serialize};

use crate::{
    config::RenderConfig,
    model::{Rgb, Thread},
    render::{BarDescriptor, RadialRenderer},
    sequencer::PlaybackState,
    RingOrder,
};

/// One ring of the thread view, ready to paint back to front.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingVisual {
    pub ring_index: usize,
    pub ring_id: String,
    /// Nesting depth, 0 being the outermost circle.
    pub position: usize,
    pub diameter_percent: f64,
    pub color: Rgb,
    pub opacity: f64,
    /// The ring the playback cursor points at, playing or paused.
    pub selected: bool,
    pub playing: bool,
    /// The last attempt to play this ring failed.
    #[serde(default)]
    pub failed: bool,
    pub bars: Vec<BarDescriptor>,
}

/// Lays out every ring of `thread` as nested circles, outermost first.
///
/// Only the selected ring carries the live sweep; the others are drawn idle.
pub fn compose_rings(
    thread: &Thread,
    state: &PlaybackState,
    order: RingOrder,
    config: &RenderConfig,
) -> Vec<RingVisual> {
    let renderer = RadialRenderer::new(config.clone());
    let count = thread.ring_count();
    let step = if count == 0 {
        0.0
    } else {
        config.diameter_span_percent / count as f64
    };

    let mut visuals: Vec<RingVisual> = thread
        .rings
        .iter()
        .enumerate()
        .map(|(index, ring)| {
            let position = order.concentric_position(index, count);
            let selected = state.current_ring_index == Some(index);
            let playing = selected && state.is_playing;
            let progress = if selected { state.progress } else { 0.0 };

            RingVisual {
                ring_index: index,
                ring_id: ring.id.clone(),
                position,
                diameter_percent: 100.0 - position as f64 * step,
                color: ring.color.rgb(),
                opacity: if selected { 1.0 } else { config.inactive_opacity },
                selected,
                playing,
                failed: false,
                bars: renderer.render_bars(&ring.waveform, &ring.color, playing, progress),
            }
        })
        .collect();

    visuals.sort_by_key(|visual| visual.position);
    visuals
}

/// Flags the rings whose playback failed so the view can point them out.
pub fn mark_failed(visuals: &mut [RingVisual], failed: &[usize]) {
    for visual in visuals.iter_mut() {
        visual.failed = failed.contains(&visual.ring_index);
    }
}

/// Ring index under a click at `(x, y)` in container percent.
///
/// Discs are nested, so the innermost disc containing the point wins.
pub fn hit_test(visuals: &[RingVisual], x_percent: f64, y_percent: f64) -> Option<usize> {
    let distance = (x_percent - 50.0).hypot(y_percent - 50.0);
    visuals
        .iter()
        .filter(|visual| distance <= visual.diameter_percent / 2.0)
        .min_by(|a, b| a.diameter_percent.total_cmp(&b.diameter_percent))
        .map(|visual| visual.ring_index)
}
