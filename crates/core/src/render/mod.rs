use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{
    config::RenderConfig,
    model::{Rgb, RingColor},
};

/// One amplitude bar of a radial waveform, positioned in container percent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarDescriptor {
    pub index: usize,
    /// Clockwise from the positive x axis.
    pub angle_degrees: f64,
    pub x_percent: f64,
    pub y_percent: f64,
    /// Distance of the bar from the centre, in container percent.
    pub radius_offset: f64,
    pub height: f64,
    pub opacity: f64,
    /// Already passed by the playback sweep.
    pub active: bool,
    /// Animated with [`pulse_scale`] while painting.
    pub pulsing: bool,
    pub color: Rgb,
}

impl BarDescriptor {
    /// Vertical scale to paint this bar with at `elapsed` wall-clock time.
    pub fn scale_at(&self, elapsed: Duration) -> f64 {
        if self.pulsing {
            pulse_scale(elapsed, self.index)
        } else {
            1.0
        }
    }
}

/// Decorative oscillation of an active bar while its ring plays. Purely a
/// function of time and bar index; it never feeds back into layout.
pub fn pulse_scale(elapsed: Duration, index: usize) -> f64 {
    let phase = elapsed.as_secs_f64() * 1000.0 / 200.0 + index as f64 * 0.1;
    1.5 + phase.sin() * 0.3
}

/// Maps waveform samples and playback progress onto a circle of bars.
#[derive(Debug, Clone, Default)]
pub struct RadialRenderer {
    config: RenderConfig,
}

impl RadialRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Lays out one bar per angular step. Bar `i` is active once
    /// `progress * bar_count > i`, which sweeps clockwise as playback runs.
    pub fn render_bars(
        &self,
        samples: &[f32],
        color: &RingColor,
        is_playing: bool,
        progress: f64,
    ) -> Vec<BarDescriptor> {
        let count = self.config.bar_count;
        let radius = self.config.radius_percent;
        let rgb = color.rgb();
        let sweep = if progress.is_finite() {
            progress.clamp(0.0, 1.0) * count as f64
        } else {
            0.0
        };

        (0..count)
            .map(|index| {
                let angle_degrees = index as f64 * 360.0 / count as f64;
                let radians = angle_degrees.to_radians();
                let active = sweep > index as f64;

                BarDescriptor {
                    index,
                    angle_degrees,
                    x_percent: 50.0 + radius * radians.cos(),
                    y_percent: 50.0 + radius * radians.sin(),
                    radius_offset: radius,
                    height: self.config.base_height
                        + self.amplitude(samples, index, count) * self.config.height_scale,
                    opacity: if active { 1.0 } else { self.config.inactive_opacity },
                    active,
                    pulsing: is_playing && active,
                    color: rgb,
                }
            })
            .collect()
    }

    fn amplitude(&self, samples: &[f32], index: usize, count: usize) -> f64 {
        if samples.is_empty() {
            return self.config.fallback_amplitude;
        }
        let value = samples[index * samples.len() / count] as f64;
        if value.is_finite() {
            value
        } else {
            self.config.fallback_amplitude
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn samples() -> Vec<f32> {
        (0..100).map(|i| 5.0 + (i % 26) as f32).collect()
    }

    #[test]
    fn layout_is_deterministic() {
        let renderer = RadialRenderer::default();
        let first = renderer.render_bars(&samples(), &RingColor::Amber, false, 0.4);
        let second = renderer.render_bars(&samples(), &RingColor::Amber, false, 0.4);

        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn sweep_boundary_at_half_progress() {
        let renderer = RadialRenderer::default();
        let bars = renderer.render_bars(&samples(), &RingColor::Red, true, 0.5);

        assert_eq!(bars.len(), 180);
        assert!(bars[..90].iter().all(|bar| bar.active && bar.pulsing));
        assert!(bars[90..].iter().all(|bar| !bar.active && !bar.pulsing));
        assert!(bars[89].active);
        assert!(!bars[90].active);
        assert_eq!(bars[0].opacity, 1.0);
        assert_eq!(bars[179].opacity, 0.7);
    }

    #[test]
    fn bars_sit_on_the_circle() {
        let renderer = RadialRenderer::default();
        let bars = renderer.render_bars(&samples(), &RingColor::Blue, false, 0.0);

        assert_eq!(bars[1].angle_degrees, 2.0);
        assert!((bars[0].x_percent - 98.0).abs() < 1e-9);
        assert!((bars[0].y_percent - 50.0).abs() < 1e-9);
        // A quarter turn clockwise points down the screen.
        assert!((bars[45].y_percent - 98.0).abs() < 1e-9);
        assert!(bars.iter().all(|bar| !bar.active));
    }

    #[test]
    fn heights_follow_samples() {
        let renderer = RadialRenderer::default();
        let flat = vec![10.0_f32; 50];
        let bars = renderer.render_bars(&flat, &RingColor::Green, false, 0.0);
        assert!(bars.iter().all(|bar| (bar.height - 3.0).abs() < 1e-9));

        let rising: Vec<f32> = (0..180).map(|i| i as f32).collect();
        let bars = renderer.render_bars(&rising, &RingColor::Green, false, 0.0);
        assert!(bars.windows(2).all(|pair| pair[0].height <= pair[1].height));

        let empty = renderer.render_bars(&[], &RingColor::Green, false, 0.0);
        assert!(empty.iter().all(|bar| (bar.height - 4.0).abs() < 1e-9));
    }

    #[test]
    fn out_of_range_progress_is_clamped() {
        let renderer = RadialRenderer::default();
        let full = renderer.render_bars(&samples(), &RingColor::White, false, 3.0);
        let none = renderer.render_bars(&samples(), &RingColor::White, false, f64::NAN);

        assert!(full.iter().all(|bar| bar.active));
        assert!(none.iter().all(|bar| !bar.active));
    }

    #[test]
    fn pulse_only_moves_pulsing_bars() {
        let renderer = RadialRenderer::default();
        let bars = renderer.render_bars(&samples(), &RingColor::Red, true, 0.25);
        let elapsed = Duration::from_millis(1234);

        assert_eq!(bars[100].scale_at(elapsed), 1.0);
        let scale = bars[3].scale_at(elapsed);
        assert!((1.2..=1.8).contains(&scale));
        assert_eq!(scale, pulse_scale(elapsed, 3));
    }
}
