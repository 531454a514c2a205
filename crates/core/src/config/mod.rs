use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ForestalkError, Result, RingOrder};

/// Polling faster than this is required for the progress sweep to look
/// continuous.
const MAX_POLL_INTERVAL_MS: u64 = 100;

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub playback: PlaybackConfig,
    pub render: RenderConfig,
}

impl AppConfig {
    /// Reads a JSON configuration file. Missing fields fall back to their
    /// defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.playback.validate()?;
        self.render.validate()
    }
}

/// Timing and ordering of the ring sequencer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Silence inserted between two rings so the boundary is audible.
    pub advance_delay_ms: u64,
    pub poll_interval_ms: u64,
    pub order: RingOrder,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            advance_delay_ms: 500,
            poll_interval_ms: 100,
            order: RingOrder::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn advance_delay_seconds(&self) -> f64 {
        self.advance_delay_ms as f64 / 1000.0
    }

    pub fn poll_interval_seconds(&self) -> f64 {
        self.poll_interval_ms as f64 / 1000.0
    }

    fn validate(&self) -> Result<()> {
        if self.poll_interval_ms == 0 || self.poll_interval_ms > MAX_POLL_INTERVAL_MS {
            return Err(ForestalkError::InvalidConfig(format!(
                "poll_interval_ms must be within 1..={MAX_POLL_INTERVAL_MS}, got {}",
                self.poll_interval_ms
            )));
        }
        Ok(())
    }
}

/// Visual tuning of the radial waveform. None of these values change which
/// bars are active, only how they look.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Number of bars around the full circle.
    pub bar_count: usize,
    /// Circle radius as a percentage of the container.
    pub radius_percent: f64,
    pub base_height: f64,
    pub height_scale: f64,
    pub inactive_opacity: f64,
    /// Amplitude used when a ring carries no waveform samples.
    pub fallback_amplitude: f64,
    /// How much of the container the concentric rings shrink across, in
    /// percent of the outermost diameter.
    pub diameter_span_percent: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            bar_count: 180,
            radius_percent: 48.0,
            base_height: 1.0,
            height_scale: 0.2,
            inactive_opacity: 0.7,
            fallback_amplitude: 15.0,
            diameter_span_percent: 70.0,
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<()> {
        if self.bar_count == 0 {
            return Err(ForestalkError::InvalidConfig(
                "bar_count must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.inactive_opacity) {
            return Err(ForestalkError::InvalidConfig(format!(
                "inactive_opacity must be within 0..=1, got {}",
                self.inactive_opacity
            )));
        }
        if !(0.0..100.0).contains(&self.diameter_span_percent) {
            return Err(ForestalkError::InvalidConfig(format!(
                "diameter_span_percent must be within 0..100, got {}",
                self.diameter_span_percent
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    static TEMP_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path() -> std::path::PathBuf {
        let id = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("forestalk-config-{}-{id}.json", std::process::id()))
    }

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.render.bar_count, 180);
        assert_eq!(config.playback.order, RingOrder::OldestFirst);
        assert!((config.playback.advance_delay_seconds() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: AppConfig =
            serde_json::from_str(r#"{ "playback": { "advance_delay_ms": 300 } }"#).unwrap();

        assert_eq!(config.playback.advance_delay_ms, 300);
        assert_eq!(config.playback.poll_interval_ms, 100);
        assert_eq!(config.render, RenderConfig::default());
    }

    #[test]
    fn rejects_slow_polling() {
        let mut config = AppConfig::default();
        config.playback.poll_interval_ms = 250;

        let err = config.validate().unwrap_err();
        assert!(format!("{err}").contains("poll_interval_ms"));
    }

    #[test]
    fn rejects_empty_circle() {
        let mut config = AppConfig::default();
        config.render.bar_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn loads_from_disk() {
        let path = temp_path();
        std::fs::write(&path, r#"{ "playback": { "order": "newest_first" } }"#).unwrap();

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.playback.order, RingOrder::NewestFirst);
    }
}
