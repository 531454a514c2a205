use serde::{Deserialize, Serialize};

use crate::{ForestalkError, Result};

/// A finished voice recording handed over by the recorder, already uploaded
/// to wherever `audio_url` points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedClip {
    pub audio_url: String,
    pub duration_seconds: f64,
}

impl RecordedClip {
    /// Checks the clip before it is turned into a ring. The recorder counts
    /// whole seconds, so durations are rounded.
    pub fn new(audio_url: impl Into<String>, duration_seconds: f64) -> Result<Self> {
        let audio_url = audio_url.into();
        if audio_url.trim().is_empty() {
            return Err(ForestalkError::msg("recording has no audio url"));
        }
        if !duration_seconds.is_finite() || duration_seconds <= 0.0 {
            return Err(ForestalkError::msg(format!(
                "recording duration must be positive, got {duration_seconds}"
            )));
        }

        Ok(Self {
            audio_url,
            duration_seconds: duration_seconds.round().max(1.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_and_rounds_valid_clips() {
        let clip = RecordedClip::new("clips/a.webm", 12.4).unwrap();
        assert_eq!(clip.duration_seconds, 12.0);

        let short = RecordedClip::new("clips/b.webm", 0.3).unwrap();
        assert_eq!(short.duration_seconds, 1.0);
    }

    #[test]
    fn rejects_unusable_clips() {
        assert!(RecordedClip::new("  ", 5.0).is_err());
        assert!(RecordedClip::new("a.webm", 0.0).is_err());
        assert!(RecordedClip::new("a.webm", f64::NAN).is_err());
    }
}
