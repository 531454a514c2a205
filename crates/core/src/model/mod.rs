//! Read model shared with the persistence backend.
//!
//! Threads and rings arrive fully formed from the store; the playback core
//! only reads them. The one mutation allowed is appending a ring, which keeps
//! existing ring indices stable.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ForestalkError;

/// Mood tag attached to a thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Calm,
    Inspired,
    Reflective,
    Curious,
    Hopeful,
    Melancholic,
    Joyful,
    Grateful,
    Anxious,
    Frustrated,
    Excited,
    Peaceful,
    Passionate,
    Nostalgic,
    Confused,
    Content,
    Determined,
    Empathetic,
    Energetic,
    Gloomy,
    Serene,
    Worried,
}

/// Coarse grouping used by mood pickers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoodGroup {
    Positive,
    Neutral,
    Negative,
}

impl Mood {
    pub const ALL: [Mood; 22] = [
        Mood::Calm,
        Mood::Inspired,
        Mood::Reflective,
        Mood::Curious,
        Mood::Hopeful,
        Mood::Melancholic,
        Mood::Joyful,
        Mood::Grateful,
        Mood::Anxious,
        Mood::Frustrated,
        Mood::Excited,
        Mood::Peaceful,
        Mood::Passionate,
        Mood::Nostalgic,
        Mood::Confused,
        Mood::Content,
        Mood::Determined,
        Mood::Empathetic,
        Mood::Energetic,
        Mood::Gloomy,
        Mood::Serene,
        Mood::Worried,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Mood::Calm => "calm",
            Mood::Inspired => "inspired",
            Mood::Reflective => "reflective",
            Mood::Curious => "curious",
            Mood::Hopeful => "hopeful",
            Mood::Melancholic => "melancholic",
            Mood::Joyful => "joyful",
            Mood::Grateful => "grateful",
            Mood::Anxious => "anxious",
            Mood::Frustrated => "frustrated",
            Mood::Excited => "excited",
            Mood::Peaceful => "peaceful",
            Mood::Passionate => "passionate",
            Mood::Nostalgic => "nostalgic",
            Mood::Confused => "confused",
            Mood::Content => "content",
            Mood::Determined => "determined",
            Mood::Empathetic => "empathetic",
            Mood::Energetic => "energetic",
            Mood::Gloomy => "gloomy",
            Mood::Serene => "serene",
            Mood::Worried => "worried",
        }
    }

    pub fn group(self) -> MoodGroup {
        match self {
            Mood::Reflective
            | Mood::Curious
            | Mood::Nostalgic
            | Mood::Empathetic
            | Mood::Determined => MoodGroup::Neutral,
            Mood::Melancholic
            | Mood::Anxious
            | Mood::Frustrated
            | Mood::Confused
            | Mood::Gloomy
            | Mood::Worried => MoodGroup::Negative,
            _ => MoodGroup::Positive,
        }
    }

    /// Adjectives a tree identity may be built from for this mood.
    pub fn tree_adjectives(self) -> &'static [&'static str] {
        match self {
            Mood::Calm => &["Peaceful", "Gentle", "Tranquil", "Serene", "Quiet", "Still"],
            Mood::Inspired => &["Creative", "Visionary", "Imaginative", "Innovative", "Bright", "Enlightened"],
            Mood::Reflective => &["Thoughtful", "Pondering", "Meditative", "Contemplative", "Wise", "Philosophical"],
            Mood::Curious => &["Inquisitive", "Wondering", "Exploring", "Observant", "Questioning", "Investigative"],
            Mood::Hopeful => &["Optimistic", "Promising", "Aspiring", "Encouraging", "Expectant", "Uplifted"],
            Mood::Melancholic => &["Wistful", "Somber", "Pensive", "Mournful", "Downcast", "Longing"],
            Mood::Joyful => &["Happy", "Delighted", "Cheerful", "Merry", "Exuberant", "Gleeful"],
            Mood::Grateful => &["Thankful", "Appreciative", "Blessed", "Indebted", "Obliged", "Humbled"],
            Mood::Anxious => &["Nervous", "Restless", "Fidgety", "Shaking", "Quivering", "Trembling"],
            Mood::Frustrated => &["Irritated", "Vexed", "Thwarted", "Blocked", "Hindered", "Stuck"],
            Mood::Excited => &["Enthusiastic", "Eager", "Animated", "Lively", "Spirited", "Thrilled"],
            Mood::Peaceful => &["Harmonious", "Balanced", "Placid", "Composed", "Centered", "Relaxed"],
            Mood::Passionate => &["Ardent", "Fervent", "Intense", "Zealous", "Fiery", "Burning"],
            Mood::Nostalgic => &["Reminiscent", "Yearning", "Sentimental", "Longing", "Retrospective", "Remembering"],
            Mood::Confused => &["Perplexed", "Bewildered", "Disoriented", "Puzzled", "Baffled", "Uncertain"],
            Mood::Content => &["Satisfied", "Fulfilled", "Comfortable", "Pleased", "At Ease", "Settled"],
            Mood::Determined => &["Resolute", "Steadfast", "Tenacious", "Unwavering", "Persistent", "Committed"],
            Mood::Empathetic => &["Compassionate", "Understanding", "Sympathetic", "Sensitive", "Perceptive", "Caring"],
            Mood::Energetic => &["Vibrant", "Dynamic", "Lively", "Spirited", "Vigorous", "Bustling"],
            Mood::Gloomy => &["Dreary", "Dismal", "Morose", "Sullen", "Forlorn", "Bleak"],
            Mood::Serene => &["Calm", "Tranquil", "Peaceful", "Composed", "Untroubled", "Placid"],
            Mood::Worried => &["Concerned", "Anxious", "Troubled", "Apprehensive", "Uneasy", "Distressed"],
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mood {
    type Err = ForestalkError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let needle = value.trim().to_ascii_lowercase();
        Mood::ALL
            .into_iter()
            .find(|mood| mood.as_str() == needle)
            .ok_or_else(|| ForestalkError::msg(format!("unknown mood `{value}`")))
    }
}

/// 8-bit sRGB colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn to_hex(self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Style key of a ring. Stored by the backend as a class-like string such as
/// `bg-forest-wave-red`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RingColor {
    Red,
    Green,
    Amber,
    Blue,
    White,
    Other(String),
}

impl RingColor {
    /// Palette new rings are drawn from.
    pub const PALETTE: [RingColor; 4] = [
        RingColor::Red,
        RingColor::Green,
        RingColor::Amber,
        RingColor::Blue,
    ];

    pub fn style_key(&self) -> &str {
        match self {
            RingColor::Red => "bg-forest-wave-red",
            RingColor::Green => "bg-forest-wave-green",
            RingColor::Amber => "bg-forest-wave-amber",
            RingColor::Blue => "bg-forest-wave-blue",
            RingColor::White => "bg-white",
            RingColor::Other(key) => key,
        }
    }

    pub fn rgb(&self) -> Rgb {
        match self {
            RingColor::Red => Rgb(0xE8, 0x6F, 0x50),
            RingColor::Green => Rgb(0x7C, 0xAF, 0x76),
            RingColor::Amber => Rgb(0xE2, 0xA4, 0x47),
            RingColor::Blue => Rgb(0x6A, 0x9C, 0xB0),
            RingColor::White => Rgb(0xEA, 0xDB, 0xC8),
            RingColor::Other(_) => Rgb(0xFF, 0xFF, 0xFF),
        }
    }
}

impl From<String> for RingColor {
    fn from(value: String) -> Self {
        match value.as_str() {
            "bg-white" => RingColor::White,
            key if key.contains("red") => RingColor::Red,
            key if key.contains("green") => RingColor::Green,
            key if key.contains("amber") => RingColor::Amber,
            key if key.contains("blue") => RingColor::Blue,
            _ => RingColor::Other(value),
        }
    }
}

impl From<RingColor> for String {
    fn from(value: RingColor) -> Self {
        match value {
            RingColor::Other(key) => key,
            known => known.style_key().to_string(),
        }
    }
}

/// One voice clip contributed to a thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ring {
    pub id: String,
    pub audio_url: String,
    /// Authoritative clip length used for progress math.
    pub duration_seconds: f64,
    /// Decorative amplitudes; never derived from the audio itself.
    #[serde(default)]
    pub waveform: Vec<f32>,
    pub created_at: DateTime<Utc>,
    pub color: RingColor,
}

impl Ring {
    pub fn formatted_duration(&self) -> String {
        format_duration(self.duration_seconds)
    }
}

/// A "Forestalk": a topic thread made of voice rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    pub tree_identity: String,
    pub mood: Mood,
    /// Creation order, oldest first.
    #[serde(default)]
    pub rings: Vec<Ring>,
    pub created_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
}

impl Thread {
    pub fn ring_count(&self) -> usize {
        self.rings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    pub fn ring(&self, index: usize) -> Option<&Ring> {
        self.rings.get(index)
    }

    /// Appends a ring and marks the thread active at the ring's creation time.
    pub fn append_ring(&mut self, ring: Ring) {
        self.last_active_at = self.last_active_at.max(ring.created_at);
        self.rings.push(ring);
    }
}

/// Listing filter understood by the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadFilter {
    pub mood: Option<Mood>,
}

impl ThreadFilter {
    pub fn matches(&self, thread: &Thread) -> bool {
        self.mood.map(|mood| mood == thread.mood).unwrap_or(true)
    }
}

/// Formats seconds as `M:SS`.
pub fn format_duration(seconds: f64) -> String {
    let total = if seconds.is_finite() { seconds.max(0.0) as u64 } else { 0 };
    format!("{}:{:02}", total / 60, total % 60)
}

/// Human readable distance between `then` and `now`, e.g. `3 days ago`.
pub fn time_ago(then: DateTime<Utc>, now: DateTime<Utc>) -> String {
    const UNITS: [(i64, &str); 5] = [
        (31_536_000, "year"),
        (2_592_000, "month"),
        (86_400, "day"),
        (3_600, "hour"),
        (60, "minute"),
    ];

    let seconds = (now - then).num_seconds().max(0);
    for (size, unit) in UNITS {
        // A unit is only used once more than one whole unit has passed.
        if seconds > size {
            return plural(seconds / size, unit);
        }
    }
    plural(seconds, "second")
}

fn plural(count: i64, unit: &str) -> String {
    if count == 1 {
        format!("1 {unit} ago")
    } else {
        format!("{count} {unit}s ago")
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;

    fn ring_at(id: &str, created_at: DateTime<Utc>) -> Ring {
        Ring {
            id: id.to_string(),
            audio_url: format!("{id}.webm"),
            duration_seconds: 12.0,
            waveform: vec![10.0; 4],
            created_at,
            color: RingColor::Green,
        }
    }

    #[test]
    fn ring_colors_round_trip_style_keys() {
        let json = serde_json::to_string(&RingColor::Amber).unwrap();
        assert_eq!(json, "\"bg-forest-wave-amber\"");

        let parsed: RingColor = serde_json::from_str("\"bg-forest-wave-blue\"").unwrap();
        assert_eq!(parsed, RingColor::Blue);

        let custom: RingColor = serde_json::from_str("\"bg-moss\"").unwrap();
        assert_eq!(custom, RingColor::Other("bg-moss".into()));
        assert_eq!(custom.rgb().to_hex(), "#FFFFFF");
        assert_eq!(RingColor::Red.rgb().to_hex(), "#E86F50");
    }

    #[test]
    fn parses_moods_case_insensitively() {
        assert_eq!("Calm".parse::<Mood>().unwrap(), Mood::Calm);
        assert!("sleepy".parse::<Mood>().is_err());
        assert_eq!(Mood::Gloomy.group(), MoodGroup::Negative);
        assert_eq!(Mood::Curious.group(), MoodGroup::Neutral);
        assert_eq!(Mood::Joyful.group(), MoodGroup::Positive);
    }

    #[test]
    fn appending_rings_bumps_last_active() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap();
        let mut thread = Thread {
            id: "t".into(),
            title: "Morning walk".into(),
            tree_identity: "Gentle Maple".into(),
            mood: Mood::Calm,
            rings: vec![ring_at("r0", start)],
            created_at: start,
            last_active_at: start,
        };

        let later = start + Duration::hours(5);
        thread.append_ring(ring_at("r1", later));

        assert_eq!(thread.ring_count(), 2);
        assert_eq!(thread.last_active_at, later);
        assert_eq!(thread.ring(1).map(|ring| ring.id.as_str()), Some("r1"));
    }

    #[test]
    fn formats_durations() {
        assert_eq!(format_duration(45.0), "0:45");
        assert_eq!(format_duration(125.9), "2:05");
        assert_eq!(format_duration(-3.0), "0:00");
    }

    #[test]
    fn describes_elapsed_time() {
        let now = Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap();
        assert_eq!(time_ago(now - Duration::seconds(30), now), "30 seconds ago");
        assert_eq!(time_ago(now - Duration::minutes(90), now), "1 hour ago");
        assert_eq!(time_ago(now - Duration::days(3), now), "3 days ago");
        assert_eq!(time_ago(now + Duration::days(1), now), "0 seconds ago");
    }
}
