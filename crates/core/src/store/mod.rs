//! Thread persistence.
//!
//! [`ThreadStore`] is the interface the rest of the app talks to. The
//! in-process [`MemoryThreadStore`] backs the command line host and tests and
//! round-trips through a JSON document.

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Utc};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    model::{Mood, Ring, RingColor, Thread, ThreadFilter},
    record::RecordedClip,
    waveform::synthetic_waveform,
    ForestalkError, Result,
};

/// Species a tree identity is drawn from.
pub const TREE_SPECIES: [&str; 30] = [
    "Oak", "Pine", "Maple", "Birch", "Cedar", "Willow", "Ash", "Redwood", "Cypress", "Aspen",
    "Elm", "Sequoia", "Spruce", "Sycamore", "Cherry", "Fir", "Magnolia", "Juniper", "Poplar",
    "Chestnut", "Beech", "Walnut", "Apple", "Linden", "Ginkgo", "Acacia", "Eucalyptus",
    "Mahogany", "Hemlock", "Tamarack",
];

/// Metadata for a thread about to be created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewThread {
    pub title: String,
    pub mood: Mood,
    /// Picked from the mood when absent.
    #[serde(default)]
    pub tree_identity: Option<String>,
}

pub trait ThreadStore {
    /// Threads matching `filter`, most recently active first.
    fn list_threads(&self, filter: &ThreadFilter) -> Result<Vec<Thread>>;
    fn get_thread(&self, id: &str) -> Result<Thread>;
    /// Creates a thread whose first ring is `clip`.
    fn create_thread(&mut self, meta: NewThread, clip: RecordedClip) -> Result<Thread>;
    /// Appends `clip` as the newest ring of an existing thread.
    fn add_ring(&mut self, thread_id: &str, clip: RecordedClip) -> Result<Ring>;
}

/// Picks a tree name such as `Tranquil Cedar` for a thread of the given mood.
pub fn tree_identity<R: Rng + ?Sized>(mood: Mood, rng: &mut R) -> String {
    let adjective = mood.tree_adjectives().choose(rng).copied().unwrap_or("Quiet");
    let species = TREE_SPECIES.choose(rng).copied().unwrap_or("Oak");
    format!("{adjective} {species}")
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreDocument {
    threads: Vec<Thread>,
}

/// Thread store held entirely in memory.
#[derive(Debug)]
pub struct MemoryThreadStore {
    threads: HashMap<String, Thread>,
    rng: StdRng,
}

impl Default for MemoryThreadStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryThreadStore {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Store whose generated names, colours and waveforms are reproducible.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            threads: HashMap::new(),
            rng,
        }
    }

    pub fn from_threads(threads: impl IntoIterator<Item = Thread>) -> Self {
        let mut store = Self::new();
        store.threads = threads
            .into_iter()
            .map(|thread| (thread.id.clone(), thread))
            .collect();
        store
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let document: StoreDocument = serde_json::from_str(&raw)?;
        tracing::debug!(?path, threads = document.threads.len(), "loaded thread store");
        Ok(Self::from_threads(document.threads))
    }

    /// Writes every thread to `path`, oldest thread first.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let mut threads: Vec<Thread> = self.threads.values().cloned().collect();
        threads.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));

        let json = serde_json::to_string_pretty(&StoreDocument { threads })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.threads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.threads.is_empty()
    }

    /// [`ThreadStore::create_thread`] with an explicit creation time.
    pub fn create_thread_at(
        &mut self,
        meta: NewThread,
        clip: RecordedClip,
        now: DateTime<Utc>,
    ) -> Result<Thread> {
        if meta.title.trim().is_empty() {
            return Err(ForestalkError::msg("thread title must not be empty"));
        }

        let tree_identity = match meta.tree_identity {
            Some(name) if !name.trim().is_empty() => name,
            _ => tree_identity(meta.mood, &mut self.rng),
        };
        let ring = self.new_ring(clip, now);
        let thread = Thread {
            id: Uuid::new_v4().to_string(),
            title: meta.title,
            tree_identity,
            mood: meta.mood,
            rings: vec![ring],
            created_at: now,
            last_active_at: now,
        };

        tracing::info!(thread = %thread.id, tree = %thread.tree_identity, "created thread");
        self.threads.insert(thread.id.clone(), thread.clone());
        Ok(thread)
    }

    /// [`ThreadStore::add_ring`] with an explicit creation time.
    pub fn add_ring_at(
        &mut self,
        thread_id: &str,
        clip: RecordedClip,
        now: DateTime<Utc>,
    ) -> Result<Ring> {
        if !self.threads.contains_key(thread_id) {
            return Err(ForestalkError::ThreadNotFound(thread_id.to_string()));
        }

        let ring = self.new_ring(clip, now);
        if let Some(thread) = self.threads.get_mut(thread_id) {
            thread.append_ring(ring.clone());
            tracing::info!(thread = thread_id, ring = %ring.id, rings = thread.ring_count(), "added ring");
        }
        Ok(ring)
    }

    fn new_ring(&mut self, clip: RecordedClip, now: DateTime<Utc>) -> Ring {
        let color = RingColor::PALETTE
            .choose(&mut self.rng)
            .cloned()
            .unwrap_or(RingColor::Green);

        Ring {
            id: Uuid::new_v4().to_string(),
            audio_url: clip.audio_url,
            duration_seconds: clip.duration_seconds,
            waveform: synthetic_waveform(&mut self.rng),
            created_at: now,
            color,
        }
    }
}

impl ThreadStore for MemoryThreadStore {
    fn list_threads(&self, filter: &ThreadFilter) -> Result<Vec<Thread>> {
        let mut threads: Vec<Thread> = self
            .threads
            .values()
            .filter(|thread| filter.matches(thread))
            .cloned()
            .collect();
        threads.sort_by(|a, b| {
            b.last_active_at
                .cmp(&a.last_active_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(threads)
    }

    fn get_thread(&self, id: &str) -> Result<Thread> {
        self.threads
            .get(id)
            .cloned()
            .ok_or_else(|| ForestalkError::ThreadNotFound(id.to_string()))
    }

    fn create_thread(&mut self, meta: NewThread, clip: RecordedClip) -> Result<Thread> {
        self.create_thread_at(meta, clip, Utc::now())
    }

    fn add_ring(&mut self, thread_id: &str, clip: RecordedClip) -> Result<Ring> {
        self.add_ring_at(thread_id, clip, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::waveform::{MAX_AMPLITUDE, MIN_AMPLITUDE, WAVEFORM_LEN};

    static TEMP_COUNTER: AtomicU32 = AtomicU32::new(0);

    fn temp_path() -> std::path::PathBuf {
        let id = TEMP_COUNTER.fetch_add(1, Ordering::SeqCst);
        std::env::temp_dir().join(format!("forestalk-store-{}-{id}.json", std::process::id()))
    }

    fn clip(url: &str, seconds: f64) -> RecordedClip {
        RecordedClip::new(url, seconds).unwrap()
    }

    fn meta(title: &str, mood: Mood) -> NewThread {
        NewThread {
            title: title.to_string(),
            mood,
            tree_identity: None,
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 4, 2, 7, 30, 0).unwrap()
    }

    #[test]
    fn creating_a_thread_builds_its_first_ring() {
        let mut store = MemoryThreadStore::seeded(1);
        let thread = store
            .create_thread_at(meta("Dawn chorus", Mood::Serene), clip("a.webm", 14.0), start())
            .unwrap();

        assert_eq!(thread.ring_count(), 1);
        let (adjective, species) = thread.tree_identity.rsplit_once(' ').unwrap();
        assert!(Mood::Serene.tree_adjectives().contains(&adjective));
        assert!(TREE_SPECIES.contains(&species));

        let ring = &thread.rings[0];
        assert_eq!(ring.waveform.len(), WAVEFORM_LEN);
        assert!(ring
            .waveform
            .iter()
            .all(|v| (MIN_AMPLITUDE..=MAX_AMPLITUDE).contains(v)));
        assert!(RingColor::PALETTE.contains(&ring.color));
        assert_eq!(store.get_thread(&thread.id).unwrap(), thread);
    }

    #[test]
    fn explicit_tree_names_are_kept() {
        let mut store = MemoryThreadStore::seeded(2);
        let mut request = meta("Notes", Mood::Curious);
        request.tree_identity = Some("Whispering Alder".into());

        let thread = store
            .create_thread_at(request, clip("a.webm", 3.0), start())
            .unwrap();
        assert_eq!(thread.tree_identity, "Whispering Alder");

        assert!(store
            .create_thread_at(meta(" ", Mood::Calm), clip("b.webm", 3.0), start())
            .is_err());
    }

    #[test]
    fn rings_append_in_creation_order() {
        let mut store = MemoryThreadStore::seeded(3);
        let thread = store
            .create_thread_at(meta("Walk", Mood::Calm), clip("a.webm", 10.0), start())
            .unwrap();

        let later = start() + Duration::minutes(20);
        let ring = store.add_ring_at(&thread.id, clip("b.webm", 5.0), later).unwrap();

        let stored = store.get_thread(&thread.id).unwrap();
        assert_eq!(stored.ring_count(), 2);
        assert_eq!(stored.rings[1].id, ring.id);
        assert_eq!(stored.last_active_at, later);
    }

    #[test]
    fn unknown_threads_are_reported() {
        let mut store = MemoryThreadStore::seeded(4);
        let err = store.add_ring("nope", clip("a.webm", 2.0)).unwrap_err();
        assert!(matches!(err, ForestalkError::ThreadNotFound(id) if id == "nope"));
        assert!(store.get_thread("nope").is_err());
    }

    #[test]
    fn listing_filters_and_sorts_by_activity() {
        let mut store = MemoryThreadStore::seeded(5);
        let calm = store
            .create_thread_at(meta("Calm one", Mood::Calm), clip("a.webm", 4.0), start())
            .unwrap();
        let gloomy = store
            .create_thread_at(
                meta("Grey day", Mood::Gloomy),
                clip("b.webm", 4.0),
                start() + Duration::hours(1),
            )
            .unwrap();

        let all = store.list_threads(&ThreadFilter::default()).unwrap();
        let ids: Vec<&str> = all.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec![gloomy.id.as_str(), calm.id.as_str()]);

        store
            .add_ring_at(&calm.id, clip("c.webm", 4.0), start() + Duration::hours(2))
            .unwrap();
        let all = store.list_threads(&ThreadFilter::default()).unwrap();
        assert_eq!(all[0].id, calm.id);

        let filtered = store
            .list_threads(&ThreadFilter {
                mood: Some(Mood::Gloomy),
            })
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].id, gloomy.id);
    }

    #[test]
    fn saves_and_loads_json_documents() {
        let mut store = MemoryThreadStore::seeded(6);
        let thread = store
            .create_thread_at(meta("Kept", Mood::Hopeful), clip("a.webm", 9.0), start())
            .unwrap();
        store
            .add_ring_at(&thread.id, clip("b.webm", 6.0), start() + Duration::days(1))
            .unwrap();

        let path = temp_path();
        store.save(&path).unwrap();
        let loaded = MemoryThreadStore::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(loaded.len(), 1);
        assert_eq!(
            loaded.get_thread(&thread.id).unwrap(),
            store.get_thread(&thread.id).unwrap()
        );
    }
}
