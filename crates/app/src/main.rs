use std::{path::PathBuf, time::Duration};

use chrono::Utc;
use clap::{Parser, Subcommand};
use forestalk_core::{
    compose_rings, model::time_ago, AppConfig, ForestalkError, MemoryThreadStore, Mood, NewThread,
    PlaybackState, RecordedClip, Sequencer, SequencerEvent, SimulatedBackend, ThreadFilter,
    ThreadStore,
};
use tracing_subscriber::EnvFilter;

fn main() -> forestalk_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::List { store, mood } => run_list(&store, mood.as_deref()),
        Commands::Play {
            store,
            thread_id,
            ring,
            realtime,
        } => run_play(&config, &store, &thread_id, ring, realtime),
        Commands::Render {
            store,
            thread_id,
            ring,
            progress,
            playing,
        } => run_render(&config, &store, &thread_id, ring, progress, playing),
        Commands::NewThread {
            store,
            title,
            mood,
            tree,
            audio_url,
            duration,
        } => run_new_thread(&store, title, &mood, tree, audio_url, duration),
        Commands::AddRing {
            store,
            thread_id,
            audio_url,
            duration,
        } => run_add_ring(&store, &thread_id, audio_url, duration),
    }
}

fn open_store(path: &PathBuf) -> forestalk_core::Result<MemoryThreadStore> {
    if path.exists() {
        MemoryThreadStore::load(path)
    } else {
        tracing::info!(?path, "store file missing, starting empty");
        Ok(MemoryThreadStore::new())
    }
}

fn run_list(store: &PathBuf, mood: Option<&str>) -> forestalk_core::Result<()> {
    let filter = ThreadFilter {
        mood: mood.map(str::parse::<Mood>).transpose()?,
    };
    let store = MemoryThreadStore::load(store)?;
    let now = Utc::now();

    for thread in store.list_threads(&filter)? {
        println!(
            "{}  {}  [{}] {}  {} rings  active {}",
            thread.id,
            thread.title,
            thread.mood,
            thread.tree_identity,
            thread.ring_count(),
            time_ago(thread.last_active_at, now),
        );
    }
    Ok(())
}

fn run_play(
    config: &AppConfig,
    store: &PathBuf,
    thread_id: &str,
    ring: Option<usize>,
    realtime: bool,
) -> forestalk_core::Result<()> {
    let store = MemoryThreadStore::load(store)?;
    let thread = store.get_thread(thread_id)?;
    tracing::info!(thread = %thread.id, title = %thread.title, rings = thread.ring_count(), "starting playback");

    let mut sequencer = Sequencer::new(SimulatedBackend::new(), config.playback.clone());
    sequencer.subscribe(|event| match event {
        SequencerEvent::StateChanged(state) => tracing::debug!(?state, "state"),
        SequencerEvent::RingFailed { index, error, .. } => {
            println!("ring {index} failed: {error}");
        }
        SequencerEvent::SequenceFinished => println!("sequence finished"),
    });
    sequencer.bind(thread)?;

    match ring {
        Some(index) => sequencer.try_play_ring(index)?,
        None => sequencer.play_sequence_from_start(),
    }

    let step = config.playback.poll_interval_seconds();
    let mut last_ring = None;
    while sequencer.state().is_playing || sequencer.has_pending_timers() {
        sequencer.tick(step);
        if realtime {
            std::thread::sleep(Duration::from_secs_f64(step));
        }

        let state = sequencer.state();
        if state.is_playing && state.current_ring_index != last_ring {
            last_ring = state.current_ring_index;
            if let Some(index) = last_ring {
                println!("{:>8.2}s  ring {index}", sequencer.now());
            }
        }
    }

    for visual in sequencer.ring_visuals(&config.render) {
        if visual.failed {
            println!("ring {} ({}) could not be played", visual.ring_index, visual.ring_id);
        }
    }
    Ok(())
}

fn run_render(
    config: &AppConfig,
    store: &PathBuf,
    thread_id: &str,
    ring: Option<usize>,
    progress: f64,
    playing: bool,
) -> forestalk_core::Result<()> {
    let store = MemoryThreadStore::load(store)?;
    let thread = store.get_thread(thread_id)?;
    if let Some(index) = ring {
        if index >= thread.ring_count() {
            return Err(ForestalkError::InvalidIndex {
                index,
                len: thread.ring_count(),
            });
        }
    }

    let state = PlaybackState {
        is_playing: playing && ring.is_some(),
        current_ring_index: ring,
        progress,
    };
    let visuals = compose_rings(&thread, &state, config.playback.order, &config.render);
    println!("{}", serde_json::to_string_pretty(&visuals)?);
    Ok(())
}

fn run_new_thread(
    path: &PathBuf,
    title: String,
    mood: &str,
    tree: Option<String>,
    audio_url: String,
    duration: f64,
) -> forestalk_core::Result<()> {
    let mut store = open_store(path)?;
    let meta = NewThread {
        title,
        mood: mood.parse()?,
        tree_identity: tree,
    };
    let thread = store.create_thread(meta, RecordedClip::new(audio_url, duration)?)?;
    store.save(path)?;
    println!("{}  {}", thread.id, thread.tree_identity);
    Ok(())
}

fn run_add_ring(
    path: &PathBuf,
    thread_id: &str,
    audio_url: String,
    duration: f64,
) -> forestalk_core::Result<()> {
    let mut store = MemoryThreadStore::load(path)?;
    let ring = store.add_ring(thread_id, RecordedClip::new(audio_url, duration)?)?;
    store.save(path)?;
    println!("{}  {}", ring.id, ring.formatted_duration());
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Voice threads told in rings", long_about = None)]
struct Cli {
    /// JSON configuration file; defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List threads, most recently active first.
    List {
        #[arg(long)]
        store: PathBuf,
        /// Only show threads with this mood.
        #[arg(long)]
        mood: Option<String>,
    },
    /// Play a thread's rings back to back on the simulated media backend.
    Play {
        #[arg(long)]
        store: PathBuf,
        thread_id: String,
        /// Start the sequence at this ring instead of the first one.
        #[arg(long)]
        ring: Option<usize>,
        /// Pace the event loop with wall-clock time.
        #[arg(long)]
        realtime: bool,
    },
    /// Print the ring visuals of a thread as JSON.
    Render {
        #[arg(long)]
        store: PathBuf,
        thread_id: String,
        /// Ring under the playback cursor.
        #[arg(long)]
        ring: Option<usize>,
        #[arg(long, default_value_t = 0.0)]
        progress: f64,
        #[arg(long)]
        playing: bool,
    },
    /// Start a new thread from a first recording.
    NewThread {
        #[arg(long)]
        store: PathBuf,
        #[arg(long)]
        title: String,
        #[arg(long)]
        mood: String,
        /// Tree identity; picked from the mood when omitted.
        #[arg(long)]
        tree: Option<String>,
        #[arg(long)]
        audio_url: String,
        #[arg(long)]
        duration: f64,
    },
    /// Append a recording to an existing thread.
    AddRing {
        #[arg(long)]
        store: PathBuf,
        thread_id: String,
        #[arg(long)]
        audio_url: String,
        #[arg(long)]
        duration: f64,
    },
}
