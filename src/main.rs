//! Musicora - playlist music player for the terminal
//!
//! Loads settings, refreshes the library from the music directory, starts
//! the audio engine and the end-of-track monitor, and hands stdin to the
//! interactive shell.

use std::{fs::create_dir_all, io::stderr, path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::{Error, Result},
    clap::Parser,
    parking_lot::Mutex,
    tokio::task::spawn_blocking,
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, registry, util::SubscriberInitExt},
};

use musicora::{
    audio::engine::{AudioEngine, EngineConfig},
    cli::{Shell, spawn_event_logger, spawn_progress_printer},
    config::SettingsManager,
    error::{ErrorReporter, ResultExt},
    library::{ALL_SONGS, LibraryScanner, PlaylistCatalog, PlaylistSource},
    playback::{
        EndOfTrackMonitor, PlaybackController, PlaybackSession, SystemClock, TimelineReporter,
    },
};

/// Command-line arguments for musicora
#[derive(Parser, Debug)]
#[command(name = "musicora")]
#[command(about = "Playlist music player for the terminal")]
#[command(version)]
struct Args {
    /// Settings file to use instead of the XDG default
    #[arg(short, long, env = "MUSICORA_CONFIG")]
    config: Option<PathBuf>,

    /// Music directory, overriding the settings file
    #[arg(short, long, env = "MUSICORA_MUSIC_DIR")]
    music_dir: Option<PathBuf>,

    /// Playlist to start on
    #[arg(short, long, default_value = ALL_SONGS)]
    playlist: String,

    /// Print the playback position while a track is playing
    #[arg(long)]
    progress: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they do not mix with shell output
    registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "musicora=info".into()))
        .with(fmt::layer().with_writer(stderr))
        .init();

    let args = Args::parse();

    let settings_manager = match args.config {
        Some(path) => SettingsManager::with_config_path(path),
        None => SettingsManager::new(),
    }
    .add_context("Failed to load settings")?;
    let mut settings = settings_manager.get_settings().clone();
    if let Some(music_dir) = args.music_dir {
        settings.music_dir = music_dir;
    }
    info!(
        "Settings: {}",
        settings_manager.get_config_path().display()
    );

    create_dir_all(&settings.album_art_dir).add_context("Failed to create album art directory")?;
    let catalog = Arc::new(
        PlaylistCatalog::open(&settings.library_file).add_context("Failed to open playlist catalog")?,
    );
    info!("Playlist catalog: {}", catalog.path().display());
    let scanner = Arc::new(LibraryScanner::new(
        Arc::clone(&catalog),
        settings.music_dir.clone(),
        settings.audio_extensions.clone(),
    ));
    match scanner.rescan() {
        Ok(count) => info!("Found {count} tracks in {}", scanner.music_dir().display()),
        Err(e) => ErrorReporter::warn(&Error::from(e), "Scanning music directory"),
    }

    let playlist = if catalog.contains(&args.playlist) {
        args.playlist
    } else {
        warn!("No playlist named {:?}, using {ALL_SONGS:?}", args.playlist);
        ALL_SONGS.to_string()
    };

    let engine = AudioEngine::new(EngineConfig {
        ring_buffer_size: settings.ring_buffer_size,
        initial_volume: settings.default_volume,
        ..EngineConfig::default()
    })
    .add_context("Failed to start audio engine")?;
    info!("Audio engine initialized");

    let session = Arc::new(Mutex::new(PlaybackSession::new(
        playlist,
        settings.default_volume,
    )));
    let controller = Arc::new(PlaybackController::new(
        session,
        Arc::new(engine.clone()),
        Arc::clone(&catalog) as Arc<dyn PlaylistSource>,
        Arc::new(SystemClock::new()),
    ));

    let event_logger = spawn_event_logger(controller.subscribe(), settings.album_art_dir.clone());
    let monitor = EndOfTrackMonitor::spawn(
        Arc::clone(&controller),
        Duration::from_millis(settings.monitor_interval_ms),
    );
    let progress = args.progress.then(|| {
        spawn_progress_printer(
            TimelineReporter::new(controller.session(), controller.clock()),
            Duration::from_millis(settings.timeline_refresh_ms),
        )
    });

    let result = Shell::new(Arc::clone(&controller), catalog, scanner)
        .run()
        .await;

    if let Some(progress) = progress {
        progress.abort();
    }
    monitor.shutdown().await;
    spawn_blocking(move || engine.shutdown())
        .await
        .add_context("Audio engine shutdown failed")?;
    event_logger.abort();

    info!("Goodbye");
    result
}
