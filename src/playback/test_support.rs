//! Test doubles for the playback core.

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering::SeqCst},
    },
};

use parking_lot::{Mutex, RwLock};

use crate::{
    audio::backend::{AudioBackend, BackendError},
    error::LibraryError,
    library::{models::Track, source::PlaylistSource},
    playback::{clock::Clock, controller::PlaybackController, session::PlaybackSession},
};

/// Playlist used by [`fixture`].
pub const PLAYLIST: &str = "All Songs";

/// Clock advanced by hand.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Mutex<f64>,
}

impl ManualClock {
    pub fn new(now: f64) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, seconds: f64) {
        *self.now.lock() += seconds;
    }
}

impl Clock for ManualClock {
    fn now_seconds(&self) -> f64 {
        *self.now.lock()
    }
}

/// A call received by [`MockBackend`].
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    Load(PathBuf),
    Play,
    PlayFrom(f64),
    Pause,
    Resume,
    Stop,
    SetVolume(f32),
}

/// Backend that records calls and plays nothing.
///
/// Playing makes it busy until [`MockBackend::finish_track`] is called.
#[derive(Debug)]
pub struct MockBackend {
    calls: Mutex<Vec<BackendCall>>,
    busy: AtomicBool,
    failing: AtomicBool,
    busy_query_fails: AtomicBool,
    start_fails: AtomicBool,
    broken_paths: Mutex<HashSet<PathBuf>>,
    durations: Mutex<HashMap<PathBuf, f64>>,
    default_duration: f64,
}

impl MockBackend {
    pub fn new(default_duration: f64) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            busy: AtomicBool::new(false),
            failing: AtomicBool::new(false),
            busy_query_fails: AtomicBool::new(false),
            start_fails: AtomicBool::new(false),
            broken_paths: Mutex::new(HashSet::new()),
            durations: Mutex::new(HashMap::new()),
            default_duration,
        }
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Simulates the loaded track playing to its end.
    pub fn finish_track(&self) {
        self.busy.store(false, SeqCst);
    }

    /// Makes every command fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, SeqCst);
    }

    pub fn set_busy_query_fails(&self, fails: bool) {
        self.busy_query_fails.store(fails, SeqCst);
    }

    /// Makes `play` fail after a successful load, which already dropped the
    /// previous stream.
    pub fn set_start_fails(&self, fails: bool) {
        self.start_fails.store(fails, SeqCst);
    }

    /// Makes loading `path` fail.
    pub fn break_path(&self, path: impl Into<PathBuf>) {
        self.broken_paths.lock().insert(path.into());
    }

    pub fn set_duration(&self, path: impl Into<PathBuf>, seconds: f64) {
        self.durations.lock().insert(path.into(), seconds);
    }

    fn record(&self, call: BackendCall) -> Result<(), BackendError> {
        if self.failing.load(SeqCst) {
            return Err(BackendError::unavailable("mock failure"));
        }
        self.calls.lock().push(call);
        Ok(())
    }
}

impl AudioBackend for MockBackend {
    fn load(&self, path: &Path) -> Result<(), BackendError> {
        if self.broken_paths.lock().contains(path) {
            return Err(BackendError::unavailable("broken file"));
        }
        self.record(BackendCall::Load(path.to_path_buf()))?;
        self.busy.store(false, SeqCst);
        Ok(())
    }

    fn play(&self) -> Result<(), BackendError> {
        if self.start_fails.load(SeqCst) {
            return Err(BackendError::unavailable("mock start failure"));
        }
        self.record(BackendCall::Play)?;
        self.busy.store(true, SeqCst);
        Ok(())
    }

    fn play_from(&self, offset_seconds: f64) -> Result<(), BackendError> {
        self.record(BackendCall::PlayFrom(offset_seconds))?;
        self.busy.store(true, SeqCst);
        Ok(())
    }

    fn pause(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Pause)?;
        self.busy.store(false, SeqCst);
        Ok(())
    }

    fn resume(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Resume)?;
        self.busy.store(true, SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<(), BackendError> {
        self.record(BackendCall::Stop)?;
        self.busy.store(false, SeqCst);
        Ok(())
    }

    fn is_busy(&self) -> Result<bool, BackendError> {
        if self.busy_query_fails.load(SeqCst) {
            return Err(BackendError::unavailable("mock busy query failure"));
        }
        Ok(self.busy.load(SeqCst))
    }

    fn set_volume(&self, level: f32) -> Result<(), BackendError> {
        self.record(BackendCall::SetVolume(level))
    }

    fn duration_seconds(&self, path: &Path) -> Result<f64, BackendError> {
        if self.failing.load(SeqCst) {
            return Err(BackendError::unavailable("mock failure"));
        }
        Ok(self
            .durations
            .lock()
            .get(path)
            .copied()
            .unwrap_or(self.default_duration))
    }
}

/// In-memory playlists.
#[derive(Debug, Default)]
pub struct MemorySource {
    playlists: RwLock<BTreeMap<String, Vec<Track>>>,
}

impl MemorySource {
    pub fn set(&self, playlist: &str, tracks: Vec<Track>) {
        self.playlists.write().insert(playlist.to_string(), tracks);
    }
}

impl PlaylistSource for MemorySource {
    fn tracks(&self, playlist: &str) -> Vec<Track> {
        self.playlists
            .read()
            .get(playlist)
            .cloned()
            .unwrap_or_default()
    }

    fn remove_track(&self, playlist: &str, index: usize) -> Result<Track, LibraryError> {
        let mut playlists = self.playlists.write();
        let tracks = playlists
            .get_mut(playlist)
            .ok_or_else(|| LibraryError::PlaylistNotFound {
                name: playlist.to_string(),
            })?;
        if index >= tracks.len() {
            return Err(LibraryError::TrackIndexOutOfRange {
                playlist: playlist.to_string(),
                index,
            });
        }
        Ok(tracks.remove(index))
    }
}

/// `count` tracks named `Track 0..` at `/music/track_<i>.mp3`.
pub fn create_test_tracks(count: usize) -> Vec<Track> {
    (0..count)
        .map(|i| Track::new(format!("Track {i}"), format!("/music/track_{i}.mp3")))
        .collect()
}

/// A controller wired to test doubles.
pub struct Fixture {
    pub controller: Arc<PlaybackController>,
    pub backend: Arc<MockBackend>,
    pub source: Arc<MemorySource>,
    pub clock: Arc<ManualClock>,
}

/// Controller over [`PLAYLIST`] holding `tracks`, each 180 s long, with the
/// clock at 1000 s.
pub fn fixture_with(tracks: Vec<Track>) -> Fixture {
    let backend = Arc::new(MockBackend::new(180.0));
    let source = Arc::new(MemorySource::default());
    source.set(PLAYLIST, tracks);
    let clock = Arc::new(ManualClock::new(1000.0));
    let session = Arc::new(Mutex::new(PlaybackSession::new(
        PLAYLIST,
        PlaybackSession::DEFAULT_VOLUME,
    )));

    let controller = Arc::new(PlaybackController::new(
        session,
        Arc::clone(&backend) as Arc<dyn AudioBackend>,
        Arc::clone(&source) as Arc<dyn PlaylistSource>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    ));

    Fixture {
        controller,
        backend,
        source,
        clock,
    }
}

/// [`fixture_with`] `count` generated tracks.
pub fn fixture(count: usize) -> Fixture {
    fixture_with(create_test_tracks(count))
}
