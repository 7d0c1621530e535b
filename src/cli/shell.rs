//! Line-oriented front-end over the playback controller.
//!
//! Commands are read from stdin, parsed by [`Command`], and executed on the
//! blocking thread pool since controller calls wait on the audio thread.
//! Playback events are logged by a separate observer task.

use std::{
    io::{Result as IoResult, Write, stdout},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};

use {
    anyhow::Result as AnyhowResult,
    tokio::{
        io::{AsyncBufReadExt, BufReader, stdin},
        sync::broadcast::{Receiver, error::RecvError},
        task::{JoinHandle, spawn_blocking},
        time::{MissedTickBehavior::Skip, interval},
    },
    tracing::{debug, info, warn},
};

use crate::{
    cli::command::{Command, HELP},
    error::{ErrorReporter, ResultExt},
    library::{
        artwork::find_album_art,
        catalog::{ALL_SONGS, PlaylistCatalog},
        scanner::LibraryScanner,
        source::PlaylistSource,
    },
    playback::{
        controller::PlaybackController,
        events::PlaybackEvent,
        session::PlaybackState::{Playing, Stopped},
        timeline::TimelineReporter,
    },
};

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Interactive command interpreter.
pub struct Shell {
    controller: Arc<PlaybackController>,
    catalog: Arc<PlaylistCatalog>,
    scanner: Arc<LibraryScanner>,
    reporter: TimelineReporter,
}

impl Shell {
    /// Creates a shell over the given controller and library.
    pub fn new(
        controller: Arc<PlaybackController>,
        catalog: Arc<PlaylistCatalog>,
        scanner: Arc<LibraryScanner>,
    ) -> Self {
        let reporter = TimelineReporter::new(controller.session(), controller.clock());
        Self {
            controller,
            catalog,
            scanner,
            reporter,
        }
    }

    /// Reads and executes commands from stdin until `quit` or end of input.
    ///
    /// # Errors
    ///
    /// Returns an error if stdin cannot be read or a command task panics.
    pub async fn run(self) -> AnyhowResult<()> {
        let shell = Arc::new(self);
        let mut lines = BufReader::new(stdin()).lines();
        println!("Type \"help\" for a list of commands.");

        while let Some(line) = lines.next_line().await.add_context("Reading stdin")? {
            let command = match Command::parse_line(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };

            let shell = Arc::clone(&shell);
            let flow = spawn_blocking(move || shell.execute(command, &mut stdout().lock()))
                .await
                .add_context("Command task failed")?
                .add_context("Writing to stdout")?;
            if flow == Flow::Quit {
                break;
            }
        }

        debug!("Shell input finished");
        Ok(())
    }

    /// Executes one command, writing user-facing output to `out`.
    ///
    /// Rejected commands are reported to `out` and never end the shell.
    ///
    /// # Errors
    ///
    /// Returns an IO error only if writing to `out` fails.
    pub fn execute(&self, command: Command, out: &mut dyn Write) -> IoResult<Flow> {
        let playlist = self.controller.session_snapshot().active_playlist;
        let command_name = command.name();
        let result = match command {
            Command::List => return self.list(&playlist, out).map(|()| Flow::Continue),
            Command::Playlists => {
                for name in self.catalog.playlist_names() {
                    let marker = if name == playlist { '*' } else { ' ' };
                    writeln!(out, "{marker} {name}")?;
                }
                return Ok(Flow::Continue);
            }
            Command::Use(name) => {
                if self.catalog.contains(&name) {
                    self.controller.select_playlist(&name);
                    writeln!(out, "Using playlist {name:?}")?;
                } else {
                    writeln!(out, "No playlist named {name:?}")?;
                }
                return Ok(Flow::Continue);
            }
            Command::New(name) => {
                match self.catalog.add_playlist(&name) {
                    Ok(()) => writeln!(out, "Created playlist {:?}", name.trim())?,
                    Err(e) => writeln!(out, "{e}")?,
                }
                return Ok(Flow::Continue);
            }
            Command::Search(term) => {
                let hits = self.catalog.search(&playlist, &term);
                if hits.is_empty() {
                    writeln!(out, "No tracks match {term:?}")?;
                }
                for (index, track) in hits {
                    writeln!(out, "{index:>4}  {}", track.name)?;
                }
                return Ok(Flow::Continue);
            }
            Command::Remove(index) => {
                match self.catalog.remove_track(&playlist, index) {
                    Ok(track) => writeln!(out, "Removed {}", track.name)?,
                    Err(e) => writeln!(out, "{e}")?,
                }
                return Ok(Flow::Continue);
            }
            Command::Add(path) => return self.add(path, out).map(|()| Flow::Continue),
            Command::Status => return self.status(out).map(|()| Flow::Continue),
            Command::Help => {
                writeln!(out, "{HELP}")?;
                return Ok(Flow::Continue);
            }
            Command::Quit => return Ok(Flow::Quit),
            Command::Play(index) => self.controller.play_or_toggle(index),
            Command::Toggle => self.controller.toggle_play_pause(),
            Command::Stop => self.controller.stop(),
            Command::Next => self.controller.next(),
            Command::Prev => self.controller.prev(),
            Command::Seek(position) => self.controller.seek(position),
            Command::Volume(percent) => self.controller.set_volume(f32::from(percent) / 100.0),
            Command::All => self.controller.begin_play_all(),
        };

        if let Err(e) = result {
            ErrorReporter::playback(&e, command_name);
            writeln!(out, "{}", ErrorReporter::to_user_message(&e))?;
        }
        Ok(Flow::Continue)
    }

    fn list(&self, playlist: &str, out: &mut dyn Write) -> IoResult<()> {
        let session = self.controller.session_snapshot();
        let tracks = self.catalog.tracks(playlist);
        writeln!(out, "{playlist} ({} tracks)", tracks.len())?;

        for (index, track) in tracks.iter().enumerate() {
            let current = session.state != Stopped && session.track_index == index;
            let marker = if current { '>' } else { ' ' };
            writeln!(out, "{marker}{index:>4}  {}", track.name)?;
        }
        Ok(())
    }

    fn add(&self, path: PathBuf, out: &mut dyn Write) -> IoResult<()> {
        match self.scanner.import(&path) {
            Ok(Some(destination)) => {
                writeln!(out, "Added {}", destination.display())?;
                self.controller.select_playlist(ALL_SONGS);
            }
            Ok(None) => writeln!(out, "Already in the library: {}", path.display())?,
            Err(e) => writeln!(out, "Could not add {}: {e}", path.display())?,
        }
        Ok(())
    }

    fn status(&self, out: &mut dyn Write) -> IoResult<()> {
        let session = self.controller.session_snapshot();
        let timeline = self.reporter.timeline();
        let track = session
            .current_track
            .as_ref()
            .map_or("nothing loaded", |track| track.name.as_str());

        writeln!(out, "{}: {track}", timeline.state)?;
        writeln!(out, "  {}", timeline.label())?;
        writeln!(
            out,
            "  playlist {:?}, track #{}, volume {:.0}%{}",
            session.active_playlist,
            session.track_index,
            session.volume * 100.0,
            if session.continuous_play {
                ", playing all"
            } else {
                ""
            }
        )
    }
}

/// Prints the timeline at `period` while a track is playing.
pub fn spawn_progress_printer(reporter: TimelineReporter, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(Skip);
        loop {
            ticker.tick().await;
            let timeline = reporter.timeline();
            if timeline.state == Playing {
                let mut out = stdout().lock();
                if write!(out, "\r{}  ", timeline.label())
                    .and_then(|()| out.flush())
                    .is_err()
                {
                    break;
                }
            }
        }
    })
}

/// Logs playback events and looks up album art for new tracks.
///
/// The task ends when the controller is dropped.
pub fn spawn_event_logger(
    mut events: Receiver<PlaybackEvent>,
    album_art_dir: PathBuf,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(PlaybackEvent::TrackChanged { index, track }) => {
                    info!(index, "Now playing: {}", track.name);
                    match find_album_art(&album_art_dir, &track.name) {
                        Some(art) => info!("Album art: {}", art.display()),
                        None => debug!("No album art for {}", track.name),
                    }
                }
                Ok(PlaybackEvent::PlaybackStateChanged(state)) => debug!("Playback {state}"),
                Ok(PlaybackEvent::VolumeChanged(level)) => {
                    debug!("Volume {}", format_volume(level));
                }
                Ok(PlaybackEvent::PlaylistChanged(name)) => info!("Playlist: {name}"),
                Err(RecvError::Lagged(skipped)) => warn!("Event logger skipped {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn format_volume(level: f32) -> String {
    format!("{:.0}%", level * 100.0)
}
