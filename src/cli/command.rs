//! Parsing of interactive shell commands.

use std::{path::PathBuf, str::FromStr};

use thiserror::Error;

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  list               show tracks of the active playlist
  playlists          show all playlists
  use <name>         switch the active playlist
  new <name>         create an empty playlist
  search <term>      find tracks in the active playlist
  play <n>           play track n, or pause it if it is playing
  toggle | pause     pause or resume
  stop               stop playback
  next | prev        skip forward or back
  seek <seconds>     jump to a position in the current track
  vol <0-100>        set the volume (higher levels clamp to 100)
  all                play the whole playlist from the start
  rm <n>             remove track n from the active playlist
  add <path>         copy an audio file into the music directory
  status             show what is playing
  help               show this text
  quit               exit";

/// Error type for command parsing.
#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    /// The command word is not known.
    #[error("Unknown command: {name} (try \"help\")")]
    Unknown { name: String },
    /// A required argument is missing.
    #[error("{command} needs {argument}")]
    MissingArgument {
        command: &'static str,
        argument: &'static str,
    },
    /// An argument could not be interpreted.
    #[error("Invalid argument for {command}: {value}")]
    InvalidArgument { command: &'static str, value: String },
}

/// A parsed shell command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    List,
    Playlists,
    Use(String),
    New(String),
    Search(String),
    Play(usize),
    Toggle,
    Stop,
    Next,
    Prev,
    Seek(f64),
    /// Volume in percent, `0..=100`.
    Volume(u8),
    All,
    Remove(usize),
    Add(PathBuf),
    Status,
    Help,
    Quit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `CommandError` for unknown commands or bad arguments.
    pub fn parse_line(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        line.parse().map(Some)
    }

    /// Command word, for logging.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Command::List => "list",
            Command::Playlists => "playlists",
            Command::Use(_) => "use",
            Command::New(_) => "new",
            Command::Search(_) => "search",
            Command::Play(_) => "play",
            Command::Toggle => "toggle",
            Command::Stop => "stop",
            Command::Next => "next",
            Command::Prev => "prev",
            Command::Seek(_) => "seek",
            Command::Volume(_) => "vol",
            Command::All => "all",
            Command::Remove(_) => "rm",
            Command::Add(_) => "add",
            Command::Status => "status",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_lowercase().as_str() {
            "list" | "ls" => Command::List,
            "playlists" => Command::Playlists,
            "use" => Command::Use(text(rest, "use", "a playlist name")?),
            "new" => Command::New(text(rest, "new", "a playlist name")?),
            "search" | "find" => Command::Search(text(rest, "search", "a search term")?),
            "play" => Command::Play(number(rest, "play", "a track number")?),
            "toggle" | "pause" => Command::Toggle,
            "stop" => Command::Stop,
            "next" => Command::Next,
            "prev" | "previous" => Command::Prev,
            "seek" => {
                let position: f64 = number(rest, "seek", "a position in seconds")?;
                Command::Seek(position)
            }
            "vol" | "volume" => {
                let percent: u32 = number(rest, "vol", "a level from 0 to 100")?;
                // Clamped like every other volume change
                Command::Volume(u8::try_from(percent.min(100)).unwrap_or(100))
            }
            "all" => Command::All,
            "rm" | "remove" => Command::Remove(number(rest, "rm", "a track number")?),
            "add" => Command::Add(PathBuf::from(text(rest, "add", "a file path")?)),
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => {
                return Err(CommandError::Unknown {
                    name: word.to_string(),
                });
            }
        };
        Ok(command)
    }
}

fn text(rest: &str, command: &'static str, argument: &'static str) -> Result<String, CommandError> {
    if rest.is_empty() {
        Err(CommandError::MissingArgument { command, argument })
    } else {
        Ok(rest.to_string())
    }
}

fn number<T: FromStr>(
    rest: &str,
    command: &'static str,
    argument: &'static str,
) -> Result<T, CommandError> {
    if rest.is_empty() {
        return Err(CommandError::MissingArgument { command, argument });
    }
    rest.parse().map_err(|_| CommandError::InvalidArgument {
        command,
        value: rest.to_string(),
    })
}
