//! Interactive command-line front-end.

pub mod command;
pub mod shell;

pub use {
    command::{Command, CommandError},
    shell::{Flow, Shell, spawn_event_logger, spawn_progress_printer},
};
