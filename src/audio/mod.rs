//! Audio playback system.
//!
//! Defines the [`backend::AudioBackend`] capability consumed by the playback
//! controller and its `cpal`/`symphonia` implementation, [`engine::AudioEngine`].

pub mod backend;
pub mod decoder;
pub mod engine;
pub mod metadata;
pub mod output;
pub mod resampler;
