//! Runtime wiring for the voicemux binary.
//!
//! The binary itself only parses flags and sets up logging; everything the
//! pipeline does lives here so integration tests can drive it with scripted
//! collaborators.

pub mod display;
pub mod runtime;
