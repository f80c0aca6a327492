//! Transcript interpretation for voicemux
//!
//! Turns transcribed speech into multiplexer actions: session switches,
//! symbolic key presses, or literal text injection. The interpreter holds
//! the small focus state (active session, pending word separator) and talks
//! to the multiplexer only through the [`SessionSink`] trait, so the whole
//! command path is testable without a real multiplexer.

pub mod interpreter;
pub mod patterns;
pub mod sink;
pub mod status;

pub use interpreter::{CommandInterpreter, CommandText};
pub use patterns::PatternTables;
pub use sink::{SessionKey, SessionSink, SinkError};
pub use status::StatusEvent;
