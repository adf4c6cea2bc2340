//! Voice transport for phone intake.
//!
//! Two legs meet in the server's call bridge: the telephony media stream,
//! whose JSON frames are modelled in [`telephony`], and a conversational
//! speech engine behind the [`SpeechEngine`] trait. [`RealtimeEngine`] is the
//! production adapter; tests substitute scripted engines.

pub mod config;
pub mod engine;
pub mod error;
pub mod realtime;
pub mod telephony;

pub use config::RealtimeConfig;
pub use engine::{
    EngineCommand, EngineConnection, EngineEvent, EngineHandle, EngineSession, SpeechEngine,
    ToolSpec,
};
pub use error::{EngineError, FrameError};
pub use realtime::RealtimeEngine;
pub use telephony::{parse_inbound, InboundFrame, OutboundFrame, StreamStart};
