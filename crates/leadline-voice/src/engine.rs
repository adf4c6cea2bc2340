//! Speech engine abstraction.
//!
//! An engine connection is a pair of channels: commands flow to the engine
//! through an [`EngineHandle`], events come back on an `mpsc` receiver.
//! Adapters own the actual socket and translate in both directions.

use crate::error::EngineError;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Default capacity of the command queue; audio frames beyond it are dropped.
pub const DEFAULT_COMMAND_CAPACITY: usize = 64;
/// Default capacity of the event queue.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// A function the engine may call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments object.
    pub parameters: serde_json::Value,
}

/// Per-call settings for a new engine session.
#[derive(Debug, Clone, Default)]
pub struct EngineSession {
    pub instructions: String,
    pub tools: Vec<ToolSpec>,
    /// Out-of-band context injected before the first response, e.g. caller ID.
    pub context: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineCommand {
    /// Base64 µ-law caller audio.
    AppendAudio(String),
    /// A system note for the model followed by a new response.
    SystemMessage(String),
    FunctionOutput {
        call_id: String,
        output: serde_json::Value,
    },
    Close,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Base64 µ-law audio for the caller.
    AudioDelta(String),
    /// Full text of something the assistant said.
    AssistantTranscript(String),
    /// Full text of something the caller said.
    CallerTranscript(String),
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    /// The caller started talking over the assistant.
    SpeechStarted,
    /// An error the engine reported; the session may continue.
    Error(String),
    /// The engine sent something we could not decode.
    Malformed(String),
}

/// Sending side of an engine connection.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    commands: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub fn new(commands: mpsc::Sender<EngineCommand>) -> Self {
        Self { commands }
    }

    /// Queues caller audio without waiting. Returns `Ok(false)` when the
    /// queue is full and the frame was dropped.
    pub fn push_audio(&self, payload: String) -> Result<bool, EngineError> {
        match self.commands.try_send(EngineCommand::AppendAudio(payload)) {
            Ok(()) => Ok(true),
            Err(TrySendError::Full(_)) => Ok(false),
            Err(TrySendError::Closed(_)) => Err(EngineError::Closed),
        }
    }

    pub async fn send_system_message(&self, text: impl Into<String>) -> Result<(), EngineError> {
        self.send(EngineCommand::SystemMessage(text.into())).await
    }

    pub async fn send_function_output(
        &self,
        call_id: impl Into<String>,
        output: serde_json::Value,
    ) -> Result<(), EngineError> {
        self.send(EngineCommand::FunctionOutput {
            call_id: call_id.into(),
            output,
        })
        .await
    }

    pub async fn close(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Close).await
    }

    async fn send(&self, command: EngineCommand) -> Result<(), EngineError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| EngineError::Closed)
    }
}

/// An open engine session. The event stream ends when the engine socket
/// closes.
#[derive(Debug)]
pub struct EngineConnection {
    pub handle: EngineHandle,
    pub events: mpsc::Receiver<EngineEvent>,
}

/// Opens speech engine sessions.
#[async_trait]
pub trait SpeechEngine: Send + Sync {
    async fn connect(&self, session: EngineSession) -> Result<EngineConnection, EngineError>;
}
