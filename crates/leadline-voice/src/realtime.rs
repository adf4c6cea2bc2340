//! [`SpeechEngine`] over the realtime WebSocket protocol.

use crate::config::RealtimeConfig;
use crate::engine::{
    EngineCommand, EngineConnection, EngineEvent, EngineHandle, EngineSession, SpeechEngine,
    DEFAULT_COMMAND_CAPACITY, DEFAULT_EVENT_CAPACITY,
};
use crate::error::EngineError;
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::AUTHORIZATION;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::protocol::Message;

pub struct RealtimeEngine {
    config: RealtimeConfig,
}

impl RealtimeEngine {
    pub fn new(config: RealtimeConfig) -> Self {
        Self { config }
    }
}

/// Builds the `session.update` handshake.
pub fn session_update(config: &RealtimeConfig, session: &EngineSession) -> Value {
    let tools: Vec<Value> = session
        .tools
        .iter()
        .map(|tool| {
            json!({
                "type": "function",
                "name": tool.name,
                "description": tool.description,
                "parameters": tool.parameters,
            })
        })
        .collect();

    json!({
        "type": "session.update",
        "session": {
            "modalities": ["text", "audio"],
            "instructions": session.instructions,
            "voice": config.voice,
            "input_audio_format": "g711_ulaw",
            "output_audio_format": "g711_ulaw",
            "input_audio_transcription": { "model": config.transcription_model },
            "turn_detection": {
                "type": "server_vad",
                "threshold": config.vad_threshold,
                "prefix_padding_ms": config.prefix_padding_ms,
                "silence_duration_ms": config.silence_duration_ms,
            },
            "tools": tools,
            "tool_choice": "auto",
        }
    })
}

fn system_item(text: &str) -> Value {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "message",
            "role": "system",
            "content": [{ "type": "input_text", "text": text }],
        }
    })
}

fn response_create() -> Value {
    json!({ "type": "response.create" })
}

/// Protocol messages for one command, in send order.
pub fn command_messages(command: &EngineCommand) -> Vec<Value> {
    match command {
        EngineCommand::AppendAudio(audio) => {
            vec![json!({ "type": "input_audio_buffer.append", "audio": audio })]
        }
        EngineCommand::SystemMessage(text) => vec![system_item(text), response_create()],
        EngineCommand::FunctionOutput { call_id, output } => vec![
            json!({
                "type": "conversation.item.create",
                "item": {
                    "type": "function_call_output",
                    "call_id": call_id,
                    "output": output.to_string(),
                }
            }),
            response_create(),
        ],
        EngineCommand::Close => Vec::new(),
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum ServerEvent {
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },
    #[serde(rename = "response.audio_transcript.done")]
    AssistantTranscript { transcript: String },
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    CallerTranscript { transcript: String },
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCall {
        call_id: String,
        name: String,
        arguments: String,
    },
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,
    #[serde(rename = "error")]
    Error { error: ErrorBody },
    #[serde(other)]
    Ignored,
}

/// Decodes one server message. `Ok(None)` for events the bridge ignores.
pub fn parse_server_event(text: &str) -> Result<Option<EngineEvent>, EngineError> {
    let event: ServerEvent =
        serde_json::from_str(text).map_err(|e| EngineError::Protocol(e.to_string()))?;
    Ok(match event {
        ServerEvent::AudioDelta { delta } => Some(EngineEvent::AudioDelta(delta)),
        ServerEvent::AssistantTranscript { transcript } => {
            Some(EngineEvent::AssistantTranscript(transcript))
        }
        ServerEvent::CallerTranscript { transcript } => {
            Some(EngineEvent::CallerTranscript(transcript))
        }
        ServerEvent::FunctionCall {
            call_id,
            name,
            arguments,
        } => Some(EngineEvent::FunctionCall {
            call_id,
            name,
            arguments,
        }),
        ServerEvent::SpeechStarted => Some(EngineEvent::SpeechStarted),
        ServerEvent::Error { error } => Some(EngineEvent::Error(error.message)),
        ServerEvent::Ignored => None,
    })
}

#[async_trait]
impl SpeechEngine for RealtimeEngine {
    async fn connect(&self, session: EngineSession) -> Result<EngineConnection, EngineError> {
        if self.config.api_key.is_empty() {
            return Err(EngineError::Config("engine.api_key is empty".to_string()));
        }

        let url = format!("{}?model={}", self.config.url, self.config.model);
        let mut request = url.into_client_request()?;
        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.config.api_key))
            .map_err(|e| EngineError::Config(format!("invalid api key: {e}")))?;
        request.headers_mut().insert(AUTHORIZATION, bearer);
        request
            .headers_mut()
            .insert("openai-beta", HeaderValue::from_static("realtime=v1"));

        let (ws_stream, _) = connect_async(request).await?;
        let (mut sink, mut stream) = ws_stream.split();

        let mut opening = vec![session_update(&self.config, &session)];
        if let Some(context) = &session.context {
            opening.push(system_item(context));
        }
        opening.push(response_create());
        for message in opening {
            sink.send(Message::Text(message.to_string().into())).await?;
        }
        tracing::info!(model = %self.config.model, "speech engine session opened");

        let (command_tx, mut command_rx) = mpsc::channel::<EngineCommand>(DEFAULT_COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel::<EngineEvent>(DEFAULT_EVENT_CAPACITY);

        // The reader stops once the writer is gone, so neither half outlives teardown.
        let (writer_alive, mut writer_done) = oneshot::channel::<()>();
        let close_timeout = self.config.close_timeout();

        tokio::spawn(async move {
            let _alive = writer_alive;
            while let Some(command) = command_rx.recv().await {
                if command == EngineCommand::Close {
                    break;
                }
                for message in command_messages(&command) {
                    if let Err(e) = sink.send(Message::Text(message.to_string().into())).await {
                        tracing::warn!(error = %e, "engine send failed");
                        return;
                    }
                }
            }
            match tokio::time::timeout(close_timeout, sink.close()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::debug!(error = %e, "engine close failed"),
                Err(_) => tracing::debug!("engine close timed out"),
            }
        });

        tokio::spawn(async move {
            loop {
                let message = tokio::select! {
                    _ = &mut writer_done => break,
                    _ = event_tx.closed() => break,
                    message = stream.next() => message,
                };
                let text = match message {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "engine socket error");
                        break;
                    }
                };
                let event = match parse_server_event(&text) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(e) => EngineEvent::Malformed(e.to_string()),
                };
                let fatal = matches!(event, EngineEvent::Malformed(_));
                if event_tx.send(event).await.is_err() || fatal {
                    break;
                }
            }
            tracing::debug!("engine reader finished");
        });

        Ok(EngineConnection {
            handle: EngineHandle::new(command_tx),
            events: event_rx,
        })
    }
}
