//! Telephony to speech-engine call bridge.
//!
//! One accepted media stream becomes one call: a session row, an engine
//! connection, and two pumps. The telephony pump forwards caller audio to the
//! engine; the engine pump forwards assistant audio back, answers the
//! engine's function calls against the intake state, and logs turns. The
//! first pump to finish decides how the call is torn down.

use crate::script::{intake_tools, DEFAULT_INSTRUCTIONS, SAVE_FIELD, SUBMIT_LEAD};
use crate::AppState;
use axum::extract::ws::{close_code, CloseFrame, Message as AxumMessage, Utf8Bytes, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use leadline_db::DbPool;
use leadline_intake::{Field, Guidance, IntakeState, Origin, SaveOutcome};
use leadline_leads::{LeadError, LeadSubmission, SubmissionOutcome};
use leadline_sessions::{
    get_or_create_open_session, log_turn, rekey_session, save_state, set_caller, NewTurn,
    SessionError,
};
use leadline_types::{Channel, LeadFields};
use leadline_voice::{
    parse_inbound, EngineConnection, EngineError, EngineEvent, EngineHandle, EngineSession,
    FrameError, InboundFrame, OutboundFrame, StreamStart,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::{JoinError, JoinHandle};
use uuid::Uuid;

/// Outbound telephony frames buffered per call.
const OUTBOUND_CAPACITY: usize = 256;
const PLACEHOLDER_PREFIX: &str = "pending:";
const END_OF_CALL_MARK: &str = "end_of_call";

const APOLOGY: &str = "I'm sorry, something went wrong on our end. A member of our team will \
                       follow up with you. Have a great day!";

/// Where a call is in its lifecycle. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPhase {
    Connecting,
    Streaming,
    AwaitingField,
    ConfirmingField,
    Finalizing,
    Draining,
    Closed,
}

impl CallPhase {
    fn is_ending(self) -> bool {
        matches!(
            self,
            CallPhase::Finalizing | CallPhase::Draining | CallPhase::Closed
        )
    }
}

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("database pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error("background task failed: {0}")]
    Task(#[from] JoinError),
    #[error("state encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Query parameters on the stream URL.
#[derive(Debug, Default, Deserialize)]
pub struct StreamParams {
    #[serde(alias = "CallSid")]
    pub call_sid: Option<String>,
    #[serde(rename = "From", alias = "from")]
    pub from: Option<String>,
}

/// How a call ended, as seen by the pump that finished first.
#[derive(Debug, Clone, PartialEq, Eq)]
enum CallEnd {
    /// The assistant said the closing phrase.
    Closing,
    CallerHungUp,
    EngineDisconnected,
    /// A frame on either leg could not be decoded.
    Protocol(String),
    Internal(String),
}

/// A `finalize` running on its own task.
type SubmissionTask = JoinHandle<Result<SubmissionOutcome, LeadError>>;

/// Per-call mutable state; one writer at a time.
#[derive(Debug)]
struct CallContext {
    phase: CallPhase,
    intake: IntakeState,
    submit_attempted: bool,
    /// Set while `submit_lead` waits on delivery. Left behind if the engine
    /// pump is cancelled mid-wait, for teardown to collect.
    submission: Option<SubmissionTask>,
    /// Caller transcripts since the last assistant turn.
    caller_said: Vec<String>,
    /// Fields saved since the last assistant turn.
    fields_saved: Vec<String>,
}

#[derive(Clone)]
struct CallBridge {
    state: Arc<AppState>,
    session_id: i64,
    stream_sid: String,
    tx: mpsc::Sender<AxumMessage>,
    ctx: Arc<Mutex<CallContext>>,
}

async fn with_conn<F, T>(pool: &DbPool, f: F) -> Result<T, BridgeError>
where
    F: FnOnce(&Connection) -> Result<T, SessionError> + Send + 'static,
    T: Send + 'static,
{
    let pool = pool.clone();
    tokio::task::spawn_blocking(move || -> Result<T, BridgeError> {
        let conn = pool.get()?;
        Ok(f(&conn)?)
    })
    .await?
}

/// Runs one call from accepted socket to teardown.
pub async fn run_call(socket: WebSocket, state: Arc<AppState>, params: StreamParams) {
    let key = params
        .call_sid
        .clone()
        .filter(|sid| !sid.trim().is_empty())
        .unwrap_or_else(|| format!("{PLACEHOLDER_PREFIX}{}", Uuid::new_v4()));
    let from = params.from.clone();
    let session = match with_conn(&state.pool, move |conn| {
        get_or_create_open_session(conn, Channel::Voice, &key, from.as_deref(), None)
    })
    .await
    {
        Ok(session) => session,
        Err(e) => {
            tracing::error!(error = %e, "could not open call session");
            return;
        }
    };
    let session_id = session.id;
    tracing::info!(session_id, session_key = %session.session_key, "call connected");

    let intake = IntakeState::from_json(&session.state_json).unwrap_or_else(|e| {
        tracing::warn!(session_id, error = %e, "stored intake state unreadable, starting over");
        IntakeState::new()
    });
    let ctx = Arc::new(Mutex::new(CallContext {
        phase: CallPhase::Connecting,
        intake,
        submit_attempted: false,
        submission: None,
        caller_said: Vec::new(),
        fields_saved: Vec::new(),
    }));

    let (sender, mut receiver) = socket.split();
    let (tx, rx) = mpsc::channel::<AxumMessage>(OUTBOUND_CAPACITY);
    let send_task = tokio::spawn(forward_outbound(sender, rx));

    let start = match await_start(&mut receiver).await {
        Ok(Some(start)) => start,
        Ok(None) => {
            tracing::info!(session_id, "stream ended before start; session left open");
            finish_telephony(send_task, tx, &state, None).await;
            return;
        }
        Err(e) => {
            tracing::warn!(session_id, error = %e, "protocol error before start; session left open");
            finish_telephony(send_task, tx, &state, None).await;
            return;
        }
    };

    let bridge = CallBridge {
        state: state.clone(),
        session_id,
        stream_sid: start.stream_sid.clone(),
        tx: tx.clone(),
        ctx,
    };
    let caller = start
        .caller_phone()
        .map(str::to_string)
        .or_else(|| params.from.clone());
    let context = bridge
        .handle_start(&session.session_key, &start, caller)
        .await;

    let instructions = state
        .bridge
        .instructions
        .clone()
        .unwrap_or_else(|| DEFAULT_INSTRUCTIONS.to_string());
    let connection = state
        .engine
        .connect(EngineSession {
            instructions,
            tools: intake_tools(),
            context,
        })
        .await;
    let EngineConnection { handle, events } = match connection {
        Ok(connection) => connection,
        Err(e) => {
            tracing::error!(session_id, error = %e, "speech engine unavailable; session left open");
            bridge.set_phase(CallPhase::Closed).await;
            finish_telephony(send_task, tx, &state, Some(close_code::ERROR)).await;
            return;
        }
    };
    bridge.set_phase(CallPhase::Streaming).await;

    let mut telephony = tokio::spawn(telephony_pump(receiver, handle.clone(), session_id));
    let mut engine = tokio::spawn(engine_pump(bridge.clone(), events, handle.clone()));

    let end = tokio::select! {
        res = &mut telephony => {
            engine.abort();
            res.unwrap_or_else(|e| CallEnd::Internal(e.to_string()))
        }
        res = &mut engine => {
            telephony.abort();
            res.unwrap_or_else(|e| CallEnd::Internal(e.to_string()))
        }
    };
    tracing::info!(session_id, end = ?end, "call pumps finished");

    let close = bridge.wind_down(end).await;

    let close_timeout = state.bridge.close_timeout();
    if tokio::time::timeout(close_timeout, handle.close()).await.is_err() {
        tracing::debug!(session_id, "engine close timed out");
    }
    bridge.set_phase(CallPhase::Closed).await;
    drop(bridge);
    finish_telephony(send_task, tx, &state, Some(close)).await;
    tracing::info!(session_id, "call closed");
}

/// Reads frames until `start`. `Ok(None)` when the stream ends first.
async fn await_start(
    receiver: &mut SplitStream<WebSocket>,
) -> Result<Option<StreamStart>, FrameError> {
    while let Some(Ok(msg)) = receiver.next().await {
        let text = match msg {
            AxumMessage::Text(text) => text,
            AxumMessage::Close(_) => return Ok(None),
            _ => continue,
        };
        match parse_inbound(&text)? {
            InboundFrame::Start { start } => return Ok(Some(start)),
            InboundFrame::Stop => return Ok(None),
            _ => continue,
        }
    }
    Ok(None)
}

async fn forward_outbound(
    mut sender: SplitSink<WebSocket, AxumMessage>,
    mut rx: mpsc::Receiver<AxumMessage>,
) {
    while let Some(msg) = rx.recv().await {
        let closing = matches!(msg, AxumMessage::Close(_));
        if sender.send(msg).await.is_err() || closing {
            break;
        }
    }
}

/// Sends a close frame if asked, then waits briefly for the send task.
async fn finish_telephony(
    mut send_task: tokio::task::JoinHandle<()>,
    tx: mpsc::Sender<AxumMessage>,
    state: &AppState,
    code: Option<u16>,
) {
    if let Some(code) = code {
        let frame = CloseFrame {
            code,
            reason: Utf8Bytes::from_static("call complete"),
        };
        let _ = tx.send(AxumMessage::Close(Some(frame))).await;
    }
    drop(tx);
    if tokio::time::timeout(state.bridge.close_timeout(), &mut send_task)
        .await
        .is_err()
    {
        send_task.abort();
    }
}

/// Caller audio to the engine. Never touches the call context.
async fn telephony_pump(
    mut receiver: SplitStream<WebSocket>,
    handle: EngineHandle,
    session_id: i64,
) -> CallEnd {
    let mut dropped: u64 = 0;
    let end = loop {
        let Some(msg) = receiver.next().await else {
            break CallEnd::CallerHungUp;
        };
        let text = match msg {
            Ok(AxumMessage::Text(text)) => text,
            Ok(AxumMessage::Close(_)) => break CallEnd::CallerHungUp,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(session_id, error = %e, "telephony socket error");
                break CallEnd::CallerHungUp;
            }
        };
        match parse_inbound(&text) {
            Ok(InboundFrame::Media { media }) => match handle.push_audio(media.payload) {
                Ok(true) => {}
                Ok(false) => dropped += 1,
                Err(_) => break CallEnd::EngineDisconnected,
            },
            Ok(InboundFrame::Stop) => break CallEnd::CallerHungUp,
            Ok(InboundFrame::Mark { mark }) => {
                tracing::debug!(session_id, mark = %mark.name, "playback mark reached");
            }
            Ok(_) => {}
            Err(e) => break CallEnd::Protocol(e.to_string()),
        }
    };
    if dropped > 0 {
        tracing::debug!(session_id, dropped, "dropped caller audio frames");
    }
    end
}

/// Engine events to the caller and the intake state.
async fn engine_pump(
    bridge: CallBridge,
    mut events: mpsc::Receiver<EngineEvent>,
    handle: EngineHandle,
) -> CallEnd {
    while let Some(event) = events.recv().await {
        match event {
            EngineEvent::AudioDelta(payload) => {
                if !bridge
                    .send_frame(OutboundFrame::media(&bridge.stream_sid, payload))
                    .await
                {
                    return CallEnd::CallerHungUp;
                }
            }
            EngineEvent::SpeechStarted => {
                if !bridge
                    .send_frame(OutboundFrame::clear(&bridge.stream_sid))
                    .await
                {
                    return CallEnd::CallerHungUp;
                }
            }
            EngineEvent::CallerTranscript(text) => {
                bridge.ctx.lock().await.caller_said.push(text);
            }
            EngineEvent::AssistantTranscript(text) => {
                bridge.record_turn(&text).await;
                if bridge.is_closing(&text) {
                    bridge.set_phase(CallPhase::Draining).await;
                    bridge.drain_playback(&mut events).await;
                    return CallEnd::Closing;
                }
            }
            EngineEvent::FunctionCall {
                call_id,
                name,
                arguments,
            } => {
                let output = bridge.handle_function_call(&name, &arguments).await;
                if handle.send_function_output(call_id, output).await.is_err() {
                    return CallEnd::EngineDisconnected;
                }
            }
            EngineEvent::Error(message) => {
                tracing::warn!(session_id = bridge.session_id, error = %message, "speech engine error");
            }
            EngineEvent::Malformed(message) => return CallEnd::Protocol(message),
        }
    }
    CallEnd::EngineDisconnected
}

#[derive(Debug, Deserialize)]
struct SaveFieldArgs {
    field_name: String,
    field_value: Value,
}

/// Accepts numbers and booleans where the schema asks for a string.
fn value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(true) => Some("yes".to_string()),
        Value::Bool(false) => Some("no".to_string()),
        _ => None,
    }
}

fn failure(error: impl Into<String>) -> Value {
    json!({ "success": false, "error": error.into() })
}

fn apology() -> Value {
    json!({
        "success": false,
        "error": "internal error",
        "message": APOLOGY,
        "instructions": "Say the message to the caller word for word, then stop.",
    })
}

impl CallBridge {
    async fn set_phase(&self, phase: CallPhase) {
        let mut ctx = self.ctx.lock().await;
        if ctx.phase != CallPhase::Closed {
            ctx.phase = phase;
        }
    }

    /// Returns false once the telephony leg is gone.
    async fn send_frame(&self, frame: OutboundFrame) -> bool {
        self.tx
            .send(AxumMessage::Text(frame.to_json().into()))
            .await
            .is_ok()
    }

    /// Forwards assistant audio still arriving after the goodbye, then
    /// waits out the rest of the drain period. Everything else is dropped.
    async fn drain_playback(&self, events: &mut mpsc::Receiver<EngineEvent>) {
        let deadline = tokio::time::Instant::now() + self.state.bridge.drain();
        while let Ok(Some(event)) = tokio::time::timeout_at(deadline, events.recv()).await {
            if let EngineEvent::AudioDelta(payload) = event {
                if !self
                    .send_frame(OutboundFrame::media(&self.stream_sid, payload))
                    .await
                {
                    return;
                }
            }
        }
        tokio::time::sleep_until(deadline).await;
    }

    fn is_closing(&self, text: &str) -> bool {
        let phrase = self.state.bridge.closing_phrase.trim().to_lowercase();
        !phrase.is_empty() && text.to_lowercase().contains(&phrase)
    }

    /// Re-keys a placeholder session and pre-fills the caller ID.
    ///
    /// Returns context for the engine when a read-back is already pending.
    async fn handle_start(
        &self,
        session_key: &str,
        start: &StreamStart,
        caller: Option<String>,
    ) -> Option<String> {
        let session_id = self.session_id;
        tracing::info!(session_id, call_sid = %start.call_sid, "media stream started");

        if session_key.starts_with(PLACEHOLDER_PREFIX) && !start.call_sid.is_empty() {
            let call_sid = start.call_sid.clone();
            if let Err(e) = with_conn(&self.state.pool, move |conn| {
                rekey_session(conn, session_id, &call_sid)
            })
            .await
            {
                tracing::warn!(session_id, error = %e, "could not re-key session");
            }
        }

        let phone = caller?;
        let stored = phone.clone();
        if let Err(e) = with_conn(&self.state.pool, move |conn| {
            set_caller(conn, session_id, Some(&stored), None)
        })
        .await
        {
            tracing::warn!(session_id, error = %e, "could not store caller number");
        }

        let mut ctx = self.ctx.lock().await;
        if ctx.intake.slot(Field::Phone).value().is_some() {
            return None;
        }
        let mut next = ctx.intake.clone();
        if next.save(Field::Phone, &phone, Origin::CallerId).is_err() {
            tracing::debug!(session_id, "caller ID is not a usable phone number");
            return None;
        }
        if let Err(e) = self.persist(&next).await {
            tracing::warn!(session_id, error = %e, "could not persist caller ID");
            return None;
        }
        ctx.intake = next;
        ctx.fields_saved.push(Field::Phone.as_str().to_string());
        Some(format!(
            "The caller's number came from caller ID and still needs confirming. \
             After the greeting, ask: {}",
            ctx.intake.guidance().prompt()
        ))
    }

    async fn persist(&self, intake: &IntakeState) -> Result<(), BridgeError> {
        let state_json = intake.to_json()?;
        let last_prompt = intake.guidance().field().map(|f| f.as_str().to_string());
        let session_id = self.session_id;
        with_conn(&self.state.pool, move |conn| {
            save_state(conn, session_id, &state_json, last_prompt.as_deref())
        })
        .await
    }

    async fn handle_function_call(&self, name: &str, arguments: &str) -> Value {
        let mut ctx = self.ctx.lock().await;
        if ctx.phase.is_ending() {
            return failure("the call is ending");
        }
        match name {
            SAVE_FIELD => self.save_field(&mut ctx, arguments).await,
            SUBMIT_LEAD => self.submit_lead(&mut ctx).await,
            other => {
                tracing::warn!(session_id = self.session_id, function = other, "unknown function call");
                failure(format!("unknown function {other}"))
            }
        }
    }

    async fn save_field(&self, ctx: &mut CallContext, arguments: &str) -> Value {
        let session_id = self.session_id;
        let args: SaveFieldArgs = match serde_json::from_str(arguments) {
            Ok(args) => args,
            Err(e) => return failure(format!("invalid arguments: {e}")),
        };
        let Some(value) = value_text(&args.field_value) else {
            return failure("field_value must be a string");
        };
        if ctx.submit_attempted {
            return failure("the lead was already submitted");
        }

        let mut next = ctx.intake.clone();
        let outcome = match next.apply(&args.field_name, &value) {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::info!(session_id, field = %args.field_name, error = %e, "field rejected");
                return json!({
                    "success": false,
                    "error": e.to_string(),
                    "reprompt": e.reprompt(),
                });
            }
        };

        if outcome != SaveOutcome::Unchanged {
            if let Err(e) = self.persist(&next).await {
                tracing::error!(session_id, error = %e, "could not persist intake state");
                return apology();
            }
        }

        let guidance = next.guidance();
        let saved: Vec<&str> = outcome.fields().iter().map(|f| f.as_str()).collect();
        tracing::info!(session_id, field = %args.field_name, saved = ?saved, "field saved");
        ctx.fields_saved
            .extend(saved.iter().map(|name| name.to_string()));
        ctx.phase = if matches!(guidance, Guidance::Confirm { .. }) {
            CallPhase::ConfirmingField
        } else {
            CallPhase::AwaitingField
        };
        ctx.intake = next;

        json!({
            "success": true,
            "saved": saved,
            "next": guidance.prompt(),
        })
    }

    async fn submit_lead(&self, ctx: &mut CallContext) -> Value {
        let session_id = self.session_id;
        if ctx.submit_attempted {
            return failure("the lead was already submitted");
        }
        let Some(lead) = ctx.intake.lead_fields() else {
            return json!({
                "success": false,
                "error": "not every required field is confirmed",
                "next": ctx.intake.guidance().prompt(),
            });
        };

        let task = self.spawn_submission(ctx, lead);
        let result = ctx.submission.insert(task).await;
        ctx.submission = None;
        match result {
            Ok(Ok(outcome)) => {
                tracing::info!(session_id, outcome = outcome.label(), "lead finalized");
                json!({
                    "success": true,
                    "outcome": outcome.label(),
                    "message": outcome.closing_message(),
                    "instructions": "Say the message to the caller word for word.",
                })
            }
            Ok(Err(e)) => {
                tracing::error!(session_id, error = %e, "lead finalization failed");
                apology()
            }
            Err(e) => {
                tracing::error!(session_id, error = %e, "lead finalization task failed");
                apology()
            }
        }
    }

    /// Runs `finalize` on its own task so cancelling a pump cannot stop it
    /// between delivery and the ledger write.
    fn spawn_submission(&self, ctx: &mut CallContext, lead: LeadFields) -> SubmissionTask {
        ctx.submit_attempted = true;
        let submitter = self.state.submitter.clone();
        let submission = LeadSubmission {
            session_id: self.session_id,
            channel: Channel::Voice,
            lead,
        };
        tokio::spawn(async move { submitter.finalize(submission).await })
    }

    /// Waits for a submission task, up to the configured bound. A task
    /// still running after that is left to finish and record itself.
    async fn settle_submission(&self, mut task: SubmissionTask) {
        let session_id = self.session_id;
        match tokio::time::timeout(self.state.bridge.submit_wait(), &mut task).await {
            Ok(Ok(Ok(outcome))) => {
                tracing::info!(session_id, outcome = outcome.label(), "lead finalized after the call ended");
            }
            Ok(Ok(Err(e))) => {
                tracing::error!(session_id, error = %e, "lead finalization after the call ended failed");
            }
            Ok(Err(e)) => {
                tracing::error!(session_id, error = %e, "lead finalization task failed");
            }
            Err(_) => {
                tracing::warn!(session_id, "lead finalization still running at teardown");
            }
        }
    }

    /// Appends an audit turn; bounded and best effort.
    async fn record_turn(&self, outbound: &str) {
        let (inbound, fields_saved, snapshot) = {
            let mut ctx = self.ctx.lock().await;
            let inbound = if ctx.caller_said.is_empty() {
                None
            } else {
                Some(std::mem::take(&mut ctx.caller_said).join(" "))
            };
            let fields = std::mem::take(&mut ctx.fields_saved);
            let snapshot = ctx.intake.to_json().unwrap_or_else(|_| "{}".to_string());
            (inbound, fields, snapshot)
        };

        let session_id = self.session_id;
        let outbound = outbound.to_string();
        let write = with_conn(&self.state.pool, move |conn| {
            log_turn(
                conn,
                session_id,
                &NewTurn {
                    inbound_text: inbound.as_deref(),
                    outbound_text: Some(&outbound),
                    fields_saved: &fields_saved,
                    state_snapshot_json: &snapshot,
                },
            )
        });
        match tokio::time::timeout(self.state.bridge.turn_log_timeout(), write).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(session_id, error = %e, "could not log turn"),
            Err(_) => tracing::warn!(session_id, "turn log timed out"),
        }
    }

    /// Tears down after the pumps stop; returns the telephony close code.
    async fn wind_down(&self, end: CallEnd) -> u16 {
        let session_id = self.session_id;
        let in_flight = self.ctx.lock().await.submission.take();
        if let Some(task) = in_flight {
            self.settle_submission(task).await;
        }
        match end {
            CallEnd::Closing => {
                self.send_frame(OutboundFrame::mark(&self.stream_sid, END_OF_CALL_MARK))
                    .await;
                close_code::NORMAL
            }
            CallEnd::CallerHungUp | CallEnd::EngineDisconnected => {
                self.submit_if_ready().await;
                close_code::NORMAL
            }
            CallEnd::Protocol(message) => {
                tracing::warn!(session_id, error = %message, "protocol error; session left open");
                close_code::PROTOCOL
            }
            CallEnd::Internal(message) => {
                tracing::error!(session_id, error = %message, "call pump failed");
                close_code::ERROR
            }
        }
    }

    /// Best-effort submission after a dropped connection.
    async fn submit_if_ready(&self) {
        let task = {
            let mut ctx = self.ctx.lock().await;
            if ctx.submit_attempted || ctx.phase == CallPhase::Closed {
                return;
            }
            if !ctx.intake.is_complete() {
                tracing::info!(
                    session_id = self.session_id,
                    "call dropped before intake completed; session left open"
                );
                return;
            }
            let Some(lead) = ctx.intake.lead_fields() else {
                return;
            };
            ctx.phase = CallPhase::Finalizing;
            self.spawn_submission(&mut ctx, lead)
        };
        self.settle_submission(task).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_values_accept_scalars() {
        assert_eq!(value_text(&json!("30093")), Some("30093".into()));
        assert_eq!(value_text(&json!(2020)), Some("2020".into()));
        assert_eq!(value_text(&json!(true)), Some("yes".into()));
        assert_eq!(value_text(&json!(null)), None);
    }

    #[test]
    fn ending_phases() {
        assert!(!CallPhase::AwaitingField.is_ending());
        assert!(CallPhase::Finalizing.is_ending());
        assert!(CallPhase::Closed.is_ending());
    }

    #[test]
    fn stream_params_accept_provider_casing() {
        let params: StreamParams =
            serde_json::from_value(json!({"CallSid": "CA1", "From": "+17205551234"})).unwrap();
        assert_eq!(params.call_sid.as_deref(), Some("CA1"));
        assert_eq!(params.from.as_deref(), Some("+17205551234"));
    }
}
