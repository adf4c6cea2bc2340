use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use leadline_db::{create_pool, run_migrations, DbPool, DbRuntimeSettings};
use leadline_leads::{ledger, DeliveryError, LeadApi, LeadSubmission, LeadSubmitter};
use leadline_server::config::BridgeConfig;
use leadline_server::{app, AppState};
use leadline_sessions::{get_session, list_open_sessions, list_turns};
use leadline_types::{Channel, SessionStatus};
use leadline_voice::{
    EngineCommand, EngineConnection, EngineError, EngineEvent, EngineHandle, EngineSession,
    SpeechEngine,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::protocol::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

type Telephony = WebSocketStream<MaybeTlsStream<TcpStream>>;

const WAIT: Duration = Duration::from_secs(5);

/// One engine session as seen from the test: the session the bridge asked
/// for, a sender to play engine events, and the commands the bridge sent.
struct FakeCall {
    session: EngineSession,
    events: mpsc::Sender<EngineEvent>,
    commands: mpsc::Receiver<EngineCommand>,
    next_call_id: usize,
}

/// Hands every connection to the test instead of talking to a real engine.
struct ScriptedEngine {
    calls: mpsc::UnboundedSender<FakeCall>,
}

#[async_trait]
impl SpeechEngine for ScriptedEngine {
    async fn connect(&self, session: EngineSession) -> Result<EngineConnection, EngineError> {
        let (command_tx, command_rx) = mpsc::channel(1024);
        let (event_tx, event_rx) = mpsc::channel(64);
        self.calls
            .send(FakeCall {
                session,
                events: event_tx,
                commands: command_rx,
                next_call_id: 0,
            })
            .map_err(|_| EngineError::Closed)?;
        Ok(EngineConnection {
            handle: EngineHandle::new(command_tx),
            events: event_rx,
        })
    }
}

#[derive(Default)]
struct CountingApi {
    calls: AtomicUsize,
    /// Time each delivery takes after it is counted.
    latency: Duration,
}

#[async_trait]
impl LeadApi for CountingApi {
    async fn create_lead(&self, _submission: &LeadSubmission) -> Result<String, DeliveryError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.latency).await;
        Ok(format!("REC-{n}"))
    }
}

struct Harness {
    pool: DbPool,
    api: Arc<CountingApi>,
    calls: mpsc::UnboundedReceiver<FakeCall>,
    url: String,
}

impl Harness {
    async fn start() -> Self {
        Self::with_api_latency(Duration::ZERO).await
    }

    async fn with_api_latency(latency: Duration) -> Self {
        let file = tempfile::NamedTempFile::new().expect("temp file");
        let path = file.path().to_str().expect("utf-8 path").to_string();
        std::mem::forget(file);
        let pool = create_pool(&path, DbRuntimeSettings::default()).expect("pool");
        run_migrations(&pool.get().expect("conn")).expect("migrations");

        let (calls_tx, calls) = mpsc::unbounded_channel();
        let api = Arc::new(CountingApi {
            latency,
            ..CountingApi::default()
        });
        let state = AppState {
            pool: pool.clone(),
            engine: Arc::new(ScriptedEngine { calls: calls_tx }),
            submitter: LeadSubmitter::new(pool.clone(), api.clone()),
            bridge: Arc::new(BridgeConfig {
                drain_ms: 50,
                close_timeout_ms: 500,
                ..BridgeConfig::default()
            }),
        };

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.unwrap();
        });

        Self {
            pool,
            api,
            calls,
            url: format!("ws://{addr}/twilio/voice/stream"),
        }
    }

    /// Dials in and sends `connected` and `start`; returns once the engine is up.
    async fn dial(&mut self, query: &str, call_sid: &str, caller: Option<&str>) -> (Telephony, FakeCall) {
        let mut ws = self.connect(query).await;
        let call = self.start_stream(&mut ws, call_sid, caller).await;
        (ws, call)
    }

    async fn connect(&self, query: &str) -> Telephony {
        let (mut ws, _) = connect_async(format!("{}{query}", self.url)).await.unwrap();
        send_json(&mut ws, json!({"event": "connected", "protocol": "Call"})).await;
        ws
    }

    async fn start_stream(&mut self, ws: &mut Telephony, call_sid: &str, caller: Option<&str>) -> FakeCall {
        let mut params = serde_json::Map::new();
        if let Some(caller) = caller {
            params.insert("caller_phone".into(), json!(caller));
        }
        send_json(
            ws,
            json!({
                "event": "start",
                "start": {
                    "callSid": call_sid,
                    "streamSid": "MZ-stream",
                    "customParameters": params,
                }
            }),
        )
        .await;
        timeout(WAIT, self.calls.recv())
            .await
            .expect("engine never connected")
            .unwrap()
    }

    /// Polls until the bridge has opened a session for a fresh socket.
    async fn first_open_session(&self) -> leadline_sessions::Session {
        timeout(WAIT, async {
            loop {
                let conn = self.pool.get().unwrap();
                let mut open = list_open_sessions(&conn, Some(Channel::Voice), None).unwrap();
                if !open.is_empty() {
                    return open.remove(0);
                }
                drop(conn);
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("no session was opened")
    }

    fn only_open_session(&self) -> leadline_sessions::Session {
        let conn = self.pool.get().unwrap();
        let mut open = list_open_sessions(&conn, Some(Channel::Voice), None).unwrap();
        assert_eq!(open.len(), 1, "expected exactly one open session");
        open.remove(0)
    }

    fn ledger_entries(&self, session_id: i64) -> i64 {
        ledger::ledger_entries_for_session(&self.pool.get().unwrap(), session_id).unwrap()
    }

    async fn wait_for_ledger(&self, session_id: i64) {
        timeout(WAIT, async {
            while self.ledger_entries(session_id) == 0 {
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .expect("no ledger entry was written");
    }
}

async fn send_json(ws: &mut Telephony, value: Value) {
    ws.send(Message::Text(value.to_string().into())).await.unwrap();
}

/// Next text frame from the bridge, as JSON.
async fn next_frame(ws: &mut Telephony) -> Value {
    loop {
        let msg = timeout(WAIT, ws.next())
            .await
            .expect("no frame from bridge")
            .expect("socket ended")
            .unwrap();
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).unwrap();
        }
    }
}

/// Reads until the close frame and returns its code.
async fn close_code(ws: &mut Telephony) -> u16 {
    loop {
        match timeout(WAIT, ws.next()).await.expect("bridge never closed") {
            Some(Ok(Message::Close(frame))) => {
                return frame.map(|f| u16::from(f.code)).unwrap_or(1005);
            }
            Some(Ok(_)) => continue,
            Some(Err(_)) | None => return 1006,
        }
    }
}

impl FakeCall {
    async fn emit(&self, event: EngineEvent) {
        self.events.send(event).await.unwrap();
    }

    /// Plays a function call and returns the bridge's output for it.
    async fn call(&mut self, name: &str, arguments: Value) -> Value {
        self.next_call_id += 1;
        let call_id = format!("call-{}", self.next_call_id);
        self.emit(EngineEvent::FunctionCall {
            call_id: call_id.clone(),
            name: name.into(),
            arguments: arguments.to_string(),
        })
        .await;
        loop {
            let command = timeout(WAIT, self.commands.recv())
                .await
                .expect("no function output")
                .expect("engine handle dropped");
            if let EngineCommand::FunctionOutput { call_id: id, output } = command {
                assert_eq!(id, call_id);
                return output;
            }
        }
    }

    async fn save(&mut self, field: &str, value: &str) -> Value {
        let output = self
            .call("save_field", json!({"field_name": field, "field_value": value}))
            .await;
        assert_eq!(output["success"], true, "saving {field}: {output}");
        output
    }

    async fn save_and_confirm(&mut self, field: &str, value: &str) {
        self.save(field, value).await;
        self.save("confirmation", "yes").await;
    }

    /// Waits for the bridge to close the engine session.
    async fn wait_for_close(&mut self) {
        loop {
            match timeout(WAIT, self.commands.recv()).await.expect("engine never closed") {
                Some(EngineCommand::Close) | None => return,
                Some(_) => continue,
            }
        }
    }
}

/// Confirms the caller-ID phone, then name, ZIP, and vehicle.
async fn collect_tim_fox(call: &mut FakeCall) {
    call.save("confirmation", "yes").await;
    call.save_and_confirm("full_name", "Tim Fox").await;
    call.save_and_confirm("zip_code", "30093").await;
    call.save("vehicle", "2020 Yamaha Grizzly").await;
    let output = call.save("confirmation", "yes").await;
    assert!(output["next"].as_str().unwrap().contains("submit_lead"));
}

#[tokio::test]
async fn accepted_call_is_submitted_and_closed_after_the_goodbye() {
    let mut h = Harness::start().await;
    let (mut ws, mut call) = h.dial("?CallSid=CA100", "CA100", Some("+17205551234")).await;

    assert!(call.session.context.as_deref().unwrap().contains("caller ID"));
    assert_eq!(call.session.tools.len(), 2);
    let session = h.only_open_session();
    assert_eq!(session.session_key, "CA100");
    assert_eq!(session.from_number.as_deref(), Some("+17205551234"));

    call.emit(EngineEvent::AssistantTranscript(
        "Thank you for calling National Powersport Buyers.".into(),
    ))
    .await;
    call.emit(EngineEvent::CallerTranscript("Hi, I want to sell my ATV.".into()))
        .await;
    collect_tim_fox(&mut call).await;
    call.emit(EngineEvent::AssistantTranscript("Great, let me submit that.".into()))
        .await;

    let output = call.call("submit_lead", json!({})).await;
    assert_eq!(output["success"], true);
    assert_eq!(output["outcome"], "succeeded");
    let message = output["message"].as_str().unwrap().to_string();
    assert!(message.ends_with("Have a great day!"));

    let again = call.call("submit_lead", json!({})).await;
    assert_eq!(again["success"], false, "a second submission is refused");
    assert_eq!(h.api.calls.load(Ordering::SeqCst), 1);

    call.emit(EngineEvent::AudioDelta("AAAA".into())).await;
    let media = next_frame(&mut ws).await;
    assert_eq!(media["event"], "media");
    assert_eq!(media["streamSid"], "MZ-stream");

    call.emit(EngineEvent::AssistantTranscript(message)).await;
    call.emit(EngineEvent::AudioDelta("BBBB".into())).await;
    let tail = next_frame(&mut ws).await;
    assert_eq!(tail["event"], "media", "audio after the goodbye still plays");
    assert_eq!(tail["media"]["payload"], "BBBB");
    let mark = next_frame(&mut ws).await;
    assert_eq!(mark["event"], "mark");
    assert_eq!(close_code(&mut ws).await, 1000);
    call.wait_for_close().await;

    let conn = h.pool.get().unwrap();
    let stored = get_session(&conn, session.id).unwrap();
    assert_eq!(stored.status, SessionStatus::Closed);
    assert_eq!(h.ledger_entries(session.id), 1);

    let turns = list_turns(&conn, session.id).unwrap();
    let numbers: Vec<i64> = turns.iter().map(|t| t.turn_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(turns[1].inbound_text.as_deref(), Some("Hi, I want to sell my ATV."));
    assert!(turns[1].fields_saved.contains(&"full_name".to_string()));
}

#[tokio::test]
async fn invalid_values_come_back_with_a_reprompt() {
    let mut h = Harness::start().await;
    let (_ws, mut call) = h.dial("", "CA200", None).await;

    let output = call
        .call("save_field", json!({"field_name": "zip_code", "field_value": "12"}))
        .await;
    assert_eq!(output["success"], false);
    assert!(output["reprompt"].as_str().is_some());

    let early = call.call("submit_lead", json!({})).await;
    assert_eq!(early["success"], false);
    assert_eq!(early["next"], "What's your full name?");
    assert_eq!(h.api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn caller_media_reaches_the_engine_and_barge_in_clears_playback() {
    let mut h = Harness::start().await;
    let (mut ws, mut call) = h.dial("", "CA300", None).await;

    send_json(&mut ws, json!({"event": "media", "media": {"payload": "f39/"}})).await;
    let command = timeout(WAIT, call.commands.recv()).await.unwrap().unwrap();
    assert_eq!(command, EngineCommand::AppendAudio("f39/".into()));

    call.emit(EngineEvent::SpeechStarted).await;
    let clear = next_frame(&mut ws).await;
    assert_eq!(clear, json!({"event": "clear", "streamSid": "MZ-stream"}));
}

#[tokio::test]
async fn hang_up_after_everything_is_confirmed_still_submits() {
    let mut h = Harness::start().await;
    let (mut ws, mut call) = h.dial("", "CA400", Some("7205551234")).await;
    let session_id = h.only_open_session().id;

    collect_tim_fox(&mut call).await;
    send_json(&mut ws, json!({"event": "stop"})).await;

    h.wait_for_ledger(session_id).await;
    assert_eq!(h.api.calls.load(Ordering::SeqCst), 1);
    let conn = h.pool.get().unwrap();
    assert_eq!(get_session(&conn, session_id).unwrap().status, SessionStatus::Closed);
}

#[tokio::test]
async fn hang_up_while_the_lead_is_being_delivered_still_records_it() {
    let mut h = Harness::with_api_latency(Duration::from_millis(400)).await;
    let (mut ws, mut call) = h.dial("", "CA450", Some("7205551234")).await;
    let session_id = h.only_open_session().id;

    collect_tim_fox(&mut call).await;
    call.emit(EngineEvent::FunctionCall {
        call_id: "call-submit".into(),
        name: "submit_lead".into(),
        arguments: "{}".into(),
    })
    .await;
    timeout(WAIT, async {
        while h.api.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("delivery never started");
    send_json(&mut ws, json!({"event": "stop"})).await;

    assert_eq!(close_code(&mut ws).await, 1000);
    assert_eq!(h.ledger_entries(session_id), 1);
    assert_eq!(h.api.calls.load(Ordering::SeqCst), 1);
    let conn = h.pool.get().unwrap();
    assert_eq!(get_session(&conn, session_id).unwrap().status, SessionStatus::Closed);
}

#[tokio::test]
async fn hang_up_midway_leaves_the_session_open() {
    let mut h = Harness::start().await;
    let (mut ws, mut call) = h.dial("", "CA500", None).await;
    let session_id = h.only_open_session().id;

    call.save_and_confirm("full_name", "Tim Fox").await;
    send_json(&mut ws, json!({"event": "stop"})).await;
    call.wait_for_close().await;

    let conn = h.pool.get().unwrap();
    let stored = get_session(&conn, session_id).unwrap();
    assert!(stored.is_open());
    assert_eq!(stored.last_prompt_field.as_deref(), Some("zip_code"));
    assert_eq!(h.ledger_entries(session_id), 0);
    assert_eq!(h.api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_telephony_frame_aborts_without_submitting() {
    let mut h = Harness::start().await;
    let (mut ws, mut call) = h.dial("", "CA600", Some("7205551234")).await;
    let session_id = h.only_open_session().id;

    collect_tim_fox(&mut call).await;
    ws.send(Message::Text("{not json".to_string().into())).await.unwrap();

    assert_eq!(close_code(&mut ws).await, 1002);
    call.wait_for_close().await;
    assert_eq!(h.ledger_entries(session_id), 0);
    assert_eq!(h.api.calls.load(Ordering::SeqCst), 0);
    let conn = h.pool.get().unwrap();
    assert!(get_session(&conn, session_id).unwrap().is_open());
}

#[tokio::test]
async fn placeholder_session_is_rekeyed_in_place() {
    let mut h = Harness::start().await;
    let mut ws = h.connect("").await;
    let pending = h.first_open_session().await;
    assert!(pending.session_key.starts_with("pending:"), "{}", pending.session_key);

    let _call = h.start_stream(&mut ws, "CA700", None).await;
    let session = h.only_open_session();
    assert_eq!(session.id, pending.id);
    assert_eq!(session.session_key, "CA700");
    let conn = h.pool.get().unwrap();
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
        .unwrap();
    assert_eq!(rows, 1, "re-keying must not create a second row");
}

#[tokio::test]
async fn engine_disconnect_ends_the_call() {
    let mut h = Harness::start().await;
    let (mut ws, call) = h.dial("", "CA800", None).await;

    drop(call);
    assert_eq!(close_code(&mut ws).await, 1000);
}
