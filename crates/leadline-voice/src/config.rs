use serde::Deserialize;
use std::fmt;
use std::time::Duration;

fn default_url() -> String {
    "wss://api.openai.com/v1/realtime".to_string()
}

fn default_model() -> String {
    "gpt-4o-realtime-preview-2024-10-01".to_string()
}

fn default_voice() -> String {
    "alloy".to_string()
}

fn default_transcription_model() -> String {
    "whisper-1".to_string()
}

fn default_vad_threshold() -> f32 {
    0.5
}

fn default_prefix_padding_ms() -> u32 {
    300
}

fn default_silence_duration_ms() -> u32 {
    500
}

fn default_close_timeout_ms() -> u64 {
    2_000
}

/// Settings for the realtime speech engine.
#[derive(Clone, Deserialize)]
pub struct RealtimeConfig {
    #[serde(default = "default_url")]
    pub url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_voice")]
    pub voice: String,
    #[serde(default = "default_transcription_model")]
    pub transcription_model: String,
    /// Server VAD activation threshold, 0.0 to 1.0.
    #[serde(default = "default_vad_threshold")]
    pub vad_threshold: f32,
    #[serde(default = "default_prefix_padding_ms")]
    pub prefix_padding_ms: u32,
    #[serde(default = "default_silence_duration_ms")]
    pub silence_duration_ms: u32,
    /// How long teardown waits for the engine to acknowledge a close.
    #[serde(default = "default_close_timeout_ms")]
    pub close_timeout_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            model: default_model(),
            api_key: String::new(),
            voice: default_voice(),
            transcription_model: default_transcription_model(),
            vad_threshold: default_vad_threshold(),
            prefix_padding_ms: default_prefix_padding_ms(),
            silence_duration_ms: default_silence_duration_ms(),
            close_timeout_ms: default_close_timeout_ms(),
        }
    }
}

impl RealtimeConfig {
    pub fn close_timeout(&self) -> Duration {
        Duration::from_millis(self.close_timeout_ms)
    }
}

impl fmt::Debug for RealtimeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .field("voice", &self.voice)
            .field("transcription_model", &self.transcription_model)
            .field("vad_threshold", &self.vad_threshold)
            .field("prefix_padding_ms", &self.prefix_padding_ms)
            .field("silence_duration_ms", &self.silence_duration_ms)
            .field("close_timeout_ms", &self.close_timeout_ms)
            .finish()
    }
}
