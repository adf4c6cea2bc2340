//! Media-stream frames exchanged with the telephony provider.

use crate::error::FrameError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frames received from the telephony leg.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event")]
pub enum InboundFrame {
    #[serde(rename = "connected")]
    Connected,
    #[serde(rename = "start")]
    Start { start: StreamStart },
    #[serde(rename = "media")]
    Media { media: InboundMedia },
    #[serde(rename = "mark")]
    Mark { mark: MarkLabel },
    #[serde(rename = "stop")]
    Stop,
    /// Events we do not act on, such as `dtmf`.
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StreamStart {
    #[serde(rename = "callSid")]
    pub call_sid: String,
    #[serde(rename = "streamSid")]
    pub stream_sid: String,
    #[serde(rename = "customParameters", default)]
    pub custom_parameters: HashMap<String, String>,
}

impl StreamStart {
    /// Caller number passed through the stream's custom parameters.
    pub fn caller_phone(&self) -> Option<&str> {
        self.custom_parameters
            .get("caller_phone")
            .map(String::as_str)
            .filter(|s| !s.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct InboundMedia {
    /// Base64 µ-law audio, passed to the engine as-is.
    pub payload: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkLabel {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutboundMedia {
    pub payload: String,
}

/// Frames sent back to the telephony leg.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event")]
pub enum OutboundFrame {
    #[serde(rename = "media")]
    Media {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        media: OutboundMedia,
    },
    #[serde(rename = "mark")]
    Mark {
        #[serde(rename = "streamSid")]
        stream_sid: String,
        mark: MarkLabel,
    },
    /// Drops audio queued for playback (barge-in).
    #[serde(rename = "clear")]
    Clear {
        #[serde(rename = "streamSid")]
        stream_sid: String,
    },
}

impl OutboundFrame {
    pub fn media(stream_sid: &str, payload: String) -> Self {
        OutboundFrame::Media {
            stream_sid: stream_sid.to_string(),
            media: OutboundMedia { payload },
        }
    }

    pub fn mark(stream_sid: &str, name: &str) -> Self {
        OutboundFrame::Mark {
            stream_sid: stream_sid.to_string(),
            mark: MarkLabel {
                name: name.to_string(),
            },
        }
    }

    pub fn clear(stream_sid: &str) -> Self {
        OutboundFrame::Clear {
            stream_sid: stream_sid.to_string(),
        }
    }

    pub fn to_json(&self) -> String {
        // Serializing these plain string structs cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

pub fn parse_inbound(text: &str) -> Result<InboundFrame, FrameError> {
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_frame_carries_call_and_caller() {
        let frame = parse_inbound(
            r#"{"event":"start","sequenceNumber":"1","streamSid":"MZ1",
                "start":{"accountSid":"AC1","streamSid":"MZ1","callSid":"CA1",
                "tracks":["inbound"],"customParameters":{"caller_phone":"+17205551234"},
                "mediaFormat":{"encoding":"audio/x-mulaw","sampleRate":8000,"channels":1}}}"#,
        )
        .unwrap();
        let InboundFrame::Start { start } = frame else {
            panic!("expected start frame");
        };
        assert_eq!(start.call_sid, "CA1");
        assert_eq!(start.stream_sid, "MZ1");
        assert_eq!(start.caller_phone(), Some("+17205551234"));
    }

    #[test]
    fn media_and_stop_frames_parse() {
        let media = parse_inbound(
            r#"{"event":"media","streamSid":"MZ1","media":{"track":"inbound","chunk":"2","timestamp":"5","payload":"f39/"}}"#,
        )
        .unwrap();
        assert_eq!(
            media,
            InboundFrame::Media {
                media: InboundMedia {
                    payload: "f39/".into()
                }
            }
        );
        assert_eq!(
            parse_inbound(r#"{"event":"stop","streamSid":"MZ1","stop":{"callSid":"CA1"}}"#)
                .unwrap(),
            InboundFrame::Stop
        );
    }

    #[test]
    fn unknown_events_are_tolerated_but_garbage_is_not() {
        assert_eq!(
            parse_inbound(r#"{"event":"dtmf","dtmf":{"digit":"1"}}"#).unwrap(),
            InboundFrame::Other
        );
        assert!(parse_inbound("not json").is_err());
        assert!(parse_inbound(r#"{"event":"media"}"#).is_err());
    }

    #[test]
    fn outbound_frames_use_stream_sid() {
        let media: serde_json::Value =
            serde_json::from_str(&OutboundFrame::media("MZ1", "AAAA".into()).to_json()).unwrap();
        assert_eq!(media["event"], "media");
        assert_eq!(media["streamSid"], "MZ1");
        assert_eq!(media["media"]["payload"], "AAAA");

        let clear: serde_json::Value =
            serde_json::from_str(&OutboundFrame::clear("MZ1").to_json()).unwrap();
        assert_eq!(clear["event"], "clear");

        let mark: serde_json::Value =
            serde_json::from_str(&OutboundFrame::mark("MZ1", "goodbye").to_json()).unwrap();
        assert_eq!(mark["mark"]["name"], "goodbye");
    }
}
