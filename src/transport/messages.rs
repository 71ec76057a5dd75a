use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A meeting addressed by platform and the platform's own meeting id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeetingRef {
    pub platform: String,
    #[serde(alias = "native_meeting_id")]
    pub native_id: String,
}

impl MeetingRef {
    pub fn new(platform: impl Into<String>, native_id: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            native_id: native_id.into(),
        }
    }

    /// Stable key used to index per-meeting state.
    pub fn key(&self) -> String {
        format!("{}/{}", self.platform, self.native_id)
    }
}

/// Outgoing meeting reference. Older gateway builds validate `native_id`,
/// newer ones `native_meeting_id`; sending both satisfies either.
#[derive(Debug, Serialize)]
struct MeetingRequestRef<'a> {
    platform: &'a str,
    native_id: &'a str,
    native_meeting_id: &'a str,
}

impl<'a> From<&'a MeetingRef> for MeetingRequestRef<'a> {
    fn from(meeting: &'a MeetingRef) -> Self {
        Self {
            platform: &meeting.platform,
            native_id: &meeting.native_id,
            native_meeting_id: &meeting.native_id,
        }
    }
}

/// Client-to-server request frame.
#[derive(Debug, Serialize)]
pub struct ClientRequest<'a> {
    action: &'static str,
    meetings: Vec<MeetingRequestRef<'a>>,
}

impl<'a> ClientRequest<'a> {
    pub fn subscribe(meeting: &'a MeetingRef) -> Self {
        Self {
            action: "subscribe",
            meetings: vec![meeting.into()],
        }
    }

    pub fn unsubscribe(meeting: &'a MeetingRef) -> Self {
        Self {
            action: "unsubscribe",
            meetings: vec![meeting.into()],
        }
    }

    pub fn to_json(&self) -> String {
        // Serialization of a struct of strings cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Transcript segment as it appears on the wire. Timestamps and text are all
/// optional here; anything unusable is filtered before reconciliation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireSegment {
    pub id: Option<String>,
    pub text: Option<String>,
    #[serde(alias = "start_time")]
    pub absolute_start_time: Option<DateTime<Utc>>,
    #[serde(alias = "end_time")]
    pub absolute_end_time: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub speaker: Option<String>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptPayload {
    pub meeting: Option<MeetingRef>,
    #[serde(default)]
    pub segments: Vec<WireSegment>,
    /// Some server builds deliver single-segment revisions under `segment`.
    pub segment: Option<WireSegment>,
}

impl TranscriptPayload {
    pub fn into_segments(self) -> Vec<WireSegment> {
        let mut segments = self.segments;
        if let Some(segment) = self.segment {
            segments.push(segment);
        }
        segments
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusPayload {
    pub meeting: Option<MeetingRef>,
    pub status: String,
}

/// Typed server-to-client events.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "transcript.initial")]
    TranscriptInitial { payload: TranscriptPayload },
    #[serde(rename = "transcript.mutable")]
    TranscriptMutable { payload: TranscriptPayload },
    #[serde(rename = "transcript.finalized")]
    TranscriptFinalized { payload: TranscriptPayload },
    #[serde(rename = "meeting.status")]
    MeetingStatus { payload: StatusPayload },
    #[serde(rename = "subscribed")]
    Subscribed {
        #[serde(default)]
        meetings: Vec<MeetingRef>,
    },
    #[serde(rename = "unsubscribed")]
    Unsubscribed {
        #[serde(default)]
        meetings: Vec<MeetingRef>,
    },
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error { error: String },
}

/// Parse one text frame into a typed event.
pub fn parse_event(text: &str) -> Result<ServerEvent> {
    serde_json::from_str(text).map_err(|e| Error::Protocol(e.to_string()))
}
