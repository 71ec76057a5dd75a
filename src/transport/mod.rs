pub mod backoff;
pub mod client;
pub mod messages;

pub use backoff::Backoff;
pub use client::{StreamClient, StreamEvent};
pub use messages::{
    ClientRequest, MeetingRef, ServerEvent, StatusPayload, TranscriptPayload, WireSegment,
};
