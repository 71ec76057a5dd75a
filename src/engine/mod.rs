//! Live transcript engine
//!
//! Data flows one way: transport events are reconciled into a canonical
//! per-meeting segment set, grouped by speaker for display, and routed to
//! exactly one active review context. Everything here is synchronous state
//! manipulation; the only suspension points live in the transport layer.

pub mod grouper;
pub mod router;
pub mod segment;
pub mod session;

pub use grouper::{chunk_group, clean_text, group_segments, SpeakerGroup, MAX_CHUNK_CHARS};
pub use router::{FocusState, ReviewContext, TranscriptRouter};
pub use segment::{Segment, SegmentStore, Upsert};
pub use session::{
    Command, MeetingStatus, ReviewEngine, ReviewSession, SessionEvent, TranscriptOutcome,
};
