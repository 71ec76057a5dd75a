pub mod bot;
pub mod config;
pub mod engine;
pub mod error;
pub mod transport;

pub use bot::{BotClient, BotLifecycle, BotStatus};
pub use config::{BotConfig, Config, DisplayConfig, StreamConfig};
pub use engine::{
    Command, FocusState, MeetingStatus, ReviewContext, ReviewEngine, ReviewSession, Segment,
    SegmentStore, SessionEvent, SpeakerGroup, TranscriptRouter, Upsert,
};
pub use error::{Error, Result};
pub use transport::{Backoff, MeetingRef, ServerEvent, StreamClient, StreamEvent, WireSegment};
