use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::grouper::{chunk_group, group_segments, SpeakerGroup};
use super::router::TranscriptRouter;
use super::segment::{Segment, SegmentStore, Upsert};
use crate::config::DisplayConfig;
use crate::error::Result;
use crate::transport::{
    MeetingRef, ServerEvent, StreamClient, StreamEvent, TranscriptPayload, WireSegment,
};

/// Per-meeting connection status surfaced to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingStatus {
    Connecting,
    Connected,
    Active,
    Completed,
    Error,
    Disconnected,
}

impl MeetingStatus {
    /// Map a server status string; unknown values are dropped by the caller.
    pub fn parse(status: &str) -> Option<Self> {
        match status {
            "connecting" => Some(Self::Connecting),
            "connected" => Some(Self::Connected),
            "active" | "in_progress" => Some(Self::Active),
            "completed" | "ended" => Some(Self::Completed),
            "error" | "failed" => Some(Self::Error),
            "disconnected" => Some(Self::Disconnected),
            _ => None,
        }
    }

    /// Statuses that force-stop transcript delivery.
    fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error)
    }
}

/// Typed events emitted upward to the UI/application layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Connected,
    Disconnected,
    TranscriptMutable {
        meeting: String,
        groups: Vec<SpeakerGroup>,
    },
    TranscriptFinalized {
        meeting: String,
        groups: Vec<SpeakerGroup>,
    },
    MeetingStatus {
        meeting: String,
        status: MeetingStatus,
    },
    Error {
        message: String,
    },
}

/// What applying one transcript batch produced.
#[derive(Debug)]
pub struct TranscriptOutcome {
    /// The full meeting transcript, grouped and chunked for display.
    pub groups: Vec<SpeakerGroup>,
    /// Set when the batch changed the meeting status (the defensive
    /// first-segments-imply-active promotion).
    pub status_change: Option<MeetingStatus>,
}

/// All live-transcript state for one meeting: the canonical segment set, the
/// focus/pin router with its review contexts, and the status machine.
pub struct ReviewSession {
    meeting: MeetingRef,
    status: MeetingStatus,
    store: SegmentStore,
    router: TranscriptRouter,
    display: DisplayConfig,
}

impl ReviewSession {
    pub fn new(meeting: MeetingRef, display: DisplayConfig) -> Self {
        let router = TranscriptRouter::new(display.show_speakers, display.max_chunk_chars);
        Self {
            meeting,
            status: MeetingStatus::Connecting,
            store: SegmentStore::new(),
            router,
            display,
        }
    }

    pub fn meeting(&self) -> &MeetingRef {
        &self.meeting
    }

    pub fn status(&self) -> MeetingStatus {
        self.status
    }

    pub fn store(&self) -> &SegmentStore {
        &self.store
    }

    pub fn router(&self) -> &TranscriptRouter {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut TranscriptRouter {
        &mut self.router
    }

    /// Apply one batch of wire segments, reconciling each revision into the
    /// canonical set and routing newly observed keys to the active context.
    ///
    /// The merge rule does not distinguish mutable from finalized events;
    /// `finalized` only flags the display groups.
    pub fn apply_transcript(
        &mut self,
        batch: Vec<WireSegment>,
        finalized: bool,
    ) -> TranscriptOutcome {
        let mut new_keys = Vec::new();
        let mut usable = 0usize;

        for wire in batch {
            let Some(segment) = Segment::from_wire(wire) else {
                continue;
            };
            usable += 1;
            let key = segment.absolute_start_time;
            match self.store.upsert(segment) {
                Upsert::Inserted => new_keys.push(key),
                Upsert::Updated => {}
                Upsert::Stale => debug!("stale revision for {} dropped", key),
            }
        }

        // Some servers never send an explicit active status; the first
        // non-empty batch is proof enough that the meeting is live.
        let mut status_change = None;
        if usable > 0
            && matches!(
                self.status,
                MeetingStatus::Connecting | MeetingStatus::Connected
            )
        {
            self.status = MeetingStatus::Active;
            status_change = Some(MeetingStatus::Active);
        }

        self.router.record_new_keys(&new_keys);
        if self.router.is_receiving() {
            self.router.render_active(&self.store);
        }

        TranscriptOutcome {
            groups: self.display_groups(!finalized),
            status_change,
        }
    }

    /// The whole meeting transcript as display groups.
    pub fn display_groups(&self, mutable: bool) -> Vec<SpeakerGroup> {
        let mut chunks = Vec::new();
        for group in group_segments(self.store.ordered(), mutable) {
            chunks.extend(chunk_group(&group, self.display.max_chunk_chars));
        }
        chunks
    }

    /// Transition the status machine. Same-value transitions are no-ops;
    /// terminal statuses force-stop delivery.
    pub fn set_status(&mut self, status: MeetingStatus) -> bool {
        if self.status == status {
            return false;
        }
        info!(
            "meeting {}: status {:?} -> {:?}",
            self.meeting.key(),
            self.status,
            status
        );
        self.status = status;
        if status.is_terminal() {
            self.router.force_stop();
        }
        true
    }

    /// Re-render the active context if delivery is on. Used after focus/pin
    /// changes and on resume, so the display always reflects the canonical
    /// set instead of a replay of deltas.
    pub fn rerender_active(&mut self) {
        if self.router.is_receiving() {
            self.router.render_active(&self.store);
        }
    }

    /// Full reset on leaving the meeting: the only operation that discards
    /// accumulated segments.
    pub fn reset(&mut self) {
        self.store.clear();
        self.router.reset();
        self.status = MeetingStatus::Disconnected;
    }
}

/// Commands from the UI/application layer.
#[derive(Debug, Clone)]
pub enum Command {
    Join(MeetingRef),
    Leave(MeetingRef),
    AddContext { identifier: String },
    Focus { row: usize },
    Blur,
    Pin { row: usize },
    Unpin,
    SmartToggle { row: usize },
    Pause,
    Resume,
    Shutdown,
}

/// Owns the stream client and all per-meeting sessions; single cooperative
/// loop, so no locking around the segment or assignment maps.
pub struct ReviewEngine {
    client: StreamClient,
    sessions: HashMap<String, ReviewSession>,
    active_meeting: Option<String>,
    display: DisplayConfig,
    commands: mpsc::Receiver<Command>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl ReviewEngine {
    pub fn new(
        client: StreamClient,
        display: DisplayConfig,
        commands: mpsc::Receiver<Command>,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            client,
            sessions: HashMap::new(),
            active_meeting: None,
            display,
            commands,
            events,
        }
    }

    pub fn session(&self, meeting: &MeetingRef) -> Option<&ReviewSession> {
        self.sessions.get(&meeting.key())
    }

    /// Drive the engine until the command channel closes or `Shutdown`
    /// arrives. Transport messages are processed one at a time, strictly in
    /// arrival order.
    pub async fn run(mut self) -> Result<()> {
        loop {
            // Keep polling the stream while a reconnect is pending, not just
            // while the socket is up; otherwise a command landing during
            // backoff would strand the recovery.
            let poll_stream =
                self.client.is_connected() || !self.client.subscriptions().is_empty();
            tokio::select! {
                maybe_cmd = self.commands.recv() => {
                    match maybe_cmd {
                        Some(Command::Shutdown) | None => break,
                        Some(cmd) => self.handle_command(cmd).await,
                    }
                }
                result = self.client.next_event(), if poll_stream => {
                    match result {
                        Ok(StreamEvent::Server(event)) => self.handle_server_event(event),
                        Ok(StreamEvent::Reconnected) => {
                            info!("stream reconnected; {} meetings resubscribed",
                                self.client.subscriptions().len());
                            self.emit(SessionEvent::Connected);
                        }
                        Ok(StreamEvent::Closed) => {
                            self.mark_all(MeetingStatus::Disconnected);
                            self.emit(SessionEvent::Disconnected);
                        }
                        Err(e) => {
                            // Terminal transport failure: surface it and mark
                            // sessions, but keep serving commands so already
                            // reconciled transcripts stay readable.
                            warn!("stream failed: {}", e);
                            self.mark_all(MeetingStatus::Error);
                            self.emit(SessionEvent::Error {
                                message: e.to_string(),
                            });
                            self.emit(SessionEvent::Disconnected);
                        }
                    }
                }
            }
        }

        self.client.disconnect().await;
        Ok(())
    }

    async fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Join(meeting) => {
                if let Err(e) = self.join(&meeting).await {
                    warn!("join {} failed: {}", meeting.key(), e);
                    self.emit(SessionEvent::Error {
                        message: e.to_string(),
                    });
                }
            }
            Command::Leave(meeting) => {
                if let Err(e) = self.leave(&meeting).await {
                    warn!("leave {} failed: {}", meeting.key(), e);
                }
            }
            Command::AddContext { identifier } => {
                self.with_active_router(|router| {
                    router.add_context(identifier);
                });
            }
            Command::Focus { row } => self.route_change(|r| r.focus(row)),
            Command::Blur => self.route_change(TranscriptRouter::blur),
            Command::Pin { row } => self.route_change(|r| r.pin(row)),
            Command::Unpin => self.route_change(TranscriptRouter::unpin),
            Command::SmartToggle { row } => self.route_change(|r| r.smart_toggle(row)),
            Command::Pause => self.route_change(TranscriptRouter::pause),
            Command::Resume => self.route_change(TranscriptRouter::resume),
            Command::Shutdown => unreachable!("handled in run loop"),
        }
    }

    async fn join(&mut self, meeting: &MeetingRef) -> Result<()> {
        let was_connected = self.client.is_connected();
        self.client.subscribe(meeting).await?;
        if !was_connected {
            self.emit(SessionEvent::Connected);
        }

        let key = meeting.key();
        self.sessions
            .entry(key.clone())
            .or_insert_with(|| ReviewSession::new(meeting.clone(), self.display.clone()));
        self.active_meeting = Some(key);
        Ok(())
    }

    async fn leave(&mut self, meeting: &MeetingRef) -> Result<()> {
        let key = meeting.key();
        if let Some(mut session) = self.sessions.remove(&key) {
            session.reset();
        }
        if self.active_meeting.as_deref() == Some(&key) {
            self.active_meeting = self.sessions.keys().next().cloned();
        }

        self.client.unsubscribe(meeting).await?;
        if !self.client.is_connected() {
            self.emit(SessionEvent::Disconnected);
        }
        Ok(())
    }

    fn handle_server_event(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::TranscriptInitial { payload }
            | ServerEvent::TranscriptMutable { payload } => {
                self.apply_payload(payload, false);
            }
            ServerEvent::TranscriptFinalized { payload } => {
                self.apply_payload(payload, true);
            }
            ServerEvent::MeetingStatus { payload } => {
                let Some(status) = MeetingStatus::parse(&payload.status) else {
                    warn!("unknown meeting status {:?}; ignored", payload.status);
                    return;
                };
                let Some(key) = self.resolve_meeting(payload.meeting.as_ref()) else {
                    return;
                };
                let changed = match self.sessions.get_mut(&key) {
                    Some(session) => session.set_status(status),
                    None => false,
                };
                if changed {
                    self.emit(SessionEvent::MeetingStatus {
                        meeting: key,
                        status,
                    });
                }
            }
            ServerEvent::Subscribed { meetings } => {
                debug!("subscription acknowledged for {} meetings", meetings.len());
            }
            ServerEvent::Unsubscribed { meetings } => {
                debug!("unsubscribe acknowledged for {} meetings", meetings.len());
            }
            ServerEvent::Error { error } => {
                self.emit(SessionEvent::Error { message: error });
            }
            // Swallowed by the transport layer.
            ServerEvent::Pong => {}
        }
    }

    fn apply_payload(&mut self, payload: TranscriptPayload, finalized: bool) {
        let Some(key) = self.resolve_meeting(payload.meeting.as_ref()) else {
            debug!("transcript batch for unknown meeting dropped");
            return;
        };
        let Some(session) = self.sessions.get_mut(&key) else {
            return;
        };

        let outcome = session.apply_transcript(payload.into_segments(), finalized);

        if let Some(status) = outcome.status_change {
            self.emit(SessionEvent::MeetingStatus {
                meeting: key.clone(),
                status,
            });
        }
        let event = if finalized {
            SessionEvent::TranscriptFinalized {
                meeting: key,
                groups: outcome.groups,
            }
        } else {
            SessionEvent::TranscriptMutable {
                meeting: key,
                groups: outcome.groups,
            }
        };
        self.emit(event);
    }

    /// Which session an event belongs to: the payload's meeting if given,
    /// else the sole subscription, else the active meeting.
    fn resolve_meeting(&self, meeting: Option<&MeetingRef>) -> Option<String> {
        if let Some(meeting) = meeting {
            return Some(meeting.key());
        }
        if self.sessions.len() == 1 {
            return self.sessions.keys().next().cloned();
        }
        self.active_meeting.clone()
    }

    fn with_active_router(&mut self, f: impl FnOnce(&mut TranscriptRouter)) {
        let Some(key) = self.active_meeting.clone() else {
            debug!("no active meeting; command ignored");
            return;
        };
        if let Some(session) = self.sessions.get_mut(&key) {
            f(session.router_mut());
        }
    }

    /// Apply a focus/pin change, then re-render the (possibly new) active
    /// target from the canonical set so resume never replays deltas.
    fn route_change(&mut self, f: impl FnOnce(&mut TranscriptRouter)) {
        let Some(key) = self.active_meeting.clone() else {
            return;
        };
        if let Some(session) = self.sessions.get_mut(&key) {
            f(session.router_mut());
            session.rerender_active();
        }
    }

    fn mark_all(&mut self, status: MeetingStatus) {
        let keys: Vec<String> = self.sessions.keys().cloned().collect();
        for key in keys {
            let changed = self
                .sessions
                .get_mut(&key)
                .map(|s| s.set_status(status))
                .unwrap_or(false);
            if changed {
                self.emit(SessionEvent::MeetingStatus {
                    meeting: key,
                    status,
                });
            }
        }
    }

    fn emit(&self, event: SessionEvent) {
        if self.events.send(event).is_err() {
            debug!("event receiver dropped");
        }
    }
}
