use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

use super::backoff::Backoff;
use super::messages::{parse_event, ClientRequest, MeetingRef, ServerEvent};
use crate::config::StreamConfig;
use crate::error::{Error, Result};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events surfaced by the streaming client to the engine loop.
#[derive(Debug)]
pub enum StreamEvent {
    /// A parsed server event.
    Server(ServerEvent),
    /// The connection dropped and was re-established; all tracked meetings
    /// have been resubscribed.
    Reconnected,
    /// The connection is closed and no subscriptions remain.
    Closed,
}

/// An in-progress reconnection. Lives on the client rather than inside the
/// `next_event` future so that a caller dropping that future (a lost select
/// race) cannot lose the attempt: the next poll resumes the same backoff
/// schedule and deadline.
#[derive(Debug)]
struct ReconnectState {
    backoff: Backoff,
    /// Deadline of the pending backoff sleep; `None` once the sleep has
    /// completed and the dial is due.
    resume_at: Option<Instant>,
}

/// Owns the single streaming connection to the transcription gateway.
///
/// Subscribe/unsubscribe effects are asynchronous: the server confirms with
/// `subscribed`/`unsubscribed` events, so callers must not assume success
/// before an ack arrives or a grace period elapses.
pub struct StreamClient {
    config: StreamConfig,
    ws: Option<WsStream>,
    subscriptions: Vec<MeetingRef>,
    reconnect: Option<ReconnectState>,
    /// Set when a reconnect has dialed successfully but the tracked meetings
    /// have not all been resubscribed yet. Survives cancellation; resending
    /// a subscribe is harmless.
    pending_resubscribe: bool,
}

impl StreamClient {
    pub fn new(config: StreamConfig) -> Self {
        Self {
            config,
            ws: None,
            subscriptions: Vec::new(),
            reconnect: None,
            pending_resubscribe: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.ws.is_some()
    }

    /// Meetings this client currently tracks.
    pub fn subscriptions(&self) -> &[MeetingRef] {
        &self.subscriptions
    }

    /// Open the shared connection. Idempotent if already open.
    pub async fn connect(&mut self) -> Result<()> {
        if self.ws.is_some() {
            debug!("connect: already connected");
            return Ok(());
        }

        let ws = Self::open(&self.config).await?;
        info!("connected to {}", self.config.url);
        self.ws = Some(ws);
        Ok(())
    }

    async fn open(config: &StreamConfig) -> Result<WsStream> {
        let timeout = config.connect_timeout();
        match tokio::time::timeout(timeout, connect_async(config.url.as_str())).await {
            Ok(Ok((ws, _response))) => Ok(ws),
            Ok(Err(e)) => Err(Error::Transport(e)),
            Err(_) => Err(Error::ConnectionTimeout(timeout)),
        }
    }

    /// Subscribe to a meeting's transcript channel, connecting first if
    /// needed.
    pub async fn subscribe(&mut self, meeting: &MeetingRef) -> Result<()> {
        self.connect().await?;

        let request = ClientRequest::subscribe(meeting).to_json();
        self.send(request)
            .await
            .map_err(|e| Error::Subscription(e.to_string()))?;

        if !self.subscriptions.contains(meeting) {
            self.subscriptions.push(meeting.clone());
        }
        info!("subscribe requested for {}", meeting.key());
        Ok(())
    }

    /// Unsubscribe from a meeting. Dropping the last subscription closes the
    /// connection so we do not hold an idle socket open.
    pub async fn unsubscribe(&mut self, meeting: &MeetingRef) -> Result<()> {
        self.subscriptions.retain(|m| m != meeting);

        if self.ws.is_some() {
            let request = ClientRequest::unsubscribe(meeting).to_json();
            // Fire-and-forget: a failed unsubscribe on a dying socket is not
            // worth surfacing.
            if let Err(e) = self.send(request).await {
                warn!("unsubscribe send failed for {}: {}", meeting.key(), e);
            }
        }
        info!("unsubscribe requested for {}", meeting.key());

        if self.subscriptions.is_empty() {
            self.disconnect().await;
        }
        Ok(())
    }

    /// Close the connection and forget all subscriptions.
    pub async fn disconnect(&mut self) {
        self.subscriptions.clear();
        self.reconnect = None;
        self.pending_resubscribe = false;
        if let Some(mut ws) = self.ws.take() {
            if let Err(e) = ws.close(None).await {
                debug!("close handshake failed: {}", e);
            }
            info!("disconnected");
        }
    }

    async fn send(&mut self, text: String) -> Result<()> {
        let ws = self.ws.as_mut().ok_or_else(|| {
            Error::Subscription("not connected".to_string())
        })?;
        ws.send(Message::Text(text)).await?;
        Ok(())
    }

    /// Read the next event from the stream.
    ///
    /// Malformed frames are logged and skipped. `pong` frames are
    /// acknowledged silently; we never initiate pings of our own. An
    /// unexpected close while subscriptions remain triggers reconnection
    /// with exponential backoff; past the attempt ceiling the failure is
    /// terminal. This method is cancel-safe: dropping the returned future
    /// mid-recovery parks the backoff state on the client, and the next
    /// call picks it up.
    pub async fn next_event(&mut self) -> Result<StreamEvent> {
        loop {
            if self.ws.is_none() {
                if self.subscriptions.is_empty() {
                    return Ok(StreamEvent::Closed);
                }
                self.reconnect().await?;
                // Falls through to the resubscribe step.
            }

            if self.pending_resubscribe {
                self.resubscribe_all().await;
                self.pending_resubscribe = false;
                return Ok(StreamEvent::Reconnected);
            }

            let ws = match self.ws.as_mut() {
                Some(ws) => ws,
                None => continue,
            };

            match ws.next().await {
                Some(Ok(Message::Text(text))) => match parse_event(&text) {
                    Ok(ServerEvent::Pong) => {
                        debug!("pong");
                    }
                    Ok(ServerEvent::Error { error }) if is_benign_validation(&error) => {
                        // Known server quirk; classify and swallow it.
                        let quirk = Error::ServerValidation(error);
                        debug!("swallowing {}", quirk);
                    }
                    Ok(event) => return Ok(StreamEvent::Server(event)),
                    Err(e) => {
                        warn!("dropping malformed frame: {}", e);
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    debug!("server closed the connection: {:?}", frame);
                    self.ws = None;
                }
                Some(Ok(_)) => {
                    // Binary/ping frames carry nothing for us.
                }
                Some(Err(e)) => {
                    warn!("transport error: {}", e);
                    self.ws = None;
                }
                None => {
                    self.ws = None;
                }
            }
        }
    }

    /// Drive the pending reconnection one step at a time: sleep out the
    /// current backoff deadline, then dial. On success the tracked meetings
    /// are flagged for resubscription. Past the attempt ceiling the failure
    /// is terminal: subscriptions are dropped so a later poll reports
    /// `Closed` instead of silently starting a fresh retry cycle.
    async fn reconnect(&mut self) -> Result<()> {
        if self.reconnect.is_none() {
            let mut backoff = Backoff::new(
                self.config.backoff_base(),
                self.config.backoff_max_delay(),
                self.config.max_reconnect_attempts,
            );
            match backoff.next_delay() {
                Some(delay) => {
                    self.reconnect = Some(ReconnectState {
                        backoff,
                        resume_at: Some(Instant::now() + delay),
                    });
                }
                None => {
                    self.subscriptions.clear();
                    return Err(Error::ReconnectExhausted { attempts: 0 });
                }
            }
        }

        loop {
            if let Some(deadline) = self.reconnect.as_ref().and_then(|s| s.resume_at) {
                tokio::time::sleep_until(deadline).await;
                if let Some(state) = self.reconnect.as_mut() {
                    state.resume_at = None;
                }
            }

            match Self::open(&self.config).await {
                Ok(ws) => {
                    self.reconnect = None;
                    self.ws = Some(ws);
                    self.pending_resubscribe = true;
                    info!("reconnected to {}", self.config.url);
                    return Ok(());
                }
                Err(e) => {
                    let scheduled = self.reconnect.as_mut().and_then(|state| {
                        state.backoff.next_delay().map(|delay| {
                            state.resume_at = Some(Instant::now() + delay);
                            delay
                        })
                    });
                    match scheduled {
                        Some(delay) => {
                            warn!("reconnect failed, retrying in {:?}: {}", delay, e);
                        }
                        None => {
                            let attempts = self
                                .reconnect
                                .take()
                                .map(|s| s.backoff.attempts())
                                .unwrap_or(0);
                            self.subscriptions.clear();
                            warn!("reconnect failed terminally after {} attempts: {}", attempts, e);
                            return Err(Error::ReconnectExhausted { attempts });
                        }
                    }
                }
            }
        }
    }

    async fn resubscribe_all(&mut self) {
        let meetings = self.subscriptions.clone();
        for meeting in &meetings {
            let request = ClientRequest::subscribe(meeting).to_json();
            if let Err(e) = self.send(request).await {
                warn!("resubscribe failed for {}: {}", meeting.key(), e);
            } else {
                info!("resubscribed to {}", meeting.key());
            }
        }
    }
}

/// The gateway is known to reject certain unsubscribe payloads with a
/// validation error that is harmless to us.
fn is_benign_validation(message: &str) -> bool {
    let message = message.to_ascii_lowercase();
    message.contains("invalid") && message.contains("unsubscribe")
}
