//! Session driver: resolve, connect, join, then receive and keep alive.

use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use afchat_frame::{classify_chat_event, decode_frame, encode_connect, encode_join, encode_ping};
use afchat_resolve::{BroadcastRef, ChatEndpoint, EndpointResolver};
use afchat_transport::{ChatTarget, Connection, FrameSink, FrameStream, TransportConnector};
use tokio::sync::{watch, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::chatlog::ChatLog;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::observer::{SessionObserver, StatusEvent};
use crate::state::{FailureKind, FailureReason, SessionState};

/// Why an established session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// [`SessionHandle::stop`] was called.
    Stopped,
    /// The server closed the connection.
    TransportClosed,
    /// Reading from the connection failed.
    ReceiveFailed,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stopped => "stopped",
            Self::TransportClosed => "transport closed",
            Self::ReceiveFailed => "receive failed",
        })
    }
}

/// Outcome of a session that reached `Closed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub close_reason: CloseReason,
    /// Chat messages delivered to the observer.
    pub messages: u64,
    /// Endpoint the session resolved, if it got that far.
    pub endpoint: Option<ChatEndpoint>,
    /// Chat log written by the session, if any.
    pub log_path: Option<PathBuf>,
}

struct HandleInner {
    stop_requested: AtomicBool,
    cancel: CancellationToken,
    state: watch::Sender<SessionState>,
}

/// Cloneable control handle for a running session.
///
/// Usable from any thread, including ones outside the runtime.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<HandleInner>,
}

impl SessionHandle {
    fn new() -> Self {
        let (state, _) = watch::channel(SessionState::Idle);
        Self {
            inner: Arc::new(HandleInner {
                stop_requested: AtomicBool::new(false),
                cancel: CancellationToken::new(),
                state,
            }),
        }
    }

    /// Ask the session to stop.
    ///
    /// Both loops exit at their next wait boundary, then the transport and
    /// the chat log are closed once. Returns `true` for the call that
    /// actually requested the stop; later calls are no-ops.
    pub fn stop(&self) -> bool {
        let first = !self.inner.stop_requested.swap(true, Ordering::SeqCst);
        self.inner.cancel.cancel();
        if first {
            debug!("session stop requested");
        }
        first
    }

    pub fn is_stop_requested(&self) -> bool {
        self.inner.stop_requested.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the state satisfies `predicate` and return that state.
    pub async fn wait_for(
        &self,
        mut predicate: impl FnMut(&SessionState) -> bool,
    ) -> SessionState {
        let mut rx = self.subscribe();
        let reached = match rx.wait_for(|state| predicate(state)).await {
            Ok(state) => Some(state.clone()),
            Err(_) => None,
        };
        reached.unwrap_or_else(|| self.state())
    }

    /// Wait until the session is `Closed` or `Failed`.
    pub async fn wait_terminal(&self) -> SessionState {
        self.wait_for(SessionState::is_terminal).await
    }
}

impl fmt::Debug for SessionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionHandle")
            .field("state", &self.state())
            .field("stop_requested", &self.is_stop_requested())
            .finish()
    }
}

/// One chat session against one broadcast.
///
/// A session runs once: [`ChatSession::run`] consumes it. Keep a
/// [`SessionHandle`] to stop it or watch its state.
pub struct ChatSession {
    config: SessionConfig,
    resolver: Arc<dyn EndpointResolver>,
    connector: Arc<dyn TransportConnector>,
    observer: Arc<dyn SessionObserver>,
    handle: SessionHandle,
}

impl ChatSession {
    pub fn new(
        config: SessionConfig,
        resolver: Arc<dyn EndpointResolver>,
        connector: Arc<dyn TransportConnector>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        Self {
            config,
            resolver,
            connector,
            observer,
            handle: SessionHandle::new(),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Run the session for the broadcast at `url` until it is stopped, the
    /// server closes the connection, or a setup step fails.
    ///
    /// Setup failures move the session to `Failed` and are returned as
    /// errors. Every other ending is `Closed` and yields a summary.
    pub async fn run(self, url: &str) -> Result<SessionSummary> {
        let cancel = self.handle.inner.cancel.clone();

        self.transition(SessionState::Resolving);
        let broadcast = BroadcastRef::parse(url)
            .map_err(|err| self.fail(FailureKind::InvalidUrl, err.into()))?;
        info!(%broadcast, "resolving chat endpoint");

        let endpoint = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(self.stopped_early(None, None).await),
            resolved = self.resolver.resolve(&broadcast) => {
                resolved.map_err(|err| self.fail(FailureKind::Resolution, err.into()))?
            }
        };

        let mut log = self.open_log(&endpoint.title).await;
        let log_path = log.as_ref().map(|log| log.path().to_path_buf());
        let target = endpoint.target(&broadcast);
        self.status(StatusEvent::Resolved {
            title: endpoint.title.clone(),
            broadcaster_id: endpoint.broadcaster_id.clone(),
            chat_url: target.url(),
            log_path: log_path.clone(),
        });

        let connection = match self
            .establish(&target, &endpoint.chat_channel_no, &cancel)
            .await
        {
            Ok(Some(connection)) => connection,
            Ok(None) => return Ok(self.stopped_early(Some(endpoint), log).await),
            Err((kind, err)) => {
                self.close_log(&mut log).await;
                return Err(self.fail(kind, err));
            }
        };

        self.status(StatusEvent::Joined {
            channel_no: endpoint.chat_channel_no.clone(),
        });
        self.transition(SessionState::Active);

        let Connection { sink, mut stream } = connection;
        let sink = Mutex::new(sink);
        let loops = cancel.child_token();
        let ((close_reason, messages), ()) = tokio::join!(
            self.receive_loop(stream.as_mut(), &mut log, &loops),
            self.keepalive_loop(&sink, &loops),
        );

        if close_reason == CloseReason::Stopped {
            self.transition(SessionState::Closing);
        }
        let mut sink = sink.into_inner();
        close_quietly(sink.as_mut()).await;
        drop(stream);
        self.close_log(&mut log).await;
        self.transition(SessionState::Closed);
        info!(reason = %close_reason, messages, "session closed");

        Ok(SessionSummary {
            close_reason,
            messages,
            endpoint: Some(endpoint),
            log_path,
        })
    }

    /// Connect and join. `Ok(None)` means a stop arrived first.
    async fn establish(
        &self,
        target: &ChatTarget,
        channel_no: &str,
        cancel: &CancellationToken,
    ) -> std::result::Result<Option<Connection>, (FailureKind, SessionError)> {
        self.transition(SessionState::Connecting);
        debug!(%target, "connecting");
        let mut connection = tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(None),
            connected = self.connector.connect(target) => {
                connected.map_err(|err| (FailureKind::Connect, SessionError::Connect(err)))?
            }
        };

        self.transition(SessionState::Joining);
        let joined = self.join(connection.sink.as_mut(), channel_no, cancel).await;
        match joined {
            Ok(true) => Ok(Some(connection)),
            Ok(false) => {
                close_quietly(connection.sink.as_mut()).await;
                Ok(None)
            }
            Err(err) => {
                close_quietly(connection.sink.as_mut()).await;
                Err((FailureKind::Join, err))
            }
        }
    }

    /// Send connect, wait out the grace period, send join.
    async fn join(
        &self,
        sink: &mut dyn FrameSink,
        channel_no: &str,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        let join = encode_join(channel_no).map_err(|err| SessionError::Join(err.to_string()))?;

        sink.send(&encode_connect())
            .await
            .map_err(|err| SessionError::Join(format!("connect frame: {err}")))?;
        trace!("connect frame sent");

        tokio::select! {
            biased;
            () = cancel.cancelled() => return Ok(false),
            () = tokio::time::sleep(self.config.join_grace) => {}
        }

        sink.send(&join)
            .await
            .map_err(|err| SessionError::Join(format!("join frame: {err}")))?;
        debug!(channel = channel_no, "join frame sent");
        Ok(true)
    }

    async fn receive_loop(
        &self,
        stream: &mut dyn FrameStream,
        log: &mut Option<ChatLog>,
        cancel: &CancellationToken,
    ) -> (CloseReason, u64) {
        let mut messages = 0;
        let reason = loop {
            let received = tokio::select! {
                () = cancel.cancelled() => break CloseReason::Stopped,
                received = stream.recv() => received,
            };
            match received {
                Ok(Some(raw)) => {
                    if self.handle_frame(&raw, log).await {
                        messages += 1;
                    }
                }
                Ok(None) => {
                    info!("chat server closed the connection");
                    self.status(StatusEvent::TransportClosed);
                    break CloseReason::TransportClosed;
                }
                Err(err) => {
                    warn!(error = %err, "receive failed");
                    self.status(StatusEvent::ReceiveFailed {
                        error: err.to_string(),
                    });
                    break CloseReason::ReceiveFailed;
                }
            }
        };
        cancel.cancel();
        (reason, messages)
    }

    /// Decode, classify, log and deliver one frame. Returns whether it was chat.
    async fn handle_frame(&self, raw: &[u8], log: &mut Option<ChatLog>) -> bool {
        trace!(len = raw.len(), "frame received");
        let fields = match decode_frame(raw) {
            Ok(fields) => fields,
            Err(err) => {
                warn!(error = %err, "dropping undecodable frame");
                self.status(StatusEvent::DecodeFailed {
                    error: err.to_string(),
                });
                return false;
            }
        };

        let Some(event) = classify_chat_event(&fields) else {
            trace!(fields = fields.len(), header = ?fields.header(), "control frame skipped");
            return false;
        };

        if let Some(chat_log) = log.as_mut() {
            if let Err(err) = chat_log.append(&event).await {
                warn!(error = %err, "chat log append failed");
                self.status(StatusEvent::StorageFailed {
                    error: err.to_string(),
                });
            }
        }
        self.observer.on_message(&event);
        true
    }

    /// Ping every `keepalive_interval`. A failed send ends the loop quietly;
    /// the receive loop reports the broken connection.
    async fn keepalive_loop(&self, sink: &Mutex<Box<dyn FrameSink>>, cancel: &CancellationToken) {
        let period = self.config.keepalive_interval;
        if period.is_zero() {
            cancel.cancelled().await;
            return;
        }

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let ping = encode_ping();
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            let sent = sink.lock().await.send(&ping).await;
            if let Err(err) = sent {
                debug!(error = %err, "keepalive stopped");
                break;
            }
            trace!("keepalive ping sent");
        }
    }

    async fn open_log(&self, title: &str) -> Option<ChatLog> {
        if !self.config.logging_enabled {
            return None;
        }
        let opened = match self.config.resolved_log_dir() {
            Ok(dir) => ChatLog::open(&dir, title).await,
            Err(err) => Err(err),
        };
        match opened {
            Ok(log) => Some(log),
            Err(err) => {
                warn!(error = %err, "chat log unavailable, continuing without it");
                self.status(StatusEvent::StorageFailed {
                    error: err.to_string(),
                });
                None
            }
        }
    }

    async fn close_log(&self, log: &mut Option<ChatLog>) {
        let Some(chat_log) = log.as_mut() else {
            return;
        };
        if let Err(err) = chat_log.close().await {
            warn!(error = %err, "chat log footer failed");
            self.status(StatusEvent::StorageFailed {
                error: err.to_string(),
            });
        }
    }

    async fn stopped_early(
        &self,
        endpoint: Option<ChatEndpoint>,
        mut log: Option<ChatLog>,
    ) -> SessionSummary {
        self.transition(SessionState::Closing);
        self.close_log(&mut log).await;
        self.transition(SessionState::Closed);
        info!("session stopped before joining");
        SessionSummary {
            close_reason: CloseReason::Stopped,
            messages: 0,
            endpoint,
            log_path: log.as_ref().map(|log| log.path().to_path_buf()),
        }
    }

    fn fail(&self, kind: FailureKind, error: SessionError) -> SessionError {
        warn!(kind = kind.as_str(), error = %error, "session failed");
        self.transition(SessionState::Failed(FailureReason::new(
            kind,
            error.to_string(),
        )));
        error
    }

    fn status(&self, status: StatusEvent) {
        self.observer.on_status(&status);
    }

    /// Apply a transition and announce it. Illegal transitions are dropped.
    fn transition(&self, next: SessionState) -> bool {
        let mut previous = None;
        self.handle.inner.state.send_if_modified(|current| {
            if current.can_transition_to(&next) {
                previous = Some(std::mem::replace(current, next.clone()));
                true
            } else {
                false
            }
        });

        match previous {
            Some(from) => {
                debug!(%from, to = %next, "session state changed");
                self.status(StatusEvent::StateChanged { from, to: next });
                true
            }
            None => {
                let current = self.handle.state();
                warn!(from = %current, to = %next, "illegal session transition ignored");
                debug_assert!(false, "illegal session transition {current} -> {next}");
                false
            }
        }
    }
}

async fn close_quietly(sink: &mut dyn FrameSink) {
    if let Err(err) = sink.close().await {
        debug!(error = %err, "transport close failed");
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("config", &self.config)
            .field("handle", &self.handle)
            .finish_non_exhaustive()
    }
}
