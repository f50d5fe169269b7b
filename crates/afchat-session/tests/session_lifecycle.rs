use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use afchat_frame::{encode_connect, encode_join, encode_ping};
use afchat_resolve::{BroadcastRef, ChatEndpoint, EndpointResolver, ResolutionError};
use afchat_session::{
    ChannelObserver, ChatSession, CloseReason, FailureKind, SessionConfig, SessionError,
    SessionEvent, SessionState, StatusEvent,
};
use afchat_transport::memory::{self, MemoryConnector};
use afchat_transport::{ChatTarget, Connection, FrameSink, TransportConnector, TransportError};
use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

const URL: &str = "https://play.afreecatv.com/bjFoo/12345";
const WAIT: Duration = Duration::from_secs(5);

const ACK_FRAME: &[u8] = b"\x0c-1\x0cuser0\x0c\x0c\x0c\x0c\x0cnick0";
const CHAT_FRAME: &[u8] = b"\x0cMSGONE\x0cuser1\x0c\x0c\x0c\x0cnickA";
const SECOND_CHAT_FRAME: &[u8] = b"\x0cMSGTWO\x0cuser2\x0c\x0c\x0c\x0cnickB";

struct StubResolver {
    endpoint: Option<ChatEndpoint>,
    calls: AtomicUsize,
}

impl StubResolver {
    fn live() -> Arc<Self> {
        Arc::new(Self {
            endpoint: Some(ChatEndpoint {
                chat_domain: "chat.local".to_string(),
                chat_channel_no: "4242".to_string(),
                title_token: "ftk".to_string(),
                title: "Test: show/1".to_string(),
                broadcaster_id: "bjfoo".to_string(),
                chat_port: 9091,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    fn offline() -> Arc<Self> {
        Arc::new(Self {
            endpoint: None,
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EndpointResolver for StubResolver {
    async fn resolve(&self, _broadcast: &BroadcastRef) -> afchat_resolve::Result<ChatEndpoint> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoint.clone().ok_or_else(|| {
            ResolutionError::MalformedResponse("missing CHANNEL object".to_string())
        })
    }
}

/// Wraps a memory connection whose sink refuses to close.
struct StubbornCloseConnector(MemoryConnector);

struct StubbornSink(Box<dyn FrameSink>);

#[async_trait]
impl FrameSink for StubbornSink {
    async fn send(&mut self, frame: &[u8]) -> afchat_transport::Result<()> {
        self.0.send(frame).await
    }

    async fn close(&mut self) -> afchat_transport::Result<()> {
        Err(TransportError::Shutdown)
    }
}

#[async_trait]
impl TransportConnector for StubbornCloseConnector {
    async fn connect(&self, target: &ChatTarget) -> afchat_transport::Result<Connection> {
        let Connection { sink, stream } = self.0.connect(target).await?;
        Ok(Connection {
            sink: Box::new(StubbornSink(sink)),
            stream,
        })
    }
}

fn config(dir: &Path) -> SessionConfig {
    SessionConfig::default()
        .with_join_grace(Duration::from_millis(10))
        .with_keepalive_interval(Duration::from_secs(3600))
        .with_log_dir(dir)
}

fn session(
    config: SessionConfig,
    resolver: Arc<StubResolver>,
    connector: MemoryConnector,
) -> (ChatSession, UnboundedReceiver<SessionEvent>) {
    let (observer, events) = ChannelObserver::new();
    let session = ChatSession::new(config, resolver, Arc::new(connector), Arc::new(observer));
    (session, events)
}

async fn next_message(events: &mut UnboundedReceiver<SessionEvent>) -> afchat_frame::ChatEvent {
    loop {
        match timeout(WAIT, events.recv()).await.unwrap() {
            Some(SessionEvent::Message(event)) => return event,
            Some(SessionEvent::Status(_)) => continue,
            None => panic!("session ended without a message"),
        }
    }
}

async fn drain(mut events: UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut seen = Vec::new();
    while let Some(event) = events.recv().await {
        seen.push(event);
    }
    seen
}

fn states(events: &[SessionEvent]) -> Vec<SessionState> {
    events
        .iter()
        .filter_map(|event| match event {
            SessionEvent::Status(StatusEvent::StateChanged { to, .. }) => Some(to.clone()),
            _ => None,
        })
        .collect()
}

fn single_log(dir: &Path) -> String {
    let entries: Vec<_> = std::fs::read_dir(dir).unwrap().collect();
    assert_eq!(entries.len(), 1, "expected exactly one log file");
    std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap()
}

#[tokio::test]
async fn chat_is_logged_and_delivered() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let (session, mut events) = session(config(dir.path()), StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    assert_eq!(peer.next_sent().await.unwrap(), encode_connect());
    assert_eq!(peer.next_sent().await.unwrap(), encode_join("4242").unwrap());
    timeout(WAIT, handle.wait_for(SessionState::is_active))
        .await
        .unwrap();

    assert!(peer.push(ACK_FRAME));
    assert!(peer.push(CHAT_FRAME));
    let message = next_message(&mut events).await;
    assert_eq!(message.comment, "MSGONE");
    assert_eq!(message.user_id, "user1");
    assert_eq!(message.nickname, "nickA");

    peer.close();
    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.close_reason, CloseReason::TransportClosed);
    assert_eq!(summary.messages, 1);
    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(peer.close_count(), 1);
    assert_eq!(
        peer.targets()[0].url(),
        "wss://chat.local:9091/Websocket/bjFoo"
    );

    let log = single_log(dir.path());
    assert!(log.starts_with("Broadcast title: Test: show/1\nRecording started: "));
    assert_eq!(log.matches("nickA[user1] - MSGONE\n").count(), 1);
    assert!(!log.contains("nick0"));
    assert_eq!(log.matches("Recording ended: ").count(), 1);
    assert!(summary.log_path.unwrap().starts_with(dir.path()));

    let rest = drain(events).await;
    assert!(rest
        .iter()
        .any(|event| matches!(event, SessionEvent::Status(StatusEvent::TransportClosed))));
    assert!(!rest
        .iter()
        .any(|event| matches!(event, SessionEvent::Message(_))));
}

#[tokio::test]
async fn lifecycle_states_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let (session, events) = session(config(dir.path()), StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    timeout(WAIT, handle.wait_for(SessionState::is_active))
        .await
        .unwrap();
    peer.close();
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();

    assert_eq!(
        states(&drain(events).await),
        vec![
            SessionState::Resolving,
            SessionState::Connecting,
            SessionState::Joining,
            SessionState::Active,
            SessionState::Closed,
        ]
    );
}

#[tokio::test]
async fn stop_twice_writes_one_footer() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let (session, events) = session(config(dir.path()), StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    timeout(WAIT, handle.wait_for(SessionState::is_active))
        .await
        .unwrap();
    assert!(handle.stop());
    assert!(!handle.stop());

    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.close_reason, CloseReason::Stopped);
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(!handle.stop());
    assert_eq!(handle.state(), SessionState::Closed);

    assert_eq!(peer.close_count(), 1);
    assert_eq!(peer.next_sent().await.unwrap(), encode_connect());
    assert_eq!(peer.next_sent().await.unwrap(), encode_join("4242").unwrap());
    assert!(peer.next_sent().await.is_none());

    let log = single_log(dir.path());
    assert_eq!(log.matches("Recording ended: ").count(), 1);

    let states = states(&drain(events).await);
    assert_eq!(
        &states[states.len() - 2..],
        &[SessionState::Closing, SessionState::Closed]
    );
}

#[tokio::test]
async fn stop_from_another_thread() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, _peer) = memory::pair();
    let (session, _events) = session(config(dir.path()), StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    timeout(WAIT, handle.wait_for(SessionState::is_active))
        .await
        .unwrap();
    let remote = handle.clone();
    let stopped = std::thread::spawn(move || remote.stop()).join().unwrap();
    assert!(stopped);

    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.close_reason, CloseReason::Stopped);
    assert_eq!(handle.wait_terminal().await, SessionState::Closed);
}

#[tokio::test]
async fn stop_during_join_grace() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let config = config(dir.path()).with_join_grace(Duration::from_secs(3600));
    let (session, _events) = session(config, StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    assert_eq!(peer.next_sent().await.unwrap(), encode_connect());
    handle.stop();

    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.close_reason, CloseReason::Stopped);
    assert_eq!(summary.messages, 0);
    assert!(peer.next_sent().await.is_none());
    assert_eq!(peer.close_count(), 1);
    assert_eq!(handle.state(), SessionState::Closed);
    assert_eq!(single_log(dir.path()).matches("Recording ended: ").count(), 1);
}

#[tokio::test]
async fn stop_before_run_never_resolves() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = StubResolver::live();
    let (connector, peer) = memory::pair();
    let (session, _events) = session(config(dir.path()), Arc::clone(&resolver), connector);
    session.handle().stop();

    let summary = session.run(URL).await.unwrap();
    assert_eq!(summary.close_reason, CloseReason::Stopped);
    assert!(summary.endpoint.is_none());
    assert_eq!(resolver.calls(), 0);
    assert_eq!(peer.connect_count(), 0);
}

#[tokio::test]
async fn malformed_resolution_never_connects() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = StubResolver::offline();
    let (connector, peer) = memory::pair();
    let (session, events) = session(config(dir.path()), Arc::clone(&resolver), connector);
    let handle = session.handle();

    let err = session.run(URL).await.unwrap_err();
    assert!(matches!(err, SessionError::Resolution(_)));
    assert_eq!(resolver.calls(), 1);
    assert_eq!(peer.connect_count(), 0);
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());

    match handle.state() {
        SessionState::Failed(reason) => assert_eq!(reason.kind, FailureKind::Resolution),
        other => panic!("unexpected state {other}"),
    }
    let states = states(&drain(events).await);
    assert!(matches!(states.last(), Some(SessionState::Failed(_))));
}

#[tokio::test]
async fn invalid_url_fails_before_resolving() {
    let dir = tempfile::tempdir().unwrap();
    let resolver = StubResolver::live();
    let (connector, peer) = memory::pair();
    let (session, _events) = session(config(dir.path()), Arc::clone(&resolver), connector);
    let handle = session.handle();

    let err = session.run("https://x.com/bjFoo").await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidUrl(_)));
    assert_eq!(resolver.calls(), 0);
    assert_eq!(peer.connect_count(), 0);
    assert!(matches!(
        handle.state(),
        SessionState::Failed(ref reason) if reason.kind == FailureKind::InvalidUrl
    ));
}

#[tokio::test]
async fn refused_connection_fails_session() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, peer) = MemoryConnector::refusing();
    let (session, events) = session(config(dir.path()), StubResolver::live(), connector);
    let handle = session.handle();

    let err = session.run(URL).await.unwrap_err();
    assert!(matches!(err, SessionError::Connect(_)));
    assert_eq!(peer.connect_count(), 1);
    assert!(matches!(
        handle.state(),
        SessionState::Failed(ref reason) if reason.kind == FailureKind::Connect
    ));

    let events = drain(events).await;
    let failure = events
        .iter()
        .find_map(|event| match event {
            SessionEvent::Status(status @ StatusEvent::StateChanged { to: SessionState::Failed(_), .. }) => {
                Some(status.to_string())
            }
            _ => None,
        })
        .unwrap();
    assert!(failure.starts_with("Session failed: connect error"));
}

#[tokio::test]
async fn keepalive_pings_while_active() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let config = config(dir.path()).with_keepalive_interval(Duration::from_millis(20));
    let (session, _events) = session(config, StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    assert_eq!(peer.next_sent().await.unwrap(), encode_connect());
    assert_eq!(peer.next_sent().await.unwrap(), encode_join("4242").unwrap());
    for _ in 0..2 {
        let ping = timeout(WAIT, peer.next_sent()).await.unwrap().unwrap();
        assert_eq!(ping, encode_ping());
    }

    handle.stop();
    timeout(WAIT, task).await.unwrap().unwrap().unwrap();
}

#[tokio::test]
async fn keepalive_failure_is_silent() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let config = config(dir.path()).with_keepalive_interval(Duration::from_millis(20));
    let (session, mut events) = session(config, StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    loop {
        match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            SessionEvent::Status(StatusEvent::StateChanged {
                to: SessionState::Active,
                ..
            }) => break,
            SessionEvent::Status(_) => {}
            SessionEvent::Message(event) => panic!("unexpected message {event}"),
        }
    }

    peer.stop_reading();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(handle.state(), SessionState::Active);
    assert!(events.try_recv().is_err(), "keepalive failure was reported");

    assert!(peer.push(CHAT_FRAME));
    match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
        SessionEvent::Message(event) => assert_eq!(event.comment, "MSGONE"),
        SessionEvent::Status(status) => panic!("unexpected status {status}"),
    }

    peer.close();
    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.close_reason, CloseReason::TransportClosed);
    assert_eq!(summary.messages, 1);

    let rest = drain(events).await;
    assert!(rest.iter().all(|event| matches!(
        event,
        SessionEvent::Status(StatusEvent::TransportClosed | StatusEvent::StateChanged { .. })
    )));
    assert_eq!(states(&rest), vec![SessionState::Closed]);
}

#[tokio::test]
async fn close_failure_still_finishes_teardown() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let (observer, events) = ChannelObserver::new();
    let session = ChatSession::new(
        config(dir.path()),
        StubResolver::live(),
        Arc::new(StubbornCloseConnector(connector)),
        Arc::new(observer),
    );
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    assert_eq!(peer.next_sent().await.unwrap(), encode_connect());
    timeout(WAIT, handle.wait_for(SessionState::is_active))
        .await
        .unwrap();
    handle.stop();

    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.close_reason, CloseReason::Stopped);
    assert_eq!(handle.state(), SessionState::Closed);
    assert!(single_log(dir.path()).contains("Recording ended: "));

    let seen = drain(events).await;
    assert!(seen
        .iter()
        .all(|event| !matches!(event, SessionEvent::Status(StatusEvent::ReceiveFailed { .. }))));
}

#[tokio::test]
async fn undecodable_frame_is_dropped() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let (session, mut events) = session(config(dir.path()), StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    timeout(WAIT, handle.wait_for(SessionState::is_active))
        .await
        .unwrap();
    assert!(peer.push(&b"\x0c\xff\xfe\x0cuser\x0c\x0c\x0c\x0c\x0cnick"[..]));
    assert!(peer.push(SECOND_CHAT_FRAME));

    let mut decode_failures = 0;
    let message = loop {
        match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            SessionEvent::Status(StatusEvent::DecodeFailed { .. }) => decode_failures += 1,
            SessionEvent::Status(_) => {}
            SessionEvent::Message(event) => break event,
        }
    };
    assert_eq!(decode_failures, 1);
    assert_eq!(message.comment, "MSGTWO");
    assert_eq!(handle.state(), SessionState::Active);

    peer.close();
    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert_eq!(summary.messages, 1);
}

#[tokio::test]
async fn storage_failure_does_not_stop_chat() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("not-a-dir");
    std::fs::write(&blocker, b"x").unwrap();

    let (connector, mut peer) = memory::pair();
    let config = config(dir.path()).with_log_dir(blocker.join("logs"));
    let (session, mut events) = session(config, StubResolver::live(), connector);
    let handle = session.handle();
    let task = tokio::spawn(session.run(URL));

    timeout(WAIT, handle.wait_for(SessionState::is_active))
        .await
        .unwrap();
    assert!(peer.push(CHAT_FRAME));

    let mut storage_failed = false;
    loop {
        match timeout(WAIT, events.recv()).await.unwrap().unwrap() {
            SessionEvent::Status(StatusEvent::StorageFailed { .. }) => storage_failed = true,
            SessionEvent::Status(_) => {}
            SessionEvent::Message(event) => {
                assert_eq!(event.comment, "MSGONE");
                break;
            }
        }
    }
    assert!(storage_failed);

    peer.close();
    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert!(summary.log_path.is_none());
    assert_eq!(summary.messages, 1);
}

#[tokio::test]
async fn logging_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let (connector, mut peer) = memory::pair();
    let config = config(dir.path()).without_logging();
    let (session, mut events) = session(config, StubResolver::live(), connector);
    let task = tokio::spawn(session.run(URL));

    assert_eq!(peer.next_sent().await.unwrap(), encode_connect());
    assert_eq!(peer.next_sent().await.unwrap(), encode_join("4242").unwrap());
    assert!(peer.push(CHAT_FRAME));
    next_message(&mut events).await;
    peer.close();

    let summary = timeout(WAIT, task).await.unwrap().unwrap().unwrap();
    assert!(summary.log_path.is_none());
    assert!(std::fs::read_dir(dir.path()).unwrap().next().is_none());
}

#[tokio::test]
async fn sessions_are_independent() {
    let dir = tempfile::tempdir().unwrap();
    let (first_connector, mut first_peer) = memory::pair();
    let (second_connector, mut second_peer) = memory::pair();
    let (first, mut first_events) =
        session(config(&dir.path().join("a")), StubResolver::live(), first_connector);
    let (second, _second_events) =
        session(config(&dir.path().join("b")), StubResolver::live(), second_connector);
    let first_handle = first.handle();
    let second_handle = second.handle();
    let first_task = tokio::spawn(first.run(URL));
    let second_task = tokio::spawn(second.run(URL));

    timeout(WAIT, first_handle.wait_for(SessionState::is_active))
        .await
        .unwrap();
    timeout(WAIT, second_handle.wait_for(SessionState::is_active))
        .await
        .unwrap();

    second_handle.stop();
    timeout(WAIT, second_task).await.unwrap().unwrap().unwrap();
    assert_eq!(first_handle.state(), SessionState::Active);

    assert!(first_peer.push(CHAT_FRAME));
    assert_eq!(next_message(&mut first_events).await.nickname, "nickA");
    first_peer.close();
    timeout(WAIT, first_task).await.unwrap().unwrap().unwrap();
    second_peer.close();
}
