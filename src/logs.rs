use futures::StreamExt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::BrowserError;
use crate::gateway::{ClusterGateway, LogByteStream, LogRequest};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogTarget {
    pub namespace: String,
    pub pod: String,
    pub container: String,
}

impl LogTarget {
    pub fn new(
        namespace: impl Into<String>,
        pod: impl Into<String>,
        container: impl Into<String>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            pod: pod.into(),
            container: container.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Opening,
    Streaming,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    Ended,
    Cancelled,
    Errored,
}

/// Message from a reader task to the UI thread, stamped with its session.
#[derive(Debug)]
pub enum LogUpdate {
    Opened { generation: u64 },
    Chunk { generation: u64, text: String },
    Ended { generation: u64 },
    Failed { generation: u64, error: BrowserError },
}

impl LogUpdate {
    pub fn generation(&self) -> u64 {
        match self {
            Self::Opened { generation }
            | Self::Chunk { generation, .. }
            | Self::Ended { generation }
            | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// What the log view should do with an accepted update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogDisplay {
    Append(String),
    ErrorLine(String),
    Ended,
}

struct LiveSession {
    target: LogTarget,
    generation: u64,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns at most one live log session and filters stale output.
pub struct LogStreamManager {
    gateway: Option<Arc<dyn ClusterGateway>>,
    updates: mpsc::UnboundedSender<LogUpdate>,
    tail_lines: i64,
    generation: Arc<AtomicU64>,
    live: Option<LiveSession>,
    phase: SessionPhase,
    last_outcome: Option<SessionOutcome>,
    cancellations: u64,
}

impl LogStreamManager {
    pub fn new(
        gateway: Option<Arc<dyn ClusterGateway>>,
        updates: mpsc::UnboundedSender<LogUpdate>,
        tail_lines: i64,
    ) -> Self {
        Self {
            gateway,
            updates,
            tail_lines,
            generation: Arc::new(AtomicU64::new(0)),
            live: None,
            phase: SessionPhase::Idle,
            last_outcome: None,
            cancellations: 0,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn last_outcome(&self) -> Option<SessionOutcome> {
        self.last_outcome
    }

    pub fn live_generation(&self) -> Option<u64> {
        self.live.as_ref().map(|session| session.generation)
    }

    pub fn live_target(&self) -> Option<&LogTarget> {
        self.live.as_ref().map(|session| &session.target)
    }

    /// Number of sessions retired before reaching a terminal state on their own.
    pub fn cancellations(&self) -> u64 {
        self.cancellations
    }

    /// Retires any live session and starts tailing `target`. Returns the new generation.
    pub fn start_session(&mut self, target: LogTarget) -> Result<u64, BrowserError> {
        let gateway = self
            .gateway
            .clone()
            .ok_or(BrowserError::ClientUninitialized)?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.retire_live();

        let cancel = CancellationToken::new();
        let request = LogRequest::follow_tail(
            target.namespace.clone(),
            target.pod.clone(),
            target.container.clone(),
            self.tail_lines,
        );
        let task = tokio::spawn(read_session(
            gateway,
            request,
            generation,
            Arc::clone(&self.generation),
            cancel.clone(),
            self.updates.clone(),
        ));

        info!(
            generation,
            namespace = %target.namespace,
            pod = %target.pod,
            container = %target.container,
            "log session started"
        );
        self.live = Some(LiveSession {
            target,
            generation,
            cancel,
            task,
        });
        self.phase = SessionPhase::Opening;
        self.last_outcome = None;
        Ok(generation)
    }

    /// Stops the live session, if any. Its pending output is discarded.
    pub fn cancel_session(&mut self) {
        if self.live.is_none() {
            return;
        }
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.retire_live();
        self.phase = SessionPhase::Idle;
        self.last_outcome = Some(SessionOutcome::Cancelled);
    }

    /// Applies an update from the queue. Updates from any session other than the
    /// live one are dropped.
    pub fn accept(&mut self, update: LogUpdate) -> Option<LogDisplay> {
        let live = self.live_generation()?;
        if update.generation() != live {
            debug!(
                stale = update.generation(),
                live, "dropping update from retired log session"
            );
            return None;
        }

        match update {
            LogUpdate::Opened { .. } => {
                self.phase = SessionPhase::Streaming;
                None
            }
            LogUpdate::Chunk { text, .. } => {
                self.phase = SessionPhase::Streaming;
                Some(LogDisplay::Append(text))
            }
            LogUpdate::Ended { .. } => {
                self.finish(SessionOutcome::Ended);
                Some(LogDisplay::Ended)
            }
            LogUpdate::Failed { error, .. } => {
                warn!(generation = live, error = %error, "log session failed");
                self.finish(SessionOutcome::Errored);
                Some(LogDisplay::ErrorLine(error.status_line()))
            }
        }
    }

    fn finish(&mut self, outcome: SessionOutcome) {
        self.live = None;
        self.phase = SessionPhase::Idle;
        self.last_outcome = Some(outcome);
    }

    fn retire_live(&mut self) {
        let Some(session) = self.live.take() else {
            return;
        };
        session.cancel.cancel();
        self.cancellations += 1;
        debug!(generation = session.generation, "log session cancelled");
        drop(session.task);
    }
}

impl Drop for LogStreamManager {
    fn drop(&mut self) {
        if let Some(session) = self.live.take() {
            session.cancel.cancel();
        }
    }
}

async fn read_session(
    gateway: Arc<dyn ClusterGateway>,
    request: LogRequest,
    generation: u64,
    live_generation: Arc<AtomicU64>,
    cancel: CancellationToken,
    updates: mpsc::UnboundedSender<LogUpdate>,
) {
    let is_current = |cancel: &CancellationToken| {
        !cancel.is_cancelled() && live_generation.load(Ordering::SeqCst) == generation
    };

    let opened = tokio::select! {
        biased;
        _ = cancel.cancelled() => return,
        opened = gateway.open_pod_log_stream(&request) => opened,
    };
    let mut stream: LogByteStream = match opened {
        Ok(stream) => stream,
        Err(error) => {
            if is_current(&cancel) {
                let _ = updates.send(LogUpdate::Failed {
                    generation,
                    error: BrowserError::StreamOpen(error),
                });
            }
            return;
        }
    };
    if !is_current(&cancel) || updates.send(LogUpdate::Opened { generation }).is_err() {
        return;
    }

    let mut decoder = Utf8Chunks::default();
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(generation, "log reader observed cancellation");
                return;
            }
            next = stream.next() => next,
        };
        if !is_current(&cancel) {
            return;
        }

        let update = match next {
            Some(Ok(bytes)) => {
                let text = decoder.push(&bytes);
                if text.is_empty() {
                    continue;
                }
                LogUpdate::Chunk { generation, text }
            }
            Some(Err(error)) => {
                let _ = updates.send(LogUpdate::Failed {
                    generation,
                    error: BrowserError::StreamRead(error),
                });
                return;
            }
            None => {
                let rest = decoder.finish();
                if !rest.is_empty() {
                    let _ = updates.send(LogUpdate::Chunk {
                        generation,
                        text: rest,
                    });
                }
                let _ = updates.send(LogUpdate::Ended { generation });
                return;
            }
        };
        if updates.send(update).is_err() {
            return;
        }
    }
}

/// Decodes UTF-8 across chunk boundaries, holding back a split trailing sequence.
#[derive(Debug, Default)]
struct Utf8Chunks {
    pending: Vec<u8>,
}

impl Utf8Chunks {
    fn push(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let keep = match std::str::from_utf8(&self.pending) {
            Ok(_) => 0,
            Err(error) if error.error_len().is_none() => self.pending.len() - error.valid_up_to(),
            Err(_) => 0,
        };
        let split = self.pending.len() - keep;
        let tail = self.pending.split_off(split);
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending = tail;
        text
    }

    fn finish(&mut self) -> String {
        let text = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        text
    }
}

#[cfg(test)]
mod tests {
    use super::{
        LogDisplay, LogStreamManager, LogTarget, LogUpdate, SessionOutcome, SessionPhase,
        Utf8Chunks,
    };
    use crate::error::BrowserError;
    use crate::gateway::ClusterGateway;
    use crate::gateway::fake::FakeGateway;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::mpsc;
    use tokio::time::timeout;

    fn target(container: &str) -> LogTarget {
        LogTarget::new("default", "p1", container)
    }

    fn new_manager(
        gateway: &Arc<FakeGateway>,
    ) -> (LogStreamManager, mpsc::UnboundedReceiver<LogUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let gateway: Arc<dyn ClusterGateway> = gateway.clone();
        (LogStreamManager::new(Some(gateway), tx, 100), rx)
    }

    /// Feeds queued updates through the manager until `done` sees the display.
    async fn pump_until(
        manager: &mut LogStreamManager,
        rx: &mut mpsc::UnboundedReceiver<LogUpdate>,
        shown: &mut Vec<LogDisplay>,
        done: impl Fn(&[LogDisplay]) -> bool,
    ) {
        while !done(shown) {
            let update = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("update arrives in time")
                .expect("queue open");
            if let Some(display) = manager.accept(update) {
                shown.push(display);
            }
        }
    }

    fn appended(shown: &[LogDisplay]) -> String {
        shown
            .iter()
            .filter_map(|display| match display {
                LogDisplay::Append(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn switching_containers_never_interleaves_output() {
        let gateway = Arc::new(FakeGateway::default());
        let c1 = gateway.log_feed("p1", "c1");
        let c2 = gateway.log_feed("p1", "c2");
        let (mut manager, mut rx) = new_manager(&gateway);
        let mut shown = Vec::new();

        let first = manager.start_session(target("c1")).unwrap();
        c1.send(Ok(Bytes::from_static(b"c1 line 1\n"))).unwrap();
        pump_until(&mut manager, &mut rx, &mut shown, |shown| {
            appended(shown).contains("c1 line 1")
        })
        .await;

        let second = manager.start_session(target("c2")).unwrap();
        assert!(second > first);
        let _ = c1.send(Ok(Bytes::from_static(b"c1 late\n")));
        c2.send(Ok(Bytes::from_static(b"c2 line 1\n"))).unwrap();
        let _ = c1.send(Ok(Bytes::from_static(b"c1 later\n")));
        c2.send(Ok(Bytes::from_static(b"c2 line 2\n"))).unwrap();
        pump_until(&mut manager, &mut rx, &mut shown, |shown| {
            appended(shown).contains("c2 line 2")
        })
        .await;

        while let Ok(update) = rx.try_recv() {
            if let Some(display) = manager.accept(update) {
                shown.push(display);
            }
        }
        assert_eq!(appended(&shown), "c1 line 1\nc2 line 1\nc2 line 2\n");
        assert_eq!(manager.cancellations(), 1);
        assert_eq!(manager.live_target(), Some(&target("c2")));
        assert_eq!(manager.phase(), SessionPhase::Streaming);
    }

    #[tokio::test]
    async fn stale_generation_is_dropped_by_consumer() {
        let gateway = Arc::new(FakeGateway::default());
        let _c1 = gateway.log_feed("p1", "c1");
        let _c2 = gateway.log_feed("p1", "c2");
        let (mut manager, _rx) = new_manager(&gateway);

        let first = manager.start_session(target("c1")).unwrap();
        let second = manager.start_session(target("c2")).unwrap();

        let stale = LogUpdate::Chunk {
            generation: first,
            text: "from c1".to_string(),
        };
        assert_eq!(manager.accept(stale), None);

        let fresh = LogUpdate::Chunk {
            generation: second,
            text: "from c2".to_string(),
        };
        assert_eq!(
            manager.accept(fresh),
            Some(LogDisplay::Append("from c2".to_string()))
        );
    }

    #[tokio::test]
    async fn end_of_stream_finishes_silently() {
        let gateway = Arc::new(FakeGateway::default());
        let feed = gateway.log_feed("p1", "c1");
        let (mut manager, mut rx) = new_manager(&gateway);
        let mut shown = Vec::new();

        manager.start_session(target("c1")).unwrap();
        feed.send(Ok(Bytes::from_static(b"done\n"))).unwrap();
        drop(feed);
        pump_until(&mut manager, &mut rx, &mut shown, |shown| {
            shown.last() == Some(&LogDisplay::Ended)
        })
        .await;

        assert_eq!(
            shown,
            vec![LogDisplay::Append("done\n".to_string()), LogDisplay::Ended]
        );
        assert_eq!(manager.phase(), SessionPhase::Idle);
        assert_eq!(manager.last_outcome(), Some(SessionOutcome::Ended));
        assert_eq!(manager.cancellations(), 0);
    }

    #[tokio::test]
    async fn read_error_appends_one_line_and_stops() {
        let gateway = Arc::new(FakeGateway::default());
        let feed = gateway.log_feed("p1", "c1");
        let (mut manager, mut rx) = new_manager(&gateway);
        let mut shown = Vec::new();

        manager.start_session(target("c1")).unwrap();
        feed.send(Err(std::io::Error::other("connection reset")))
            .unwrap();
        let _ = feed.send(Ok(Bytes::from_static(b"after error\n")));
        pump_until(&mut manager, &mut rx, &mut shown, |shown| {
            matches!(shown.last(), Some(LogDisplay::ErrorLine(_)))
        })
        .await;

        assert_eq!(
            shown,
            vec![LogDisplay::ErrorLine(
                "Error reading logs: connection reset".to_string()
            )]
        );
        assert_eq!(manager.last_outcome(), Some(SessionOutcome::Errored));
        assert_eq!(manager.phase(), SessionPhase::Idle);
        let late = timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(!matches!(late, Ok(Some(LogUpdate::Chunk { .. }))));
        assert_eq!(gateway.log_requests().len(), 1);
    }

    #[tokio::test]
    async fn open_failure_is_reported_once() {
        let gateway = Arc::new(FakeGateway::default());
        gateway.fail_log_open("p1", "c1");
        let (mut manager, mut rx) = new_manager(&gateway);
        let mut shown = Vec::new();

        manager.start_session(target("c1")).unwrap();
        pump_until(&mut manager, &mut rx, &mut shown, |shown| !shown.is_empty()).await;

        let [LogDisplay::ErrorLine(line)] = shown.as_slice() else {
            panic!("expected a single error line, got {shown:?}");
        };
        assert!(line.starts_with("Error opening log stream"));
        assert_eq!(manager.last_outcome(), Some(SessionOutcome::Errored));
    }

    #[tokio::test]
    async fn cancel_session_discards_pending_output() {
        let gateway = Arc::new(FakeGateway::default());
        let feed = gateway.log_feed("p1", "c1");
        let (mut manager, mut rx) = new_manager(&gateway);

        let generation = manager.start_session(target("c1")).unwrap();
        manager.cancel_session();
        let _ = feed.send(Ok(Bytes::from_static(b"too late\n")));

        assert_eq!(manager.phase(), SessionPhase::Idle);
        assert_eq!(manager.last_outcome(), Some(SessionOutcome::Cancelled));
        assert_eq!(manager.cancellations(), 1);
        assert_eq!(
            manager.accept(LogUpdate::Chunk {
                generation,
                text: "too late\n".to_string(),
            }),
            None
        );
        while let Ok(Some(update)) = timeout(Duration::from_millis(50), rx.recv()).await {
            assert_eq!(manager.accept(update), None);
        }

        manager.cancel_session();
        assert_eq!(manager.cancellations(), 1);
    }

    #[tokio::test]
    async fn session_requests_follow_tail_of_one_hundred_lines() {
        let gateway = Arc::new(FakeGateway::default());
        let _feed = gateway.log_feed("p1", "c1");
        let (mut manager, mut rx) = new_manager(&gateway);
        let mut shown = Vec::new();

        manager.start_session(target("c1")).unwrap();
        while manager.phase() != SessionPhase::Streaming {
            let update = timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("opened in time")
                .expect("queue open");
            if let Some(display) = manager.accept(update) {
                shown.push(display);
            }
        }

        let requests = gateway.log_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].tail_lines, 100);
        assert!(requests[0].follow);
        assert_eq!(requests[0].container, "c1");
        assert!(shown.is_empty());
    }

    #[test]
    fn start_without_gateway_is_client_uninitialized() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut manager = LogStreamManager::new(None, tx, 100);
        assert!(matches!(
            manager.start_session(target("c1")),
            Err(BrowserError::ClientUninitialized)
        ));
        assert_eq!(manager.phase(), SessionPhase::Idle);
    }

    #[test]
    fn utf8_split_across_chunks_is_rejoined() {
        let mut decoder = Utf8Chunks::default();
        let bytes = "héllo".as_bytes();
        assert_eq!(decoder.push(&bytes[..2]), "h");
        assert_eq!(decoder.push(&bytes[2..]), "éllo");
        assert_eq!(decoder.finish(), "");
    }
}
