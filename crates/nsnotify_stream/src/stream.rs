//! The event stream.

use crate::config::StreamConfig;
use crate::error::{StreamError, StreamResult};
use crate::transport::{AuthorityConnector, BatchFetcher};
use nsnotify_protocol::{
    translate, Event, EventBatch, FetchRequest, FetchResponse, OpBatch, PositionResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Statistics about a stream.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    /// Requests sent to authorities, including redirected and failed ones.
    pub requests: u64,
    /// Operations received.
    pub operations_fetched: u64,
    /// Events handed to the caller.
    pub events_delivered: u64,
    /// Fetches answered with nothing new.
    pub empty_fetches: u64,
    /// Retryable failures swallowed by a poll.
    pub transient_failures: u64,
    /// Redirects followed.
    pub redirects: u64,
    /// Switches to another configured authority after a failure.
    pub failovers: u64,
    /// Sleeps taken by blocking polls.
    pub backoffs: u64,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Cancels blocking polls of the stream it was taken from.
///
/// The flag stays set until `reset` is called.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears a previous cancellation.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    /// Returns true if cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Events of one operation that have not been delivered yet.
struct PendingOp {
    seq: u64,
    events: VecDeque<Event>,
}

/// Outcome of a single non-blocking attempt.
enum Attempt {
    Event(Event),
    /// Operations arrived but none of them produced an event.
    Progress,
    Idle,
}

trait Routed {
    fn redirect_target(&self) -> Option<&str>;
}

impl Routed for FetchResponse {
    fn redirect_target(&self) -> Option<&str> {
        match self {
            FetchResponse::Redirect { target } => Some(target.as_str()),
            _ => None,
        }
    }
}

impl Routed for PositionResponse {
    fn redirect_target(&self) -> Option<&str> {
        match self {
            PositionResponse::Redirect { target } => Some(target.as_str()),
            PositionResponse::Position { .. } => None,
        }
    }
}

/// A pull-based stream of change events.
///
/// The stream keeps a cursor: the sequence number of the last operation
/// whose events have all been handed out. Fetches always resume after the
/// cursor, on whichever authority currently serves the nameservice, so an
/// operation is never skipped or delivered twice by one stream.
///
/// One stream is meant for one reader at a time.
pub struct EventStream<C: AuthorityConnector> {
    connector: C,
    config: StreamConfig,
    fetcher: C::Fetcher,
    authority: String,
    cursor: u64,
    /// Highest committed sequence number reported with the last batch.
    sync_seq: u64,
    buffer: VecDeque<PendingOp>,
    stats: StreamStats,
    cancel: CancelHandle,
}

impl<C: AuthorityConnector> EventStream<C> {
    /// Opens a stream positioned at the authority's current head.
    ///
    /// Only operations committed after the call are delivered.
    pub fn open(connector: C, config: StreamConfig) -> StreamResult<Self> {
        let mut stream = Self::connect(connector, config, 0)?;
        let head = match stream.call(|fetcher| fetcher.position())? {
            PositionResponse::Position { last_committed } => last_committed,
            PositionResponse::Redirect { target } => {
                return Err(StreamError::Protocol(format!(
                    "unresolved redirect to {target}"
                )))
            }
        };
        stream.cursor = head;
        stream.sync_seq = head;
        info!(authority = %stream.authority, cursor = head, "stream opened");
        Ok(stream)
    }

    /// Opens a stream that delivers operations after `cursor`.
    pub fn resume(connector: C, config: StreamConfig, cursor: u64) -> StreamResult<Self> {
        let stream = Self::connect(connector, config, cursor)?;
        info!(authority = %stream.authority, cursor, "stream resumed");
        Ok(stream)
    }

    fn connect(connector: C, config: StreamConfig, cursor: u64) -> StreamResult<Self> {
        if config.authorities.is_empty() {
            return Err(StreamError::NoAuthorities);
        }

        let mut last_error = None;
        for addr in &config.authorities {
            match connector.connect(addr) {
                Ok(fetcher) => {
                    let authority = addr.clone();
                    return Ok(Self {
                        connector,
                        config,
                        fetcher,
                        authority,
                        cursor,
                        sync_seq: cursor,
                        buffer: VecDeque::new(),
                        stats: StreamStats::default(),
                        cancel: CancelHandle::default(),
                    });
                }
                Err(e) => {
                    warn!(authority = %addr, error = %e, "connect failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(StreamError::NoAuthorities))
    }

    /// Sequence number of the last fully delivered operation.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }

    /// Address of the authority currently read from.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Returns the stream statistics.
    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Returns the connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Returns a handle that cancels blocking polls.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Estimated number of committed operations not yet delivered.
    ///
    /// Computed from the committed position reported with the last batch,
    /// so it can lag behind the authority. It never goes below zero. A call
    /// that returns no event leaves it unchanged unless that call fetched
    /// a new batch.
    pub fn events_behind_estimate(&self) -> u64 {
        self.sync_seq.saturating_sub(self.cursor)
    }

    /// Returns the next event, fetching at most once.
    ///
    /// Returns `None` when nothing new is committed or the authority is
    /// momentarily unreachable. Missing history is an error.
    pub fn poll(&mut self) -> StreamResult<Option<Event>> {
        match self.attempt()? {
            Attempt::Event(event) => Ok(Some(event)),
            Attempt::Progress | Attempt::Idle => Ok(None),
        }
    }

    /// Returns all undelivered events of the next operation that has any.
    pub fn poll_batch(&mut self) -> StreamResult<Option<EventBatch>> {
        if let Some(batch) = self.next_buffered_batch() {
            return Ok(Some(batch));
        }
        if self.fetch_or_idle()? {
            Ok(self.next_buffered_batch())
        } else {
            Ok(None)
        }
    }

    /// Waits up to `timeout` for the next event.
    ///
    /// Retries with exponential backoff and never sleeps past the
    /// deadline. Returns `None` on timeout.
    pub fn poll_timeout(&mut self, timeout: Duration) -> StreamResult<Option<Event>> {
        let deadline = Instant::now() + timeout;
        let mut attempt = 0u32;
        loop {
            self.check_cancelled()?;
            match self.attempt()? {
                Attempt::Event(event) => return Ok(Some(event)),
                Attempt::Progress => attempt = 0,
                Attempt::Idle => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    let delay = self.next_delay(attempt, deadline - now);
                    attempt = attempt.saturating_add(1);
                    std::thread::sleep(delay);
                    continue;
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    /// Async variant of `poll_timeout` that yields to the runtime between
    /// retries.
    #[cfg(feature = "tokio")]
    pub async fn poll_timeout_async(&mut self, timeout: Duration) -> StreamResult<Option<Event>> {
        let deadline = Instant::now() + timeout;
        let mut attempt = 0u32;
        loop {
            self.check_cancelled()?;
            match self.attempt()? {
                Attempt::Event(event) => return Ok(Some(event)),
                Attempt::Progress => attempt = 0,
                Attempt::Idle => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Ok(None);
                    }
                    let delay = self.next_delay(attempt, deadline - now);
                    attempt = attempt.saturating_add(1);
                    tokio::time::sleep(delay).await;
                    continue;
                }
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
        }
    }

    fn next_delay(&mut self, attempt: u32, remaining: Duration) -> Duration {
        self.stats.backoffs += 1;
        self.config.backoff_for_attempt(attempt).min(remaining)
    }

    fn check_cancelled(&self) -> StreamResult<()> {
        if self.cancel.is_cancelled() {
            Err(StreamError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn attempt(&mut self) -> StreamResult<Attempt> {
        if let Some(event) = self.next_buffered() {
            return Ok(Attempt::Event(event));
        }
        if !self.fetch_or_idle()? {
            return Ok(Attempt::Idle);
        }
        Ok(match self.next_buffered() {
            Some(event) => Attempt::Event(event),
            None => Attempt::Progress,
        })
    }

    /// Pops the next buffered event, advancing the cursor past every
    /// operation whose events are exhausted.
    fn next_buffered(&mut self) -> Option<Event> {
        while let Some(front) = self.buffer.front_mut() {
            let seq = front.seq;
            match front.events.pop_front() {
                Some(event) => {
                    if front.events.is_empty() {
                        self.buffer.pop_front();
                        self.cursor = seq;
                        self.skip_silent();
                    }
                    self.stats.events_delivered += 1;
                    return Some(event);
                }
                None => {
                    self.buffer.pop_front();
                    self.cursor = seq;
                }
            }
        }
        None
    }

    fn next_buffered_batch(&mut self) -> Option<EventBatch> {
        while let Some(op) = self.buffer.pop_front() {
            self.cursor = op.seq;
            if !op.events.is_empty() {
                self.skip_silent();
                self.stats.events_delivered += op.events.len() as u64;
                return Some(EventBatch::new(op.seq, Vec::from(op.events)));
            }
        }
        None
    }

    /// Moves the cursor past buffered operations that produce no event, so
    /// it settles in the same call that hands out the preceding event.
    fn skip_silent(&mut self) {
        while let Some(front) = self.buffer.front() {
            if !front.events.is_empty() {
                break;
            }
            self.cursor = front.seq;
            self.buffer.pop_front();
        }
    }

    /// Runs one fetch cycle. Retryable failures are logged and reported
    /// as `false`, like an empty fetch.
    fn fetch_or_idle(&mut self) -> StreamResult<bool> {
        match self.fetch() {
            Ok(progressed) => Ok(progressed),
            Err(e) if e.is_retryable() => {
                warn!(authority = %self.authority, cursor = self.cursor, error = %e, "fetch failed, will retry");
                self.stats.transient_failures += 1;
                self.stats.last_error = Some(e.to_string());
                Ok(false)
            }
            Err(e) => {
                self.stats.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetches the operations following the cursor into the buffer.
    ///
    /// Returns true if any operation was buffered.
    fn fetch(&mut self) -> StreamResult<bool> {
        let request = FetchRequest::new(self.cursor, self.config.batch_size);
        match self.call(|fetcher| fetcher.fetch(&request))? {
            FetchResponse::Batch(batch) => self.accept(batch),
            FetchResponse::Empty { last_committed } => {
                debug!(authority = %self.authority, cursor = self.cursor, last_committed, "nothing new");
                self.stats.empty_fetches += 1;
                Ok(false)
            }
            FetchResponse::Gap {
                requested,
                first_available,
            } => {
                warn!(
                    authority = %self.authority,
                    requested,
                    first_available,
                    "authority no longer retains requested history"
                );
                Err(StreamError::MissingEvents {
                    last_cursor: self.cursor,
                    first_available,
                })
            }
            FetchResponse::Redirect { target } => Err(StreamError::Protocol(format!(
                "unresolved redirect to {target}"
            ))),
        }
    }

    fn accept(&mut self, batch: OpBatch) -> StreamResult<bool> {
        batch.validate()?;
        if let Some(first) = batch.first_seq() {
            let expected = self.cursor.checked_add(1).ok_or_else(|| {
                StreamError::Protocol(format!("cursor {} has no successor", self.cursor))
            })?;
            if first > expected {
                warn!(
                    authority = %self.authority,
                    cursor = self.cursor,
                    first,
                    "batch skips ahead of cursor"
                );
                return Err(StreamError::MissingEvents {
                    last_cursor: self.cursor,
                    first_available: first,
                });
            }
            if first < expected {
                return Err(StreamError::Protocol(format!(
                    "batch starts at {first}, expected {expected}"
                )));
            }
        }
        if let Some(missing) = batch.first_missing() {
            warn!(
                authority = %self.authority,
                cursor = self.cursor,
                missing,
                "batch is not contiguous"
            );
            return Err(StreamError::MissingEvents {
                last_cursor: self.cursor,
                first_available: missing,
            });
        }

        debug!(
            authority = %self.authority,
            count = batch.len(),
            last_committed = batch.last_committed,
            "fetched batch"
        );
        self.sync_seq = batch.last_committed;
        self.stats.operations_fetched += batch.len() as u64;
        let progressed = !batch.is_empty();
        for op in &batch.operations {
            self.buffer.push_back(PendingOp {
                seq: op.seq,
                events: translate(op).into(),
            });
        }
        Ok(progressed)
    }

    /// Issues a request, following redirects and rotating to the next
    /// configured authority on retryable failures. The cursor is untouched.
    fn call<R, F>(&mut self, request: F) -> StreamResult<R>
    where
        R: Routed,
        F: Fn(&C::Fetcher) -> StreamResult<R>,
    {
        let mut redirects = 0u32;
        let mut failovers = 0usize;
        loop {
            self.stats.requests += 1;
            match request(&self.fetcher) {
                Ok(reply) => {
                    let target = match reply.redirect_target() {
                        Some(target) => target.to_string(),
                        None => return Ok(reply),
                    };
                    redirects += 1;
                    if redirects > self.config.max_redirects {
                        return Err(StreamError::RedirectLoop { hops: redirects });
                    }
                    self.switch_to(target)?;
                    self.stats.redirects += 1;
                }
                Err(e) if e.is_retryable() && failovers + 1 < self.config.authorities.len() => {
                    failovers += 1;
                    warn!(authority = %self.authority, error = %e, "authority unavailable");
                    self.rotate()?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn switch_to(&mut self, target: String) -> StreamResult<()> {
        let fetcher = self.connector.connect(&target)?;
        info!(from = %self.authority, to = %target, cursor = self.cursor, "following redirect");
        self.fetcher = fetcher;
        self.authority = target;
        Ok(())
    }

    /// Connects to the next configured authority after the current one.
    fn rotate(&mut self) -> StreamResult<()> {
        let count = self.config.authorities.len();
        let current = self
            .config
            .authorities
            .iter()
            .position(|addr| *addr == self.authority)
            .unwrap_or(count - 1);

        let mut last_error = None;
        for step in 1..count {
            let addr = self.config.authorities[(current + step) % count].clone();
            match self.connector.connect(&addr) {
                Ok(fetcher) => {
                    info!(from = %self.authority, to = %addr, cursor = self.cursor, "failing over");
                    self.fetcher = fetcher;
                    self.authority = addr;
                    self.stats.failovers += 1;
                    return Ok(());
                }
                Err(e) => last_error = Some(e),
            }
        }
        Err(last_error.unwrap_or(StreamError::NoAuthorities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockConnector, MockFetcher};
    use nsnotify_protocol::{EventType, OpBody, Operation};

    fn delete(seq: u64, path: &str) -> Operation {
        Operation::new(
            seq,
            OpBody::Delete {
                path: path.into(),
                timestamp: seq as i64,
            },
        )
    }

    fn concat(seq: u64) -> Operation {
        Operation::new(
            seq,
            OpBody::ConcatDelete {
                target: "/t".into(),
                sources: vec!["/s1".into(), "/s2".into()],
                timestamp: 9,
            },
        )
    }

    fn silent(seq: u64) -> Operation {
        Operation::new(seq, OpBody::EndLogSegment)
    }

    fn batch(ops: Vec<Operation>, last_committed: u64) -> FetchResponse {
        FetchResponse::Batch(OpBatch::new(ops, last_committed))
    }

    fn single(cursor: u64) -> (MockFetcher, EventStream<MockConnector>) {
        let connector = MockConnector::new();
        let fetcher = connector.add("nn0");
        let stream = EventStream::resume(connector, StreamConfig::new(["nn0"]), cursor).unwrap();
        (fetcher, stream)
    }

    #[test]
    fn open_starts_at_head() {
        let connector = MockConnector::new();
        let fetcher = connector.add("nn0");
        fetcher.set_position(PositionResponse::Position { last_committed: 42 });

        let mut stream = EventStream::open(connector, StreamConfig::new(["nn0"])).unwrap();
        assert_eq!(stream.cursor(), 42);
        assert_eq!(stream.events_behind_estimate(), 0);
        assert!(stream.poll().unwrap().is_none());
        assert_eq!(fetcher.requests()[0].after, 42);
    }

    #[test]
    fn no_authorities() {
        let result = EventStream::resume(MockConnector::new(), StreamConfig::default(), 0);
        assert!(matches!(result, Err(StreamError::NoAuthorities)));
    }

    #[test]
    fn cursor_waits_for_whole_expansion() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![concat(1), delete(2, "/x")], 2));

        let first = stream.poll().unwrap().unwrap();
        assert_eq!(first.event_type(), EventType::Append);
        assert_eq!(stream.cursor(), 0);
        assert_eq!(stream.events_behind_estimate(), 2);

        assert_eq!(stream.poll().unwrap().unwrap().event_type(), EventType::Unlink);
        assert_eq!(stream.poll().unwrap().unwrap().event_type(), EventType::Unlink);
        assert_eq!(stream.cursor(), 0);
        assert_eq!(stream.poll().unwrap().unwrap().event_type(), EventType::Close);
        assert_eq!(stream.cursor(), 1);
        assert_eq!(stream.events_behind_estimate(), 1);

        assert_eq!(stream.poll().unwrap().unwrap().path(), "/x");
        assert_eq!(stream.cursor(), 2);
        assert_eq!(stream.events_behind_estimate(), 0);

        assert!(stream.poll().unwrap().is_none());
        assert_eq!(fetcher.requests().last().map(|r| r.after), Some(2));
    }

    #[test]
    fn silent_operations_advance_cursor() {
        let (fetcher, mut stream) = single(10);
        fetcher.push_response(batch(vec![silent(11), silent(12), delete(13, "/a"), silent(14)], 14));

        assert_eq!(stream.poll().unwrap().unwrap().path(), "/a");
        assert_eq!(stream.cursor(), 14);
        assert!(stream.poll().unwrap().is_none());
        assert_eq!(stream.cursor(), 14);
        assert_eq!(fetcher.requests().last().map(|r| r.after), Some(14));
    }

    #[test]
    fn trailing_silent_operation_settles_with_event() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![delete(1, "/a"), silent(2)], 2));

        assert_eq!(stream.poll().unwrap().unwrap().path(), "/a");
        assert_eq!(stream.cursor(), 2);
        let before = stream.events_behind_estimate();
        assert!(stream.poll().unwrap().is_none());
        assert_eq!(stream.events_behind_estimate(), before);
        assert_eq!(stream.cursor(), 2);
    }

    #[test]
    fn batch_poll_settles_trailing_silent_operations() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![delete(1, "/a"), silent(2), silent(3)], 3));

        let first = stream.poll_batch().unwrap().unwrap();
        assert_eq!(first.seq, 1);
        assert_eq!(stream.cursor(), 3);
        assert_eq!(stream.events_behind_estimate(), 0);
    }

    #[test]
    fn estimate_unchanged_by_empty_polls() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![delete(1, "/a"), delete(2, "/b")], 5));

        stream.poll().unwrap().unwrap();
        assert_eq!(stream.events_behind_estimate(), 4);
        assert_eq!(stream.events_behind_estimate(), 4);
        stream.poll().unwrap().unwrap();
        assert_eq!(stream.events_behind_estimate(), 3);

        assert!(stream.poll().unwrap().is_none());
        assert!(stream.poll().unwrap().is_none());
        assert_eq!(stream.events_behind_estimate(), 3);
    }

    #[test]
    fn authority_gap_is_missing_events() {
        let (fetcher, mut stream) = single(3);
        fetcher.push_response(FetchResponse::Gap {
            requested: 3,
            first_available: 50,
        });

        let err = stream.poll().unwrap_err();
        assert!(matches!(
            err,
            StreamError::MissingEvents {
                last_cursor: 3,
                first_available: 50
            }
        ));
        assert_eq!(stream.cursor(), 3);
    }

    #[test]
    fn skipped_sequence_is_missing_events() {
        let (fetcher, mut stream) = single(3);
        fetcher.push_response(batch(vec![delete(7, "/a")], 7));

        let err = stream.poll().unwrap_err();
        assert!(matches!(
            err,
            StreamError::MissingEvents {
                last_cursor: 3,
                first_available: 7
            }
        ));
        assert!(stream.stats().last_error.is_some());
    }

    #[test]
    fn hole_inside_batch_is_missing_events() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![delete(1, "/a"), delete(3, "/c")], 3));

        let err = stream.poll().unwrap_err();
        assert!(matches!(
            err,
            StreamError::MissingEvents {
                last_cursor: 0,
                first_available: 2
            }
        ));
        assert_eq!(stream.cursor(), 0);
        assert!(stream.poll().unwrap().is_none());
        assert_eq!(stream.cursor(), 0);
    }

    #[test]
    fn cursor_at_end_of_sequence_space() {
        let (fetcher, mut stream) = single(u64::MAX);
        fetcher.push_response(batch(vec![delete(5, "/a")], 5));
        assert!(matches!(stream.poll(), Err(StreamError::Protocol(_))));
        assert_eq!(stream.cursor(), u64::MAX);
    }

    #[test]
    fn out_of_order_batch_is_rejected() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![delete(2, "/a"), delete(1, "/b")], 2));
        assert!(matches!(stream.poll(), Err(StreamError::Protocol(_))));
    }

    #[test]
    fn transient_failure_is_no_event() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_failure("connection reset", true);
        fetcher.push_response(batch(vec![delete(1, "/a")], 1));

        assert!(stream.poll().unwrap().is_none());
        assert_eq!(stream.stats().transient_failures, 1);
        assert_eq!(stream.poll().unwrap().unwrap().path(), "/a");
    }

    #[test]
    fn fatal_failure_propagates() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_failure("bad credentials", false);
        assert!(matches!(
            stream.poll(),
            Err(StreamError::Transport {
                retryable: false,
                ..
            })
        ));
    }

    #[test]
    fn redirect_resumes_from_same_cursor() {
        let connector = MockConnector::new();
        let nn0 = connector.add("nn0");
        let nn1 = connector.add("nn1");
        nn0.push_response(FetchResponse::Redirect {
            target: "nn1".into(),
        });
        nn1.push_response(batch(vec![delete(6, "/a")], 6));

        let mut stream =
            EventStream::resume(connector, StreamConfig::new(["nn0", "nn1"]), 5).unwrap();
        assert_eq!(stream.poll().unwrap().unwrap().path(), "/a");
        assert_eq!(stream.authority(), "nn1");
        assert_eq!(nn1.requests()[0].after, 5);
        assert_eq!(stream.stats().redirects, 1);
    }

    #[test]
    fn redirect_loop_is_bounded() {
        let connector = MockConnector::new();
        let nn0 = connector.add("nn0");
        let nn1 = connector.add("nn1");
        for _ in 0..5 {
            nn0.push_response(FetchResponse::Redirect {
                target: "nn1".into(),
            });
            nn1.push_response(FetchResponse::Redirect {
                target: "nn0".into(),
            });
        }

        let config = StreamConfig::new(["nn0", "nn1"]).with_max_redirects(2);
        let mut stream = EventStream::resume(connector, config, 0).unwrap();
        assert!(stream.poll().unwrap().is_none());
        assert!(matches!(
            stream.stats().last_error.as_deref(),
            Some(msg) if msg.contains("redirects")
        ));
    }

    #[test]
    fn unreachable_authority_fails_over() {
        let connector = MockConnector::new();
        let nn0 = connector.add("nn0");
        let nn1 = connector.add("nn1");
        nn0.push_failure("connection refused", true);
        nn1.push_response(batch(vec![delete(1, "/a")], 1));

        let mut stream =
            EventStream::resume(connector, StreamConfig::new(["nn0", "nn1"]), 0).unwrap();
        assert_eq!(stream.poll().unwrap().unwrap().path(), "/a");
        assert_eq!(stream.authority(), "nn1");
        assert_eq!(stream.stats().failovers, 1);
        assert_eq!(stream.connector().connections(), vec!["nn0", "nn1"]);
    }

    #[test]
    fn connect_skips_unreachable() {
        let connector = MockConnector::new();
        connector.add("nn1");
        let stream =
            EventStream::resume(connector, StreamConfig::new(["nn0", "nn1"]), 0).unwrap();
        assert_eq!(stream.authority(), "nn1");
    }

    #[test]
    fn poll_batch_returns_whole_operation() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![silent(1), concat(2), delete(3, "/x")], 3));

        let first = stream.poll_batch().unwrap().unwrap();
        assert_eq!(first.seq, 2);
        assert_eq!(first.events.len(), 4);
        assert_eq!(stream.cursor(), 2);

        let second = stream.poll_batch().unwrap().unwrap();
        assert_eq!(second.seq, 3);
        assert!(stream.poll_batch().unwrap().is_none());
    }

    #[test]
    fn poll_then_batch_resumes_mid_expansion() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(batch(vec![concat(1)], 1));

        assert_eq!(stream.poll().unwrap().unwrap().event_type(), EventType::Append);
        let rest = stream.poll_batch().unwrap().unwrap();
        assert_eq!(rest.seq, 1);
        assert_eq!(rest.events.len(), 3);
        assert_eq!(stream.cursor(), 1);
    }

    #[test]
    fn poll_timeout_gives_up_at_deadline() {
        let (_fetcher, mut stream) = single(0);
        let start = Instant::now();
        assert!(stream
            .poll_timeout(Duration::from_millis(60))
            .unwrap()
            .is_none());
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(60));
        assert!(elapsed < Duration::from_secs(2));
        assert!(stream.stats().backoffs > 0);
    }

    #[test]
    fn poll_timeout_retries_until_data() {
        let (fetcher, mut stream) = single(0);
        fetcher.push_response(FetchResponse::Empty { last_committed: 0 });
        fetcher.push_failure("timeout", true);
        fetcher.push_response(batch(vec![delete(1, "/late")], 1));

        let event = stream.poll_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert_eq!(event.path(), "/late");
        assert_eq!(fetcher.requests().len(), 3);
    }

    #[test]
    fn cancelled_poll_stops() {
        let (_fetcher, mut stream) = single(0);
        let handle = stream.cancel_handle();
        handle.cancel();
        assert!(matches!(
            stream.poll_timeout(Duration::from_secs(5)),
            Err(StreamError::Cancelled)
        ));

        handle.reset();
        assert!(stream
            .poll_timeout(Duration::from_millis(1))
            .unwrap()
            .is_none());
    }
}
