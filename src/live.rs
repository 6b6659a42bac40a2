//! Process-wide live order feed.
//!
//! One event-channel connection per running process, shared by every
//! screen and independent of any screen's lifetime. The feed delivers
//! named events to registered handlers, exposes a connected signal, and
//! recovers from disconnects with a bounded backoff. Missed events are
//! the screens' problem by design: they compensate with their periodic
//! full re-fetch, so push delivery here is best-effort.

use std::collections::HashMap;
use std::io;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_stream::StreamExt;

use crate::client::EventsClient;
use crate::proto;
use crate::session::Session;

/// Event name carrying partial order fields for the admin order board.
pub const ADMIN_ORDER_UPDATED: &str = "admin_order_updated";

/// Configuration for the feed's reconnection behaviour.
///
/// After a disconnect or failed connect, the loop waits
/// `reconnect_base_delay`, then doubles the wait up to
/// `reconnect_max_delay`, giving up for good after
/// `reconnect_attempts` consecutive failures. A successful connection
/// resets both the delay and the failure count.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
/// use tableside::FeedConfig;
///
/// let config = FeedConfig {
///     reconnect_attempts: 10,
///     ..FeedConfig::default()
/// };
/// assert_eq!(config.reconnect_base_delay, Duration::from_secs(1));
/// assert_eq!(config.reconnect_max_delay, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// First wait after a failure. Default: 1 second.
    pub reconnect_base_delay: Duration,
    /// Cap on the doubled wait. Default: 5 seconds.
    pub reconnect_max_delay: Duration,
    /// Consecutive failed attempts before the feed stops retrying and
    /// leaves the connected signal false. Default: 5.
    pub reconnect_attempts: u32,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            reconnect_base_delay: Duration::from_secs(1),
            reconnect_max_delay: Duration::from_secs(5),
            reconnect_attempts: 5,
        }
    }
}

/// Double a backoff delay, capped at `max`.
fn next_delay(delay: Duration, max: Duration) -> Duration {
    (delay * 2).min(max)
}

/// Token returned by [`OrderFeed::on`], used to deregister the handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

/// Handlers are shared so dispatch can run them outside the registry
/// lock; a handler may therefore call `on`/`off` itself.
type Handler = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Named-event handler registry. Handlers for an event run in
/// registration order.
#[derive(Default)]
struct HandlerRegistry {
    next_id: u64,
    handlers: HashMap<String, Vec<(HandlerId, Handler)>>,
}

impl HandlerRegistry {
    fn on(&mut self, event: &str, handler: Handler) -> HandlerId {
        let id = HandlerId(self.next_id);
        self.next_id += 1;
        self.handlers
            .entry(event.to_owned())
            .or_default()
            .push((id, handler));
        id
    }

    fn off(&mut self, event: &str, id: HandlerId) -> bool {
        let Some(list) = self.handlers.get_mut(event) else {
            return false;
        };
        let before = list.len();
        list.retain(|(hid, _)| *hid != id);
        list.len() != before
    }

    /// Snapshot the handlers for an event, in registration order.
    fn handlers_for(&self, event: &str) -> Vec<Handler> {
        self.handlers
            .get(event)
            .map(|list| list.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default()
    }
}

/// Result of pumping a single subscription stream until it ends. Used by
/// the outer reconnection loop to decide how to log the disconnect.
enum StreamOutcome {
    /// The server closed the stream cleanly.
    Ended,
    /// A stream error occurred.
    Error(io::Error),
}

/// The live order feed: the one piece of process-wide mutable shared
/// state in this client.
///
/// Constructed once by the composition root and cloned into any screen
/// that needs it (`Clone` is cheap, all fields are `Arc`-shared; clones
/// observe the same connection). Screens must never create a second
/// feed — [`connect`](OrderFeed::connect) is idempotent precisely so
/// that every screen can call it without coordination.
#[derive(Clone)]
pub struct OrderFeed {
    endpoint: String,
    /// Stable per-process identity sent with Subscribe and JoinTable.
    client_id: String,
    session: Session,
    config: FeedConfig,
    handlers: Arc<Mutex<HandlerRegistry>>,
    connected_tx: Arc<tokio::sync::watch::Sender<bool>>,
    /// Kept alive so `connected_tx.send` always lands, even before any
    /// screen subscribes.
    connected_rx: tokio::sync::watch::Receiver<bool>,
    /// The currently established client, if any. Shared with the feed
    /// loop; `join_table` reads it and skips silently when absent.
    conn: Arc<tokio::sync::Mutex<Option<EventsClient>>>,
    lifecycle: Arc<tokio::sync::Mutex<Option<FeedTask>>>,
}

/// The spawned feed loop and its shutdown signal.
struct FeedTask {
    shutdown_tx: tokio::sync::watch::Sender<bool>,
    task: tokio::task::JoinHandle<()>,
}

impl std::fmt::Debug for OrderFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderFeed")
            .field("endpoint", &self.endpoint)
            .field("client_id", &self.client_id)
            .field("connected", &self.is_connected())
            .finish()
    }
}

impl OrderFeed {
    /// Create a feed for the given event-channel endpoint.
    ///
    /// No connection is made until [`connect`](OrderFeed::connect).
    pub fn new(endpoint: impl Into<String>, session: Session, config: FeedConfig) -> Self {
        let (connected_tx, connected_rx) = tokio::sync::watch::channel(false);
        Self {
            endpoint: endpoint.into(),
            client_id: uuid::Uuid::new_v4().to_string(),
            session,
            config,
            handlers: Arc::new(Mutex::new(HandlerRegistry::default())),
            connected_tx: Arc::new(connected_tx),
            connected_rx,
            conn: Arc::new(tokio::sync::Mutex::new(None)),
            lifecycle: Arc::new(tokio::sync::Mutex::new(None)),
        }
    }

    /// Establish the feed if it is not already running. Idempotent: any
    /// screen may call this at any time; at most one underlying
    /// connection exists per process.
    ///
    /// The connection (and its reconnect loop) survives screen
    /// navigation; only [`shutdown`](OrderFeed::shutdown) ends it.
    pub async fn connect(&self) {
        let mut guard = self.lifecycle.lock().await;
        if let Some(existing) = guard.as_ref()
            && !existing.task.is_finished()
        {
            return;
        }

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
        let feed = self.clone();
        let task = tokio::spawn(async move {
            run_feed_loop(feed, shutdown_rx).await;
        });

        *guard = Some(FeedTask { shutdown_tx, task });
    }

    /// Stop the feed loop and wait for it to exit. Safe to call more
    /// than once; a feed that was never connected is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `io::Error` if the loop task panicked.
    pub async fn shutdown(&self) -> io::Result<()> {
        let taken = self.lifecycle.lock().await.take();
        let Some(FeedTask { shutdown_tx, task }) = taken else {
            return Ok(());
        };

        // Ignore send errors: the loop may already have exited.
        let _ = shutdown_tx.send(true);
        task.await
            .map_err(|e| io::Error::other(format!("feed loop task panicked: {e}")))?;
        let _ = self.connected_tx.send(false);
        Ok(())
    }

    /// Current transport connectivity.
    pub fn is_connected(&self) -> bool {
        *self.connected_rx.borrow()
    }

    /// Watchable connectivity signal for screens that render connection
    /// state. Flips to `true` on connect and `false` on disconnect.
    pub fn connected(&self) -> tokio::sync::watch::Receiver<bool> {
        self.connected_rx.clone()
    }

    /// Register a handler for a named event. Handlers for the same
    /// event run in registration order; a panicking handler does not
    /// prevent later handlers from running.
    pub fn on<F>(&self, event: &str, handler: F) -> HandlerId
    where
        F: Fn(&serde_json::Value) + Send + Sync + 'static,
    {
        self.handlers
            .lock()
            .expect("handler registry lock poisoned")
            .on(event, Arc::new(handler))
    }

    /// Deregister a handler. Returns `false` when the id was not
    /// registered for that event.
    pub fn off(&self, event: &str, id: HandlerId) -> bool {
        self.handlers
            .lock()
            .expect("handler registry lock poisoned")
            .off(event, id)
    }

    /// Ask the server to scope pushes to a table.
    ///
    /// Silently skipped (not queued) when the feed is not currently
    /// connected; after a reconnect the caller re-issues the join, the
    /// feed does not replay it.
    pub async fn join_table(&self, table_number: &str) {
        let client = self.conn.lock().await.clone();
        let Some(mut client) = client else {
            tracing::debug!(
                table = %table_number,
                "join_table skipped: feed not connected"
            );
            return;
        };

        if let Err(status) = client.join_table(&self.client_id, table_number).await {
            tracing::warn!(
                table = %table_number,
                error = %status,
                "join_table failed"
            );
        }
    }
}

/// Run the feed loop: connect, pump the stream, reconnect with bounded
/// backoff, exit on shutdown or after exhausting attempts.
async fn run_feed_loop(feed: OrderFeed, mut shutdown_rx: tokio::sync::watch::Receiver<bool>) {
    let config = feed.config.clone();
    let mut delay = config.reconnect_base_delay;
    let mut failures: u32 = 0;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let endpoint = feed.endpoint.clone();
        let session = feed.session.clone();
        let client_id = feed.client_id.clone();
        let attempt = async {
            let mut client = EventsClient::connect_with_session(&endpoint, session)
                .await
                .map_err(|e| io::Error::other(format!("event channel connect failed: {e}")))?;
            let stream = client
                .subscribe(&client_id)
                .await
                .map_err(|e| io::Error::other(format!("subscribe failed: {e}")))?;
            Ok::<_, io::Error>((client, stream))
        };

        let connect_result = tokio::select! {
            result = attempt => result,
            _ = shutdown_rx.changed() => break,
        };

        match connect_result {
            Ok((client, stream)) => {
                *feed.conn.lock().await = Some(client);
                let _ = feed.connected_tx.send(true);
                failures = 0;
                delay = config.reconnect_base_delay;
                tracing::info!(client_id = %feed.client_id, "event feed connected");

                let outcome = {
                    let pump = pump_stream(stream, &feed.handlers);
                    tokio::pin!(pump);
                    tokio::select! {
                        outcome = &mut pump => Some(outcome),
                        _ = shutdown_rx.changed() => None,
                    }
                };

                *feed.conn.lock().await = None;
                let _ = feed.connected_tx.send(false);

                match outcome {
                    // Shutdown requested mid-stream.
                    None => break,
                    Some(StreamOutcome::Ended) => {
                        tracing::info!("event stream closed by server, reconnecting");
                    }
                    Some(StreamOutcome::Error(e)) => {
                        tracing::warn!(error = %e, "event stream error, reconnecting");
                    }
                }
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(
                    error = %e,
                    attempt = failures,
                    "event feed connect failed"
                );
                if failures >= config.reconnect_attempts {
                    tracing::warn!(
                        attempts = failures,
                        "event feed giving up after repeated connect failures"
                    );
                    break;
                }
            }
        }

        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => break,
        }
        delay = next_delay(delay, config.reconnect_max_delay);
    }

    let _ = feed.connected_tx.send(false);
}

/// Pump one subscription stream, dispatching each frame, until the
/// stream ends or errors.
///
/// Factored out of [`run_feed_loop`] so tests can provide a mock stream
/// without a live gRPC server.
async fn pump_stream(
    mut stream: impl tokio_stream::Stream<Item = Result<proto::EventFrame, tonic::Status>> + Unpin,
    handlers: &Mutex<HandlerRegistry>,
) -> StreamOutcome {
    while let Some(result) = stream.next().await {
        match result {
            Ok(frame) => dispatch_frame(handlers, &frame),
            Err(status) => {
                return StreamOutcome::Error(io::Error::other(format!(
                    "event stream error: {status}"
                )));
            }
        }
    }
    StreamOutcome::Ended
}

/// Decode a frame's JSON payload and run every handler registered for
/// its event name.
///
/// Handlers run in registration order, outside the registry lock, each
/// isolated with `catch_unwind` so one panicking handler cannot starve
/// the rest. Frames with undecodable payloads are dropped with a
/// warning. An empty payload dispatches as JSON `null`.
fn dispatch_frame(handlers: &Mutex<HandlerRegistry>, frame: &proto::EventFrame) {
    let payload: serde_json::Value = if frame.payload.is_empty() {
        serde_json::Value::Null
    } else {
        match serde_json::from_slice(&frame.payload) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(
                    event = %frame.event,
                    error = %e,
                    "undecodable event payload, dropping frame"
                );
                return;
            }
        }
    };

    let to_run = handlers
        .lock()
        .expect("handler registry lock poisoned")
        .handlers_for(&frame.event);

    for handler in to_run {
        if catch_unwind(AssertUnwindSafe(|| handler(&payload))).is_err() {
            tracing::error!(event = %frame.event, "event handler panicked");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(event: &str, payload: serde_json::Value) -> proto::EventFrame {
        proto::EventFrame {
            event: event.to_string(),
            payload: serde_json::to_vec(&payload).expect("serialize payload"),
        }
    }

    fn test_feed() -> OrderFeed {
        // Port 1 is never listening; connect attempts fail fast.
        OrderFeed::new("http://127.0.0.1:1", Session::new(), FeedConfig::default())
    }

    #[test]
    fn feed_config_default_values() {
        let config = FeedConfig::default();
        assert_eq!(config.reconnect_base_delay, Duration::from_secs(1));
        assert_eq!(config.reconnect_max_delay, Duration::from_secs(5));
        assert_eq!(config.reconnect_attempts, 5);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let config = FeedConfig::default();
        let mut delay = config.reconnect_base_delay;
        let mut observed = Vec::new();
        for _ in 0..5 {
            observed.push(delay.as_secs());
            delay = next_delay(delay, config.reconnect_max_delay);
        }
        assert_eq!(observed, vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let feed = test_feed();
        let order = Arc::new(Mutex::new(Vec::new()));

        for label in ["first", "second", "third"] {
            let order = Arc::clone(&order);
            feed.on(ADMIN_ORDER_UPDATED, move |_| {
                order.lock().unwrap().push(label);
            });
        }

        dispatch_frame(
            &feed.handlers,
            &frame(ADMIN_ORDER_UPDATED, serde_json::json!({})),
        );
        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn single_emission_triggers_each_handler_once() {
        let feed = test_feed();
        let first = Arc::new(Mutex::new(0u32));
        let second = Arc::new(Mutex::new(0u32));

        {
            let first = Arc::clone(&first);
            feed.on(ADMIN_ORDER_UPDATED, move |_| {
                *first.lock().unwrap() += 1;
            });
        }
        {
            let second = Arc::clone(&second);
            feed.on(ADMIN_ORDER_UPDATED, move |_| {
                *second.lock().unwrap() += 1;
            });
        }

        dispatch_frame(
            &feed.handlers,
            &frame(ADMIN_ORDER_UPDATED, serde_json::json!({"orderId": "o-1"})),
        );

        assert_eq!(*first.lock().unwrap(), 1);
        assert_eq!(*second.lock().unwrap(), 1);
    }

    #[test]
    fn off_deregisters_a_handler() {
        let feed = test_feed();
        let calls = Arc::new(Mutex::new(0u32));

        let id = {
            let calls = Arc::clone(&calls);
            feed.on("order_status_updated", move |_| {
                *calls.lock().unwrap() += 1;
            })
        };

        assert!(feed.off("order_status_updated", id));
        dispatch_frame(
            &feed.handlers,
            &frame("order_status_updated", serde_json::json!({})),
        );
        assert_eq!(*calls.lock().unwrap(), 0);

        // Deregistering again reports nothing removed.
        assert!(!feed.off("order_status_updated", id));
    }

    #[test]
    fn panicking_handler_does_not_block_later_handlers() {
        let feed = test_feed();
        let reached = Arc::new(Mutex::new(false));

        feed.on(ADMIN_ORDER_UPDATED, |_| panic!("bad handler"));
        {
            let reached = Arc::clone(&reached);
            feed.on(ADMIN_ORDER_UPDATED, move |_| {
                *reached.lock().unwrap() = true;
            });
        }

        dispatch_frame(
            &feed.handlers,
            &frame(ADMIN_ORDER_UPDATED, serde_json::json!({})),
        );
        assert!(*reached.lock().unwrap(), "second handler should still run");
    }

    #[test]
    fn undecodable_payload_drops_frame() {
        let feed = test_feed();
        let calls = Arc::new(Mutex::new(0u32));
        {
            let calls = Arc::clone(&calls);
            feed.on(ADMIN_ORDER_UPDATED, move |_| {
                *calls.lock().unwrap() += 1;
            });
        }

        let bad = proto::EventFrame {
            event: ADMIN_ORDER_UPDATED.to_string(),
            payload: b"{not json".to_vec(),
        };
        dispatch_frame(&feed.handlers, &bad);
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn empty_payload_dispatches_as_null() {
        let feed = test_feed();
        let saw_null = Arc::new(Mutex::new(false));
        {
            let saw_null = Arc::clone(&saw_null);
            feed.on("connect", move |payload| {
                *saw_null.lock().unwrap() = payload.is_null();
            });
        }

        let empty = proto::EventFrame {
            event: "connect".to_string(),
            payload: Vec::new(),
        };
        dispatch_frame(&feed.handlers, &empty);
        assert!(*saw_null.lock().unwrap());
    }

    #[test]
    fn events_without_handlers_are_ignored() {
        let feed = test_feed();
        // Nothing registered for this event name; must not panic.
        dispatch_frame(
            &feed.handlers,
            &frame("unheard_of_event", serde_json::json!({"x": 1})),
        );
    }

    #[tokio::test]
    async fn pump_stream_dispatches_and_reports_end() {
        let feed = test_feed();
        let calls = Arc::new(Mutex::new(0u32));
        {
            let calls = Arc::clone(&calls);
            feed.on(ADMIN_ORDER_UPDATED, move |_| {
                *calls.lock().unwrap() += 1;
            });
        }

        let stream = tokio_stream::iter(vec![
            Ok(frame(ADMIN_ORDER_UPDATED, serde_json::json!({"_id": "a"}))),
            Ok(frame(ADMIN_ORDER_UPDATED, serde_json::json!({"_id": "b"}))),
        ]);

        let outcome = pump_stream(stream, &feed.handlers).await;
        assert!(matches!(outcome, StreamOutcome::Ended));
        assert_eq!(*calls.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn pump_stream_surfaces_stream_error() {
        let feed = test_feed();
        let calls = Arc::new(Mutex::new(0u32));
        {
            let calls = Arc::clone(&calls);
            feed.on(ADMIN_ORDER_UPDATED, move |_| {
                *calls.lock().unwrap() += 1;
            });
        }

        let stream = tokio_stream::iter(vec![
            Ok(frame(ADMIN_ORDER_UPDATED, serde_json::json!({}))),
            Err(tonic::Status::unavailable("connection lost")),
        ]);

        let outcome = pump_stream(stream, &feed.handlers).await;
        assert!(matches!(outcome, StreamOutcome::Error(_)));
        // The frame before the error was still dispatched.
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn connect_twice_keeps_a_single_task() {
        let feed = test_feed();

        feed.connect().await;
        let first_shutdown = {
            let guard = feed.lifecycle.lock().await;
            guard.as_ref().expect("task should exist").shutdown_tx.subscribe()
        };

        feed.connect().await;
        let second_shutdown = {
            let guard = feed.lifecycle.lock().await;
            guard
                .as_ref()
                .expect("task should still exist")
                .shutdown_tx
                .subscribe()
        };

        // Same shutdown channel means the first loop is still the one
        // running; a second connect must not spawn a replacement.
        assert!(
            first_shutdown.same_channel(&second_shutdown),
            "second connect must not spawn a new loop"
        );

        feed.shutdown().await.expect("shutdown should succeed");
    }

    #[tokio::test]
    async fn shutdown_without_connect_is_ok() {
        let feed = test_feed();
        feed.shutdown().await.expect("shutdown should succeed");
    }

    #[tokio::test]
    async fn shutdown_twice_is_ok() {
        let feed = test_feed();
        feed.connect().await;
        feed.shutdown().await.expect("first shutdown");
        feed.shutdown().await.expect("second shutdown");
        assert!(!feed.is_connected());
    }

    #[tokio::test]
    async fn join_table_when_disconnected_is_silently_skipped() {
        let feed = test_feed();
        // No connection established; must return without error or panic.
        feed.join_table("12").await;
    }

    #[tokio::test]
    async fn connected_signal_starts_false_and_is_watchable() {
        let feed = test_feed();
        assert!(!feed.is_connected());

        let rx = feed.connected();
        assert!(!*rx.borrow());

        // Simulate the loop flipping the flag.
        feed.connected_tx.send(true).expect("send");
        assert!(feed.is_connected());
        assert!(*rx.borrow());
    }
}
