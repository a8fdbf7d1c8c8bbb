//! In-memory capture of store log events for test assertions

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, OnceLock};

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

use crate::schema::{
    EVENT_END, EVENT_END_ERROR, EVENT_START, FIELD_EVENT, FIELD_OP, FIELD_SESSION_ID,
};

/// One log event, every field rendered as text
#[derive(Clone, Debug)]
pub struct CapturedEvent {
    pub level: Level,
    pub target: String,
    pub fields: BTreeMap<String, String>,
}

impl CapturedEvent {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn op(&self) -> Option<&str> {
        self.field(FIELD_OP)
    }

    /// `start`, `end` or `end_error` for lifecycle events
    pub fn event(&self) -> Option<&str> {
        self.field(FIELD_EVENT)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.field(FIELD_SESSION_ID)
    }
}

// Numbers and bools fall back to record_debug, which prints them plainly
struct Fields<'a>(&'a mut BTreeMap<String, String>);

impl Visit for Fields<'_> {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.0.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.0.insert(field.name().to_string(), format!("{:?}", value));
    }
}

/// Layer appending every event to a shared buffer
pub struct TestCaptureLayer {
    buffer: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCaptureLayer {
    pub fn new() -> (Self, TestCapture) {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let capture = TestCapture {
            buffer: Arc::clone(&buffer),
        };
        (Self { buffer }, capture)
    }
}

impl<S> Layer<S> for TestCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut fields = BTreeMap::new();
        event.record(&mut Fields(&mut fields));
        let captured = CapturedEvent {
            level: *event.metadata().level(),
            target: event.metadata().target().to_string(),
            fields,
        };
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.push(captured);
        }
    }
}

/// Read side of the capture buffer
#[derive(Clone)]
pub struct TestCapture {
    buffer: Arc<Mutex<Vec<CapturedEvent>>>,
}

impl TestCapture {
    /// Snapshot of the buffer, oldest first
    pub fn events(&self) -> Vec<CapturedEvent> {
        self.buffer
            .lock()
            .map(|buffer| buffer.clone())
            .unwrap_or_default()
    }

    /// Events of one operation, optionally restricted to one session
    pub fn events_for(&self, op: &str, session_id: Option<&str>) -> Vec<CapturedEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.op() == Some(op))
            .filter(|e| session_id.map_or(true, |s| e.session_id() == Some(s)))
            .collect()
    }

    /// Assert that each call of `op` in the session logged a start followed by
    /// an end or end_error
    ///
    /// # Panics
    ///
    /// Panics when no call was logged or a bracket is broken.
    pub fn assert_bracketed(&self, op: &str, session_id: &str) {
        let lifecycle: Vec<String> = self
            .events_for(op, Some(session_id))
            .iter()
            .filter_map(|e| e.event().map(str::to_string))
            .collect();
        assert!(!lifecycle.is_empty(), "no events logged for {}", op);
        for pair in lifecycle.chunks(2) {
            let closed = pair.len() == 2
                && pair[0] == EVENT_START
                && (pair[1] == EVENT_END || pair[1] == EVENT_END_ERROR);
            assert!(closed, "broken bracket for {}: {:?}", op, lifecycle);
        }
    }

    /// Number of events matching `predicate`
    pub fn count_events(&self, predicate: impl Fn(&CapturedEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

static GLOBAL_CAPTURE: OnceLock<TestCapture> = OnceLock::new();

/// Install the capture layer as the process-wide subscriber
///
/// Every call returns a handle on the same buffer. Tests run in parallel, so
/// assertions should filter by a unique operation name or session id.
///
/// # Example
///
/// ```
/// use mvdb_core::logging_facility::test_capture::init_test_capture;
/// use mvdb_core::log_op_start;
///
/// let capture = init_test_capture();
/// log_op_start!("doc_capture_op", session_id = "doc");
/// assert_eq!(capture.events_for("doc_capture_op", Some("doc")).len(), 1);
/// ```
pub fn init_test_capture() -> TestCapture {
    GLOBAL_CAPTURE
        .get_or_init(|| {
            let (layer, capture) = TestCaptureLayer::new();
            let _ = tracing_subscriber::registry().with(layer).try_init();
            capture
        })
        .clone()
}
