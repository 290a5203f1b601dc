//! Core event types and channel helpers for stepmap.

use core_step::Bias;
use std::sync::atomic::AtomicU64;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

// -------------------------------------------------------------------------------------------------
// Channel Policy
// -------------------------------------------------------------------------------------------------
// One bounded mpsc channel feeds the event loop. Producers (stdin reader, explanation requests)
// await on `send`, so a slow consumer applies backpressure instead of dropping commands. A closed
// channel means the loop has exited; producers stop on the first failed send.
// -------------------------------------------------------------------------------------------------
pub const EVENT_CHANNEL_CAP: usize = 256;

// -------------------------------------------------------------------------------------------------
// Telemetry
// -------------------------------------------------------------------------------------------------
// Relaxed atomic counters, logged at shutdown and inspected in tests.
// -------------------------------------------------------------------------------------------------
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);
pub static COMMANDS_TOTAL: AtomicU64 = AtomicU64::new(0);
pub static COMMANDS_REJECTED: AtomicU64 = AtomicU64::new(0);
pub static EXPLAIN_REQUESTS: AtomicU64 = AtomicU64::new(0);
pub static EXPLAIN_STALE_REPLIES: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    /// Reply to an explanation request issued earlier by the loop.
    Explanation(ExplanationReply),
    Shutdown,
}

/// Normalized input events produced by the command reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Command(Command),
    /// A line that did not parse; `message` is user-facing.
    Rejected { message: String },
    /// Input stream reached end of file.
    Closed,
}

/// A user command. Numeric arguments are raw; the session clamps them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetDocument(String),
    SetTracked(usize),
    Track { label: String, pos: usize },
    Untrack(u32),
    /// Switch to an insert step, optionally setting its fields.
    Insert {
        from: Option<usize>,
        text: Option<String>,
    },
    /// Switch to a delete step, optionally setting its bounds.
    Delete {
        from: Option<usize>,
        to: Option<usize>,
    },
    SetFrom(usize),
    SetTo(usize),
    SetText(String),
    SetBias(Bias),
    Show,
    Explain,
    Ask(String),
    Help,
    Quit,
}

impl Command {
    /// Stable name for logs (never the argument payload).
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetDocument(_) => "doc",
            Command::SetTracked(_) => "pos",
            Command::Track { .. } => "track",
            Command::Untrack(_) => "untrack",
            Command::Insert { .. } => "insert",
            Command::Delete { .. } => "delete",
            Command::SetFrom(_) => "from",
            Command::SetTo(_) => "to",
            Command::SetText(_) => "text",
            Command::SetBias(_) => "bias",
            Command::Show => "show",
            Command::Explain => "explain",
            Command::Ask(_) => "ask",
            Command::Help => "help",
            Command::Quit => "quit",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplanationKind {
    Mapping,
    Question,
}

impl ExplanationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExplanationKind::Mapping => "mapping",
            ExplanationKind::Question => "question",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExplanationReply {
    /// Ticket issued with the request; higher tickets are newer.
    pub ticket: u64,
    pub kind: ExplanationKind,
    pub text: String,
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------

/// Trait implemented by any async event producer. Implementors usually hold configuration and
/// spawn one background task that pushes `Event`s into the shared channel. They must stop when
/// `tx.send(..).await` returns Err (channel closed) or on their own internal stop condition.
pub trait AsyncEventSource: Send + 'static {
    /// Human-readable stable identifier (used for logging / diagnostics).
    fn name(&self) -> &'static str;
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

/// Registry of event sources spawned together at startup.
pub struct EventSourceRegistry {
    sources: Vec<Box<dyn AsyncEventSource>>,
}

impl Default for EventSourceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSourceRegistry {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn register<S: AsyncEventSource>(&mut self, src: S) {
        self.sources.push(Box::new(src));
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Spawn all registered sources, returning their JoinHandles. Each source receives its own
    /// `Sender` clone; the registry is drained so a second call spawns nothing.
    pub fn spawn_all(&mut self, tx: &Sender<Event>) -> Vec<JoinHandle<()>> {
        let mut out = Vec::with_capacity(self.sources.len());
        for src in self.sources.drain(..) {
            let name = src.name();
            tracing::info!(target: "runtime.events", source = name, "spawning event source");
            out.push(src.spawn(tx.clone()));
        }
        out
    }
}
