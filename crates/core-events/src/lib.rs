//! Event types consumed by the session engine and the async source registry
//! that feeds them.

use core_config::Settings;
use core_surface::NodeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

pub const EVENT_CHANNEL_CAP: usize = 1024;

/// Sends that failed because the consumer went away.
pub static CHANNEL_SEND_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Top-level event enum consumed by the central event loop.
#[derive(Debug, Clone)]
pub enum Event {
    /// Something happened on the host page.
    Page(PageEvent),
    /// Interaction with the engine's own dropdown or placeholder form.
    Ui(UiEvent),
    Command(CommandEvent),
    /// Push notification from the settings provider.
    SettingsChanged(Settings),
    /// Periodic tick used to run due follow-ups.
    Tick,
    Shutdown,
}

/// Where focus or a pointer press landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusTarget {
    /// The engine's dropdown / form.
    OwnUi,
    Page(NodeId),
    Nowhere,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageEvent {
    KeyDown { target: NodeId, key: KeyEvent },
    /// The text content of `target` changed.
    Input { target: NodeId },
    /// The caret moved inside `target` without a text change.
    SelectionChange { target: NodeId },
    FocusOut { target: NodeId, related: FocusTarget },
    PointerDown { target: FocusTarget },
    /// Scroll or resize; caret geometry is stale.
    Layout,
}

impl PageEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            PageEvent::KeyDown { .. } => "key_down",
            PageEvent::Input { .. } => "input",
            PageEvent::SelectionChange { .. } => "selection_change",
            PageEvent::FocusOut { .. } => "focus_out",
            PageEvent::PointerDown { .. } => "pointer_down",
            PageEvent::Layout => "layout",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    /// Pointer selection of a dropdown row.
    PickItem(usize),
    /// Pointer hover over a dropdown row.
    HoverItem(usize),
    /// The active placeholder field's value changed.
    FieldInput(String),
    /// A placeholder field was clicked.
    FieldFocus(usize),
    /// Key pressed while the form has focus.
    KeyDown(KeyEvent),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandEvent {
    /// External show/toggle request (global hotkey, context action).
    Toggle,
    Quit,
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct ModMask: u8 {
        const CTRL  = 0b0000_0001;
        const ALT   = 0b0000_0010;
        const SHIFT = 0b0000_0100;
        const META  = 0b0000_1000;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamedKey {
    Enter,
    Esc,
    Backspace,
    Tab,
    F(u8),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
}

/// Logical key identity, independent of modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyToken {
    Char(char),
    Named(NamedKey),
}

impl KeyToken {
    /// Case-insensitive comparison for printable keys.
    pub fn same_key(&self, other: &KeyToken) -> bool {
        match (self, other) {
            (KeyToken::Char(a), KeyToken::Char(b)) => a.to_lowercase().eq(b.to_lowercase()),
            (a, b) => a == b,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyEvent {
    pub key: KeyToken,
    pub mods: ModMask,
}

impl KeyEvent {
    pub fn new(key: KeyToken, mods: ModMask) -> Self {
        Self { key, mods }
    }

    pub fn char(c: char) -> Self {
        Self::new(KeyToken::Char(c), ModMask::empty())
    }

    pub fn named(k: NamedKey) -> Self {
        Self::new(KeyToken::Named(k), ModMask::empty())
    }

    pub fn with_mods(mut self, mods: ModMask) -> Self {
        self.mods = mods;
        self
    }

    pub fn is(&self, k: NamedKey) -> bool {
        self.key == KeyToken::Named(k)
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}{:?}", self.key, self.mods)
    }
}

// -------------------------------------------------------------------------------------------------
// Async Event Sources
// -------------------------------------------------------------------------------------------------
// Each source owns its task lifecycle and must stop once the channel is closed. The bounded channel
// provides backpressure; the engine itself stays synchronous and only ever sees one event at a time.

/// Trait implemented by any async event producer.
pub trait AsyncEventSource: Send + 'static {
    /// Stable identifier used for logging.
    fn name(&self) -> &'static str;
    /// Consume self and spawn the background task.
    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()>;
}

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

    /// Spawn all registered sources. Each receives its own `Sender` clone; the
    /// caller drops its last sender during shutdown so sources observe the
    /// closed channel and exit.
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

/// Emits `Event::Tick` every interval so due follow-ups run without polling.
pub struct TickEventSource {
    interval: std::time::Duration,
}

impl TickEventSource {
    pub fn new(interval: std::time::Duration) -> Self {
        Self { interval }
    }
}

impl AsyncEventSource for TickEventSource {
    fn name(&self) -> &'static str {
        "tick"
    }

    fn spawn(self: Box<Self>, tx: Sender<Event>) -> JoinHandle<()> {
        let dur = self.interval;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(dur);
            loop {
                interval.tick().await;
                if tx.send(Event::Tick).await.is_err() {
                    CHANNEL_SEND_FAILURES.fetch_add(1, Ordering::Relaxed);
                    break;
                }
            }
        })
    }
}
