//! Trigger detection and the dropdown session engine.
//!
//! `Engine` consumes `core_events::Event`s one at a time and drives the
//! session through Idle, Filtering and PlaceholderCollection. Every error is
//! recovered inside the engine: the session returns to Idle and the page sees
//! at most a closed dropdown.

use core_keymap::HotkeyError;
use thiserror::Error;

mod engine;
mod trigger;

pub use engine::{Engine, Outcome};
pub use trigger::check_text_trigger;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("surface detached from the document mid-session")]
    SurfaceUnavailable,
    #[error("surface rejected both in-place and full-text replacement")]
    SelectionUnsupported,
    #[error("no templates in the library")]
    EmptyLibrary,
    #[error("invalid trigger specification: {0}")]
    InvalidTrigger(#[from] HotkeyError),
}
