use super::{Dismissed, Engine};
use crate::{EngineError, check_text_trigger};
use core_surface::{Document, EditableSurface, SurfaceError};
use core_text::{char_len, collapse_newlines, replace_chars, slice_chars};
use std::time::Instant;
use tracing::{debug, info};

impl Engine {
    /// Replace the session span with `content` and return to Idle.
    ///
    /// The span is `[replace_start, last_cursor_offset]`; text trigger
    /// sessions therefore also remove the trigger token. In-place
    /// `replace_range` is tried first, then a full `set_text`. The session is
    /// gone afterwards whatever the result.
    pub(super) fn insert(&mut self, doc: &mut Document, content: &str, now: Instant) -> Result<(), EngineError> {
        let (Some(session), Some(surface)) = (self.session.take(), self.surface.take()) else {
            return Ok(());
        };
        self.followups.invalidate();
        if !surface.is_live(doc) {
            return Err(EngineError::SurfaceUnavailable);
        }
        let content = if surface.is_single_line(doc) {
            collapse_newlines(content)
        } else {
            content.to_string()
        };
        let start = session.replace_start();
        let end = session.last_cursor_offset;

        surface.focus(doc);
        let caret = match surface.replace_range(doc, start, end, &content) {
            Ok(caret) => caret,
            Err(SurfaceError::Unavailable) => return Err(EngineError::SurfaceUnavailable),
            Err(e) => {
                debug!(target: "engine.insert", error = %e, surface = %surface.kind(), "replace_range_fallback");
                replace_whole(doc, surface.as_ref(), start, end, &content)?
            }
        };
        surface.notify_changed(doc);

        let root = surface.root();
        self.guard = Some((root, now + self.settings.engine.insert_guard()));
        // A trigger token inside the inserted text must not reopen the list
        // on the next keystroke.
        if let Some(text) = surface.text(doc)
            && let Some(occurrence) = check_text_trigger(&text, caret, &self.settings.text_trigger)
            && occurrence >= start
        {
            let prefix_end = occurrence + char_len(&self.settings.text_trigger);
            self.dismissed = Some(Dismissed {
                root,
                occurrence,
                prefix: slice_chars(&text, 0, prefix_end).to_string(),
            });
        }
        info!(
            target: "engine.insert",
            kind = ?session.trigger_kind,
            surface = %surface.kind(),
            start,
            end,
            inserted_chars = char_len(&content),
            caret,
            "template_inserted"
        );
        Ok(())
    }
}

fn replace_whole(
    doc: &mut Document,
    surface: &dyn EditableSurface,
    start: usize,
    end: usize,
    content: &str,
) -> Result<usize, EngineError> {
    let text = surface.text(doc).ok_or(EngineError::SurfaceUnavailable)?;
    let end = end.min(char_len(&text));
    let start = start.min(end);
    let updated = replace_chars(&text, start, end, content);
    surface
        .set_text(doc, &updated)
        .map_err(|_| EngineError::SelectionUnsupported)?;
    surface
        .set_cursor_offset(doc, start + char_len(content))
        .map_err(|_| EngineError::SelectionUnsupported)
}
