use super::{Engine, Outcome};
use crate::EngineError;
use core_events::{KeyEvent, ModMask, NamedKey};
use core_state::FollowUp;
use core_surface::Document;
use std::time::Instant;
use tracing::debug;

impl Engine {
    pub(super) fn list_key(&mut self, doc: &mut Document, key: KeyEvent, now: Instant) -> Result<Outcome, EngineError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(Outcome::ignored());
        };
        if key.is(NamedKey::Down) {
            session.select_next();
        } else if key.is(NamedKey::Up) {
            session.select_previous();
        } else if key.is(NamedKey::Enter) || key.is(NamedKey::Tab) {
            if session.selected().is_none() {
                // Nothing to pick; let the page keep the key.
                return Ok(Outcome::ignored());
            }
            return self.choose_selected(doc, now);
        } else if key.is(NamedKey::Esc) {
            self.dismiss(doc);
        } else {
            return Ok(Outcome::ignored());
        }
        Ok(Outcome::consumed())
    }

    pub(super) fn form_key(&mut self, doc: &mut Document, key: KeyEvent, now: Instant) -> Result<Outcome, EngineError> {
        let shift = key.mods.contains(ModMask::SHIFT);
        let Some(ph) = self.session.as_mut().and_then(|s| s.placeholder.as_mut()) else {
            return Ok(Outcome::ignored());
        };
        if (key.is(NamedKey::Tab) && !shift) || key.is(NamedKey::Down) {
            ph.next();
        } else if (key.is(NamedKey::Tab) && shift) || key.is(NamedKey::Up) {
            ph.previous();
        } else if key.is(NamedKey::Enter) {
            let content = ph.finalize();
            self.insert(doc, &content, now)?;
        } else if key.is(NamedKey::Esc) {
            if let Some(s) = self.session.as_mut() {
                s.back_to_filtering(&self.settings.prompts);
            }
            debug!(target: "session", "placeholder_form_back");
            self.followups.schedule(
                FollowUp::RestoreFocus,
                self.settings.engine.focus_restore_delay(),
                now,
            );
        } else {
            return Ok(Outcome::ignored());
        }
        Ok(Outcome::consumed())
    }

    /// Act on the selected row: open the placeholder form, or insert right
    /// away when the template has no placeholders.
    pub(super) fn choose_selected(&mut self, doc: &mut Document, now: Instant) -> Result<Outcome, EngineError> {
        let Some(session) = self.session.as_mut() else {
            return Ok(Outcome::ignored());
        };
        let Some(template) = session.selected().cloned() else {
            return Ok(Outcome::ignored());
        };
        if session.begin_placeholders() {
            debug!(
                target: "session",
                template = %template.id,
                placeholders = session.placeholder.as_ref().map_or(0, |p| p.placeholders().len()),
                "placeholder_form_opened"
            );
            return Ok(Outcome::consumed());
        }
        self.insert(doc, &template.content, now)?;
        Ok(Outcome::consumed())
    }
}
