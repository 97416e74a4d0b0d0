use std::time::{Duration, Instant};
use tracing::trace;

/// Monotonic session generation. Bumped whenever the session is reset or
/// the active surface changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0.wrapping_add(1))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

/// Deferred work scheduled instead of blocking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FollowUp {
    /// Measure the caret box again once layout settled.
    RemeasureCaret,
    /// Return focus to the surface after leaving the form.
    RestoreFocus,
    /// Hide the empty-library indicator.
    CloseEmptyState,
}

impl FollowUp {
    fn name(self) -> &'static str {
        match self {
            FollowUp::RemeasureCaret => "remeasure_caret",
            FollowUp::RestoreFocus => "restore_focus",
            FollowUp::CloseEmptyState => "close_empty_state",
        }
    }
}

#[derive(Debug, Clone)]
struct Pending {
    task: FollowUp,
    due: Instant,
    generation: Generation,
}

/// Timer queue whose entries carry the generation they were scheduled
/// under. Entries from an older generation are dropped unrun.
#[derive(Debug, Default)]
pub struct FollowUpQueue {
    current: Generation,
    pending: Vec<Pending>,
}

impl FollowUpQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> Generation {
        self.current
    }

    /// Start a new generation. Everything scheduled before becomes stale.
    pub fn invalidate(&mut self) -> Generation {
        self.current = self.current.next();
        trace!(target: "session.followup", generation = self.current.get(), pending = self.pending.len(), "generation_bumped");
        self.current
    }

    pub fn schedule(&mut self, task: FollowUp, delay: Duration, now: Instant) {
        trace!(target: "session.followup", task = task.name(), delay_ms = delay.as_millis() as u64, generation = self.current.get(), "followup_scheduled");
        self.pending.push(Pending {
            task,
            due: now + delay,
            generation: self.current,
        });
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.pending.iter().map(|p| p.due).min()
    }

    /// Remove every entry due at `now` and return the live ones in due order.
    pub fn drain_due(&mut self, now: Instant) -> Vec<FollowUp> {
        let current = self.current;
        let (mut due, rest): (Vec<Pending>, Vec<Pending>) =
            self.pending.drain(..).partition(|p| p.due <= now);
        self.pending = rest;
        due.sort_by_key(|p| p.due);
        due.into_iter()
            .filter_map(|p| {
                if p.generation == current {
                    Some(p.task)
                } else {
                    trace!(
                        target: "session.followup",
                        task = p.task.name(),
                        scheduled = p.generation.get(),
                        current = current.get(),
                        "followup_stale_dropped"
                    );
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_only_due_entries_in_order() {
        let t0 = Instant::now();
        let mut q = FollowUpQueue::new();
        q.schedule(FollowUp::CloseEmptyState, Duration::from_millis(50), t0);
        q.schedule(FollowUp::RemeasureCaret, Duration::ZERO, t0);
        assert_eq!(q.next_due(), Some(t0));
        assert_eq!(q.drain_due(t0), vec![FollowUp::RemeasureCaret]);
        assert_eq!(q.len(), 1);
        assert!(q.drain_due(t0 + Duration::from_millis(10)).is_empty());
        assert_eq!(
            q.drain_due(t0 + Duration::from_millis(50)),
            vec![FollowUp::CloseEmptyState]
        );
        assert!(q.is_empty());
    }

    #[test]
    fn invalidate_makes_pending_entries_stale() {
        let t0 = Instant::now();
        let mut q = FollowUpQueue::new();
        let g0 = q.generation();
        q.schedule(FollowUp::RestoreFocus, Duration::ZERO, t0);
        let g1 = q.invalidate();
        assert!(g1 > g0);
        q.schedule(FollowUp::RemeasureCaret, Duration::ZERO, t0);
        assert_eq!(q.drain_due(t0), vec![FollowUp::RemeasureCaret]);
        assert!(q.is_empty());
    }
}
