//! Debounced change notification.
//!
//! Reconciliation passes record which items changed; the host drains the
//! scheduler from its idle loop. Each new burst of changes cancels the
//! pending deadline and schedules a fresh one, so a run of rapid container
//! events collapses into a single save and a single UI refresh.

use std::collections::BTreeSet;

use contracts::ItemKey;

/// One coalesced flush: persist everything, then tell the UI which items
/// moved. `changed` may be empty when only the category order was touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlushSignal {
    pub changed: BTreeSet<ItemKey>,
}

#[derive(Debug, Clone)]
pub struct FlushScheduler {
    pending: BTreeSet<ItemKey>,
    deadline: Option<u64>,
    debounce_ticks: u64,
}

impl FlushScheduler {
    pub fn new(debounce_ticks: u64) -> Self {
        Self {
            pending: BTreeSet::new(),
            deadline: None,
            debounce_ticks,
        }
    }

    /// Records changed items and (re)arms the debounce deadline.
    pub fn schedule(&mut self, changed: BTreeSet<ItemKey>, now: u64) {
        self.pending.extend(changed);
        self.arm(now);
    }

    /// Marks state dirty without naming changed items (order-only edits).
    pub fn mark_dirty(&mut self, now: u64) {
        self.arm(now);
    }

    /// Fires at most once per burst: returns the coalesced signal when the
    /// deadline has passed, clearing all pending state.
    pub fn poll(&mut self, now: u64) -> Option<FlushSignal> {
        let deadline = self.deadline?;
        if now < deadline {
            return None;
        }
        self.deadline = None;
        Some(FlushSignal {
            changed: std::mem::take(&mut self.pending),
        })
    }

    pub fn has_pending(&self) -> bool {
        self.deadline.is_some()
    }

    fn arm(&mut self, now: u64) {
        self.deadline = Some(now.saturating_add(self.debounce_ticks));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(ids: &[i32]) -> BTreeSet<ItemKey> {
        ids.iter().map(|id| ItemKey::new(*id, "Default")).collect()
    }

    #[test]
    fn quiet_scheduler_never_fires() {
        let mut scheduler = FlushScheduler::new(2);
        assert!(!scheduler.has_pending());
        assert_eq!(scheduler.poll(100), None);
    }

    #[test]
    fn fires_once_after_deadline_and_clears() {
        let mut scheduler = FlushScheduler::new(2);
        scheduler.schedule(keys(&[42]), 1);

        assert_eq!(scheduler.poll(2), None);
        let signal = scheduler.poll(3).expect("deadline passed");
        assert_eq!(signal.changed, keys(&[42]));
        assert_eq!(scheduler.poll(4), None);
        assert!(!scheduler.has_pending());
    }

    #[test]
    fn rescheduling_pushes_the_deadline_and_coalesces() {
        let mut scheduler = FlushScheduler::new(2);
        scheduler.schedule(keys(&[1]), 1);
        scheduler.schedule(keys(&[2]), 2);
        scheduler.schedule(keys(&[3]), 3);

        // Old deadlines were cancelled by the rapid follow-ups.
        assert_eq!(scheduler.poll(4), None);
        let signal = scheduler.poll(5).expect("final deadline passed");
        assert_eq!(signal.changed, keys(&[1, 2, 3]));
    }

    #[test]
    fn dirty_without_changed_items_still_fires() {
        let mut scheduler = FlushScheduler::new(0);
        scheduler.mark_dirty(7);
        let signal = scheduler.poll(7).expect("zero debounce fires immediately");
        assert!(signal.changed.is_empty());
    }
}
