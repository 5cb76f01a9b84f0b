//! Per-key debouncing of file change notifications.
//!
//! Producers often rewrite a file in several steps (truncate, write, rename),
//! each firing its own OS event. The debouncer holds the latest action for a
//! key and only releases it once the key has been quiet for the window.
//!
//! Time is passed in explicitly; the owner decides when to call
//! [`Debouncer::take_due`].

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// Default quiet period before a key's action runs.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

#[derive(Debug)]
struct Pending<A> {
    due: Instant,
    action: A,
}

/// Coalesces actions per key. Last scheduled action wins.
#[derive(Debug)]
pub struct Debouncer<K, A> {
    window: Duration,
    pending: HashMap<K, Pending<A>>,
}

impl<K: Eq + Hash + Clone, A> Debouncer<K, A> {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: HashMap::new(),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedule `action` for `key`, replacing and restarting any pending one.
    ///
    /// Returns `true` if an earlier action for the key was superseded.
    pub fn schedule(&mut self, key: K, action: A, now: Instant) -> bool {
        self.pending
            .insert(
                key,
                Pending {
                    due: now + self.window,
                    action,
                },
            )
            .is_some()
    }

    /// Remove and return every action whose quiet period has elapsed,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, A)> {
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.due <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut due: Vec<(Instant, K, A)> = due_keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (p.due, k, p.action)))
            .collect();
        due.sort_by_key(|(at, _, _)| *at);

        due.into_iter().map(|(_, k, a)| (k, a)).collect()
    }

    /// When the next pending action becomes due, if any.
    pub fn next_due(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.due).min()
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drop every pending action. Returns how many were cancelled.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.pending.len();
        self.pending.clear();
        cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_burst_collapses_to_one_action() {
        let start = Instant::now();
        let mut d = Debouncer::new(ms(200));

        for i in 0..10u64 {
            d.schedule("team.json", i, start + ms(i * 10));
        }

        // Still inside the window of the last schedule
        assert!(d.take_due(start + ms(250)).is_empty());

        let fired = d.take_due(start + ms(290));
        assert_eq!(fired, vec![("team.json", 9)]);
        assert!(d.is_empty());
    }

    #[test]
    fn test_last_write_wins() {
        let start = Instant::now();
        let mut d = Debouncer::new(ms(100));
        assert!(!d.schedule("k", "first", start));
        assert!(d.schedule("k", "second", start + ms(10)));

        let fired = d.take_due(start + ms(500));
        assert_eq!(fired, vec![("k", "second")]);
    }

    #[test]
    fn test_reschedule_restarts_window() {
        let start = Instant::now();
        let mut d = Debouncer::new(ms(100));
        d.schedule("k", 1, start);
        d.schedule("k", 2, start + ms(90));

        assert!(d.take_due(start + ms(150)).is_empty());
        assert_eq!(d.take_due(start + ms(190)), vec![("k", 2)]);
    }

    #[test]
    fn test_keys_are_independent() {
        let start = Instant::now();
        let mut d = Debouncer::new(ms(100));
        d.schedule("a", 1, start);
        d.schedule("b", 2, start + ms(50));

        assert_eq!(d.take_due(start + ms(100)), vec![("a", 1)]);
        assert!(d.is_pending(&"b"));
        assert_eq!(d.take_due(start + ms(150)), vec![("b", 2)]);
    }

    #[test]
    fn test_due_actions_ordered_by_deadline() {
        let start = Instant::now();
        let mut d = Debouncer::new(ms(100));
        d.schedule("late", 2, start + ms(30));
        d.schedule("early", 1, start);

        let fired = d.take_due(start + ms(1000));
        assert_eq!(fired, vec![("early", 1), ("late", 2)]);
    }

    #[test]
    fn test_next_due_and_cancel_all() {
        let start = Instant::now();
        let mut d = Debouncer::new(ms(100));
        assert!(d.next_due().is_none());

        d.schedule("a", (), start + ms(20));
        d.schedule("b", (), start);
        assert_eq!(d.next_due(), Some(start + ms(100)));

        assert_eq!(d.cancel_all(), 2);
        assert!(d.take_due(start + ms(1000)).is_empty());
    }
}
