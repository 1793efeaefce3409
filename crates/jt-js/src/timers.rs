//! Timer registry: opaque ids mapped to scheduled callbacks.
//!
//! The registry never calls anything itself. The event loop asks for the
//! next due timer, releases its borrow, and then invokes the callback.

use std::collections::HashMap;
use std::time::Duration;
use std::time::Instant;
use uuid::Uuid;

/// Repeating timers never fire more often than this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

const MAX_DELAY_MS: f64 = u32::MAX as f64;

/// Fresh identifier handed to script code.
pub fn new_timer_id() -> String {
    Uuid::new_v4().to_string()
}

/// Converts a script delay in milliseconds; negative, NaN and missing delays are zero.
pub fn delay_from_millis(ms: Option<f64>) -> Duration {
    match ms {
        Some(ms) if ms.is_finite() && ms > 0.0 => {
            Duration::from_secs_f64(ms.min(MAX_DELAY_MS) / 1000.0)
        }
        Some(ms) if ms == f64::INFINITY => Duration::from_secs_f64(MAX_DELAY_MS / 1000.0),
        _ => Duration::ZERO,
    }
}

#[derive(Debug)]
struct TimerHandle<C> {
    interval: Option<Duration>,
    deadline: Instant,
    armed_seq: u64,
    callback: C,
}

/// Owns every live timer of one host context.
#[derive(Debug)]
pub struct TimerRegistry<C> {
    handles: HashMap<String, TimerHandle<C>>,
    next_seq: u64,
}

impl<C> Default for TimerRegistry<C> {
    fn default() -> Self {
        Self {
            handles: HashMap::new(),
            next_seq: 0,
        }
    }
}

impl<C: Clone> TimerRegistry<C> {
    /// Schedules `callback` at `requested + delay`. Re-arming an id replaces
    /// its previous handle.
    pub fn arm(&mut self, id: String, delay: Duration, repeats: bool, callback: C, requested: Instant) {
        let interval = repeats.then(|| delay.max(MIN_INTERVAL));
        let armed_seq = self.next_seq;
        self.next_seq += 1;
        self.handles.insert(
            id,
            TimerHandle {
                interval,
                deadline: requested + delay,
                armed_seq,
                callback,
            },
        );
    }

    /// Removes the handle; unknown ids are ignored.
    pub fn clear(&mut self, id: &str) -> bool {
        self.handles.remove(id).is_some()
    }

    /// Moves the deadline out to at least `until`.
    pub fn postpone(&mut self, id: &str, until: Instant) -> bool {
        match self.handles.get_mut(id) {
            Some(handle) => {
                handle.deadline = handle.deadline.max(until);
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.handles.values().map(|handle| handle.deadline).min()
    }

    /// Takes the earliest due timer (ties go to the one armed first).
    ///
    /// A one-shot handle is removed. A repeating one is rescheduled one
    /// interval after its previous deadline; ticks missed while the loop was
    /// busy are skipped, so the next one lands one interval after `now`.
    pub fn take_due(&mut self, now: Instant) -> Option<(String, C)> {
        let id = self
            .handles
            .iter()
            .filter(|(_, handle)| handle.deadline <= now)
            .min_by_key(|(_, handle)| (handle.deadline, handle.armed_seq))
            .map(|(id, _)| id.clone())?;

        let handle = self.handles.get_mut(&id)?;
        if let Some(interval) = handle.interval {
            let next = handle.deadline + interval;
            handle.deadline = if next <= now { now + interval } else { next };
            let callback = handle.callback.clone();
            return Some((id, callback));
        }
        let handle = self.handles.remove(&id)?;
        Some((id, handle.callback))
    }

    pub fn clear_all(&mut self) {
        self.handles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::TimerRegistry;
    use super::delay_from_millis;
    use super::new_timer_id;
    use proptest::prelude::*;
    use std::collections::HashSet;
    use std::time::Duration;
    use std::time::Instant;

    fn ms(value: u64) -> Duration {
        Duration::from_millis(value)
    }

    #[test]
    fn one_shot_fires_once_and_is_removed() {
        let start = Instant::now();
        let mut registry = TimerRegistry::default();
        registry.arm("a".to_owned(), ms(10), false, "cb", start);

        assert!(registry.take_due(start + ms(5)).is_none());
        assert_eq!(registry.take_due(start + ms(10)), Some(("a".to_owned(), "cb")));
        assert!(registry.take_due(start + ms(100)).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    fn late_repeating_timer_skips_missed_ticks() {
        let start = Instant::now();
        let mut registry = TimerRegistry::default();
        registry.arm("tick".to_owned(), ms(10), true, (), start);

        let mut fired = 0;
        while registry.take_due(start + ms(45)).is_some() {
            fired += 1;
        }
        assert_eq!(fired, 1);
        assert_eq!(registry.next_deadline(), Some(start + ms(55)));
        assert!(registry.clear("tick"));
        assert!(registry.take_due(start + ms(1_000)).is_none());
    }

    #[test]
    fn punctual_repeating_timer_keeps_its_cadence() {
        let start = Instant::now();
        let mut registry = TimerRegistry::default();
        registry.arm("tick".to_owned(), ms(10), true, (), start);

        assert!(registry.take_due(start + ms(12)).is_some());
        assert_eq!(registry.next_deadline(), Some(start + ms(20)));
    }

    #[test]
    fn zero_interval_is_clamped() {
        let start = Instant::now();
        let mut registry = TimerRegistry::default();
        registry.arm("spin".to_owned(), Duration::ZERO, true, (), start);

        assert!(registry.take_due(start).is_some());
        assert!(registry.take_due(start).is_none());
        assert_eq!(registry.next_deadline(), Some(start + ms(1)));
    }

    #[test]
    fn clear_is_idempotent_and_ignores_unknown_ids() {
        let start = Instant::now();
        let mut registry = TimerRegistry::default();
        registry.arm("a".to_owned(), ms(1), false, (), start);

        assert!(registry.clear("a"));
        assert!(!registry.clear("a"));
        assert!(!registry.clear("never-armed"));
    }

    #[test]
    fn equal_deadlines_fire_in_arming_order() {
        let start = Instant::now();
        let mut registry = TimerRegistry::default();
        for name in ["first", "second", "third"] {
            registry.arm(name.to_owned(), ms(5), false, name, start);
        }

        let order: Vec<&str> = std::iter::from_fn(|| registry.take_due(start + ms(5)))
            .map(|(_, callback)| callback)
            .collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn postpone_only_moves_deadlines_later() {
        let start = Instant::now();
        let mut registry = TimerRegistry::default();
        registry.arm("warm".to_owned(), ms(100), false, (), start);

        assert!(registry.postpone("warm", start + ms(50)));
        assert_eq!(registry.next_deadline(), Some(start + ms(100)));
        assert!(registry.postpone("warm", start + ms(300)));
        assert!(registry.take_due(start + ms(200)).is_none());
        assert!(registry.take_due(start + ms(300)).is_some());
        assert!(!registry.postpone("warm", start + ms(400)));
    }

    #[test]
    fn script_delays_are_sanitized() {
        assert_eq!(delay_from_millis(None), Duration::ZERO);
        assert_eq!(delay_from_millis(Some(f64::NAN)), Duration::ZERO);
        assert_eq!(delay_from_millis(Some(-20.0)), Duration::ZERO);
        assert_eq!(delay_from_millis(Some(1_500.0)), ms(1_500));
        assert!(delay_from_millis(Some(f64::INFINITY)) > ms(1_000_000));
    }

    proptest! {
        #[test]
        fn generated_ids_are_unique(count in 1_usize..200) {
            let ids: HashSet<String> = (0..count).map(|_| new_timer_id()).collect();
            prop_assert_eq!(ids.len(), count);
        }

        #[test]
        fn repeating_timer_fires_at_least_elapsed_over_delay(delay in 1_u64..50, elapsed in 0_u64..500) {
            let start = Instant::now();
            let mut registry = TimerRegistry::default();
            registry.arm("r".to_owned(), ms(delay), true, (), start);

            let mut fired = 0_u64;
            for now in 0..=elapsed {
                while registry.take_due(start + ms(now)).is_some() {
                    fired += 1;
                }
            }
            prop_assert!(fired >= elapsed / delay);
        }

        #[test]
        fn one_shot_never_fires_twice(delay in 0_u64..100, probes in proptest::collection::vec(0_u64..300, 1..20)) {
            let start = Instant::now();
            let mut registry = TimerRegistry::default();
            registry.arm("once".to_owned(), ms(delay), false, (), start);

            let mut sorted = probes;
            sorted.sort_unstable();
            let fired = sorted
                .into_iter()
                .filter(|probe| registry.take_due(start + ms(*probe)).is_some())
                .count();
            prop_assert!(fired <= 1);
            prop_assert_eq!(registry.is_empty(), fired == 1);
        }
    }
}
