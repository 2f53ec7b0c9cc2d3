//! Periodic timers driving the run loop.

use std::time::Duration;

/// Identifies one interval registered with an [`IntervalTimer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

impl TimerHandle {
    pub fn id(self) -> u64 {
        self.0
    }
}

/// A host that can fire a callback periodically.
pub trait IntervalTimer {
    fn set_interval(&mut self, period: Duration) -> TimerHandle;
    /// Cancels `handle`; no firing is reported for it afterwards.
    fn clear_interval(&mut self, handle: TimerHandle);
}

#[derive(Clone, Copy, Debug)]
struct ActiveInterval {
    handle: TimerHandle,
    period: f64,
    last_fire: f64,
}

/// Interval timer for frame-driven hosts.
///
/// The host reports the current time once per frame through
/// [`FrameClock::advance`], which yields the handle when the next deadline
/// has passed. Deadlines stay on the `period` grid counted from the
/// registration time, so a frame that overshoots one does not delay the
/// following ones. At most one firing is reported per frame; when the clock
/// falls more than a period behind, the grid restarts at the current frame
/// instead of piling up ticks.
///
/// The interval counts from the last time seen by `advance`, so hosts
/// should advance the clock to the current time right before registering.
///
/// Only one interval is live at a time; registering a new one replaces
/// the previous interval.
#[derive(Debug, Default)]
pub struct FrameClock {
    next_id: u64,
    now: f64,
    active: Option<ActiveInterval>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves the clock to `now` (seconds) and returns the due handle, if any.
    pub fn advance(&mut self, now: f64) -> Option<TimerHandle> {
        self.now = now;
        let active = self.active.as_mut()?;
        if now - active.last_fire < active.period {
            return None;
        }
        active.last_fire += active.period;
        if now - active.last_fire >= active.period {
            active.last_fire = now;
        }
        Some(active.handle)
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Period of the live interval, in seconds.
    pub fn period(&self) -> Option<f64> {
        self.active.map(|a| a.period)
    }
}

impl IntervalTimer for FrameClock {
    fn set_interval(&mut self, period: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id);
        self.next_id += 1;
        self.active = Some(ActiveInterval {
            handle,
            period: period.as_secs_f64(),
            last_fire: self.now,
        });
        handle
    }

    fn clear_interval(&mut self, handle: TimerHandle) {
        if self.active.is_some_and(|a| a.handle == handle) {
            self.active = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_per_elapsed_period() {
        let mut clock = FrameClock::new();
        clock.advance(1.0);
        let h = clock.set_interval(Duration::from_millis(250));

        assert_eq!(clock.advance(1.125), None);
        assert_eq!(clock.advance(1.25), Some(h));
        assert_eq!(clock.advance(1.375), None);
        assert_eq!(clock.advance(1.5), Some(h));
    }

    #[test]
    fn slow_frames_report_a_single_firing() {
        let mut clock = FrameClock::new();
        let h = clock.set_interval(Duration::from_millis(10));

        assert_eq!(clock.advance(5.0), Some(h));
        assert_eq!(clock.advance(5.001), None);
        assert_eq!(clock.advance(5.02), Some(h));
    }

    #[test]
    fn overshooting_frames_keep_the_average_rate() {
        let mut clock = FrameClock::new();
        let h = clock.set_interval(Duration::from_secs_f64(1.0 / 40.0));

        let ticks = (1..=600)
            .filter(|frame| clock.advance(*frame as f64 / 60.0) == Some(h))
            .count();

        // 40 Hz for 10 s of 60 fps frames; the last deadline lands on the
        // final frame and may round either way.
        assert!((399..=400).contains(&ticks), "{ticks} ticks");
    }

    #[test]
    fn interval_counts_from_the_latest_frame() {
        let mut clock = FrameClock::new();
        clock.advance(0.5);
        clock.advance(100.0);
        let h = clock.set_interval(Duration::from_millis(250));

        assert_eq!(clock.advance(100.125), None);
        assert_eq!(clock.advance(100.25), Some(h));
    }

    #[test]
    fn cleared_interval_never_fires() {
        let mut clock = FrameClock::new();
        let h = clock.set_interval(Duration::from_millis(10));
        clock.clear_interval(h);

        assert!(!clock.is_active());
        assert_eq!(clock.advance(100.0), None);
    }

    #[test]
    fn clearing_a_stale_handle_keeps_the_live_one() {
        let mut clock = FrameClock::new();
        let old = clock.set_interval(Duration::from_millis(10));
        let new = clock.set_interval(Duration::from_millis(20));
        assert_ne!(old, new);

        clock.clear_interval(old);

        assert!(clock.is_active());
        assert_eq!(clock.period(), Some(0.02));
    }
}
