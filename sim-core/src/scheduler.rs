//! Start/stop state machine that drives the engine at a fixed rate.
//!
//! A [`Scheduler`] owns the engine, the interval timer and the
//! [`RunState`]. The timer handle lives inside [`RunState::Running`], so
//! "a timer is active" and "the run is active" cannot disagree.
//!
//! Transitions:
//! - [`Scheduler::start`] — `Idle → Running` after the snapshot passes
//!   [`Snapshot::validate`] and the engine has been configured.
//! - [`Scheduler::tick`] — `Running → Running`, or `Running → Idle` when the
//!   engine reports that it finished.
//! - [`Scheduler::stop`] — `Running → Idle`.
//! - [`Scheduler::clear`] — wipes engine data without touching the state.

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::adapter::{apply_configuration, apply_duration_minutes, apply_speed};
use crate::config::{Snapshot, ValidationError};
use crate::engine::{EngineError, SimulationEngine};
use crate::timer::{FrameClock, IntervalTimer, TimerHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running(TimerHandle),
}

impl RunState {
    pub fn is_running(&self) -> bool {
        matches!(self, RunState::Running(_))
    }
}

/// The action button the surface shows for a given state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActionControl {
    Start,
    Stop,
}

impl ActionControl {
    pub fn label(self) -> &'static str {
        match self {
            ActionControl::Start => "▶ Start",
            ActionControl::Stop => "⏹ Stop",
        }
    }
}

pub fn visible_control(state: &RunState) -> ActionControl {
    match state {
        RunState::Idle => ActionControl::Start,
        RunState::Running(_) => ActionControl::Stop,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A run was already active; nothing was done.
    AlreadyRunning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The engine advanced one step and keeps running.
    Stepped,
    /// The engine advanced and reported that it finished; the run stopped.
    Finished,
    /// No run matches the handle; the tick was dropped.
    Ignored,
}

/// The user's answer to a destructive-action prompt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Confirmation {
    Accepted,
    Declined,
}

/// An edit to a field that may change while a run is active.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LiveEdit {
    Speed(f64),
    DurationMinutes(f64),
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

pub struct Scheduler<E, T> {
    engine: E,
    timer: T,
    state: RunState,
}

impl<E: SimulationEngine, T: IntervalTimer> Scheduler<E, T> {
    pub fn new(engine: E, timer: T) -> Self {
        Self {
            engine,
            timer,
            state: RunState::Idle,
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state.is_running()
    }

    pub fn visible_control(&self) -> ActionControl {
        visible_control(&self.state)
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Starts a run with `snapshot`.
    ///
    /// Refused snapshots and engine failures leave the scheduler idle. When
    /// a run is already active the call is a no-op and the engine is not
    /// touched.
    pub fn start(&mut self, snapshot: &Snapshot) -> Result<StartOutcome, StartError> {
        if self.state.is_running() {
            debug!("start ignored, already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        let params = snapshot.validate().inspect_err(|e| {
            warn!("start refused: {e}");
        })?;
        apply_configuration(&mut self.engine, &params).inspect_err(|e| {
            warn!("start aborted, engine partially configured: {e}");
        })?;

        let handle = self.timer.set_interval(params.sample_period);
        self.state = RunState::Running(handle);

        info!(
            frequency = params.frequency,
            dimensions = params.dimensionality.as_u8(),
            "run started"
        );
        Ok(StartOutcome::Started)
    }

    /// Handles one firing of the interval registered under `handle`.
    pub fn tick(&mut self, handle: TimerHandle) -> TickOutcome {
        if self.state != RunState::Running(handle) {
            return TickOutcome::Ignored;
        }

        self.engine.draw();
        if self.engine.is_finished() {
            info!("engine finished");
            self.stop();
            TickOutcome::Finished
        } else {
            TickOutcome::Stepped
        }
    }

    /// Stops the active run. Does nothing when idle.
    pub fn stop(&mut self) {
        if let RunState::Running(handle) = self.state {
            self.timer.clear_interval(handle);
            self.state = RunState::Idle;
            info!("run stopped");
        }
    }

    /// Wipes the engine's data if the user confirmed.
    ///
    /// The run state is left alone: an active run keeps ticking against
    /// the emptied engine.
    pub fn clear(&mut self, confirmation: Confirmation) -> bool {
        match confirmation {
            Confirmation::Declined => false,
            Confirmation::Accepted => {
                warn!(running = self.state.is_running(), "clearing engine data");
                self.engine.clear();
                true
            }
        }
    }

    /// Forwards a live edit to the engine while a run is active.
    ///
    /// Returns `Ok(false)` when nothing was forwarded, either because the
    /// scheduler is idle (the next start pushes the value) or because the
    /// value is not a finite non-negative number.
    pub fn apply_live_edit(&mut self, edit: LiveEdit) -> Result<bool, EngineError> {
        if !self.state.is_running() {
            return Ok(false);
        }

        let value = match edit {
            LiveEdit::Speed(v) | LiveEdit::DurationMinutes(v) => v,
        };
        if !value.is_finite() || value < 0.0 {
            warn!(?edit, "live edit ignored");
            return Ok(false);
        }

        match edit {
            LiveEdit::Speed(speed) => apply_speed(&mut self.engine, speed)?,
            LiveEdit::DurationMinutes(minutes) => apply_duration_minutes(&mut self.engine, minutes)?,
        }
        debug!(?edit, "live edit forwarded");
        Ok(true)
    }
}

impl<E: SimulationEngine> Scheduler<E, FrameClock> {
    /// Moves the frame clock to `now` (seconds) and runs the due tick, if any.
    pub fn advance(&mut self, now: f64) -> Option<TickOutcome> {
        let handle = self.timer.advance(now)?;
        Some(self.tick(handle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::fake::{Call, RecordingEngine};
    use std::collections::HashSet;
    use std::time::Duration;

    /// Timer that remembers which intervals are live.
    #[derive(Debug, Default)]
    struct ManualTimer {
        live: HashSet<TimerHandle>,
        periods: Vec<Duration>,
        clock: FrameClock,
    }

    impl IntervalTimer for ManualTimer {
        fn set_interval(&mut self, period: Duration) -> TimerHandle {
            self.periods.push(period);
            let handle = self.clock.set_interval(period);
            self.live.insert(handle);
            handle
        }

        fn clear_interval(&mut self, handle: TimerHandle) {
            self.live.remove(&handle);
            self.clock.clear_interval(handle);
        }
    }

    fn scheduler() -> Scheduler<RecordingEngine, ManualTimer> {
        Scheduler::new(RecordingEngine::default(), ManualTimer::default())
    }

    fn handle_of(s: &Scheduler<RecordingEngine, ManualTimer>) -> TimerHandle {
        match s.state() {
            RunState::Running(h) => h,
            RunState::Idle => panic!("not running"),
        }
    }

    #[test]
    fn invalid_snapshots_stay_idle_without_engine_calls() {
        let invalid = [
            Snapshot {
                iterations_per_second: 0.0,
                ..Snapshot::default()
            },
            Snapshot {
                frequency: 0.0,
                ..Snapshot::default()
            },
            Snapshot {
                dimensionality: 0.0,
                ..Snapshot::default()
            },
            Snapshot {
                dimensionality: 4.0,
                ..Snapshot::default()
            },
        ];

        for snap in invalid {
            let mut s = scheduler();
            let err = s.start(&snap).unwrap_err();

            assert!(matches!(err, StartError::Validation(_)));
            assert_eq!(s.state(), RunState::Idle);
            assert!(s.engine().calls.is_empty());
            assert!(s.timer().live.is_empty());
            assert_eq!(s.visible_control(), ActionControl::Start);
        }
    }

    #[test]
    fn start_runs_once_and_is_idempotent() {
        let mut s = scheduler();
        let snap = Snapshot::default();

        assert_eq!(s.start(&snap).unwrap(), StartOutcome::Started);
        let calls_after_first = s.engine().calls.len();

        assert_eq!(s.start(&snap).unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(s.start(&snap).unwrap(), StartOutcome::AlreadyRunning);

        assert!(s.is_running());
        assert_eq!(s.timer().live.len(), 1);
        assert_eq!(s.engine().calls.len(), calls_after_first);
        assert_eq!(s.visible_control(), ActionControl::Stop);
    }

    #[test]
    fn unschedulable_frequency_is_refused_before_the_engine() {
        let mut s = scheduler();
        let snap = Snapshot {
            frequency: 1e-20,
            ..Snapshot::default()
        };

        let err = s.start(&snap).unwrap_err();

        assert!(matches!(
            err,
            StartError::Validation(ValidationError::FrequencyTooLow(_))
        ));
        assert_eq!(s.state(), RunState::Idle);
        assert!(s.engine().calls.is_empty());
        assert!(s.timer().periods.is_empty());
    }

    #[test]
    fn timer_period_follows_frequency() {
        let mut s = scheduler();
        let snap = Snapshot {
            frequency: 4.0,
            ..Snapshot::default()
        };
        s.start(&snap).unwrap();

        assert_eq!(s.timer().periods, vec![Duration::from_millis(250)]);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut s = scheduler();
        s.stop();
        s.stop();
        assert_eq!(s.state(), RunState::Idle);
        assert!(s.engine().calls.is_empty());

        s.start(&Snapshot::default()).unwrap();
        s.stop();
        let calls = s.engine().calls.clone();
        s.stop();

        assert_eq!(s.state(), RunState::Idle);
        assert!(s.timer().live.is_empty());
        assert_eq!(s.engine().calls, calls);
        assert_eq!(s.visible_control(), ActionControl::Start);
    }

    #[test]
    fn tick_draws_then_checks_for_the_end() {
        let mut s = Scheduler::new(
            RecordingEngine {
                finish_after: Some(2),
                ..RecordingEngine::default()
            },
            ManualTimer::default(),
        );
        s.start(&Snapshot::default()).unwrap();
        let h = handle_of(&s);

        assert_eq!(s.tick(h), TickOutcome::Stepped);
        assert_eq!(s.tick(h), TickOutcome::Finished);

        assert_eq!(s.state(), RunState::Idle);
        assert!(s.timer().live.is_empty());
        assert_eq!(s.engine().draws, 2);
    }

    #[test]
    fn stale_handles_do_not_step() {
        let mut s = scheduler();
        s.start(&Snapshot::default()).unwrap();
        let old = handle_of(&s);
        s.stop();

        assert_eq!(s.tick(old), TickOutcome::Ignored);

        s.start(&Snapshot::default()).unwrap();
        assert_ne!(handle_of(&s), old);
        assert_eq!(s.tick(old), TickOutcome::Ignored);
        assert_eq!(s.engine().draws, 0);
    }

    #[test]
    fn adapter_failure_aborts_start() {
        let mut s = Scheduler::new(
            RecordingEngine {
                fail_on: Some("dimensions"),
                ..RecordingEngine::default()
            },
            ManualTimer::default(),
        );

        let err = s.start(&Snapshot::default()).unwrap_err();

        assert!(matches!(err, StartError::Engine(_)));
        assert_eq!(s.state(), RunState::Idle);
        assert!(s.timer().periods.is_empty());
    }

    #[test]
    fn declined_clear_changes_nothing() {
        let mut s = scheduler();
        s.start(&Snapshot::default()).unwrap();
        let state = s.state();
        let calls = s.engine().calls.clone();

        assert!(!s.clear(Confirmation::Declined));

        assert_eq!(s.state(), state);
        assert_eq!(s.engine().calls, calls);
    }

    #[test]
    fn accepted_clear_keeps_the_run_going() {
        let mut s = scheduler();
        s.start(&Snapshot::default()).unwrap();
        let h = handle_of(&s);

        assert!(s.clear(Confirmation::Accepted));

        assert_eq!(s.engine().calls.last(), Some(&Call::Clear));
        assert_eq!(s.state(), RunState::Running(h));
        assert_eq!(s.tick(h), TickOutcome::Stepped);
    }

    #[test]
    fn live_edits_reach_the_engine_only_while_running() {
        let mut s = scheduler();
        assert_eq!(s.apply_live_edit(LiveEdit::Speed(3.0)), Ok(false));
        assert!(s.engine().calls.is_empty());

        s.start(&Snapshot::default()).unwrap();
        assert_eq!(s.apply_live_edit(LiveEdit::Speed(3.0)), Ok(true));
        assert_eq!(s.apply_live_edit(LiveEdit::DurationMinutes(2.0)), Ok(true));
        assert_eq!(s.apply_live_edit(LiveEdit::Speed(f64::NAN)), Ok(false));

        let calls = &s.engine().calls;
        assert_eq!(calls[calls.len() - 2], Call::Speed(3.0));
        assert_eq!(calls[calls.len() - 1], Call::Time(120.0));
    }

    #[test]
    fn frame_clock_drives_ticks() {
        let mut s = Scheduler::new(RecordingEngine::default(), FrameClock::new());
        assert_eq!(s.advance(0.0), None);

        let snap = Snapshot {
            frequency: 2.0,
            ..Snapshot::default()
        };
        s.start(&snap).unwrap();

        assert_eq!(s.advance(0.25), None);
        assert_eq!(s.advance(0.5), Some(TickOutcome::Stepped));
        s.stop();
        assert_eq!(s.advance(10.0), None);
        assert_eq!(s.engine().draws, 1);
    }
}
