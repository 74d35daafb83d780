use std::fmt;
use std::time::Duration;

pub const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running,
    Paused,
}

impl fmt::Display for TimerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerState::Idle => "idle",
            TimerState::Running => "running",
            TimerState::Paused => "paused",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    Start,
    Pause,
    Resume,
    Stop,
}

impl fmt::Display for TimerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TimerAction::Start => "start",
            TimerAction::Pause => "pause",
            TimerAction::Resume => "resume",
            TimerAction::Stop => "stop",
        })
    }
}

#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerError {
    #[error("cannot {action} the timer while it is {state}")]
    InvalidTransition {
        action: TimerAction,
        state: TimerState,
    },
}

/// Focus stopwatch. Stats side effects are left to the caller; each
/// transition only reports whether it happened.
#[derive(Debug, Clone)]
pub struct FocusTimer {
    state: TimerState,
    elapsed_seconds: u64,
}

impl Default for FocusTimer {
    fn default() -> Self {
        FocusTimer {
            state: TimerState::Idle,
            elapsed_seconds: 0,
        }
    }
}

impl FocusTimer {
    pub fn state(&self) -> TimerState {
        self.state
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_seconds
    }

    pub fn start(&mut self) -> Result<(), TimerError> {
        self.transition(TimerAction::Start, &[TimerState::Idle], TimerState::Running)
    }

    /// Counts as a lap.
    pub fn pause(&mut self) -> Result<(), TimerError> {
        self.transition(TimerAction::Pause, &[TimerState::Running], TimerState::Paused)
    }

    pub fn resume(&mut self) -> Result<(), TimerError> {
        self.transition(TimerAction::Resume, &[TimerState::Paused], TimerState::Running)
    }

    /// Counts as a reset and zeroes the elapsed time.
    pub fn stop(&mut self) -> Result<(), TimerError> {
        self.transition(
            TimerAction::Stop,
            &[TimerState::Running, TimerState::Paused],
            TimerState::Idle,
        )?;
        self.elapsed_seconds = 0;
        Ok(())
    }

    /// Advance one second. Returns whether the second was counted.
    pub fn tick(&mut self) -> bool {
        if self.state == TimerState::Running {
            self.elapsed_seconds += 1;
            true
        } else {
            false
        }
    }

    fn transition(
        &mut self,
        action: TimerAction,
        from: &[TimerState],
        to: TimerState,
    ) -> Result<(), TimerError> {
        if !from.contains(&self.state) {
            return Err(TimerError::InvalidTransition {
                action,
                state: self.state,
            });
        }
        self.state = to;
        Ok(())
    }
}

pub fn format_elapsed(seconds: u64) -> String {
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn pause_keeps_elapsed_and_stop_clears_it() {
        let mut timer = FocusTimer::default();
        timer.start().unwrap();
        for _ in 0..3 {
            assert!(timer.tick());
        }
        timer.pause().unwrap();
        assert_eq!(timer.elapsed_seconds(), 3);
        assert!(!timer.tick());
        timer.resume().unwrap();
        timer.tick();
        assert_eq!(timer.elapsed_seconds(), 4);
        timer.stop().unwrap();
        assert_eq!(timer.state(), TimerState::Idle);
        assert_eq!(timer.elapsed_seconds(), 0);
    }

    #[test]
    fn stop_from_paused() {
        let mut timer = FocusTimer::default();
        timer.start().unwrap();
        timer.pause().unwrap();
        assert!(timer.stop().is_ok());
    }

    #[test]
    fn invalid_transitions_are_refused() {
        let mut timer = FocusTimer::default();
        assert_eq!(
            timer.pause(),
            Err(TimerError::InvalidTransition {
                action: TimerAction::Pause,
                state: TimerState::Idle
            })
        );
        assert!(timer.stop().is_err());
        assert!(timer.resume().is_err());
        timer.start().unwrap();
        assert!(timer.start().is_err());
        assert!(timer.resume().is_err());
    }

    #[test]
    fn idle_timer_does_not_count() {
        let mut timer = FocusTimer::default();
        assert!(!timer.tick());
        assert_eq!(timer.elapsed_seconds(), 0);
    }

    #[test]
    fn elapsed_formatting() {
        assert_eq!(format_elapsed(59), "00:59");
        assert_eq!(format_elapsed(61), "01:01");
        assert_eq!(format_elapsed(3725), "1:02:05");
    }
}
