//! Level/timer state machine
//!
//! `Idle -> Running(level, seconds) -> Ended`. Starting is triggered from
//! outside (the server starts the match once enough sessions are
//! connected); `Ended` only leaves through [`MatchTimer::reset`].

use crate::config::LevelConfig;
use log::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Idle,
    Running {
        level_index: usize,
        seconds_remaining: u32,
    },
    Ended,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerEvent {
    Tick { seconds_remaining: u32 },
    LevelUp { new_level_index: usize },
    MatchOver,
}

pub struct MatchTimer {
    state: MatchState,
    durations: Vec<u32>,
}

impl MatchTimer {
    pub fn new(levels: &[LevelConfig]) -> Self {
        Self {
            state: MatchState::Idle,
            durations: levels.iter().map(|level| level.duration_secs).collect(),
        }
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, MatchState::Running { .. })
    }

    pub fn is_ended(&self) -> bool {
        self.state == MatchState::Ended
    }

    /// Level whose configuration currently applies. Before the match it is
    /// the first level, after it the last one.
    pub fn level_index(&self) -> usize {
        match self.state {
            MatchState::Idle => 0,
            MatchState::Running { level_index, .. } => level_index,
            MatchState::Ended => self.durations.len().saturating_sub(1),
        }
    }

    pub fn seconds_remaining(&self) -> u32 {
        match self.state {
            MatchState::Idle => self.durations.first().copied().unwrap_or(0),
            MatchState::Running {
                seconds_remaining, ..
            } => seconds_remaining,
            MatchState::Ended => 0,
        }
    }

    /// `Idle -> Running` at the first level. Returns false in any other state.
    pub fn start(&mut self) -> bool {
        if self.state != MatchState::Idle {
            return false;
        }
        let Some(&duration) = self.durations.first() else {
            return false;
        };

        info!("Match started: level 0 ({}s)", duration);
        self.state = MatchState::Running {
            level_index: 0,
            seconds_remaining: duration,
        };
        true
    }

    /// Advances the clock by one second. Does nothing unless running.
    pub fn advance_second(&mut self) -> Vec<TimerEvent> {
        let MatchState::Running {
            level_index,
            seconds_remaining,
        } = self.state
        else {
            return Vec::new();
        };

        let seconds_remaining = seconds_remaining.saturating_sub(1);
        let mut events = vec![TimerEvent::Tick { seconds_remaining }];

        if seconds_remaining > 0 {
            self.state = MatchState::Running {
                level_index,
                seconds_remaining,
            };
        } else if level_index + 1 < self.durations.len() {
            let new_level_index = level_index + 1;
            let duration = self.durations[new_level_index];
            info!("Level up: level {} ({}s)", new_level_index, duration);
            self.state = MatchState::Running {
                level_index: new_level_index,
                seconds_remaining: duration,
            };
            events.push(TimerEvent::LevelUp { new_level_index });
        } else {
            info!("Match over after level {}", level_index);
            self.state = MatchState::Ended;
            events.push(TimerEvent::MatchOver);
        }

        events
    }

    /// Back to `Idle`, from any state.
    pub fn reset(&mut self) {
        self.state = MatchState::Idle;
    }
}
