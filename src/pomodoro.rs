use chrono::{DateTime, Duration, Local};

use crate::model::PomodoroConfig;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    Focus,
    ShortBreak,
    LongBreak,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Phase::Focus => "Focus",
            Phase::ShortBreak => "Short break",
            Phase::LongBreak => "Long break",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
    /// Focus sessions finished so far, including the one that just ended.
    pub focus_done: u32,
}

#[derive(Clone, Debug)]
pub struct Pomodoro {
    config: PomodoroConfig,
    phase: Phase,
    phase_started: DateTime<Local>,
    focus_done: u32,
}

impl Pomodoro {
    pub fn start(config: PomodoroConfig, now: DateTime<Local>) -> Self {
        Self {
            config,
            phase: Phase::Focus,
            phase_started: now,
            focus_done: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn focus_done(&self) -> u32 {
        self.focus_done
    }

    pub fn phase_length(&self, phase: Phase) -> Duration {
        let minutes = match phase {
            Phase::Focus => self.config.focus_minutes,
            Phase::ShortBreak => self.config.short_break_minutes,
            Phase::LongBreak => self.config.long_break_minutes,
        };
        Duration::minutes(i64::from(minutes.max(1)))
    }

    pub fn remaining(&self, now: DateTime<Local>) -> Duration {
        let left = self.phase_length(self.phase) - (now - self.phase_started);
        left.max(Duration::zero())
    }

    /// Moves to the next phase once the current one has run out. A late tick
    /// advances at most one phase; the new phase starts at its scheduled end.
    pub fn tick(&mut self, now: DateTime<Local>) -> Option<PhaseChange> {
        let ends_at = self.phase_started + self.phase_length(self.phase);
        if now < ends_at {
            return None;
        }
        Some(self.advance(ends_at))
    }

    fn advance(&mut self, at: DateTime<Local>) -> PhaseChange {
        let from = self.phase;
        let to = match from {
            Phase::Focus => {
                self.focus_done += 1;
                let every = self.config.long_break_every.max(1);
                if self.focus_done % every == 0 {
                    Phase::LongBreak
                } else {
                    Phase::ShortBreak
                }
            }
            Phase::ShortBreak | Phase::LongBreak => Phase::Focus,
        };
        self.phase = to;
        self.phase_started = at;
        PhaseChange {
            from,
            to,
            focus_done: self.focus_done,
        }
    }
}

pub fn format_countdown(left: Duration) -> String {
    let secs = left.num_seconds().max(0);
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn start() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 1, 8, 9, 0, 0).unwrap()
    }

    fn config() -> PomodoroConfig {
        PomodoroConfig {
            focus_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 2,
        }
    }

    #[test]
    fn focus_runs_its_full_length() {
        let mut timer = Pomodoro::start(config(), start());
        assert_eq!(timer.tick(start() + Duration::minutes(24)), None);
        assert_eq!(
            timer.remaining(start() + Duration::minutes(24)),
            Duration::minutes(1)
        );

        let change = timer.tick(start() + Duration::minutes(25)).unwrap();
        assert_eq!(change.from, Phase::Focus);
        assert_eq!(change.to, Phase::ShortBreak);
        assert_eq!(change.focus_done, 1);
    }

    #[test]
    fn every_nth_break_is_long() {
        let mut timer = Pomodoro::start(config(), start());
        let mut now = start();
        let mut phases = Vec::new();
        for _ in 0..4 {
            now += timer.phase_length(timer.phase());
            phases.push(timer.tick(now).unwrap().to);
        }
        assert_eq!(
            phases,
            vec![Phase::ShortBreak, Phase::Focus, Phase::LongBreak, Phase::Focus]
        );
    }

    #[test]
    fn countdown_formatting() {
        assert_eq!(format_countdown(Duration::seconds(25 * 60)), "25:00");
        assert_eq!(format_countdown(Duration::seconds(61)), "01:01");
        assert_eq!(format_countdown(Duration::seconds(-3)), "00:00");
    }
}
