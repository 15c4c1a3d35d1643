//! Soft/hard dual-budget time management for iterative deepening.
//!
//! A search either runs under a single fixed limit (`movetime`, or no limit
//! at all for `infinite`/`depth`-only searches) or under a clock budget
//! derived from `wtime`/`btime`/increments, which splits into a `soft` target
//! (checked between iterations) and a `hard` ceiling (checked inside a node).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Per-side clock state handed in from the UCI `go` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockInfo {
    pub time_remaining: Duration,
    pub increment: Duration,
    pub moves_to_time_control: Option<u32>,
}

const HARD_RESERVE: Duration = Duration::from_millis(100);

fn estimate_moves_remaining(clock: &ClockInfo, material_count: u32) -> u32 {
    if let Some(m) = clock.moves_to_time_control {
        return m.max(1);
    }
    ((material_count * 160) / 128).max(8)
}

pub struct TimeManager {
    pub start_time: Instant,
    soft: Option<Duration>,
    hard: Option<Duration>,
    pub stop_signal: bool,
    stop_requested: Arc<AtomicBool>,
}

impl TimeManager {
    /// A single fixed wall-clock limit (`movetime`), or none for `infinite`/`depth` searches.
    pub fn fixed(limit: Option<Duration>) -> Self {
        Self {
            start_time: Instant::now(),
            soft: limit,
            hard: limit,
            stop_signal: false,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Derives soft/hard budgets from the side-to-move's clock, following
    /// `soft = (remaining + movesRemaining * increment) / movesRemaining`
    /// and `hard = soft * 4`, capped to leave a reserve before flagging.
    pub fn from_clock(clock: ClockInfo, material_count: u32) -> Self {
        let moves_remaining = estimate_moves_remaining(&clock, material_count);
        let budget =
            clock.time_remaining.as_millis() as i64 + moves_remaining as i64 * clock.increment.as_millis() as i64;
        let soft_ms = (budget / moves_remaining as i64).max(1) as u64;
        let soft = Duration::from_millis(soft_ms);

        let hard_cap = clock.time_remaining.saturating_sub(HARD_RESERVE);
        let hard = (soft * 4).min(hard_cap.max(Duration::from_millis(1)));

        Self {
            start_time: Instant::now(),
            soft: Some(soft),
            hard: Some(hard),
            stop_signal: false,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// No limit at all: used for `go infinite` or a bare `go depth N`.
    pub fn unbounded() -> Self {
        Self {
            start_time: Instant::now(),
            soft: None,
            hard: None,
            stop_signal: false,
            stop_requested: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Attaches an externally-owned flag (flipped by a UCI `stop` command on
    /// another thread) that `check_time` polls alongside the hard ceiling.
    pub fn with_stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop_requested = flag;
        self
    }

    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        self.stop_requested.clone()
    }

    /// Widens the soft budget by 25% (never past the hard cap) after an
    /// iteration whose score dropped sharply from the previous one.
    pub fn extend_soft_on_score_drop(&mut self, previous_score: i32, current_score: i32) {
        const SCORE_DROP_THRESHOLD: i32 = 33;
        if previous_score - current_score < SCORE_DROP_THRESHOLD {
            return;
        }
        if let (Some(soft), Some(hard)) = (self.soft, self.hard) {
            let extended = soft + soft / 4;
            self.soft = Some(extended.min(hard));
        }
    }

    /// Checked once per node (every `NodesTimeInterval` nodes, per the caller) —
    /// stops the search as soon as the hard ceiling is reached.
    #[inline(always)]
    pub fn check_time(&mut self) {
        if self.stop_signal {
            return;
        }
        if self.stop_requested.load(Ordering::Relaxed) {
            self.stop_signal = true;
            return;
        }
        if let Some(hard) = self.hard
            && self.start_time.elapsed() >= hard
        {
            self.stop_signal = true;
        }
    }

    /// Checked before starting a new iterative-deepening depth: true once
    /// elapsed time has used up more than 70% of the soft budget.
    pub fn should_stop_before_depth(&self) -> bool {
        match self.soft {
            Some(soft) if !soft.is_zero() => {
                self.start_time.elapsed().as_secs_f64() / soft.as_secs_f64() > 0.70
            }
            _ => false,
        }
    }

    pub fn allocated_time(&self) -> Option<Duration> {
        self.soft
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_limit_trips_hard_stop_once_elapsed() {
        let mut tm = TimeManager::fixed(Some(Duration::from_millis(0)));
        tm.check_time();
        assert!(tm.stop_signal);
    }

    #[test]
    fn unbounded_never_stops() {
        let mut tm = TimeManager::unbounded();
        tm.check_time();
        assert!(!tm.stop_signal);
        assert!(!tm.should_stop_before_depth());
    }

    #[test]
    fn clock_budget_hard_is_four_times_soft_when_reserve_allows() {
        let clock = ClockInfo {
            time_remaining: Duration::from_secs(60),
            increment: Duration::from_millis(0),
            moves_to_time_control: Some(30),
        };
        let tm = TimeManager::from_clock(clock, 32);
        let soft = tm.allocated_time().unwrap();
        assert_eq!(soft, Duration::from_secs(2));
    }

    #[test]
    fn score_drop_extends_soft_budget() {
        let clock = ClockInfo {
            time_remaining: Duration::from_secs(60),
            increment: Duration::from_millis(0),
            moves_to_time_control: Some(30),
        };
        let mut tm = TimeManager::from_clock(clock, 32);
        let before = tm.allocated_time().unwrap();
        tm.extend_soft_on_score_drop(100, 50);
        let after = tm.allocated_time().unwrap();
        assert!(after > before);
    }
}
