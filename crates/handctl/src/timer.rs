//! Performance measurement tools.

use std::{
    fmt,
    sync::{Mutex, PoisonError},
    time::{Duration, Instant},
};

/// A timer that can measure and average the time an operation takes.
///
/// Timers can be shared between threads. Collected timings are averaged and reset when the timer
/// is displayed using `{}` ([`std::fmt::Display`]).
pub struct Timer {
    name: &'static str,
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    total: Duration,
    /// The number of time measurements that contributed to `total`.
    count: u32,
}

impl Timer {
    /// Creates a new timer.
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(State::default()),
        }
    }

    /// Invokes a closure, measuring and recording the time it takes.
    pub fn time<T>(&self, timee: impl FnOnce() -> T) -> T {
        let _guard = self.start();
        timee()
    }

    /// Starts timing an operation using a drop guard.
    ///
    /// When the returned [`TimerGuard`] is dropped, the time between the call to `start` and the
    /// drop is measured and recorded.
    pub fn start(&self) -> TimerGuard<'_> {
        TimerGuard {
            start: Instant::now(),
            timer: self,
        }
    }

    fn stop(&self, start: Instant) {
        let duration = start.elapsed();
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.total += duration;
        state.count += 1;
    }
}

/// Displays the average recorded time and resets it.
impl fmt::Display for Timer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let State { total, count } = std::mem::take(
            &mut *self.state.lock().unwrap_or_else(PoisonError::into_inner),
        );
        let avg_ms = if count == 0 {
            0.0
        } else {
            total.as_secs_f32() * 1000.0 / count as f32
        };

        write!(f, "{}: {count}x{avg_ms:.01}ms", self.name)
    }
}

/// Cloning a timer resets its collected timings.
impl Clone for Timer {
    fn clone(&self) -> Self {
        Self::new(self.name)
    }
}

/// Guard returned by [`Timer::start`]. Stops timing the operation when dropped.
pub struct TimerGuard<'a> {
    start: Instant,
    timer: &'a Timer,
}

impl Drop for TimerGuard<'_> {
    fn drop(&mut self) {
        self.timer.stop(self.start);
    }
}

/// Logs the number of handled requests per interval, together with timer averages.
pub struct RateCounter {
    name: &'static str,
    interval: Duration,
    state: Mutex<(u32, Instant)>,
}

impl RateCounter {
    pub fn new(name: &'static str, interval: Duration) -> Self {
        Self {
            name,
            interval,
            state: Mutex::new((0, Instant::now())),
        }
    }

    /// Counts one event and, if the interval has passed, logs the rate and the given timers.
    ///
    /// Returns whether a log line was emitted.
    pub fn tick_with<'a, I: IntoIterator<Item = &'a Timer>>(&self, timers: I) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.0 += 1;
        if state.1.elapsed() < self.interval {
            return false;
        }

        let timers = timers
            .into_iter()
            .map(|timer| timer.to_string())
            .collect::<Vec<_>>();
        log::debug!(
            "{}: {} in {:.1}s ({})",
            self.name,
            state.0,
            state.1.elapsed().as_secs_f32(),
            timers.join(", ")
        );

        *state = (0, Instant::now());
        true
    }

    /// Number of events counted since the last log line.
    #[cfg(test)]
    pub(crate) fn pending(&self) -> u32 {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).0
    }
}
