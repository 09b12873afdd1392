//! Время и паузы цикла измерений.

use std::{
    thread,
    time::{Duration, Instant},
};

/// Источник времени для цикла. В тестах подменяется виртуальными часами.
pub trait Clock: Send {
    fn now(&self) -> Instant;

    fn sleep(
        &self,
        duration: Duration,
    );
}

/// Настоящие часы: `Instant::now` и `thread::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(
        &self,
        duration: Duration,
    ) {
        thread::sleep(duration);
    }
}

/// Сколько спать после обработки пакета, чтобы период от запроса до
/// запроса был равен `interval`.
///
/// `elapsed` отсчитывается от окончания `read_delay`. `None` — следующий
/// запрос сразу (обработка не уложилась в интервал).
pub fn pacing_sleep(
    interval: Duration,
    read_delay: Duration,
    elapsed: Duration,
) -> Option<Duration> {
    interval
        .checked_sub(read_delay)
        .and_then(|budget| budget.checked_sub(elapsed))
        .filter(|d| !d.is_zero())
}
