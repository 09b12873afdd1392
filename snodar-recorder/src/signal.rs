//! Кооперативная остановка: первый запрос — мягкий стоп, второй — выход.

use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

/// Код выхода при принудительном завершении (как у SIGINT в shell).
pub const FORCE_EXIT_CODE: i32 = 130;

/// Флаг остановки с счётчиком запросов. Клонируется между потоками.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stop: Arc<AtomicBool>,
    requests: Arc<AtomicU32>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запросить остановку. Возвращает номер запроса (1 — первый).
    pub fn request(&self) -> u32 {
        self.stop.store(true, Ordering::SeqCst);
        self.requests.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_requested(&self) -> bool {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> u32 {
        self.requests.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counts() {
        let signal = StopSignal::new();
        let other = signal.clone();

        assert!(!signal.is_requested());
        assert_eq!(other.request(), 1);
        assert!(signal.is_requested(), "клоны видят один флаг");
        assert_eq!(signal.request(), 2);
        assert_eq!(signal.requests(), 2);
    }
}
