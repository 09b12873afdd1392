use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::Instant,
};

use snodar_types::Diagnostic;

/// Метрики, обновляемые lock-free из нескольких потоков.
#[derive(Debug, Default)]
pub struct RecorderMetrics {
    pub cycles: AtomicU64,
    pub packets_decoded: AtomicU64,
    pub malformed_packets: AtomicU64,
    pub rows_written: AtomicU64,
    pub bytes_read: AtomicU64,
    pub unhealthy_flags: AtomicU64,
    pub checksum_mismatches: AtomicU64,
    pub under_writes: AtomicU64,
    /// Циклы, в которых обработка не уложилась в интервал
    pub overruns: AtomicU64,
}

/// Snapshot метрик для отображения / тестирования.
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    pub duration_secs: f64,
    pub cycles: u64,
    pub packets_decoded: u64,
    pub malformed_packets: u64,
    pub rows_written: u64,
    pub bytes_read: u64,
    pub unhealthy_flags: u64,
    pub checksum_mismatches: u64,
    pub under_writes: u64,
    pub overruns: u64,
    pub packets_per_min: f64,
    pub malformed_rate_pct: f64,
}

impl RecorderMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Учитывает диагностику в соответствующем счётчике.
    pub fn record_diagnostic(
        &self,
        diagnostic: &Diagnostic,
    ) {
        let counter = match diagnostic {
            Diagnostic::UnhealthySensor { .. } => &self.unhealthy_flags,
            Diagnostic::ChecksumMismatch { .. } => &self.checksum_mismatches,
            Diagnostic::TransportUnderWrite { .. } => &self.under_writes,
            Diagnostic::MalformedPacket { .. } | Diagnostic::MalformedLine { .. } => {
                &self.malformed_packets
            }
            Diagnostic::TrailingBytesDropped { .. } => return,
        };

        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Успешно декодированных пакетов в минуту.
    pub fn packets_per_min(
        &self,
        elapsed: &Instant,
    ) -> f64 {
        let secs = elapsed.elapsed().as_secs_f64();

        if secs < 1e-9 {
            return 0.0;
        }

        self.packets_decoded.load(Ordering::Relaxed) as f64 / secs * 60.0
    }

    /// Процент битых пакетов (0.0-100.0).
    pub fn malformed_rate_pct(&self) -> f64 {
        let ok = self.packets_decoded.load(Ordering::Relaxed);
        let bad = self.malformed_packets.load(Ordering::Relaxed);
        let total = ok + bad;

        if total == 0 {
            0.0
        } else {
            bad as f64 / total as f64 * 100.0
        }
    }

    /// Итоговая сводка для вывода в конце сессии.
    pub fn summary(
        &self,
        elapsed: &Instant,
    ) -> MetricsSummary {
        MetricsSummary {
            duration_secs: elapsed.elapsed().as_secs_f64(),
            cycles: self.cycles.load(Ordering::Relaxed),
            packets_decoded: self.packets_decoded.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            rows_written: self.rows_written.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            unhealthy_flags: self.unhealthy_flags.load(Ordering::Relaxed),
            checksum_mismatches: self.checksum_mismatches.load(Ordering::Relaxed),
            under_writes: self.under_writes.load(Ordering::Relaxed),
            overruns: self.overruns.load(Ordering::Relaxed),
            packets_per_min: self.packets_per_min(elapsed),
            malformed_rate_pct: self.malformed_rate_pct(),
        }
    }
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        writeln!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")?;
        writeln!(f, "  Duration      : {:.1}s", self.duration_secs)?;
        writeln!(f, "  Cycles        : {}", self.cycles)?;
        writeln!(f, "  Packets       : {}", self.packets_decoded)?;
        writeln!(
            f,
            "  Malformed     : {} ({:.2}%)",
            self.malformed_packets, self.malformed_rate_pct
        )?;
        writeln!(f, "  Rows written  : {}", self.rows_written)?;
        writeln!(f, "  Bytes read    : {}", self.bytes_read)?;
        writeln!(f, "  Health warns  : {}", self.unhealthy_flags)?;
        writeln!(f, "  Checksum errs : {}", self.checksum_mismatches)?;
        writeln!(f, "  Under-writes  : {}", self.under_writes)?;
        writeln!(f, "  Overruns      : {}", self.overruns)?;
        writeln!(f, "  Rate          : {:.2} packets/min", self.packets_per_min)?;
        write!(f, "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━")
    }
}
