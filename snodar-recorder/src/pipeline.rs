use std::{
    io::Write,
    sync::{atomic::Ordering, Arc},
    time::Duration,
};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, warn};
use snodar_core::{decode_snolog_checked, CsvLog, DecodedSnolog};
use snodar_types::{Diagnostic, SnodarError, SNOLOG_SIZE, TRIGGER_COMMAND};

use crate::{
    clock::{pacing_sleep, Clock, SystemClock},
    metrics::RecorderMetrics,
    signal::StopSignal,
    transport::Transport,
    AcquisitionConfig, DisplayField, MalformedPolicy, RecorderError, RecorderResult,
};

/// Шаг, с которым пауза между циклами проверяет флаг остановки.
const STOP_POLL: Duration = Duration::from_millis(200);

/// Точка для живого графика.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayPoint {
    pub unix_time: f64,
    pub value: f64,
}

/// Создаёт ограниченный канал к графику.
pub fn display_channel(capacity: usize) -> (Sender<DisplayPoint>, Receiver<DisplayPoint>) {
    crossbeam_channel::bounded(capacity)
}

/// Отправка точек на график. Отвалившийся получатель логируется один раз.
pub(crate) struct DisplaySink {
    tx: Option<Sender<DisplayPoint>>,
}

impl DisplaySink {
    pub(crate) fn new(tx: Option<Sender<DisplayPoint>>) -> Self {
        Self { tx }
    }

    /// Блокируется, пока в канале нет места.
    pub(crate) fn send(
        &mut self,
        point: DisplayPoint,
    ) {
        if let Some(tx) = &self.tx {
            if tx.send(point).is_err() {
                warn!("Display consumer disconnected, continuing without live display");
                self.tx = None;
            }
        }
    }
}

/// Логирует диагностику и учитывает её в метриках.
pub(crate) fn report(
    metrics: &RecorderMetrics,
    diagnostic: &Diagnostic,
) {
    warn!("{diagnostic}");
    metrics.record_diagnostic(diagnostic);
}

/// Закрывает транспорт ровно один раз и возвращает результат цикла.
pub(crate) fn finish(
    mut transport: Box<dyn Transport>,
    result: RecorderResult<()>,
) -> RecorderResult<()> {
    let name = transport.name();

    if let Err(ref e) = result {
        warn!("Acquisition stopped with error: {e}");
    }

    match transport.close() {
        Ok(()) => info!("Transport {name} closed"),
        Err(e) => warn!("Failed to close transport {name}: {e}"),
    }

    result
}

/// Исход одного цикла.
enum Cycle {
    Emitted,
    Skipped,
}

/// Цикл измерений: запрос → пауза → чтение 128 байт → разбор → запись →
/// выдержка интервала.
pub struct AcquisitionLoop<C: Clock = SystemClock> {
    config: AcquisitionConfig,
    metrics: Arc<RecorderMetrics>,
    stop: StopSignal,
    clock: C,
    stats_interval: Duration,
}

impl AcquisitionLoop<SystemClock> {
    /// Создаёт цикл. Возвращает также shared-ссылку на метрики.
    pub fn new(config: AcquisitionConfig) -> (Self, Arc<RecorderMetrics>) {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> AcquisitionLoop<C> {
    pub fn with_clock(
        config: AcquisitionConfig,
        clock: C,
    ) -> (Self, Arc<RecorderMetrics>) {
        let metrics = RecorderMetrics::new();
        let l = Self {
            config,
            metrics: metrics.clone(),
            stop: StopSignal::new(),
            clock,
            stats_interval: Duration::from_secs(300),
        };

        (l, metrics)
    }

    /// Интервал вывода промежуточной статистики.
    pub fn with_stats_interval(
        mut self,
        interval: Duration,
    ) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Подключает внешний токен остановки (например, от обработчика Ctrl+C).
    pub fn with_stop_signal(
        mut self,
        stop: StopSignal,
    ) -> Self {
        self.stop = stop;
        self
    }

    /// Токен остановки. `request()` завершает цикл после текущей итерации.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Запускает цикл. Блокируется до остановки, лимита циклов или
    /// фатальной ошибки транспорта. Транспорт закрывается в любом случае.
    pub fn run<W: Write>(
        self,
        mut transport: Box<dyn Transport>,
        mut log: CsvLog<W>,
        display: Option<Sender<DisplayPoint>>,
    ) -> RecorderResult<()> {
        let cfg = &self.config;

        info!(
            "Starting acquisition on {}: interval={:?}, read_delay={:?}, checksum={}",
            transport.name(),
            cfg.measurement_interval,
            cfg.read_delay,
            cfg.checksum
        );

        let mut display = DisplaySink::new(display);
        let result = self.cycles(transport.as_mut(), &mut log, &mut display);

        finish(transport, result)
    }

    fn cycles<W: Write>(
        &self,
        transport: &mut dyn Transport,
        log: &mut CsvLog<W>,
        display: &mut DisplaySink,
    ) -> RecorderResult<()> {
        let session_start = self.clock.now();
        let mut last_stats = session_start;
        let mut done: u64 = 0;

        loop {
            if self.stop.is_requested() {
                info!("Stop signal received. Finishing...");
                break;
            }

            if let Some(max) = self.config.max_cycles {
                if done >= max {
                    info!("Cycle limit reached ({max}). Finishing...");
                    break;
                }
            }

            // После последнего цикла выдерживать интервал незачем.
            let last = self.config.max_cycles.is_some_and(|max| done + 1 >= max);

            match self.cycle(transport, log, display, last)? {
                Cycle::Emitted => {}
                Cycle::Skipped => debug!("Cycle {done} skipped"),
            }

            done += 1;
            self.metrics.cycles.fetch_add(1, Ordering::Relaxed);

            let now = self.clock.now();
            if now - last_stats >= self.stats_interval {
                self.log_progress(now - session_start);
                last_stats = now;
            }
        }

        Ok(())
    }

    fn cycle<W: Write>(
        &self,
        transport: &mut dyn Transport,
        log: &mut CsvLog<W>,
        display: &mut DisplaySink,
        last: bool,
    ) -> RecorderResult<Cycle> {
        let cfg = &self.config;

        // Trigger
        let written = transport.write(TRIGGER_COMMAND)?;
        if written != TRIGGER_COMMAND.len() {
            // Старое поведение: недозапись команды только предупреждение.
            report(
                &self.metrics,
                &Diagnostic::TransportUnderWrite {
                    written,
                    expected: TRIGGER_COMMAND.len(),
                },
            );
        }

        // Delay
        if !cfg.read_delay.is_zero() {
            self.clock.sleep(cfg.read_delay);
        }

        let read_started = self.clock.now();

        // Read
        let mut buf = [0u8; SNOLOG_SIZE];
        let n = transport.read_exact(&mut buf)?;
        if n == 0 {
            return Err(RecorderError::transport(format!(
                "{}: end of stream",
                transport.name()
            )));
        }
        self.metrics.bytes_read.fetch_add(n as u64, Ordering::Relaxed);

        // Decode + health audit. Обрезанный пакет отвергает декодер.
        let outcome = match decode_snolog_checked(&buf[..n], cfg.checksum) {
            Ok(decoded) => {
                self.metrics.packets_decoded.fetch_add(1, Ordering::Relaxed);

                for d in &decoded.diagnostics {
                    report(&self.metrics, d);
                }

                // Emit
                self.emit(&decoded, log, display)?;
                Cycle::Emitted
            }
            Err(SnodarError::MalformedPacket { found, .. }) => {
                report(&self.metrics, &Diagnostic::MalformedPacket { len: found });

                if cfg.on_malformed == MalformedPolicy::Abort {
                    return Err(SnodarError::malformed_packet(found).into());
                }

                Cycle::Skipped
            }
            Err(e) => return Err(e.into()),
        };

        // Pace
        if !last && !self.stop.is_requested() {
            let elapsed = self.clock.now() - read_started;

            match pacing_sleep(cfg.measurement_interval, cfg.read_delay, elapsed) {
                Some(d) => self.pause(d),
                None => {
                    self.metrics.overruns.fetch_add(1, Ordering::Relaxed);
                    debug!("Cycle took {elapsed:?}, next trigger immediately");
                }
            }
        }

        Ok(outcome)
    }

    fn emit<W: Write>(
        &self,
        decoded: &DecodedSnolog,
        log: &mut CsvLog<W>,
        display: &mut DisplaySink,
    ) -> RecorderResult<()> {
        let record = &decoded.record;

        if self.config.verbose {
            info!("{record:?}");
            info!("Health flags: {}", decoded.health);
        } else {
            debug!("{record:?}");
            debug!("Health flags: {}", decoded.health);
        }

        log.append_record(record)?;
        self.metrics.rows_written.fetch_add(1, Ordering::Relaxed);

        let value = match self.config.display_field {
            DisplayField::TcDistance => record.lidar_tc_distance,
            DisplayField::SnowDepth => record.seasonal_snow_depth,
        };

        display.send(DisplayPoint {
            unix_time: record.unix_time as f64,
            value: value as f64,
        });

        Ok(())
    }

    /// Пауза, прерываемая запросом остановки.
    fn pause(
        &self,
        duration: Duration,
    ) {
        let mut left = duration;

        while !left.is_zero() && !self.stop.is_requested() {
            let step = left.min(STOP_POLL);
            self.clock.sleep(step);
            left -= step;
        }
    }

    fn log_progress(
        &self,
        elapsed: Duration,
    ) {
        let m = &self.metrics;

        info!(
            "[ {:.0}s ] cycles={} packets={} malformed={} health_warnings={} overruns={}",
            elapsed.as_secs_f64(),
            m.cycles.load(Ordering::Relaxed),
            m.packets_decoded.load(Ordering::Relaxed),
            m.malformed_packets.load(Ordering::Relaxed),
            m.unhealthy_flags.load(Ordering::Relaxed),
            m.overruns.load(Ordering::Relaxed),
        );
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
