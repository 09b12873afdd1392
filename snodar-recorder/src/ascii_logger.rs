//! Пассивный режим: датчик сам шлёт ASCII строки, мы только пишем их.

use std::{
    io::Write,
    sync::{atomic::Ordering, Arc},
};

use crossbeam_channel::Sender;
use log::{debug, info};
use snodar_core::{AsciiTelemetry, CsvLog};
use snodar_types::{Diagnostic, SnodarError};

use crate::{
    metrics::RecorderMetrics,
    pipeline::{finish, report, DisplayPoint, DisplaySink},
    signal::StopSignal,
    transport::{Transport, MAX_LINE_LEN},
    AcquisitionConfig, DisplayField, RecorderError, RecorderResult,
};

/// Приём ASCII телеметрии построчно в CSV.
pub struct AsciiLogger {
    config: AcquisitionConfig,
    metrics: Arc<RecorderMetrics>,
    stop: StopSignal,
}

impl AsciiLogger {
    pub fn new(config: AcquisitionConfig) -> (Self, Arc<RecorderMetrics>) {
        let metrics = RecorderMetrics::new();
        let l = Self {
            config,
            metrics: metrics.clone(),
            stop: StopSignal::new(),
        };

        (l, metrics)
    }

    pub fn with_stop_signal(
        mut self,
        stop: StopSignal,
    ) -> Self {
        self.stop = stop;
        self
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Читает строки до остановки. Флаг проверяется между строками, так что
    /// остановка срабатывает после прихода следующей строки.
    pub fn run<W: Write>(
        self,
        mut transport: Box<dyn Transport>,
        mut log: CsvLog<W>,
        display: Option<Sender<DisplayPoint>>,
    ) -> RecorderResult<()> {
        info!("Listening for ASCII telemetry on {}", transport.name());

        let mut display = DisplaySink::new(display);
        let result = self.lines(transport.as_mut(), &mut log, &mut display);

        finish(transport, result)
    }

    fn lines<W: Write>(
        &self,
        transport: &mut dyn Transport,
        log: &mut CsvLog<W>,
        display: &mut DisplaySink,
    ) -> RecorderResult<()> {
        let mut done: u64 = 0;

        loop {
            if self.stop.is_requested() {
                info!("Stop signal received. Finishing...");
                break;
            }

            if let Some(max) = self.config.max_cycles {
                if done >= max {
                    info!("Line limit reached ({max}). Finishing...");
                    break;
                }
            }

            let line = match transport.read_line() {
                Ok(line) => line,
                Err(RecorderError::Snodar(SnodarError::MalformedLine(reason))) => {
                    done += 1;
                    self.metrics.cycles.fetch_add(1, Ordering::Relaxed);
                    self.metrics
                        .bytes_read
                        .fetch_add(MAX_LINE_LEN as u64 + 1, Ordering::Relaxed);
                    report(&self.metrics, &Diagnostic::MalformedLine { line: reason });
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.metrics
                .bytes_read
                .fetch_add(line.len() as u64 + 1, Ordering::Relaxed);

            if line.trim().is_empty() {
                continue;
            }

            done += 1;
            self.metrics.cycles.fetch_add(1, Ordering::Relaxed);

            let telemetry = match AsciiTelemetry::parse(&line) {
                Ok(t) => t,
                Err(_) => {
                    report(&self.metrics, &Diagnostic::MalformedLine { line });
                    continue;
                }
            };

            self.metrics.packets_decoded.fetch_add(1, Ordering::Relaxed);

            if self.config.verbose {
                info!("{line}");
            } else {
                debug!("{line}");
            }

            log.append_row(telemetry.values())?;
            self.metrics.rows_written.fetch_add(1, Ordering::Relaxed);

            let value = match self.config.display_field {
                DisplayField::TcDistance => telemetry.lidar_distance(),
                DisplayField::SnowDepth => telemetry.snow_depth(),
            };

            if let Some(value) = value {
                display.send(DisplayPoint {
                    unix_time: telemetry.timestamp(),
                    value,
                });
            }
        }

        Ok(())
    }
}
