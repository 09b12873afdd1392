use std::{
    path::PathBuf,
    str::FromStr,
    thread,
    time::{Duration, Instant},
};

use clap::Parser;
use log::{error, info, warn};
use snodar_core::{ChecksumMode, CsvLog, ASCII_FIELDNAMES};
use snodar_recorder::{
    display_channel, open_transport, parse_duration, AcquisitionConfig, AcquisitionLoop,
    AcquisitionMode, AsciiLogger, DeviceKind, DisplayField, MalformedPolicy, RecorderConfig,
    RecorderError, StopSignal, DEFAULT_BAUD_RATE, FORCE_EXIT_CODE,
};
use snodar_types::SnologRecord;

#[derive(Parser, Debug)]
#[command(
    name = "snodar-recorder",
    version = env!("CARGO_PKG_VERSION"),
    about = "Capture SNOdar measurements over RS-232 into a CSV log",
    long_about = None,
)]
struct Cli {
    /// Последовательный порт (/dev/ttyUSB0, COM3)
    #[arg(default_value = "/dev/ttyUSB0")]
    port: String,
    /// CSV журнал (дозапись, заголовок только в новый файл)
    #[arg(default_value = "snodar.csv")]
    csv: PathBuf,
    /// Источник данных: serial, sim
    #[arg(short, long, default_value = "serial")]
    device: String,
    /// Режим: snolog (запрос !USA), ascii (пассивный приём строк)
    #[arg(short, long, default_value = "snolog")]
    mode: String,
    /// Интервал между измерениями (30, 30s, 2m)
    #[arg(short = 'i', long, default_value = "30")]
    measurement_interval: String,
    /// Пауза между запросом и чтением ответа
    #[arg(short = 'r', long, default_value = "0")]
    read_delay: String,
    /// Скорость порта, бод
    #[arg(short, long, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
    /// Проверка контрольной суммы: ignore, sum8
    #[arg(long, default_value = "ignore")]
    checksum: String,
    /// Поле для живого вывода: distance, depth
    #[arg(long, default_value = "distance")]
    display: String,
    /// Битые пакеты: skip, abort
    #[arg(long, default_value = "skip")]
    on_malformed: String,
    /// Остановиться после N измерений
    #[arg(short = 'n', long)]
    cycles: Option<u64>,
    /// Интервал вывода статистики (секунды)
    #[arg(long, default_value = "300")]
    stats_interval: u64,
    /// Логировать каждую запись
    #[arg(short, long)]
    verbose: bool,
    /// Тихий режим (только ошибки)
    #[arg(short, long)]
    quiet: bool,
}

fn parse_or_exit<T: FromStr<Err = String>>(
    flag: &str,
    value: &str,
) -> T {
    match value.parse() {
        Ok(v) => v,
        Err(e) => {
            error!("{flag}: {e}");
            std::process::exit(1);
        }
    }
}

fn duration_or_exit(
    flag: &str,
    value: &str,
) -> Duration {
    match parse_duration(value) {
        Ok(d) => d,
        Err(e) => {
            error!("{flag}: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::new()
        .filter_level(level.parse().unwrap_or(log::LevelFilter::Info))
        .format_target(false)
        .format_timestamp_secs()
        .init();

    let device: DeviceKind = parse_or_exit("--device", &cli.device);
    let mode: AcquisitionMode = parse_or_exit("--mode", &cli.mode);
    let checksum: ChecksumMode = parse_or_exit("--checksum", &cli.checksum);
    let display_field: DisplayField = parse_or_exit("--display", &cli.display);
    let on_malformed: MalformedPolicy = parse_or_exit("--on-malformed", &cli.on_malformed);

    let config = RecorderConfig {
        device,
        port: cli.port.clone(),
        baud_rate: cli.baud,
        mode,
        csv_path: cli.csv.clone(),
        stats_interval_secs: cli.stats_interval,
        acquisition: AcquisitionConfig {
            measurement_interval: duration_or_exit("--measurement-interval", &cli.measurement_interval),
            read_delay: duration_or_exit("--read-delay", &cli.read_delay),
            display_field,
            checksum,
            on_malformed,
            verbose: cli.verbose,
            max_cycles: cli.cycles,
            ..Default::default()
        },
    };

    if config.acquisition.read_delay > config.acquisition.measurement_interval {
        warn!("--read-delay is longer than --measurement-interval, measurements will run back to back");
    }

    let transport = match open_transport(&config) {
        Ok(t) => t,
        Err(e) => {
            error!("Failed to open device: {e}");
            std::process::exit(1);
        }
    };

    let log = match config.mode {
        AcquisitionMode::Snolog => CsvLog::open_append(&config.csv_path, SnologRecord::field_names()),
        AcquisitionMode::Ascii => CsvLog::open_append(&config.csv_path, ASCII_FIELDNAMES),
    };

    let log = match log {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to open CSV log {:?}: {e}", config.csv_path);
            std::process::exit(1);
        }
    };

    let stop = StopSignal::new();
    let stop_ctrlc = stop.clone();

    if let Err(e) = ctrlc::set_handler(move || {
        if stop_ctrlc.request() > 1 {
            // Второй Ctrl+C — принудительный выход без ожидания потока
            warn!("Force exit");
            std::process::exit(FORCE_EXIT_CODE);
        }
        warn!("Ctrl+C received, waiting to collect the last data packet...");
        warn!("Press Ctrl+C again to terminate immediately");
    }) {
        warn!("Failed to set Ctrl+C handler: {e}");
    }

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Device        : {} ({})", config.device, transport.name());
    info!("  Mode          : {}", config.mode);
    info!("  Interval      : {:?}", config.acquisition.measurement_interval);
    info!("  Read delay    : {:?}", config.acquisition.read_delay);
    info!("  Checksum      : {}", config.acquisition.checksum);
    info!("  Display       : {}", config.acquisition.display_field);
    info!("  Output        : {:?}", config.csv_path);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let (tx, rx) = display_channel(config.acquisition.display_capacity);
    let stats_interval = Duration::from_secs(config.stats_interval_secs);
    let session_start = Instant::now();

    let (worker, metrics) = match config.mode {
        AcquisitionMode::Snolog => {
            let (acq, metrics) = AcquisitionLoop::new(config.acquisition.clone());
            let acq = acq.with_stop_signal(stop).with_stats_interval(stats_interval);
            let handle = thread::spawn(move || acq.run(transport, log, Some(tx)));
            (handle, metrics)
        }
        AcquisitionMode::Ascii => {
            let (logger, metrics) = AsciiLogger::new(config.acquisition.clone());
            let logger = logger.with_stop_signal(stop);
            let handle = thread::spawn(move || logger.run(transport, log, Some(tx)));
            (handle, metrics)
        }
    };

    // Живой вывод: канал закрывается, когда рабочий поток завершается
    for point in rx.iter() {
        info!(
            "t={} {}={:.3} m",
            point.unix_time, config.acquisition.display_field, point.value
        );
    }

    let result = worker
        .join()
        .unwrap_or_else(|_| Err(RecorderError::Pipeline("acquisition thread panicked".into())));

    // --- Итоговая статистика ---
    let summary = metrics.summary(&session_start);
    info!("\n{summary}");

    if let Err(e) = result {
        error!("Acquisition failed: {e}");
        std::process::exit(1);
    }

    if summary.malformed_packets > 0 {
        warn!(
            "⚠ {} malformed packets ({:.2}%). Check cabling and baud rate.",
            summary.malformed_packets, summary.malformed_rate_pct
        );
    }

    info!("✓ Acquisition complete: {:?}", config.csv_path);
}
