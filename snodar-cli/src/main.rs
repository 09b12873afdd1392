//! Офлайн утилиты SNOdar.
//!
//! ```bash
//! # Сырые пакеты snolog (файл с карты/дампа) → CSV
//! snodar snolog-to-csv dump.bin out.csv --checksum sum8
//!
//! # Добавить 13 колонок флагов здоровья в CSV (на месте)
//! snodar add-health-flags out.csv
//! ```

use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use clap::{Parser, Subcommand};
use log::{error, info, warn};
use snodar_core::{
    add_health_flags, decode_health_flags, health_diagnostics, verify_checksum, ChecksumMode,
    CsvLog, SnologStream, StreamStats,
};
use snodar_types::{SnodarResult, SnologRecord};

#[derive(Parser, Debug)]
#[command(
    name = "snodar",
    version = env!("CARGO_PKG_VERSION"),
    about = "Offline tools for SNOdar logs",
    long_about = None,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Тихий режим (только ошибки)
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Конвертирует файл сырых пакетов snolog (по 128 байт подряд) в CSV
    SnologToCsv {
        /// Входной файл с пакетами
        input: PathBuf,
        /// Выходной CSV (перезаписывается)
        output: PathBuf,
        /// Проверка контрольной суммы: ignore, sum8
        #[arg(long, default_value = "ignore")]
        checksum: ChecksumMode,
        /// Выводить предупреждения о флагах здоровья
        #[arg(long)]
        audit: bool,
    },
    /// Добавляет в CSV колонки флагов здоровья (файл перезаписывается)
    AddHealthFlags {
        /// CSV с колонками health_flags_hi/lo или LIVE_HEALTH_FLAGS
        csv: PathBuf,
    },
}

/// Итог конвертации.
#[derive(Debug)]
struct ConvertReport {
    stream: StreamStats,
    warnings: u64,
}

fn snolog_to_csv(
    input: &Path,
    output: &Path,
    checksum: ChecksumMode,
    audit: bool,
) -> SnodarResult<ConvertReport> {
    let reader = BufReader::new(File::open(input)?);
    let mut stream = SnologStream::new(reader);
    let mut log = CsvLog::create(output, SnologRecord::field_names())?;
    let mut warnings = 0u64;

    let mut i = 0u64;

    while let Some(record) = stream.next() {
        let record = record?;

        if let Some(d) = verify_checksum(stream.last_packet(), checksum) {
            warn!("packet {i}: {d}");
            warnings += 1;
        }

        if audit {
            let flags = decode_health_flags(record.health_flags_hi, record.health_flags_lo);
            for d in health_diagnostics(&flags) {
                warn!("packet {i} (t={}): {d}", record.unix_time);
                warnings += 1;
            }
        }

        log.append_record(&record)?;
        i += 1;
    }

    if let Some(d) = stream.tail_diagnostic() {
        warn!("{d}");
    }

    Ok(ConvertReport {
        stream: stream.stats().clone(),
        warnings,
    })
}

fn main() {
    let cli = Cli::parse();
    let level = if cli.quiet { "error" } else { "info" };

    env_logger::Builder::new()
        .filter_level(level.parse().unwrap_or(log::LevelFilter::Info))
        .format_target(false)
        .format_timestamp_secs()
        .init();

    match cli.command {
        Commands::SnologToCsv {
            input,
            output,
            checksum,
            audit,
        } => match snolog_to_csv(&input, &output, checksum, audit) {
            Ok(report) => info!(
                "✓ {} packets ({} bytes) → {:?}, {} warnings",
                report.stream.packets_ok, report.stream.bytes_processed, output, report.warnings
            ),
            Err(e) => {
                error!("Conversion failed: {e}");
                std::process::exit(1);
            }
        },
        Commands::AddHealthFlags { csv } => match add_health_flags(&csv) {
            Ok(rows) => info!("✓ Health flag columns written for {rows} rows: {csv:?}"),
            Err(e) => {
                error!("Failed to add health flags to {csv:?}: {e}");
                std::process::exit(1);
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use snodar_core::{encode_snolog, seal_sum8};
    use tempfile::tempdir;

    use super::*;

    fn packet(t: u32) -> [u8; 128] {
        let record = SnologRecord {
            id: 1,
            unix_time: t,
            health_flags_hi: 0x1F,
            health_flags_lo: 0xFF,
            ..Default::default()
        };
        let mut p = encode_snolog(&record).unwrap();
        seal_sum8(&mut p);
        p
    }

    #[test]
    fn test_snolog_to_csv() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("dump.bin");
        let output = dir.path().join("out.csv");

        let mut f = File::create(&input).unwrap();
        f.write_all(&packet(100)).unwrap();
        f.write_all(&packet(130)).unwrap();
        f.write_all(&[1, 2, 3]).unwrap();
        drop(f);

        let report = snolog_to_csv(&input, &output, ChecksumMode::Sum8, true).unwrap();

        assert_eq!(report.stream.packets_ok, 2);
        assert_eq!(report.stream.dropped_tail_bytes, 3);
        assert_eq!(report.warnings, 0);

        let text = std::fs::read_to_string(&output).unwrap();
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_snolog_to_csv_counts_warnings() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("dump.bin");
        let output = dir.path().join("out.csv");

        // health_flags_lo без imu_ready, сумма не пересчитана
        let mut bad = packet(100);
        bad[124] = 0xFE;
        std::fs::write(&input, bad).unwrap();

        let report = snolog_to_csv(&input, &output, ChecksumMode::Sum8, true).unwrap();

        // контрольная сумма + один флаг
        assert_eq!(report.warnings, 2);
    }

    #[test]
    fn test_checksum_checked_on_raw_bytes() {
        let dir = tempdir().unwrap();
        let input = dir.path().join("dump.bin");
        let output = dir.path().join("out.csv");

        // испорчен только байт суммы, поля записи целы
        let good = packet(100);
        let mut bad = packet(130);
        bad[127] = bad[127].wrapping_add(1);
        std::fs::write(&input, [good, bad].concat()).unwrap();

        let report = snolog_to_csv(&input, &output, ChecksumMode::Sum8, false).unwrap();
        assert_eq!(report.warnings, 1);

        let ignored = snolog_to_csv(&input, &output, ChecksumMode::Ignore, false).unwrap();
        assert_eq!(ignored.warnings, 0);
    }
}
