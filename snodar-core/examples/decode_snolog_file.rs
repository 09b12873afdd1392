//! Пример: чтение файла с пакетами snolog
//!
//! Демонстрирует:
//! - потоковое декодирование через SnologStream
//! - обработку отброшенного хвоста
//! - вывод диагностик здоровья

use std::fs::File;

use snodar_core::{decode_health_flags, health_diagnostics, SnologStream};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let input_path = "snodar-core/test_output.snolog";

    let mut stream = SnologStream::new(File::open(input_path)?);

    for (i, record) in stream.by_ref().enumerate() {
        let record = record?;
        let flags = decode_health_flags(record.health_flags_hi, record.health_flags_lo);

        println!(
            "  [{i}] t={} tc_distance={:.3} m snow_depth={:.3} m",
            record.unix_time, record.lidar_tc_distance, record.seasonal_snow_depth
        );

        for d in health_diagnostics(&flags) {
            println!("      ⚠ {d}");
        }
    }

    println!("\n✓ Read complete");
    println!("  Packets ok  : {}", stream.stats().packets_ok);
    println!("  Bytes read  : {}", stream.stats().bytes_processed);

    if let Some(d) = stream.tail_diagnostic() {
        println!("  Tail        : {d}");
    }

    Ok(())
}
