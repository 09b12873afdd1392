//! Пример: запись синтетического потока пакетов snolog
//!
//! Демонстрирует:
//! - заполнение SnologRecord
//! - кодирование в 128 байт и запечатывание Sum8
//! - запись нескольких пакетов подряд в один файл

use std::{fs::File, io::Write};

use snodar_core::{encode_health_flags, encode_snolog, seal_sum8};
use snodar_types::{HealthFlags, SnologRecord};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_path = "snodar-core/test_output.snolog";
    let mut file = File::create(output_path)?;

    let (hi, lo) = encode_health_flags(&HealthFlags::from_fn(|_| true));

    for i in 0..10u32 {
        let record = SnologRecord {
            id: 1,
            version: 1,
            length: 128,
            unix_time: 1_700_000_000 + i * 30,
            lidar_tc_distance: 2.0 - i as f32 * 0.01,
            seasonal_snow_depth: i as f32 * 0.01,
            health_flags_hi: hi,
            health_flags_lo: lo,
            ..Default::default()
        };

        let mut packet = encode_snolog(&record)?;
        seal_sum8(&mut packet);
        file.write_all(&packet)?;
    }

    println!("✓ Wrote 10 packets to {output_path}");

    Ok(())
}
