//! Добавление разобранных флагов здоровья в существующий CSV.
//!
//! Флаги берутся либо из пары `health_flags_hi`/`health_flags_lo` (лог с
//! RS-232), либо из `LIVE_HEALTH_FLAGS` в hex (лог из мобильного приложения).
//! Файл перезаписывается целиком.

use std::{
    fs::File,
    io::{Read, Write},
    path::Path,
};

use snodar_types::{HealthField, HealthFlags, SnodarError, SnodarResult};
use tempfile::NamedTempFile;

use crate::{
    csv_log::csv_error,
    health::{decode_health_flags, decode_packed_health_flags},
};

pub const HEALTH_HI_COLUMN: &str = "health_flags_hi";
pub const HEALTH_LO_COLUMN: &str = "health_flags_lo";
pub const PACKED_HEALTH_COLUMN: &str = "LIVE_HEALTH_FLAGS";

/// Откуда брать флаги в строке CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HealthSource {
    Bytes { hi: usize, lo: usize },
    Packed { column: usize },
}

impl HealthSource {
    fn locate(headers: &csv::StringRecord) -> SnodarResult<Self> {
        let position = |name: &str| headers.iter().position(|h| h == name);

        if let (Some(hi), Some(lo)) = (position(HEALTH_HI_COLUMN), position(HEALTH_LO_COLUMN)) {
            return Ok(HealthSource::Bytes { hi, lo });
        }

        if let Some(column) = position(PACKED_HEALTH_COLUMN) {
            return Ok(HealthSource::Packed { column });
        }

        Err(SnodarError::MissingHealthColumns)
    }

    fn decode(
        &self,
        row: &csv::StringRecord,
    ) -> SnodarResult<HealthFlags> {
        match *self {
            HealthSource::Bytes { hi, lo } => {
                let high = parse_byte(row, hi, HEALTH_HI_COLUMN)?;
                let low = parse_byte(row, lo, HEALTH_LO_COLUMN)?;
                Ok(decode_health_flags(high, low))
            }
            HealthSource::Packed { column } => {
                let raw = row.get(column).unwrap_or("").trim();
                let digits = raw
                    .strip_prefix("0x")
                    .or_else(|| raw.strip_prefix("0X"))
                    .unwrap_or(raw);
                let packed = u16::from_str_radix(digits, 16)
                    .map_err(|_| SnodarError::invalid_field(PACKED_HEALTH_COLUMN, raw))?;
                Ok(decode_packed_health_flags(packed))
            }
        }
    }
}

fn parse_byte(
    row: &csv::StringRecord,
    index: usize,
    column: &str,
) -> SnodarResult<u8> {
    let raw = row.get(index).unwrap_or("").trim();

    raw.parse::<u8>()
        .map_err(|_| SnodarError::invalid_field(column, raw))
}

fn bool_cell(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// Копирует CSV из `input` в `output`, добавляя 13 колонок флагов.
///
/// Если колонки уже есть — значения в них перезаписываются. Возвращает
/// число обработанных строк.
pub fn augment_health_flags<R: Read, W: Write>(
    input: R,
    output: W,
) -> SnodarResult<u64> {
    let mut reader = csv::Reader::from_reader(input);
    let headers = reader.headers().map_err(csv_error)?.clone();
    let source = HealthSource::locate(&headers)?;

    let mut out_headers: Vec<String> = headers.iter().map(String::from).collect();
    let mut columns = [0usize; HealthField::ALL.len()];

    for (slot, field) in columns.iter_mut().zip(HealthField::ALL) {
        *slot = match out_headers.iter().position(|h| h == field.name()) {
            Some(i) => i,
            None => {
                out_headers.push(field.name().to_string());
                out_headers.len() - 1
            }
        };
    }

    let mut writer = csv::Writer::from_writer(output);
    writer.write_record(&out_headers).map_err(csv_error)?;

    let mut rows = 0u64;

    for result in reader.records() {
        let row = result.map_err(csv_error)?;
        let flags = source.decode(&row)?;

        let mut cells: Vec<String> = row.iter().map(String::from).collect();
        cells.resize(out_headers.len(), String::new());

        for (&column, field) in columns.iter().zip(HealthField::ALL) {
            cells[column] = bool_cell(flags.get(field)).to_string();
        }

        writer.write_record(&cells).map_err(csv_error)?;
        rows += 1;
    }

    writer.flush()?;

    Ok(rows)
}

/// Добавляет флаги здоровья в CSV файл на месте.
///
/// Результат пишется во временный файл рядом и затем атомарно заменяет
/// исходный. При ошибке исходный файл не меняется.
pub fn add_health_flags<P: AsRef<Path>>(path: P) -> SnodarResult<u64> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let input = File::open(path)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    let rows = augment_health_flags(input, tmp.as_file_mut())?;

    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| SnodarError::Io(e.error))?;

    Ok(rows)
}
