//! Бинарный формат snolog.
//!
//! Пакет — ровно 128 байт, поля идут в порядке [`SNOLOG_SCHEMA`],
//! little-endian, без выравнивания. Декодирование либо возвращает все поля,
//! либо ошибку; частичных записей не бывает.

use snodar_types::{
    Diagnostic, HealthFlags, SnodarError, SnodarResult, SnologRecord, SNOLOG_SCHEMA, SNOLOG_SIZE,
};

use crate::{
    binary::{read_field, write_field},
    health::{decode_health_flags, health_diagnostics},
};

/// Смещение байта контрольной суммы.
pub const CHECKSUM_OFFSET: usize = SNOLOG_SIZE - 1;

/// Политика проверки контрольной суммы.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChecksumMode {
    /// Не проверять (поведение совместимое со старыми логами)
    #[default]
    Ignore,
    /// 8-битная сумма байт [0..127) с переполнением
    Sum8,
}

/// Результат декодирования пакета вместе с флагами и диагностикой.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSnolog {
    pub record: SnologRecord,
    pub health: HealthFlags,
    pub diagnostics: Vec<Diagnostic>,
}

/// Декодирует пакет snolog.
///
/// Ошибка [`SnodarError::MalformedPacket`], если длина не 128 байт.
pub fn decode_snolog(buf: &[u8]) -> SnodarResult<SnologRecord> {
    if buf.len() != SNOLOG_SIZE {
        return Err(SnodarError::malformed_packet(buf.len()));
    }

    let mut cursor = buf;
    let mut values = Vec::with_capacity(SNOLOG_SCHEMA.len());

    for spec in SNOLOG_SCHEMA {
        values.push(read_field(&mut cursor, spec.kind)?);
    }

    SnologRecord::from_values(&values)
}

/// Кодирует запись обратно в 128 байт (поле `checksum` пишется как есть).
pub fn encode_snolog(record: &SnologRecord) -> SnodarResult<[u8; SNOLOG_SIZE]> {
    let mut buf = [0u8; SNOLOG_SIZE];
    let mut cursor = &mut buf[..];

    for value in record.values() {
        write_field(&mut cursor, value)?;
    }

    Ok(buf)
}

/// Декодирует пакет, проверяет контрольную сумму и флаги здоровья.
pub fn decode_snolog_checked(
    buf: &[u8],
    mode: ChecksumMode,
) -> SnodarResult<DecodedSnolog> {
    let record = decode_snolog(buf)?;
    let health = decode_health_flags(record.health_flags_hi, record.health_flags_lo);

    let mut diagnostics = Vec::new();

    if let Some(d) = verify_checksum(buf, mode) {
        diagnostics.push(d);
    }

    diagnostics.extend(health_diagnostics(&health));

    Ok(DecodedSnolog {
        record,
        health,
        diagnostics,
    })
}

/// 8-битная сумма всех байт пакета, кроме последнего.
pub fn checksum_sum8(buf: &[u8]) -> u8 {
    let end = buf.len().min(CHECKSUM_OFFSET);

    buf[..end].iter().fold(0u8, |acc, &b| acc.wrapping_add(b))
}

/// Записывает Sum8 в последний байт пакета.
pub fn seal_sum8(buf: &mut [u8; SNOLOG_SIZE]) {
    buf[CHECKSUM_OFFSET] = checksum_sum8(buf);
}

/// Проверка контрольной суммы; `None` если совпала или проверка выключена.
pub fn verify_checksum(
    buf: &[u8],
    mode: ChecksumMode,
) -> Option<Diagnostic> {
    match mode {
        ChecksumMode::Ignore => None,
        ChecksumMode::Sum8 => {
            if buf.len() != SNOLOG_SIZE {
                return None;
            }

            let expected = checksum_sum8(buf);
            let found = buf[CHECKSUM_OFFSET];

            (expected != found).then_some(Diagnostic::ChecksumMismatch { expected, found })
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для ChecksumMode
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for ChecksumMode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            ChecksumMode::Ignore => write!(f, "ignore"),
            ChecksumMode::Sum8 => write!(f, "sum8"),
        }
    }
}

impl std::str::FromStr for ChecksumMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "ignore" | "none" | "off" => Ok(ChecksumMode::Ignore),
            "sum8" | "sum" => Ok(ChecksumMode::Sum8),
            _ => Err(format!("Unknown checksum mode: '{s}'. Use: ignore, sum8")),
        }
    }
}
