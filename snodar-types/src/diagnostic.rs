use std::fmt;

use crate::HealthField;

/// Нефатальное событие, возникающее при чтении/декодировании.
///
/// Возвращается вместе с результатом, а не печатается на месте: вызывающий
/// решает, логировать, агрегировать или игнорировать.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// Флаг здоровья сброшен (один на каждый флаг)
    UnhealthySensor { field: HealthField },
    /// Запись команды вернула меньше байт, чем длина команды
    TransportUnderWrite { written: usize, expected: usize },
    /// Пакет не той длины, цикл пропущен
    MalformedPacket { len: usize },
    /// Контрольная сумма не совпала (запись всё равно сохранена)
    ChecksumMismatch { expected: u8, found: u8 },
    /// Хвост потока короче пакета отброшен
    TrailingBytesDropped { len: usize },
    /// Строка ASCII телеметрии не разобрана
    MalformedLine { line: String },
}

impl Diagnostic {
    /// Короткий тег для метрик и фильтрации.
    pub fn tag(&self) -> &'static str {
        match self {
            Diagnostic::UnhealthySensor { .. } => "unhealthy_sensor",
            Diagnostic::TransportUnderWrite { .. } => "transport_under_write",
            Diagnostic::MalformedPacket { .. } => "malformed_packet",
            Diagnostic::ChecksumMismatch { .. } => "checksum_mismatch",
            Diagnostic::TrailingBytesDropped { .. } => "trailing_bytes_dropped",
            Diagnostic::MalformedLine { .. } => "malformed_line",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            Diagnostic::UnhealthySensor { field } => write!(f, "{}", field.warning()),
            Diagnostic::TransportUnderWrite { written, expected } => {
                write!(f, "trigger write incomplete: {written}/{expected} bytes")
            }
            Diagnostic::MalformedPacket { len } => {
                write!(f, "malformed snolog packet ({len} bytes), cycle skipped")
            }
            Diagnostic::ChecksumMismatch { expected, found } => {
                write!(f, "checksum mismatch: expected {expected:#04x}, found {found:#04x}")
            }
            Diagnostic::TrailingBytesDropped { len } => {
                write!(f, "dropped {len} trailing bytes (partial packet)")
            }
            Diagnostic::MalformedLine { line } => write!(f, "malformed telemetry line: {line:?}"),
        }
    }
}
