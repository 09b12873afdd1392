//! Декодирование флагов здоровья и проверка на неисправные датчики.

use snodar_types::{Diagnostic, HealthByte, HealthField, HealthFlags};

/// Ленивая последовательность неисправных флагов (в порядке объявления).
///
/// Итератор можно клонировать, чтобы пройти его заново.
#[derive(Debug, Clone)]
pub struct Audit {
    flags: HealthFlags,
    next: usize,
}

/// Разбирает пару байт в 13 флагов.
///
/// Неиспользуемые биты игнорируются, ошибок нет.
pub fn decode_health_flags(
    high: u8,
    low: u8,
) -> HealthFlags {
    HealthFlags::from_bytes(high, low)
}

/// Разбирает упакованное 16-битное значение (`high << 8 | low`).
pub fn decode_packed_health_flags(packed: u16) -> HealthFlags {
    HealthFlags::from_packed(packed)
}

/// Обратное преобразование: флаги → `(high, low)`.
pub fn encode_health_flags(flags: &HealthFlags) -> (u8, u8) {
    flags
        .iter()
        .filter(|(_, ok)| *ok)
        .fold((0u8, 0u8), |(high, low), (field, _)| match field.location().0 {
            HealthByte::High => (high | field.mask(), low),
            HealthByte::Low => (high, low | field.mask()),
        })
}

/// Возвращает все сброшенные флаги.
pub fn audit(flags: &HealthFlags) -> Audit {
    Audit {
        flags: *flags,
        next: 0,
    }
}

/// По одному [`Diagnostic::UnhealthySensor`] на каждый сброшенный флаг.
pub fn health_diagnostics(flags: &HealthFlags) -> impl Iterator<Item = Diagnostic> + Clone {
    audit(flags).map(|field| Diagnostic::UnhealthySensor { field })
}

impl Iterator for Audit {
    type Item = HealthField;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&field) = HealthField::ALL.get(self.next) {
            self.next += 1;

            if !self.flags.get(field) {
                return Some(field);
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(HealthField::ALL.len() - self.next))
    }
}

impl std::iter::FusedIterator for Audit {}
