//! Декларативная схема полей бинарной записи.
//!
//! Одна и та же упорядоченная схема задаёт порядок байт в пакете и порядок
//! колонок в CSV, поэтому они не могут разойтись.

use std::fmt;

/// Тип поля в бинарной раскладке.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F32,
}

/// Описание одного поля схемы: имя колонки и тип.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// Значение поля после декодирования.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    U8(u8),
    I8(i8),
    U16(u16),
    I16(i16),
    U32(u32),
    I32(i32),
    F32(f32),
}

/// Примитив, который может быть полем схемы.
pub trait FieldPrimitive: Copy {
    const KIND: FieldKind;

    fn into_value(self) -> FieldValue;

    fn from_value(value: FieldValue) -> Option<Self>;
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl FieldKind {
    /// Ширина поля в байтах.
    pub const fn width(&self) -> usize {
        match self {
            FieldKind::U8 | FieldKind::I8 => 1,
            FieldKind::U16 | FieldKind::I16 => 2,
            FieldKind::U32 | FieldKind::I32 | FieldKind::F32 => 4,
        }
    }
}

impl FieldValue {
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::U8(_) => FieldKind::U8,
            FieldValue::I8(_) => FieldKind::I8,
            FieldValue::U16(_) => FieldKind::U16,
            FieldValue::I16(_) => FieldKind::I16,
            FieldValue::U32(_) => FieldKind::U32,
            FieldValue::I32(_) => FieldKind::I32,
            FieldValue::F32(_) => FieldKind::F32,
        }
    }

    /// Значение как f64 (для отображения и графиков).
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::U8(v) => v as f64,
            FieldValue::I8(v) => v as f64,
            FieldValue::U16(v) => v as f64,
            FieldValue::I16(v) => v as f64,
            FieldValue::U32(v) => v as f64,
            FieldValue::I32(v) => v as f64,
            FieldValue::F32(v) => v as f64,
        }
    }
}

/// Суммарная ширина схемы в байтах (вычисляется на этапе компиляции).
pub const fn schema_width(schema: &[FieldSpec]) -> usize {
    let mut total = 0;
    let mut i = 0;

    while i < schema.len() {
        total += schema[i].kind.width();
        i += 1;
    }

    total
}

macro_rules! impl_field_primitive {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl FieldPrimitive for $ty {
                const KIND: FieldKind = FieldKind::$variant;

                fn into_value(self) -> FieldValue {
                    FieldValue::$variant(self)
                }

                fn from_value(value: FieldValue) -> Option<Self> {
                    match value {
                        FieldValue::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }
        )+
    };
}

impl_field_primitive! {
    u8 => U8,
    i8 => I8,
    u16 => U16,
    i16 => I16,
    u32 => U32,
    i32 => I32,
    f32 => F32,
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for FieldValue {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FieldValue::U8(v) => write!(f, "{v}"),
            FieldValue::I8(v) => write!(f, "{v}"),
            FieldValue::U16(v) => write!(f, "{v}"),
            FieldValue::I16(v) => write!(f, "{v}"),
            FieldValue::U32(v) => write!(f, "{v}"),
            FieldValue::I32(v) => write!(f, "{v}"),
            // Debug даёт "0.0" вместо "0", как в старых логах
            FieldValue::F32(v) => write!(f, "{v:?}"),
        }
    }
}
