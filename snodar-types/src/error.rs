use thiserror::Error;

/// Результат для операций SNOdar
pub type SnodarResult<T> = std::result::Result<T, SnodarError>;

/// Типы ошибок декодирования и форматов SNOdar.
#[derive(Debug, Error)]
pub enum SnodarError {
    /// Длина буфера snolog не равна 128 байтам
    #[error("Malformed snolog packet: expected {expected} bytes, got {found}")]
    MalformedPacket { found: usize, expected: usize },

    /// Строка ASCII телеметрии не разбирается
    #[error("Malformed telemetry line: {0}")]
    MalformedLine(String),

    /// Значения не соответствуют схеме записи
    #[error("Schema violation: {0}")]
    SchemaViolation(String),

    /// В CSV нет колонок с флагами здоровья
    #[error("CSV file doesn't have health flags in it (expected health_flags_hi/health_flags_lo or LIVE_HEALTH_FLAGS)")]
    MissingHealthColumns,

    /// Некорректное значение в колонке CSV
    #[error("Invalid value '{value}' in column '{column}'")]
    InvalidField { column: String, value: String },

    /// Ошибки CSV (сообщение от csv crate)
    #[error("CSV error: {0}")]
    Csv(String),

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SnodarError {
    /// Удобные конструкторы
    pub fn malformed_packet(found: usize) -> Self {
        Self::MalformedPacket {
            found,
            expected: crate::SNOLOG_SIZE,
        }
    }

    pub fn malformed_line<S: Into<String>>(s: S) -> Self {
        Self::MalformedLine(s.into())
    }

    pub fn schema_violation<S: Into<String>>(s: S) -> Self {
        Self::SchemaViolation(s.into())
    }

    pub fn invalid_field<C: Into<String>, V: Into<String>>(
        column: C,
        value: V,
    ) -> Self {
        Self::InvalidField {
            column: column.into(),
            value: value.into(),
        }
    }
}
