//! Ядро форматов SNOdar
//!
//! Декодирование бинарных пакетов snolog (128 байт), разбор флагов здоровья,
//! ASCII телеметрия и CSV журналы измерений.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use snodar_core::{decode_snolog_checked, ChecksumMode, CsvLog};
//! use snodar_types::SnologRecord;
//!
//! let packet = std::fs::read("packet.bin")?;
//! let decoded = decode_snolog_checked(&packet, ChecksumMode::Ignore)?;
//!
//! for d in &decoded.diagnostics {
//!     eprintln!("{d}");
//! }
//!
//! let mut log = CsvLog::open_append("snodar.csv", SnologRecord::field_names())?;
//! log.append_record(&decoded.record)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod ascii;
pub mod augment;
pub mod binary;
pub mod csv_log;
pub mod format;
pub mod health;
pub mod stream;

pub use ascii::*;
pub use augment::*;
pub use binary::*;
pub use csv_log::CsvLog;
pub use format::*;
pub use health::*;
pub use stream::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use snodar_types::SNOLOG_SIZE;

    use super::*;

    #[test]
    fn test_library_exports() {
        assert_eq!(SNOLOG_SIZE, 128);
        assert_eq!(CHECKSUM_OFFSET, 127);
        assert_eq!(ASCII_FIELDNAMES.len(), 20);
        assert!(!VERSION.is_empty());
    }
}
