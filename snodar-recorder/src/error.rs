use snodar_types::SnodarError;
use thiserror::Error;

pub type RecorderResult<T> = std::result::Result<T, RecorderError>;

#[derive(Debug, Error)]
pub enum RecorderError {
    /// Устройство (порт) не найдено или не открывается
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Сбой обмена с устройством (обрыв, пропало питание). Фатально для цикла.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Ошибка последовательного порта
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// Ошибка файлового ввода-вывода (CSV журнал)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка формата snolog / CSV
    #[error("Snodar error: {0}")]
    Snodar(#[from] SnodarError),

    /// Некорректная конфигурация
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Ошибка пайплайна (inter-thread)
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl RecorderError {
    pub fn transport<S: Into<String>>(s: S) -> Self {
        RecorderError::Transport(s.into())
    }

    /// Ошибка обмена с устройством: цикл должен закрыть транспорт и выйти.
    pub fn is_transport(&self) -> bool {
        matches!(self, RecorderError::Transport(_) | RecorderError::Serial(_))
    }
}
