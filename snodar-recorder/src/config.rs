use std::{path::PathBuf, time::Duration};

use snodar_core::ChecksumMode;

/// Источник данных (выбор при старте).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceKind {
    /// Встроенный симулятор (не требует железа).
    Simulated,
    /// SNOdar на последовательном порту (RS-232 / USB-UART).
    Serial,
}

/// Режим работы регистратора.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionMode {
    /// Запрос `!USA\r` → бинарный пакет snolog.
    #[default]
    Snolog,
    /// Пассивный приём ASCII строк (устройство меряет само).
    Ascii,
}

/// Какое поле пакета отправлять в живой график.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayField {
    #[default]
    TcDistance,
    SnowDepth,
}

/// Что делать с пакетом, который не удалось разобрать.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Залогировать и перейти к следующему циклу.
    #[default]
    Skip,
    /// Остановить цикл с ошибкой.
    Abort,
}

/// Параметры цикла измерений.
#[derive(Debug, Clone)]
pub struct AcquisitionConfig {
    /// Период между запросами (от запроса до запроса)
    pub measurement_interval: Duration,
    /// Пауза между запросом и чтением ответа
    pub read_delay: Duration,
    /// Поле для живого графика
    pub display_field: DisplayField,
    /// Проверка контрольной суммы пакета
    pub checksum: ChecksumMode,
    /// Ёмкость канала к графику (точек)
    pub display_capacity: usize,
    /// Политика для битых пакетов
    pub on_malformed: MalformedPolicy,
    /// Логировать каждую запись на уровне info
    pub verbose: bool,
    /// Остановиться после N циклов (None = до Ctrl+C)
    pub max_cycles: Option<u64>,
}

/// Полная конфигурация сессии записи.
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Источник данных
    pub device: DeviceKind,
    /// Путь к порту (`/dev/ttyUSB0`, `COM3`)
    pub port: String,
    /// Скорость порта, бод
    pub baud_rate: u32,
    /// Режим работы
    pub mode: AcquisitionMode,
    /// Путь к CSV журналу (дозапись)
    pub csv_path: PathBuf,
    /// Интервал вывода статистики (секунды)
    pub stats_interval_secs: u64,
    /// Параметры цикла
    pub acquisition: AcquisitionConfig,
}

/// Скорость порта SNOdar по умолчанию.
pub const DEFAULT_BAUD_RATE: u32 = 19_200;

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для DeviceKind, AcquisitionMode, DisplayField,
// MalformedPolicy
////////////////////////////////////////////////////////////////////////////////

impl std::fmt::Display for DeviceKind {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DeviceKind::Simulated => write!(f, "sim"),
            DeviceKind::Serial => write!(f, "serial"),
        }
    }
}

impl std::str::FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sim" | "simulated" => Ok(DeviceKind::Simulated),
            "serial" | "rs232" | "uart" => Ok(DeviceKind::Serial),
            _ => Err(format!("Unknown device type: '{s}'. Use: serial, sim")),
        }
    }
}

impl std::fmt::Display for AcquisitionMode {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            AcquisitionMode::Snolog => write!(f, "snolog"),
            AcquisitionMode::Ascii => write!(f, "ascii"),
        }
    }
}

impl std::str::FromStr for AcquisitionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "snolog" | "manual" | "binary" => Ok(AcquisitionMode::Snolog),
            "ascii" => Ok(AcquisitionMode::Ascii),
            _ => Err(format!("Unknown mode: '{s}'. Use: snolog, ascii")),
        }
    }
}

impl std::fmt::Display for DisplayField {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DisplayField::TcDistance => write!(f, "distance"),
            DisplayField::SnowDepth => write!(f, "depth"),
        }
    }
}

impl std::str::FromStr for DisplayField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "distance" | "tc_distance" | "lidar_tc_distance" => Ok(DisplayField::TcDistance),
            "depth" | "snow_depth" | "seasonal_snow_depth" => Ok(DisplayField::SnowDepth),
            _ => Err(format!("Unknown display field: '{s}'. Use: distance, depth")),
        }
    }
}

impl std::str::FromStr for MalformedPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "skip" => Ok(MalformedPolicy::Skip),
            "abort" | "stop" => Ok(MalformedPolicy::Abort),
            _ => Err(format!("Unknown policy: '{s}'. Use: skip, abort")),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            measurement_interval: Duration::from_secs(30),
            read_delay: Duration::ZERO,
            display_field: DisplayField::TcDistance,
            checksum: ChecksumMode::Ignore,
            display_capacity: 1,
            on_malformed: MalformedPolicy::Skip,
            verbose: false,
            max_cycles: None,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            device: DeviceKind::Serial,
            port: String::from("/dev/ttyUSB0"),
            baud_rate: DEFAULT_BAUD_RATE,
            mode: AcquisitionMode::Snolog,
            csv_path: PathBuf::from("snodar.csv"),
            stats_interval_secs: 300,
            acquisition: AcquisitionConfig::default(),
        }
    }
}

/// Парсит длительность в секунды.
///
/// Поддерживает суффиксы: `ms`, `s`, `m`, `h`; без суффикса — секунды
/// (допускается дробная часть).
///
/// # Примеры
/// ```
/// use std::time::Duration;
/// use snodar_recorder::config::parse_duration;
/// assert_eq!(parse_duration("30").unwrap(), Duration::from_secs(30));
/// assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
/// assert_eq!(parse_duration("500ms").unwrap(), Duration::from_millis(500));
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let lower = s.to_lowercase();

    let (num_str, scale) = if let Some(v) = lower.strip_suffix("ms") {
        (v.trim(), Scale::Div(1_000.0))
    } else if let Some(v) = lower.strip_suffix('s') {
        (v.trim(), Scale::Mul(1.0))
    } else if let Some(v) = lower.strip_suffix('m') {
        (v.trim(), Scale::Mul(60.0))
    } else if let Some(v) = lower.strip_suffix('h') {
        (v.trim(), Scale::Mul(3_600.0))
    } else {
        (lower.as_str(), Scale::Mul(1.0))
    };

    let n: f64 = num_str
        .parse()
        .map_err(|e| format!("Invalid duration '{s}': {e}"))?;

    if !n.is_finite() || n < 0.0 {
        return Err(format!("Invalid duration '{s}': must be non-negative"));
    }

    let secs = match scale {
        Scale::Mul(k) => n * k,
        Scale::Div(k) => n / k,
    };

    Ok(Duration::from_secs_f64(secs))
}

enum Scale {
    Mul(f64),
    Div(f64),
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////
