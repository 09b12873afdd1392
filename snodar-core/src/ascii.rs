//! ASCII телеметрия: одна строка десятичных чисел через запятую.
//!
//! Поля позиционные, первое всегда Unix-время. Набор колонок зависит от
//! прошивки; известная раскладка описана в [`ASCII_FIELDNAMES`].

use snodar_types::{SnodarError, SnodarResult};

/// Заголовок CSV для ASCII режима (режим "snow depth").
pub const ASCII_FIELDNAMES: [&str; 20] = [
    "Time",
    "Current (mA)",
    "Voltage (V)",
    "NRF Temperature",
    "PCB Temperature",
    "IMU Temperature",
    "IMU Roll",
    "IMU Pitch",
    "IMU Yaw",
    "IMU Flag",
    "Lidar SoC Temperature",
    "Lidar PCB Temperature",
    "Lidar Distance",
    "Heater Enabled",
    "Outside Temperature",
    "Seasonal Snow Depth",
    "Seasonal Snow Fall",
    "New Snow Fall",
    "DoY SWE",
    "Temp SWE",
];

/// Индекс колонки "Lidar Distance".
pub const LIDAR_DISTANCE_COLUMN: usize = 12;

/// Индекс колонки "Seasonal Snow Depth".
pub const SNOW_DEPTH_COLUMN: usize = 15;

/// Разобранная строка ASCII телеметрии.
#[derive(Debug, Clone, PartialEq)]
pub struct AsciiTelemetry {
    values: Vec<f64>,
}

impl AsciiTelemetry {
    /// Разбирает строку (терминатор строки допускается).
    pub fn parse(line: &str) -> SnodarResult<Self> {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            return Err(SnodarError::malformed_line("empty line"));
        }

        let values = trimmed
            .split(',')
            .map(|field| {
                let field = field.trim();
                field
                    .parse::<f64>()
                    .map_err(|e| SnodarError::malformed_line(format!("'{field}': {e}")))
            })
            .collect::<SnodarResult<Vec<_>>>()?;

        Ok(Self { values })
    }

    /// Unix-время (первое поле).
    pub fn timestamp(&self) -> f64 {
        self.values[0]
    }

    pub fn get(
        &self,
        column: usize,
    ) -> Option<f64> {
        self.values.get(column).copied()
    }

    pub fn lidar_distance(&self) -> Option<f64> {
        self.get(LIDAR_DISTANCE_COLUMN)
    }

    pub fn snow_depth(&self) -> Option<f64> {
        self.get(SNOW_DEPTH_COLUMN)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Число полей совпадает с известной раскладкой.
    pub fn has_known_layout(&self) -> bool {
        self.values.len() == ASCII_FIELDNAMES.len()
    }
}
