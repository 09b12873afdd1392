//! Флаги "живого" здоровья SNOdar (два байта в конце snolog).

use std::fmt;

/// Байт, из которого берётся флаг.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthByte {
    High,
    Low,
}

/// Имя одного флага здоровья.
///
/// Порядок вариантов фиксирован: сначала старший байт (биты 0..4), затем
/// младший (биты 0..7). В этом же порядке идут предупреждения и колонки CSV.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HealthField {
    RtcReadOk,
    RtcTimeIncreased,
    LidarCountOk,
    LidarTimeOk,
    LidarRegistersOk,
    ImuReady,
    InaVoltageOk,
    InaCurrentOk,
    NrfTemperatureOk,
    Tmp1075TemperatureOk,
    LidarPcbTemperatureOk,
    LidarSocTemperatureOk,
    ImuQuaternionOk,
}

/// Набор из 13 флагов. Каждый флаг — ровно один бит входной пары байт.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthFlags {
    /// Удалось ли прочитать RTC
    pub rtc_read_ok: bool,
    /// Время RTC увеличилось с прошлого раза
    pub rtc_time_increased: bool,
    /// Корректно ли число измерений лидара
    pub lidar_count_ok: bool,
    /// true — лидар не ушёл в таймаут
    pub lidar_time_ok: bool,
    pub lidar_registers_ok: bool,
    /// Были ли готовы данные IMU
    pub imu_ready: bool,
    pub ina_voltage_ok: bool,
    pub ina_current_ok: bool,
    pub nrf_temperature_ok: bool,
    pub tmp1075_temperature_ok: bool,
    pub lidar_pcb_temperature_ok: bool,
    pub lidar_soc_temperature_ok: bool,
    /// Валиден ли кватернион IMU
    pub imu_quaternion_ok: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl HealthField {
    /// Все флаги в порядке объявления.
    pub const ALL: [HealthField; 13] = [
        HealthField::RtcReadOk,
        HealthField::RtcTimeIncreased,
        HealthField::LidarCountOk,
        HealthField::LidarTimeOk,
        HealthField::LidarRegistersOk,
        HealthField::ImuReady,
        HealthField::InaVoltageOk,
        HealthField::InaCurrentOk,
        HealthField::NrfTemperatureOk,
        HealthField::Tmp1075TemperatureOk,
        HealthField::LidarPcbTemperatureOk,
        HealthField::LidarSocTemperatureOk,
        HealthField::ImuQuaternionOk,
    ];

    /// Источник флага: байт и номер бита (0 = младший).
    pub const fn location(&self) -> (HealthByte, u8) {
        match self {
            HealthField::RtcReadOk => (HealthByte::High, 0),
            HealthField::RtcTimeIncreased => (HealthByte::High, 1),
            HealthField::LidarCountOk => (HealthByte::High, 2),
            HealthField::LidarTimeOk => (HealthByte::High, 3),
            HealthField::LidarRegistersOk => (HealthByte::High, 4),
            HealthField::ImuReady => (HealthByte::Low, 0),
            HealthField::InaVoltageOk => (HealthByte::Low, 1),
            HealthField::InaCurrentOk => (HealthByte::Low, 2),
            HealthField::NrfTemperatureOk => (HealthByte::Low, 3),
            HealthField::Tmp1075TemperatureOk => (HealthByte::Low, 4),
            HealthField::LidarPcbTemperatureOk => (HealthByte::Low, 5),
            HealthField::LidarSocTemperatureOk => (HealthByte::Low, 6),
            HealthField::ImuQuaternionOk => (HealthByte::Low, 7),
        }
    }

    /// Битовая маска внутри своего байта.
    pub const fn mask(&self) -> u8 {
        1 << self.location().1
    }

    /// Имя колонки CSV.
    pub const fn name(&self) -> &'static str {
        match self {
            HealthField::RtcReadOk => "rtc_read_ok",
            HealthField::RtcTimeIncreased => "rtc_time_increased",
            HealthField::LidarCountOk => "lidar_count_ok",
            HealthField::LidarTimeOk => "lidar_time_ok",
            HealthField::LidarRegistersOk => "lidar_registers_ok",
            HealthField::ImuReady => "imu_ready",
            HealthField::InaVoltageOk => "ina_voltage_ok",
            HealthField::InaCurrentOk => "ina_current_ok",
            HealthField::NrfTemperatureOk => "nrf_temperature_ok",
            HealthField::Tmp1075TemperatureOk => "tmp1075_temperature_ok",
            HealthField::LidarPcbTemperatureOk => "lidar_pcb_temperature_ok",
            HealthField::LidarSocTemperatureOk => "lidar_soc_temperature_ok",
            HealthField::ImuQuaternionOk => "imu_quaternion_ok",
        }
    }

    /// Текст предупреждения, когда флаг сброшен.
    pub const fn warning(&self) -> &'static str {
        match self {
            HealthField::RtcReadOk => "RTC read was not ok",
            HealthField::RtcTimeIncreased => "RTC time didn't increase",
            HealthField::LidarCountOk => "lidar measurement count was not ok",
            HealthField::LidarTimeOk => "lidar timeout occurred",
            HealthField::LidarRegistersOk => "lidar registers were not ok",
            HealthField::ImuReady => "IMU data was not ready",
            HealthField::InaVoltageOk => "INA voltage read was not ok",
            HealthField::InaCurrentOk => "INA current read was not ok",
            HealthField::NrfTemperatureOk => "nRF temperature read was not ok",
            HealthField::Tmp1075TemperatureOk => "TMP1075 temperature read was not ok",
            HealthField::LidarPcbTemperatureOk => "lidar PCB temperature read was not ok",
            HealthField::LidarSocTemperatureOk => "lidar SoC temperature read was not ok",
            HealthField::ImuQuaternionOk => "IMU quaternion was not ok",
        }
    }
}

impl HealthFlags {
    /// Значение конкретного флага.
    pub fn get(
        &self,
        field: HealthField,
    ) -> bool {
        match field {
            HealthField::RtcReadOk => self.rtc_read_ok,
            HealthField::RtcTimeIncreased => self.rtc_time_increased,
            HealthField::LidarCountOk => self.lidar_count_ok,
            HealthField::LidarTimeOk => self.lidar_time_ok,
            HealthField::LidarRegistersOk => self.lidar_registers_ok,
            HealthField::ImuReady => self.imu_ready,
            HealthField::InaVoltageOk => self.ina_voltage_ok,
            HealthField::InaCurrentOk => self.ina_current_ok,
            HealthField::NrfTemperatureOk => self.nrf_temperature_ok,
            HealthField::Tmp1075TemperatureOk => self.tmp1075_temperature_ok,
            HealthField::LidarPcbTemperatureOk => self.lidar_pcb_temperature_ok,
            HealthField::LidarSocTemperatureOk => self.lidar_soc_temperature_ok,
            HealthField::ImuQuaternionOk => self.imu_quaternion_ok,
        }
    }

    fn slot(
        &mut self,
        field: HealthField,
    ) -> &mut bool {
        match field {
            HealthField::RtcReadOk => &mut self.rtc_read_ok,
            HealthField::RtcTimeIncreased => &mut self.rtc_time_increased,
            HealthField::LidarCountOk => &mut self.lidar_count_ok,
            HealthField::LidarTimeOk => &mut self.lidar_time_ok,
            HealthField::LidarRegistersOk => &mut self.lidar_registers_ok,
            HealthField::ImuReady => &mut self.imu_ready,
            HealthField::InaVoltageOk => &mut self.ina_voltage_ok,
            HealthField::InaCurrentOk => &mut self.ina_current_ok,
            HealthField::NrfTemperatureOk => &mut self.nrf_temperature_ok,
            HealthField::Tmp1075TemperatureOk => &mut self.tmp1075_temperature_ok,
            HealthField::LidarPcbTemperatureOk => &mut self.lidar_pcb_temperature_ok,
            HealthField::LidarSocTemperatureOk => &mut self.lidar_soc_temperature_ok,
            HealthField::ImuQuaternionOk => &mut self.imu_quaternion_ok,
        }
    }

    /// Собирает флаги по предикату для каждого поля.
    pub fn from_fn(mut f: impl FnMut(HealthField) -> bool) -> Self {
        let mut flags = HealthFlags::default();

        for field in HealthField::ALL {
            *flags.slot(field) = f(field);
        }

        flags
    }

    /// Разбирает пару байт здоровья. Лишние биты игнорируются.
    pub fn from_bytes(
        high: u8,
        low: u8,
    ) -> Self {
        Self::from_fn(|field| {
            let byte = match field.location().0 {
                HealthByte::High => high,
                HealthByte::Low => low,
            };

            byte & field.mask() != 0
        })
    }

    /// Разбирает упакованную форму `high << 8 | low` (колонка
    /// `LIVE_HEALTH_FLAGS` в логах мобильного приложения).
    pub fn from_packed(packed: u16) -> Self {
        let [high, low] = packed.to_be_bytes();
        Self::from_bytes(high, low)
    }

    /// Пары (флаг, значение) в порядке объявления.
    pub fn iter(&self) -> impl Iterator<Item = (HealthField, bool)> + Clone + '_ {
        HealthField::ALL.iter().map(move |&field| (field, self.get(field)))
    }

    /// Все флаги выставлены.
    pub fn all_ok(&self) -> bool {
        self.iter().all(|(_, ok)| ok)
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов
////////////////////////////////////////////////////////////////////////////////

impl fmt::Display for HealthField {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// `rtc_read_ok=True, rtc_time_increased=False, ...` в порядке таблицы.
impl fmt::Display for HealthFlags {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        for (i, (field, ok)) in self.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{field}={}", if ok { "True" } else { "False" })?;
        }

        Ok(())
    }
}

impl std::str::FromStr for HealthField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HealthField::ALL
            .iter()
            .copied()
            .find(|field| field.name() == s)
            .ok_or_else(|| format!("Unknown health flag: '{s}'"))
    }
}
