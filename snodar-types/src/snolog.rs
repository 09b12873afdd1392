//! Пакет snolog: 128 байт телеметрии и состояния датчиков SNOdar.
//!
//! Раскладка (little-endian, без выравнивания):
//! ```text
//! [0]       id                     u8
//! [1]       version                u8
//! [2..4]    length                 u16
//! [4..8]    unix_time              u32
//! [8..12]   power_mA, power_V      i16 × 2
//! [12..20]  pcb/imu temperature    f32 × 2
//! [20..36]  imu_quaternion0..3     f32 × 4
//! [36..48]  imu roll/pitch/yaw     f32 × 3
//! [48..52]  imu_flag, heater_enable, lidar soc/pcb temperature
//! [52..64]  lidar raw/doff/tc distance  f32 × 3
//! [64..68]  lidar_meas_time u16, lidar_status u8, nrf_temperature i8
//! [68..92]  outside temperature + snow metrics  f32 × 6
//! [92..124] sc_* статистика            (i32, f32) × 4
//! [124..128] health_flags_lo, health_flags_hi, reserved, checksum
//! ```

use crate::{
    schema::{schema_width, FieldPrimitive, FieldSpec, FieldValue},
    SnodarError, SnodarResult,
};

/// Размер пакета snolog в байтах.
pub const SNOLOG_SIZE: usize = 128;

/// Команда запуска измерения лидара (NUS "!USA" + CR).
pub const TRIGGER_COMMAND: &[u8; 5] = b"!USA\r";

/// Из одного списка полей получаем структуру, схему и перевод в/из значений.
macro_rules! snolog_layout {
    ($( $(#[$meta:meta])* $name:ident : $ty:ty ),+ $(,)?) => {
        /// Декодированный пакет snolog.
        #[allow(non_snake_case)]
        #[derive(Debug, Clone, Copy, Default, PartialEq)]
        pub struct SnologRecord {
            $( $(#[$meta])* pub $name: $ty, )+
        }

        /// Упорядоченная схема snolog: порядок байт и порядок колонок CSV.
        pub const SNOLOG_SCHEMA: &[FieldSpec] = &[
            $( FieldSpec { name: stringify!($name), kind: <$ty as FieldPrimitive>::KIND }, )+
        ];

        impl SnologRecord {
            /// Значения полей в порядке схемы.
            pub fn values(&self) -> Vec<FieldValue> {
                vec![ $( FieldPrimitive::into_value(self.$name), )+ ]
            }

            /// Собирает запись из значений в порядке схемы.
            pub fn from_values(values: &[FieldValue]) -> SnodarResult<Self> {
                if values.len() != SNOLOG_SCHEMA.len() {
                    return Err(SnodarError::schema_violation(format!(
                        "expected {} values, got {}",
                        SNOLOG_SCHEMA.len(),
                        values.len()
                    )));
                }

                let mut it = values.iter().copied();

                Ok(SnologRecord {
                    $( $name: take_field(&mut it, stringify!($name))?, )+
                })
            }
        }
    };
}

snolog_layout! {
    id: u8,
    version: u8,
    /// Длина пакета, заявленная устройством
    length: u16,
    unix_time: u32,
    /// Ток, мА
    power_mA: i16,
    /// Напряжение
    power_V: i16,
    /// °C
    pcb_temperature: f32,
    /// °C
    imu_temperature: f32,
    imu_quaternion0: f32,
    imu_quaternion1: f32,
    imu_quaternion2: f32,
    imu_quaternion3: f32,
    /// Радианы
    imu_roll: f32,
    /// Радианы
    imu_pitch: f32,
    /// Радианы
    imu_yaw: f32,
    imu_flag: u8,
    heater_enable: u8,
    /// °C
    lidar_soc_temperature: i8,
    /// °C
    lidar_pcb_temperature: i8,
    /// Метры
    lidar_raw_distance: f32,
    /// Метры
    lidar_doff_distance: f32,
    /// Метры, с температурной компенсацией
    lidar_tc_distance: f32,
    /// Секунды
    lidar_meas_time: u16,
    lidar_status: u8,
    /// °C
    nrf_temperature: i8,
    /// °C
    outside_temperature: f32,
    /// Метры
    seasonal_snow_depth: f32,
    /// Метры
    seasonal_snow_fall: f32,
    /// Метры
    new_snow_fall: f32,
    /// Метры
    doy_swe: f32,
    /// Метры
    temp_swe: f32,
    sc_daily_max_time: i32,
    sc_daily_max_depth: f32,
    sc_daily_min_time: i32,
    sc_daily_min_depth: f32,
    sc_abs_min_time: i32,
    sc_abs_min_depth: f32,
    sc_min_max_cntr: i32,
    sc_daily_acc_sf: f32,
    health_flags_lo: u8,
    health_flags_hi: u8,
    reserved: u8,
    checksum: u8,
}

/// Суммарная ширина схемы, должна совпадать с [`SNOLOG_SIZE`].
pub const SNOLOG_SCHEMA_WIDTH: usize = schema_width(SNOLOG_SCHEMA);

const _: () = assert!(SNOLOG_SCHEMA_WIDTH == SNOLOG_SIZE);

fn take_field<T: FieldPrimitive>(
    it: &mut impl Iterator<Item = FieldValue>,
    name: &str,
) -> SnodarResult<T> {
    let value = it
        .next()
        .ok_or_else(|| SnodarError::schema_violation(format!("missing field {name}")))?;

    T::from_value(value).ok_or_else(|| {
        SnodarError::schema_violation(format!(
            "field {name}: expected {:?}, got {:?}",
            T::KIND,
            value.kind()
        ))
    })
}

impl SnologRecord {
    /// Кватернион IMU как массив.
    pub fn imu_quaternion(&self) -> [f32; 4] {
        [
            self.imu_quaternion0,
            self.imu_quaternion1,
            self.imu_quaternion2,
            self.imu_quaternion3,
        ]
    }

    /// Имена колонок CSV (совпадают с порядком [`SnologRecord::values`]).
    pub fn field_names() -> impl Iterator<Item = &'static str> {
        SNOLOG_SCHEMA.iter().map(|spec| spec.name)
    }
}
