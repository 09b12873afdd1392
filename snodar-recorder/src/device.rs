// Симулятор ведёт себя как SNOdar на проводе: на каждый `!USA\r` кладёт в
// очередь один запечатанный пакет snolog, в ASCII режиме сам выдаёт строки.
// Время в пакетах идёт с шагом интервала измерений, дистанция медленно
// уменьшается (снег копится), все флаги здоровья выставлены.

use std::collections::VecDeque;

use log::debug;
use snodar_core::{encode_health_flags, encode_snolog, seal_sum8};
use snodar_types::{HealthFlags, SnologRecord, SNOLOG_SIZE, TRIGGER_COMMAND};

use crate::{
    transport::{SerialTransport, Transport},
    AcquisitionMode, DeviceKind, RecorderConfig, RecorderError, RecorderResult,
};

/// Встроенный симулятор датчика.
pub struct SimulatedDevice {
    /// Unix время первого измерения
    pub start_unix_time: u32,
    /// Шаг времени между измерениями (секунды)
    pub step_secs: u32,
    /// Дистанция до поверхности в первом измерении (м)
    pub base_distance_m: f32,
    /// Прирост снега за измерение (м)
    pub accumulation_m: f32,
    /// Выдавать ASCII строки вместо пакетов
    pub ascii: bool,
    pending: VecDeque<u8>,
    measurements: u32,
    closed: bool,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SimulatedDevice {
    pub fn new(ascii: bool) -> Self {
        Self {
            start_unix_time: 1_700_000_000,
            step_secs: 30,
            base_distance_m: 2.0,
            accumulation_m: 0.002,
            ascii,
            pending: VecDeque::new(),
            measurements: 0,
            closed: false,
        }
    }

    /// Сколько измерений уже выдано.
    pub fn measurements(&self) -> u32 {
        self.measurements
    }

    fn next_sample(&mut self) -> (u32, f32, f32) {
        let n = self.measurements;
        self.measurements += 1;

        let depth = self.accumulation_m * n as f32;
        let unix_time = self.start_unix_time + n * self.step_secs;

        (unix_time, self.base_distance_m - depth, depth)
    }

    /// Следующий пакет snolog (128 байт, с Sum8).
    pub fn next_packet(&mut self) -> RecorderResult<[u8; SNOLOG_SIZE]> {
        let (unix_time, distance, depth) = self.next_sample();
        let (hi, lo) = encode_health_flags(&HealthFlags::from_fn(|_| true));

        let record = SnologRecord {
            id: 1,
            version: 1,
            length: SNOLOG_SIZE as u16,
            unix_time,
            power_mA: 35,
            power_V: 12_100,
            pcb_temperature: -2.5,
            imu_temperature: -2.0,
            imu_quaternion0: 1.0,
            lidar_soc_temperature: 5,
            lidar_pcb_temperature: 3,
            lidar_raw_distance: distance,
            lidar_doff_distance: distance,
            lidar_tc_distance: distance,
            lidar_meas_time: 120,
            nrf_temperature: -1,
            outside_temperature: -7.5,
            seasonal_snow_depth: depth,
            health_flags_hi: hi,
            health_flags_lo: lo,
            ..Default::default()
        };

        let mut packet = encode_snolog(&record)?;
        seal_sum8(&mut packet);

        Ok(packet)
    }

    /// Следующая ASCII строка телеметрии (20 полей, `\r\n`).
    pub fn next_ascii_line(&mut self) -> String {
        let (unix_time, distance, depth) = self.next_sample();

        format!(
            "{unix_time},35.0,12.1,-1.0,-2.5,-2.0,0.1,-0.3,181.0,1,5.0,3.0,{distance:.3},0,-7.5,{depth:.3},{depth:.3},0.0,0.0,0.0\r\n"
        )
    }
}

impl Transport for SimulatedDevice {
    fn name(&self) -> String {
        "Simulated SNOdar".to_string()
    }

    fn write(
        &mut self,
        bytes: &[u8],
    ) -> RecorderResult<usize> {
        if self.closed {
            return Err(RecorderError::transport("simulated device is closed"));
        }

        if !self.ascii && bytes == TRIGGER_COMMAND {
            let packet = self.next_packet()?;
            self.pending.extend(packet);
        } else {
            debug!("Simulated device ignored {} bytes", bytes.len());
        }

        Ok(bytes.len())
    }

    fn read_exact(
        &mut self,
        buf: &mut [u8],
    ) -> RecorderResult<usize> {
        if self.closed {
            return Err(RecorderError::transport("simulated device is closed"));
        }

        while self.ascii && self.pending.len() < buf.len() {
            let line = self.next_ascii_line();
            self.pending.extend(line.into_bytes());
        }

        if self.pending.len() < buf.len() {
            // Настоящее устройство здесь молчало бы вечно.
            return Err(RecorderError::transport(format!(
                "simulated device has {} of {} bytes (no trigger sent)",
                self.pending.len(),
                buf.len()
            )));
        }

        let n = buf.len();
        for (dst, src) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *dst = src;
        }

        Ok(n)
    }

    fn close(&mut self) -> RecorderResult<()> {
        self.closed = true;
        self.pending.clear();
        Ok(())
    }
}

/// Открывает транспорт по конфигурации.
pub fn open_transport(config: &RecorderConfig) -> RecorderResult<Box<dyn Transport>> {
    match config.device {
        DeviceKind::Simulated => Ok(Box::new(SimulatedDevice::new(
            config.mode == AcquisitionMode::Ascii,
        ))),
        DeviceKind::Serial => Ok(Box::new(SerialTransport::open(
            &config.port,
            config.baud_rate,
        )?)),
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use snodar_core::{decode_snolog_checked, AsciiTelemetry, ChecksumMode};

    use super::*;

    #[test]
    fn test_trigger_yields_sealed_packet() {
        let mut dev = SimulatedDevice::new(false);
        let mut buf = [0u8; SNOLOG_SIZE];

        assert_eq!(dev.write(TRIGGER_COMMAND).unwrap(), 5);
        assert_eq!(dev.read_exact(&mut buf).unwrap(), SNOLOG_SIZE);

        let decoded = decode_snolog_checked(&buf, ChecksumMode::Sum8).unwrap();
        assert!(decoded.diagnostics.is_empty(), "{:?}", decoded.diagnostics);
        assert!(decoded.health.all_ok());
        assert_eq!(decoded.record.unix_time, 1_700_000_000);
        assert_eq!(decoded.record.lidar_tc_distance, 2.0);
    }

    #[test]
    fn test_time_advances_per_measurement() {
        let mut dev = SimulatedDevice::new(false);
        let mut buf = [0u8; SNOLOG_SIZE];

        for expected in [1_700_000_000u32, 1_700_000_030, 1_700_000_060] {
            dev.write(TRIGGER_COMMAND).unwrap();
            dev.read_exact(&mut buf).unwrap();
            let rec = snodar_core::decode_snolog(&buf).unwrap();
            assert_eq!(rec.unix_time, expected);
        }

        assert_eq!(dev.measurements(), 3);
    }

    #[test]
    fn test_read_without_trigger_fails() {
        let mut dev = SimulatedDevice::new(false);
        let mut buf = [0u8; SNOLOG_SIZE];

        assert!(dev.read_exact(&mut buf).unwrap_err().is_transport());
    }

    #[test]
    fn test_ascii_mode_lines() {
        let mut dev = SimulatedDevice::new(true);

        let first = AsciiTelemetry::parse(&dev.read_line().unwrap()).unwrap();
        let second = AsciiTelemetry::parse(&dev.read_line().unwrap()).unwrap();

        assert!(first.has_known_layout());
        assert_eq!(first.timestamp(), 1_700_000_000.0);
        assert_eq!(second.timestamp(), 1_700_000_030.0);
        assert_eq!(first.lidar_distance(), Some(2.0));
        assert!(second.snow_depth().unwrap() > 0.0);
    }

    #[test]
    fn test_closed_device_rejects_io() {
        let mut dev = SimulatedDevice::new(false);
        dev.close().unwrap();
        dev.close().unwrap();

        assert!(dev.write(TRIGGER_COMMAND).is_err());
    }

    #[test]
    fn test_open_transport_simulated() {
        let config = RecorderConfig {
            device: DeviceKind::Simulated,
            ..Default::default()
        };

        let transport = open_transport(&config).unwrap();
        assert_eq!(transport.name(), "Simulated SNOdar");
    }
}
