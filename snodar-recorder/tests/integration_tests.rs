use std::{fs, sync::atomic::Ordering, thread, time::Duration};

use snodar_core::{ChecksumMode, CsvLog, ASCII_FIELDNAMES};
use snodar_recorder::{
    display_channel, open_transport, AcquisitionConfig, AcquisitionLoop, AcquisitionMode,
    AsciiLogger, DeviceKind, RecorderConfig, SimulatedDevice,
};
use snodar_types::SnologRecord;
use tempfile::tempdir;

// ===========================================================================
// Helpers
// ===========================================================================

/// Быстрая конфигурация: миллисекундный интервал, фиксированное число циклов.
fn fast_config(cycles: u64) -> AcquisitionConfig {
    AcquisitionConfig {
        measurement_interval: Duration::from_millis(20),
        read_delay: Duration::from_millis(2),
        checksum: ChecksumMode::Sum8,
        display_capacity: 16,
        max_cycles: Some(cycles),
        ..Default::default()
    }
}

fn csv_rows(text: &str) -> Vec<csv::StringRecord> {
    csv::Reader::from_reader(text.as_bytes())
        .records()
        .map(|r| r.unwrap())
        .collect()
}

// ===========================================================================
// Snolog режим
// ===========================================================================

#[test]
fn test_simulated_session_writes_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snodar.csv");

    let config = RecorderConfig {
        device: DeviceKind::Simulated,
        csv_path: path.clone(),
        acquisition: fast_config(3),
        ..Default::default()
    };

    let transport = open_transport(&config).unwrap();
    let log = CsvLog::open_append(&config.csv_path, SnologRecord::field_names()).unwrap();
    let (tx, rx) = display_channel(config.acquisition.display_capacity);

    let (acq, metrics) = AcquisitionLoop::new(config.acquisition.clone());
    acq.run(transport, log, Some(tx)).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let rows = csv_rows(&text);

    assert_eq!(rows.len(), 3);
    assert_eq!(&rows[0][3], "1700000000", "unix_time");
    assert_eq!(&rows[2][3], "1700000060");

    assert_eq!(metrics.packets_decoded.load(Ordering::Relaxed), 3);
    assert_eq!(metrics.checksum_mismatches.load(Ordering::Relaxed), 0);
    assert_eq!(metrics.unhealthy_flags.load(Ordering::Relaxed), 0);

    let points: Vec<_> = rx.try_iter().collect();
    assert_eq!(points.len(), 3);
    assert!(points.windows(2).all(|p| p[0].unix_time < p[1].unix_time));
}

#[test]
fn test_second_session_appends() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snodar.csv");

    for _ in 0..2 {
        let log = CsvLog::open_append(&path, SnologRecord::field_names()).unwrap();
        let (acq, _) = AcquisitionLoop::new(fast_config(2));
        acq.run(Box::new(SimulatedDevice::new(false)), log, None)
            .unwrap();
    }

    let text = fs::read_to_string(&path).unwrap();

    assert_eq!(text.lines().filter(|l| l.starts_with("id,")).count(), 1);
    assert_eq!(csv_rows(&text).len(), 4);
}

#[test]
fn test_stop_signal_from_other_thread() {
    let mut cfg = fast_config(0);
    cfg.max_cycles = None;

    let (acq, metrics) = AcquisitionLoop::new(cfg);
    let stop = acq.stop_signal();

    let worker = thread::spawn(move || {
        acq.run(
            Box::new(SimulatedDevice::new(false)),
            CsvLog::from_writer(Vec::new()),
            None,
        )
    });

    thread::sleep(Duration::from_millis(100));
    assert_eq!(stop.request(), 1);

    let result = worker.join().unwrap();
    assert!(result.is_ok(), "мягкая остановка не ошибка");
    assert!(metrics.cycles.load(Ordering::Relaxed) >= 1);
}

// ===========================================================================
// ASCII режим
// ===========================================================================

#[test]
fn test_ascii_session_writes_csv() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("ascii.csv");

    let config = RecorderConfig {
        device: DeviceKind::Simulated,
        mode: AcquisitionMode::Ascii,
        csv_path: path.clone(),
        acquisition: fast_config(4),
        ..Default::default()
    };

    let transport = open_transport(&config).unwrap();
    let log = CsvLog::open_append(&path, ASCII_FIELDNAMES).unwrap();

    let (logger, metrics) = AsciiLogger::new(config.acquisition.clone());
    logger.run(transport, log, None).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let rows = csv_rows(&text);

    assert!(text.starts_with("Time,Current (mA),Voltage (V)"));
    assert_eq!(rows.len(), 4);
    assert_eq!(&rows[0][0], "1700000000.0");
    assert_eq!(&rows[0][12], "2.0");
    assert_eq!(metrics.malformed_packets.load(Ordering::Relaxed), 0);
}
