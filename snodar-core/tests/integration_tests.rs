use std::{fs, io::Cursor};

use snodar_core::{
    add_health_flags, audit, decode_health_flags, decode_snolog, decode_snolog_checked,
    decode_stream, encode_health_flags, encode_snolog, read_all_records, seal_sum8,
    AsciiTelemetry, ChecksumMode, CsvLog, ASCII_FIELDNAMES,
};
use snodar_types::{Diagnostic, HealthField, HealthFlags, SnodarError, SnologRecord, SNOLOG_SIZE};
use tempfile::tempdir;

// ===========================================================================
// Helpers — детерминированные тест-данные
// ===========================================================================

/// Детерминированный пакет: все датчики в порядке, фиксированное время.
fn deterministic_record(i: u32) -> SnologRecord {
    let (hi, lo) = encode_health_flags(&HealthFlags::from_fn(|_| true));

    SnologRecord {
        id: 7,
        version: 2,
        length: SNOLOG_SIZE as u16,
        unix_time: 1_704_067_200 + i * 30, // 2024-01-01 00:00:00 UTC
        power_mA: 120,
        power_V: 3300,
        pcb_temperature: -4.25,
        imu_quaternion0: 1.0,
        lidar_tc_distance: 1.875 - i as f32 * 0.125,
        seasonal_snow_depth: 0.25 + i as f32 * 0.125,
        sc_daily_max_time: -1,
        health_flags_hi: hi,
        health_flags_lo: lo,
        ..Default::default()
    }
}

fn sealed_packet(i: u32) -> [u8; SNOLOG_SIZE] {
    let mut packet = encode_snolog(&deterministic_record(i)).unwrap();
    seal_sum8(&mut packet);
    packet
}

// ===========================================================================
// Пакет → CSV
// ===========================================================================

#[test]
fn test_packet_to_csv_row() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snodar.csv");

    let decoded = decode_snolog_checked(&sealed_packet(0), ChecksumMode::Sum8).unwrap();
    assert!(decoded.diagnostics.is_empty(), "исправный пакет без диагностик");
    assert!(decoded.health.all_ok());

    {
        let mut log = CsvLog::open_append(&path, SnologRecord::field_names()).unwrap();
        log.append_record(&decoded.record).unwrap();
    }

    let text = fs::read_to_string(&path).unwrap();
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().unwrap().clone();
    let row = reader.records().next().unwrap().unwrap();

    let column = |name: &str| {
        let i = headers.iter().position(|h| h == name).unwrap();
        row.get(i).unwrap().to_string()
    };

    assert_eq!(headers.len(), 43);
    assert_eq!(column("unix_time"), "1704067200");
    assert_eq!(column("lidar_tc_distance"), "1.875");
    assert_eq!(column("pcb_temperature"), "-4.25");
    assert_eq!(column("sc_daily_max_time"), "-1");
    assert_eq!(column("health_flags_hi"), "31");
    assert_eq!(column("health_flags_lo"), "255");
}

#[test]
fn test_session_resumes_existing_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snodar.csv");

    for session in 0..2u32 {
        let mut log = CsvLog::open_append(&path, SnologRecord::field_names()).unwrap();
        for i in 0..3 {
            let record = decode_snolog(&sealed_packet(session * 3 + i)).unwrap();
            log.append_record(&record).unwrap();
        }
    }

    let text = fs::read_to_string(&path).unwrap();
    let rows: Vec<_> = text.lines().collect();

    assert_eq!(rows.len(), 1 + 6);
    assert!(rows[0].starts_with("id,"));
    assert!(rows[1..].iter().all(|r| r.starts_with("7,2,128,")));
}

// ===========================================================================
// Поток пакетов
// ===========================================================================

#[test]
fn test_stream_with_partial_tail() {
    let mut raw: Vec<u8> = (0..4).flat_map(sealed_packet).collect();
    raw.extend_from_slice(&[0xAA; 17]);

    let mut stream = decode_stream(Cursor::new(raw));
    let records = read_all_records(&mut stream).unwrap();

    assert_eq!(records.len(), 4);
    assert_eq!(records[3], deterministic_record(3));
    assert_eq!(stream.stats().packets_ok, 4);
    assert_eq!(stream.stats().bytes_processed, 4 * 128 + 17);
    assert_eq!(
        stream.tail_diagnostic(),
        Some(Diagnostic::TrailingBytesDropped { len: 17 })
    );
}

#[test]
fn test_short_packet_rejected() {
    let packet = sealed_packet(0);
    let err = decode_snolog(&packet[..100]).unwrap_err();

    assert!(matches!(
        err,
        SnodarError::MalformedPacket {
            found: 100,
            expected: 128
        }
    ));
}

// ===========================================================================
// Здоровье и контрольная сумма
// ===========================================================================

#[test]
fn test_unhealthy_packet_reports_each_failed_flag() {
    let mut record = deterministic_record(0);
    record.health_flags_hi = 0b1_1101; // lidar_time_ok сброшен
    record.health_flags_lo = 0b1111_1110; // imu_ready сброшен

    let mut packet = encode_snolog(&record).unwrap();
    seal_sum8(&mut packet);

    let decoded = decode_snolog_checked(&packet, ChecksumMode::Sum8).unwrap();
    let failed: Vec<_> = audit(&decoded.health).collect();

    assert_eq!(failed, [HealthField::LidarTimeOk, HealthField::ImuReady]);
    assert_eq!(
        decoded.diagnostics,
        [
            Diagnostic::UnhealthySensor {
                field: HealthField::LidarTimeOk
            },
            Diagnostic::UnhealthySensor {
                field: HealthField::ImuReady
            },
        ]
    );
}

#[test]
fn test_checksum_mismatch_keeps_record() {
    let mut packet = sealed_packet(1);
    packet[10] ^= 0xFF;

    let decoded = decode_snolog_checked(&packet, ChecksumMode::Sum8).unwrap();

    assert!(decoded
        .diagnostics
        .iter()
        .any(|d| matches!(d, Diagnostic::ChecksumMismatch { .. })));
    assert_eq!(decoded.record.id, 7, "запись возвращается несмотря на сумму");

    let ignored = decode_snolog_checked(&packet, ChecksumMode::Ignore).unwrap();
    assert!(ignored.diagnostics.is_empty());
}

// ===========================================================================
// Пост-обработка CSV
// ===========================================================================

#[test]
fn test_augment_recorded_log() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("snodar.csv");

    {
        let mut log = CsvLog::create(&path, SnologRecord::field_names()).unwrap();
        let mut bad = deterministic_record(1);
        bad.health_flags_hi = 0;
        log.append_record(&deterministic_record(0)).unwrap();
        log.append_record(&bad).unwrap();
    }

    assert_eq!(add_health_flags(&path).unwrap(), 2);

    let text = fs::read_to_string(&path).unwrap();
    let mut reader = csv::Reader::from_reader(text.as_bytes());
    let headers = reader.headers().unwrap().clone();
    let rows: Vec<_> = reader.records().map(|r| r.unwrap()).collect();

    assert_eq!(headers.len(), 43 + 13);

    let rtc = headers.iter().position(|h| h == "rtc_read_ok").unwrap();
    let imu = headers.iter().position(|h| h == "imu_ready").unwrap();

    assert_eq!(&rows[0][rtc], "True");
    assert_eq!(&rows[1][rtc], "False");
    assert_eq!(&rows[1][imu], "True");

    let flags = decode_health_flags(0, 255);
    assert!(!flags.get(HealthField::RtcReadOk));
}

// ===========================================================================
// ASCII режим
// ===========================================================================

#[test]
fn test_ascii_line_to_csv() {
    let line = "1700000000,35.5,12.1,20,21,22,0.1,0.2,0.3,1,30,31,1.234,0,-5.5,0.8,0.9,0.05,12,13\r\n";
    let telemetry = AsciiTelemetry::parse(line).unwrap();

    assert!(telemetry.has_known_layout());
    assert_eq!(telemetry.lidar_distance(), Some(1.234));
    assert_eq!(telemetry.snow_depth(), Some(0.8));

    let mut log = CsvLog::from_writer(Vec::new());
    log.write_header(ASCII_FIELDNAMES).unwrap();
    log.append_row(telemetry.values()).unwrap();
    assert_eq!(log.rows_written(), 1);
}
