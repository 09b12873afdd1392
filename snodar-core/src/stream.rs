use std::io::Read;

use log::debug;
use snodar_types::{Diagnostic, SnodarResult, SnologRecord, SNOLOG_SIZE};

use crate::{binary::read_full, format::decode_snolog};

/// Потоковый декодер: последовательность пакетов snolog подряд.
pub struct SnologStream<R: Read> {
    reader: R,
    buf: [u8; SNOLOG_SIZE],
    stats: StreamStats,
    done: bool,
}

/// Статистика, накопленная [`SnologStream`] в процессе чтения.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct StreamStats {
    /// Успешно декодированных пакетов.
    pub packets_ok: u64,
    /// Всего прочитано байт (включая отброшенный хвост).
    pub bytes_processed: u64,
    /// Размер отброшенного неполного хвоста (0 если хвоста нет).
    pub dropped_tail_bytes: usize,
}

/// Декодирует поток пакетов по 128 байт до конца ввода.
///
/// Неполный последний пакет молча отбрасывается (см.
/// [`SnologStream::tail_diagnostic`]).
pub fn decode_stream<R: Read>(reader: R) -> SnologStream<R> {
    SnologStream::new(reader)
}

impl<R: Read> SnologStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: [0u8; SNOLOG_SIZE],
            stats: StreamStats::default(),
            done: false,
        }
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Сырые байты пакета, который последним вернул `next()`.
    ///
    /// Для проверки контрольной суммы по исходным данным, без повторного
    /// кодирования записи.
    pub fn last_packet(&self) -> &[u8; SNOLOG_SIZE] {
        &self.buf
    }

    /// Сколько байт неполного хвоста было отброшено.
    pub fn dropped_tail_bytes(&self) -> usize {
        self.stats.dropped_tail_bytes
    }

    /// Диагностика об отброшенном хвосте, если он был.
    pub fn tail_diagnostic(&self) -> Option<Diagnostic> {
        (self.stats.dropped_tail_bytes > 0).then_some(Diagnostic::TrailingBytesDropped {
            len: self.stats.dropped_tail_bytes,
        })
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    // Старое поведение: хвост короче пакета не считается ошибкой.
    fn drop_partial_tail(
        &mut self,
        len: usize,
    ) {
        debug!("Dropping {len} trailing bytes (partial snolog packet)");
        self.stats.dropped_tail_bytes = len;
        self.done = true;
    }
}

impl<R: Read> Iterator for SnologStream<R> {
    type Item = SnodarResult<SnologRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let n = match read_full(&mut self.reader, &mut self.buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e.into()));
            }
        };

        self.stats.bytes_processed += n as u64;

        match n {
            0 => {
                self.done = true;
                None
            }
            SNOLOG_SIZE => {
                let result = decode_snolog(&self.buf);
                if result.is_ok() {
                    self.stats.packets_ok += 1;
                }
                Some(result)
            }
            partial => {
                self.drop_partial_tail(partial);
                None
            }
        }
    }
}

/// Читает все пакеты из потока. Прерывается на первой ошибке.
pub fn read_all_records<R: Read>(stream: &mut SnologStream<R>) -> SnodarResult<Vec<SnologRecord>> {
    stream.by_ref().collect()
}

#[cfg(test)]
mod tests {
    use std::io::{self, Cursor};

    use super::*;
    use crate::format::encode_snolog;

    fn packets(n: u32) -> Vec<u8> {
        (0..n)
            .flat_map(|i| {
                let rec = SnologRecord {
                    id: i as u8,
                    unix_time: 1_700_000_000 + i * 30,
                    ..Default::default()
                };
                encode_snolog(&rec).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_exact_multiple() {
        let mut stream = decode_stream(Cursor::new(packets(3)));
        let records = read_all_records(&mut stream).unwrap();

        assert_eq!(records.len(), 3);
        for (i, rec) in records.iter().enumerate() {
            assert_eq!(rec.id, i as u8, "порядок сохраняется");
            assert_eq!(rec.unix_time, 1_700_000_000 + i as u32 * 30);
        }
        assert_eq!(stream.stats().packets_ok, 3);
        assert_eq!(stream.stats().dropped_tail_bytes, 0);
        assert!(stream.tail_diagnostic().is_none());
    }

    #[test]
    fn test_partial_tail_dropped() {
        let mut raw = packets(2);
        raw.extend_from_slice(&[0xAA; 100]);

        let mut stream = decode_stream(Cursor::new(raw));
        let records = read_all_records(&mut stream).unwrap();

        assert_eq!(records.len(), 2, "floor(356 / 128) = 2");
        assert_eq!(stream.stats().dropped_tail_bytes, 100);
        assert_eq!(stream.stats().bytes_processed, 356);
        assert_eq!(
            stream.tail_diagnostic(),
            Some(Diagnostic::TrailingBytesDropped { len: 100 })
        );
        // После хвоста итератор остаётся завершённым
        assert!(stream.next().is_none());
    }

    #[test]
    fn test_last_packet_is_raw_chunk() {
        let raw = packets(2);
        let mut stream = decode_stream(Cursor::new(raw.clone()));

        stream.next().unwrap().unwrap();
        assert_eq!(&stream.last_packet()[..], &raw[..SNOLOG_SIZE]);

        stream.next().unwrap().unwrap();
        assert_eq!(&stream.last_packet()[..], &raw[SNOLOG_SIZE..]);
    }

    #[test]
    fn test_input_shorter_than_packet() {
        let mut stream = decode_stream(Cursor::new(vec![1u8; 127]));
        assert!(stream.next().is_none());
        assert_eq!(stream.stats().dropped_tail_bytes, 127);
    }

    #[test]
    fn test_empty_input() {
        let mut stream = decode_stream(io::empty());
        assert!(stream.next().is_none());
        assert_eq!(stream.stats(), &StreamStats::default());
    }

    #[test]
    fn test_io_error_yielded_once() {
        struct Broken;

        impl Read for Broken {
            fn read(
                &mut self,
                _buf: &mut [u8],
            ) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone"))
            }
        }

        let mut stream = decode_stream(Broken);
        assert!(matches!(stream.next(), Some(Err(_))));
        assert!(stream.next().is_none());
    }
}
