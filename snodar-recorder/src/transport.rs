//! Двунаправленный байтовый канал к датчику.

use std::{
    io::{self, Read, Write},
    time::Duration,
};

use log::{debug, info};
use serialport::{DataBits, Parity, SerialPort, StopBits};
use snodar_types::SnodarError;

use crate::{RecorderError, RecorderResult};

/// Таймаут одного опроса порта. Чтение в целом блокирующее: по таймауту
/// опрос просто повторяется.
const POLL_TIMEOUT: Duration = Duration::from_millis(500);

/// Предел длины строки телеметрии без `\n`.
pub const MAX_LINE_LEN: usize = 4096;

/// Канал к устройству. Принадлежит циклу измерений целиком.
///
/// Реализации: [`SerialTransport`] и [`crate::SimulatedDevice`].
pub trait Transport: Send {
    /// Человекочитаемое имя (для логов).
    fn name(&self) -> String;

    /// Пишет байты, возвращает сколько реально записано.
    fn write(
        &mut self,
        bytes: &[u8],
    ) -> RecorderResult<usize>;

    /// Блокируется, пока не заполнит `buf` или поток не закроется.
    ///
    /// Возвращает число прочитанных байт. Меньше `buf.len()` только если
    /// устройство закрыло поток на середине.
    fn read_exact(
        &mut self,
        buf: &mut [u8],
    ) -> RecorderResult<usize>;

    /// Читает строку до `\n` включительно (терминатор отрезается).
    ///
    /// Строка длиннее [`MAX_LINE_LEN`] даёт [`SnodarError::MalformedLine`];
    /// остаток строки придёт следующим вызовом.
    fn read_line(&mut self) -> RecorderResult<String> {
        let mut line = Vec::new();
        let mut byte = [0u8; 1];

        loop {
            if self.read_exact(&mut byte)? == 0 {
                return Err(RecorderError::transport(format!(
                    "{}: end of stream after {} bytes of a line",
                    self.name(),
                    line.len()
                )));
            }

            if byte[0] == b'\n' {
                break;
            }

            if line.len() >= MAX_LINE_LEN {
                return Err(SnodarError::malformed_line(format!(
                    "no line terminator within {MAX_LINE_LEN} bytes"
                ))
                .into());
            }

            line.push(byte[0]);
        }

        if line.last() == Some(&b'\r') {
            line.pop();
        }

        Ok(String::from_utf8_lossy(&line).into_owned())
    }

    /// Освобождает устройство. Повторный вызов ничего не делает.
    fn close(&mut self) -> RecorderResult<()>;
}

/// SNOdar на последовательном порту, 8N1.
pub struct SerialTransport {
    path: String,
    port: Option<Box<dyn SerialPort>>,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl SerialTransport {
    pub fn open(
        path: &str,
        baud_rate: u32,
    ) -> RecorderResult<Self> {
        info!("Opening serial port: {path} at {baud_rate} bps");

        let port = serialport::new(path, baud_rate)
            .data_bits(DataBits::Eight)
            .parity(Parity::None)
            .stop_bits(StopBits::One)
            .timeout(POLL_TIMEOUT)
            .open()
            .map_err(|e| match e.kind() {
                serialport::ErrorKind::NoDevice => RecorderError::DeviceNotFound(format!("{path}: {e}")),
                _ => RecorderError::Serial(e),
            })?;

        Ok(Self {
            path: path.to_string(),
            port: Some(port),
        })
    }

    fn port(&mut self) -> RecorderResult<&mut Box<dyn SerialPort>> {
        let path = &self.path;
        self.port
            .as_mut()
            .ok_or_else(|| RecorderError::transport(format!("{path}: port is closed")))
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> String {
        self.path.clone()
    }

    fn write(
        &mut self,
        bytes: &[u8],
    ) -> RecorderResult<usize> {
        let path = self.path.clone();
        let port = self.port()?;

        let n = port.write(bytes).map_err(|e| io_to_transport(&path, e))?;
        port.flush().map_err(|e| io_to_transport(&path, e))?;

        Ok(n)
    }

    fn read_exact(
        &mut self,
        buf: &mut [u8],
    ) -> RecorderResult<usize> {
        let path = self.path.clone();
        let port = self.port()?;
        let mut filled = 0;

        while filled < buf.len() {
            match port.read(&mut buf[filled..]) {
                Ok(0) => {
                    debug!("{path}: end of stream after {filled} of {} bytes", buf.len());
                    break;
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::TimedOut => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(io_to_transport(&path, e)),
            }
        }

        Ok(filled)
    }

    fn close(&mut self) -> RecorderResult<()> {
        if self.port.take().is_some() {
            debug!("Serial port {} closed", self.path);
        }

        Ok(())
    }
}

fn io_to_transport(
    path: &str,
    e: io::Error,
) -> RecorderError {
    RecorderError::transport(format!("{path}: {e}"))
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Отдаёт заранее заданные байты по одному.
    struct Scripted {
        bytes: VecDeque<u8>,
    }

    impl Transport for Scripted {
        fn name(&self) -> String {
            "scripted".into()
        }

        fn write(
            &mut self,
            bytes: &[u8],
        ) -> RecorderResult<usize> {
            Ok(bytes.len())
        }

        fn read_exact(
            &mut self,
            buf: &mut [u8],
        ) -> RecorderResult<usize> {
            let n = buf.len().min(self.bytes.len());
            for (dst, src) in buf.iter_mut().zip(self.bytes.drain(..n)) {
                *dst = src;
            }
            Ok(n)
        }

        fn close(&mut self) -> RecorderResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_default_read_line() {
        let mut t = Scripted {
            bytes: b"1,2,3\r\n4,5\n".iter().copied().collect(),
        };

        assert_eq!(t.read_line().unwrap(), "1,2,3");
        assert_eq!(t.read_line().unwrap(), "4,5");
        assert!(t.read_line().unwrap_err().is_transport());
    }

    #[test]
    fn test_read_exact_reports_short_count() {
        let mut t = Scripted {
            bytes: vec![1u8; 100].into(),
        };
        let mut buf = [0u8; 128];

        assert_eq!(t.read_exact(&mut buf).unwrap(), 100, "поток закрылся на 100 байтах");
        assert_eq!(t.read_exact(&mut buf).unwrap(), 0);
    }

    #[test]
    fn test_read_line_without_terminator_is_capped() {
        let mut bytes: VecDeque<u8> = std::iter::repeat(b'7').take(MAX_LINE_LEN + 10).collect();
        bytes.extend(b"\n1,2\n");
        let mut t = Scripted { bytes };

        let err = t.read_line().unwrap_err();
        assert!(
            matches!(err, RecorderError::Snodar(SnodarError::MalformedLine(_))),
            "ожидали MalformedLine, получили {err:?}"
        );

        // байт сверх предела потерян, остальной хвост приходит строкой
        assert_eq!(t.read_line().unwrap(), "7".repeat(9));
        assert_eq!(t.read_line().unwrap(), "1,2");
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialTransport::open("/dev/snodar-does-not-exist", 19_200);
        assert!(result.is_err(), "несуществующий порт не открывается");
    }
}
