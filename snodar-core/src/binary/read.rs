use std::io::{self, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use snodar_types::{FieldKind, FieldValue};

/// Читает одно поле схемы (little-endian, без выравнивания).
pub fn read_field<R: Read>(
    reader: &mut R,
    kind: FieldKind,
) -> io::Result<FieldValue> {
    let value = match kind {
        FieldKind::U8 => FieldValue::U8(reader.read_u8()?),
        FieldKind::I8 => FieldValue::I8(reader.read_i8()?),
        FieldKind::U16 => FieldValue::U16(reader.read_u16::<LittleEndian>()?),
        FieldKind::I16 => FieldValue::I16(reader.read_i16::<LittleEndian>()?),
        FieldKind::U32 => FieldValue::U32(reader.read_u32::<LittleEndian>()?),
        FieldKind::I32 => FieldValue::I32(reader.read_i32::<LittleEndian>()?),
        FieldKind::F32 => FieldValue::F32(reader.read_f32::<LittleEndian>()?),
    };

    Ok(value)
}

/// Заполняет `buf` целиком, насколько хватит данных.
///
/// Возвращает число прочитанных байт: `buf.len()` или меньше на EOF.
pub fn read_full<R: Read>(
    reader: &mut R,
    buf: &mut [u8],
) -> io::Result<usize> {
    let mut filled = 0;

    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reader, отдающий данные по одному байту.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(
            &mut self,
            buf: &mut [u8],
        ) -> io::Result<usize> {
            if self.0.is_empty() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.0[0];
            self.0 = &self.0[1..];
            Ok(1)
        }
    }

    #[test]
    fn test_read_field_little_endian() {
        let mut src: &[u8] = &[0x01, 0x02, 0xFF, 0xFF, 0xFF, 0xFF];

        assert_eq!(
            read_field(&mut src, FieldKind::U16).unwrap(),
            FieldValue::U16(0x0201)
        );
        assert_eq!(
            read_field(&mut src, FieldKind::I32).unwrap(),
            FieldValue::I32(-1)
        );
        assert!(read_field(&mut src, FieldKind::U8).is_err());
    }

    #[test]
    fn test_read_full_collects_short_reads() {
        let data = [7u8; 10];
        let mut buf = [0u8; 8];

        let n = read_full(&mut Trickle(&data), &mut buf).unwrap();
        assert_eq!(n, 8);
        assert_eq!(buf, [7u8; 8]);
    }

    #[test]
    fn test_read_full_reports_eof() {
        let data = [1u8, 2, 3];
        let mut buf = [0u8; 8];

        let n = read_full(&mut Trickle(&data), &mut buf).unwrap();
        assert_eq!(n, 3);
    }
}
