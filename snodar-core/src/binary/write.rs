use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use snodar_types::FieldValue;

/// Пишет одно поле схемы (little-endian, без выравнивания).
pub fn write_field<W: Write>(
    writer: &mut W,
    value: FieldValue,
) -> io::Result<()> {
    match value {
        FieldValue::U8(v) => writer.write_u8(v),
        FieldValue::I8(v) => writer.write_i8(v),
        FieldValue::U16(v) => writer.write_u16::<LittleEndian>(v),
        FieldValue::I16(v) => writer.write_i16::<LittleEndian>(v),
        FieldValue::U32(v) => writer.write_u32::<LittleEndian>(v),
        FieldValue::I32(v) => writer.write_i32::<LittleEndian>(v),
        FieldValue::F32(v) => writer.write_f32::<LittleEndian>(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_field_layout() {
        let mut buf = Vec::new();

        write_field(&mut buf, FieldValue::U16(0x0201)).unwrap();
        write_field(&mut buf, FieldValue::I8(-1)).unwrap();
        write_field(&mut buf, FieldValue::F32(1.0)).unwrap();

        // 1.0f32 = 0x3F800000
        assert_eq!(buf, vec![0x01, 0x02, 0xFF, 0x00, 0x00, 0x80, 0x3F]);
    }
}
