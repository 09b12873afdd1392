//! Append-only CSV журнал измерений.

use std::{
    fmt::Display,
    fs::{File, OpenOptions},
    io::Write,
    path::Path,
};

use snodar_types::{SnodarError, SnodarResult, SnologRecord};

/// CSV журнал: заголовок один раз, дальше строки по порядку.
///
/// Каждая строка сбрасывается на диск сразу после записи.
pub struct CsvLog<W: Write> {
    writer: csv::Writer<W>,
    rows_written: u64,
}

impl CsvLog<File> {
    /// Открывает журнал на дозапись. Заголовок пишется, только если файл
    /// новый или пустой.
    pub fn open_append<P, I, T>(
        path: P,
        header: I,
    ) -> SnodarResult<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path.as_ref())?;

        let is_empty = file.metadata()?.len() == 0;
        let mut log = Self::from_writer(file);

        if is_empty {
            log.write_header(header)?;
        }

        Ok(log)
    }

    /// Создаёт (перезаписывает) журнал и пишет заголовок.
    pub fn create<P, I, T>(
        path: P,
        header: I,
    ) -> SnodarResult<Self>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        let file = File::create(path.as_ref())?;
        let mut log = Self::from_writer(file);

        log.write_header(header)?;

        Ok(log)
    }
}

impl<W: Write> CsvLog<W> {
    pub fn from_writer(inner: W) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(inner);

        Self {
            writer,
            rows_written: 0,
        }
    }

    pub fn write_header<I, T>(
        &mut self,
        header: I,
    ) -> SnodarResult<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        self.writer.write_record(header).map_err(csv_error)?;
        self.writer.flush()?;

        Ok(())
    }

    /// Дописывает строку из произвольных отображаемых значений.
    pub fn append_fields<I, T>(
        &mut self,
        fields: I,
    ) -> SnodarResult<()>
    where
        I: IntoIterator<Item = T>,
        T: Display,
    {
        self.writer
            .write_record(fields.into_iter().map(|f| f.to_string()))
            .map_err(csv_error)?;
        self.writer.flush()?;
        self.rows_written += 1;

        Ok(())
    }

    /// Дописывает пакет snolog в порядке схемы.
    pub fn append_record(
        &mut self,
        record: &SnologRecord,
    ) -> SnodarResult<()> {
        self.append_fields(record.values())
    }

    /// Дописывает строку чисел (ASCII режим).
    pub fn append_row(
        &mut self,
        values: &[f64],
    ) -> SnodarResult<()> {
        // {:?} сохраняет ".0" у целых значений
        self.append_fields(values.iter().map(|v| format!("{v:?}")))
    }

    /// Сколько строк записано этим экземпляром (без заголовка).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn flush(&mut self) -> SnodarResult<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// csv::Error → SnodarError (I/O ошибки остаются I/O).
pub(crate) fn csv_error(e: csv::Error) -> SnodarError {
    let message = e.to_string();

    match e.into_kind() {
        csv::ErrorKind::Io(err) => SnodarError::Io(err),
        _ => SnodarError::Csv(message),
    }
}
