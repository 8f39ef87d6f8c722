//! The semicolon-separated table of measurements.
//!
//! Columns are `S;k;B;r;N;log r;log N`: viewport scale, iterations,
//! grid resolution, boxes per unit length, occupied boxes, and the two
//! logarithms the dimension is fitted from.  Several runs are usually
//! appended to the same file.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use error::{Error, Result};
use sweep::Measurement;

/// The header line, without its newline.
pub const HEADER: &str = "S;k;B;r;N;log r;log N";

/// How an existing output file is treated.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum CsvMode {
    /// Add rows to the end.  A header is written only if the file is new
    /// or empty.
    Append,
    /// Start the file over with a header.
    Overwrite,
}

/// Writes measurements as they arrive.
pub struct CsvSink<W: Write> {
    out: W,
}

impl CsvSink<BufWriter<File>> {
    /// Opens `path` according to `mode`.
    pub fn open<P: AsRef<Path>>(path: P, mode: CsvMode) -> Result<CsvSink<BufWriter<File>>> {
        let file = match mode {
            CsvMode::Append => OpenOptions::new().create(true).append(true).open(path)?,
            CsvMode::Overwrite => File::create(path)?,
        };
        let header = file.metadata()?.len() == 0;
        CsvSink::new(BufWriter::new(file), header)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wraps a writer, starting with a header line if asked to.
    pub fn new(mut out: W, header: bool) -> Result<CsvSink<W>> {
        if header {
            writeln!(out, "{}", HEADER)?;
        }
        Ok(CsvSink { out })
    }

    /// Writes one row and flushes it, so an interrupted sweep keeps the
    /// levels it finished.
    pub fn write(&mut self, m: &Measurement) -> Result<()> {
        writeln!(
            self.out,
            "{};{};{};{};{};{};{}",
            m.scale,
            m.iterations,
            m.resolution,
            m.boxes_per_unit,
            m.count,
            m.log_r(),
            m.log_n()
        )?;
        self.out.flush()?;
        Ok(())
    }

    /// Gives the writer back.
    pub fn into_inner(self) -> W {
        self.out
    }
}

fn field<T: ::std::str::FromStr>(value: &str, name: &str, line: usize) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| Error::Csv {
        line,
        reason: format!("{} {:?} is not a number", name, value),
    })
}

/// Reads every row of a table.  Header lines and blank lines are skipped.
/// The two logarithm columns must be numbers but are recomputed from `r`
/// and `N`.
pub fn read_measurements<R: BufRead>(input: R) -> Result<Vec<Measurement>> {
    let mut measurements = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let line = line?;
        let number = index + 1;
        let line = line.trim();
        if line.is_empty() || line == HEADER {
            continue;
        }
        let columns: Vec<&str> = line.split(';').collect();
        if columns.len() != 7 {
            return Err(Error::Csv {
                line: number,
                reason: format!("expected 7 columns, found {}", columns.len()),
            });
        }
        field::<f64>(columns[5], "log r", number)?;
        field::<f64>(columns[6], "log N", number)?;
        measurements.push(Measurement {
            scale: field(columns[0], "S", number)?,
            iterations: field(columns[1], "k", number)?,
            resolution: field(columns[2], "B", number)?,
            boxes_per_unit: field(columns[3], "r", number)?,
            count: field(columns[4], "N", number)?,
        });
    }
    Ok(measurements)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::SweepConfig;
    use std::fs;
    use std::io::Cursor;
    use tempfile::tempdir;

    #[test]
    fn rows_look_like_the_classic_table() {
        let config = SweepConfig::default();
        let mut sink = CsvSink::new(Vec::new(), true).unwrap();
        sink.write(&Measurement::new(&config, 600, 1000)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "S;k;B;r;N;log r;log N\n6;1000;600;100;1000;2;3\n");
    }

    #[test]
    fn empty_count_writes_negative_infinity() {
        let config = SweepConfig::default();
        let mut sink = CsvSink::new(Vec::new(), false).unwrap();
        sink.write(&Measurement::new(&config, 6, 0)).unwrap();
        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "6;1000;6;1;0;0;-inf\n");
    }

    #[test]
    fn append_writes_header_once() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dim.csv");
        let config = SweepConfig::default();
        for count in &[10, 20] {
            let mut sink = CsvSink::open(&path, CsvMode::Append).unwrap();
            sink.write(&Measurement::new(&config, 16384, *count)).unwrap();
        }
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.matches(HEADER).count(), 1);
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn overwrite_starts_over() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dim.csv");
        fs::write(&path, "old junk\n").unwrap();
        let config = SweepConfig::default();
        let mut sink = CsvSink::open(&path, CsvMode::Overwrite).unwrap();
        sink.write(&Measurement::new(&config, 32, 5)).unwrap();
        drop(sink);
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.starts_with(HEADER));
        assert!(!text.contains("junk"));
    }

    #[test]
    fn reads_what_it_writes() {
        let config = SweepConfig::default();
        let written = vec![
            Measurement::new(&config, 16384, 123456),
            Measurement::new(&config, 8192, 40000),
            Measurement::new(&config, 4096, 0),
        ];
        let mut sink = CsvSink::new(Vec::new(), true).unwrap();
        for m in &written {
            sink.write(m).unwrap();
        }
        let bytes = sink.into_inner();
        assert_eq!(read_measurements(Cursor::new(bytes)).unwrap(), written);
    }

    #[test]
    fn reads_rounded_rows_and_skips_blanks() {
        let input = "6;1000;16384;2730.67;1234;3.43627;3.09132\n\n6;1000;8192;1365.33;600;3.13524;2.77815\n";
        let ms = read_measurements(Cursor::new(input)).unwrap();
        assert_eq!(ms.len(), 2);
        assert_eq!(ms[0].boxes_per_unit, 2730.67);
        assert_eq!(ms[1].count, 600);
    }

    #[test]
    fn malformed_rows_name_their_line() {
        match read_measurements(Cursor::new("S;k;B;r;N;log r;log N\n6;1000;x;1;1;0;0\n")) {
            Err(Error::Csv { line, .. }) => assert_eq!(line, 2),
            other => panic!("unexpected {:?}", other),
        }
        assert!(read_measurements(Cursor::new("1;2;3\n")).is_err());
    }

    #[test]
    fn log_columns_must_be_numbers() {
        match read_measurements(Cursor::new("6;1000;8;1;1;x;y\n")) {
            Err(Error::Csv { line, reason }) => {
                assert_eq!(line, 1);
                assert!(reason.contains("log r"));
            }
            other => panic!("unexpected {:?}", other),
        }
        let ms = read_measurements(Cursor::new("6;1000;6;1;0;0;-inf\n")).unwrap();
        assert_eq!(ms[0].count, 0);
    }
}
