use std::{
    fs::{File, OpenOptions},
    io,
    path::{Path, PathBuf},
};

use crate::{codec::Sample, error::Result};

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

/// Append-only, headerless log of decoded samples:
/// `timestamp,acc_x,acc_y,acc_z,gyro_x,gyro_y,gyro_z`
pub struct SampleCSVWriter {
    writer: Option<csv::Writer<File>>,
    path: PathBuf,
}

impl SampleCSVWriter {
    pub fn open_append(path: &Path) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        Ok(Self {
            writer: Some(writer),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_closed(&self) -> bool {
        self.writer.is_none()
    }

    pub fn write(&mut self, sample: &Sample) -> Result<()> {
        let writer = self.writer.as_mut().ok_or_else(|| {
            io::Error::new(io::ErrorKind::Other, "sample log is already closed")
        })?;

        let mut row = Vec::<String>::with_capacity(7);
        row.push(sample.timestamp.format(TIMESTAMP_FORMAT).to_string());
        row.extend(sample.features().iter().map(|v| format!("{:?}", v)));
        writer.write_record(row)?;
        Ok(())
    }

    /// Flushes and releases the file. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use chrono::{Local, TimeZone};

    use super::*;

    fn sample() -> Sample {
        Sample {
            timestamp: Local.with_ymd_and_hms(2024, 5, 17, 10, 30, 5).unwrap(),
            accelerometer: [1.0, -0.5, 0.0009765625],
            gyroscope: [0.0, 2.0, -31.25],
            compass: [9.0, 9.0, 9.0],
        }
    }

    #[test]
    fn test_line_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut writer = SampleCSVWriter::open_append(&path).unwrap();
        writer.write(&sample()).unwrap();
        writer.close().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            content,
            "2024-05-17 10:30:05.000000,1.0,-0.5,0.0009765625,0.0,2.0,-31.25\n"
        );
    }

    #[test]
    fn test_appends_to_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        for _ in 0..2 {
            let mut writer = SampleCSVWriter::open_append(&path).unwrap();
            writer.write(&sample()).unwrap();
            writer.close().unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_close_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.csv");
        let mut writer = SampleCSVWriter::open_append(&path).unwrap();
        writer.write(&sample()).unwrap();
        writer.close().unwrap();
        writer.close().unwrap();
        assert!(writer.is_closed());
        assert!(writer.write(&sample()).is_err());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 1);
    }
}
