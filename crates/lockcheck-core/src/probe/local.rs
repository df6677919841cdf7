//! In-sandbox capabilities that must keep working: file I/O and computation

use serde::Serialize;
use std::io::{self, Write};
use std::path::PathBuf;
use tempfile::NamedTempFile;

use super::{Attempt, Probe, names};

const FILE_PAYLOAD: &[u8] = b"lockcheck file probe\n";

/// Creates a temporary file, writes a known payload, reads it back and
/// deletes the file. The file is removed on every path, including failures.
#[derive(Debug, Clone, Default)]
pub struct FileIoProbe {
    dir: Option<PathBuf>,
}

impl FileIoProbe {
    pub fn new(dir: Option<PathBuf>) -> Self {
        Self { dir }
    }

    fn round_trip(&self) -> io::Result<PathBuf> {
        let mut file = match &self.dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        file.write_all(FILE_PAYLOAD)?;
        file.flush()?;

        let read_back = std::fs::read(file.path())?;
        if read_back != FILE_PAYLOAD {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "read back {} bytes, expected {}",
                    read_back.len(),
                    FILE_PAYLOAD.len()
                ),
            ));
        }

        let path = file.path().to_path_buf();
        file.close()?;
        Ok(path)
    }
}

impl Probe for FileIoProbe {
    fn name(&self) -> &str {
        names::FILE_IO
    }

    fn description(&self) -> &str {
        "Write, read back and delete a temporary file"
    }

    fn attempt(&self) -> Attempt {
        match self.round_trip() {
            Ok(path) => Attempt::succeeded(format!("round trip through {}", path.display())),
            Err(e) => Attempt::denied(format!("file I/O failed: {}", e)),
        }
    }
}

#[derive(Debug, Serialize)]
struct ComputationSample {
    pi_times_2: f64,
}

/// Pure in-process computation with a serialized result
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputationProbe;

impl Probe for ComputationProbe {
    fn name(&self) -> &str {
        names::LOCAL_COMPUTATION
    }

    fn description(&self) -> &str {
        "Compute and serialize a value in-process"
    }

    fn attempt(&self) -> Attempt {
        let sample = ComputationSample {
            pi_times_2: std::f64::consts::PI * 2.0,
        };
        if (sample.pi_times_2 - std::f64::consts::TAU).abs() > f64::EPSILON {
            return Attempt::denied(format!("unexpected result {}", sample.pi_times_2));
        }
        match serde_json::to_string(&sample) {
            Ok(json) => Attempt::succeeded(json),
            Err(e) => Attempt::denied(format!("serialization failed: {}", e)),
        }
    }
}
