//! Incremental tail reads of a growing job log file.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;

/// Cursor over an append-only log file.
///
/// Tracks the byte offset of everything returned so far. One cursor
/// belongs to exactly one job's log file; a new job gets a fresh cursor
/// at offset 0. The offset never rewinds: truncation or rotation of the
/// underlying file violates the append-only assumption and may corrupt
/// the returned output.
#[derive(Debug)]
pub struct LogTail {
    path: PathBuf,
    offset: u64,
}

impl LogTail {
    /// Create a cursor at the start of `path`. The file need not exist yet.
    pub fn new(path: PathBuf) -> Self {
        Self { path, offset: 0 }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    #[allow(dead_code)]
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Read all lines appended since the last call.
    ///
    /// A missing file yields an empty result with the cursor unchanged;
    /// this is the normal window between submission and the scheduler
    /// creating the log. Lines are never returned twice and no bytes
    /// are skipped between calls.
    pub fn read_new(&mut self) -> io::Result<Vec<String>> {
        let mut file = match File::open(&self.path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        file.seek(SeekFrom::Start(self.offset))?;

        let mut content = String::new();
        file.read_to_string(&mut content)?;

        if content.is_empty() {
            return Ok(Vec::new());
        }

        self.offset += content.len() as u64;
        Ok(content.lines().map(|l| l.to_string()).collect())
    }
}
