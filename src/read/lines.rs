// src/read/lines.rs

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use super::{ReadError, Reader, RecordIter};

/// Yields every line of a text file without its line terminator.
#[derive(Debug, Clone)]
pub struct LineReader {
    path: PathBuf,
}

impl LineReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Reader for LineReader {
    type Item = String;

    fn read(&self) -> Result<RecordIter<String>, ReadError> {
        let file = File::open(&self.path)?;
        let lines = BufReader::new(file).lines().map(|line| line.map_err(ReadError::from));
        Ok(Box::new(lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn reads_lines_without_terminators() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "| f| ||||\na b\n").unwrap();

        let reader = LineReader::new(file.path());
        let got: Vec<String> = reader.read().unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(got, vec!["| f| ||||", "a b"]);
    }

    #[test]
    fn every_read_starts_over() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "one\ntwo").unwrap();

        let reader = LineReader::new(file.path());
        let first: Vec<String> = reader.read().unwrap().map(|l| l.unwrap()).collect();
        let second: Vec<String> = reader.read().unwrap().map(|l| l.unwrap()).collect();
        assert_eq!(first, vec!["one", "two"]);
        assert_eq!(first, second);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let reader = LineReader::new("/definitely/not/here.txt");
        assert!(matches!(reader.read(), Err(ReadError::Io(_))));
    }
}
