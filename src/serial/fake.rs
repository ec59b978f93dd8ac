use crate::errors::ReadError;
use crate::serial::LineSource;
use std::collections::VecDeque;
use std::io;

/// Scripted line source used in tests. Once the script runs dry every read
/// returns `ReadError::Disconnected`.
#[derive(Default)]
pub struct FakeLineSource {
    script: VecDeque<Result<String, ReadError>>,
    fail_open: bool,
    open: bool,
    opens: usize,
    closes: usize,
}

impl FakeLineSource {
    pub fn new(script: Vec<Result<String, ReadError>>) -> Self {
        Self {
            script: script.into(),
            ..Self::default()
        }
    }

    pub fn from_lines(lines: &[&str]) -> Self {
        Self::new(lines.iter().map(|line| Ok(line.to_string())).collect())
    }

    /// Every `open()` fails with a permission error.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    pub fn push_line(&mut self, line: &str) {
        self.script.push_back(Ok(line.to_string()));
    }

    pub fn push_lines(&mut self, lines: &[&str]) {
        for line in lines {
            self.push_line(line);
        }
    }

    pub fn push_error(&mut self, err: ReadError) {
        self.script.push_back(Err(err));
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    pub fn opens(&self) -> usize {
        self.opens
    }

    pub fn closes(&self) -> usize {
        self.closes
    }

    pub fn is_open(&self) -> bool {
        self.open
    }
}

impl LineSource for FakeLineSource {
    fn open(&mut self) -> Result<(), ReadError> {
        if self.fail_open {
            return Err(ReadError::Io(io::Error::new(
                io::ErrorKind::PermissionDenied,
                "scripted open failure",
            )));
        }
        self.open = true;
        self.opens += 1;
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ReadError> {
        if !self.open {
            return Err(ReadError::NotOpen);
        }
        self.script.pop_front().unwrap_or(Err(ReadError::Disconnected))
    }

    fn close(&mut self) {
        self.open = false;
        self.closes += 1;
    }

    fn describe(&self) -> &str {
        "fake"
    }
}
