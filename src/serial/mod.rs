pub mod fake;
pub mod port;

pub use port::SerialLineSource;

use crate::errors::ReadError;
use log::trace;

/// A blocking source of decoded, trimmed text lines.
pub trait LineSource {
    /// Establish the connection. Failure ends the cycle before any read.
    fn open(&mut self) -> Result<(), ReadError>;

    /// Next line, blocking until one arrives.
    fn read_line(&mut self) -> Result<String, ReadError>;

    /// Release the connection. Must be safe to call after a failed read.
    fn close(&mut self);

    /// Human readable name for logs (device path for serial ports).
    fn describe(&self) -> &str;
}

/// An opened line source; closes it when dropped, whatever the exit path.
pub struct OpenSource<'a, S: LineSource + ?Sized> {
    source: &'a mut S,
}

impl<'a, S: LineSource + ?Sized> OpenSource<'a, S> {
    pub fn open(source: &'a mut S) -> Result<Self, ReadError> {
        source.open()?;
        trace!("Opened line source {}", source.describe());
        Ok(Self { source })
    }

    pub fn read_line(&mut self) -> Result<String, ReadError> {
        let line = self.source.read_line()?;
        trace!("Current line: '{}'", line);
        Ok(line)
    }
}

impl<S: LineSource + ?Sized> Drop for OpenSource<'_, S> {
    fn drop(&mut self) {
        self.source.close();
        trace!("Closed line source {}", self.source.describe());
    }
}

/// Decodes raw bytes as ASCII and strips whitespace plus the STX/ETX group
/// markers the meter wraps around each frame.
pub fn decode_line(raw: &[u8]) -> String {
    let text = String::from_utf8_lossy(raw);
    text.trim_matches(|c: char| c.is_whitespace() || c.is_control())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::fake::FakeLineSource;
    use super::*;

    #[test]
    fn decode_strips_line_endings_and_frame_markers() {
        assert_eq!(decode_line(b"\x02\nADCO 031234567890 X\r"), "ADCO 031234567890 X");
        assert_eq!(decode_line(b"MOTDETAT 000000 B\r\x03"), "MOTDETAT 000000 B");
        assert_eq!(decode_line(b"\r\n"), "");
    }

    #[test]
    fn guard_closes_on_drop() {
        let mut source = FakeLineSource::from_lines(&["ADCO 1 X"]);
        {
            let mut open = OpenSource::open(&mut source).unwrap();
            assert_eq!(open.read_line().unwrap(), "ADCO 1 X");
        }
        assert_eq!(source.opens(), 1);
        assert_eq!(source.closes(), 1);
        assert!(!source.is_open());
    }

    #[test]
    fn guard_closes_after_read_error() {
        let mut source = FakeLineSource::from_lines(&[]);
        {
            let mut open = OpenSource::open(&mut source).unwrap();
            assert!(matches!(open.read_line(), Err(ReadError::Disconnected)));
        }
        assert_eq!(source.closes(), 1);
    }

    #[test]
    fn failed_open_never_closes() {
        let mut source = FakeLineSource::from_lines(&["ADCO 1 X"]).failing_open();
        assert!(OpenSource::open(&mut source).is_err());
        assert_eq!(source.closes(), 0);
    }
}
