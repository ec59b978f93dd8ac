use crate::errors::ReadError;
use crate::serial::{decode_line, LineSource};
use log::{debug, trace};
use serialport::{DataBits, FlowControl, Parity, SerialPort, StopBits};
use std::io::{BufRead, BufReader, ErrorKind};
use std::time::Duration;

/// Default TIC "historique" speed.
pub const DEFAULT_BAUD_RATE: u32 = 1200;

/// Driver-level timeout; expiries are absorbed so `read_line` keeps blocking.
const DRIVER_TIMEOUT: Duration = Duration::from_secs(5);

/// Line source over a physical serial port, 7 data bits / even parity / 1 stop bit.
pub struct SerialLineSource {
    device: String,
    baud_rate: u32,
    reader: Option<BufReader<Box<dyn SerialPort>>>,
}

impl SerialLineSource {
    pub fn new(device: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            device: device.into(),
            baud_rate,
            reader: None,
        }
    }
}

impl LineSource for SerialLineSource {
    fn open(&mut self) -> Result<(), ReadError> {
        let port = serialport::new(&self.device, self.baud_rate)
            .data_bits(DataBits::Seven)
            .parity(Parity::Even)
            .stop_bits(StopBits::One)
            .flow_control(FlowControl::None)
            .timeout(DRIVER_TIMEOUT)
            .open()
            .map_err(|source| ReadError::Open {
                device: self.device.clone(),
                source,
            })?;
        debug!("Serial port {} opened at {} baud", self.device, self.baud_rate);
        self.reader = Some(BufReader::new(port));
        Ok(())
    }

    fn read_line(&mut self) -> Result<String, ReadError> {
        let reader = self.reader.as_mut().ok_or(ReadError::NotOpen)?;
        let mut buf = Vec::with_capacity(64);
        loop {
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) if buf.is_empty() => return Err(ReadError::Disconnected),
                Ok(_) => break,
                Err(e) if e.kind() == ErrorKind::TimedOut => {
                    // Partial bytes stay in `buf`; keep waiting for the rest.
                    trace!("No data from {} yet, still waiting", self.device);
                }
                Err(e) => return Err(ReadError::Io(e)),
            }
        }
        Ok(decode_line(&buf))
    }

    fn close(&mut self) {
        if self.reader.take().is_some() {
            debug!("Serial port {} closed", self.device);
        }
    }

    fn describe(&self) -> &str {
        &self.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_open_is_rejected() {
        let mut source = SerialLineSource::new("/dev/null-linky", DEFAULT_BAUD_RATE);
        assert!(matches!(source.read_line(), Err(ReadError::NotOpen)));
        source.close();
        assert_eq!(source.describe(), "/dev/null-linky");
    }

    #[test]
    fn open_missing_device_reports_device() {
        let mut source = SerialLineSource::new("/nonexistent/ttyLINKY", DEFAULT_BAUD_RATE);
        match source.open() {
            Err(ReadError::Open { device, .. }) => assert_eq!(device, "/nonexistent/ttyLINKY"),
            other => panic!("expected open failure, got {:?}", other.map(|_| ())),
        }
    }
}
