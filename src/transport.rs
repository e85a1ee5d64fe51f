//! Links that carry command sets to the array.

use std::io::{BufRead, BufReader, ErrorKind, Write};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::config::LinkSettings;
use crate::encoder::CommandSet;
use crate::error::TransportError;

/// Outcome of one dispatched command set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    /// Commands whose acknowledgement never arrived. Not an error.
    pub timed_out: usize,
}

pub trait Transport {
    fn check_connection(&mut self) -> bool;

    /// Sends every command in order, blocking until each is acknowledged or
    /// its acknowledgement window expires.
    fn send(&mut self, commands: &CommandSet) -> Result<DispatchReport, TransportError>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn check_connection(&mut self) -> bool {
        (**self).check_connection()
    }

    fn send(&mut self, commands: &CommandSet) -> Result<DispatchReport, TransportError> {
        (**self).send(commands)
    }
}

/// Serial link that opens the port for each dispatch.
#[derive(Debug, Clone)]
pub struct SerialTransport {
    settings: LinkSettings,
}

impl SerialTransport {
    pub fn new(settings: LinkSettings) -> Self {
        Self { settings }
    }

    fn open(&self, timeout: Duration) -> Result<Box<dyn serialport::SerialPort>, TransportError> {
        serialport::new(&self.settings.port, self.settings.baud)
            .timeout(timeout)
            .open()
            .map_err(|source| TransportError::Open {
                port: self.settings.port.clone(),
                source,
            })
    }
}

impl Transport for SerialTransport {
    fn check_connection(&mut self) -> bool {
        match self.open(Duration::from_secs(1)) {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to open serial port: {}", e);
                false
            }
        }
    }

    fn send(&mut self, commands: &CommandSet) -> Result<DispatchReport, TransportError> {
        let port = self.open(self.settings.read_timeout())?;
        let mut reader = BufReader::new(port);
        let mut report = DispatchReport::default();

        for command in commands {
            let sent = report.sent;
            let io_failure = |source| TransportError::Io { sent, source };

            reader
                .get_mut()
                .write_all(format!("{command}\r\n").as_bytes())
                .map_err(io_failure)?;
            thread::sleep(self.settings.pacing());
            debug!("Sent: {}", command);
            report.sent += 1;

            let acknowledged =
                await_ack(&mut reader, self.settings.ack_timeout()).map_err(io_failure)?;
            if !acknowledged {
                warn!("No response to '{}'", command);
                report.timed_out += 1;
            }
        }
        thread::sleep(self.settings.pacing());
        Ok(report)
    }
}

// true once a line containing OK arrives or the device goes quiet;
// false when the window expires first
fn await_ack<R: BufRead>(reader: &mut R, window: Duration) -> std::io::Result<bool> {
    let start = Instant::now();
    let mut line = String::new();
    loop {
        if start.elapsed() >= window {
            return Ok(false);
        }
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => return Ok(true),
            Ok(_) if line.contains("OK") => return Ok(true),
            Ok(_) => continue,
            Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(true),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
}

/// Dry-run link: logs every command and acknowledges immediately.
#[derive(Debug, Clone, Default)]
pub struct LogTransport {
    pub dispatched: usize,
}

impl Transport for LogTransport {
    fn check_connection(&mut self) -> bool {
        true
    }

    fn send(&mut self, commands: &CommandSet) -> Result<DispatchReport, TransportError> {
        for command in commands {
            info!("Dry run: {}", command);
        }
        self.dispatched += commands.len();
        Ok(DispatchReport {
            sent: commands.len(),
            timed_out: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn ok_line_acknowledges() {
        let mut reader = Cursor::new(b"busy\r\nOK\r\n".to_vec());
        assert!(await_ack(&mut reader, Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn silence_acknowledges() {
        let mut reader = Cursor::new(Vec::new());
        assert!(await_ack(&mut reader, Duration::from_secs(1)).unwrap());
    }

    #[test]
    fn expired_window_is_a_timeout() {
        let mut reader = Cursor::new(b"busy\r\n".to_vec());
        assert!(!await_ack(&mut reader, Duration::ZERO).unwrap());
    }

    #[test]
    fn log_transport_counts_commands() {
        let mut boxed: Box<dyn Transport> = Box::new(LogTransport::default());
        assert!(boxed.check_connection());

        let mut transport = LogTransport::default();
        assert!(transport.check_connection());
        let commands = CommandSet::from(vec!["A".to_string(), "B".to_string()]);
        let report = transport.send(&commands).unwrap();
        assert_eq!(report, DispatchReport { sent: 2, timed_out: 0 });
        assert_eq!(transport.dispatched, 2);
    }
}
