// Byte-oriented link to the tracking host
//
// The controller only needs three primitives: is a byte waiting, read one
// byte, write one status line. Anything that can do that is a link.

use serialport::{self, SerialPort};
use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Read timeout for the serial port; reads only happen once a byte is waiting
pub const DEFAULT_TIMEOUT_MS: u64 = 100;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, LinkError>;

pub trait SerialLink {
    /// Non-blocking check for a pending byte
    fn available(&mut self) -> Result<bool>;

    fn read_byte(&mut self) -> Result<u8>;

    fn write_line(&mut self, line: &str) -> Result<()>;

    /// False once the far end has gone away for good
    fn is_open(&self) -> bool {
        true
    }

    /// Discard every byte that is currently waiting, returning how many
    fn drain(&mut self) -> Result<usize> {
        let mut dropped = 0;
        while self.available()? {
            self.read_byte()?;
            dropped += 1;
        }
        Ok(dropped)
    }
}

/// Link over a real serial port
pub struct PortLink {
    port: Box<dyn SerialPort>,
}

impl PortLink {
    pub fn open_with_baudrate(port_name: &str, baudrate: u32) -> Result<Self> {
        info!("Opening serial link on {} at {} baud", port_name, baudrate);
        let port = serialport::new(port_name, baudrate)
            .timeout(Duration::from_millis(DEFAULT_TIMEOUT_MS))
            .open()?;

        Ok(Self { port })
    }
}

impl SerialLink for PortLink {
    fn available(&mut self) -> Result<bool> {
        Ok(self.port.bytes_to_read()? > 0)
    }

    fn read_byte(&mut self) -> Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        // Same terminator as Arduino's Serial.println
        self.port.write_all(line.as_bytes())?;
        self.port.write_all(b"\r\n")?;
        self.port.flush()?;
        Ok(())
    }
}

/// Link over stdin/stdout, for running without hardware.
///
/// A reader thread feeds stdin into a channel so `available` never blocks.
/// Newlines are passed through like any other byte, which the controller
/// rejects as invalid commands unless they land in a drain.
pub struct StdioLink {
    rx: Receiver<u8>,
    pending: VecDeque<u8>,
    closed: bool,
}

impl StdioLink {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = io::stdin();
            let mut lock = stdin.lock();
            loop {
                let buf = match lock.fill_buf() {
                    Ok([]) => break,
                    Ok(buf) => buf.to_vec(),
                    Err(e) => {
                        debug!("stdin read failed: {}", e);
                        break;
                    }
                };
                lock.consume(buf.len());
                for byte in buf {
                    if tx.send(byte).is_err() {
                        return;
                    }
                }
            }
            debug!("stdin closed");
        });

        Self::from_receiver(rx)
    }

    pub fn from_receiver(rx: Receiver<u8>) -> Self {
        Self {
            rx,
            pending: VecDeque::new(),
            closed: false,
        }
    }

    fn fill(&mut self) {
        if self.closed {
            return;
        }
        loop {
            match self.rx.try_recv() {
                Ok(byte) => self.pending.push_back(byte),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.closed = true;
                    break;
                }
            }
        }
    }
}

impl SerialLink for StdioLink {
    fn available(&mut self) -> Result<bool> {
        self.fill();
        Ok(!self.pending.is_empty())
    }

    fn read_byte(&mut self) -> Result<u8> {
        self.fill();
        self.pending.pop_front().ok_or(LinkError::Closed)
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", line)?;
        out.flush()?;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !(self.closed && self.pending.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_link_reads_in_order() {
        let (tx, rx) = mpsc::channel();
        let mut link = StdioLink::from_receiver(rx);
        assert!(!link.available().unwrap());

        tx.send(b'L').unwrap();
        tx.send(b'R').unwrap();
        assert!(link.available().unwrap());
        assert_eq!(link.read_byte().unwrap(), b'L');
        assert_eq!(link.read_byte().unwrap(), b'R');
        assert!(!link.available().unwrap());
    }

    #[test]
    fn test_drain_counts_dropped_bytes() {
        let (tx, rx) = mpsc::channel();
        let mut link = StdioLink::from_receiver(rx);
        for byte in b"RRR\n" {
            tx.send(*byte).unwrap();
        }
        assert_eq!(link.drain().unwrap(), 4);
        assert!(!link.available().unwrap());
    }

    #[test]
    fn test_closed_after_sender_dropped() {
        let (tx, rx) = mpsc::channel();
        let mut link = StdioLink::from_receiver(rx);
        tx.send(b'I').unwrap();
        drop(tx);

        // Buffered bytes are still delivered before the close is reported
        assert!(link.available().unwrap());
        assert!(link.is_open());
        assert_eq!(link.read_byte().unwrap(), b'I');
        assert!(!link.available().unwrap());
        assert!(!link.is_open());
        assert!(matches!(link.read_byte(), Err(LinkError::Closed)));
    }
}
