//! Serial Transport
//!
//! Frames raw bytes into command lines and hands them to the command
//! service through a bounded queue.
//!
//! ```text
//!  byte source ──▶ LineFramer ──try_send──▶ [ queue, capacity N ] ──▶ LineReceiver
//!                                  │
//!                                  └─ full: line dropped
//! ```
//!
//! The producer never waits on the queue. When it is full the completed line
//! is dropped and the sender is not told.

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Lines waiting for the command service
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Line buffer size; one slot is reserved for the terminator
///
/// The longest valid command, `pos-set -90.0000000 -180.0000000 -32768`, is
/// 39 bytes.
pub const DEFAULT_MAX_LINE_LEN: usize = 48;

/// Terminator appended to every response line
pub const RESPONSE_TERMINATOR: &str = "\r\n";

/// Create the bounded line queue between framer and command service
pub fn line_channel(capacity: usize) -> (LineSender, LineReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (LineSender { tx }, LineReceiver { rx })
}

#[derive(Debug, Clone)]
pub struct LineSender {
    tx: mpsc::Sender<String>,
}

impl LineSender {
    /// Enqueue a line without waiting; returns `false` if it was dropped
    pub fn offer(&self, line: String) -> bool {
        match self.tx.try_send(line) {
            Ok(()) => true,
            Err(TrySendError::Full(line)) => {
                debug!("Line queue full, dropping {:?}", line);
                false
            }
            Err(TrySendError::Closed(line)) => {
                debug!("Command service gone, dropping {:?}", line);
                false
            }
        }
    }
}

#[derive(Debug)]
pub struct LineReceiver {
    rx: mpsc::Receiver<String>,
}

impl LineReceiver {
    /// Wait for the next line; `None` once every producer is gone
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }
}

/// Accumulates bytes until `\n` or `\r` and enqueues the completed line
///
/// A line that outgrows the buffer is discarded as a whole at its
/// terminator; a truncated command is never delivered.
pub struct LineFramer {
    buffer: Vec<u8>,
    max_line_len: usize,
    overflowed: bool,
    sender: LineSender,
}

impl LineFramer {
    pub fn new(sender: LineSender, max_line_len: usize) -> Self {
        let max_line_len = max_line_len.max(2);
        Self {
            buffer: Vec::with_capacity(max_line_len),
            max_line_len,
            overflowed: false,
            sender,
        }
    }

    pub fn push(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            match byte {
                b'\n' | b'\r' => self.flush(),
                _ if self.overflowed => {}
                _ if self.buffer.len() + 1 < self.max_line_len => self.buffer.push(byte),
                _ => self.overflowed = true,
            }
        }
    }

    /// Enqueue whatever is buffered; an empty buffer sends nothing
    pub fn flush(&mut self) {
        if self.overflowed {
            warn!(
                "Discarding line longer than {} bytes: {:?}...",
                self.max_line_len - 1,
                String::from_utf8_lossy(&self.buffer)
            );
            self.buffer.clear();
            self.overflowed = false;
            return;
        }
        if self.buffer.is_empty() {
            return;
        }
        let line = String::from_utf8_lossy(&self.buffer).into_owned();
        self.buffer.clear();
        self.sender.offer(line);
    }
}

/// Feed a byte source into the framer until it reaches end of stream
pub async fn pump<R>(mut reader: R, mut framer: LineFramer) -> Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; 64];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .context("Failed to read from serial transport")?;
        if n == 0 {
            framer.flush();
            info!("Serial transport closed");
            return Ok(());
        }
        framer.push(&buf[..n]);
    }
}

/// Writes response lines back over the transport
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub async fn write_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(RESPONSE_TERMINATOR.as_bytes()).await?;
        Ok(())
    }

    pub async fn write_lines(&mut self, lines: &[String]) -> Result<()> {
        for line in lines {
            self.write_line(line).await?;
        }
        self.writer
            .flush()
            .await
            .context("Failed to flush serial transport")
    }
}

/// Open a serial device for the command link
pub fn open_serial(port: &str, baud_rate: u32) -> Result<SerialStream> {
    let serial = tokio_serial::new(port, baud_rate)
        .open_native_async()
        .with_context(|| format!("Failed to open serial port {}", port))?;
    info!("Listening on serial port {} at {} baud", port, baud_rate);
    Ok(serial)
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(mut rx: LineReceiver) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = rx.recv().await {
            lines.push(line);
        }
        lines
    }

    #[tokio::test]
    async fn test_both_terminators_end_a_line() {
        let (tx, rx) = line_channel(DEFAULT_QUEUE_CAPACITY);
        let mut framer = LineFramer::new(tx, DEFAULT_MAX_LINE_LEN);
        framer.push(b"help\rad-start\nad-stop\r\n");
        drop(framer);
        assert_eq!(drain(rx).await, vec!["help", "ad-start", "ad-stop"]);
    }

    #[tokio::test]
    async fn test_empty_lines_are_ignored() {
        let (tx, rx) = line_channel(DEFAULT_QUEUE_CAPACITY);
        let mut framer = LineFramer::new(tx, DEFAULT_MAX_LINE_LEN);
        framer.push(b"\r\n\n\rhelp\r\n\r\n");
        drop(framer);
        assert_eq!(drain(rx).await, vec!["help"]);
    }

    #[tokio::test]
    async fn test_overlong_line_is_discarded_whole() {
        let (tx, rx) = line_channel(DEFAULT_QUEUE_CAPACITY);
        let mut framer = LineFramer::new(tx, 8);
        framer.push(b"pos-set 60.0 24.0 5\nhelp\n");
        drop(framer);
        assert_eq!(drain(rx).await, vec!["help"]);
    }

    #[tokio::test]
    async fn test_overflow_spanning_reads_is_discarded() {
        let (tx, rx) = line_channel(DEFAULT_QUEUE_CAPACITY);
        let mut framer = LineFramer::new(tx, 8);
        framer.push(b"ad-sta");
        framer.push(b"rt-and-more");
        framer.push(b"\r\nad-stop\r\n");
        drop(framer);
        assert_eq!(drain(rx).await, vec!["ad-stop"]);
    }

    #[tokio::test]
    async fn test_longest_valid_command_fits() {
        let longest = "pos-set -90.0000000 -180.0000000 -32768";
        let (tx, rx) = line_channel(DEFAULT_QUEUE_CAPACITY);
        let mut framer = LineFramer::new(tx, DEFAULT_MAX_LINE_LEN);
        framer.push(format!("{}\r\n", longest).as_bytes());
        drop(framer);
        assert_eq!(drain(rx).await, vec![longest]);
    }

    #[tokio::test]
    async fn test_full_queue_drops_newest_line() {
        let (tx, rx) = line_channel(10);
        let mut framer = LineFramer::new(tx, DEFAULT_MAX_LINE_LEN);
        for i in 0..11 {
            framer.push(format!("line-{}\n", i).as_bytes());
        }
        drop(framer);

        let expected: Vec<String> = (0..10).map(|i| format!("line-{}", i)).collect();
        assert_eq!(drain(rx).await, expected);
    }

    #[tokio::test]
    async fn test_offer_reports_drop() {
        let (tx, _rx) = line_channel(1);
        assert!(tx.offer("first".to_string()));
        assert!(!tx.offer("second".to_string()));
    }

    #[tokio::test]
    async fn test_pump_flushes_unterminated_tail() {
        let (tx, rx) = line_channel(DEFAULT_QUEUE_CAPACITY);
        let framer = LineFramer::new(tx, DEFAULT_MAX_LINE_LEN);
        pump(&b"help\nad-start"[..], framer).await.unwrap();
        assert_eq!(drain(rx).await, vec!["help", "ad-start"]);
    }

    #[tokio::test]
    async fn test_response_lines_are_terminated() {
        let mut out = Vec::new();
        let mut writer = ResponseWriter::new(&mut out);
        writer
            .write_lines(&["OK: Advertising started".to_string()])
            .await
            .unwrap();
        assert_eq!(out, b"OK: Advertising started\r\n");
    }
}
