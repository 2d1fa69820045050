//! Beacon Service
//!
//! The single consumer of the line queue. Commands run one at a time in
//! arrival order, so the controller needs no locking.

use crate::domain::advertising::{AdvertisingController, RadioStack};
use crate::domain::commands;
use crate::infrastructure::serial::{LineReceiver, ResponseWriter};
use anyhow::Result;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

/// Printed once the radio is up and the transport is listening
pub const BOOT_BANNER: &str = "Boot complete";

pub struct BeaconService<R> {
    controller: AdvertisingController<R>,
}

impl<R: RadioStack> BeaconService<R> {
    pub fn new(controller: AdvertisingController<R>) -> Self {
        Self { controller }
    }

    pub fn controller(&self) -> &AdvertisingController<R> {
        &self.controller
    }

    /// Run one command line and return the response lines
    ///
    /// A line holding only separators is ignored like an empty one.
    pub fn handle_line(&mut self, line: &str) -> Vec<String> {
        if line.trim_matches(commands::CMD_SEPARATOR).is_empty() {
            debug!("Ignoring blank line");
            return Vec::new();
        }
        let outcome = commands::execute(line, &mut self.controller);
        commands::render(&outcome)
    }

    /// Consume lines until every producer is gone
    ///
    /// Waits indefinitely between lines.
    pub async fn run<W>(&mut self, mut lines: LineReceiver, writer: W) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        let mut writer = ResponseWriter::new(writer);
        writer.write_lines(&[BOOT_BANNER.to_string()]).await?;

        while let Some(line) = lines.recv().await {
            let response = self.handle_line(&line);
            writer.write_lines(&response).await?;
        }

        info!("Line queue closed, command service exiting");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::advertising::tests::RecordingRadio;
    use crate::domain::advertising::AdvertisingState;
    use crate::domain::payload::PayloadConfig;
    use crate::domain::position::PositionFix;
    use crate::infrastructure::serial::{line_channel, LineFramer, DEFAULT_MAX_LINE_LEN};

    fn service() -> BeaconService<RecordingRadio> {
        BeaconService::new(AdvertisingController::new(
            RecordingRadio::default(),
            PayloadConfig::default(),
        ))
    }

    #[tokio::test]
    async fn test_session_over_queue() {
        let (tx, rx) = line_channel(10);
        let mut framer = LineFramer::new(tx, 32);
        framer.push(b"ad-start\r\npos-set 60.17 24.94 12\r\nad-start\r\nfly\r\n");
        drop(framer);

        let mut out = Vec::new();
        let mut svc = service();
        svc.run(rx, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(
            lines,
            vec![
                "Boot complete",
                "ERROR: Advertising data not initialized, set a position first",
                "OK: Set position to lat=60.1700000, lon=24.9400000, alt=12",
                "OK: Advertising started",
                "ERROR: Unknown command: fly",
            ]
        );
        assert_eq!(svc.controller().state(), AdvertisingState::Advertising);
        assert_eq!(
            svc.controller().position(),
            Some(PositionFix::new(601700000, 249400000, 12))
        );
        assert_eq!(svc.controller().radio().starts(), 1);
    }

    #[tokio::test]
    async fn test_full_precision_positions_are_not_cut_short() {
        let (tx, rx) = line_channel(10);
        let mut framer = LineFramer::new(tx, DEFAULT_MAX_LINE_LEN);
        framer.push(b"pos-set 60.1234567 24.1234567 100\n");
        framer.push(b"pos-set -33.8688197 151.2092960 58\n");
        drop(framer);

        let mut out = Vec::new();
        let mut svc = service();
        svc.run(rx, &mut out).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.split("\r\n").filter(|l| !l.is_empty()).collect();
        assert_eq!(
            lines,
            vec![
                "Boot complete",
                "OK: Set position to lat=60.1234567, lon=24.1234567, alt=100",
                "OK: Set position to lat=-33.8688197, lon=151.2092960, alt=58",
            ]
        );
        assert_eq!(
            svc.controller().position(),
            Some(PositionFix::new(-338688197, 1512092960, 58))
        );
    }

    #[test]
    fn test_blank_line_gets_no_reply() {
        let mut svc = service();
        assert!(svc.handle_line("   ").is_empty());
        assert!(svc.handle_line("").is_empty());
        assert_eq!(svc.handle_line("  help "), {
            let mut expected: Vec<String> =
                commands::HELP_LINES.iter().map(|l| l.to_string()).collect();
            expected.push("OK: Help printed".to_string());
            expected
        });
    }

    #[test]
    fn test_each_line_gets_one_status_line() {
        let mut svc = service();
        for line in ["ad-stop", "pos-set", "pos-set 1 2 x", "nope", "ad-start"] {
            let response = svc.handle_line(line);
            assert_eq!(response.len(), 1, "{line}");
            assert!(response[0].starts_with("OK: ") || response[0].starts_with("ERROR: "));
        }
    }
}
