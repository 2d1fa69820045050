//! Serial Command Parser
//!
//! Tokenizes a command line, validates its arguments and dispatches it to
//! the [`AdvertisingController`]. Every line produces exactly one status line,
//! `OK: ...` or `ERROR: ...`.

use crate::domain::advertising::{
    AdvertisingController, AdvertisingError, RadioOperation, RadioStack, Transition,
};
use crate::domain::codec::parse_coordinate;
use crate::domain::position::PositionFix;
use thiserror::Error;
use tracing::{debug, warn};

/// Separator between the command and its arguments
pub const CMD_SEPARATOR: char = ' ';

/// Summary printed by `help`, ahead of its status line
pub const HELP_LINES: &[&str] = &[
    "Available commands:",
    "  ad-start - Start advertising",
    "  ad-stop - Stop advertising",
    "  help - Print this help message",
    "  pos-set <lat> <lon> <alt> - Set position (decimal degrees, meters)",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Help,
    AdStart,
    AdStop,
    PosSet(PositionFix),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("Unknown command: {0}")]
    UnrecognizedCommand(String),
    #[error("Missing argument: {0}")]
    MissingArguments(&'static str),
    #[error("Invalid argument {name}: {reason}")]
    InvalidArguments { name: &'static str, reason: String },
    #[error("Advertising data not initialized, set a position first")]
    AdvertisingDataUninitialized,
    #[error("Failed to {operation} advertising (code {code})")]
    TransportError { operation: RadioOperation, code: i32 },
}

impl From<AdvertisingError> for CommandError {
    fn from(err: AdvertisingError) -> Self {
        match err {
            AdvertisingError::DataUninitialized => Self::AdvertisingDataUninitialized,
            AdvertisingError::InvalidPosition(e) => Self::InvalidArguments {
                name: e.argument(),
                reason: e.to_string(),
            },
            AdvertisingError::Transport { operation, code } => {
                Self::TransportError { operation, code }
            }
        }
    }
}

/// Successful command result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Informational lines emitted before the status line
    pub detail: &'static [&'static str],
    pub message: String,
}

impl Reply {
    fn ok(message: impl Into<String>) -> Self {
        Self {
            detail: &[],
            message: message.into(),
        }
    }
}

pub type CommandOutcome = Result<Reply, CommandError>;

impl Command {
    /// Parse a command line without touching any state
    pub fn parse(line: &str) -> Result<Self, CommandError> {
        let mut tokens = line.split(CMD_SEPARATOR).filter(|t| !t.is_empty());
        let name = tokens.next().unwrap_or_default();

        match name {
            "help" => Ok(Self::Help),
            "ad-start" => Ok(Self::AdStart),
            "ad-stop" => Ok(Self::AdStop),
            "pos-set" => {
                let lat = tokens.next().ok_or(CommandError::MissingArguments("lat"))?;
                let lon = tokens.next().ok_or(CommandError::MissingArguments("lon"))?;
                let alt = tokens.next().ok_or(CommandError::MissingArguments("alt"))?;
                Ok(Self::PosSet(parse_position(lat, lon, alt)?))
            }
            other => Err(CommandError::UnrecognizedCommand(other.to_string())),
        }
    }
}

fn parse_position(lat: &str, lon: &str, alt: &str) -> Result<PositionFix, CommandError> {
    let latitude = parse_coordinate(lat).map_err(|e| invalid("lat", e))?;
    let longitude = parse_coordinate(lon).map_err(|e| invalid("lon", e))?;
    let altitude: i16 = alt.parse().map_err(|e| invalid("alt", e))?;

    let fix = PositionFix::new(latitude, longitude, altitude);
    fix.validate().map_err(|e| invalid(e.argument(), e))?;
    Ok(fix)
}

fn invalid(name: &'static str, reason: impl ToString) -> CommandError {
    CommandError::InvalidArguments {
        name,
        reason: reason.to_string(),
    }
}

/// Parse and run one command line against the controller
pub fn execute<R: RadioStack>(
    line: &str,
    controller: &mut AdvertisingController<R>,
) -> CommandOutcome {
    debug!("Received command: {:?}", line);
    let command = Command::parse(line)?;

    match command {
        Command::Help => Ok(Reply {
            detail: HELP_LINES,
            message: "Help printed".to_string(),
        }),
        Command::AdStart => match controller.start()? {
            Transition::Applied => Ok(Reply::ok("Advertising started")),
            Transition::Unchanged => Ok(Reply::ok("Advertising already started")),
        },
        Command::AdStop => match controller.stop()? {
            Transition::Applied => Ok(Reply::ok("Advertising stopped")),
            Transition::Unchanged => Ok(Reply::ok("Advertising already stopped")),
        },
        Command::PosSet(fix) => {
            controller.set_position(fix)?;
            Ok(Reply::ok(format!("Set position to {}", fix)))
        }
    }
}

/// Render an outcome as the lines written back to the serial link
pub fn render(outcome: &CommandOutcome) -> Vec<String> {
    match outcome {
        Ok(reply) => {
            let mut lines: Vec<String> = reply.detail.iter().map(|l| l.to_string()).collect();
            lines.push(format!("OK: {}", reply.message));
            lines
        }
        Err(err) => {
            warn!("Command failed: {}", err);
            vec![format!("ERROR: {}", err)]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::advertising::tests::{RadioCall, RecordingRadio};
    use crate::domain::advertising::AdvertisingState;
    use crate::domain::payload::PayloadConfig;

    fn controller() -> AdvertisingController<RecordingRadio> {
        AdvertisingController::new(RecordingRadio::default(), PayloadConfig::default())
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("help"), Ok(Command::Help));
        assert_eq!(Command::parse("ad-start"), Ok(Command::AdStart));
        assert_eq!(Command::parse("ad-stop"), Ok(Command::AdStop));
        assert_eq!(
            Command::parse("pos-set 60.1234567 24.9384 15"),
            Ok(Command::PosSet(PositionFix::new(601234567, 249384000, 15)))
        );
    }

    #[test]
    fn test_repeated_separators_are_collapsed() {
        assert_eq!(
            Command::parse("  pos-set   1.5  -2   -7 "),
            Ok(Command::PosSet(PositionFix::new(15000000, -20000000, -7)))
        );
    }

    #[test]
    fn test_unknown_command() {
        assert_eq!(
            Command::parse("reboot now"),
            Err(CommandError::UnrecognizedCommand("reboot".to_string()))
        );
    }

    #[test]
    fn test_missing_arguments_reported_before_invalid() {
        assert_eq!(
            Command::parse("pos-set"),
            Err(CommandError::MissingArguments("lat"))
        );
        assert_eq!(
            Command::parse("pos-set abc 10.0"),
            Err(CommandError::MissingArguments("alt"))
        );
    }

    #[test]
    fn test_invalid_arguments() {
        for line in [
            "pos-set 95.0 10.0 5",
            "pos-set 10.0 181 5",
            "pos-set 1.2.3 10.0 5",
            "pos-set 10.0 x 5",
            "pos-set 10.0 10.0 40000",
            "pos-set 10.0 10.0 5.5",
        ] {
            assert!(
                matches!(
                    Command::parse(line),
                    Err(CommandError::InvalidArguments { .. })
                ),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn test_out_of_range_latitude_leaves_controller_untouched() {
        let mut c = controller();
        execute("pos-set 60.0 24.0 10", &mut c).unwrap();
        execute("ad-start", &mut c).unwrap();
        let calls_before = c.radio().calls.len();

        let outcome = execute("pos-set 95.0 10.0 5", &mut c);
        assert!(matches!(
            outcome,
            Err(CommandError::InvalidArguments { name: "lat", .. })
        ));
        assert_eq!(c.position(), Some(PositionFix::new(600000000, 240000000, 10)));
        assert_eq!(c.state(), AdvertisingState::Advertising);
        assert_eq!(c.radio().calls.len(), calls_before);
    }

    #[test]
    fn test_start_before_position() {
        let mut c = controller();
        let outcome = execute("ad-start", &mut c);
        assert_eq!(outcome, Err(CommandError::AdvertisingDataUninitialized));
        assert_eq!(c.state(), AdvertisingState::Stopped);
    }

    #[test]
    fn test_full_session() {
        let mut c = controller();
        let lines = render(&execute("pos-set 60.1 24.9 15", &mut c));
        assert_eq!(
            lines,
            vec!["OK: Set position to lat=60.1000000, lon=24.9000000, alt=15"]
        );
        assert_eq!(
            render(&execute("ad-start", &mut c)),
            vec!["OK: Advertising started"]
        );
        assert_eq!(
            render(&execute("ad-start", &mut c)),
            vec!["OK: Advertising already started"]
        );
        assert_eq!(
            render(&execute("ad-stop", &mut c)),
            vec!["OK: Advertising stopped"]
        );
        assert_eq!(
            render(&execute("ad-stop", &mut c)),
            vec!["OK: Advertising already stopped"]
        );
        assert_eq!(c.radio().starts(), 1);
        assert_eq!(c.radio().calls.last(), Some(&RadioCall::Stop));
    }

    #[test]
    fn test_transport_error_rendering() {
        let mut c = controller();
        execute("pos-set 1 2 3", &mut c).unwrap();
        c.radio_mut().fail_with = Some(-22);
        assert_eq!(
            render(&execute("ad-start", &mut c)),
            vec!["ERROR: Failed to start advertising (code -22)"]
        );
        assert_eq!(c.state(), AdvertisingState::Stopped);
    }

    #[test]
    fn test_help_lists_commands() {
        let mut c = controller();
        let lines = render(&execute("help", &mut c));
        assert_eq!(lines.len(), HELP_LINES.len() + 1);
        assert_eq!(lines.last().map(String::as_str), Some("OK: Help printed"));
        assert!(c.radio().calls.is_empty());
    }

    #[test]
    fn test_unknown_command_rendering() {
        let mut c = controller();
        assert_eq!(
            render(&execute("blink", &mut c)),
            vec!["ERROR: Unknown command: blink"]
        );
    }
}
