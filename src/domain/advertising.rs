//! Advertising Controller
//!
//! Owns the current position fix and the advertising state, and decides
//! when the radio stack has to start, update or stop a broadcast.
//!
//! ```text
//!              start (fix present, radio ok)
//!   Stopped ────────────────────────────────▶ Advertising
//!      ▲                                           │  set_position
//!      │           stop (radio ok)                 │  -> radio update
//!      └───────────────────────────────────────────┘
//! ```
//!
//! A radio failure never moves the state machine, unless the stack reports
//! that a failed update left nothing on air.

use crate::domain::payload::{AdvertisingData, PayloadConfig};
use crate::domain::position::{PositionError, PositionFix};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info};

/// Failure reported by the radio stack, carrying its native error code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("radio stack error (code {code})")]
pub struct RadioError {
    pub code: i32,
}

impl RadioError {
    pub fn new(code: i32) -> Self {
        Self { code }
    }
}

/// Radio stack operations driven by the controller
///
/// Calls are synchronous from the controller's point of view.
pub trait RadioStack {
    fn start(&mut self, data: &AdvertisingData) -> Result<(), RadioError>;
    fn update(&mut self, data: &AdvertisingData) -> Result<(), RadioError>;
    fn stop(&mut self) -> Result<(), RadioError>;
    /// Whether a broadcast is currently on air
    fn is_advertising(&self) -> bool;
}

impl<T: RadioStack + ?Sized> RadioStack for Box<T> {
    fn start(&mut self, data: &AdvertisingData) -> Result<(), RadioError> {
        (**self).start(data)
    }

    fn update(&mut self, data: &AdvertisingData) -> Result<(), RadioError> {
        (**self).update(data)
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        (**self).stop()
    }

    fn is_advertising(&self) -> bool {
        (**self).is_advertising()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioOperation {
    Start,
    Update,
    Stop,
}

impl fmt::Display for RadioOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "start",
            Self::Update => "update",
            Self::Stop => "stop",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AdvertisingState {
    #[default]
    Stopped,
    Advertising,
}

/// Whether a request changed the state or was already satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Unchanged,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdvertisingError {
    #[error("Advertising data not initialized")]
    DataUninitialized,
    #[error(transparent)]
    InvalidPosition(#[from] PositionError),
    #[error("Failed to {operation} advertising (code {code})")]
    Transport { operation: RadioOperation, code: i32 },
}

impl AdvertisingError {
    fn transport(operation: RadioOperation, err: RadioError) -> Self {
        Self::Transport {
            operation,
            code: err.code,
        }
    }
}

/// Single owner of the beacon's position and advertising state
pub struct AdvertisingController<R> {
    radio: R,
    payload: PayloadConfig,
    position: Option<PositionFix>,
    state: AdvertisingState,
}

impl<R: RadioStack> AdvertisingController<R> {
    pub fn new(radio: R, payload: PayloadConfig) -> Self {
        Self {
            radio,
            payload,
            position: None,
            state: AdvertisingState::Stopped,
        }
    }

    pub fn state(&self) -> AdvertisingState {
        self.state
    }

    pub fn position(&self) -> Option<PositionFix> {
        self.position
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    #[cfg(test)]
    pub(crate) fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    /// Store a new fix, pushing it to the radio when already advertising
    ///
    /// On any error the previously stored fix is kept. If a failed update
    /// took the broadcast off air, the state falls back to `Stopped`.
    pub fn set_position(&mut self, fix: PositionFix) -> Result<(), AdvertisingError> {
        fix.validate()?;

        if self.state == AdvertisingState::Advertising {
            let data = AdvertisingData::new(&self.payload, fix);
            if let Err(err) = self.radio.update(&data) {
                error!("Advertising failed to update (err {})", err.code);
                if !self.radio.is_advertising() {
                    error!("Radio went off air after failed update, beacon stopped");
                    self.state = AdvertisingState::Stopped;
                }
                return Err(AdvertisingError::transport(RadioOperation::Update, err));
            }
            debug!("Advertising data updated: {}", fix);
        }

        self.position = Some(fix);
        info!("Position set to {}", fix);
        Ok(())
    }

    /// Begin broadcasting the stored fix
    pub fn start(&mut self) -> Result<Transition, AdvertisingError> {
        let Some(fix) = self.position else {
            error!("Advertising data not initialized");
            return Err(AdvertisingError::DataUninitialized);
        };

        if self.state == AdvertisingState::Advertising {
            debug!("Advertising already started");
            return Ok(Transition::Unchanged);
        }

        let data = AdvertisingData::new(&self.payload, fix);
        if let Err(err) = self.radio.start(&data) {
            error!("Advertising failed to start (err {})", err.code);
            return Err(AdvertisingError::transport(RadioOperation::Start, err));
        }

        self.state = AdvertisingState::Advertising;
        info!("Beacon started, advertising {}", fix);
        Ok(Transition::Applied)
    }

    /// End the current broadcast
    pub fn stop(&mut self) -> Result<Transition, AdvertisingError> {
        if self.state == AdvertisingState::Stopped {
            debug!("Advertising already stopped");
            return Ok(Transition::Unchanged);
        }

        if let Err(err) = self.radio.stop() {
            error!("Advertising failed to stop (err {})", err.code);
            return Err(AdvertisingError::transport(RadioOperation::Stop, err));
        }

        self.state = AdvertisingState::Stopped;
        info!("Beacon stopped");
        Ok(Transition::Applied)
    }
}
