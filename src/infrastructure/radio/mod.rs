//! Radio Stack Backends
//!
//! Implementations of [`RadioStack`] selected through the settings file.
//!
//! - [`LoggingRadio`] - renders the AD structures to the log (all platforms)
//! - `winrt::WinRtPublisher` - Windows `BluetoothLEAdvertisementPublisher`

#[cfg(windows)]
pub mod winrt;

use crate::domain::advertising::{RadioError, RadioStack};
use crate::domain::payload::AdvertisingData;
use crate::domain::settings::RadioBackend;
use tracing::info;

/// Radio stack that only logs what would be broadcast
#[derive(Debug, Default)]
pub struct LoggingRadio {
    advertising: bool,
}

impl LoggingRadio {
    pub fn new() -> Self {
        Self::default()
    }

    fn log_data(action: &str, data: &AdvertisingData) {
        info!(
            "{} ad={:02X?} sd={:02X?}",
            action,
            data.advertising_structures(),
            data.scan_response_structures()
        );
    }
}

impl RadioStack for LoggingRadio {
    fn start(&mut self, data: &AdvertisingData) -> Result<(), RadioError> {
        Self::log_data("Advertising start", data);
        self.advertising = true;
        Ok(())
    }

    fn update(&mut self, data: &AdvertisingData) -> Result<(), RadioError> {
        Self::log_data("Advertising update", data);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        info!("Advertising stop");
        self.advertising = false;
        Ok(())
    }

    fn is_advertising(&self) -> bool {
        self.advertising
    }
}

/// Bring up the configured radio stack
pub fn init_radio(backend: RadioBackend) -> anyhow::Result<Box<dyn RadioStack + Send>> {
    match backend {
        RadioBackend::Log => {
            info!("Radio initialized (logging backend)");
            Ok(Box::new(LoggingRadio::new()))
        }
        #[cfg(windows)]
        RadioBackend::WinRt => {
            let radio = winrt::WinRtPublisher::new()?;
            info!("Radio initialized (WinRT advertisement publisher)");
            Ok(Box::new(radio))
        }
        #[cfg(not(windows))]
        RadioBackend::WinRt => {
            anyhow::bail!("The winrt radio backend is only available on Windows")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::payload::PayloadConfig;
    use crate::domain::position::PositionFix;

    #[test]
    fn test_logging_radio_tracks_state() {
        let data = AdvertisingData::new(&PayloadConfig::default(), PositionFix::new(0, 0, 0));
        let mut radio = LoggingRadio::new();
        radio.start(&data).unwrap();
        assert!(radio.is_advertising());
        radio.update(&data).unwrap();
        assert!(radio.is_advertising());
        radio.stop().unwrap();
        assert!(!radio.is_advertising());
    }

    #[test]
    fn test_init_log_backend() {
        assert!(init_radio(RadioBackend::Log).is_ok());
    }

    #[cfg(not(windows))]
    #[test]
    fn test_winrt_backend_unavailable() {
        assert!(init_radio(RadioBackend::WinRt).is_err());
    }
}
