//! WinRT Advertisement Publisher
//!
//! Broadcasts the beacon's manufacturer data through
//! `BluetoothLEAdvertisementPublisher`. Windows reserves the flags and local
//! name fields for itself, so only the manufacturer section is published.
//! A publisher's advertisement is fixed once started, so updates replace it.

use crate::domain::advertising::{RadioError, RadioStack};
use crate::domain::payload::AdvertisingData;
use tracing::{debug, error, info, warn};
use windows::Devices::Bluetooth::Advertisement::{
    BluetoothLEAdvertisementPublisher, BluetoothLEManufacturerData,
};
use windows::Storage::Streams::DataWriter;

pub struct WinRtPublisher {
    publisher: Option<BluetoothLEAdvertisementPublisher>,
}

impl WinRtPublisher {
    /// Probe the WinRT Bluetooth stack
    pub fn new() -> anyhow::Result<Self> {
        // Fails when the Bluetooth advertisement API is unavailable
        let _probe = BluetoothLEAdvertisementPublisher::new()?;
        Ok(Self { publisher: None })
    }

    fn build(data: &AdvertisingData) -> windows::core::Result<BluetoothLEAdvertisementPublisher> {
        let publisher = BluetoothLEAdvertisementPublisher::new()?;

        let writer = DataWriter::new()?;
        writer.WriteBytes(&data.position.encode())?;
        let buffer = writer.DetachBuffer()?;

        let manufacturer = BluetoothLEManufacturerData::Create(data.company_id, &buffer)?;
        publisher
            .Advertisement()?
            .ManufacturerData()?
            .Append(&manufacturer)?;

        debug!(
            "Publisher built: company={:#06X} data={:02X?}",
            data.company_id,
            data.position.encode()
        );
        Ok(publisher)
    }
}

fn radio_error(err: windows::core::Error) -> RadioError {
    RadioError::new(err.code().0)
}

impl RadioStack for WinRtPublisher {
    fn start(&mut self, data: &AdvertisingData) -> Result<(), RadioError> {
        let publisher = Self::build(data).map_err(radio_error)?;
        publisher.Start().map_err(radio_error)?;
        self.publisher = Some(publisher);
        info!("Advertisement publisher started");
        Ok(())
    }

    fn update(&mut self, data: &AdvertisingData) -> Result<(), RadioError> {
        let replacement = Self::build(data).map_err(radio_error)?;

        if let Some(current) = self.publisher.as_ref() {
            current.Stop().map_err(radio_error)?;
        }
        if let Err(err) = replacement.Start() {
            warn!("Replacement publisher failed to start, restoring previous data");
            if let Some(current) = self.publisher.take() {
                match current.Start() {
                    Ok(()) => self.publisher = Some(current),
                    Err(e) => error!(
                        "Failed to restore previous advertisement (code {})",
                        e.code().0
                    ),
                }
            }
            return Err(radio_error(err));
        }

        self.publisher = Some(replacement);
        debug!("Advertisement publisher replaced");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), RadioError> {
        if let Some(publisher) = self.publisher.as_ref() {
            publisher.Stop().map_err(radio_error)?;
        }
        self.publisher = None;
        info!("Advertisement publisher stopped");
        Ok(())
    }

    fn is_advertising(&self) -> bool {
        self.publisher.is_some()
    }
}
