use crate::domain::codec::{format_coordinate, pack_be, unpack_be, FixedPointDegree};
use std::fmt;
use thiserror::Error;

/// Largest absolute latitude, in 1e-7 degree
pub const LATITUDE_LIMIT: FixedPointDegree = 900_000_000;

/// Largest absolute longitude, in 1e-7 degree
pub const LONGITUDE_LIMIT: FixedPointDegree = 1_800_000_000;

/// Size of the encoded position block (lat 4 + lon 4 + alt 2)
pub const POSITION_DATA_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("latitude {0} outside [-900000000, 900000000]")]
    LatitudeOutOfRange(FixedPointDegree),
    #[error("longitude {0} outside [-1800000000, 1800000000]")]
    LongitudeOutOfRange(FixedPointDegree),
    #[error("position block must be 10 bytes, got {0}")]
    InvalidLength(usize),
}

impl PositionError {
    /// Name of the command argument the error refers to
    pub fn argument(&self) -> &'static str {
        match self {
            Self::LatitudeOutOfRange(_) => "lat",
            Self::LongitudeOutOfRange(_) => "lon",
            Self::InvalidLength(_) => "position",
        }
    }
}

/// Geographic position broadcast by the beacon
///
/// Latitude is positive north of the equator, longitude positive east of the
/// prime meridian. Altitude is in whole meters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionFix {
    pub latitude: FixedPointDegree,
    pub longitude: FixedPointDegree,
    pub altitude: i16,
}

impl PositionFix {
    pub fn new(latitude: FixedPointDegree, longitude: FixedPointDegree, altitude: i16) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
        }
    }

    /// Check latitude and longitude against their geographic ranges
    pub fn validate(&self) -> Result<(), PositionError> {
        if !(-LATITUDE_LIMIT..=LATITUDE_LIMIT).contains(&self.latitude) {
            return Err(PositionError::LatitudeOutOfRange(self.latitude));
        }
        if !(-LONGITUDE_LIMIT..=LONGITUDE_LIMIT).contains(&self.longitude) {
            return Err(PositionError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }

    /// Encode the position block carried after the company identifier
    ///
    /// ```text
    /// [0-3] : Latitude  (i32 big-endian, 1e-7 degree)
    /// [4-7] : Longitude (i32 big-endian, 1e-7 degree)
    /// [8-9] : Altitude  (i16 big-endian, meters)
    /// ```
    pub fn encode(&self) -> [u8; POSITION_DATA_LEN] {
        let mut out = [0u8; POSITION_DATA_LEN];
        out[0..4].copy_from_slice(&pack_be::<4>(self.latitude));
        out[4..8].copy_from_slice(&pack_be::<4>(self.longitude));
        out[8..10].copy_from_slice(&pack_be::<2>(self.altitude as i32));
        out
    }

    /// Decode a position block produced by [`PositionFix::encode`]
    pub fn decode(bytes: &[u8]) -> Result<Self, PositionError> {
        if bytes.len() != POSITION_DATA_LEN {
            return Err(PositionError::InvalidLength(bytes.len()));
        }
        let latitude = unpack_be([bytes[0], bytes[1], bytes[2], bytes[3]]);
        let longitude = unpack_be([bytes[4], bytes[5], bytes[6], bytes[7]]);
        let altitude = unpack_be([bytes[8], bytes[9]]) as i16;
        Ok(Self::new(latitude, longitude, altitude))
    }
}

impl fmt::Display for PositionFix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "lat={}, lon={}, alt={}",
            format_coordinate(self.latitude),
            format_coordinate(self.longitude),
            self.altitude
        )
    }
}
