//! GPS Beacon
//!
//! Broadcasts a geographic position inside BLE advertising packets and takes
//! line-oriented text commands over a serial link.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐  lines   ┌────────────────┐        ┌──────────────────────┐
//! │ serial::pump │ ───────▶ │ BeaconService  │ ─────▶ │ AdvertisingController│
//! │ (LineFramer) │  queue   │ commands::exec │        │  state + fix         │
//! └──────────────┘          └────────────────┘        └──────────┬───────────┘
//!                                   │ OK:/ERROR:                 │
//!                                   ▼                            ▼
//!                            ResponseWriter                 RadioStack
//! ```

pub mod domain;
pub mod infrastructure;
pub mod service;

pub use domain::advertising::{AdvertisingController, AdvertisingState, RadioError, RadioStack};
pub use domain::codec::{pack_be, parse_coordinate, unpack_be, FixedPointDegree};
pub use domain::position::PositionFix;
pub use service::BeaconService;
