//! Beacon domain: coordinates, payload, advertising state machine and commands

pub mod advertising;
pub mod codec;
pub mod commands;
pub mod payload;
pub mod position;
pub mod settings;
