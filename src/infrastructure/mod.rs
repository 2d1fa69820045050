//! Adapters around the beacon core: logging, serial transport, radio stacks

pub mod logging;
pub mod radio;
pub mod serial;
