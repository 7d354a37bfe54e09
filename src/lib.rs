#![cfg_attr(not(test), no_std)]

//! Battery class miniclass core for BQ27xxx I2C fuel gauges.
//!
//! [`device::BatteryDevice`] implements the callbacks of the battery class on
//! top of a [`gauge::Gauge`]. Hardware gauges reach the chip through
//! [`transport::SpbTransport`], which serializes register access to one I2C
//! target.

extern crate alloc;

pub mod device;
pub mod gauge;
pub mod info;
pub mod resources;
pub mod set;
pub mod transport;

#[cfg(test)]
mod test_util;

pub use device::{BatteryDevice, Error};
pub use gauge::Gauge;
pub use transport::{SpbTransport, TransportError};
