//! i2c-transport: blocking I2C/SMBus bus abstractions
//!
//! This crate provides the transport trait consumed by the device drivers and
//! the polling engine, with feature-gated backends. The default build enables a
//! `mock` backend so that binaries and tests run on any host without adapters.

mod types;
pub use types::{BusInfo, ADDRESS_MAX, ADDRESS_MIN};

mod error;
pub use error::{Result, TransportError};

mod traits;
pub use traits::I2cBus;

mod handle;
pub use handle::BusHandle;

#[cfg(feature = "mock")]
mod mock;

#[cfg(feature = "mock")]
pub use mock::{MockBus, MockDevice, MockOp};

#[cfg(feature = "linux")]
mod linux;

#[cfg(feature = "linux")]
pub use linux::LinuxBus;
