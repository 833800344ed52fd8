use i2c_transport::TransportError;
use thiserror::Error;

/// Failure of a pure raw <-> physical conversion.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConversionError {
    /// Fixed-point intermediate left the 32-bit range. Cannot happen for
    /// datasheet input ranges, so callers treat it as an invariant violation.
    #[error("fixed-point overflow in {0}")]
    Overflow(&'static str),
    #[error("value {value} outside {min}..={max}")]
    OutOfRange { value: f64, min: f64, max: f64 },
    #[error("value is not a finite number")]
    NotFinite,
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DriverError {
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Conversion(#[from] ConversionError),
    #[error("{device} has no channel {channel}")]
    InvalidChannel { device: &'static str, channel: u8 },
}
