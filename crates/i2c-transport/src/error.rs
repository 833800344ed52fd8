use thiserror::Error;

pub type Result<T, E = TransportError> = core::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The adapter refused the address because it is claimed or contended.
    #[error("address busy")]
    Busy,
    /// Nothing acknowledged the transaction at the selected address.
    #[error("no acknowledge from device")]
    NoAck,
    #[error("bus not found: {0}")]
    BusNotFound(String),
    #[error("invalid 7-bit address: 0x{0:02x}")]
    InvalidAddress(u8),
    #[error("operation not supported on this backend: {0}")]
    Unsupported(&'static str),
    #[error("I/O error: {0}")]
    Io(String),
    #[error("bus lock poisoned")]
    Poisoned,
}

impl TransportError {
    /// Errors that mean "nobody answered here" rather than a broken transport.
    pub fn is_absence(&self) -> bool {
        matches!(self, TransportError::Busy | TransportError::NoAck)
    }
}
