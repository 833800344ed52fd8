use crate::{BusInfo, Result, TransportError};

/// A minimal blocking SMBus interface.
///
/// Word transfers follow SMBus byte order (low byte first); devices that
/// send MSB first must swap the result themselves.
pub trait I2cBus {
    /// Open an adapter by its kernel number (e.g. 1 for `/dev/i2c-1`).
    fn open(adapter: u8) -> Result<Self>
    where
        Self: Sized;

    /// Attempt to list available adapters for this backend.
    fn list() -> Result<Vec<BusInfo>> {
        Err(TransportError::Unsupported("listing not supported"))
    }

    /// Make `address` the target of the following transactions.
    fn select(&mut self, address: u8) -> Result<()>;

    /// Zero-length write used to check whether the selected address acknowledges.
    fn quick_write(&mut self) -> Result<()>;

    fn read_byte(&mut self, register: u8) -> Result<u8>;

    fn write_byte(&mut self, register: u8, value: u8) -> Result<()>;

    fn read_word(&mut self, register: u8) -> Result<u16>;

    fn write_word(&mut self, register: u8, value: u16) -> Result<()>;

    /// Receive one byte without a register argument.
    fn read_raw_byte(&mut self) -> Result<u8>;

    /// Send one command byte without a register argument.
    fn write_raw_byte(&mut self, value: u8) -> Result<()>;
}
