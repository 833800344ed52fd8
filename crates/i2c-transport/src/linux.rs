use crate::{BusInfo, I2cBus, Result, TransportError};
use rppal::i2c::{Error as RppalError, I2c};
use std::fs;

// errno values reported by i2c-dev
const ENXIO: i32 = 6;
const EBUSY: i32 = 16;
const ETIMEDOUT: i32 = 110;
const EREMOTEIO: i32 = 121;

/// Kernel `/dev/i2c-N` adapter driven through `rppal`.
pub struct LinuxBus {
    adapter: u8,
    i2c: I2c,
}

impl LinuxBus {
    pub fn adapter(&self) -> u8 {
        self.adapter
    }
}

fn map_select_err(e: RppalError) -> TransportError {
    match e {
        RppalError::Io(io) if io.raw_os_error() == Some(EBUSY) => TransportError::Busy,
        RppalError::InvalidSlaveAddress(addr) => TransportError::InvalidAddress(addr as u8),
        other => TransportError::Io(other.to_string()),
    }
}

fn map_xfer_err(e: RppalError) -> TransportError {
    match e {
        RppalError::Io(io) => match io.raw_os_error() {
            Some(ENXIO) | Some(EREMOTEIO) | Some(ETIMEDOUT) => TransportError::NoAck,
            Some(EBUSY) => TransportError::Busy,
            _ => TransportError::Io(io.to_string()),
        },
        RppalError::FeatureNotSupported => {
            TransportError::Unsupported("SMBus transaction not supported by adapter")
        }
        other => TransportError::Io(other.to_string()),
    }
}

impl I2cBus for LinuxBus {
    fn open(adapter: u8) -> Result<Self> {
        let i2c = I2c::with_bus(adapter).map_err(|e| match e {
            RppalError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                TransportError::BusNotFound(format!("/dev/i2c-{adapter}"))
            }
            other => TransportError::Io(format!("/dev/i2c-{adapter}: {other}")),
        })?;
        Ok(Self { adapter, i2c })
    }

    fn list() -> Result<Vec<BusInfo>> {
        let mut out = Vec::new();
        for entry in fs::read_dir("/dev").map_err(|e| TransportError::Io(e.to_string()))? {
            let entry = entry.map_err(|e| TransportError::Io(e.to_string()))?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with("i2c-") {
                out.push(BusInfo {
                    name: format!("/dev/{name}"),
                    driver: "i2c-dev".to_string(),
                });
            }
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    fn select(&mut self, address: u8) -> Result<()> {
        self.i2c
            .set_slave_address(u16::from(address))
            .map_err(map_select_err)
    }

    fn quick_write(&mut self) -> Result<()> {
        // R/W bit 0 is a write
        self.i2c.smbus_quick_command(false).map_err(map_xfer_err)
    }

    fn read_byte(&mut self, register: u8) -> Result<u8> {
        self.i2c.smbus_read_byte(register).map_err(map_xfer_err)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<()> {
        self.i2c
            .smbus_write_byte(register, value)
            .map_err(map_xfer_err)
    }

    fn read_word(&mut self, register: u8) -> Result<u16> {
        self.i2c.smbus_read_word(register).map_err(map_xfer_err)
    }

    fn write_word(&mut self, register: u8, value: u16) -> Result<()> {
        self.i2c
            .smbus_write_word(register, value)
            .map_err(map_xfer_err)
    }

    fn read_raw_byte(&mut self) -> Result<u8> {
        self.i2c.smbus_receive_byte().map_err(map_xfer_err)
    }

    fn write_raw_byte(&mut self, value: u8) -> Result<()> {
        self.i2c.smbus_send_byte(value).map_err(map_xfer_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn errno(code: i32) -> RppalError {
        RppalError::Io(io::Error::from_raw_os_error(code))
    }

    #[test]
    fn test_missing_ack_is_absence() {
        for code in [ENXIO, EREMOTEIO, ETIMEDOUT] {
            assert!(matches!(map_xfer_err(errno(code)), TransportError::NoAck));
        }
        assert!(matches!(map_xfer_err(errno(EBUSY)), TransportError::Busy));
    }

    #[test]
    fn test_adapter_fault_is_fatal() {
        // plain EIO from the adapter driver
        let err = map_xfer_err(errno(5));
        assert!(matches!(err, TransportError::Io(_)));
        assert!(!err.is_absence());
    }
}
