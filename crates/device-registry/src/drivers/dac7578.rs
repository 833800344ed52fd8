//! DAC7578 octal 12-bit DAC driving the precision thresholds.

use super::{read_word_be, write_word_be};
use crate::encode::{dac_word, dac_word_code};
use crate::types::{RawChannels, MAX_CHANNELS};
use crate::DriverError;
use i2c_transport::I2cBus;

const CMD_WRITE_UPDATE: u8 = 0x03;
const CMD_READ_DAC: u8 = 0x01;
const CH_ALL: u8 = 0x0F;

/// Output selection for a write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Channel(u8),
    All,
}

impl Target {
    fn bits(self) -> Result<u8, DriverError> {
        match self {
            Target::All => Ok(CH_ALL),
            Target::Channel(ch) if usize::from(ch) < MAX_CHANNELS => Ok(ch),
            Target::Channel(ch) => Err(DriverError::InvalidChannel {
                device: "dac7578",
                channel: ch,
            }),
        }
    }
}

pub fn readback_register(channel: u8) -> u8 {
    (CMD_READ_DAC << 4) | channel
}

/// Write-and-update command for channel bits `channel` (0xF for all).
pub fn write_command(channel: u8) -> u8 {
    (CMD_WRITE_UPDATE << 4) | channel
}

pub fn read_all<B: I2cBus + ?Sized>(bus: &mut B, address: u8) -> Result<RawChannels, DriverError> {
    let mut raw = [0u16; MAX_CHANNELS];
    for (ch, slot) in (0u8..).zip(raw.iter_mut()) {
        *slot = dac_word_code(read_word_be(bus, readback_register(ch))?);
    }
    tracing::trace!(address, ?raw, "dac7578 readback");
    Ok(raw)
}

pub fn write_channel<B: I2cBus + ?Sized>(
    bus: &mut B,
    address: u8,
    target: Target,
    code: u16,
) -> Result<(), DriverError> {
    let register = write_command(target.bits()?);
    tracing::debug!(address, ?target, code, "dac7578 write");
    write_word_be(bus, register, dac_word(code))
}

#[cfg(test)]
mod tests {
    use super::*;
    use i2c_transport::{MockBus, MockDevice, MockOp};

    #[test]
    fn test_write_all_uses_broadcast_register() {
        let mut bus = MockBus::new(2).with_device(0x48, MockDevice::new());
        bus.select(0x48).unwrap();
        write_channel(&mut bus, 0x48, Target::All, 0x0800).unwrap();
        assert_eq!(
            bus.ops()[1],
            MockOp::WriteWord {
                address: 0x48,
                register: 0x3F,
                value: 0x0080
            }
        );
    }

    #[test]
    fn test_read_all_decodes_codes() {
        let dev = MockDevice::new()
            .with_word(readback_register(0), 0xF0FF)
            .with_word(readback_register(7), 0x1000);
        let mut bus = MockBus::new(2).with_device(0x4c, dev);
        bus.select(0x4c).unwrap();
        let raw = read_all(&mut bus, 0x4c).unwrap();
        assert_eq!(raw[0], 0x0FFF);
        assert_eq!(raw[7], 0x0001);
        assert_eq!(raw[3], 0);
    }

    #[test]
    fn test_channel_eight_is_invalid() {
        let mut bus = MockBus::new(2);
        let err = write_channel(&mut bus, 0x48, Target::Channel(8), 0).unwrap_err();
        assert!(matches!(err, DriverError::InvalidChannel { channel: 8, .. }));
    }
}
