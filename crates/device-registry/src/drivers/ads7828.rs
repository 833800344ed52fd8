//! ADS7828 8-channel 12-bit ADC.

use super::read_word_be;
use crate::types::{RawChannels, MAX_CHANNELS};
use crate::DriverError;
use i2c_transport::I2cBus;

/// Single ended inputs.
const CMD_SINGLE_ENDED: u8 = 0x80;
/// Internal reference off, converter on.
const CMD_PD1: u8 = 0x04;

/// Command byte for `channel`. Channel select bits are C2 C1 C0 = ch>>1 | (ch&1)<<2.
pub fn command_byte(channel: u8) -> u8 {
    let select = (channel >> 1) | ((channel & 0x01) << 2);
    CMD_SINGLE_ENDED | CMD_PD1 | (select << 4)
}

pub fn read_channel<B: I2cBus + ?Sized>(
    bus: &mut B,
    address: u8,
    channel: u8,
) -> Result<u16, DriverError> {
    if usize::from(channel) >= MAX_CHANNELS {
        return Err(DriverError::InvalidChannel {
            device: "ads7828",
            channel,
        });
    }
    let word = read_word_be(bus, command_byte(channel))?;
    tracing::trace!(address, channel, word, "ads7828 conversion");
    Ok(word)
}

pub fn read_all<B: I2cBus + ?Sized>(bus: &mut B, address: u8) -> Result<RawChannels, DriverError> {
    let mut raw = [0u16; MAX_CHANNELS];
    for (ch, slot) in (0u8..).zip(raw.iter_mut()) {
        *slot = read_channel(bus, address, ch)?;
    }
    Ok(raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use i2c_transport::{MockBus, MockDevice, MockOp};

    #[test]
    fn test_command_bytes() {
        let cmds: Vec<u8> = (0..8).map(command_byte).collect();
        assert_eq!(cmds, vec![0x84, 0xC4, 0x94, 0xD4, 0xA4, 0xE4, 0xB4, 0xF4]);
    }

    #[test]
    fn test_read_all_swaps_and_orders_channels() {
        let mut dev = MockDevice::new();
        for ch in 0..8u8 {
            // part sends MSB first: 0x0100 * ch arrives as 0x00ch
            dev = dev.with_word(command_byte(ch), u16::from(ch));
        }
        let mut bus = MockBus::new(1).with_device(0x48, dev);
        bus.select(0x48).unwrap();
        let raw = read_all(&mut bus, 0x48).unwrap();
        assert_eq!(raw[3], 0x0300);
        assert_eq!(
            bus.ops()[1],
            MockOp::ReadWord {
                address: 0x48,
                register: 0x84
            }
        );
    }

    #[test]
    fn test_bad_channel_rejected_before_io() {
        let mut bus = MockBus::new(1);
        let err = read_channel(&mut bus, 0x48, 8).unwrap_err();
        assert!(matches!(err, DriverError::InvalidChannel { channel: 8, .. }));
        assert!(bus.ops().is_empty());
    }
}
