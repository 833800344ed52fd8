//! AD5694 quad 12-bit DAC. Channel A sets the HV output, channel B the
//! current limit.

use super::{read_word_be, write_word_be};
use crate::encode::{dac_word, dac_word_code};
use crate::DriverError;
use i2c_transport::I2cBus;

const CMD_WRITE_UPDATE: u8 = 0x03;
pub const CHANNELS: u8 = 4;
/// Outputs wired on the HV board and reported by a read.
pub const EMITTED: usize = 2;
pub const CH_VSET: u8 = 0;
pub const CH_ILIM: u8 = 1;

fn check_channel(channel: u8) -> Result<(), DriverError> {
    if channel < CHANNELS {
        Ok(())
    } else {
        Err(DriverError::InvalidChannel {
            device: "ad5694",
            channel,
        })
    }
}

pub fn readback_register(channel: u8) -> u8 {
    1 << channel
}

pub fn write_command(channel: u8) -> u8 {
    (CMD_WRITE_UPDATE << 4) | (1 << channel)
}

pub fn read_channel<B: I2cBus + ?Sized>(
    bus: &mut B,
    address: u8,
    channel: u8,
) -> Result<u16, DriverError> {
    check_channel(channel)?;
    let code = dac_word_code(read_word_be(bus, readback_register(channel))?);
    tracing::trace!(address, channel, code, "ad5694 readback");
    Ok(code)
}

pub fn read_all<B: I2cBus + ?Sized>(
    bus: &mut B,
    address: u8,
) -> Result<[u16; EMITTED], DriverError> {
    Ok([
        read_channel(bus, address, CH_VSET)?,
        read_channel(bus, address, CH_ILIM)?,
    ])
}

/// Write and update one output with a 12-bit code.
pub fn write_channel<B: I2cBus + ?Sized>(
    bus: &mut B,
    address: u8,
    channel: u8,
    code: u16,
) -> Result<(), DriverError> {
    check_channel(channel)?;
    tracing::debug!(address, channel, code, "ad5694 write");
    write_word_be(bus, write_command(channel), dac_word(code))
}
