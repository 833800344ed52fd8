//! TMP75 digital temperature sensor.

use super::{read_word_be, write_word_be};
use crate::encode::tmp75_register_9bit;
use crate::DriverError;
use i2c_transport::I2cBus;

pub const REG_TEMP: u8 = 0x00;
pub const REG_CONFIG: u8 = 0x01;
pub const REG_TLOW: u8 = 0x02;
pub const REG_THIGH: u8 = 0x03;

const RESOLUTION_12BIT: u8 = 0x60;

/// Select 12-bit resolution and read the temperature register.
pub fn read_temperature<B: I2cBus + ?Sized>(bus: &mut B, address: u8) -> Result<u16, DriverError> {
    bus.write_byte(REG_CONFIG, RESOLUTION_12BIT)?;
    let register = read_word_be(bus, REG_TEMP)?;
    tracing::trace!(address, register, "tmp75 temperature");
    Ok(register)
}

/// Program the alarm window, given in tenths of a degree.
pub fn set_limits<B: I2cBus + ?Sized>(
    bus: &mut B,
    low_tenths: i32,
    high_tenths: i32,
) -> Result<(), DriverError> {
    write_word_be(bus, REG_TLOW, tmp75_register_9bit(low_tenths))?;
    write_word_be(bus, REG_THIGH, tmp75_register_9bit(high_tenths))
}
