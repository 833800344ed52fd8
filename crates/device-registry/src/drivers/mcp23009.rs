//! MCP23009 8-bit I/O expander. GP3 drives the HV enable relay.

use crate::DriverError;
use i2c_transport::I2cBus;

pub const REG_IODIR: u8 = 0x00;
pub const REG_GPPU: u8 = 0x06;
pub const REG_GPIO: u8 = 0x09;

/// Pull-up on the HV enable line only.
const PULLUPS: u8 = 0x08;
/// GP0..GP2 and GP4 are inputs, GP3 is an output.
const DIRECTION: u8 = 0x17;
pub const HV_ENABLE_BIT: u8 = 0x08;

pub fn write_register<B: I2cBus + ?Sized>(
    bus: &mut B,
    register: u8,
    value: u8,
) -> Result<(), DriverError> {
    Ok(bus.write_byte(register, value)?)
}

pub fn read_register<B: I2cBus + ?Sized>(bus: &mut B, register: u8) -> Result<u8, DriverError> {
    Ok(bus.read_byte(register)?)
}

/// Apply the board's pull-up and direction setup.
pub fn configure<B: I2cBus + ?Sized>(bus: &mut B) -> Result<(), DriverError> {
    write_register(bus, REG_GPPU, PULLUPS)?;
    write_register(bus, REG_IODIR, DIRECTION)
}

/// Configure the port and sample its lines.
pub fn read_port<B: I2cBus + ?Sized>(bus: &mut B, address: u8) -> Result<u8, DriverError> {
    configure(bus)?;
    let port = read_register(bus, REG_GPIO)?;
    tracing::trace!(address, port, "mcp23009 port");
    Ok(port)
}

/// Register writes that switch the HV output, in bus order.
pub fn hv_sequence(on: bool) -> [(u8, u8); 3] {
    let gpio = if on { HV_ENABLE_BIT } else { 0x00 };
    [(REG_GPPU, PULLUPS), (REG_IODIR, DIRECTION), (REG_GPIO, gpio)]
}

pub fn set_hv<B: I2cBus + ?Sized>(bus: &mut B, address: u8, on: bool) -> Result<(), DriverError> {
    for (register, value) in hv_sequence(on) {
        write_register(bus, register, value)?;
    }
    tracing::debug!(address, on, "mcp23009 hv output");
    Ok(())
}
