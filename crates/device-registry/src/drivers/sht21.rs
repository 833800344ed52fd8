//! SHT21 humidity sensor, no-hold-master measurement mode.

use crate::DriverError;
use i2c_transport::I2cBus;
use std::thread;
use std::time::Duration;

pub const TRIGGER_HUMIDITY_NO_HOLD: u8 = 0xF5;

/// Worst case conversion time at 12-bit humidity resolution.
const HUMIDITY_CONVERSION: Duration = Duration::from_millis(29);
/// Keeps self heating below 0.1 C between measurements.
const SETTLE: Duration = Duration::from_millis(500);

fn measure<B: I2cBus + ?Sized>(
    bus: &mut B,
    command: u8,
    conversion: Duration,
) -> Result<u16, DriverError> {
    bus.write_raw_byte(command)?;
    thread::sleep(conversion);
    let msb = bus.read_raw_byte()?;
    let lsb = bus.read_raw_byte()?;
    thread::sleep(SETTLE);
    Ok(u16::from_be_bytes([msb, lsb]))
}

pub fn measure_humidity<B: I2cBus + ?Sized>(bus: &mut B, address: u8) -> Result<u16, DriverError> {
    let raw = measure(bus, TRIGGER_HUMIDITY_NO_HOLD, HUMIDITY_CONVERSION)?;
    tracing::trace!(address, raw, "sht21 humidity");
    Ok(raw)
}
