//! MPL115A2 barometer: start a conversion, then read the results and the
//! calibration coefficients.

use super::read_word_be;
use crate::decode::Mpl115Coefficients;
use crate::types::RawChannels;
use crate::DriverError;
use i2c_transport::I2cBus;
use std::thread;
use std::time::Duration;

pub const REG_PADC: u8 = 0x00;
pub const REG_TADC: u8 = 0x02;
pub const REG_A0: u8 = 0x04;
pub const REG_B1: u8 = 0x06;
pub const REG_B2: u8 = 0x08;
pub const REG_C12: u8 = 0x0A;
pub const REG_CONVERT: u8 = 0x12;

const CONVERSION: Duration = Duration::from_millis(3);

/// One conversion plus the coefficients needed to compensate it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub padc: u16,
    pub tadc: u16,
    pub coefficients: Mpl115Coefficients,
}

impl Sample {
    /// Channel layout: padc, tadc, a0, b1, b2, c12.
    pub fn to_raw(&self) -> [u16; 6] {
        let c = self.coefficients;
        [
            self.padc,
            self.tadc,
            c.a0 as u16,
            c.b1 as u16,
            c.b2 as u16,
            c.c12 as u16,
        ]
    }

    pub fn from_raw(raw: &RawChannels) -> Self {
        Self {
            padc: raw[0],
            tadc: raw[1],
            coefficients: Mpl115Coefficients {
                a0: raw[2] as i16,
                b1: raw[3] as i16,
                b2: raw[4] as i16,
                c12: raw[5] as i16,
            },
        }
    }
}

pub fn read_sample<B: I2cBus + ?Sized>(bus: &mut B, address: u8) -> Result<Sample, DriverError> {
    bus.write_byte(REG_CONVERT, 0)?;
    thread::sleep(CONVERSION);
    let tadc = read_word_be(bus, REG_TADC)? >> 6;
    let padc = read_word_be(bus, REG_PADC)? >> 6;
    let coefficients = Mpl115Coefficients {
        a0: read_word_be(bus, REG_A0)? as i16,
        b1: read_word_be(bus, REG_B1)? as i16,
        b2: read_word_be(bus, REG_B2)? as i16,
        c12: read_word_be(bus, REG_C12)? as i16,
    };
    tracing::trace!(address, padc, tadc, "mpl115 conversion");
    Ok(Sample {
        padc,
        tadc,
        coefficients,
    })
}
