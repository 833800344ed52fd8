//! Per-part register protocols and the capability pair the engine dispatches
//! through: [`DeviceKind::read_all`] and [`DeviceKind::format`].

pub mod ad5694;
pub mod ads7828;
pub mod dac7578;
pub mod mcp23009;
pub mod mpl115;
pub mod sht21;
pub mod tmp75;

use crate::decode;
use crate::types::{
    DeviceDescriptor, DeviceKind, Measurement, RawChannels, Reading, CHANNEL_UNUSED,
};
use crate::{ConversionError, DriverError};
use i2c_transport::I2cBus;

/// Most parts here send words MSB first while SMBus transfers LSB first.
pub(crate) fn read_word_be<B: I2cBus + ?Sized>(
    bus: &mut B,
    register: u8,
) -> Result<u16, DriverError> {
    Ok(bus.read_word(register)?.swap_bytes())
}

pub(crate) fn write_word_be<B: I2cBus + ?Sized>(
    bus: &mut B,
    register: u8,
    value: u16,
) -> Result<(), DriverError> {
    Ok(bus.write_word(register, value.swap_bytes())?)
}

impl DeviceKind {
    /// Acquire every channel of the part at `address`. Unused channels hold
    /// [`CHANNEL_UNUSED`].
    ///
    /// Callers hold the bus lock for the whole call so multi-register
    /// sequences are not interleaved with other traffic.
    pub fn read_all<B: I2cBus + ?Sized>(
        self,
        bus: &mut B,
        address: u8,
    ) -> Result<RawChannels, DriverError> {
        let mut raw = [CHANNEL_UNUSED; 8];
        match self {
            DeviceKind::Ads7828 => raw = ads7828::read_all(bus, address)?,
            DeviceKind::Ad5694 => {
                let codes = ad5694::read_all(bus, address)?;
                raw[..codes.len()].copy_from_slice(&codes);
            }
            DeviceKind::Mcp23009 => raw[0] = u16::from(mcp23009::read_port(bus, address)?),
            DeviceKind::Tmp75 => raw[0] = tmp75::read_temperature(bus, address)?,
            DeviceKind::Sht21 => raw[0] = sht21::measure_humidity(bus, address)?,
            DeviceKind::Mpl115 => {
                let sample = mpl115::read_sample(bus, address)?;
                raw[..6].copy_from_slice(&sample.to_raw());
            }
            DeviceKind::Dac7578 => raw = dac7578::read_all(bus, address)?,
        }
        Ok(raw)
    }

    /// Convert raw channels into calibrated values for the descriptor's
    /// reported channels.
    pub fn format(
        self,
        desc: &DeviceDescriptor,
        raw: &RawChannels,
    ) -> Result<Vec<Measurement>, ConversionError> {
        let measure = |ch: usize, value: f64| Measurement {
            label: desc.labels[ch],
            value,
            unit: desc.units[ch],
        };
        let out = match self {
            DeviceKind::Ads7828 | DeviceKind::Ad5694 | DeviceKind::Dac7578 => {
                let lsb = desc.lsb.unwrap_or(1.0);
                (0..desc.channel_count())
                    .map(|ch| measure(ch, decode::scaled(raw[ch], lsb, desc.conversion[ch])))
                    .collect()
            }
            DeviceKind::Mcp23009 => (0..desc.channel_count())
                .map(|bit| {
                    let on = decode::line_state(raw[0], bit);
                    measure(bit, if on { 1.0 } else { 0.0 })
                })
                .collect(),
            DeviceKind::Tmp75 => vec![measure(0, decode::tmp75_celsius_12bit(raw[0]))],
            DeviceKind::Sht21 => {
                let milli = decode::sht21_humidity_milli_percent(raw[0]);
                vec![measure(0, f64::from(milli) / 1000.0)]
            }
            DeviceKind::Mpl115 => {
                let sample = mpl115::Sample::from_raw(raw);
                let x16 = decode::mpl115_pressure_x16(sample.coefficients, sample.padc, sample.tadc)?;
                vec![measure(0, decode::mpl115_kpa(x16))]
            }
        };
        Ok(out)
    }
}

impl Reading<'_> {
    pub fn measurements(&self) -> Result<Vec<Measurement>, ConversionError> {
        self.descriptor.kind.format(self.descriptor, &self.raw)
    }
}
