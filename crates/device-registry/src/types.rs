use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

/// Maximum number of channels any device reports.
pub const MAX_CHANNELS: usize = 8;

/// Raw value left in channels a device does not use.
pub const CHANNEL_UNUSED: u16 = 0xFFFF;

pub type RawChannels = [u16; MAX_CHANNELS];

/// The closed set of supported parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceKind {
    /// 8-channel 12-bit ADC
    Ads7828,
    /// 4-channel 12-bit DAC
    Ad5694,
    /// 8-bit I/O expander
    Mcp23009,
    Tmp75,
    Sht21,
    Mpl115,
    /// 8-channel 12-bit threshold DAC
    Dac7578,
}

impl DeviceKind {
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Ads7828 => "ads7828",
            DeviceKind::Ad5694 => "ad5694",
            DeviceKind::Mcp23009 => "mcp23009",
            DeviceKind::Tmp75 => "tmp75",
            DeviceKind::Sht21 => "sht21",
            DeviceKind::Mpl115 => "mpl115",
            DeviceKind::Dac7578 => "dac7578",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Which group of devices a configured bus carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemKind {
    Sensors,
    Hv,
    Prec,
}

impl SubsystemKind {
    pub fn name(self) -> &'static str {
        match self {
            SubsystemKind::Sensors => "sensors",
            SubsystemKind::Hv => "hv",
            SubsystemKind::Prec => "prec",
        }
    }
}

impl fmt::Display for SubsystemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SubsystemKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sensors" => Ok(SubsystemKind::Sensors),
            "hv" => Ok(SubsystemKind::Hv),
            "prec" => Ok(SubsystemKind::Prec),
            other => Err(other.to_string()),
        }
    }
}

/// Physical unit attached to a channel. Fixed metadata, never derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Kilovolt,
    Volt,
    Millivolt,
    Microamp,
    Nanoamp,
    Celsius,
    PercentRh,
    Kilopascal,
    /// A digital line state, 0 or 1.
    Line,
}

impl Unit {
    pub fn suffix(self) -> &'static str {
        match self {
            Unit::Kilovolt => "kV",
            Unit::Volt => "V",
            Unit::Millivolt => "mV",
            Unit::Microamp => "uA",
            Unit::Nanoamp => "nA",
            Unit::Celsius => "C",
            Unit::PercentRh => "%",
            Unit::Kilopascal => "kPa",
            Unit::Line => "",
        }
    }
}

/// Static metadata for one device type (not instance).
#[derive(Debug, Clone, Serialize)]
pub struct DeviceDescriptor {
    pub name: &'static str,
    pub kind: DeviceKind,
    /// Console heading for multi-channel parts.
    pub title: Option<&'static str>,
    /// Labels of the channels that get reported, in order.
    pub labels: &'static [&'static str],
    pub units: &'static [Unit],
    pub addr_low: u8,
    pub addr_high: u8,
    /// Physical value of one converter count.
    pub lsb: Option<f64>,
    pub conversion: [f64; MAX_CHANNELS],
}

impl DeviceDescriptor {
    pub fn channel_count(&self) -> usize {
        self.labels.len()
    }

    pub fn is_single_address(&self) -> bool {
        self.addr_low == self.addr_high
    }

    /// Physical value of one count on `channel`: `lsb * conversion[channel]`.
    pub fn channel_scale(&self, channel: usize) -> f64 {
        let factor = self.conversion.get(channel).copied().unwrap_or(1.0);
        self.lsb.unwrap_or(1.0) * factor
    }
}

/// One configured bus and the devices polled on it.
#[derive(Debug, Clone, Serialize)]
pub struct Subsystem<'t> {
    pub bus: u8,
    pub kind: SubsystemKind,
    pub devices: Vec<&'t DeviceDescriptor>,
}

impl<'t> Subsystem<'t> {
    pub fn device(&self, kind: DeviceKind) -> Option<&'t DeviceDescriptor> {
        self.devices.iter().copied().find(|d| d.kind == kind)
    }
}

/// Values just acquired from one device instance.
#[derive(Debug, Clone)]
pub struct Reading<'a> {
    pub descriptor: &'a DeviceDescriptor,
    pub address: u8,
    pub raw: RawChannels,
    /// 0 for the first instance of this device type found on the bus, 1 for the next...
    pub index: usize,
}

/// A calibrated channel value ready for output.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub label: &'static str,
    pub value: f64,
    pub unit: Unit,
}
