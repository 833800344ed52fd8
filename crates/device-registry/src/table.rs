use crate::types::{DeviceDescriptor, DeviceKind, SubsystemKind, Unit, MAX_CHANNELS};

/// Reference voltage of the HV board converters.
pub const VREF: f64 = 4.53;
/// One count of a 12-bit converter on `VREF`.
pub const LSB_12BIT: f64 = VREF / 4096.0;
/// One count of the threshold DAC, in millivolts.
pub const DAC7578_LSB_MV: f64 = 0.097680;

const UNITY: [f64; MAX_CHANNELS] = [1.0; MAX_CHANNELS];

pub const ADS7828: DeviceDescriptor = DeviceDescriptor {
    name: "ads7828",
    kind: DeviceKind::Ads7828,
    title: Some("ADC"),
    labels: &["IHVp", "IHVn", "VHVn", "VHVp", "VHVs", "Vpwr", "Vset", "Ilim"],
    units: &[
        Unit::Microamp,
        Unit::Microamp,
        Unit::Kilovolt,
        Unit::Kilovolt,
        Unit::Nanoamp,
        Unit::Volt,
        Unit::Kilovolt,
        Unit::Microamp,
    ],
    addr_low: 0x48,
    addr_high: 0x4b,
    lsb: Some(LSB_12BIT),
    conversion: [2.0, 2.0, 2.0, 2.0, 400.0, 1.0, 2.0, 2.0],
};

pub const AD5694: DeviceDescriptor = DeviceDescriptor {
    name: "ad5694",
    kind: DeviceKind::Ad5694,
    title: Some("DAC"),
    labels: &["Vset", "Ilim"],
    units: &[Unit::Kilovolt, Unit::Microamp],
    addr_low: 0x0c,
    addr_high: 0x0f,
    lsb: Some(LSB_12BIT),
    conversion: [2.0, 2.0, 1.0, 1.0, 1.0, 1.0, 1.0, 1.0],
};

pub const MCP23009: DeviceDescriptor = DeviceDescriptor {
    name: "mcp23009",
    kind: DeviceKind::Mcp23009,
    title: Some("IO"),
    labels: &["D0", "D1", "D2", "HVon", "D4"],
    units: &[Unit::Line; 5],
    addr_low: 0x20,
    addr_high: 0x27,
    lsb: None,
    conversion: UNITY,
};

pub const TMP75: DeviceDescriptor = DeviceDescriptor {
    name: "tmp75",
    kind: DeviceKind::Tmp75,
    title: None,
    labels: &["TMP"],
    units: &[Unit::Celsius],
    addr_low: 0x48,
    addr_high: 0x4f,
    lsb: None,
    conversion: UNITY,
};

pub const SHT21: DeviceDescriptor = DeviceDescriptor {
    name: "sht21",
    kind: DeviceKind::Sht21,
    title: None,
    labels: &["HMD"],
    units: &[Unit::PercentRh],
    addr_low: 0x40,
    addr_high: 0x40,
    lsb: None,
    conversion: UNITY,
};

pub const MPL115: DeviceDescriptor = DeviceDescriptor {
    name: "mpl115",
    kind: DeviceKind::Mpl115,
    title: None,
    labels: &["PRS"],
    units: &[Unit::Kilopascal],
    addr_low: 0x60,
    addr_high: 0x60,
    lsb: None,
    conversion: UNITY,
};

pub const DAC7578: DeviceDescriptor = DeviceDescriptor {
    name: "dac7578",
    kind: DeviceKind::Dac7578,
    title: Some("PREC"),
    labels: &["Ch0", "Ch1", "Ch2", "Ch3", "Ch4", "Ch5", "Ch6", "Ch7"],
    units: &[Unit::Millivolt; 8],
    addr_low: 0x48,
    addr_high: 0x4c,
    lsb: Some(DAC7578_LSB_MV),
    conversion: UNITY,
};

/// Immutable registry of the device groups, built once at startup and
/// handed to the subsystem loader by reference.
#[derive(Debug, Clone)]
pub struct DeviceTable {
    hv: Vec<DeviceDescriptor>,
    sensors: Vec<DeviceDescriptor>,
    prec: Vec<DeviceDescriptor>,
}

impl DeviceTable {
    pub fn standard() -> Self {
        Self {
            hv: vec![ADS7828, AD5694, MCP23009],
            sensors: vec![TMP75, SHT21, MPL115],
            prec: vec![DAC7578],
        }
    }

    /// Devices of one group, in polling order.
    pub fn devices(&self, kind: SubsystemKind) -> &[DeviceDescriptor] {
        match kind {
            SubsystemKind::Hv => &self.hv,
            SubsystemKind::Sensors => &self.sensors,
            SubsystemKind::Prec => &self.prec,
        }
    }

    pub fn find(&self, kind: DeviceKind) -> Option<&DeviceDescriptor> {
        self.hv
            .iter()
            .chain(&self.sensors)
            .chain(&self.prec)
            .find(|d| d.kind == kind)
    }
}

impl Default for DeviceTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i2c_transport::{ADDRESS_MAX, ADDRESS_MIN};

    fn all(table: &DeviceTable) -> Vec<&DeviceDescriptor> {
        [SubsystemKind::Hv, SubsystemKind::Sensors, SubsystemKind::Prec]
            .into_iter()
            .flat_map(|k| table.devices(k))
            .collect()
    }

    #[test]
    fn test_descriptor_invariants() {
        let table = DeviceTable::standard();
        for d in all(&table) {
            assert!(d.channel_count() <= MAX_CHANNELS, "{}", d.name);
            assert_eq!(d.labels.len(), d.units.len(), "{}", d.name);
            assert!(d.addr_low <= d.addr_high, "{}", d.name);
            assert!(d.addr_low >= ADDRESS_MIN && d.addr_high <= ADDRESS_MAX, "{}", d.name);
            assert_eq!(d.name, d.kind.name());
        }
    }

    #[test]
    fn test_single_address_parts() {
        assert!(SHT21.is_single_address());
        assert!(MPL115.is_single_address());
        assert!(!ADS7828.is_single_address());
    }

    #[test]
    fn test_channel_scale() {
        assert!((ADS7828.channel_scale(4) - 400.0 * LSB_12BIT).abs() < 1e-12);
        assert_eq!(MCP23009.channel_scale(0), 1.0);
        assert_eq!(AD5694.channel_scale(9), LSB_12BIT);
    }

    #[test]
    fn test_find_by_kind() {
        let table = DeviceTable::standard();
        assert_eq!(table.find(DeviceKind::Mpl115).map(|d| d.name), Some("mpl115"));
        assert_eq!(table.devices(SubsystemKind::Hv).len(), 3);
    }
}
