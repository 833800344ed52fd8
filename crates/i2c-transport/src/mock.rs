use crate::{BusInfo, I2cBus, Result, TransportError};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

/// One recorded transaction on a [`MockBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MockOp {
    Select(u8),
    QuickWrite(u8),
    ReadByte { address: u8, register: u8 },
    WriteByte { address: u8, register: u8, value: u8 },
    ReadWord { address: u8, register: u8 },
    WriteWord { address: u8, register: u8, value: u16 },
    ReadRawByte { address: u8 },
    WriteRawByte { address: u8, value: u8 },
}

/// Register contents of one simulated slave. Unset registers read as zero.
#[derive(Clone, Debug, Default)]
pub struct MockDevice {
    bytes: HashMap<u8, u8>,
    words: HashMap<u8, u16>,
    raw: VecDeque<u8>,
    word_routes: HashMap<u8, u8>,
    silent: bool,
}

impl MockDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_byte(mut self, register: u8, value: u8) -> Self {
        self.bytes.insert(register, value);
        self
    }

    /// `value` is given in SMBus order, i.e. exactly what `read_word` returns.
    pub fn with_word(mut self, register: u8, value: u16) -> Self {
        self.words.insert(register, value);
        self
    }

    /// Bytes handed out, in order, by `read_raw_byte`.
    pub fn with_raw_bytes(mut self, bytes: &[u8]) -> Self {
        self.raw.extend(bytes.iter().copied());
        self
    }

    /// Store words written to `write_register` under `read_register`, for
    /// parts whose write command and readback register differ.
    pub fn route_word(mut self, write_register: u8, read_register: u8) -> Self {
        self.word_routes.insert(write_register, read_register);
        self
    }

    /// Accept selection but never acknowledge a transaction.
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn byte(&self, register: u8) -> Option<u8> {
        self.bytes.get(&register).copied()
    }

    pub fn word(&self, register: u8) -> Option<u16> {
        self.words.get(&register).copied()
    }
}

/// A scriptable in-process bus. Each bus instance is independent.
pub struct MockBus {
    adapter: u8,
    selected: Option<u8>,
    devices: BTreeMap<u8, MockDevice>,
    busy: BTreeSet<u8>,
    broken: BTreeSet<u8>,
    ops: Vec<MockOp>,
}

impl MockBus {
    pub fn new(adapter: u8) -> Self {
        Self {
            adapter,
            selected: None,
            devices: BTreeMap::new(),
            busy: BTreeSet::new(),
            broken: BTreeSet::new(),
            ops: Vec::new(),
        }
    }

    pub fn with_device(mut self, address: u8, device: MockDevice) -> Self {
        self.devices.insert(address, device);
        self
    }

    /// Selecting `address` reports the adapter's "busy" condition.
    pub fn with_busy(mut self, address: u8) -> Self {
        self.busy.insert(address);
        self
    }

    /// Selecting `address` fails with a non-recoverable I/O error.
    pub fn with_broken(mut self, address: u8) -> Self {
        self.broken.insert(address);
        self
    }

    pub fn adapter(&self) -> u8 {
        self.adapter
    }

    pub fn ops(&self) -> &[MockOp] {
        &self.ops
    }

    pub fn device(&self, address: u8) -> Option<&MockDevice> {
        self.devices.get(&address)
    }

    fn target(&mut self) -> Result<(u8, &mut MockDevice)> {
        let address = self
            .selected
            .ok_or(TransportError::Io("no slave address selected".into()))?;
        match self.devices.get_mut(&address) {
            Some(dev) if !dev.silent => Ok((address, dev)),
            _ => Err(TransportError::NoAck),
        }
    }
}

impl I2cBus for MockBus {
    fn open(adapter: u8) -> Result<Self> {
        Ok(Self::new(adapter))
    }

    fn list() -> Result<Vec<BusInfo>> {
        Ok(vec![BusInfo {
            name: "mock0".to_string(),
            driver: "mock".to_string(),
        }])
    }

    fn select(&mut self, address: u8) -> Result<()> {
        self.ops.push(MockOp::Select(address));
        if self.broken.contains(&address) {
            return Err(TransportError::Io(format!(
                "mock adapter {} rejected 0x{address:02x}",
                self.adapter
            )));
        }
        if self.busy.contains(&address) {
            return Err(TransportError::Busy);
        }
        self.selected = Some(address);
        Ok(())
    }

    fn quick_write(&mut self) -> Result<()> {
        if let Some(address) = self.selected {
            self.ops.push(MockOp::QuickWrite(address));
        }
        self.target().map(|_| ())
    }

    fn read_byte(&mut self, register: u8) -> Result<u8> {
        let (address, dev) = self.target()?;
        let value = dev.bytes.get(&register).copied().unwrap_or(0);
        self.ops.push(MockOp::ReadByte { address, register });
        Ok(value)
    }

    fn write_byte(&mut self, register: u8, value: u8) -> Result<()> {
        let (address, dev) = self.target()?;
        dev.bytes.insert(register, value);
        self.ops.push(MockOp::WriteByte {
            address,
            register,
            value,
        });
        Ok(())
    }

    fn read_word(&mut self, register: u8) -> Result<u16> {
        let (address, dev) = self.target()?;
        let value = dev.words.get(&register).copied().unwrap_or(0);
        self.ops.push(MockOp::ReadWord { address, register });
        Ok(value)
    }

    fn write_word(&mut self, register: u8, value: u16) -> Result<()> {
        let (address, dev) = self.target()?;
        let stored = dev.word_routes.get(&register).copied().unwrap_or(register);
        dev.words.insert(stored, value);
        self.ops.push(MockOp::WriteWord {
            address,
            register,
            value,
        });
        Ok(())
    }

    fn read_raw_byte(&mut self) -> Result<u8> {
        let (address, dev) = self.target()?;
        let value = dev
            .raw
            .pop_front()
            .ok_or(TransportError::Io("mock device has no pending data".into()))?;
        self.ops.push(MockOp::ReadRawByte { address });
        Ok(value)
    }

    fn write_raw_byte(&mut self, value: u8) -> Result<()> {
        let (address, _) = self.target()?;
        self.ops.push(MockOp::WriteRawByte { address, value });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn busy_and_broken_addresses_fail_selection() {
        let mut bus = MockBus::new(1).with_busy(0x20).with_broken(0x21);
        assert_eq!(bus.select(0x20), Err(TransportError::Busy));
        assert!(matches!(bus.select(0x21), Err(TransportError::Io(_))));
        assert_eq!(bus.select(0x22), Ok(()));
    }

    #[test]
    fn quick_write_only_acknowledged_by_present_devices() {
        let mut bus = MockBus::new(1)
            .with_device(0x48, MockDevice::new())
            .with_device(0x49, MockDevice::new().silent());
        bus.select(0x48).unwrap();
        assert_eq!(bus.quick_write(), Ok(()));
        bus.select(0x49).unwrap();
        assert_eq!(bus.quick_write(), Err(TransportError::NoAck));
        bus.select(0x4a).unwrap();
        assert_eq!(bus.quick_write(), Err(TransportError::NoAck));
    }

    #[test]
    fn routed_word_writes_are_read_back() {
        let mut bus = MockBus::new(0).with_device(0x0c, MockDevice::new().route_word(0x31, 0x01));
        bus.select(0x0c).unwrap();
        bus.write_word(0x31, 0xf0ff).unwrap();
        assert_eq!(bus.read_word(0x01), Ok(0xf0ff));
        assert_eq!(
            bus.ops().last(),
            Some(&MockOp::ReadWord {
                address: 0x0c,
                register: 0x01
            })
        );
    }

    #[test]
    fn raw_bytes_drain_in_order() {
        let mut bus = MockBus::new(0).with_device(0x40, MockDevice::new().with_raw_bytes(&[0x68, 0x50]));
        bus.select(0x40).unwrap();
        assert_eq!(bus.read_raw_byte(), Ok(0x68));
        assert_eq!(bus.read_raw_byte(), Ok(0x50));
        assert!(bus.read_raw_byte().is_err());
    }
}
