//! Lazy scan of a descriptor's address range.

use i2c_transport::{BusHandle, I2cBus, TransportError, ADDRESS_MAX, ADDRESS_MIN};
use tracing::{debug, error};

/// Why an address was skipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Absence {
    /// Selection was refused as contended; a device may still live here.
    Busy,
    /// Selection succeeded but nothing acknowledged the quick command.
    NoAck,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeResult {
    Found(u8),
    BusyOrAbsent { address: u8, cause: Absence },
    FatalIoError { address: u8, error: TransportError },
}

impl ProbeResult {
    pub fn address(&self) -> u8 {
        match self {
            ProbeResult::Found(address)
            | ProbeResult::BusyOrAbsent { address, .. }
            | ProbeResult::FatalIoError { address, .. } => *address,
        }
    }
}

/// Iterator over [`ProbeResult`]s for one address range. Finite and not
/// restartable; it stops for good after yielding a fatal error.
pub struct Prober<'h, B> {
    handle: &'h BusHandle<B>,
    next: Option<u8>,
    high: u8,
}

/// Probe every address in `low..=high`, clamped to the legal 7-bit range.
pub fn probe<B: I2cBus>(handle: &BusHandle<B>, low: u8, high: u8) -> Prober<'_, B> {
    let low = low.max(ADDRESS_MIN);
    let high = high.min(ADDRESS_MAX);
    Prober {
        handle,
        next: (low <= high).then_some(low),
        high,
    }
}

impl<B: I2cBus> Prober<'_, B> {
    fn probe_one(&self, address: u8) -> ProbeResult {
        let mut bus = match self.handle.lock() {
            Ok(bus) => bus,
            Err(error) => return ProbeResult::FatalIoError { address, error },
        };
        match bus.select(address) {
            Ok(()) => {}
            Err(TransportError::Busy) => {
                return ProbeResult::BusyOrAbsent {
                    address,
                    cause: Absence::Busy,
                }
            }
            Err(error) => return ProbeResult::FatalIoError { address, error },
        }
        match bus.quick_write() {
            Ok(()) => ProbeResult::Found(address),
            Err(e) if e.is_absence() => ProbeResult::BusyOrAbsent {
                address,
                cause: Absence::NoAck,
            },
            Err(error) => ProbeResult::FatalIoError { address, error },
        }
    }
}

impl<B: I2cBus> Iterator for Prober<'_, B> {
    type Item = ProbeResult;

    fn next(&mut self) -> Option<ProbeResult> {
        let address = self.next?;
        self.next = if address < self.high {
            Some(address + 1)
        } else {
            None
        };
        let result = self.probe_one(address);
        let bus = self.handle.number();
        match &result {
            ProbeResult::Found(_) => debug!(bus, address = format_args!("0x{address:02x}"), "ack"),
            ProbeResult::BusyOrAbsent { cause, .. } => {
                debug!(bus, address = format_args!("0x{address:02x}"), ?cause, "skipped")
            }
            ProbeResult::FatalIoError { error: e, .. } => {
                error!(bus, address = format_args!("0x{address:02x}"), error = %e, "probe failed");
                self.next = None;
            }
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i2c_transport::{MockBus, MockDevice, MockOp};
    use proptest::prelude::*;

    fn selections(handle: BusHandle<MockBus>) -> Vec<u8> {
        handle
            .into_inner()
            .unwrap()
            .ops()
            .iter()
            .filter_map(|op| match op {
                MockOp::Select(a) => Some(*a),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_found_and_absent() {
        let bus = MockBus::new(1).with_device(0x49, MockDevice::new());
        let handle = BusHandle::new(0, bus);
        let results: Vec<ProbeResult> = probe(&handle, 0x48, 0x4a).collect();
        assert_eq!(
            results,
            vec![
                ProbeResult::BusyOrAbsent { address: 0x48, cause: Absence::NoAck },
                ProbeResult::Found(0x49),
                ProbeResult::BusyOrAbsent { address: 0x4a, cause: Absence::NoAck },
            ]
        );
    }

    #[test]
    fn test_busy_does_not_stop_scan() {
        let bus = MockBus::new(1)
            .with_busy(0x20)
            .with_busy(0x21)
            .with_device(0x22, MockDevice::new());
        let handle = BusHandle::new(0, bus);
        let results: Vec<ProbeResult> = probe(&handle, 0x20, 0x23).collect();
        assert_eq!(results.len(), 4);
        assert_eq!(
            results[0],
            ProbeResult::BusyOrAbsent { address: 0x20, cause: Absence::Busy }
        );
        assert_eq!(results[2], ProbeResult::Found(0x22));
    }

    #[test]
    fn test_fatal_error_fuses_iterator() {
        let bus = MockBus::new(1).with_broken(0x0d);
        let handle = BusHandle::new(0, bus);
        let mut prober = probe(&handle, 0x0c, 0x0f);
        assert!(matches!(prober.next(), Some(ProbeResult::BusyOrAbsent { .. })));
        assert!(matches!(
            prober.next(),
            Some(ProbeResult::FatalIoError { address: 0x0d, .. })
        ));
        assert_eq!(prober.next(), None);
        assert_eq!(selections(handle), vec![0x0c, 0x0d]);
    }

    #[test]
    fn test_range_clamped_to_legal_addresses() {
        let handle = BusHandle::new(0, MockBus::new(1));
        assert_eq!(probe(&handle, 0x00, 0x09).count(), 2);
        assert_eq!(probe(&handle, 0x76, 0x7f).count(), 2);
        assert_eq!(probe(&handle, 0x50, 0x4f).count(), 0);
        assert_eq!(selections(handle), vec![0x08, 0x09, 0x76, 0x77]);
    }

    #[test]
    fn test_single_address_range() {
        let bus = MockBus::new(1).with_device(0x40, MockDevice::new());
        let handle = BusHandle::new(0, bus);
        let results: Vec<ProbeResult> = probe(&handle, 0x40, 0x40).collect();
        assert_eq!(results, vec![ProbeResult::Found(0x40)]);
    }

    proptest! {
        #[test]
        fn never_selects_outside_range(low in 0u8..=0x7f, high in 0u8..=0x7f, busy in 0u8..=0x7f) {
            let bus = MockBus::new(1).with_busy(busy).with_device(low, MockDevice::new());
            let handle = BusHandle::new(0, bus);
            let yielded = probe(&handle, low, high).count();
            let selected = selections(handle);
            prop_assert_eq!(yielded, selected.len());
            let in_range = selected
                .iter()
                .all(|a| (low..=high).contains(a) && (ADDRESS_MIN..=ADDRESS_MAX).contains(a));
            prop_assert!(in_range);
        }
    }
}
