use crate::{I2cBus, Result, TransportError};
use std::sync::{Mutex, MutexGuard};

/// One open adapter for the duration of a run.
///
/// Multi-register sequences (conversion start, settle, several reads) must
/// hold the guard returned by [`BusHandle::lock`] from start to finish; the
/// guard releases the bus on every exit path, including `?` returns.
pub struct BusHandle<B> {
    number: u8,
    inner: Mutex<B>,
}

impl<B: I2cBus> BusHandle<B> {
    /// Open adapter `adapter` for configured bus `number`.
    pub fn open(number: u8, adapter: u8) -> Result<Self> {
        let bus = B::open(adapter)?;
        tracing::debug!(bus = number, adapter, "bus opened");
        Ok(Self::new(number, bus))
    }
}

impl<B> BusHandle<B> {
    pub fn new(number: u8, bus: B) -> Self {
        Self {
            number,
            inner: Mutex::new(bus),
        }
    }

    /// Configured bus number (not the kernel adapter number).
    pub fn number(&self) -> u8 {
        self.number
    }

    pub fn lock(&self) -> Result<MutexGuard<'_, B>> {
        self.inner.lock().map_err(|_| TransportError::Poisoned)
    }

    /// Give back the underlying bus, e.g. to inspect a mock after a run.
    pub fn into_inner(self) -> Result<B> {
        self.inner.into_inner().map_err(|_| TransportError::Poisoned)
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{MockBus, MockOp};

    #[test]
    fn test_lock_then_recover_bus() {
        let handle = BusHandle::<MockBus>::open(3, 4).unwrap();
        assert_eq!(handle.number(), 3);
        handle.lock().unwrap().select(0x40).unwrap();
        let bus = handle.into_inner().unwrap();
        assert_eq!(bus.adapter(), 4);
        assert_eq!(bus.ops(), &[MockOp::Select(0x40)]);
    }
}
