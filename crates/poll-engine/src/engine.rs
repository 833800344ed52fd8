//! Poll-and-dispatch: per subsystem, per descriptor, per candidate address,
//! probe and then read, write a DAC channel or switch the HV output.

use crate::error::{EngineError, Result};
use crate::prober::{probe, Absence, ProbeResult};
use crate::sink::Sink;
use device_registry::drivers::{ad5694, dac7578, mcp23009};
use device_registry::{
    encode, ConversionError, DeviceDescriptor, DeviceKind, DriverError, MetricsHub, Reading,
    ScanMetrics, Subsystem, SubsystemKind, MAX_CHANNELS,
};
use i2c_transport::{BusHandle, I2cBus};
use tracing::{debug, info, warn};

/// Full range of the precision threshold DAC, in millivolts.
pub const PREC_THRESHOLD_MAX_MV: f64 = 400.0;

/// Register value that addresses every channel of a multi-channel DAC.
const ALL_CHANNELS: u8 = 0x0F;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DacChannel {
    Single(u8),
    All,
}

/// A write pass. Exactly one kind of pass runs per invocation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WriteOp {
    Dac {
        device: DeviceKind,
        channel: DacChannel,
        value: f64,
    },
    Hv {
        on: bool,
    },
}

impl WriteOp {
    /// The device type the pass writes to.
    pub fn device(&self) -> DeviceKind {
        match self {
            WriteOp::Dac { device, .. } => *device,
            WriteOp::Hv { .. } => DeviceKind::Mcp23009,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    Found,
    Busy,
    NoAck,
}

/// One probed address, as reported by [`Engine::run_scan`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub bus: u8,
    pub device: &'static str,
    pub address: u8,
    pub outcome: ScanOutcome,
}

#[derive(Clone, Default)]
pub struct Engine {
    metrics: Option<MetricsHub>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_metrics(metrics: MetricsHub) -> Self {
        Self {
            metrics: Some(metrics),
        }
    }

    fn count(&self, f: impl FnOnce(&ScanMetrics)) {
        if let Some(hub) = &self.metrics {
            f(&hub.scan);
        }
    }

    fn observe(&self, result: &ProbeResult) {
        self.count(|m| {
            m.probes.inc();
            match result {
                ProbeResult::Found(_) => m.devices_found.inc(),
                ProbeResult::BusyOrAbsent {
                    cause: Absence::Busy,
                    ..
                } => m.busy.inc(),
                ProbeResult::BusyOrAbsent {
                    cause: Absence::NoAck,
                    ..
                } => m.no_ack.inc(),
                ProbeResult::FatalIoError { .. } => {}
            }
        });
    }

    /// Read every device of every descriptor in `subsystem` into `sink`.
    /// Busy addresses get placeholders; a fatal transport error aborts.
    pub fn run_read_pass<B: I2cBus, S: Sink + ?Sized>(
        &self,
        subsystem: &Subsystem<'_>,
        bus: &BusHandle<B>,
        sink: &mut S,
    ) -> Result<()> {
        sink.begin_subsystem(subsystem)?;
        for &desc in &subsystem.devices {
            let mut index = 0;
            for result in probe(bus, desc.addr_low, desc.addr_high) {
                self.observe(&result);
                match result {
                    ProbeResult::Found(address) => {
                        let reading = Reading {
                            descriptor: desc,
                            address,
                            raw: read_device(bus, desc, address)?,
                            index,
                        };
                        let measurements =
                            reading
                                .measurements()
                                .map_err(|source| EngineError::Conversion {
                                    bus: bus.number(),
                                    address,
                                    source,
                                })?;
                        sink.reading(&reading, &measurements)?;
                        info!(
                            bus = bus.number(),
                            device = desc.name,
                            address = format_args!("0x{address:02x}"),
                            index,
                            "device read"
                        );
                        index += 1;
                        self.count(|m| m.readings.inc());
                    }
                    ProbeResult::BusyOrAbsent {
                        address,
                        cause: Absence::Busy,
                    } => {
                        warn!(
                            bus = bus.number(),
                            device = desc.name,
                            address = format_args!("0x{address:02x}"),
                            "address busy"
                        );
                        sink.placeholder(desc, address, index)?;
                        index += 1;
                    }
                    ProbeResult::BusyOrAbsent {
                        cause: Absence::NoAck,
                        ..
                    } => {}
                    ProbeResult::FatalIoError { address, error } => {
                        return Err(EngineError::Transport {
                            bus: bus.number(),
                            address,
                            source: error,
                        })
                    }
                }
            }
        }
        Ok(())
    }

    /// Write `value` to one channel (or all channels) of the first `device`
    /// that answers in `subsystem`. The value is validated before any bus
    /// traffic.
    pub fn run_write_pass<B: I2cBus>(
        &self,
        subsystem: &Subsystem<'_>,
        bus: &BusHandle<B>,
        device: DeviceKind,
        channel: DacChannel,
        value: f64,
    ) -> Result<()> {
        let desc = subsystem
            .device(device)
            .ok_or(EngineError::DeviceNotFound {
                device: device.name(),
            })?;
        let code = dac_code(desc, channel, value)?;
        let address = self.first_found(bus, desc)?;
        {
            let mut guard = lock_selected(bus, address)?;
            write_dac(&mut *guard, desc, address, channel, code)
                .map_err(|e| EngineError::from_driver(bus.number(), address, e))?;
        }
        info!(
            bus = bus.number(),
            device = desc.name,
            address = format_args!("0x{address:02x}"),
            ?channel,
            value,
            code,
            "dac written"
        );
        self.count(|m| m.writes.inc());
        Ok(())
    }

    /// Switch the HV output through the first I/O expander that answers.
    pub fn run_hv_toggle<B: I2cBus>(
        &self,
        subsystem: &Subsystem<'_>,
        bus: &BusHandle<B>,
        on: bool,
    ) -> Result<()> {
        let desc = subsystem
            .device(DeviceKind::Mcp23009)
            .ok_or(EngineError::DeviceNotFound {
                device: DeviceKind::Mcp23009.name(),
            })?;
        let address = self.first_found(bus, desc)?;
        {
            let mut guard = lock_selected(bus, address)?;
            mcp23009::set_hv(&mut *guard, address, on)
                .map_err(|e| EngineError::from_driver(bus.number(), address, e))?;
        }
        info!(
            bus = bus.number(),
            address = format_args!("0x{address:02x}"),
            on,
            "hv switched"
        );
        self.count(|m| m.writes.inc());
        Ok(())
    }

    /// Probe every descriptor range without touching the devices.
    pub fn run_scan<B: I2cBus>(
        &self,
        subsystem: &Subsystem<'_>,
        bus: &BusHandle<B>,
    ) -> Result<Vec<ScanEntry>> {
        let mut entries = Vec::new();
        for &desc in &subsystem.devices {
            for result in probe(bus, desc.addr_low, desc.addr_high) {
                self.observe(&result);
                let outcome = match result {
                    ProbeResult::Found(_) => ScanOutcome::Found,
                    ProbeResult::BusyOrAbsent {
                        cause: Absence::Busy,
                        ..
                    } => ScanOutcome::Busy,
                    ProbeResult::BusyOrAbsent {
                        cause: Absence::NoAck,
                        ..
                    } => ScanOutcome::NoAck,
                    ProbeResult::FatalIoError { address, error } => {
                        return Err(EngineError::Transport {
                            bus: bus.number(),
                            address,
                            source: error,
                        })
                    }
                };
                entries.push(ScanEntry {
                    bus: subsystem.bus,
                    device: desc.name,
                    address: result.address(),
                    outcome,
                });
            }
        }
        Ok(entries)
    }

    /// Read pass over every subsystem matching `filter`, framed as one sink
    /// record. The record is closed even when a pass fails.
    pub fn run_reads<B, F, S>(
        &self,
        subsystems: &[Subsystem<'_>],
        filter: Option<SubsystemKind>,
        mut open: F,
        sink: &mut S,
    ) -> Result<()>
    where
        B: I2cBus,
        F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
        S: Sink + ?Sized,
    {
        sink.begin_run()?;
        let outcome = selected(subsystems, filter).try_for_each(|subsystem| {
            let bus = open_bus(&mut open, subsystem.bus)?;
            self.run_read_pass(subsystem, &bus, sink)
        });
        let finished = sink.finish();
        outcome?;
        Ok(finished?)
    }

    /// Apply `op` on every subsystem that carries the target device type.
    /// Subsystems where no such device answers are skipped; it is an error
    /// only if none answered anywhere. Returns the number of writes applied.
    pub fn run_writes<B, F>(
        &self,
        subsystems: &[Subsystem<'_>],
        mut open: F,
        op: WriteOp,
    ) -> Result<usize>
    where
        B: I2cBus,
        F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
    {
        let device = op.device();
        let targets: Vec<&Subsystem<'_>> = subsystems
            .iter()
            .filter(|s| s.device(device).is_some())
            .collect();
        if let (WriteOp::Dac { channel, value, .. }, Some(desc)) =
            (op, targets.first().and_then(|s| s.device(device)))
        {
            dac_code(desc, channel, value)?;
        }
        let mut applied = 0;
        for subsystem in targets {
            let bus = open_bus(&mut open, subsystem.bus)?;
            let result = match op {
                WriteOp::Dac {
                    device,
                    channel,
                    value,
                } => self.run_write_pass(subsystem, &bus, device, channel, value),
                WriteOp::Hv { on } => self.run_hv_toggle(subsystem, &bus, on),
            };
            match result {
                Ok(()) => applied += 1,
                Err(EngineError::DeviceNotFound { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        if applied == 0 {
            return Err(EngineError::DeviceNotFound {
                device: device.name(),
            });
        }
        Ok(applied)
    }

    pub fn run_scans<B, F>(
        &self,
        subsystems: &[Subsystem<'_>],
        filter: Option<SubsystemKind>,
        mut open: F,
    ) -> Result<Vec<ScanEntry>>
    where
        B: I2cBus,
        F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
    {
        let mut entries = Vec::new();
        for subsystem in selected(subsystems, filter) {
            let bus = open_bus(&mut open, subsystem.bus)?;
            entries.extend(self.run_scan(subsystem, &bus)?);
        }
        Ok(entries)
    }

    /// First acknowledging address of `desc` on `bus`.
    fn first_found<B: I2cBus>(&self, bus: &BusHandle<B>, desc: &DeviceDescriptor) -> Result<u8> {
        for result in probe(bus, desc.addr_low, desc.addr_high) {
            self.observe(&result);
            match result {
                ProbeResult::Found(address) => return Ok(address),
                ProbeResult::BusyOrAbsent {
                    address,
                    cause: Absence::Busy,
                } => warn!(
                    bus = bus.number(),
                    device = desc.name,
                    address = format_args!("0x{address:02x}"),
                    "address busy"
                ),
                ProbeResult::BusyOrAbsent { .. } => {}
                ProbeResult::FatalIoError { address, error } => {
                    return Err(EngineError::Transport {
                        bus: bus.number(),
                        address,
                        source: error,
                    })
                }
            }
        }
        warn!(bus = bus.number(), device = desc.name, "no device answered");
        Err(EngineError::DeviceNotFound { device: desc.name })
    }
}

fn selected<'a, 't>(
    subsystems: &'a [Subsystem<'t>],
    filter: Option<SubsystemKind>,
) -> impl Iterator<Item = &'a Subsystem<'t>> {
    subsystems
        .iter()
        .filter(move |s| filter.map_or(true, |kind| s.kind == kind))
}

fn open_bus<B, F>(open: &mut F, bus: u8) -> Result<BusHandle<B>>
where
    F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
{
    open(bus).map_err(|source| EngineError::Open { bus, source })
}

/// Lock the bus and re-select `address` so the following sequence runs
/// against it without interleaving.
fn lock_selected<B: I2cBus>(
    bus: &BusHandle<B>,
    address: u8,
) -> Result<std::sync::MutexGuard<'_, B>> {
    let transport = |source| EngineError::Transport {
        bus: bus.number(),
        address,
        source,
    };
    let mut guard = bus.lock().map_err(transport)?;
    guard.select(address).map_err(transport)?;
    Ok(guard)
}

fn read_device<B: I2cBus>(
    bus: &BusHandle<B>,
    desc: &DeviceDescriptor,
    address: u8,
) -> Result<device_registry::RawChannels> {
    let mut guard = lock_selected(bus, address)?;
    let raw = desc
        .kind
        .read_all(&mut *guard, address)
        .map_err(|e| EngineError::from_driver(bus.number(), address, e))?;
    debug!(bus = bus.number(), device = desc.name, ?raw, "raw channels");
    Ok(raw)
}

/// Validate the channel and convert `value` to a 12-bit code.
fn dac_code(desc: &DeviceDescriptor, channel: DacChannel, value: f64) -> Result<u16> {
    let invalid = |channel| EngineError::InvalidChannel {
        device: desc.name,
        channel,
    };
    let index = match (desc.kind, channel) {
        (DeviceKind::Ad5694, DacChannel::Single(ch)) if ch < ad5694::CHANNELS => ch,
        (DeviceKind::Dac7578, DacChannel::Single(ch)) if usize::from(ch) < MAX_CHANNELS => ch,
        (DeviceKind::Dac7578, DacChannel::All) => 0,
        (_, DacChannel::Single(ch)) => return Err(invalid(ch)),
        (_, DacChannel::All) => return Err(invalid(ALL_CHANNELS)),
    };
    let out_of_range = |source| EngineError::ValueOutOfRange {
        device: desc.name,
        source,
    };
    if desc.kind == DeviceKind::Dac7578 && value > PREC_THRESHOLD_MAX_MV {
        return Err(out_of_range(ConversionError::OutOfRange {
            value,
            min: 0.0,
            max: PREC_THRESHOLD_MAX_MV,
        }));
    }
    encode::dac_code(value, desc.channel_scale(usize::from(index))).map_err(out_of_range)
}

fn write_dac<B: I2cBus + ?Sized>(
    bus: &mut B,
    desc: &DeviceDescriptor,
    address: u8,
    channel: DacChannel,
    code: u16,
) -> core::result::Result<(), DriverError> {
    match (desc.kind, channel) {
        (DeviceKind::Dac7578, DacChannel::All) => {
            dac7578::write_channel(bus, address, dac7578::Target::All, code)
        }
        (DeviceKind::Dac7578, DacChannel::Single(ch)) => {
            dac7578::write_channel(bus, address, dac7578::Target::Channel(ch), code)
        }
        (_, DacChannel::Single(ch)) => ad5694::write_channel(bus, address, ch, code),
        (_, DacChannel::All) => Err(DriverError::InvalidChannel {
            device: desc.name,
            channel: ALL_CHANNELS,
        }),
    }
}
