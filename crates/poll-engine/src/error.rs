use device_registry::{ConversionError, DriverError};
use i2c_transport::TransportError;
use thiserror::Error;

pub type Result<T, E = EngineError> = core::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("bus {bus}: cannot open adapter: {source}")]
    Open {
        bus: u8,
        #[source]
        source: TransportError,
    },
    #[error("bus {bus} address 0x{address:02x}: {source}")]
    Transport {
        bus: u8,
        address: u8,
        #[source]
        source: TransportError,
    },
    /// Compensation arithmetic left its range; an internal invariant failed.
    #[error("bus {bus} address 0x{address:02x}: {source}")]
    Conversion {
        bus: u8,
        address: u8,
        #[source]
        source: ConversionError,
    },
    #[error("{device} has no channel {channel}")]
    InvalidChannel { device: &'static str, channel: u8 },
    #[error("{device}: {source}")]
    ValueOutOfRange {
        device: &'static str,
        #[source]
        source: ConversionError,
    },
    #[error("no {device} answered on any configured bus")]
    DeviceNotFound { device: &'static str },
    #[error("writing output: {0}")]
    Sink(#[from] std::io::Error),
}

impl EngineError {
    /// Attach the bus and address a driver call was made against.
    pub(crate) fn from_driver(bus: u8, address: u8, err: DriverError) -> Self {
        match err {
            DriverError::Transport(source) => EngineError::Transport {
                bus,
                address,
                source,
            },
            DriverError::Conversion(source) => EngineError::Conversion {
                bus,
                address,
                source,
            },
            DriverError::InvalidChannel { device, channel } => {
                EngineError::InvalidChannel { device, channel }
            }
        }
    }
}
