//! device-registry: static catalogue of the supported I2C parts, their
//! register protocols and unit conversions, and the subsystem registry that
//! maps configuration onto buses.

mod types;
pub use types::*;

mod error;
pub use error::{ConversionError, DriverError};

mod table;
pub use table::{
    DeviceTable, AD5694, ADS7828, DAC7578, DAC7578_LSB_MV, LSB_12BIT, MCP23009, MPL115, SHT21,
    TMP75, VREF,
};

mod loader;
pub use loader::{
    load_config_file, load_subsystems, parse_network_conf, ConfigEntry, ConfigError, ToolConfig,
    BUS_MAX, DEFAULT_BUS_OFFSET, DEFAULT_CONFIG_PATH, DEFAULT_LOG_DIR, SUBSYSTEMS_MAX,
};

pub mod drivers;

mod metrics;
pub use metrics::{MetricsHub, ScanMetrics};

pub mod encode;

pub mod decode;
