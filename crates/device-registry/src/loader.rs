//! Subsystem registry: configuration entries in, resolved subsystems out.

use crate::table::DeviceTable;
use crate::types::{Subsystem, SubsystemKind};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Highest configurable bus number.
pub const BUS_MAX: u8 = 8;
/// Most subsystems one configuration may declare.
pub const SUBSYSTEMS_MAX: usize = 8;
/// Longest accepted `network.conf` line, whitespace excluded.
pub const LINE_MAX: usize = 20;

pub const DEFAULT_CONFIG_PATH: &str = "/home/hv/network.conf";
pub const DEFAULT_LOG_DIR: &str = "/home/hv/log";
/// Mux child buses start at `/dev/i2c-1`.
pub const DEFAULT_BUS_OFFSET: u8 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("line {line}: malformed subsystem declaration `{text}`")]
    Malformed { line: usize, text: String },
    #[error("line {line}: longer than {} characters", LINE_MAX)]
    LineTooLong { line: usize },
    #[error("bus {0} out of range 0..={}", BUS_MAX)]
    BusOutOfRange(u8),
    #[error("unknown subsystem kind `{0}`")]
    UnknownKind(String),
    #[error("more than {} subsystems declared", SUBSYSTEMS_MAX)]
    TooMany,
    #[error("reading config {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing yaml {}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// One pre-parsed `(bus, kind)` declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ConfigEntry {
    pub bus: u8,
    pub kind: SubsystemKind,
}

/// Everything read from a configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub entries: Vec<ConfigEntry>,
    pub bus_offset: u8,
    pub log_dir: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            bus_offset: DEFAULT_BUS_OFFSET,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
        }
    }
}

impl ToolConfig {
    /// Kernel adapter number for configured bus `bus`.
    pub fn adapter(&self, bus: u8) -> u8 {
        bus.saturating_add(self.bus_offset)
    }
}

#[derive(Debug, Deserialize)]
struct YamlConfig {
    subsystems: Vec<ConfigEntry>,
    #[serde(default)]
    bus_offset: Option<u8>,
    #[serde(default)]
    log_dir: Option<PathBuf>,
}

/// Resolve entries against the device table. Validates everything before
/// returning so that no bus I/O happens on a bad configuration.
pub fn load_subsystems<'t>(
    table: &'t DeviceTable,
    entries: &[ConfigEntry],
) -> Result<Vec<Subsystem<'t>>, ConfigError> {
    if entries.len() > SUBSYSTEMS_MAX {
        return Err(ConfigError::TooMany);
    }
    let mut out = Vec::with_capacity(entries.len());
    for entry in entries {
        if entry.bus > BUS_MAX {
            return Err(ConfigError::BusOutOfRange(entry.bus));
        }
        out.push(Subsystem {
            bus: entry.bus,
            kind: entry.kind,
            devices: table.devices(entry.kind).iter().collect(),
        });
        tracing::debug!(bus = entry.bus, kind = %entry.kind, "subsystem loaded");
    }
    Ok(out)
}

/// Parse the legacy `network.conf` format: `busN=kind` per line, `#`
/// comments, whitespace ignored everywhere.
pub fn parse_network_conf(text: &str) -> Result<Vec<ConfigEntry>, ConfigError> {
    let mut entries = Vec::new();
    for (idx, raw) in text.lines().enumerate() {
        let line = idx + 1;
        let content = raw.split('#').next().unwrap_or_default();
        let compact: String = content.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            continue;
        }
        if compact.len() > LINE_MAX {
            return Err(ConfigError::LineTooLong { line });
        }
        let malformed = || ConfigError::Malformed {
            line,
            text: compact.clone(),
        };
        let (key, kind) = compact.split_once('=').ok_or_else(malformed)?;
        let digit = key
            .strip_prefix("bus")
            .filter(|d| d.len() == 1)
            .and_then(|d| d.parse::<u8>().ok())
            .ok_or_else(malformed)?;
        if digit > BUS_MAX {
            return Err(ConfigError::BusOutOfRange(digit));
        }
        let kind = kind.parse::<SubsystemKind>().map_err(ConfigError::UnknownKind)?;
        if entries.len() == SUBSYSTEMS_MAX {
            return Err(ConfigError::TooMany);
        }
        entries.push(ConfigEntry { bus: digit, kind });
    }
    Ok(entries)
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// Load a configuration file, choosing the format by extension.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<ToolConfig, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = ToolConfig::default();
    if is_yaml(path) {
        let parsed: YamlConfig = serde_yaml::from_str(&raw).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?;
        if parsed.subsystems.len() > SUBSYSTEMS_MAX {
            return Err(ConfigError::TooMany);
        }
        if let Some(bad) = parsed.subsystems.iter().find(|e| e.bus > BUS_MAX) {
            return Err(ConfigError::BusOutOfRange(bad.bus));
        }
        config.entries = parsed.subsystems;
        if let Some(offset) = parsed.bus_offset {
            config.bus_offset = offset;
        }
        if let Some(dir) = parsed.log_dir {
            config.log_dir = dir;
        }
    } else {
        config.entries = parse_network_conf(&raw)?;
    }
    tracing::info!(path = %path.display(), subsystems = config.entries.len(), "configuration loaded");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DeviceKind;
    use std::io::Write;

    #[test]
    fn test_parse_network_conf() {
        let text = "# board layout\n\nbus0=sensors\n  bus1 = HV   # main supply\nbus2=prec\n";
        let entries = parse_network_conf(text).unwrap();
        assert_eq!(
            entries,
            vec![
                ConfigEntry { bus: 0, kind: SubsystemKind::Sensors },
                ConfigEntry { bus: 1, kind: SubsystemKind::Hv },
                ConfigEntry { bus: 2, kind: SubsystemKind::Prec },
            ]
        );
    }

    #[test]
    fn test_parse_rejects_bad_lines() {
        assert!(matches!(
            parse_network_conf("bus9=hv"),
            Err(ConfigError::BusOutOfRange(9))
        ));
        assert!(matches!(
            parse_network_conf("bus1=motors"),
            Err(ConfigError::UnknownKind(k)) if k == "motors"
        ));
        assert!(matches!(
            parse_network_conf("bus1"),
            Err(ConfigError::Malformed { line: 1, .. })
        ));
        assert!(matches!(
            parse_network_conf("\nbus12=hv"),
            Err(ConfigError::Malformed { line: 2, .. })
        ));
        assert!(matches!(
            parse_network_conf("bus1=sensorssensorssensors"),
            Err(ConfigError::LineTooLong { line: 1 })
        ));
    }

    #[test]
    fn test_too_many_subsystems() {
        let text: String = (0..9).map(|i| format!("bus{}=hv\n", i % 9)).collect();
        assert!(matches!(parse_network_conf(&text), Err(ConfigError::TooMany)));
    }

    #[test]
    fn test_load_subsystems_resolves_devices() {
        let table = DeviceTable::standard();
        let entries = [
            ConfigEntry { bus: 0, kind: SubsystemKind::Sensors },
            ConfigEntry { bus: 1, kind: SubsystemKind::Hv },
        ];
        let subs = load_subsystems(&table, &entries).unwrap();
        assert_eq!(subs.len(), 2);
        assert!(subs[0].device(DeviceKind::Mpl115).is_some());
        assert!(subs[1].device(DeviceKind::Mpl115).is_none());
        let hv: Vec<&str> = subs[1].devices.iter().map(|d| d.name).collect();
        assert_eq!(hv, vec!["ads7828", "ad5694", "mcp23009"]);
    }

    #[test]
    fn test_load_subsystems_rejects_bus_out_of_range() {
        let table = DeviceTable::standard();
        let entries = [ConfigEntry { bus: 9, kind: SubsystemKind::Hv }];
        assert!(matches!(
            load_subsystems(&table, &entries),
            Err(ConfigError::BusOutOfRange(9))
        ));
    }

    #[test]
    fn test_load_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.yaml");
        let mut f = fs::File::create(&path).unwrap();
        writeln!(
            f,
            "subsystems:\n  - {{ bus: 0, kind: sensors }}\n  - {{ bus: 3, kind: prec }}\nbus_offset: 0\nlog_dir: /tmp/hvlog"
        )
        .unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.entries.len(), 2);
        assert_eq!(config.entries[1].kind, SubsystemKind::Prec);
        assert_eq!(config.adapter(3), 3);
        assert_eq!(config.log_dir, PathBuf::from("/tmp/hvlog"));
    }

    #[test]
    fn test_load_legacy_file_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("network.conf");
        fs::write(&path, "bus0=hv\n").unwrap();
        let config = load_config_file(&path).unwrap();
        assert_eq!(config.adapter(0), 1);
        assert_eq!(config.log_dir, PathBuf::from(DEFAULT_LOG_DIR));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_config_file("/nonexistent/network.conf").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
