use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::collections::HashMap;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use tracing::{info, warn};

use device_registry as devreg;
use devreg::{DeviceDescriptor, DeviceKind, DeviceTable, MetricsHub, Subsystem, SubsystemKind, ToolConfig};
use i2c_transport::{BusHandle, I2cBus, MockBus};
use poll_engine::{ConsoleSink, DacChannel, Engine, LogSink, ScanOutcome, WriteOp};

mod bench;

#[derive(Parser, Debug)]
#[command(
    name = "i2c-tool",
    version,
    about = "Poll and drive HV and sensor boards over I2C",
    disable_help_subcommand = true
)]
struct Cli {
    /// Subsystem configuration (network.conf format, or YAML by extension)
    #[arg(long, global = true, default_value = devreg::DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Append readings to the dated log file instead of printing them
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    log: bool,

    /// Log directory (overrides the configuration file)
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,

    /// Kernel adapter number of configured bus 0 (overrides the configuration file)
    #[arg(long, global = true)]
    bus_offset: Option<u8>,

    /// Bus backend
    #[arg(long, value_enum, default_value_t = Backend::Mock, global = true)]
    backend: Backend,

    /// Dump Prometheus counters to stderr when done
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    metrics: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Mock,
    Linux,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum HvState {
    On,
    Off,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Read every configured device
    Read {
        /// Only subsystems of this kind (sensors, hv, prec)
        #[arg(long)]
        kind: Option<SubsystemKind>,
    },
    /// Set the HV output voltage in kV
    Vset { kilovolts: f64 },
    /// Set the HV current limit in uA
    Ilim { microamps: f64 },
    /// Switch the HV output
    Hv {
        #[arg(value_enum)]
        state: HvState,
    },
    /// Set a precision threshold in mV
    PrecSet {
        /// Channel 0..=7; all channels when omitted
        #[arg(long)]
        channel: Option<u8>,
        #[arg(long)]
        millivolts: f64,
    },
    /// Probe every address range and report what answers
    Scan {
        #[arg(long)]
        kind: Option<SubsystemKind>,
    },
    /// Show the resolved subsystems and their devices
    List {
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// List the adapters the backend can see
    Adapters,
}

#[derive(Serialize)]
struct SubsystemView<'a> {
    bus: u8,
    adapter: u8,
    kind: SubsystemKind,
    devices: &'a [&'a DeviceDescriptor],
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    match cli.backend {
        Backend::Mock => {
            if let Commands::Adapters = cli.command {
                return list_adapters::<MockBus>();
            }
            let (config, table) = load(&cli)?;
            let kinds: HashMap<u8, SubsystemKind> =
                config.entries.iter().map(|e| (e.bus, e.kind)).collect();
            let offset = config.bus_offset;
            run(&cli, &config, &table, |bus| {
                let adapter = bus.saturating_add(offset);
                Ok(BusHandle::new(
                    bus,
                    bench::mock_bus(adapter, kinds.get(&bus).copied()),
                ))
            })
        }
        Backend::Linux => run_linux(&cli),
    }
}

#[cfg(feature = "linux")]
fn run_linux(cli: &Cli) -> Result<()> {
    use i2c_transport::LinuxBus;
    if let Commands::Adapters = cli.command {
        return list_adapters::<LinuxBus>();
    }
    let (config, table) = load(cli)?;
    let offset = config.bus_offset;
    run(cli, &config, &table, |bus| {
        BusHandle::<LinuxBus>::open(bus, bus.saturating_add(offset))
    })
}

#[cfg(not(feature = "linux"))]
fn run_linux(_cli: &Cli) -> Result<()> {
    anyhow::bail!("linux backend not compiled in; rebuild with --features linux")
}

fn setup_tracing() {
    // Best-effort; stdout carries readings, diagnostics go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .try_init();
}

fn list_adapters<B: I2cBus>() -> Result<()> {
    for bus in B::list()? {
        println!("{}\t{}", bus.name, bus.driver);
    }
    Ok(())
}

fn load(cli: &Cli) -> Result<(ToolConfig, DeviceTable)> {
    let mut config = devreg::load_config_file(&cli.config)
        .with_context(|| format!("loading configuration {}", cli.config.display()))?;
    if let Some(dir) = &cli.log_dir {
        config.log_dir = dir.clone();
    }
    if let Some(offset) = cli.bus_offset {
        config.bus_offset = offset;
    }
    Ok((config, DeviceTable::standard()))
}

fn run<B, F>(cli: &Cli, config: &ToolConfig, table: &DeviceTable, open: F) -> Result<()>
where
    B: I2cBus,
    F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
{
    let subsystems = devreg::load_subsystems(table, &config.entries)?;
    let hub = MetricsHub::new().map_err(anyhow::Error::msg)?;
    hub.scan.subsystems_loaded.set(subsystems.len() as i64);
    let engine = Engine::with_metrics(hub.clone());

    let outcome = dispatch(cli, config, &engine, &subsystems, open);
    if cli.metrics {
        eprint!("{}", hub.encode_text());
    }
    outcome
}

fn dispatch<B, F>(
    cli: &Cli,
    config: &ToolConfig,
    engine: &Engine,
    subsystems: &[Subsystem<'_>],
    open: F,
) -> Result<()>
where
    B: I2cBus,
    F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
{
    let dac = |device, channel, value| WriteOp::Dac {
        device,
        channel,
        value,
    };
    match &cli.command {
        Commands::Read { kind } => read(cli, config, engine, subsystems, *kind, open),
        Commands::Vset { kilovolts } => write(
            engine,
            subsystems,
            open,
            dac(DeviceKind::Ad5694, DacChannel::Single(0), *kilovolts),
        ),
        Commands::Ilim { microamps } => write(
            engine,
            subsystems,
            open,
            dac(DeviceKind::Ad5694, DacChannel::Single(1), *microamps),
        ),
        Commands::Hv { state } => write(
            engine,
            subsystems,
            open,
            WriteOp::Hv {
                on: *state == HvState::On,
            },
        ),
        Commands::PrecSet {
            channel,
            millivolts,
        } => {
            let channel = channel.map_or(DacChannel::All, DacChannel::Single);
            write(
                engine,
                subsystems,
                open,
                dac(DeviceKind::Dac7578, channel, *millivolts),
            )
        }
        Commands::Scan { kind } => {
            let entries = engine.run_scans(subsystems, *kind, open)?;
            for e in entries {
                let outcome = match e.outcome {
                    ScanOutcome::Found => "found",
                    ScanOutcome::Busy => "busy",
                    ScanOutcome::NoAck => "--",
                };
                println!("bus{}\t{}\t0x{:02x}\t{}", e.bus, e.device, e.address, outcome);
            }
            Ok(())
        }
        Commands::List { json } => list(config, subsystems, *json),
        // handled before the configuration is loaded
        Commands::Adapters => Ok(()),
    }
}

fn read<B, F>(
    cli: &Cli,
    config: &ToolConfig,
    engine: &Engine,
    subsystems: &[Subsystem<'_>],
    kind: Option<SubsystemKind>,
    open: F,
) -> Result<()>
where
    B: I2cBus,
    F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
{
    if cli.log {
        let started = poll_engine::now();
        let prefix = poll_engine::log_prefix(kind);
        let (path, file) = poll_engine::open_log_file(&config.log_dir, prefix, started.date())
            .with_context(|| format!("opening log in {}", config.log_dir.display()))?;
        info!(path = %path.display(), "logging readings");
        let mut sink = LogSink::new(BufWriter::new(file), started);
        engine.run_reads(subsystems, kind, open, &mut sink)?;
    } else {
        let stdout = io::stdout();
        let mut sink = ConsoleSink::new(stdout.lock());
        engine.run_reads(subsystems, kind, open, &mut sink)?;
    }
    Ok(())
}

fn write<B, F>(engine: &Engine, subsystems: &[Subsystem<'_>], open: F, op: WriteOp) -> Result<()>
where
    B: I2cBus,
    F: FnMut(u8) -> i2c_transport::Result<BusHandle<B>>,
{
    let applied = engine.run_writes(subsystems, open, op)?;
    if applied > 1 {
        warn!(applied, ?op, "write applied on several buses");
    }
    println!("ok ({applied} bus{})", if applied == 1 { "" } else { "es" });
    Ok(())
}

fn list(config: &ToolConfig, subsystems: &[Subsystem<'_>], json: bool) -> Result<()> {
    if json {
        let views: Vec<SubsystemView<'_>> = subsystems
            .iter()
            .map(|s| SubsystemView {
                bus: s.bus,
                adapter: config.adapter(s.bus),
                kind: s.kind,
                devices: &s.devices,
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }
    let mut out = io::stdout().lock();
    for s in subsystems {
        writeln!(out, "bus{} (/dev/i2c-{})\t{}", s.bus, config.adapter(s.bus), s.kind)?;
        for d in &s.devices {
            writeln!(
                out,
                "\t{}\t0x{:02x}-0x{:02x}\t{}",
                d.name,
                d.addr_low,
                d.addr_high,
                d.labels.join(",")
            )?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_prec_set() {
        let cli = Cli::try_parse_from([
            "i2c-tool",
            "--config",
            "net.yaml",
            "prec-set",
            "--channel",
            "3",
            "--millivolts",
            "12.5",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("net.yaml"));
        assert!(matches!(
            cli.command,
            Commands::PrecSet {
                channel: Some(3),
                ..
            }
        ));
    }

    #[test]
    fn test_cli_parses_read_kind_and_hv() {
        let cli = Cli::try_parse_from(["i2c-tool", "read", "--kind", "HV", "--log"]).unwrap();
        assert!(cli.log);
        assert!(matches!(
            cli.command,
            Commands::Read {
                kind: Some(SubsystemKind::Hv)
            }
        ));
        let cli = Cli::try_parse_from(["i2c-tool", "hv", "off"]).unwrap();
        assert!(matches!(cli.command, Commands::Hv { state: HvState::Off }));
        assert!(Cli::try_parse_from(["i2c-tool", "read", "--kind", "motors"]).is_err());
    }

    #[test]
    fn test_mock_bench_read_writes_log_record() {
        let dir = tempfile::tempdir().unwrap();
        let conf = dir.path().join("network.conf");
        std::fs::write(&conf, "bus0=sensors\nbus1=hv\n").unwrap();
        let cli = Cli::try_parse_from([
            "i2c-tool",
            "--config",
            conf.to_str().unwrap(),
            "--log",
            "--log-dir",
            dir.path().to_str().unwrap(),
            "read",
            "--kind",
            "hv",
        ])
        .unwrap();
        let (config, table) = load(&cli).unwrap();
        run(&cli, &config, &table, |bus| {
            Ok(BusHandle::new(bus, bench::mock_bus(bus + 1, Some(SubsystemKind::Hv))))
        })
        .unwrap();
        let logs: Vec<PathBuf> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().path())
            .filter(|p| p.extension().is_some_and(|x| x == "log"))
            .collect();
        assert_eq!(logs.len(), 1);
        let name = logs[0].file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("hv"));
        let text = std::fs::read_to_string(&logs[0]).unwrap();
        // 8 ADC channels, 2 DAC readbacks, 5 IO lines
        assert_eq!(text.split_whitespace().count(), 1 + 8 + 2 + 5);
    }
}
