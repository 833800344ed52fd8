//! Rendering targets for read passes: human readable console lines or one
//! numeric record per run appended to a dated log file.

use device_registry::{DeviceDescriptor, Measurement, Reading, Subsystem, SubsystemKind, Unit};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

pub trait Sink {
    /// Called once before the first subsystem of a run.
    fn begin_run(&mut self) -> io::Result<()> {
        Ok(())
    }

    fn begin_subsystem(&mut self, _subsystem: &Subsystem<'_>) -> io::Result<()> {
        Ok(())
    }

    fn reading(&mut self, reading: &Reading<'_>, measurements: &[Measurement]) -> io::Result<()>;

    /// A busy address: one zero per reported channel keeps columns stable.
    /// `index` is the occurrence index the slot takes up.
    fn placeholder(
        &mut self,
        descriptor: &DeviceDescriptor,
        address: u8,
        index: usize,
    ) -> io::Result<()>;

    /// Called once at the end of a run, also after a failed pass.
    fn finish(&mut self) -> io::Result<()>;
}

/// Per-channel console lines with unit suffixes.
pub struct ConsoleSink<W: Write> {
    out: W,
}

impl<W: Write> ConsoleSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, label: &str, index: Option<usize>, m: &Measurement) -> io::Result<()> {
        let index = index.map(|i| i.to_string()).unwrap_or_default();
        match m.unit {
            Unit::Line => writeln!(self.out, "{label}{index}: {:.0}", m.value),
            unit => writeln!(self.out, "{label}{index}: {:.3} {}", m.value, unit.suffix()),
        }
    }
}

impl<W: Write> Sink for ConsoleSink<W> {
    fn begin_subsystem(&mut self, subsystem: &Subsystem<'_>) -> io::Result<()> {
        writeln!(self.out, "bus {} ({})", subsystem.bus, subsystem.kind)
    }

    fn reading(&mut self, reading: &Reading<'_>, measurements: &[Measurement]) -> io::Result<()> {
        let desc = reading.descriptor;
        match desc.title {
            Some(title) => {
                writeln!(self.out, "-----{title} {}------", reading.index)?;
                for m in measurements {
                    self.line(m.label, None, m)?;
                }
            }
            None => {
                for m in measurements {
                    self.line(m.label, Some(reading.index), m)?;
                }
            }
        }
        Ok(())
    }

    fn placeholder(
        &mut self,
        descriptor: &DeviceDescriptor,
        _address: u8,
        index: usize,
    ) -> io::Result<()> {
        match descriptor.title {
            Some(title) => {
                writeln!(self.out, "-----{title} {index}------")?;
                for label in descriptor.labels {
                    writeln!(self.out, "{label}: 0")?;
                }
            }
            None => {
                for label in descriptor.labels {
                    writeln!(self.out, "{label}{index}: 0")?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// One line per run: `HH:MM:SS v0 v1 ...`.
pub struct LogSink<W: Write> {
    out: W,
    started: OffsetDateTime,
    open: bool,
}

impl<W: Write> LogSink<W> {
    pub fn new(out: W, started: OffsetDateTime) -> Self {
        Self {
            out,
            started,
            open: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn value(&mut self, v: f64) -> io::Result<()> {
        write!(self.out, " {v:.3}")
    }
}

impl<W: Write> Sink for LogSink<W> {
    fn begin_run(&mut self) -> io::Result<()> {
        let stamp = self
            .started
            .format(format_description!("[hour]:[minute]:[second]"))
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        self.out.write_all(stamp.as_bytes())?;
        self.open = true;
        Ok(())
    }

    fn reading(&mut self, _reading: &Reading<'_>, measurements: &[Measurement]) -> io::Result<()> {
        for m in measurements {
            self.value(m.value)?;
        }
        Ok(())
    }

    fn placeholder(
        &mut self,
        descriptor: &DeviceDescriptor,
        _address: u8,
        _index: usize,
    ) -> io::Result<()> {
        for _ in 0..descriptor.channel_count() {
            self.value(0.0)?;
        }
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        if self.open {
            self.out.write_all(b"\n")?;
            self.open = false;
        }
        self.out.flush()
    }
}

/// Local wall clock, falling back to UTC when the offset is unknown.
pub fn now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

pub fn log_prefix(filter: Option<SubsystemKind>) -> &'static str {
    filter.map(SubsystemKind::name).unwrap_or("")
}

/// `<prefix>YYYY-MM-DD.log`
pub fn log_file_name(prefix: &str, date: Date) -> io::Result<String> {
    let day = date
        .format(format_description!("[year]-[month]-[day]"))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(format!("{prefix}{day}.log"))
}

/// Open (creating if needed) the day's log file for appending.
pub fn open_log_file(dir: &Path, prefix: &str, date: Date) -> io::Result<(PathBuf, File)> {
    let path = dir.join(log_file_name(prefix, date)?);
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let file = options.open(&path)?;
    tracing::debug!(path = %path.display(), "log file opened");
    Ok((path, file))
}
