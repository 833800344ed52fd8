//! poll-engine: address probing and the poll-and-dispatch passes over
//! configured I2C subsystems.
//!
//! A pass is fixed per invocation: read every device into a [`Sink`], write
//! one DAC value, switch the HV output, or just scan. Busy addresses are
//! skipped (with placeholders on read passes); any other transport failure
//! aborts the run.

mod error;
pub use error::{EngineError, Result};

mod prober;
pub use prober::{probe, Absence, ProbeResult, Prober};

mod engine;
pub use engine::{DacChannel, Engine, ScanEntry, ScanOutcome, WriteOp, PREC_THRESHOLD_MAX_MV};

mod sink;
pub use sink::{log_file_name, log_prefix, now, open_log_file, ConsoleSink, LogSink, Sink};
