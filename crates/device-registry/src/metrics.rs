use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};

#[derive(Clone)]
pub struct ScanMetrics {
    pub probes: IntCounter,
    pub busy: IntCounter,
    pub no_ack: IntCounter,
    pub devices_found: IntCounter,
    pub readings: IntCounter,
    pub writes: IntCounter,
    pub subsystems_loaded: IntGauge,
}

#[derive(Clone)]
pub struct MetricsHub {
    pub registry: Registry,
    pub scan: ScanMetrics,
}

fn counter(name: &str, help: &str) -> Result<IntCounter, String> {
    IntCounter::new(name, help).map_err(|e| format!("metrics init error: {e}"))
}

impl MetricsHub {
    pub fn new() -> Result<Self, String> {
        let registry = Registry::new();
        let scan = ScanMetrics {
            probes: counter("i2c_probes_total", "Candidate addresses probed")?,
            busy: counter("i2c_probe_busy_total", "Addresses reported busy")?,
            no_ack: counter("i2c_probe_no_ack_total", "Addresses that did not acknowledge")?,
            devices_found: counter("i2c_devices_found_total", "Devices that acknowledged a probe")?,
            readings: counter("i2c_readings_total", "Successful device reads")?,
            writes: counter("i2c_writes_total", "DAC and GPIO write passes applied")?,
            subsystems_loaded: IntGauge::new("i2c_subsystems_loaded", "Configured subsystems")
                .map_err(|e| format!("metrics init error: {e}"))?,
        };
        let _ = registry.register(Box::new(scan.probes.clone()));
        let _ = registry.register(Box::new(scan.busy.clone()));
        let _ = registry.register(Box::new(scan.no_ack.clone()));
        let _ = registry.register(Box::new(scan.devices_found.clone()));
        let _ = registry.register(Box::new(scan.readings.clone()));
        let _ = registry.register(Box::new(scan.writes.clone()));
        let _ = registry.register(Box::new(scan.subsystems_loaded.clone()));
        Ok(Self { registry, scan })
    }

    pub fn encode_text(&self) -> String {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buf) {
            return format!("error encoding metrics: {e}");
        }
        String::from_utf8(buf).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_show_up_in_exposition() {
        let hub = MetricsHub::new().unwrap();
        hub.scan.busy.inc();
        hub.scan.subsystems_loaded.set(2);
        let text = hub.encode_text();
        assert!(text.contains("i2c_probe_busy_total 1"));
        assert!(text.contains("i2c_subsystems_loaded 2"));
    }
}
