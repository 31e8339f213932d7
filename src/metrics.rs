use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, GaugeVec, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

use crate::prober::Measurement;
use crate::report::Report;

static REGISTRY: Lazy<Registry> = Lazy::new(Registry::new);

static DURATION_GAUGE: Lazy<GaugeVec> = Lazy::new(|| {
    let opts = Opts::new("probe_duration_seconds", "Duration of the last probe by phase");
    let gauge = GaugeVec::new(opts, &["target", "phase"]).expect("valid gauge definition");
    REGISTRY.register(Box::new(gauge.clone())).expect("gauge registered once");
    gauge
});

static AVAILABLE_GAUGE: Lazy<IntGaugeVec> = Lazy::new(|| {
    let opts = Opts::new("probe_available", "Whether the last probe of the target succeeded");
    let gauge = IntGaugeVec::new(opts, &["target"]).expect("valid gauge definition");
    REGISTRY.register(Box::new(gauge.clone())).expect("gauge registered once");
    gauge
});

static UNAVAILABLE_COUNTER: Lazy<IntCounterVec> = Lazy::new(|| {
    let opts = Opts::new("probe_unavailable_total", "Total number of failed probes");
    let ctr = IntCounterVec::new(opts, &["target", "reason"]).expect("valid counter definition");
    REGISTRY.register(Box::new(ctr.clone())).expect("counter registered once");
    ctr
});

pub fn observe(target: &str, measurement: &Measurement) {
    match measurement {
        Measurement::Available(t) => {
            AVAILABLE_GAUGE.with_label_values(&[target]).set(1);
            DURATION_GAUGE
                .with_label_values(&[target, "total"])
                .set(t.total().as_secs_f64());
            DURATION_GAUGE
                .with_label_values(&[target, "processing"])
                .set(t.request_processing().as_secs_f64());
            // a reused connection has no dial time to report
            match t.connection_duration() {
                Some(d) => DURATION_GAUGE
                    .with_label_values(&[target, "connection"])
                    .set(d.as_secs_f64()),
                None => {
                    let _ = DURATION_GAUGE.remove_label_values(&[target, "connection"]);
                }
            }
        }
        Measurement::Unavailable(failure) => {
            AVAILABLE_GAUGE.with_label_values(&[target]).set(0);
            UNAVAILABLE_COUNTER
                .with_label_values(&[target, failure.reason()])
                .inc();
        }
    }
}

pub fn observe_report(report: &Report) {
    for (target, measurement) in report.entries() {
        observe(target, measurement);
    }
}

pub fn render() -> Result<String> {
    let encoder = TextEncoder::new();
    let mf = REGISTRY.gather();
    let mut buf = Vec::new();
    encoder.encode(&mf, &mut buf)?;
    Ok(String::from_utf8(buf)?)
}

/// Writes the exposition next to `path` and renames it into place, so a
/// collector never reads a half-written file.
pub async fn write_textfile(path: &str) -> Result<()> {
    let body = render()?;
    let tmp = format!("{}.tmp", path);
    tokio::fs::write(&tmp, body)
        .await
        .with_context(|| format!("writing metrics to {}", tmp))?;
    tokio::fs::rename(&tmp, path)
        .await
        .with_context(|| format!("moving metrics into {}", path))?;
    Ok(())
}
