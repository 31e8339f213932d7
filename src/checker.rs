use tracing::{info, warn};

use crate::prober::{Measurement, Prober};
use crate::report::Report;

/// Probes a batch of endpoints one after another with a single prober.
pub struct SiteChecker<P> {
    prober: P,
}

impl<P: Prober> SiteChecker<P> {
    pub fn new(prober: P) -> Self {
        Self { prober }
    }

    /// Every endpoint gets exactly one probe and one entry in the report, in
    /// input order. A failing endpoint is recorded and the batch moves on.
    pub async fn check(&mut self, endpoints: &[String]) -> Report {
        let mut report = Report::with_capacity(endpoints.len());
        for endpoint in endpoints {
            let measurement = Measurement::from(self.prober.probe(endpoint).await);
            match &measurement {
                Measurement::Available(t) => info!(
                    "{} reachable in {:.6}s (connect {}, status {:?}, {})",
                    endpoint,
                    t.total().as_secs_f64(),
                    t.connection_duration()
                        .map(|d| format!("{:.6}s", d.as_secs_f64()))
                        .unwrap_or_else(|| "reused".to_string()),
                    t.status,
                    t.version.as_deref().unwrap_or("-"),
                ),
                Measurement::Unavailable(failure) => warn!("{} unavailable: {}", endpoint, failure),
            }
            report.record(endpoint.as_str(), measurement);
        }
        report
    }
}
