use std::fmt;
use tokio::time::Duration;

use crate::prober::Measurement;

/// Measurements of one batch, in the order the endpoints were probed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    entries: Vec<(String, Measurement)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub available: usize,
    pub unavailable: usize,
    pub minimum: Option<Duration>,
    pub maximum: Option<Duration>,
}

impl Report {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
        }
    }

    pub fn record(&mut self, endpoint: impl Into<String>, measurement: Measurement) {
        self.entries.push((endpoint.into(), measurement));
    }

    pub fn entries(&self) -> &[(String, Measurement)] {
        &self.entries
    }

    pub fn get(&self, endpoint: &str) -> Option<&Measurement> {
        self.entries
            .iter()
            .find(|(e, _)| e == endpoint)
            .map(|(_, m)| m)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn available_durations(&self) -> impl Iterator<Item = Duration> + '_ {
        self.entries.iter().filter_map(|(_, m)| m.duration())
    }

    /// Fastest available endpoint; `None` when nothing was reachable.
    pub fn minimum_duration(&self) -> Option<Duration> {
        self.available_durations().min()
    }

    /// Slowest available endpoint; `None` when nothing was reachable.
    pub fn maximum_duration(&self) -> Option<Duration> {
        self.available_durations().max()
    }

    pub fn summary(&self) -> Summary {
        let available = self.entries.iter().filter(|(_, m)| m.is_available()).count();
        Summary {
            available,
            unavailable: self.entries.len() - available,
            minimum: self.minimum_duration(),
            maximum: self.maximum_duration(),
        }
    }
}

struct Seconds(Option<Duration>);

impl fmt::Display for Seconds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(d) => write!(f, "{:.6}", d.as_secs_f64()),
            None => f.write_str("no data"),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (endpoint, measurement) in &self.entries {
            match measurement {
                Measurement::Available(t) => {
                    writeln!(f, "site: {} available: {}", endpoint, Seconds(Some(t.total())))?
                }
                Measurement::Unavailable(failure) => {
                    writeln!(f, "site: {} unavailable: {}", endpoint, failure)?
                }
            }
        }
        writeln!(f, "Minimal duration: {}", Seconds(self.minimum_duration()))?;
        write!(f, "Maximal duration: {}", Seconds(self.maximum_duration()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prober::ProbeFailure;
    use crate::timestamp::{Connection, ProbeTimings};

    fn available(ms: u64) -> Measurement {
        Measurement::Available(ProbeTimings {
            total: Duration::from_millis(ms),
            connection: Connection::Reused,
            status: Some(200),
            version: None,
        })
    }

    fn unavailable() -> Measurement {
        Measurement::Unavailable(ProbeFailure::Dial("no such host".into()))
    }

    fn report(entries: Vec<(&str, Measurement)>) -> Report {
        let mut report = Report::default();
        for (endpoint, m) in entries {
            report.record(endpoint, m);
        }
        report
    }

    #[test]
    fn minimum_and_maximum_skip_unavailable() {
        let report = report(vec![
            ("https://www.a.com", available(120)),
            ("https://www.b.invalid", unavailable()),
            ("https://www.c.com", available(40)),
            ("https://www.d.com", available(300)),
        ]);

        let min = report.minimum_duration().unwrap();
        let max = report.maximum_duration().unwrap();
        assert_eq!(min, Duration::from_millis(40));
        assert_eq!(max, Duration::from_millis(300));
        for duration in report.available_durations() {
            assert!(min <= duration && duration <= max);
        }
    }

    #[test]
    fn zero_duration_is_still_a_measurement() {
        let report = report(vec![("a", available(0)), ("b", unavailable())]);
        assert_eq!(report.minimum_duration(), Some(Duration::ZERO));
        assert_eq!(report.maximum_duration(), Some(Duration::ZERO));
    }

    #[test]
    fn all_unavailable_means_no_data() {
        let report = report(vec![("a", unavailable()), ("b", unavailable())]);
        assert_eq!(report.minimum_duration(), None);
        assert_eq!(report.maximum_duration(), None);
        assert_eq!(
            report.summary(),
            Summary { available: 0, unavailable: 2, minimum: None, maximum: None }
        );
    }

    #[test]
    fn single_available_is_both_bounds() {
        let report = report(vec![
            ("https://www.google.com", available(85)),
            ("https://www.nonexistent-domain-xyz123.invalid", unavailable()),
        ]);
        assert_eq!(report.minimum_duration(), report.maximum_duration());
        assert_eq!(report.summary().available, 1);
        assert_eq!(report.summary().unavailable, 1);
    }

    #[test]
    fn rendering_lists_every_endpoint_then_bounds() {
        let report = report(vec![
            ("https://www.a.com", available(1500)),
            ("https://www.b.invalid", unavailable()),
        ]);
        let text = report.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "site: https://www.a.com available: 1.500000",
                "site: https://www.b.invalid unavailable: dial failed: no such host",
                "Minimal duration: 1.500000",
                "Maximal duration: 1.500000",
            ]
        );
    }

    #[test]
    fn rendering_without_data() {
        let text = report(vec![("a", unavailable())]).to_string();
        assert!(text.ends_with("Minimal duration: no data\nMaximal duration: no data"));
    }
}
