use anyhow::Result;
use reqwest::{Client, Request, Response};
use std::sync::Arc;
use tokio::time::{Duration, Instant};

use super::dial::{DialRecorder, DialTimingLayer};
use super::resolver::PinnedResolver;
use super::{ProbeFailure, Prober};
use crate::config::ProbeConfig;
use crate::timestamp::{Checkpoints, ProbeTimings};
use crate::util::{describe_error, parse_ip_list};

/// HTTP client whose connector and request path are both timestamped.
///
/// One instance runs one probe at a time; every probe gets its own
/// [`Checkpoints`] and its own dial epoch, so nothing from an earlier probe
/// can end up in a later one.
pub struct InstrumentedTransport {
    client: Client,
    dials: DialRecorder,
}

#[derive(Debug, Clone)]
pub struct TransportOptions {
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub keepalive: Duration,
    pub fresh_connections: bool,
    pub use_env_proxy: bool,
    pub dns_servers: Vec<String>,
}

impl TransportOptions {
    pub fn from_config(cfg: &ProbeConfig) -> Self {
        Self {
            connect_timeout: Duration::from_millis(cfg.connect_timeout_ms),
            response_timeout: Duration::from_millis(cfg.response_timeout_ms),
            keepalive: Duration::from_millis(cfg.keepalive_ms),
            fresh_connections: cfg.fresh_connections,
            use_env_proxy: cfg.use_env_proxy,
            dns_servers: cfg.dns_servers.clone(),
        }
    }
}

impl InstrumentedTransport {
    pub fn new(opts: &TransportOptions) -> Result<Self> {
        let dials = DialRecorder::default();

        let mut builder = Client::builder()
            .use_rustls_tls()
            .connect_timeout(opts.connect_timeout)
            .timeout(opts.connect_timeout + opts.response_timeout)
            .tcp_keepalive(opts.keepalive)
            .redirect(reqwest::redirect::Policy::limited(10))
            .connector_layer(DialTimingLayer::new(dials.clone()));

        if opts.fresh_connections {
            builder = builder.pool_max_idle_per_host(0);
        }
        if !opts.use_env_proxy {
            builder = builder.no_proxy();
        }
        if !opts.dns_servers.is_empty() {
            let servers = parse_ip_list(&opts.dns_servers)?;
            tracing::info!("Resolving through {:?}", servers);
            builder = builder.dns_resolver(Arc::new(PinnedResolver::new(&servers)));
        }

        Ok(Self {
            client: builder.build()?,
            dials,
        })
    }

    pub fn from_config(cfg: &ProbeConfig) -> Result<Self> {
        Self::new(&TransportOptions::from_config(cfg))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Sends `request` and returns the response head with the timings of this
    /// exchange. The body is left untouched; dropping the response closes it.
    pub async fn round_trip(
        &mut self,
        request: Request,
    ) -> Result<(Response, ProbeTimings), ProbeFailure> {
        // request_start comes first so every dial of this epoch starts after it
        let mut checkpoints = Checkpoints::started_at(Instant::now());
        let epoch = self.dials.begin_probe();
        let outcome = self.client.execute(request).await;
        // close the epoch first so no dial can end after request_end
        checkpoints.dials = self.dials.finish_probe(epoch);
        let request_end = Instant::now();

        match outcome {
            Ok(response) => {
                checkpoints.request_end = Some(request_end);
                let version = format!("{:?}", response.version());
                let timings = checkpoints
                    .finish()
                    .with_response(response.status().as_u16(), version);
                Ok((response, timings))
            }
            Err(err) => Err(classify(&err, &checkpoints)),
        }
    }
}

/// TLS failures surface through the connector but belong to the exchange, not
/// the dial.
fn classify(err: &reqwest::Error, checkpoints: &Checkpoints) -> ProbeFailure {
    if err.is_timeout() {
        ProbeFailure::Timeout
    } else if is_tls_failure(err) {
        ProbeFailure::Request(describe_error(err))
    } else if err.is_connect() || checkpoints.dial_incomplete() {
        ProbeFailure::Dial(describe_error(err))
    } else {
        ProbeFailure::Request(describe_error(err))
    }
}

fn is_tls_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<rustls::Error>() {
            return true;
        }
        // io::Error::source skips the wrapped error itself
        if let Some(io) = e.downcast_ref::<std::io::Error>() {
            if io.get_ref().is_some_and(|inner| inner.is::<rustls::Error>()) {
                return true;
            }
        }
        current = e.source();
    }
    false
}

impl Prober for InstrumentedTransport {
    async fn probe(&mut self, target: &str) -> Result<ProbeTimings, ProbeFailure> {
        let request = self
            .client()
            .get(target)
            .build()
            .map_err(|e| ProbeFailure::Request(describe_error(&e)))?;
        let (response, timings) = self.round_trip(request).await?;
        drop(response);
        Ok(timings)
    }
}
