use serde::{Deserialize, Serialize};
use anyhow::{Context, Result};
use crate::prober::ProbeKind;
use crate::sites::EndpointTemplate;
use std::path::Path;
use tokio::fs;

const DEFAULT_CONFIG_FILE: &str = "probe.json";

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ProbeConfig {
    /// Newline-delimited list of hosts to probe.
    pub sites_file: String,
    pub kind: ProbeKind,
    pub url_prefix: String,
    pub url_suffix: String,
    /// Port used for `tcp_connect` probes when the host line has none.
    pub tcp_port: u16,
    pub connect_timeout_ms: u64,
    pub response_timeout_ms: u64,
    pub tcp_timeout_ms: u64,
    pub keepalive_ms: u64,
    /// Disable idle pooling so each probe dials its own connection.
    pub fresh_connections: bool,
    pub use_env_proxy: bool,
    /// Name servers for resolution; empty means the system resolver.
    pub dns_servers: Vec<String>,
    pub heartbeat_interval_ms: u64,
    pub log_level: String,
    pub metrics_textfile: Option<String>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            sites_file: "sites.txt".to_string(),
            kind: ProbeKind::Http,
            url_prefix: "https://www.".to_string(),
            url_suffix: String::new(),
            tcp_port: 80,
            connect_timeout_ms: 15_000,
            response_timeout_ms: 10_000,
            tcp_timeout_ms: 3_000,
            keepalive_ms: 15_000,
            fresh_connections: true,
            use_env_proxy: true,
            dns_servers: Vec::new(),
            heartbeat_interval_ms: 60_000,
            log_level: "info".to_string(),
            metrics_textfile: None,
        }
    }
}

impl ProbeConfig {
    /// Get the log level as a tracing::Level
    pub fn get_tracing_level(&self) -> Result<tracing::Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(tracing::Level::TRACE),
            "debug" => Ok(tracing::Level::DEBUG),
            "info" => Ok(tracing::Level::INFO),
            "warn" | "warning" => Ok(tracing::Level::WARN),
            "error" => Ok(tracing::Level::ERROR),
            _ => Err(anyhow::anyhow!(
                "Invalid log level: {}. Valid levels are: trace, debug, info, warn, error",
                self.log_level
            )),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.get_tracing_level()?;
        for (name, value) in [
            ("connect_timeout_ms", self.connect_timeout_ms),
            ("response_timeout_ms", self.response_timeout_ms),
            ("tcp_timeout_ms", self.tcp_timeout_ms),
            ("heartbeat_interval_ms", self.heartbeat_interval_ms),
        ] {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", name);
            }
        }
        if self.sites_file.trim().is_empty() {
            anyhow::bail!("sites_file must not be empty");
        }
        Ok(())
    }

    pub fn endpoint_template(&self) -> EndpointTemplate {
        match self.kind {
            ProbeKind::Http => EndpointTemplate::Url {
                prefix: self.url_prefix.clone(),
                suffix: self.url_suffix.clone(),
            },
            ProbeKind::TcpConnect => EndpointTemplate::HostPort {
                default_port: self.tcp_port,
            },
        }
    }

    /// Reads the config named by `PROBE_CONFIG`, falling back to built-in
    /// defaults when that variable is unset and `probe.json` does not exist.
    /// `SITES_FILE` overrides the host list location.
    pub async fn load() -> Result<Self> {
        let explicit = std::env::var("PROBE_CONFIG").ok();
        let mut config = match explicit {
            Some(path) => Self::load_file(&path).await?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::load_file(DEFAULT_CONFIG_FILE).await?
            }
            None => Self::default(),
        };

        if let Ok(sites_file) = std::env::var("SITES_FILE") {
            config.sites_file = sites_file;
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn load_file(file_path: &str) -> Result<Self> {
        if !Path::new(file_path).exists() {
            return Err(anyhow::anyhow!("Config file not found: {}", file_path));
        }

        let content = fs::read_to_string(file_path)
            .await
            .with_context(|| format!("reading config file {}", file_path))?;
        let config: ProbeConfig = serde_json::from_str(&content)
            .with_context(|| format!("parsing config file {}", file_path))?;
        Ok(config)
    }
}
