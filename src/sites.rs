use anyhow::{Context, Result};
use std::collections::HashSet;
use tokio::fs;

use crate::util::parse_host_port;

/// How a bare host line becomes a probe target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EndpointTemplate {
    Url { prefix: String, suffix: String },
    HostPort { default_port: u16 },
}

impl Default for EndpointTemplate {
    fn default() -> Self {
        EndpointTemplate::Url {
            prefix: "https://www.".to_string(),
            suffix: String::new(),
        }
    }
}

/// Builds the target for one host line. Returns `None` for blank lines and
/// lines with whitespace inside the host.
pub fn endpoint_target(line: &str, template: &EndpointTemplate) -> Option<String> {
    let host = line.trim();
    if host.is_empty() || host.contains(char::is_whitespace) {
        return None;
    }
    Some(match template {
        EndpointTemplate::Url { prefix, suffix } => format!("{prefix}{host}{suffix}"),
        EndpointTemplate::HostPort { default_port } => {
            let (host, port) = parse_host_port(host, *default_port);
            format!("{host}:{port}")
        }
    })
}

/// Turns the contents of a host list into targets, keeping first-seen order
/// and dropping duplicates.
pub fn parse_endpoints(content: &str, template: &EndpointTemplate) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut endpoints = Vec::new();
    for (n, line) in content.lines().enumerate() {
        match endpoint_target(line, template) {
            Some(target) if seen.insert(target.clone()) => endpoints.push(target),
            Some(target) => tracing::debug!("line {}: duplicate target {}", n + 1, target),
            None if line.trim().is_empty() => {}
            None => tracing::warn!("line {}: skipping malformed host {:?}", n + 1, line),
        }
    }
    endpoints
}

/// Reads the host list. Failing to read it, or finding nothing to probe, is
/// fatal for the run.
pub async fn read_endpoints(path: &str, template: &EndpointTemplate) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("reading host list {}", path))?;
    let endpoints = parse_endpoints(&content, template);
    if endpoints.is_empty() {
        anyhow::bail!("host list {} contains no hosts", path);
    }
    Ok(endpoints)
}
