use std::fmt::Write;
use std::net::IpAddr;
use anyhow::Result;

pub fn parse_host_port(s: &str, default_port: u16) -> (String, u16) {
    if let Some(idx) = s.rfind(':') {
        if let Ok(port) = s[idx+1..].parse::<u16>() {
            return (s[..idx].to_string(), port);
        }
    }
    (s.to_string(), default_port)
}

pub fn parse_ip_list(hosts: &[String]) -> Result<Vec<IpAddr>> {
    hosts
        .iter()
        .map(|h| {
            h.trim()
                .parse::<IpAddr>()
                .map_err(|e| anyhow::anyhow!("Invalid DNS server address {:?}: {}", h, e))
        })
        .collect()
}

/// Flattens an error and its sources into one line.
pub fn describe_error(mut err: &(dyn std::error::Error + 'static)) -> String {
    let mut s = err.to_string();
    while let Some(src) = err.source() {
        let _ = write!(s, ": {}", src);
        err = src;
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_port_split() {
        assert_eq!(parse_host_port("example.com", 80), ("example.com".to_string(), 80));
        assert_eq!(parse_host_port("example.com:8080", 80), ("example.com".to_string(), 8080));
        assert_eq!(parse_host_port("example.com:http", 80), ("example.com:http".to_string(), 80));
    }

    #[test]
    fn ip_list_rejects_names() {
        let ok = parse_ip_list(&["1.1.1.1".to_string(), " 8.8.8.8".to_string()]).unwrap();
        assert_eq!(ok.len(), 2);
        assert!(parse_ip_list(&["dns.google".to_string()]).is_err());
    }

    #[test]
    fn error_chain_is_flattened() {
        let inner = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let outer = anyhow::Error::new(inner).context("connect example.com:80");
        let msg = describe_error(outer.as_ref());
        assert_eq!(msg, "connect example.com:80: refused");
    }
}
