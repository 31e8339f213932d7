use std::net::{IpAddr, SocketAddr};

use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use trust_dns_resolver::TokioAsyncResolver;
use trust_dns_resolver::config::{
    NameServerConfig, NameServerConfigGroup, Protocol, ResolverConfig, ResolverOpts,
};

/// Resolves names only through the configured name servers.
///
/// Lookups run inside the dial, so their time counts toward the connection
/// duration.
#[derive(Clone)]
pub struct PinnedResolver {
    resolver: TokioAsyncResolver,
}

impl PinnedResolver {
    pub fn new(name_servers: &[IpAddr]) -> Self {
        let mut group = NameServerConfigGroup::new();
        for ip in name_servers {
            group.push(NameServerConfig {
                socket_addr: SocketAddr::new(*ip, 53),
                protocol: Protocol::Udp,
                tls_dns_name: None,
                trust_negative_responses: false,
                bind_addr: None,
            });
        }

        let mut opts = ResolverOpts::default();
        opts.attempts = 2;
        // a per-probe resolver cache would hide DNS time from every probe after the first
        opts.cache_size = 0;

        let config = ResolverConfig::from_parts(None, vec![], group);
        Self {
            resolver: TokioAsyncResolver::tokio(config, opts),
        }
    }
}

impl Resolve for PinnedResolver {
    fn resolve(&self, name: Name) -> Resolving {
        let resolver = self.resolver.clone();
        Box::pin(async move {
            let lookup = resolver.lookup_ip(name.as_str()).await?;
            let addrs: Vec<SocketAddr> = lookup.iter().map(|ip| SocketAddr::new(ip, 0)).collect();
            tracing::debug!("resolved {} to {:?}", name.as_str(), addrs);
            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok(addrs)
        })
    }
}
