// src/core/scanner/reachability_scanner.rs

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// Ports knocked on, in order, once the host has resolved.
const PROBE_PORTS: &[u16] = &[80, 443];

/// Host-level liveness check.
///
/// Resolves the name and tries a TCP handshake on each address. A host that
/// completes the handshake or actively refuses it is alive; silence, DNS
/// failure or running out of time means it is not.
#[derive(Clone)]
pub struct ReachabilityScanner {
    resolver: TokioAsyncResolver,
    timeout: Duration,
}

impl ReachabilityScanner {
    pub fn new(timeout: Duration) -> Self {
        let resolver = TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default());
        Self { resolver, timeout }
    }

    /// Returns `true` only if the host answered before the timeout.
    pub async fn run_reachability_scan(&self, domain: &str) -> bool {
        info!(domain, "Starting reachability scan.");

        match timeout(self.timeout, self.probe(domain)).await {
            Ok(reachable) => {
                info!(domain, reachable, "Reachability scan finished.");
                reachable
            }
            Err(_) => {
                warn!(domain, timeout_ms = %self.timeout.as_millis(), "Reachability scan timed out.");
                false
            }
        }
    }

    async fn probe(&self, domain: &str) -> bool {
        let addresses = match self.resolve(domain).await {
            Ok(addrs) if !addrs.is_empty() => addrs,
            Ok(_) => {
                warn!(domain, "Name resolved to no addresses.");
                return false;
            }
            Err(e) => {
                warn!(domain, error = %e, "Name resolution failed.");
                return false;
            }
        };

        for ip in addresses {
            for port in PROBE_PORTS {
                let addr = SocketAddr::new(ip, *port);
                debug!(%addr, "Attempting TCP handshake.");
                match TcpStream::connect(addr).await {
                    Ok(_) => {
                        debug!(%addr, "Handshake completed.");
                        return true;
                    }
                    Err(e) if e.kind() == ErrorKind::ConnectionRefused => {
                        debug!(%addr, "Connection refused, host is up.");
                        return true;
                    }
                    Err(e) => {
                        debug!(%addr, error = %e, "Handshake failed.");
                    }
                }
            }
        }
        false
    }

    async fn resolve(&self, domain: &str) -> Result<Vec<IpAddr>, String> {
        if let Ok(ip) = domain.parse::<IpAddr>() {
            return Ok(vec![ip]);
        }
        self.resolver
            .lookup_ip(domain)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| format!("DNS Error: {}", e))
    }
}
