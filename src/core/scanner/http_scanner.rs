// src/core/scanner/http_scanner.rs

use std::time::{Duration, Instant};

use reqwest::{Client, Response};
use reqwest::header::USER_AGENT;
use tracing::{debug, info, warn};

use crate::core::models::{NO_HTTP_STATUS, NO_RESPONSE};

const BROWSER_USER_AGENT: &str = "Mozilla/5.0";
const CURL_USER_AGENT: &str = "curl/8.0";

/// Protocol order for the status probe.
const STATUS_SCHEMES: &[Scheme] = &[Scheme::Http, Scheme::Https];

/// Protocol order for the timed fetch.
const TIMED_FETCH_SCHEMES: &[Scheme] = &[Scheme::Https, Scheme::Http];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn url(self, domain: &str) -> String {
        match self {
            Scheme::Http => format!("http://{}", domain),
            Scheme::Https => format!("https://{}", domain),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Scheme::Http => "HTTP",
            Scheme::Https => "HTTPS",
        }
    }
}

/// Runs the HTTP status probe and the timed fetch over a shared client.
///
/// The client carries the connect timeout and the redirect policy; each
/// request sets its own overall bound and `User-Agent`.
#[derive(Debug, Clone)]
pub struct HttpScanner {
    client: Client,
    read_timeout: Duration,
    fetch_timeout: Duration,
}

impl HttpScanner {
    pub fn new(client: Client, read_timeout: Duration, fetch_timeout: Duration) -> Self {
        Self {
            client,
            read_timeout,
            fetch_timeout,
        }
    }

    /// Status code of the first protocol that answers at all, redirects
    /// followed. `-1` when neither protocol produced a response.
    pub async fn run_status_scan(&self, domain: &str) -> i32 {
        info!(domain, "Starting HTTP status scan.");

        for scheme in STATUS_SCHEMES {
            let url = scheme.url(domain);
            debug!(url = %url, "Sending status request.");

            let response = self
                .client
                .get(&url)
                .header(USER_AGENT, BROWSER_USER_AGENT)
                .timeout(self.read_timeout)
                .send()
                .await;

            match response {
                Ok(res) => {
                    let status = res.status().as_u16();
                    info!(url = %url, final_url = %res.url(), status, "HTTP status scan finished.");
                    return i32::from(status);
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Status request failed.");
                }
            }
        }

        warn!(domain, "No protocol answered the status request.");
        NO_HTTP_STATUS
    }

    /// `<PROTOCOL> <status> (<elapsed> ms)` for the first protocol that
    /// answers, `"No Response"` otherwise.
    pub async fn run_timed_fetch(&self, domain: &str) -> String {
        info!(domain, "Starting timed fetch.");

        for scheme in TIMED_FETCH_SCHEMES {
            let url = scheme.url(domain);
            let start = Instant::now();

            let response = self
                .client
                .get(&url)
                .header(USER_AGENT, CURL_USER_AGENT)
                .timeout(self.fetch_timeout)
                .send()
                .await;

            match response {
                Ok(mut res) => {
                    let status = res.status().as_u16();
                    // The timing covers the full transfer, so the body is drained first.
                    match drain_body(&mut res).await {
                        Ok(bytes) => debug!(url = %url, bytes, "Body drained."),
                        Err(e) => debug!(url = %url, error = %e, "Body read failed after headers arrived."),
                    }
                    let elapsed_ms = start.elapsed().as_millis();
                    let summary = format!("{} {} ({} ms)", scheme.label(), status, elapsed_ms);
                    info!(url = %url, summary = %summary, "Timed fetch finished.");
                    return summary;
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Timed fetch attempt failed.");
                }
            }
        }

        NO_RESPONSE.to_string()
    }
}

/// Reads the body chunk by chunk and drops it. Returns the byte count.
async fn drain_body(res: &mut Response) -> Result<u64, reqwest::Error> {
    let mut total = 0u64;
    while let Some(chunk) = res.chunk().await? {
        total += chunk.len() as u64;
    }
    Ok(total)
}
