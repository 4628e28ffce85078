//! The credential-rotating request dispatcher.
//!
//! One `dispatch` call walks the machine SELECTING → SENDING →
//! {SUCCESS, ROTATE, ABORT}. Rate limits and transport failures rotate to
//! the next key after putting the failed one in cooldown; every other
//! non-success outcome aborts without rotation, since it cannot be
//! attributed to quota. The number of attempts is bounded by the pool
//! size: each key is tried at most once per invocation, even if a
//! cooldown lapses mid-call.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use reqwest::StatusCode;
use tracing::{debug, warn};

use relay_core::{DispatchError, Turn};
use relay_keys::KeyPool;

use crate::attachment::Attachment;
use crate::payload::build_request;
use crate::wire::{GenerateRequest, extract_text};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Outcome of one SENDING step, switched on by the rotation loop.
enum SendOutcome {
    Success(String),
    RateLimited,
    Transport(String),
    Fatal(DispatchError),
}

pub struct Dispatcher {
    pool: Arc<KeyPool>,
    /// One client per configured proxy (or a single direct client):
    /// reqwest binds proxies at client construction, so per-attempt proxy
    /// choice means choosing among prebuilt clients.
    clients: Vec<reqwest::Client>,
    base_url: String,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("clients", &self.clients.len())
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl Dispatcher {
    pub fn new(pool: Arc<KeyPool>, proxies: &[String], base_url: impl Into<String>) -> Result<Self> {
        let clients = if proxies.is_empty() {
            vec![build_client(None)?]
        } else {
            proxies
                .iter()
                .map(|proxy| build_client(Some(proxy)))
                .collect::<Result<_>>()?
        };

        Ok(Self {
            pool,
            clients,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn pool(&self) -> &Arc<KeyPool> {
        &self.pool
    }

    /// Run one dispatch: build the payload, then rotate through the pool
    /// until a key succeeds, a non-retryable failure aborts, or every key
    /// has been tried once.
    pub async fn dispatch(
        &self,
        model: &str,
        text: &str,
        attachments: &[Attachment],
        history: &[Turn],
    ) -> Result<String, DispatchError> {
        let payload = build_request(text, attachments, history).await?;

        let bound = self.pool.len();
        let mut tried: HashSet<usize> = HashSet::with_capacity(bound);

        while tried.len() < bound {
            let lease = match self.pool.acquire_eligible(&tried) {
                Some(lease) => lease,
                None if tried.is_empty() => return Err(DispatchError::QuotaExhausted),
                None => return Err(DispatchError::AllKeysExhausted { tried: tried.len() }),
            };
            tried.insert(lease.index());

            if !self.pool.mark_used(&lease) {
                // Another dispatch took the key's last quota unit between
                // selection and use.
                continue;
            }

            let url = format!(
                "{}/v1beta/models/{}:streamGenerateContent?key={}",
                self.base_url,
                model,
                lease.secret()
            );

            match self.send(&url, &payload).await {
                SendOutcome::Success(reply) => {
                    debug!(key = lease.index(), attempt = tried.len(), "dispatch succeeded");
                    return Ok(reply);
                }
                SendOutcome::RateLimited => {
                    warn!(key = lease.index(), attempt = tried.len(), "upstream rate limit, rotating");
                    self.pool.mark_exhausted(&lease);
                }
                SendOutcome::Transport(detail) => {
                    warn!(
                        key = lease.index(),
                        attempt = tried.len(),
                        error = %detail,
                        "transport failure, rotating"
                    );
                    self.pool.mark_exhausted(&lease);
                }
                SendOutcome::Fatal(err) => return Err(err),
            }
        }

        Err(DispatchError::AllKeysExhausted { tried: tried.len() })
    }

    async fn send(&self, url: &str, payload: &GenerateRequest) -> SendOutcome {
        let client = self
            .clients
            .choose(&mut rand::thread_rng())
            .expect("dispatcher always has at least one client");

        let response = match client.post(url).json(payload).send().await {
            Ok(response) => response,
            Err(err) => return SendOutcome::Transport(err.to_string()),
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return SendOutcome::RateLimited;
        }
        if !status.is_success() {
            return SendOutcome::Fatal(DispatchError::Upstream {
                status: status.as_u16(),
            });
        }

        // Collect the streamed body whole; the records are concatenated
        // after the fact, exactly as they arrive.
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => return SendOutcome::Transport(err.to_string()),
        };

        match extract_text(&body) {
            Ok(reply) => SendOutcome::Success(reply),
            Err(err) => SendOutcome::Fatal(err),
        }
    }
}

fn build_client(proxy: Option<&str>) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .connect_timeout(CONNECT_TIMEOUT);
    if let Some(proxy) = proxy {
        builder = builder.proxy(
            reqwest::Proxy::all(proxy).with_context(|| format!("Invalid proxy URI: {proxy}"))?,
        );
    }
    builder.build().context("Failed to build HTTP client")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool_of(n: usize) -> Arc<KeyPool> {
        Arc::new(KeyPool::ordered((0..n).map(|i| format!("sk-{i}")).collect()))
    }

    #[test]
    fn test_new_direct_has_single_client() {
        let dispatcher = Dispatcher::new(pool_of(1), &[], "https://example.test/").unwrap();
        assert_eq!(dispatcher.clients.len(), 1);
        assert_eq!(dispatcher.base_url, "https://example.test");
    }

    #[test]
    fn test_new_builds_one_client_per_proxy() {
        let proxies = vec![
            "http://proxy-a.test:8080".to_string(),
            "http://proxy-b.test:8080".to_string(),
        ];
        let dispatcher = Dispatcher::new(pool_of(1), &proxies, "https://example.test").unwrap();
        assert_eq!(dispatcher.clients.len(), 2);
    }

    #[test]
    fn test_invalid_proxy_uri_is_an_error() {
        let proxies = vec!["::not a uri::".to_string()];
        let err = Dispatcher::new(pool_of(1), &proxies, "https://example.test").unwrap_err();
        assert!(err.to_string().contains("Invalid proxy URI"));
    }
}
