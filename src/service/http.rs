//! REST implementation of [`RuleService`] over reqwest.

use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::descriptor::ListDescriptor;
use crate::error::{Result, RuleboardError};
use crate::query::QueryState;
use crate::types::{ConflictResponse, ListPage, RuleCounters, RuleDraft};

use super::RuleService;

use async_trait::async_trait;

/// HTTP client for the rule-collection service.
pub struct HttpRuleService {
    client: Client,
    base: Url,
}

impl HttpRuleService {
    pub fn new(config: &Config) -> Result<Self> {
        let base = Url::parse(&config.service_url)
            .map_err(|e| RuleboardError::Config(format!("invalid service_url: {e}")))?;

        let mut headers = HeaderMap::new();
        if let Some(auth) = &config.auth {
            let token = SecretString::from(auth.token.clone());
            let mut value =
                HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
                    .map_err(|e| RuleboardError::Config(format!("invalid auth token: {e}")))?;
            value.set_sensitive(true);
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(format!("ruleboard/{}", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()?;

        Ok(Self { client, base })
    }

    fn collection_url(&self, descriptor: &ListDescriptor, query: &QueryState) -> Result<Url> {
        let mut url = self.join(descriptor.collection())?;
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query.query_pairs() {
                pairs.append_pair(&key, &value);
            }
        }
        Ok(url)
    }

    fn stats_url(&self, descriptor: &ListDescriptor) -> Result<Url> {
        self.join(&format!("{}/stats", descriptor.collection()))
    }

    fn singular_url(&self, descriptor: &ListDescriptor, id: Option<u64>) -> Result<Url> {
        match id {
            Some(id) => self.join(&format!("{}/{}", descriptor.singular(), id)),
            None => self.join(descriptor.singular()),
        }
    }

    fn join(&self, path: &str) -> Result<Url> {
        self.base
            .join(path)
            .map_err(|e| RuleboardError::Config(format!("invalid endpoint path '{path}': {e}")))
    }
}

/// Seconds from a `Retry-After` header, if present and numeric.
fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Map a non-2xx read response; the caller keeps its current data.
async fn read_failure(response: Response) -> RuleboardError {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RuleboardError::RateLimited(retry_after_secs(&response).unwrap_or(60));
    }
    RuleboardError::TransientFetch(format!(
        "{} {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("unknown status")
    ))
}

/// Map a non-2xx write response, decoding 409 conflict payloads.
async fn write_failure(response: Response) -> RuleboardError {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RuleboardError::RateLimited(retry_after_secs(&response).unwrap_or(60));
    }

    let body = response.text().await.unwrap_or_default();

    if status == StatusCode::CONFLICT {
        match serde_json::from_str::<ConflictResponse>(&body) {
            Ok(decoded) => {
                return RuleboardError::MutationConflict {
                    conflicts: decoded.conflicts,
                };
            }
            Err(e) => {
                debug!(error = %e, "409 body did not decode as a conflict payload");
            }
        }
    }

    let detail = if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("unknown status")
            .to_string()
    } else {
        body
    };
    RuleboardError::MutationRejected(format!("{} {}", status.as_u16(), detail))
}

#[async_trait]
impl RuleService for HttpRuleService {
    async fn list(&self, descriptor: &ListDescriptor, query: &QueryState) -> Result<ListPage> {
        let url = self.collection_url(descriptor, query)?;
        debug!(%url, "listing rules");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RuleboardError::TransientFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }
        let page = response
            .json::<ListPage>()
            .await
            .map_err(|e| RuleboardError::TransientFetch(format!("bad list payload: {e}")))?;
        Ok(page)
    }

    async fn stats(&self, descriptor: &ListDescriptor) -> Result<RuleCounters> {
        let url = self.stats_url(descriptor)?;
        debug!(%url, "fetching rule counters");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RuleboardError::TransientFetch(e.to_string()))?;
        if !response.status().is_success() {
            return Err(read_failure(response).await);
        }
        let counters = response
            .json::<RuleCounters>()
            .await
            .map_err(|e| RuleboardError::TransientFetch(format!("bad stats payload: {e}")))?;
        Ok(counters)
    }

    async fn create(&self, descriptor: &ListDescriptor, draft: &RuleDraft) -> Result<()> {
        let url = self.singular_url(descriptor, None)?;
        debug!(%url, value = %draft.value, "creating rule");

        let response = self
            .client
            .post(url)
            .json(draft)
            .send()
            .await
            .map_err(|e| RuleboardError::MutationRejected(e.to_string()))?;
        if !response.status().is_success() {
            return Err(write_failure(response).await);
        }
        Ok(())
    }

    async fn update(&self, descriptor: &ListDescriptor, id: u64, draft: &RuleDraft) -> Result<()> {
        let url = self.singular_url(descriptor, Some(id))?;
        debug!(%url, value = %draft.value, "updating rule");

        let response = self
            .client
            .put(url)
            .json(draft)
            .send()
            .await
            .map_err(|e| RuleboardError::MutationRejected(e.to_string()))?;
        if !response.status().is_success() {
            return Err(write_failure(response).await);
        }
        Ok(())
    }

    async fn delete(&self, descriptor: &ListDescriptor, id: u64) -> Result<()> {
        let url = self.singular_url(descriptor, Some(id))?;
        debug!(%url, "deleting rule");

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| RuleboardError::MutationRejected(e.to_string()))?;
        if !response.status().is_success() {
            return Err(write_failure(response).await);
        }
        Ok(())
    }
}
