//! RxNav REST client
//!
//! Resolves drug names through the NLM RxNav service:
//!
//! 1. `GET {base}/rxcui.json?name=`: exact RxNorm name match
//! 2. `GET {base}/approximateTerm.json?term=&maxEntries=1`: closest term
//! 3. `GET {base}/rxcui/{id}/properties.json`: canonical display name

use crate::app::config::LookupConfig;
use crate::normalize::http_retry::{send_with_retry, RetryPolicy};
use crate::normalize::lookup::{DrugLookup, LookupFuture, LookupOutcome};
use crate::normalize::types::MatchKind;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://rxnav.nlm.nih.gov/REST";
const USER_AGENT: &str = concat!("rx-verify/", env!("CARGO_PKG_VERSION"));

/// HTTP client for the RxNav service
#[derive(Debug, Clone)]
pub struct RxNavClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl RxNavClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, retry: RetryPolicy) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| crate::Error::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            retry,
        })
    }

    pub fn from_config(config: &LookupConfig) -> crate::Result<Self> {
        Self::new(
            config.base_url.clone(),
            Duration::from_millis(config.timeout_ms),
            RetryPolicy::new(config.max_retries, Duration::from_millis(config.retry_backoff_ms)),
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)], context: &str) -> crate::Result<Value> {
        let url = format!("{}/{}", self.base_url, path);
        let response = send_with_retry(&self.client, |c| c.get(&url).query(query), self.retry, context).await?;
        response
            .json::<Value>()
            .await
            .map_err(|e| crate::Error::LookupUnavailable(format!("{}: malformed response: {}", context, e)))
    }

    /// Exact RxNorm name match
    pub async fn find_exact(&self, name: &str) -> crate::Result<Option<String>> {
        let body = self.get_json("rxcui.json", &[("name", name)], "rxnav exact").await?;
        Ok(parse_rxcui_response(&body))
    }

    /// Closest approximate term
    pub async fn find_approximate(&self, name: &str) -> crate::Result<Option<String>> {
        let body = self
            .get_json("approximateTerm.json", &[("term", name), ("maxEntries", "1")], "rxnav approximate")
            .await?;
        Ok(parse_approximate_response(&body))
    }

    /// Canonical name of a concept
    pub async fn concept_name(&self, rxcui: &str) -> crate::Result<Option<String>> {
        let path = format!("rxcui/{}/properties.json", rxcui);
        let body = self.get_json(&path, &[], "rxnav properties").await?;
        Ok(parse_properties_name(&body))
    }

    async fn resolve(&self, name: &str) -> crate::Result<LookupOutcome> {
        let query = name.trim().to_lowercase();

        let (rxcui, matched) = match self.find_exact(&query).await? {
            Some(id) => (id, MatchKind::Exact),
            None => match self.find_approximate(&query).await? {
                Some(id) => (id, MatchKind::Approximate),
                None => {
                    debug!(name, "RxNav has no concept for name");
                    return Ok(LookupOutcome::NotFound);
                }
            },
        };

        // The identifier is already known; a failed name fetch only costs the display name
        let display = match self.concept_name(&rxcui).await {
            Ok(Some(n)) => n,
            Ok(None) => name.trim().to_string(),
            Err(e) => {
                warn!(rxcui = %rxcui, error = %e, "RxNav properties lookup failed, using query text");
                name.trim().to_string()
            }
        };

        Ok(LookupOutcome::Found {
            rxcui,
            name: display,
            matched,
        })
    }
}

impl DrugLookup for RxNavClient {
    fn lookup<'a>(&'a self, name: &'a str) -> LookupFuture<'a> {
        Box::pin(self.resolve(name))
    }

    fn service_name(&self) -> &str {
        "rxnav"
    }
}

/// `{"idGroup": {"rxnormId": ["1191"]}}`
pub fn parse_rxcui_response(body: &Value) -> Option<String> {
    body.get("idGroup")?
        .get("rxnormId")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|id| !id.is_empty())
        .map(str::to_string)
}

/// `{"approximateGroup": {"candidate": [{"rxcui": "1191", ...}]}}`; the
/// candidate may also be a single object.
pub fn parse_approximate_response(body: &Value) -> Option<String> {
    let candidates = body.get("approximateGroup")?.get("candidate")?;
    let first = match candidates {
        Value::Array(items) => items.first()?,
        Value::Object(_) => candidates,
        _ => return None,
    };
    first
        .get("rxcui")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// `{"properties": {"rxcui": "1191", "name": "aspirin", ...}}`
pub fn parse_properties_name(body: &Value) -> Option<String> {
    body.get("properties")?
        .get("name")?
        .as_str()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
}
