//! Entitlement oracle: does this identity hold a commercial license for a
//! product? Remote HTTP call with two protocol variants.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

use crate::config::{EntitlementApiVersion, EntitlementConfig};
use crate::content::AccessContext;

/// The oracle is a predicate: its error channel is fully absorbed. Callers
/// never distinguish "not entitled" from "entitlement service unreachable";
/// ambiguity fails closed.
#[async_trait]
pub trait EntitlementOracle: Send + Sync {
    async fn is_entitled(&self, product_id: &str, ctx: &AccessContext) -> bool;
}

pub struct EntitlementClient {
    http: reqwest::Client,
    config: EntitlementConfig,
}

impl EntitlementClient {
    pub fn new(config: EntitlementConfig) -> Self {
        // Bounded timeout: with the absorb-to-false contract a hang here
        // would silently stall every gated response.
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .unwrap_or_default();
        Self { http, config }
    }

    async fn query_v3(&self, product_id: &str, ctx: &AccessContext) -> Result<bool, reqwest::Error> {
        let party_id = ctx.identity.party_id.as_deref().unwrap_or_default();
        let organization_id = ctx.identity.organization_id.as_deref().unwrap_or_default();

        let response = self
            .http
            .get(format!("{}/entitlements", self.config.base_url))
            .query(&[
                ("partyId", party_id),
                ("organizationId", organization_id),
                ("productId", product_id),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            log_denied_or_error(status, product_id);
            return Ok(false);
        }

        let body: Value = response.json().await?;
        Ok(v3_grants_view(&body))
    }

    async fn query_v4(&self, product_id: &str, ctx: &AccessContext) -> Result<bool, reqwest::Error> {
        let mut request = self.http.get(format!(
            "{}/products/{}/entitlements",
            self.config.base_url, product_id
        ));
        if let Some(token) = &ctx.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            log_denied_or_error(status, product_id);
            return Ok(false);
        }

        let body: Value = response.json().await?;
        Ok(v4_grants(&body, ctx.render))
    }
}

#[async_trait]
impl EntitlementOracle for EntitlementClient {
    async fn is_entitled(&self, product_id: &str, ctx: &AccessContext) -> bool {
        let result = match self.config.api_version {
            EntitlementApiVersion::V3 => self.query_v3(product_id, ctx).await,
            EntitlementApiVersion::V4 => self.query_v4(product_id, ctx).await,
        };

        match result {
            Ok(entitled) => entitled,
            Err(e) => {
                tracing::error!(product_id, "entitlement call failed: {}", e);
                false
            }
        }
    }
}

/// Access-denied responses are an expected outcome of asking the question,
/// not a fault in the service.
fn log_denied_or_error(status: StatusCode, product_id: &str) {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        tracing::warn!(product_id, %status, "entitlement denied");
    } else {
        tracing::error!(product_id, %status, "entitlement service returned non-success");
    }
}

/// Legacy variant: a list of entitlement records, entitled when any record's
/// `grantTypes` contains `View`.
fn v3_grants_view(body: &Value) -> bool {
    body.get("entitlements")
        .and_then(Value::as_array)
        .map(|entries| {
            entries.iter().any(|entry| {
                entry
                    .get("grantTypes")
                    .and_then(Value::as_array)
                    .map(|grants| grants.iter().any(|g| g.as_str() == Some("View")))
                    .unwrap_or(false)
            })
        })
        .unwrap_or(false)
}

/// Current variant: a single per-product record whose `grantTypes` must
/// contain `view` for render intent or `download` otherwise.
fn v4_grants(body: &Value, render: bool) -> bool {
    let wanted = if render { "view" } else { "download" };
    body.get("grantTypes")
        .and_then(Value::as_array)
        .map(|grants| grants.iter().any(|g| g.as_str() == Some(wanted)))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_v3_grant_parsing() {
        let body = json!({
            "entitlements": [
                { "grantTypes": ["Archive"] },
                { "grantTypes": ["Archive", "View"] }
            ]
        });
        assert!(v3_grants_view(&body));

        let body = json!({ "entitlements": [ { "grantTypes": ["Archive"] } ] });
        assert!(!v3_grants_view(&body));

        // Legacy service is case-sensitive on the grant name
        let body = json!({ "entitlements": [ { "grantTypes": ["view"] } ] });
        assert!(!v3_grants_view(&body));

        assert!(!v3_grants_view(&json!({})));
        assert!(!v3_grants_view(&json!({ "entitlements": [] })));
    }

    #[test]
    fn test_v4_grant_parsing_by_intent() {
        let body = json!({ "grantTypes": ["view"] });
        assert!(v4_grants(&body, true));
        assert!(!v4_grants(&body, false));

        let body = json!({ "grantTypes": ["download"] });
        assert!(!v4_grants(&body, true));
        assert!(v4_grants(&body, false));

        let body = json!({ "grantTypes": ["view", "download"] });
        assert!(v4_grants(&body, true));
        assert!(v4_grants(&body, false));

        assert!(!v4_grants(&json!({}), true));
    }
}
