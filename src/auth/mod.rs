use axum::http::HeaderMap;
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config;

/// Claims carried in a platform bearer token. The `user` claim is optional:
/// tokens without one identify an anonymous session, not a malformed token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub user: Option<UserClaim>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserClaim {
    #[serde(rename = "partyId")]
    pub party_id: String,
    #[serde(rename = "organizationId")]
    pub organization_id: String,
}

/// Requester identity as seen by the access-resolution engine.
#[derive(Debug, Clone, Default)]
pub struct Identity {
    pub party_id: Option<String>,
    pub organization_id: Option<String>,
    pub roles: Vec<String>,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// True when any of the token's roles is configured as privileged,
    /// which bypasses the entitlement gate entirely.
    pub fn has_privileged_role(&self) -> bool {
        let privileged = &config::config().security.privileged_roles;
        self.roles.iter().any(|r| privileged.contains(r))
    }
}

/// Extract the bearer token from request headers, if any.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let auth_str = headers
        .get("authorization")
        .or_else(|| headers.get("Authorization"))?
        .to_str()
        .ok()?;

    let token = auth_str.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

/// Decode a bearer token into a requester identity.
///
/// Absence of a token, an undecodable token, or a token without a `user`
/// claim all resolve to the anonymous identity. The entitlement gate fails
/// closed on anonymous requesters, so there is nothing to reject here.
pub fn decode_identity(token: Option<&str>) -> Identity {
    let Some(token) = token else {
        return Identity::anonymous();
    };

    let secret = &config::config().security.jwt_secret;
    if secret.is_empty() {
        tracing::warn!("JWT secret not configured, treating requester as anonymous");
        return Identity::anonymous();
    }

    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::default();

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => {
            let claims = data.claims;
            match claims.user {
                Some(user) => Identity {
                    party_id: Some(user.party_id),
                    organization_id: Some(user.organization_id),
                    roles: claims.roles,
                },
                None => Identity {
                    party_id: None,
                    organization_id: None,
                    roles: claims.roles,
                },
            }
        }
        Err(e) => {
            tracing::warn!("Failed to decode bearer token: {}", e);
            Identity::anonymous()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_extraction() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc123"));
        assert_eq!(bearer_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn test_missing_and_empty_tokens() {
        let headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);

        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Basic dXNlcg=="));
        assert_eq!(bearer_token(&headers), None);
    }

    #[test]
    fn test_undecodable_token_is_anonymous() {
        let identity = decode_identity(Some("not-a-jwt"));
        assert!(identity.party_id.is_none());
        assert!(identity.organization_id.is_none());
        assert!(identity.roles.is_empty());
    }

    #[test]
    fn test_no_token_is_anonymous() {
        let identity = decode_identity(None);
        assert!(identity.party_id.is_none());
    }
}
