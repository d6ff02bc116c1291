//! Content retrieval endpoints: the thin boundary over the access
//! resolver. Query parsing, requester context extraction, and the
//! google-pdf fallback chain live here.

use axum::{
    extract::{ConnectInfo, Path, Query, State},
    http::HeaderMap,
    response::{IntoResponse, Json, Redirect},
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;

use super::AppState;
use crate::auth;
use crate::config;
use crate::content::{AccessContext, AssociatedMedia, ContentType};
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct ContentQuery {
    /// Comma-separated content-type filter; empty means all.
    #[serde(rename = "type")]
    pub type_filter: Option<String>,
    /// Parent context for free-part checks (e.g. a collection id).
    pub parent: Option<String>,
    /// Render (inline view) vs download intent; defaults to render.
    pub render: Option<bool>,
    #[serde(rename = "filenamePrefix")]
    pub filename_prefix: Option<String>,
    /// Prefer CDN-fronted delivery over direct storage URLs.
    pub cdn: Option<bool>,
}

/// GET /api/content/:product_id - entitlement-gated content resolution
pub async fn get_content(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<ContentQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let type_filter = parse_type_filter(query.type_filter.as_deref())?;

    let token = auth::bearer_token(&headers);
    let identity = auth::decode_identity(token.as_deref());
    let skip_entitlement_check = identity.has_privileged_role();

    let ctx = AccessContext {
        token,
        identity,
        type_filter,
        render: query.render.unwrap_or(true),
        client_ip: client_ip(&headers, addr),
        is_bot: is_bot(&headers),
        filename_prefix: query.filename_prefix,
        prefer_cdn: query.cdn.unwrap_or(false),
        skip_entitlement_check,
    };

    let media = state
        .resolver
        .resolve_for_entitlement(&product_id, query.parent.as_deref(), &ctx)
        .await?;

    Ok(Json(json!({ "success": true, "data": media })))
}

/// GET /api/content/external/:external_id - entitlement-gated resolution
/// addressed by an external identifier such as a DOI.
///
/// Multiple raw records can share one external id; the preferred record
/// (CMS over PMP, then latest modification) names the product resolved.
pub async fn get_content_by_external_id(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Query(query): Query<ContentQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let product_id = state
        .resolver
        .resolve_product_by_external_id(&external_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::not_found(format!("No product for identifier: {}", external_id)))?;

    get_content(
        State(state),
        Path(product_id),
        Query(query),
        ConnectInfo(addr),
        headers,
    )
    .await
}

/// GET /content/:product_id/open - anonymous open-access resolution,
/// download oriented.
///
/// A `googlepdf` request that locates nothing falls back one level to
/// `previewpdf`; if that is also empty the client is redirected to the
/// product landing page.
pub async fn get_open_content(
    State(state): State<AppState>,
    Path(product_id): Path<String>,
    Query(query): Query<ContentQuery>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<axum::response::Response, ApiError> {
    let type_filter = parse_type_filter(query.type_filter.as_deref())?;
    let wants_google_pdf = type_filter.contains(&ContentType::GooglePdf);

    let ctx = AccessContext {
        token: None,
        identity: auth::Identity::anonymous(),
        type_filter,
        render: false,
        client_ip: client_ip(&headers, addr),
        is_bot: is_bot(&headers),
        filename_prefix: query.filename_prefix,
        prefer_cdn: query.cdn.unwrap_or(false),
        skip_entitlement_check: false,
    };

    let media = state
        .resolver
        .resolve_oa_or_before_paywall(&product_id, &ctx)
        .await?;

    if has_usable_location(&media) || !wants_google_pdf {
        return Ok(Json(json!({ "success": true, "data": media })).into_response());
    }

    // One-level fallback: retry the resolution for the preview PDF
    let fallback_ctx = AccessContext {
        type_filter: vec![ContentType::PreviewPdf],
        ..ctx
    };
    let fallback = state
        .resolver
        .resolve_oa_or_before_paywall(&product_id, &fallback_ctx)
        .await?;

    if has_usable_location(&fallback) {
        return Ok(Json(json!({ "success": true, "data": fallback })).into_response());
    }

    // No deeper fallback chain: hand the client to the landing page
    let landing = format!(
        "{}/{}",
        config::config().signing.landing_page_base_url.trim_end_matches('/'),
        product_id
    );
    Ok(Redirect::temporary(&landing).into_response())
}

fn has_usable_location(media: &[AssociatedMedia]) -> bool {
    media.iter().any(|m| m.location.is_some())
}

fn parse_type_filter(raw: Option<&str>) -> Result<Vec<ContentType>, ApiError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };

    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            ContentType::parse(s)
                .ok_or_else(|| ApiError::bad_request(format!("Unknown content type: {}", s)))
        })
        .collect()
}

fn is_bot(headers: &HeaderMap) -> bool {
    headers
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|ua| {
            let ua = ua.to_ascii_lowercase();
            ["bot", "crawler", "spider", "slurp"]
                .iter()
                .any(|marker| ua.contains(marker))
        })
        .unwrap_or(false)
}

fn client_ip(headers: &HeaderMap, addr: SocketAddr) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .or_else(|| Some(addr.ip().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_parse_type_filter() {
        assert_eq!(parse_type_filter(None).unwrap(), Vec::<ContentType>::new());
        assert_eq!(
            parse_type_filter(Some("coverimage,webpdf")).unwrap(),
            vec![ContentType::CoverImage, ContentType::WebPdf]
        );
        assert_eq!(parse_type_filter(Some("")).unwrap(), Vec::<ContentType>::new());
        assert!(parse_type_filter(Some("webpdf,nonsense")).is_err());
    }

    #[test]
    fn test_bot_detection() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "user-agent",
            HeaderValue::from_static("Mozilla/5.0 (compatible; Googlebot/2.1)"),
        );
        assert!(is_bot(&headers));

        let mut headers = HeaderMap::new();
        headers.insert(
            "user-agent",
            HeaderValue::from_static("Mozilla/5.0 (Macintosh; Intel Mac OS X)"),
        );
        assert!(!is_bot(&headers));

        assert!(!is_bot(&HeaderMap::new()));
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let addr: SocketAddr = "10.0.0.1:443".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.2"),
        );
        assert_eq!(client_ip(&headers, addr), Some("203.0.113.7".to_string()));
        assert_eq!(client_ip(&HeaderMap::new(), addr), Some("10.0.0.1".to_string()));
    }
}
