//! Object storage and URL signing: turning a permitted media record into a
//! client-deliverable location.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::time::Duration;

use crate::config::SigningConfig;
use crate::content::{AccessContext, AssociatedMedia, ContentType};
use crate::content::whitelist::is_signature_exempt;

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    /// The signing primitive produced an unparameterized bucket-root URL.
    /// Hard failure for the whole request, not a per-item degradation.
    #[error("signing primitive returned broken URL: {0}")]
    BrokenSentinel(String),

    #[error("storage transport error: {0}")]
    Transport(String),
}

/// Parameters for one signing operation.
#[derive(Debug, Clone)]
pub struct SignRequest<'a> {
    pub key: &'a str,
    pub expires_in: Duration,
    pub render: bool,
    pub is_bot: bool,
    pub content_type: ContentType,
    /// Suggested filename for attachment disposition, absent in render mode.
    pub filename: Option<String>,
}

/// Object storage primitives: existence check and URL signing, with a
/// separate CDN-scoped variant.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, key: &str) -> Result<bool, SignerError>;
    async fn presign_get(&self, req: &SignRequest<'_>) -> Result<String, SignerError>;
    async fn presign_cdn(&self, req: &SignRequest<'_>) -> Result<String, SignerError>;
}

/// Turns one permitted media record into a deliverable location.
#[async_trait]
pub trait ContentSigner: Send + Sync {
    async fn sign(
        &self,
        media: AssociatedMedia,
        ctx: &AccessContext,
    ) -> Result<AssociatedMedia, SignerError>;
}

pub struct UrlSigner {
    store: std::sync::Arc<dyn ObjectStore>,
    config: SigningConfig,
}

impl UrlSigner {
    pub fn new(store: std::sync::Arc<dyn ObjectStore>, config: SigningConfig) -> Self {
        Self { store, config }
    }

    /// Expiry class for a signed URL: bots get days, video gets an hour,
    /// everything else the short default.
    fn expiry_for(&self, content_type: ContentType, is_bot: bool) -> Duration {
        let secs = if is_bot {
            self.config.bot_expiry_secs
        } else if content_type == ContentType::Video {
            self.config.video_expiry_secs
        } else {
            self.config.default_expiry_secs
        };
        Duration::from_secs(secs)
    }

    /// Storage key derived from the stored location URI.
    fn object_key<'a>(&self, location: &'a str) -> &'a str {
        let key = location
            .strip_prefix("s3://")
            .map(|rest| rest.split_once('/').map(|(_, k)| k).unwrap_or(rest))
            .unwrap_or(location);
        key.trim_start_matches('/')
    }
}

#[async_trait]
impl ContentSigner for UrlSigner {
    async fn sign(
        &self,
        mut media: AssociatedMedia,
        ctx: &AccessContext,
    ) -> Result<AssociatedMedia, SignerError> {
        // Public locations pass through untouched, no existence check
        if is_signature_exempt(media.content_type) {
            return Ok(media);
        }

        let Some(location) = media.location.clone() else {
            return Ok(media);
        };
        let key = self.object_key(&location).to_string();

        // Missing object degrades this item, never the batch
        match self.store.exists(&key).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(media_id = %media.id, %key, "object missing from storage");
                media.location = None;
                return Ok(media);
            }
            Err(e) => {
                tracing::warn!(media_id = %media.id, %key, "existence check failed: {}", e);
                media.location = None;
                return Ok(media);
            }
        }

        let filename = if ctx.render {
            None
        } else {
            let prefix = ctx.filename_prefix.as_deref().unwrap_or_default();
            let extension = media.content_type.extension();
            Some(if extension.is_empty() {
                format!("{}{}", prefix, media.content_type.as_str())
            } else {
                format!("{}{}.{}", prefix, media.content_type.as_str(), extension)
            })
        };

        let request = SignRequest {
            key: &key,
            expires_in: self.expiry_for(media.content_type, ctx.is_bot),
            render: ctx.render,
            is_bot: ctx.is_bot,
            content_type: media.content_type,
            filename,
        };

        let url = if ctx.prefer_cdn {
            self.store.presign_cdn(&request).await?
        } else {
            self.store.presign_get(&request).await?
        };

        if is_broken_sentinel(&url) {
            return Err(SignerError::BrokenSentinel(url));
        }

        media.location = Some(url);
        Ok(media)
    }
}

/// The known failure mode of the signing primitive is an unparameterized
/// bucket-root URL: no object path, no query parameters.
pub fn is_broken_sentinel(url: &str) -> bool {
    match url::Url::parse(url) {
        Ok(parsed) => {
            let bare_path = parsed.path() == "/" || parsed.path().is_empty();
            parsed.query().is_none() && bare_path
        }
        // Unparseable output from the signer is equally unusable
        Err(_) => true,
    }
}

/// HTTP-backed object store: HEAD for existence, HMAC-style token query
/// parameters for signed GET URLs.
pub struct HttpObjectStore {
    http: reqwest::Client,
    config: SigningConfig,
}

impl HttpObjectStore {
    pub fn new(config: SigningConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn token(&self, path: &str, expires_at: i64) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.config.signing_secret.as_bytes());
        hasher.update(path.as_bytes());
        hasher.update(expires_at.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }

    fn signed_url(&self, base: &str, req: &SignRequest<'_>) -> String {
        let expires_at = chrono::Utc::now().timestamp() + req.expires_in.as_secs() as i64;
        let path = format!("/{}/{}", self.config.bucket, req.key);
        let token = self.token(&path, expires_at);

        let mut url = format!(
            "{}{}?expires={}&token={}",
            base.trim_end_matches('/'),
            path,
            expires_at,
            token
        );

        if req.render {
            if req.content_type.is_pdf() {
                url.push_str("&response-content-type=application%2Fpdf");
            }
            url.push_str("&response-content-disposition=inline");
        } else if let Some(filename) = &req.filename {
            url.push_str(&format!(
                "&response-content-disposition=attachment%3B%20filename%3D{}",
                filename
            ));
        }
        url
    }
}

#[async_trait]
impl ObjectStore for HttpObjectStore {
    async fn exists(&self, key: &str) -> Result<bool, SignerError> {
        let url = format!(
            "{}/{}/{}",
            self.config.storage_endpoint.trim_end_matches('/'),
            self.config.bucket,
            key
        );
        let response = self
            .http
            .head(&url)
            .send()
            .await
            .map_err(|e| SignerError::Transport(e.to_string()))?;
        Ok(response.status().is_success())
    }

    async fn presign_get(&self, req: &SignRequest<'_>) -> Result<String, SignerError> {
        Ok(self.signed_url(&self.config.storage_endpoint, req))
    }

    async fn presign_cdn(&self, req: &SignRequest<'_>) -> Result<String, SignerError> {
        // CDN tokens are scoped to the object path plus the delivery intent
        let expires_at = chrono::Utc::now().timestamp() + req.expires_in.as_secs() as i64;
        let path = format!("/{}/{}", self.config.bucket, req.key);
        let token = self.token(&path, expires_at);
        Ok(format!(
            "{}{}?expires={}&token={}&ct={}&bot={}&render={}",
            self.config.cdn_base_url.trim_end_matches('/'),
            path,
            expires_at,
            token,
            req.content_type.as_str(),
            req.is_bot,
            req.render
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_broken_sentinel_detection() {
        assert!(is_broken_sentinel("https://bucket.storage.example.com/"));
        assert!(is_broken_sentinel("https://bucket.storage.example.com"));
        assert!(is_broken_sentinel("not a url"));
        assert!(!is_broken_sentinel(
            "https://storage.example.com/bucket/key.pdf?expires=123&token=abc"
        ));
        // A bare path with query parameters is odd but usable
        assert!(!is_broken_sentinel("https://storage.example.com/?token=abc"));
    }

    #[test]
    fn test_object_key_extraction() {
        let signer = UrlSigner::new(
            std::sync::Arc::new(HttpObjectStore::new(test_config())),
            test_config(),
        );
        assert_eq!(signer.object_key("s3://bucket/books/x/web.pdf"), "books/x/web.pdf");
        assert_eq!(signer.object_key("/books/x/web.pdf"), "books/x/web.pdf");
        assert_eq!(signer.object_key("books/x/web.pdf"), "books/x/web.pdf");
    }

    #[test]
    fn test_signed_url_shape() {
        let store = HttpObjectStore::new(test_config());
        let req = SignRequest {
            key: "books/x/web.pdf",
            expires_in: Duration::from_secs(900),
            render: true,
            is_bot: false,
            content_type: ContentType::WebPdf,
            filename: None,
        };
        let url = store.signed_url("https://storage.example.com", &req);
        assert!(url.starts_with("https://storage.example.com/folio-content-test/books/x/web.pdf?"));
        assert!(url.contains("expires="));
        assert!(url.contains("token="));
        assert!(url.contains("response-content-type=application%2Fpdf"));
        assert!(url.contains("response-content-disposition=inline"));
        assert!(!is_broken_sentinel(&url));
    }

    #[test]
    fn test_download_url_carries_attachment_filename() {
        let store = HttpObjectStore::new(test_config());
        let req = SignRequest {
            key: "books/x/web.pdf",
            expires_in: Duration::from_secs(900),
            render: false,
            is_bot: false,
            content_type: ContentType::WebPdf,
            filename: Some("mybook-webpdf.pdf".to_string()),
        };
        let url = store.signed_url("https://storage.example.com", &req);
        assert!(url.contains("attachment"));
        assert!(url.contains("mybook-webpdf.pdf"));
        assert!(!url.contains("response-content-type=application%2Fpdf"));
    }

    fn test_config() -> SigningConfig {
        SigningConfig {
            storage_endpoint: "https://storage.example.com".to_string(),
            bucket: "folio-content-test".to_string(),
            cdn_base_url: "https://cdn.example.com".to_string(),
            signing_secret: "test-secret".to_string(),
            default_expiry_secs: 900,
            video_expiry_secs: 3600,
            bot_expiry_secs: 259200,
            landing_page_base_url: "https://www.example.com/content".to_string(),
        }
    }
}
