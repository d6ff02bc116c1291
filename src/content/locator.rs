//! Resolves the full, version-correct set of media records for a request.

use async_trait::async_trait;
use std::sync::Arc;

use super::types::{AssociatedMedia, ContentSource, ContentType, ProductAsset, ProductType};
use super::whitelist::remap_type;
use super::ContentError;

/// Product/asset store as seen by the locator.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn get_asset_by_id(&self, id: &str) -> Result<Option<ProductAsset>, ContentError>;

    /// Current version tag for versioned product types; `None` for products
    /// that have never been versioned.
    async fn get_current_version(
        &self,
        product_id: &str,
        product_type: ProductType,
    ) -> Result<Option<String>, ContentError>;
}

/// Associated-media store as seen by the locator.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// All media records for a parent product, optionally pinned to a version.
    async fn get_media_by_parent_id(
        &self,
        parent_id: &str,
        version: Option<&str>,
    ) -> Result<Vec<AssociatedMedia>, ContentError>;

    /// Raw candidate records for an external identifier (e.g. a DOI shared
    /// by multiple chapter records). The locator tie-breaks among these.
    async fn get_media_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Vec<AssociatedMedia>, ContentError>;
}

/// Locator output: the product record plus its located media set.
#[derive(Debug, Clone)]
pub struct LocatedContent {
    pub product: ProductAsset,
    pub media: Vec<AssociatedMedia>,
}

pub struct ContentLocator {
    products: Arc<dyn ProductStore>,
    media: Arc<dyn MediaStore>,
}

impl ContentLocator {
    pub fn new(products: Arc<dyn ProductStore>, media: Arc<dyn MediaStore>) -> Self {
        Self { products, media }
    }

    /// Locate the media records for a product, applying the requested
    /// content-type filter after alias remapping.
    ///
    /// A filter that matches nothing yields an empty success result;
    /// only a missing product is an error.
    pub async fn locate(
        &self,
        product_id: &str,
        type_filter: &[ContentType],
    ) -> Result<LocatedContent, ContentError> {
        let stored_types: Vec<ContentType> = type_filter.iter().copied().map(remap_type).collect();

        let product = self
            .products
            .get_asset_by_id(product_id)
            .await?
            .ok_or_else(|| ContentError::ProductNotFound(product_id.to_string()))?;

        // Versioned product kinds pin the media lookup to the current version
        let version = if product.product_type.is_versioned() {
            self.products
                .get_current_version(product_id, product.product_type)
                .await?
        } else {
            None
        };

        let mut media = self
            .media
            .get_media_by_parent_id(product_id, version.as_deref())
            .await?;

        if !stored_types.is_empty() {
            media.retain(|m| stored_types.contains(&m.content_type));
        }

        tracing::debug!(
            product_id,
            located = media.len(),
            "located associated media"
        );

        Ok(LocatedContent { product, media })
    }

    /// Resolve an external identifier (e.g. a DOI) to the parent product of
    /// its preferred raw record, applying the multi-candidate tie-break.
    pub async fn resolve_parent_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<String>, ContentError> {
        let candidates = self.media.get_media_by_external_id(external_id).await?;
        Ok(select_preferred(candidates).map(|m| m.parent_id))
    }
}

/// Pick the effective record among multiple raw candidates sharing one
/// logical identity (e.g. chapter records sharing a DOI).
///
/// A record carrying CMS provenance beats any PMP-only record
/// unconditionally; among records from the same source the most recently
/// modified one wins.
pub fn select_preferred(candidates: Vec<AssociatedMedia>) -> Option<AssociatedMedia> {
    let any_cms = candidates.iter().any(|m| m.has_source(ContentSource::Cms));

    candidates
        .into_iter()
        .filter(|m| !any_cms || m.has_source(ContentSource::Cms))
        .max_by_key(|m| m.last_modified())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::types::SourceRecord;
    use chrono::{DateTime, TimeZone, Utc};

    fn media(id: &str, entries: Vec<(ContentSource, DateTime<Utc>)>) -> AssociatedMedia {
        AssociatedMedia {
            id: id.to_string(),
            parent_id: "p1".to_string(),
            content_type: ContentType::WebPdf,
            location: Some(format!("s3://bucket/{}.pdf", id)),
            size: Some(100),
            version: None,
            source_records: entries
                .into_iter()
                .map(|(source, timestamp)| SourceRecord {
                    source,
                    record_type: "update".to_string(),
                    timestamp,
                })
                .collect(),
            access_tier: None,
        }
    }

    fn ts(month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, month, day, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_cms_beats_pmp_unconditionally() {
        // The PMP record is newer, but CMS still wins
        let picked = select_preferred(vec![
            media("pmp-new", vec![(ContentSource::Pmp, ts(6, 1))]),
            media("cms-old", vec![(ContentSource::Cms, ts(1, 1))]),
        ])
        .unwrap();
        assert_eq!(picked.id, "cms-old");
    }

    #[test]
    fn test_same_source_latest_modification_wins() {
        let picked = select_preferred(vec![
            media("older", vec![(ContentSource::Cms, ts(1, 1))]),
            media("newer", vec![(ContentSource::Cms, ts(3, 1))]),
            media("middle", vec![(ContentSource::Cms, ts(2, 1))]),
        ])
        .unwrap();
        assert_eq!(picked.id, "newer");

        let picked = select_preferred(vec![
            media("pmp-older", vec![(ContentSource::Pmp, ts(1, 1))]),
            media("pmp-newer", vec![(ContentSource::Pmp, ts(4, 1))]),
        ])
        .unwrap();
        assert_eq!(picked.id, "pmp-newer");
    }

    #[test]
    fn test_mixed_provenance_counts_as_cms() {
        let picked = select_preferred(vec![
            media("pmp-only", vec![(ContentSource::Pmp, ts(6, 1))]),
            media(
                "both",
                vec![(ContentSource::Pmp, ts(1, 1)), (ContentSource::Cms, ts(2, 1))],
            ),
        ])
        .unwrap();
        assert_eq!(picked.id, "both");
    }

    #[test]
    fn test_empty_candidates() {
        assert!(select_preferred(vec![]).is_none());
    }

    #[test]
    fn test_record_without_provenance_loses_to_dated_record() {
        let picked = select_preferred(vec![
            media("undated", vec![]),
            media("dated", vec![(ContentSource::Pmp, ts(1, 1))]),
        ])
        .unwrap();
        assert_eq!(picked.id, "dated");
    }
}
