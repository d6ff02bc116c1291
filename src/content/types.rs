use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Identity;

/// Closed vocabulary of content-type tags attached to associated media.
///
/// Request-side aliases (`bookxml`, `chapterxml`) are members of the enum so
/// query-string parsing stays total; the whitelist module remaps them to the
/// stored tag before any lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContentType {
    #[serde(rename = "webpdf")]
    WebPdf,
    #[serde(rename = "previewpdf")]
    PreviewPdf,
    #[serde(rename = "googlepdf")]
    GooglePdf,
    #[serde(rename = "coverimage")]
    CoverImage,
    #[serde(rename = "bannerimage")]
    BannerImage,
    #[serde(rename = "hyperlink")]
    Hyperlink,
    #[serde(rename = "database")]
    Database,
    #[serde(rename = "video")]
    Video,
    #[serde(rename = "dbitsxml")]
    DbitsXml,
    #[serde(rename = "exportcsv")]
    ExportCsv,
    #[serde(rename = "partslist")]
    PartsList,
    #[serde(rename = "bookxml")]
    BookXml,
    #[serde(rename = "chapterxml")]
    ChapterXml,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::WebPdf => "webpdf",
            ContentType::PreviewPdf => "previewpdf",
            ContentType::GooglePdf => "googlepdf",
            ContentType::CoverImage => "coverimage",
            ContentType::BannerImage => "bannerimage",
            ContentType::Hyperlink => "hyperlink",
            ContentType::Database => "database",
            ContentType::Video => "video",
            ContentType::DbitsXml => "dbitsxml",
            ContentType::ExportCsv => "exportcsv",
            ContentType::PartsList => "partslist",
            ContentType::BookXml => "bookxml",
            ContentType::ChapterXml => "chapterxml",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "webpdf" => Some(ContentType::WebPdf),
            "previewpdf" => Some(ContentType::PreviewPdf),
            "googlepdf" => Some(ContentType::GooglePdf),
            "coverimage" => Some(ContentType::CoverImage),
            "bannerimage" => Some(ContentType::BannerImage),
            "hyperlink" => Some(ContentType::Hyperlink),
            "database" => Some(ContentType::Database),
            "video" => Some(ContentType::Video),
            "dbitsxml" => Some(ContentType::DbitsXml),
            "exportcsv" => Some(ContentType::ExportCsv),
            "partslist" => Some(ContentType::PartsList),
            "bookxml" => Some(ContentType::BookXml),
            "chapterxml" => Some(ContentType::ChapterXml),
            _ => None,
        }
    }

    /// PDF-flavored types get an inline `application/pdf` header in render mode.
    pub fn is_pdf(&self) -> bool {
        matches!(
            self,
            ContentType::WebPdf | ContentType::PreviewPdf | ContentType::GooglePdf
        )
    }

    /// File extension used when constructing a download filename.
    pub fn extension(&self) -> &'static str {
        match self {
            ContentType::WebPdf | ContentType::PreviewPdf | ContentType::GooglePdf => "pdf",
            ContentType::CoverImage | ContentType::BannerImage => "jpg",
            ContentType::Video => "mp4",
            ContentType::DbitsXml | ContentType::BookXml | ContentType::ChapterXml => "xml",
            ContentType::ExportCsv | ContentType::PartsList => "csv",
            ContentType::Hyperlink | ContentType::Database => "",
        }
    }
}

/// Access tier stamped on every media item of a resolved response.
/// Exactly one tier applies per response, never a mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessTier {
    #[serde(rename = "unrestricted")]
    Unrestricted,
    #[serde(rename = "openAccess")]
    OpenAccess,
    #[serde(rename = "freeAccess")]
    FreeAccess,
    #[serde(rename = "licensed")]
    Licensed,
}

/// Originating system recorded in a media record's provenance trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ContentSource {
    #[serde(rename = "CMS")]
    Cms,
    #[serde(rename = "PMP")]
    Pmp,
}

/// One provenance entry: which system touched the record, how, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRecord {
    pub source: ContentSource,
    #[serde(rename = "type")]
    pub record_type: String,
    pub timestamp: DateTime<Utc>,
}

/// A content asset attached to a product. The location field is immutable
/// once created; provenance records are append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssociatedMedia {
    pub id: String,
    #[serde(rename = "parentId")]
    pub parent_id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    /// Resolved client-deliverable location. `None` after signing means the
    /// underlying object is missing from storage (degraded, not an error).
    pub location: Option<String>,
    pub size: Option<i64>,
    pub version: Option<String>,
    #[serde(rename = "source", default, skip_serializing_if = "Vec::is_empty")]
    pub source_records: Vec<SourceRecord>,
    #[serde(rename = "accessType", skip_serializing_if = "Option::is_none")]
    pub access_tier: Option<AccessTier>,
}

impl AssociatedMedia {
    /// Most recent provenance timestamp, used by the multi-candidate tie-break.
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.source_records.iter().map(|r| r.timestamp).max()
    }

    /// True when any provenance entry originates from the given source.
    pub fn has_source(&self, source: ContentSource) -> bool {
        self.source_records.iter().any(|r| r.source == source)
    }
}

/// Product kinds known to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductType {
    #[serde(rename = "book")]
    Book,
    #[serde(rename = "chapter")]
    Chapter,
    #[serde(rename = "scholarlyArticle")]
    ScholarlyArticle,
    #[serde(rename = "collection")]
    Collection,
    #[serde(rename = "journal")]
    Journal,
}

impl ProductType {
    /// Scholarly articles are the only versioned kind; media lookups for them
    /// are pinned to the product's current version tag.
    pub fn is_versioned(&self) -> bool {
        matches!(self, ProductType::ScholarlyArticle)
    }
}

/// Minimal product record consumed from the asset store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductAsset {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub product_type: ProductType,
}

/// Per-request value object carrying everything the resolution pipeline
/// needs about the requester and their intent. Never persisted.
#[derive(Debug, Clone, Default)]
pub struct AccessContext {
    pub token: Option<String>,
    pub identity: Identity,
    /// Requested content-type filter; empty means no filter.
    pub type_filter: Vec<ContentType>,
    /// Render (inline view) vs download intent.
    pub render: bool,
    pub client_ip: Option<String>,
    pub is_bot: bool,
    /// Client display hint for download filenames.
    pub filename_prefix: Option<String>,
    pub prefer_cdn: bool,
    /// Privileged role path: skip every access check and return unrestricted.
    pub skip_entitlement_check: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_content_type_round_trip() {
        for (s, t) in [
            ("webpdf", ContentType::WebPdf),
            ("googlepdf", ContentType::GooglePdf),
            ("bookxml", ContentType::BookXml),
        ] {
            assert_eq!(ContentType::parse(s), Some(t));
            assert_eq!(t.as_str(), s);
        }
        assert_eq!(ContentType::parse("not-a-type"), None);
        assert_eq!(ContentType::parse(" WebPDF "), Some(ContentType::WebPdf));
    }

    #[test]
    fn test_last_modified_takes_latest_provenance_entry() {
        let t1 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        let media = AssociatedMedia {
            id: "m1".into(),
            parent_id: "p1".into(),
            content_type: ContentType::WebPdf,
            location: Some("s3://bucket/key.pdf".into()),
            size: Some(1024),
            version: None,
            source_records: vec![
                SourceRecord { source: ContentSource::Pmp, record_type: "create".into(), timestamp: t1 },
                SourceRecord { source: ContentSource::Cms, record_type: "update".into(), timestamp: t2 },
            ],
            access_tier: None,
        };
        assert_eq!(media.last_modified(), Some(t2));
        assert!(media.has_source(ContentSource::Cms));
        assert!(media.has_source(ContentSource::Pmp));
    }

    #[test]
    fn test_versioned_product_types() {
        assert!(ProductType::ScholarlyArticle.is_versioned());
        assert!(!ProductType::Book.is_versioned());
        assert!(!ProductType::Collection.is_versioned());
    }
}
