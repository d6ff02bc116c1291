//! Static classification tables for content types: which skip signing,
//! which are visible before the paywall, and request-side aliasing.

use super::types::ContentType;

/// Content hosted at a stable public location (hyperlinks, cover and banner
/// images, database records). The stored location is returned verbatim and
/// must never be run through the storage signer.
pub fn is_signature_exempt(content_type: ContentType) -> bool {
    matches!(
        content_type,
        ContentType::Hyperlink
            | ContentType::CoverImage
            | ContentType::BannerImage
            | ContentType::Database
    )
}

/// Content servable to every requester, entitled or not. Superset of the
/// signature-exempt types plus the preview/discovery formats.
pub fn is_whitelisted_before_paywall(content_type: ContentType) -> bool {
    is_signature_exempt(content_type)
        || matches!(
            content_type,
            ContentType::PreviewPdf
                | ContentType::GooglePdf
                | ContentType::ExportCsv
                | ContentType::PartsList
        )
}

/// Map a client-facing type name to the internally stored tag. The XML
/// aliases collapse onto `dbitsxml`; everything else maps to itself.
pub fn remap_type(requested: ContentType) -> ContentType {
    match requested {
        ContentType::BookXml | ContentType::ChapterXml => ContentType::DbitsXml,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_exempt_set() {
        assert!(is_signature_exempt(ContentType::CoverImage));
        assert!(is_signature_exempt(ContentType::Hyperlink));
        assert!(is_signature_exempt(ContentType::Database));
        assert!(!is_signature_exempt(ContentType::WebPdf));
        assert!(!is_signature_exempt(ContentType::PreviewPdf));
    }

    #[test]
    fn test_before_paywall_is_superset_of_exempt() {
        for ct in [
            ContentType::Hyperlink,
            ContentType::CoverImage,
            ContentType::BannerImage,
            ContentType::Database,
        ] {
            assert!(is_whitelisted_before_paywall(ct));
        }
        assert!(is_whitelisted_before_paywall(ContentType::PreviewPdf));
        assert!(is_whitelisted_before_paywall(ContentType::GooglePdf));
        assert!(is_whitelisted_before_paywall(ContentType::ExportCsv));
        assert!(is_whitelisted_before_paywall(ContentType::PartsList));
        assert!(!is_whitelisted_before_paywall(ContentType::WebPdf));
        assert!(!is_whitelisted_before_paywall(ContentType::Video));
        assert!(!is_whitelisted_before_paywall(ContentType::DbitsXml));
    }

    #[test]
    fn test_remap_aliases_to_dbitsxml() {
        assert_eq!(remap_type(ContentType::BookXml), ContentType::DbitsXml);
        assert_eq!(remap_type(ContentType::ChapterXml), ContentType::DbitsXml);
        // Identity mapping for everything else
        assert_eq!(remap_type(ContentType::WebPdf), ContentType::WebPdf);
        assert_eq!(remap_type(ContentType::DbitsXml), ContentType::DbitsXml);
    }
}
