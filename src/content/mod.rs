//! Content access-resolution engine: locating associated media for a
//! product, classifying the request into an access tier, and producing
//! client-deliverable locations.

pub mod locator;
pub mod resolver;
pub mod types;
pub mod whitelist;

pub use locator::{select_preferred, ContentLocator, LocatedContent, MediaStore, ProductStore};
pub use resolver::{AccessChecks, AccessResolver};
pub use types::*;

/// Errors raised by the resolution pipeline. Predicate-style "no" answers
/// are not errors; these are the structural failures that terminate a
/// request with no partial result.
#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("product not found: {0}")]
    ProductNotFound(String),

    #[error("no access tier applies")]
    Forbidden,

    #[error("content is not open access or before-paywall")]
    NotOpenAccess,

    #[error("signing primitive returned broken URL: {0}")]
    SigningFailure(String),

    #[error("store error: {0}")]
    Store(String),
}

impl From<sqlx::Error> for ContentError {
    fn from(err: sqlx::Error) -> Self {
        ContentError::Store(err.to_string())
    }
}
