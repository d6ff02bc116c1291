//! Open-access and free-access predicates backed by the permissions and
//! part-availability tables.

use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::content::{ContentError, ProductType};

/// Per-product and per-part access predicates. A `false` answer is a valid,
/// silent outcome; only store failures surface as errors.
#[async_trait]
pub trait AccessPolicyStore: Send + Sync {
    /// True iff the product's permission list contains an `open-access` entry.
    async fn is_open_access(
        &self,
        product_type: ProductType,
        product_id: &str,
    ) -> Result<bool, ContentError>;

    /// True iff the specific part has been marked free in the context of
    /// the named parent (e.g. a collection).
    async fn is_accessible_for_free(
        &self,
        parent_id: &str,
        part_id: &str,
    ) -> Result<bool, ContentError>;
}

pub struct PgAccessPolicyStore {
    pool: PgPool,
}

impl PgAccessPolicyStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccessPolicyStore for PgAccessPolicyStore {
    async fn is_open_access(
        &self,
        _product_type: ProductType,
        product_id: &str,
    ) -> Result<bool, ContentError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM product_permissions \
             WHERE product_id = $1 AND permission_name = 'open-access'",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }

    async fn is_accessible_for_free(
        &self,
        parent_id: &str,
        part_id: &str,
    ) -> Result<bool, ContentError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM part_availability \
             WHERE parent_id = $1 AND part_id = $2 AND is_free = TRUE",
        )
        .bind(parent_id)
        .bind(part_id)
        .fetch_one(&self.pool)
        .await?;

        let count: i64 = row.try_get("n")?;
        Ok(count > 0)
    }
}
