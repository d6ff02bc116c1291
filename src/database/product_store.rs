use async_trait::async_trait;
use sqlx::{PgPool, Row};

use crate::content::{ContentError, ProductAsset, ProductStore, ProductType};

pub struct PgProductStore {
    pool: PgPool,
}

impl PgProductStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn get_asset_by_id(&self, id: &str) -> Result<Option<ProductAsset>, ContentError> {
        let row = sqlx::query("SELECT id, product_type FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let id: String = row.try_get("id")?;
        let raw_type: String = row.try_get("product_type")?;
        let product_type: ProductType = serde_json::from_value(serde_json::Value::String(raw_type.clone()))
            .map_err(|_| ContentError::Store(format!("unknown product type: {}", raw_type)))?;

        Ok(Some(ProductAsset { id, product_type }))
    }

    async fn get_current_version(
        &self,
        product_id: &str,
        _product_type: ProductType,
    ) -> Result<Option<String>, ContentError> {
        let row = sqlx::query("SELECT current_version FROM products WHERE id = $1")
            .bind(product_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(row.try_get("current_version")?),
            None => Ok(None),
        }
    }
}
