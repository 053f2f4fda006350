use crate::{
    db::DbPool,
    entities::{
        daily_record::{self, Entity as DailyRecord},
        product::{self, Entity as Product},
    },
    errors::ServiceError,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};
use tracing::{debug, error, instrument};
use utoipa::ToSchema;

/// Product summary as listed by the API
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    #[schema(example = "0000001")]
    pub id: String,
    #[schema(example = "CHERRY 1PACK")]
    pub name: String,
    #[schema(example = 117)]
    pub opening_inventory: i64,
}

impl From<product::Model> for ProductSummary {
    fn from(model: product::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            opening_inventory: model.opening_inventory,
        }
    }
}

/// One day of a product's history with derived amounts
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DaySnapshot {
    pub day: i32,
    /// Closing inventory
    pub inventory: i64,
    /// Procurement quantity times unit price
    pub procurement: f64,
    /// Sales quantity times unit price
    pub sales: f64,
}

impl From<&daily_record::Model> for DaySnapshot {
    fn from(record: &daily_record::Model) -> Self {
        Self {
            day: record.day,
            inventory: record.inventory,
            procurement: record.procurement_amount(),
            sales: record.sales_amount(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    pub id: String,
    pub name: String,
    pub opening_inventory: i64,
    pub days: Vec<DaySnapshot>,
}

/// Entry of a comparison result
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductComparison {
    pub id: String,
    pub name: String,
    pub days: Vec<DaySnapshot>,
}

/// Read-side queries over products and their daily records
pub struct ProductService {
    db_pool: Arc<DbPool>,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    /// Lists every product ordered by id
    #[instrument(skip(self))]
    pub async fn list_products(&self) -> Result<Vec<ProductSummary>, ServiceError> {
        let products = Product::find()
            .order_by_asc(product::Column::Id)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to list products");
                ServiceError::DatabaseError(e)
            })?;

        Ok(products.into_iter().map(ProductSummary::from).collect())
    }

    /// Fetches a product with its full day sequence
    #[instrument(skip(self))]
    pub async fn get_product_detail(&self, id: &str) -> Result<ProductDetail, ServiceError> {
        let product = Product::find_by_id(id.to_string())
            .one(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(product_id = %id, error = %e, "Database error when fetching product");
                ServiceError::DatabaseError(e)
            })?
            .ok_or_else(|| ServiceError::NotFound("Product not found".to_string()))?;

        let days = self.load_days(&[product.id.clone()]).await?;
        let days = days.get(&product.id).cloned().unwrap_or_default();

        Ok(ProductDetail {
            id: product.id,
            name: product.name,
            opening_inventory: product.opening_inventory,
            days,
        })
    }

    /// Returns day sequences for the requested ids in request order.
    /// Unknown ids are skipped and repeated ids appear once.
    #[instrument(skip(self))]
    pub async fn compare_products(
        &self,
        ids: &[String],
    ) -> Result<Vec<ProductComparison>, ServiceError> {
        let mut seen = HashSet::with_capacity(ids.len());
        let requested: Vec<String> = ids
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();

        let mut products: HashMap<String, product::Model> = Product::find()
            .filter(product::Column::Id.is_in(requested.iter().cloned()))
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load products for comparison");
                ServiceError::DatabaseError(e)
            })?
            .into_iter()
            .map(|model| (model.id.clone(), model))
            .collect();

        let found: Vec<String> = requested
            .iter()
            .filter(|id| products.contains_key(*id))
            .cloned()
            .collect();
        if found.len() < requested.len() {
            debug!(
                skipped = requested.len() - found.len(),
                "Comparison skipped unknown product ids"
            );
        }

        let mut days = self.load_days(&found).await?;
        Ok(found
            .into_iter()
            .filter_map(|id| {
                let model = products.remove(&id)?;
                Some(ProductComparison {
                    days: days.remove(&id).unwrap_or_default(),
                    id: model.id,
                    name: model.name,
                })
            })
            .collect())
    }

    /// Loads daily records for `ids`, grouped by product and ordered by day
    async fn load_days(
        &self,
        ids: &[String],
    ) -> Result<HashMap<String, Vec<DaySnapshot>>, ServiceError> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let records = DailyRecord::find()
            .filter(daily_record::Column::ProductId.is_in(ids.iter().cloned()))
            .order_by_asc(daily_record::Column::ProductId)
            .order_by_asc(daily_record::Column::Day)
            .all(&*self.db_pool)
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to load daily records");
                ServiceError::DatabaseError(e)
            })?;

        let mut grouped: HashMap<String, Vec<DaySnapshot>> = HashMap::new();
        for record in &records {
            grouped
                .entry(record.product_id.clone())
                .or_default()
                .push(DaySnapshot::from(record));
        }
        Ok(grouped)
    }
}
