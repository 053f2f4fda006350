use crate::{
    db::{with_transaction, DbPool},
    entities::{
        daily_record::{self, Entity as DailyRecord},
        product::{self, Entity as Product},
    },
    errors::ServiceError,
    services::spreadsheet::{self, ParsedProduct, ParsedWorkbook, SpreadsheetFormat},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, Set,
};
use serde::Serialize;
use std::{collections::HashMap, io::Write, path::PathBuf, sync::Arc};
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};
use utoipa::ToSchema;

/// Rows per multi-row INSERT, well below SQLite's bind parameter limit
const INSERT_BATCH_SIZE: usize = 500;

/// Counts reported back to the uploader
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct IngestSummary {
    /// Products that did not exist before this upload
    pub products_count: usize,
    /// Daily records written across new and updated products
    pub days_count: usize,
}

/// Applies parsed uploads to storage.
///
/// Each upload is one transaction: products that already exist lose all of
/// their daily records and are overwritten in place, new products are
/// inserted. Uploads are serialized so two files touching the same product
/// cannot interleave their delete and insert steps.
pub struct IngestionService {
    db_pool: Arc<DbPool>,
    upload_lock: Mutex<()>,
    temp_dir: Option<PathBuf>,
}

impl IngestionService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self {
            db_pool,
            upload_lock: Mutex::new(()),
            temp_dir: None,
        }
    }

    /// Stores upload temp files under `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Full upload pipeline: extension check, temp file, parse, upsert.
    #[instrument(skip(self, contents), fields(size = contents.len()))]
    pub async fn import_upload(
        &self,
        filename: &str,
        contents: Vec<u8>,
    ) -> Result<IngestSummary, ServiceError> {
        let format = SpreadsheetFormat::from_filename(filename).ok_or_else(|| {
            ServiceError::BadRequest(format!(
                "Only spreadsheet files ({}) are allowed",
                SpreadsheetFormat::ACCEPTED
            ))
        })?;

        let parsed = self.parse_upload(format, contents).await?;
        info!(
            filename,
            products = parsed.products.len(),
            max_days = parsed.max_days,
            "Spreadsheet parsed"
        );

        self.ingest(parsed.products).await
    }

    /// Writes the upload to a temp file and parses it on the blocking pool.
    /// The temp file is removed when the handle drops, whatever the outcome.
    async fn parse_upload(
        &self,
        format: SpreadsheetFormat,
        contents: Vec<u8>,
    ) -> Result<ParsedWorkbook, ServiceError> {
        let temp_dir = self.temp_dir.clone();

        tokio::task::spawn_blocking(move || {
            let suffix = format!(".{}", format.extension());
            let mut builder = tempfile::Builder::new();
            builder.prefix("upload-").suffix(&suffix);
            let created = match &temp_dir {
                Some(dir) => builder.tempfile_in(dir),
                None => builder.tempfile(),
            };
            let mut temp_file = created.map_err(|e| {
                error!("Failed to create temporary upload file: {}", e);
                ServiceError::InternalError(format!("Failed to create temporary file: {}", e))
            })?;

            temp_file
                .write_all(&contents)
                .and_then(|_| temp_file.flush())
                .map_err(|e| {
                    ServiceError::InternalError(format!("Failed to write temporary file: {}", e))
                })?;

            spreadsheet::parse_file(temp_file.path(), format).map_err(ServiceError::from)
        })
        .await
        .map_err(|e| ServiceError::InternalError(format!("Spreadsheet parsing task failed: {}", e)))?
    }

    /// Upserts products and their day sequences in a single transaction.
    #[instrument(skip(self, products), fields(products = products.len()))]
    pub async fn ingest(
        &self,
        products: Vec<ParsedProduct>,
    ) -> Result<IngestSummary, ServiceError> {
        let _guard = self.upload_lock.lock().await;

        let products = collapse_duplicate_ids(products);
        report_negative_inventory(&products);

        let summary = with_transaction(&self.db_pool, move |txn| {
            Box::pin(async move { upsert_products(txn, products).await })
        })
        .await
        .map_err(|e| match e {
            ServiceError::DatabaseError(db_err) => {
                error!("Upload transaction failed: {}", db_err);
                ServiceError::PersistenceError(format!("Error saving to database: {}", db_err))
            }
            other => other,
        })?;

        info!(
            products_count = summary.products_count,
            days_count = summary.days_count,
            "Upload committed"
        );
        Ok(summary)
    }
}

/// Keeps the first position of each product id with the data of its last row.
fn collapse_duplicate_ids(products: Vec<ParsedProduct>) -> Vec<ParsedProduct> {
    let mut positions: HashMap<String, usize> = HashMap::with_capacity(products.len());
    let mut unique: Vec<ParsedProduct> = Vec::with_capacity(products.len());

    for product in products {
        match positions.get(&product.id) {
            Some(&position) => {
                warn!(product_id = %product.id, "Duplicate product ID in upload; last row wins");
                unique[position] = product;
            }
            None => {
                positions.insert(product.id.clone(), unique.len());
                unique.push(product);
            }
        }
    }

    unique
}

fn report_negative_inventory(products: &[ParsedProduct]) {
    for product in products {
        let mut negative = product.days.iter().filter(|day| day.inventory < 0);
        if let Some(first) = negative.next() {
            warn!(
                product_id = %product.id,
                day = first.day,
                inventory = first.inventory,
                negative_days = 1 + negative.count(),
                "Closing inventory below zero"
            );
        }
    }
}

fn persistence(product_id: &str, action: &str, err: DbErr) -> ServiceError {
    error!(product_id, error = %err, "Failed to {} during upload", action);
    ServiceError::PersistenceError(format!(
        "Error saving to database: failed to {} product '{}': {}",
        action, product_id, err
    ))
}

async fn upsert_products(
    txn: &DatabaseTransaction,
    products: Vec<ParsedProduct>,
) -> Result<IngestSummary, ServiceError> {
    let mut summary = IngestSummary::default();
    let now = Utc::now();

    for parsed in products {
        let existing = Product::find_by_id(parsed.id.clone())
            .one(txn)
            .await
            .map_err(|e| persistence(&parsed.id, "look up", e))?;

        match existing {
            Some(model) => {
                DailyRecord::delete_many()
                    .filter(daily_record::Column::ProductId.eq(parsed.id.as_str()))
                    .exec(txn)
                    .await
                    .map_err(|e| persistence(&parsed.id, "clear daily records of", e))?;

                let mut active: product::ActiveModel = model.into();
                active.name = Set(parsed.name.clone());
                active.opening_inventory = Set(parsed.opening_inventory);
                active
                    .update(txn)
                    .await
                    .map_err(|e| persistence(&parsed.id, "update", e))?;

                debug!(product_id = %parsed.id, "Replaced existing product");
            }
            None => {
                product::ActiveModel {
                    id: Set(parsed.id.clone()),
                    name: Set(parsed.name.clone()),
                    opening_inventory: Set(parsed.opening_inventory),
                    ..Default::default()
                }
                .insert(txn)
                .await
                .map_err(|e| persistence(&parsed.id, "create", e))?;

                summary.products_count += 1;
                debug!(product_id = %parsed.id, "Created product");
            }
        }

        let records: Vec<daily_record::ActiveModel> = parsed
            .days
            .iter()
            .map(|day| daily_record::ActiveModel {
                id: NotSet,
                product_id: Set(parsed.id.clone()),
                day: Set(day.day),
                inventory: Set(day.inventory),
                procurement_qty: Set(day.procurement_qty),
                procurement_price: Set(day.procurement_price),
                sales_qty: Set(day.sales_qty),
                sales_price: Set(day.sales_price),
                created_at: Set(now),
            })
            .collect();

        for batch in records.chunks(INSERT_BATCH_SIZE) {
            DailyRecord::insert_many(batch.to_vec())
                .exec(txn)
                .await
                .map_err(|e| persistence(&parsed.id, "insert daily records of", e))?;
        }
        summary.days_count += records.len();
    }

    Ok(summary)
}
