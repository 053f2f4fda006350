//! Seed data script - populates the database with a demo account and sample products
//!
//! Run with: cargo run --bin seed-data
//!
//! This creates:
//! - an `admin` account (password `admin123`)
//! - two products with three days of movements each

use clap::Parser;
use sea_orm::{EntityTrait, PaginatorTrait};
use std::sync::Arc;
use tracing::info;

use stockbook_api::{
    auth::{AuthConfig, AuthError, AuthService},
    entities::product,
    services::{
        ingestion::IngestionService,
        spreadsheet::{ParsedDay, ParsedProduct},
    },
};

const ADMIN_USERNAME: &str = "admin";
const ADMIN_EMAIL: &str = "admin@example.com";
const ADMIN_PASSWORD: &str = "admin123";

#[derive(Debug, Parser)]
#[command(name = "seed-data", about = "Seed the database with demo data")]
struct Args {
    /// Database URL overriding the configured one
    #[arg(long)]
    database_url: Option<String>,

    /// Only create the admin account
    #[arg(long)]
    admin_only: bool,
}

/// (procurement qty, procurement price, sales qty, sales price) per day
type Movement = (i64, f64, i64, f64);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut cfg = stockbook_api::config::load_config()?;
    if let Some(url) = args.database_url {
        cfg.database_url = url;
    }
    stockbook_api::config::init_tracing(cfg.log_level(), cfg.log_json);

    info!("=== Stockbook Seed Data ===");

    let db = stockbook_api::db::establish_connection_from_app_config(&cfg).await?;
    stockbook_api::db::run_migrations(&db).await?;
    let db = Arc::new(db);

    let auth = AuthService::new(AuthConfig::from(&cfg), db.clone());
    match auth.register(ADMIN_USERNAME, ADMIN_EMAIL, ADMIN_PASSWORD).await {
        Ok(user) => info!(user_id = user.id, "Created admin account"),
        Err(AuthError::UsernameTaken | AuthError::EmailTaken) => {
            info!("Admin account already present")
        }
        Err(e) => return Err(e.into()),
    }

    if args.admin_only {
        return Ok(());
    }

    let existing = product::Entity::find().count(&*db).await?;
    if existing > 0 {
        info!(existing, "Products already present; skipping sample products");
        return Ok(());
    }

    let summary = IngestionService::new(db)
        .ingest(sample_products())
        .await?;

    info!(
        products_count = summary.products_count,
        days_count = summary.days_count,
        "=== Seed Data Complete ==="
    );
    info!("Log in with {} / {} and try:", ADMIN_USERNAME, ADMIN_PASSWORD);
    info!("  curl -H 'Authorization: Bearer <token>' http://localhost:8080/api/v1/products");
    Ok(())
}

fn sample_products() -> Vec<ParsedProduct> {
    vec![
        sample_product(
            "0000001",
            "CHERRY 1PACK",
            117,
            &[(0, 0.0, 22, 5.98), (21, 13.72, 12, 5.98), (0, 0.0, 7, 4.98)],
        ),
        sample_product(
            "0000002",
            "ENOKI MUSHROOM 360G",
            1020,
            &[
                (750, 3.20, 157, 4.38),
                (240, 2.80, 111, 4.38),
                (192, 3.60, 95, 4.38),
            ],
        ),
    ]
}

fn sample_product(id: &str, name: &str, opening_inventory: i64, movements: &[Movement]) -> ParsedProduct {
    let mut inventory = opening_inventory;
    let days = movements
        .iter()
        .zip(1..)
        .map(|(&(procurement_qty, procurement_price, sales_qty, sales_price), day)| {
            inventory += procurement_qty - sales_qty;
            ParsedDay {
                day,
                inventory,
                procurement_qty,
                procurement_price,
                sales_qty,
                sales_price,
            }
        })
        .collect();

    ParsedProduct {
        id: id.to_string(),
        name: name.to_string(),
        opening_inventory,
        days,
    }
}
