use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One day of activity for a product; `(product_id, day)` is unique
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "daily_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub product_id: String,
    /// 1-based day number
    pub day: i32,
    /// Closing inventory, may be negative
    pub inventory: i64,
    pub procurement_qty: i64,
    #[sea_orm(column_type = "Double")]
    pub procurement_price: f64,
    pub sales_qty: i64,
    #[sea_orm(column_type = "Double")]
    pub sales_price: f64,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn procurement_amount(&self) -> f64 {
        self.procurement_qty as f64 * self.procurement_price
    }

    pub fn sales_amount(&self) -> f64 {
        self.sales_qty as f64 * self.sales_price
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id",
        on_delete = "Cascade"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
