use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveModelBehavior, ActiveValue, ActiveValue::Set, ConnectionTrait};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Product keyed by its external product code
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// External product code, e.g. "0000001"
    #[sea_orm(primary_key, auto_increment = false)]
    #[validate(length(
        min = 1,
        max = 255,
        message = "Product ID must be between 1 and 255 characters"
    ))]
    pub id: String,

    /// Display name
    pub name: String,

    /// Stock on hand before day 1
    pub opening_inventory: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::daily_record::Entity")]
    DailyRecords,
}

impl Related<super::daily_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DailyRecords.def()
    }
}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.created_at {
                active_model.created_at = Set(Utc::now());
            }
            if let ActiveValue::NotSet = active_model.updated_at {
                active_model.updated_at = Set(None);
            }
        } else {
            active_model.updated_at = Set(Some(Utc::now()));
        }

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}
