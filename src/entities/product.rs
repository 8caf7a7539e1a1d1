use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::Display;
use uuid::Uuid;
use validator::Validate;

/// Stock classification derived from quantity against the reorder level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, utoipa::ToSchema)]
pub enum StockStatus {
    #[strum(serialize = "Out of Stock")]
    OutOfStock,
    #[strum(serialize = "Low Stock")]
    LowStock,
    #[strum(serialize = "In Stock")]
    InStock,
}

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize, Validate)]
#[sea_orm(table_name = "products")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[validate(length(
        min = 1,
        max = 200,
        message = "Product name must be between 1 and 200 characters"
    ))]
    pub name: String,

    /// SKU (Stock Keeping Unit), unique across the catalog
    #[validate(length(
        min = 1,
        max = 50,
        message = "SKU must be between 1 and 50 characters"
    ))]
    pub sku: String,

    pub category_id: Option<Uuid>,

    #[validate(length(max = 2000, message = "Description cannot exceed 2000 characters"))]
    pub description: Option<String>,

    /// Unit of measure (pcs, box, pack, kg, g, l, ml, m, set)
    pub unit: String,

    /// Quantity on hand; never negative
    pub quantity: i32,

    /// Threshold at or below which the product counts as low stock
    pub reorder_level: i32,

    /// Unit price, 2 decimal places
    pub price: Decimal,

    pub created_at: DateTime<Utc>,

    pub updated_at: Option<DateTime<Utc>>,
}

impl Model {
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_level
    }

    /// Classification by thresholds {0, reorder_level}. Zero quantity is
    /// out of stock regardless of the reorder level.
    pub fn stock_status(&self) -> StockStatus {
        if self.quantity <= 0 {
            StockStatus::OutOfStock
        } else if self.quantity <= self.reorder_level {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }

    /// Current stock valuation: quantity x unit price.
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.price
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::stock_movement::Entity")]
    StockMovements,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::stock_movement::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::StockMovements.def()
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
        }

        active_model.updated_at = Set(Some(Utc::now()));

        let model: Model = active_model.clone().try_into().map_err(|_| {
            DbErr::Custom("Failed to convert ActiveModel to Model for validation".to_string())
        })?;

        if model.quantity < 0 {
            return Err(DbErr::Custom(
                "Product quantity cannot be negative".to_string(),
            ));
        }

        if let Err(err) = model.validate() {
            return Err(DbErr::Custom(format!("Validation error: {}", err)));
        }

        Ok(active_model)
    }
}
