use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Direction of a stock movement.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    utoipa::ToSchema,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum MovementType {
    In,
    Out,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::In => "IN",
            Self::Out => "OUT",
        }
    }
}

/// A single recorded stock increase (IN) or decrease (OUT) against one
/// product. Immutable after creation; `total_value` is recomputed on every
/// save so it always equals `quantity * price_at_movement`.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "stock_movements")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub product_id: Uuid,

    /// "IN" or "OUT"
    pub movement_type: String,

    /// Units moved; always positive
    pub quantity: i32,

    /// Snapshot of the product price at the time of the movement
    pub price_at_movement: Decimal,

    /// quantity x price_at_movement, computed on write
    pub total_value: Decimal,

    pub occurred_at: DateTime<Utc>,

    /// Free-text reference (delivery receipt, invoice number, ...)
    pub reference: Option<String>,

    pub notes: Option<String>,

    /// Username of the actor who performed the movement, when known
    pub performed_by: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::product::Entity",
        from = "Column::ProductId",
        to = "super::product::Column::Id"
    )]
    Product,
}

impl Related<super::product::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Product.def()
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
            if let ActiveValue::NotSet = active_model.occurred_at {
                active_model.occurred_at = Set(Utc::now());
            }
        }

        let quantity = match &active_model.quantity {
            ActiveValue::Set(q) | ActiveValue::Unchanged(q) => *q,
            ActiveValue::NotSet => {
                return Err(DbErr::Custom(
                    "Stock movement quantity must be set".to_string(),
                ))
            }
        };

        if quantity <= 0 {
            return Err(DbErr::Custom(
                "Stock movement quantity must be positive".to_string(),
            ));
        }

        let price = match &active_model.price_at_movement {
            ActiveValue::Set(p) | ActiveValue::Unchanged(p) => *p,
            ActiveValue::NotSet => {
                return Err(DbErr::Custom(
                    "Stock movement price snapshot must be set".to_string(),
                ))
            }
        };

        active_model.total_value = Set(Decimal::from(quantity) * price);

        Ok(active_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn movement_type_round_trips_through_strings() {
        assert_eq!(MovementType::In.as_str(), "IN");
        assert_eq!(MovementType::Out.to_string(), "OUT");
        assert_eq!("OUT".parse::<MovementType>().unwrap(), MovementType::Out);
        assert!("SIDEWAYS".parse::<MovementType>().is_err());
    }
}
