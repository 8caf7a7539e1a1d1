use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{ActiveValue, Set};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Action recorded in the audit trail. LOGIN/LOGOUT exist for the external
/// auth collaborator; the core itself only emits the other five.
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
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityAction {
    Create,
    Update,
    Delete,
    Login,
    Logout,
    StockIn,
    StockOut,
}

impl ActivityAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
            Self::Login => "LOGIN",
            Self::Logout => "LOGOUT",
            Self::StockIn => "STOCK_IN",
            Self::StockOut => "STOCK_OUT",
        }
    }
}

/// Append-only audit trail entry. Never updated or deleted by the system.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activity_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Username of the acting user, when known
    pub actor: Option<String>,

    /// One of the `ActivityAction` string forms
    pub action: String,

    /// Entity type the action applied to ("Product", "Category", ...)
    pub model_name: String,

    pub object_id: Option<Uuid>,

    /// Human-readable representation of the object at the time of the action
    pub object_repr: String,

    /// JSON array of {field, old_value, new_value} tuples
    pub changes: Option<String>,

    pub ip_address: Option<String>,

    pub timestamp: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

#[async_trait::async_trait]
impl ActiveModelBehavior for ActiveModel {
    async fn before_save<C>(self, _db: &C, insert: bool) -> Result<Self, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut active_model = self;

        if insert {
            if let ActiveValue::NotSet = active_model.timestamp {
                active_model.timestamp = Set(Utc::now());
            }
        }

        Ok(active_model)
    }
}
