use crate::{
    db::DbPool,
    entities::activity_log::{self, ActivityAction, Entity as ActivityLog},
    errors::ServiceError,
};
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use super::{day_start_utc, next_day_start_utc};

/// Identity of the acting user, resolved by the routing layer. The core
/// never authenticates; it only records who asked.
#[derive(Debug, Clone, Default)]
pub struct Actor {
    pub username: Option<String>,
    pub ip_address: Option<String>,
}

/// One structured field change recorded in an audit entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldChange {
    pub field: String,
    pub old_value: String,
    pub new_value: String,
}

impl FieldChange {
    pub fn new(field: &str, old_value: impl ToString, new_value: impl ToString) -> Self {
        Self {
            field: field.to_string(),
            old_value: old_value.to_string(),
            new_value: new_value.to_string(),
        }
    }
}

/// Serializes a change set for the `changes` column. Empty sets collapse to
/// NULL so unchanged saves stay distinguishable from empty diffs.
pub fn changes_json(changes: &[FieldChange]) -> Result<Option<String>, ServiceError> {
    if changes.is_empty() {
        return Ok(None);
    }
    serde_json::to_string(changes)
        .map(Some)
        .map_err(|e| ServiceError::InternalError(format!("Failed to serialize changes: {}", e)))
}

/// Payload for one audit trail entry.
#[derive(Debug, Clone)]
pub struct NewActivity {
    pub actor: Actor,
    pub action: ActivityAction,
    pub model_name: String,
    pub object_id: Option<Uuid>,
    pub object_repr: String,
    pub changes: Option<String>,
}

/// Appends an audit entry on the given connection, so callers can include
/// the write in their own transaction.
pub async fn record<C: ConnectionTrait>(
    conn: &C,
    entry: NewActivity,
) -> Result<activity_log::Model, ServiceError> {
    activity_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        actor: Set(entry.actor.username),
        action: Set(entry.action.as_str().to_string()),
        model_name: Set(entry.model_name),
        object_id: Set(entry.object_id),
        object_repr: Set(entry.object_repr),
        changes: Set(entry.changes),
        ip_address: Set(entry.actor.ip_address),
        ..Default::default()
    }
    .insert(conn)
    .await
    .map_err(ServiceError::db_error)
}

#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub action: Option<ActivityAction>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub limit: Option<u64>,
}

/// Read side of the audit trail.
#[derive(Clone)]
pub struct ActivityLogService {
    db: Arc<DbPool>,
}

impl ActivityLogService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Lists audit entries, newest first, with optional action and
    /// inclusive calendar-day filters.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ActivityFilter,
    ) -> Result<Vec<activity_log::Model>, ServiceError> {
        let mut query = ActivityLog::find().order_by_desc(activity_log::Column::Timestamp);

        if let Some(action) = filter.action {
            query = query.filter(activity_log::Column::Action.eq(action.as_str()));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(activity_log::Column::Timestamp.gte(day_start_utc(from)));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(activity_log::Column::Timestamp.lt(next_day_start_utc(to)));
        }
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query.all(self.db.as_ref()).await.map_err(ServiceError::db_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_change_set_collapses_to_null() {
        assert_eq!(changes_json(&[]).unwrap(), None);
    }

    #[test]
    fn change_set_serializes_field_tuples() {
        let json = changes_json(&[FieldChange::new("quantity", 5, 3)])
            .unwrap()
            .unwrap();
        let parsed: Vec<FieldChange> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].field, "quantity");
        assert_eq!(parsed[0].old_value, "5");
        assert_eq!(parsed[0].new_value, "3");
    }
}
