use crate::{
    db::DbPool,
    entities::{
        activity_log::ActivityAction,
        category::{self, Entity as Category},
        product::{self, Entity as Product},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::activity::{self, changes_json, Actor, FieldChange, NewActivity},
};
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct CategoryInput {
    pub name: String,
    pub description: Option<String>,
}

/// A category together with how many products reference it.
#[derive(Debug, Clone)]
pub struct CategoryWithCount {
    pub category: category::Model,
    pub product_count: u64,
}

#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl CategoryService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: CategoryInput,
        actor: Actor,
    ) -> Result<category::Model, ServiceError> {
        self.ensure_name_free(&input.name, None).await?;

        let created = self
            .db
            .transaction::<_, category::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let name_taken =
                        format!("A category named '{}' already exists", input.name);
                    let created = category::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(input.name),
                        description: Set(input.description),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| ServiceError::unique_conflict(e, name_taken))?;

                    activity::record(
                        txn,
                        NewActivity {
                            actor,
                            action: ActivityAction::Create,
                            model_name: "Category".to_string(),
                            object_id: Some(created.id),
                            object_repr: created.name.clone(),
                            changes: None,
                        },
                    )
                    .await?;

                    Ok(created)
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        self.publish(Event::CategoryCreated(created.id)).await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: CategoryInput,
        actor: Actor,
    ) -> Result<category::Model, ServiceError> {
        self.ensure_name_free(&input.name, Some(id)).await?;

        let updated = self
            .db
            .transaction::<_, category::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = Category::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Category {} not found", id))
                        })?;

                    let mut changes = Vec::new();
                    if existing.name != input.name {
                        changes.push(FieldChange::new("name", &existing.name, &input.name));
                    }
                    if existing.description != input.description {
                        changes.push(FieldChange::new(
                            "description",
                            existing.description.clone().unwrap_or_default(),
                            input.description.clone().unwrap_or_default(),
                        ));
                    }

                    let name_taken =
                        format!("A category named '{}' already exists", input.name);
                    let mut active: category::ActiveModel = existing.into();
                    active.name = Set(input.name);
                    active.description = Set(input.description);
                    let updated = active
                        .update(txn)
                        .await
                        .map_err(|e| ServiceError::unique_conflict(e, name_taken))?;

                    activity::record(
                        txn,
                        NewActivity {
                            actor,
                            action: ActivityAction::Update,
                            model_name: "Category".to_string(),
                            object_id: Some(updated.id),
                            object_repr: updated.name.clone(),
                            changes: changes_json(&changes)?,
                        },
                    )
                    .await?;

                    Ok(updated)
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        self.publish(Event::CategoryUpdated(updated.id)).await;
        Ok(updated)
    }

    /// Deletes a category. Products that referenced it are detached and kept,
    /// so deleting a category never destroys stock records.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<(), ServiceError> {
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = Category::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Category {} not found", id))
                        })?;

                    Product::update_many()
                        .col_expr(
                            product::Column::CategoryId,
                            Expr::value(Option::<Uuid>::None),
                        )
                        .filter(product::Column::CategoryId.eq(id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    activity::record(
                        txn,
                        NewActivity {
                            actor,
                            action: ActivityAction::Delete,
                            model_name: "Category".to_string(),
                            object_id: Some(existing.id),
                            object_repr: existing.name.clone(),
                            changes: None,
                        },
                    )
                    .await?;

                    existing.delete(txn).await.map_err(ServiceError::db_error)?;

                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        self.publish(Event::CategoryDeleted(id)).await;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        Category::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    /// Lists categories alphabetically, each with its product count.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CategoryWithCount>, ServiceError> {
        let db = self.db.as_ref();
        let categories = Category::find()
            .order_by_asc(category::Column::Name)
            .all(db)
            .await
            .map_err(ServiceError::db_error)?;

        let mut rows = Vec::with_capacity(categories.len());
        for c in categories {
            let product_count = Product::find()
                .filter(product::Column::CategoryId.eq(c.id))
                .count(db)
                .await
                .map_err(ServiceError::db_error)?;
            rows.push(CategoryWithCount {
                category: c,
                product_count,
            });
        }
        Ok(rows)
    }

    async fn ensure_name_free(
        &self,
        name: &str,
        exclude: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Category::find().filter(category::Column::Name.eq(name));
        if let Some(id) = exclude {
            query = query.filter(category::Column::Id.ne(id));
        }
        let existing = query
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A category named '{}' already exists",
                name
            )));
        }
        Ok(())
    }

    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("Failed to publish category event: {}", e);
        }
    }
}

fn unwrap_txn_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}
