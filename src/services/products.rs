use crate::{
    db::DbPool,
    entities::{
        activity_log::ActivityAction,
        category::{self, Entity as Category},
        product::{self, Entity as Product},
        stock_movement::{self, Entity as StockMovement},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::activity::{self, changes_json, Actor, FieldChange, NewActivity},
};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, QueryFilter, QueryOrder, QuerySelect,
    Set, TransactionError, TransactionTrait,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Full field set for a product write (create and PUT-style update).
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub sku: String,
    pub category_id: Option<Uuid>,
    pub description: Option<String>,
    pub unit: String,
    pub quantity: i32,
    pub reorder_level: i32,
    pub price: Decimal,
}

/// Stock-status bucket used by the list filter. `Low` excludes products
/// that are fully out of stock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatusBucket {
    In,
    Low,
    Out,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    /// Case-insensitive search over name, SKU, and category name
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub stock_status: Option<StatusBucket>,
}

#[derive(Debug, Clone)]
pub struct ProductWithCategory {
    pub product: product::Model,
    pub category_name: Option<String>,
}

#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    #[instrument(skip(self, input))]
    pub async fn create(
        &self,
        input: ProductInput,
        actor: Actor,
    ) -> Result<product::Model, ServiceError> {
        validate_input(&input)?;
        self.ensure_sku_free(&input.sku, None).await?;
        self.ensure_category_exists(input.category_id).await?;

        let created = self
            .db
            .transaction::<_, product::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let sku_taken =
                        format!("A product with SKU '{}' already exists", input.sku);
                    let created = product::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        name: Set(input.name),
                        sku: Set(input.sku),
                        category_id: Set(input.category_id),
                        description: Set(input.description),
                        unit: Set(input.unit),
                        quantity: Set(input.quantity),
                        reorder_level: Set(input.reorder_level),
                        price: Set(input.price),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(|e| ServiceError::unique_conflict(e, sku_taken))?;

                    activity::record(
                        txn,
                        NewActivity {
                            actor,
                            action: ActivityAction::Create,
                            model_name: "Product".to_string(),
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

        self.publish(Event::ProductCreated(created.id)).await;
        Ok(created)
    }

    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: Uuid,
        input: ProductInput,
        actor: Actor,
    ) -> Result<product::Model, ServiceError> {
        validate_input(&input)?;
        self.ensure_sku_free(&input.sku, Some(id)).await?;
        self.ensure_category_exists(input.category_id).await?;

        let updated = self
            .db
            .transaction::<_, product::Model, ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = Product::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", id))
                        })?;

                    let changes = diff_product(&existing, &input);
                    let sku_taken =
                        format!("A product with SKU '{}' already exists", input.sku);

                    let mut active: product::ActiveModel = existing.into();
                    active.name = Set(input.name);
                    active.sku = Set(input.sku);
                    active.category_id = Set(input.category_id);
                    active.description = Set(input.description);
                    active.unit = Set(input.unit);
                    active.quantity = Set(input.quantity);
                    active.reorder_level = Set(input.reorder_level);
                    active.price = Set(input.price);

                    let updated = active
                        .update(txn)
                        .await
                        .map_err(|e| ServiceError::unique_conflict(e, sku_taken))?;

                    activity::record(
                        txn,
                        NewActivity {
                            actor,
                            action: ActivityAction::Update,
                            model_name: "Product".to_string(),
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

        self.publish(Event::ProductUpdated(updated.id)).await;
        Ok(updated)
    }

    /// Deletes a product together with its movement history (movements
    /// cannot outlive their product). The audit entry survives.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: Uuid, actor: Actor) -> Result<(), ServiceError> {
        self.db
            .transaction::<_, (), ServiceError>(move |txn| {
                Box::pin(async move {
                    let existing = Product::find_by_id(id)
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!("Product {} not found", id))
                        })?;

                    activity::record(
                        txn,
                        NewActivity {
                            actor,
                            action: ActivityAction::Delete,
                            model_name: "Product".to_string(),
                            object_id: Some(existing.id),
                            object_repr: existing.name.clone(),
                            changes: None,
                        },
                    )
                    .await?;

                    StockMovement::delete_many()
                        .filter(stock_movement::Column::ProductId.eq(id))
                        .exec(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    existing.delete(txn).await.map_err(ServiceError::db_error)?;

                    Ok(())
                })
            })
            .await
            .map_err(unwrap_txn_error)?;

        self.publish(Event::ProductDeleted(id)).await;
        Ok(())
    }

    pub async fn get(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    /// Lists products, newest first, with the category filter pushed to SQL
    /// and search/status applied over the fetched set.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        filter: ProductFilter,
    ) -> Result<Vec<ProductWithCategory>, ServiceError> {
        let db = self.db.as_ref();

        let category_names: HashMap<Uuid, String> = Category::find()
            .all(db)
            .await
            .map_err(ServiceError::db_error)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        let mut query = Product::find().order_by_desc(product::Column::CreatedAt);
        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        let products = query.all(db).await.map_err(ServiceError::db_error)?;

        let rows = products
            .into_iter()
            .map(|p| {
                let category_name = p
                    .category_id
                    .and_then(|id| category_names.get(&id).cloned());
                ProductWithCategory {
                    product: p,
                    category_name,
                }
            })
            .filter(|row| match &filter.search {
                Some(q) => matches_search(&row.product, row.category_name.as_deref(), q),
                None => true,
            })
            .filter(|row| match filter.stock_status {
                Some(bucket) => matches_bucket(&row.product, bucket),
                None => true,
            })
            .collect();

        Ok(rows)
    }

    /// Movement history for one product, newest first.
    pub async fn movements(
        &self,
        id: Uuid,
        limit: u64,
    ) -> Result<Vec<stock_movement::Model>, ServiceError> {
        // 404 rather than an empty history for unknown products
        self.get(id).await?;

        StockMovement::find()
            .filter(stock_movement::Column::ProductId.eq(id))
            .order_by_desc(stock_movement::Column::OccurredAt)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }

    async fn ensure_sku_free(&self, sku: &str, exclude: Option<Uuid>) -> Result<(), ServiceError> {
        let mut query = Product::find().filter(product::Column::Sku.eq(sku));
        if let Some(id) = exclude {
            query = query.filter(product::Column::Id.ne(id));
        }
        let existing = query
            .one(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A product with SKU '{}' already exists",
                sku
            )));
        }
        Ok(())
    }

    async fn ensure_category_exists(&self, category_id: Option<Uuid>) -> Result<(), ServiceError> {
        if let Some(id) = category_id {
            Category::find_by_id(id)
                .one(self.db.as_ref())
                .await
                .map_err(ServiceError::db_error)?
                .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))?;
        }
        Ok(())
    }

    async fn publish(&self, event: Event) {
        if let Err(e) = self.event_sender.send(event).await {
            warn!("Failed to publish product event: {}", e);
        }
    }
}

fn unwrap_txn_error(e: TransactionError<ServiceError>) -> ServiceError {
    match e {
        TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
        TransactionError::Transaction(service_err) => service_err,
    }
}

/// Central guard for the quantity >= 0 invariant: product writes cannot
/// sidestep the ledger into negative stock.
fn validate_input(input: &ProductInput) -> Result<(), ServiceError> {
    if input.quantity < 0 {
        return Err(ServiceError::ValidationError(
            "Product quantity cannot be negative".to_string(),
        ));
    }
    if input.reorder_level < 0 {
        return Err(ServiceError::ValidationError(
            "Reorder level cannot be negative".to_string(),
        ));
    }
    if input.price < Decimal::ZERO {
        return Err(ServiceError::ValidationError(
            "Price cannot be negative".to_string(),
        ));
    }
    Ok(())
}

fn diff_product(existing: &product::Model, input: &ProductInput) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if existing.name != input.name {
        changes.push(FieldChange::new("name", &existing.name, &input.name));
    }
    if existing.sku != input.sku {
        changes.push(FieldChange::new("sku", &existing.sku, &input.sku));
    }
    if existing.category_id != input.category_id {
        changes.push(FieldChange::new(
            "category_id",
            format_opt(existing.category_id.as_ref()),
            format_opt(input.category_id.as_ref()),
        ));
    }
    if existing.description != input.description {
        changes.push(FieldChange::new(
            "description",
            format_opt(existing.description.as_ref()),
            format_opt(input.description.as_ref()),
        ));
    }
    if existing.unit != input.unit {
        changes.push(FieldChange::new("unit", &existing.unit, &input.unit));
    }
    if existing.quantity != input.quantity {
        changes.push(FieldChange::new(
            "quantity",
            existing.quantity,
            input.quantity,
        ));
    }
    if existing.reorder_level != input.reorder_level {
        changes.push(FieldChange::new(
            "reorder_level",
            existing.reorder_level,
            input.reorder_level,
        ));
    }
    if existing.price != input.price {
        changes.push(FieldChange::new("price", existing.price, input.price));
    }
    changes
}

fn format_opt<T: ToString>(value: Option<&T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn matches_search(product: &product::Model, category_name: Option<&str>, query: &str) -> bool {
    let needle = query.to_lowercase();
    product.name.to_lowercase().contains(&needle)
        || product.sku.to_lowercase().contains(&needle)
        || category_name
            .map(|c| c.to_lowercase().contains(&needle))
            .unwrap_or(false)
}

fn matches_bucket(product: &product::Model, bucket: StatusBucket) -> bool {
    match bucket {
        StatusBucket::In => product.quantity > product.reorder_level,
        StatusBucket::Low => {
            product.quantity > 0 && product.quantity <= product.reorder_level
        }
        StatusBucket::Out => product.quantity == 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn sample(quantity: i32, reorder_level: i32) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: "Ballpoint Pen".into(),
            sku: "PEN-BLK-01".into(),
            category_id: None,
            description: None,
            unit: "pcs".into(),
            quantity,
            reorder_level,
            price: dec!(12.50),
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    #[test]
    fn search_matches_name_sku_and_category() {
        let p = sample(10, 2);
        assert!(matches_search(&p, None, "ballpoint"));
        assert!(matches_search(&p, None, "pen-blk"));
        assert!(matches_search(&p, Some("Office Supplies"), "office"));
        assert!(!matches_search(&p, Some("Office Supplies"), "hardware"));
    }

    #[test]
    fn low_bucket_excludes_out_of_stock() {
        assert!(matches_bucket(&sample(2, 2), StatusBucket::Low));
        assert!(!matches_bucket(&sample(0, 2), StatusBucket::Low));
        assert!(matches_bucket(&sample(0, 2), StatusBucket::Out));
        assert!(matches_bucket(&sample(3, 2), StatusBucket::In));
        assert!(!matches_bucket(&sample(2, 2), StatusBucket::In));
    }

    #[test]
    fn negative_quantity_rejected_centrally() {
        let input = ProductInput {
            name: "Pen".into(),
            sku: "PEN".into(),
            category_id: None,
            description: None,
            unit: "pcs".into(),
            quantity: -1,
            reorder_level: 0,
            price: dec!(1.00),
        };
        assert!(matches!(
            validate_input(&input),
            Err(ServiceError::ValidationError(_))
        ));
    }

    #[test]
    fn diff_reports_only_changed_fields() {
        let existing = sample(10, 2);
        let input = ProductInput {
            name: existing.name.clone(),
            sku: existing.sku.clone(),
            category_id: None,
            description: None,
            unit: existing.unit.clone(),
            quantity: 7,
            reorder_level: 2,
            price: dec!(13.00),
        };
        let changes = diff_product(&existing, &input);
        let fields: Vec<&str> = changes.iter().map(|c| c.field.as_str()).collect();
        assert_eq!(fields, vec!["quantity", "price"]);
        assert_eq!(changes[0].old_value, "10");
        assert_eq!(changes[0].new_value, "7");
    }
}
