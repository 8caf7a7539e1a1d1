//! The stock-movement ledger: the only code path that mutates product
//! quantities. Each movement, the quantity update, and the audit entry are
//! applied in a single transaction.

use crate::{
    db::DbPool,
    entities::{
        activity_log::ActivityAction,
        product::{self, Entity as Product},
        stock_movement::{self, MovementType},
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::activity::{self, changes_json, Actor, FieldChange, NewActivity},
};
use sea_orm::{
    ActiveModelTrait, DbErr, EntityTrait, QuerySelect, Set, TransactionError, TransactionTrait,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

/// A requested stock movement against one product.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub product_id: Uuid,
    pub quantity: i32,
    pub reference: Option<String>,
    pub notes: Option<String>,
    pub actor: Actor,
}

#[derive(Clone)]
pub struct LedgerService {
    db: Arc<DbPool>,
    event_sender: EventSender,
}

impl LedgerService {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self { db, event_sender }
    }

    /// Records an incoming stock movement: creates the movement with a price
    /// snapshot, increments the product quantity, and appends a STOCK_IN
    /// audit entry. There is no upper bound on incoming stock.
    #[instrument(skip(self))]
    pub async fn record_stock_in(
        &self,
        input: NewMovement,
    ) -> Result<stock_movement::Model, ServiceError> {
        let product_id = input.product_id;
        let quantity = input.quantity;
        let (movement, new_quantity) = self.apply_movement(MovementType::In, input).await?;

        if let Err(e) = self
            .event_sender
            .send(Event::StockReceived {
                product_id,
                quantity,
                new_quantity,
            })
            .await
        {
            warn!("Failed to publish stock-in event: {}", e);
        }

        Ok(movement)
    }

    /// Records an outgoing stock movement. Fails with
    /// `ServiceError::InsufficientStock` (and writes nothing) when the
    /// product does not hold enough quantity at admission time.
    #[instrument(skip(self))]
    pub async fn record_stock_out(
        &self,
        input: NewMovement,
    ) -> Result<stock_movement::Model, ServiceError> {
        let product_id = input.product_id;
        let quantity = input.quantity;
        let (movement, new_quantity) = self.apply_movement(MovementType::Out, input).await?;

        if let Err(e) = self
            .event_sender
            .send(Event::StockIssued {
                product_id,
                quantity,
                new_quantity,
                total_value: movement.total_value,
            })
            .await
        {
            warn!("Failed to publish stock-out event: {}", e);
        }

        Ok(movement)
    }

    /// Applies one movement, retrying once when the backend reports a
    /// transient conflict between concurrent movements on the same product.
    async fn apply_movement(
        &self,
        movement_type: MovementType,
        input: NewMovement,
    ) -> Result<(stock_movement::Model, i32), ServiceError> {
        if input.quantity <= 0 {
            return Err(ServiceError::ValidationError(
                "Movement quantity must be positive".to_string(),
            ));
        }

        let product_id = input.product_id;
        match self.apply_movement_once(movement_type, input.clone()).await {
            Err(ServiceError::DatabaseError(err)) if is_transient_conflict(&err) => {
                warn!(%product_id, "Retrying stock movement after conflict");
                match self.apply_movement_once(movement_type, input).await {
                    Err(ServiceError::DatabaseError(err)) if is_transient_conflict(&err) => {
                        Err(ServiceError::ConcurrentModification(product_id))
                    }
                    other => other,
                }
            }
            other => other,
        }
    }

    async fn apply_movement_once(
        &self,
        movement_type: MovementType,
        input: NewMovement,
    ) -> Result<(stock_movement::Model, i32), ServiceError> {
        self.db
            .transaction::<_, (stock_movement::Model, i32), ServiceError>(move |txn| {
                Box::pin(async move {
                    // SELECT ... FOR UPDATE: the availability check and the
                    // decrement below must act on the same row version.
                    // SQLite has no row locks and serializes on its writer
                    // lock instead.
                    let product = Product::find_by_id(input.product_id)
                        .lock_exclusive()
                        .one(txn)
                        .await
                        .map_err(ServiceError::db_error)?
                        .ok_or_else(|| {
                            ServiceError::NotFound(format!(
                                "Product {} not found",
                                input.product_id
                            ))
                        })?;

                    let old_quantity = product.quantity;
                    let new_quantity = match movement_type {
                        MovementType::In => old_quantity + input.quantity,
                        MovementType::Out => {
                            if old_quantity < input.quantity {
                                return Err(ServiceError::InsufficientStock {
                                    available: old_quantity,
                                    requested: input.quantity,
                                });
                            }
                            old_quantity - input.quantity
                        }
                    };

                    // total_value and occurred_at are filled in by the
                    // entity's before_save hook.
                    let movement = stock_movement::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        product_id: Set(product.id),
                        movement_type: Set(movement_type.as_str().to_string()),
                        quantity: Set(input.quantity),
                        price_at_movement: Set(product.price),
                        reference: Set(input.reference),
                        notes: Set(input.notes),
                        performed_by: Set(input.actor.username.clone()),
                        ..Default::default()
                    }
                    .insert(txn)
                    .await
                    .map_err(ServiceError::db_error)?;

                    let mut active_product: product::ActiveModel = product.clone().into();
                    active_product.quantity = Set(new_quantity);
                    active_product
                        .update(txn)
                        .await
                        .map_err(ServiceError::db_error)?;

                    let (action, changes) = match movement_type {
                        MovementType::In => (
                            ActivityAction::StockIn,
                            vec![FieldChange::new("quantity", old_quantity, new_quantity)],
                        ),
                        MovementType::Out => (
                            ActivityAction::StockOut,
                            vec![
                                FieldChange::new("quantity", old_quantity, new_quantity),
                                FieldChange::new(
                                    "stock_value_removed",
                                    "0",
                                    movement.total_value,
                                ),
                            ],
                        ),
                    };

                    activity::record(
                        txn,
                        NewActivity {
                            actor: input.actor,
                            action,
                            model_name: "Product".to_string(),
                            object_id: Some(product.id),
                            object_repr: product.name.clone(),
                            changes: changes_json(&changes)?,
                        },
                    )
                    .await?;

                    Ok((movement, new_quantity))
                })
            })
            .await
            .map_err(|e| match e {
                TransactionError::Connection(db_err) => ServiceError::db_error(db_err),
                TransactionError::Transaction(service_err) => service_err,
            })
    }
}

/// Conflicts worth one retry: deadlocks, serialization failures, and
/// SQLite's coarse write lock.
fn is_transient_conflict(err: &DbErr) -> bool {
    let message = err.to_string().to_ascii_lowercase();
    message.contains("deadlock")
        || message.contains("serialization")
        || message.contains("could not serialize")
        || message.contains("database is locked")
}
