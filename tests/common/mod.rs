use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectOptions, Database, DatabaseConnection, Set};
use stockroom_api::{
    db::run_migrations,
    entities::{category, product},
    events::{self, EventSender},
    handlers::AppServices,
    services::activity::Actor,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Test harness around an in-memory SQLite database with migrations applied.
/// A single pooled connection keeps the in-memory schema alive for the whole
/// test.
pub struct TestCtx {
    pub db: Arc<DatabaseConnection>,
    pub services: AppServices,
    pub event_sender: EventSender,
    _event_task: tokio::task::JoinHandle<()>,
}

pub async fn setup() -> TestCtx {
    let mut options = ConnectOptions::new("sqlite::memory:".to_string());
    options
        .max_connections(1)
        .min_connections(1)
        .connect_timeout(Duration::from_secs(5))
        .sqlx_logging(false);

    let db = Database::connect(options)
        .await
        .expect("failed to open in-memory database");
    run_migrations(&db).await.expect("failed to run migrations");
    let db = Arc::new(db);

    let (tx, rx) = mpsc::channel(64);
    let event_sender = EventSender::new(tx);
    let event_task = tokio::spawn(events::process_events(rx));

    let services = AppServices::new(db.clone(), event_sender.clone());

    TestCtx {
        db,
        services,
        event_sender,
        _event_task: event_task,
    }
}

#[allow(dead_code)]
pub fn actor(username: &str) -> Actor {
    Actor {
        username: Some(username.to_string()),
        ip_address: Some("127.0.0.1".to_string()),
    }
}

#[allow(dead_code)]
pub async fn create_category(ctx: &TestCtx, name: &str) -> category::Model {
    category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(None),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("failed to insert category")
}

#[allow(dead_code)]
pub async fn create_product(
    ctx: &TestCtx,
    name: &str,
    sku: &str,
    category_id: Option<Uuid>,
    quantity: i32,
    reorder_level: i32,
    price: Decimal,
) -> product::Model {
    product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        sku: Set(sku.to_string()),
        category_id: Set(category_id),
        description: Set(None),
        unit: Set("pcs".to_string()),
        quantity: Set(quantity),
        reorder_level: Set(reorder_level),
        price: Set(price),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("failed to insert product")
}
