//! HTTP layer. Handlers parse and validate input, resolve the acting user
//! from headers, and delegate to the services.

pub mod activity;
pub mod categories;
pub mod common;
pub mod health;
pub mod products;
pub mod reports;
pub mod stock;

use crate::{
    db::DbPool,
    events::EventSender,
    services::{
        activity::ActivityLogService, categories::CategoryService, ledger::LedgerService,
        products::ProductService, reporting::ReportingService,
    },
};
use std::sync::Arc;

/// All service instances, shared across handlers through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub ledger: LedgerService,
    pub reporting: ReportingService,
    pub products: ProductService,
    pub categories: CategoryService,
    pub activity: ActivityLogService,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: EventSender) -> Self {
        Self {
            ledger: LedgerService::new(db.clone(), event_sender.clone()),
            reporting: ReportingService::new(db.clone()),
            products: ProductService::new(db.clone(), event_sender.clone()),
            categories: CategoryService::new(db.clone(), event_sender),
            activity: ActivityLogService::new(db),
        }
    }
}
