//! SeaORM entities for the four persisted record types.

pub mod activity_log;
pub mod category;
pub mod product;
pub mod stock_movement;
