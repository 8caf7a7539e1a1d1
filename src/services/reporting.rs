//! Read-only aggregations over products and the movement ledger. Each report
//! fetches the rows it needs and hands them to a pure aggregation function,
//! which keeps the arithmetic testable without a database.

use crate::{
    db::DbPool,
    entities::{
        activity_log::{self, Entity as ActivityLog},
        category::{self, Entity as Category},
        product::{self, Entity as Product, StockStatus},
        stock_movement::{self, Entity as StockMovement, MovementType},
    },
    errors::ServiceError,
    services::{day_start_utc, next_day_start_utc},
};
use chrono::{Datelike, Days, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub product_count: usize,
    pub total_value: Decimal,
}

/// Point-in-time view of the whole inventory. Category summaries cover only
/// categories that actually hold products.
#[derive(Debug, Clone, Serialize)]
pub struct InventorySnapshot {
    pub total_products: usize,
    pub total_stock_value: Decimal,
    pub in_stock: usize,
    pub low_stock_count: usize,
    pub out_of_stock: usize,
    pub categories: Vec<CategorySummary>,
    pub low_stock: Vec<product::Model>,
    pub recent_movements: Vec<stock_movement::Model>,
}

/// Value of outgoing stock over the standard calendar windows, all ending at
/// the reference date.
#[derive(Debug, Clone, Serialize)]
pub struct StockOutWindowTotals {
    pub today: Decimal,
    pub this_month: Decimal,
    pub this_year: Decimal,
    pub all_time: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProductOutflow {
    pub product_id: Uuid,
    pub product_name: String,
    pub sku: String,
    pub quantity: i32,
    pub total_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryOutflow {
    pub category_id: Uuid,
    pub category_name: String,
    pub total_quantity: i64,
    pub total_value: Decimal,
}

/// Outgoing stock grouped per product over an inclusive day range.
#[derive(Debug, Clone, Serialize)]
pub struct StockOutReport {
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub total_quantity: i64,
    pub total_value: Decimal,
    pub products: Vec<ProductOutflow>,
}

/// One day in the movement time series.
#[derive(Debug, Clone, Serialize)]
pub struct DailyMovementPoint {
    pub date: NaiveDate,
    pub label: String,
    pub stock_in: i64,
    pub stock_out: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub stock_value: Decimal,
}

/// Everything the landing dashboard shows in one payload.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSummary {
    pub snapshot: InventorySnapshot,
    pub total_categories: u64,
    pub stock_out_totals: StockOutWindowTotals,
    pub stock_out_by_category: Vec<CategoryOutflow>,
    pub top_products_by_value: Vec<TopProduct>,
    pub daily_movements: Vec<DailyMovementPoint>,
    pub recent_activity: Vec<activity_log::Model>,
}

#[derive(Clone)]
pub struct ReportingService {
    db: Arc<DbPool>,
}

impl ReportingService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub async fn inventory_snapshot(&self) -> Result<InventorySnapshot, ServiceError> {
        let products = Product::find()
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        let categories = Category::find()
            .order_by_asc(category::Column::Name)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        let recent_movements = StockMovement::find()
            .order_by_desc(stock_movement::Column::OccurredAt)
            .limit(10)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(build_snapshot(&products, &categories, recent_movements))
    }

    #[instrument(skip(self))]
    pub async fn stock_out_window_totals(
        &self,
        as_of: NaiveDate,
    ) -> Result<StockOutWindowTotals, ServiceError> {
        let movements = self.all_stock_out_movements().await?;
        Ok(window_totals(&movements, as_of))
    }

    /// Value of outgoing stock grouped by the product's current category.
    /// Products without a category are left out.
    #[instrument(skip(self))]
    pub async fn stock_out_by_category(&self) -> Result<Vec<CategoryOutflow>, ServiceError> {
        let movements = self.all_stock_out_movements().await?;
        let products = Product::find()
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        let categories = Category::find()
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(outflow_by_category(&movements, &products, &categories))
    }

    /// Per-product outgoing stock over an optional inclusive day range,
    /// highest value first.
    #[instrument(skip(self))]
    pub async fn stock_out_report(
        &self,
        date_from: Option<NaiveDate>,
        date_to: Option<NaiveDate>,
    ) -> Result<StockOutReport, ServiceError> {
        let mut query = StockMovement::find()
            .filter(stock_movement::Column::MovementType.eq(MovementType::Out.as_str()));
        if let Some(from) = date_from {
            query = query.filter(stock_movement::Column::OccurredAt.gte(day_start_utc(from)));
        }
        if let Some(to) = date_to {
            query = query.filter(stock_movement::Column::OccurredAt.lt(next_day_start_utc(to)));
        }
        let movements = query
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        let products = Product::find()
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(build_stock_out_report(
            &movements, &products, date_from, date_to,
        ))
    }

    /// Products at or below their reorder level, emptiest first.
    #[instrument(skip(self))]
    pub async fn low_stock_list(&self, limit: u64) -> Result<Vec<product::Model>, ServiceError> {
        let products = Product::find()
            .filter(Expr::col(product::Column::Quantity).lte(Expr::col(product::Column::ReorderLevel)))
            .order_by_asc(product::Column::Quantity)
            .limit(limit)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(products)
    }

    /// IN and OUT quantities per day over the trailing `days` days, ending
    /// today, with zero-filled gaps.
    #[instrument(skip(self))]
    pub async fn daily_series(&self, days: u32) -> Result<Vec<DailyMovementPoint>, ServiceError> {
        let today = Utc::now().date_naive();
        let from = today
            .checked_sub_days(Days::new(days.saturating_sub(1) as u64))
            .unwrap_or(today);
        let movements = StockMovement::find()
            .filter(stock_movement::Column::OccurredAt.gte(day_start_utc(from)))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        Ok(daily_points(&movements, from, today))
    }

    #[instrument(skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardSummary, ServiceError> {
        let snapshot = self.inventory_snapshot().await?;
        let today = Utc::now().date_naive();
        let stock_out_totals = self.stock_out_window_totals(today).await?;
        let stock_out_by_category = self.stock_out_by_category().await?;

        let total_categories = Category::find()
            .count(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        let products = Product::find()
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;
        let top_products_by_value = top_by_value(&products, 5);

        let daily_movements = self.daily_series(7).await?;

        let recent_activity = ActivityLog::find()
            .order_by_desc(activity_log::Column::Timestamp)
            .limit(10)
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)?;

        Ok(DashboardSummary {
            snapshot,
            total_categories,
            stock_out_totals,
            stock_out_by_category,
            top_products_by_value,
            daily_movements,
            recent_activity,
        })
    }

    async fn all_stock_out_movements(&self) -> Result<Vec<stock_movement::Model>, ServiceError> {
        StockMovement::find()
            .filter(stock_movement::Column::MovementType.eq(MovementType::Out.as_str()))
            .all(self.db.as_ref())
            .await
            .map_err(ServiceError::db_error)
    }
}

fn build_snapshot(
    products: &[product::Model],
    categories: &[category::Model],
    recent_movements: Vec<stock_movement::Model>,
) -> InventorySnapshot {
    let mut in_stock = 0;
    let mut low_stock_count = 0;
    let mut out_of_stock = 0;
    let mut total_stock_value = Decimal::ZERO;

    for p in products {
        total_stock_value += p.stock_value();
        match p.stock_status() {
            StockStatus::InStock => in_stock += 1,
            StockStatus::LowStock => low_stock_count += 1,
            StockStatus::OutOfStock => out_of_stock += 1,
        }
    }

    // Empty categories carry no information in a snapshot
    let category_rows = categories
        .iter()
        .filter_map(|c| {
            let members: Vec<&product::Model> = products
                .iter()
                .filter(|p| p.category_id == Some(c.id))
                .collect();
            (!members.is_empty()).then(|| CategorySummary {
                id: c.id,
                name: c.name.clone(),
                product_count: members.len(),
                total_value: members.iter().map(|p| p.stock_value()).sum(),
            })
        })
        .collect();

    let mut low_stock: Vec<product::Model> = products
        .iter()
        .filter(|p| p.is_low_stock())
        .cloned()
        .collect();
    low_stock.sort_by_key(|p| p.quantity);

    InventorySnapshot {
        total_products: products.len(),
        total_stock_value,
        in_stock,
        low_stock_count,
        out_of_stock,
        categories: category_rows,
        low_stock,
        recent_movements,
    }
}

fn window_totals(movements: &[stock_movement::Model], as_of: NaiveDate) -> StockOutWindowTotals {
    let mut totals = StockOutWindowTotals {
        today: Decimal::ZERO,
        this_month: Decimal::ZERO,
        this_year: Decimal::ZERO,
        all_time: Decimal::ZERO,
    };

    for m in movements {
        let day = m.occurred_at.date_naive();
        totals.all_time += m.total_value;
        // Calendar windows end at as_of; later movements count all-time only.
        if day > as_of {
            continue;
        }
        if day.year() == as_of.year() {
            totals.this_year += m.total_value;
            if day.month() == as_of.month() {
                totals.this_month += m.total_value;
            }
        }
        if day == as_of {
            totals.today += m.total_value;
        }
    }

    totals
}

fn outflow_by_category(
    movements: &[stock_movement::Model],
    products: &[product::Model],
    categories: &[category::Model],
) -> Vec<CategoryOutflow> {
    let product_category: HashMap<Uuid, Uuid> = products
        .iter()
        .filter_map(|p| p.category_id.map(|c| (p.id, c)))
        .collect();

    let mut totals: HashMap<Uuid, (i64, Decimal)> = HashMap::new();
    for m in movements {
        if let Some(category_id) = product_category.get(&m.product_id) {
            let entry = totals.entry(*category_id).or_insert((0, Decimal::ZERO));
            entry.0 += m.quantity as i64;
            entry.1 += m.total_value;
        }
    }

    let mut rows: Vec<CategoryOutflow> = categories
        .iter()
        .filter_map(|c| {
            let (total_quantity, total_value) = totals.get(&c.id).copied()?;
            (total_value > Decimal::ZERO).then(|| CategoryOutflow {
                category_id: c.id,
                category_name: c.name.clone(),
                total_quantity,
                total_value,
            })
        })
        .collect();

    rows.sort_by(|a, b| b.total_value.cmp(&a.total_value));
    rows
}

fn build_stock_out_report(
    movements: &[stock_movement::Model],
    products: &[product::Model],
    date_from: Option<NaiveDate>,
    date_to: Option<NaiveDate>,
) -> StockOutReport {
    let by_id: HashMap<Uuid, &product::Model> = products.iter().map(|p| (p.id, p)).collect();

    let mut grouped: HashMap<Uuid, (i32, Decimal)> = HashMap::new();
    let mut total_quantity: i64 = 0;
    let mut total_value = Decimal::ZERO;
    for m in movements {
        let entry = grouped.entry(m.product_id).or_insert((0, Decimal::ZERO));
        entry.0 += m.quantity;
        entry.1 += m.total_value;
        total_quantity += m.quantity as i64;
        total_value += m.total_value;
    }

    let mut rows: Vec<ProductOutflow> = grouped
        .into_iter()
        .map(|(product_id, (quantity, value))| {
            let (product_name, sku) = by_id
                .get(&product_id)
                .map(|p| (p.name.clone(), p.sku.clone()))
                .unwrap_or_else(|| ("(deleted product)".to_string(), String::new()));
            ProductOutflow {
                product_id,
                product_name,
                sku,
                quantity,
                total_value: value,
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        b.total_value
            .cmp(&a.total_value)
            .then_with(|| a.product_name.cmp(&b.product_name))
    });

    StockOutReport {
        date_from,
        date_to,
        total_quantity,
        total_value,
        products: rows,
    }
}

fn top_by_value(products: &[product::Model], limit: usize) -> Vec<TopProduct> {
    let mut rows: Vec<TopProduct> = products
        .iter()
        .map(|p| TopProduct {
            product_id: p.id,
            product_name: p.name.clone(),
            quantity: p.quantity,
            stock_value: p.stock_value(),
        })
        .collect();
    rows.sort_by(|a, b| b.stock_value.cmp(&a.stock_value));
    rows.truncate(limit);
    rows
}

fn daily_points(
    movements: &[stock_movement::Model],
    from: NaiveDate,
    to: NaiveDate,
) -> Vec<DailyMovementPoint> {
    let mut per_day: HashMap<NaiveDate, (i64, i64)> = HashMap::new();
    for m in movements {
        let day = m.occurred_at.date_naive();
        let entry = per_day.entry(day).or_insert((0, 0));
        if m.movement_type == MovementType::In.as_str() {
            entry.0 += m.quantity as i64;
        } else {
            entry.1 += m.quantity as i64;
        }
    }

    let mut points = Vec::new();
    let mut day = from;
    while day <= to {
        let (stock_in, stock_out) = per_day.get(&day).copied().unwrap_or((0, 0));
        points.push(DailyMovementPoint {
            date: day,
            label: day.format("%b %d").to_string(),
            stock_in,
            stock_out,
        });
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }
    points
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn product(name: &str, category_id: Option<Uuid>, quantity: i32, reorder: i32, price: Decimal) -> product::Model {
        product::Model {
            id: Uuid::new_v4(),
            name: name.to_string(),
            sku: name.to_uppercase(),
            category_id,
            description: None,
            unit: "pcs".into(),
            quantity,
            reorder_level: reorder,
            price,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn out_movement(product_id: Uuid, quantity: i32, total_value: Decimal, day: NaiveDate) -> stock_movement::Model {
        stock_movement::Model {
            id: Uuid::new_v4(),
            product_id,
            movement_type: MovementType::Out.as_str().to_string(),
            quantity,
            price_at_movement: total_value / Decimal::from(quantity),
            total_value,
            occurred_at: Utc.from_utc_datetime(&day.and_hms_opt(12, 0, 0).unwrap()),
            reference: None,
            notes: None,
            performed_by: None,
        }
    }

    #[test]
    fn snapshot_counts_status_buckets_and_value() {
        let c = category::Model {
            id: Uuid::new_v4(),
            name: "Stationery".into(),
            description: None,
            created_at: Utc::now(),
        };
        let empty = category::Model {
            id: Uuid::new_v4(),
            name: "Unused".into(),
            description: None,
            created_at: Utc::now(),
        };
        let products = vec![
            product("pen", Some(c.id), 10, 2, dec!(5.00)),
            product("pad", Some(c.id), 2, 2, dec!(3.00)),
            product("ink", None, 0, 2, dec!(9.00)),
        ];
        let snap = build_snapshot(&products, &[c, empty], Vec::new());

        assert_eq!(snap.total_products, 3);
        assert_eq!(snap.in_stock, 1);
        assert_eq!(snap.low_stock_count, 1);
        assert_eq!(snap.out_of_stock, 1);
        assert_eq!(snap.total_stock_value, dec!(56.00));
        // The empty category is omitted
        assert_eq!(snap.categories.len(), 1);
        assert_eq!(snap.categories[0].product_count, 2);
        assert_eq!(snap.categories[0].total_value, dec!(56.00));
        // Low-stock products listed emptiest first
        let names: Vec<&str> = snap.low_stock.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ink", "pad"]);
    }

    #[test]
    fn window_totals_respect_calendar_boundaries() {
        let as_of = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
        let pid = Uuid::new_v4();
        let movements = vec![
            out_movement(pid, 1, dec!(100.00), as_of),
            out_movement(pid, 1, dec!(10.00), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()),
            out_movement(pid, 1, dec!(1.00), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            out_movement(pid, 1, dec!(0.50), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()),
            // After as_of but within the same month: all-time only
            out_movement(pid, 1, dec!(0.25), NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()),
        ];
        let totals = window_totals(&movements, as_of);

        assert_eq!(totals.today, dec!(100.00));
        assert_eq!(totals.this_month, dec!(110.00));
        assert_eq!(totals.this_year, dec!(111.00));
        assert_eq!(totals.all_time, dec!(111.75));
    }

    #[test]
    fn stock_out_report_groups_and_sorts_by_value() {
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let a = product("alpha", None, 10, 2, dec!(5.00));
        let b = product("beta", None, 10, 2, dec!(50.00));
        let movements = vec![
            out_movement(a.id, 2, dec!(10.00), day),
            out_movement(a.id, 1, dec!(5.00), day),
            out_movement(b.id, 1, dec!(50.00), day),
        ];
        let report = build_stock_out_report(&movements, &[a, b], Some(day), Some(day));

        assert_eq!(report.total_quantity, 4);
        assert_eq!(report.total_value, dec!(65.00));
        assert_eq!(report.products.len(), 2);
        assert_eq!(report.products[0].product_name, "beta");
        assert_eq!(report.products[1].quantity, 3);
        assert_eq!(report.products[1].total_value, dec!(15.00));
    }

    #[test]
    fn outflow_by_category_skips_uncategorized_and_zero() {
        let c = category::Model {
            id: Uuid::new_v4(),
            name: "Tools".into(),
            description: None,
            created_at: Utc::now(),
        };
        let day = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let categorized = product("drill", Some(c.id), 5, 1, dec!(20.00));
        let loose = product("screw", None, 5, 1, dec!(0.10));
        let movements = vec![
            out_movement(categorized.id, 1, dec!(20.00), day),
            out_movement(loose.id, 1, dec!(0.10), day),
        ];
        let rows = outflow_by_category(
            &movements,
            &[categorized, loose],
            std::slice::from_ref(&c),
        );

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].category_name, "Tools");
        assert_eq!(rows[0].total_quantity, 1);
        assert_eq!(rows[0].total_value, dec!(20.00));
    }

    #[test]
    fn daily_points_zero_fill_missing_days() {
        let from = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2024, 6, 7).unwrap();
        let pid = Uuid::new_v4();
        let mut movement = out_movement(pid, 4, dec!(8.00), from);
        movement.movement_type = MovementType::In.as_str().to_string();
        let points = daily_points(&[movement], from, to);

        assert_eq!(points.len(), 7);
        assert_eq!(points[0].stock_in, 4);
        assert_eq!(points[0].label, "Jun 01");
        assert!(points[1..].iter().all(|p| p.stock_in == 0 && p.stock_out == 0));
    }

    #[test]
    fn top_by_value_orders_and_truncates() {
        let products = vec![
            product("cheap", None, 100, 1, dec!(0.10)),
            product("mid", None, 10, 1, dec!(5.00)),
            product("dear", None, 2, 1, dec!(100.00)),
        ];
        let rows = top_by_value(&products, 2);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].product_name, "dear");
        assert_eq!(rows[0].stock_value, dec!(200.00));
        assert_eq!(rows[1].product_name, "mid");
    }
}
