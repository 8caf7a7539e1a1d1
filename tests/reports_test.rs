mod common;

use chrono::{NaiveDate, TimeZone, Utc};
use common::{actor, create_category, create_product, setup, TestCtx};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, Set};
use stockroom_api::{entities::stock_movement, services::ledger::NewMovement};
use uuid::Uuid;

/// Inserts an OUT movement directly with a chosen day, bypassing the ledger,
/// so window totals can be pinned to specific dates.
async fn insert_out_movement(
    ctx: &TestCtx,
    product_id: Uuid,
    quantity: i32,
    price: Decimal,
    day: NaiveDate,
) -> stock_movement::Model {
    stock_movement::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        movement_type: Set("OUT".to_string()),
        quantity: Set(quantity),
        price_at_movement: Set(price),
        occurred_at: Set(Utc.from_utc_datetime(&day.and_hms_opt(10, 30, 0).unwrap())),
        reference: Set(None),
        notes: Set(None),
        performed_by: Set(None),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect("failed to insert movement")
}

#[tokio::test]
async fn snapshot_counts_products_and_values() {
    let ctx = setup().await;
    let stationery = create_category(&ctx, "Stationery").await;

    create_product(&ctx, "Pen", "PEN", Some(stationery.id), 10, 2, dec!(5.00)).await;
    create_product(&ctx, "Pad", "PAD", Some(stationery.id), 2, 2, dec!(3.00)).await;
    create_product(&ctx, "Ink", "INK", None, 0, 2, dec!(9.00)).await;

    let snapshot = ctx
        .services
        .reporting
        .inventory_snapshot()
        .await
        .expect("snapshot failed");

    assert_eq!(snapshot.total_products, 3);
    assert_eq!(snapshot.in_stock, 1);
    assert_eq!(snapshot.low_stock_count, 1);
    assert_eq!(snapshot.out_of_stock, 1);
    assert_eq!(snapshot.total_stock_value, dec!(56.00));
    assert_eq!(snapshot.categories.len(), 1);
    assert_eq!(snapshot.categories[0].product_count, 2);
    assert_eq!(snapshot.low_stock.len(), 2);

    // Reads must not change anything
    let again = ctx.services.reporting.inventory_snapshot().await.unwrap();
    assert_eq!(again.total_products, 3);
    assert_eq!(again.total_stock_value, dec!(56.00));
}

#[tokio::test]
async fn window_totals_sum_out_value_per_calendar_window() {
    let ctx = setup().await;
    let product = create_product(&ctx, "Printer", "PRN", None, 100, 2, dec!(25000.00)).await;

    let as_of = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    insert_out_movement(&ctx, product.id, 2, dec!(25000.00), as_of).await;
    insert_out_movement(&ctx, product.id, 4, dec!(1800.00), as_of).await;
    insert_out_movement(
        &ctx,
        product.id,
        1,
        dec!(500.00),
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
    )
    .await;
    insert_out_movement(
        &ctx,
        product.id,
        1,
        dec!(250.00),
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
    )
    .await;
    insert_out_movement(
        &ctx,
        product.id,
        1,
        dec!(100.00),
        NaiveDate::from_ymd_opt(2023, 12, 30).unwrap(),
    )
    .await;

    let totals = ctx
        .services
        .reporting
        .stock_out_window_totals(as_of)
        .await
        .expect("window totals failed");

    assert_eq!(totals.today, dec!(57200.00));
    assert_eq!(totals.this_month, dec!(57700.00));
    assert_eq!(totals.this_year, dec!(57950.00));
    assert_eq!(totals.all_time, dec!(58050.00));
}

#[tokio::test]
async fn stock_out_report_filters_by_day_range_and_groups_per_product() {
    let ctx = setup().await;
    let cheap = create_product(&ctx, "Eraser", "ERS", None, 50, 2, dec!(2.00)).await;
    let dear = create_product(&ctx, "Toner", "TNR", None, 50, 2, dec!(400.00)).await;

    let in_range = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
    let out_of_range = NaiveDate::from_ymd_opt(2024, 2, 28).unwrap();
    insert_out_movement(&ctx, cheap.id, 5, dec!(2.00), in_range).await;
    insert_out_movement(&ctx, cheap.id, 3, dec!(2.00), in_range).await;
    insert_out_movement(&ctx, dear.id, 1, dec!(400.00), in_range).await;
    insert_out_movement(&ctx, dear.id, 9, dec!(400.00), out_of_range).await;

    let report = ctx
        .services
        .reporting
        .stock_out_report(
            Some(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()),
            Some(NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()),
        )
        .await
        .expect("report failed");

    assert_eq!(report.total_quantity, 9);
    assert_eq!(report.total_value, dec!(416.00));
    assert_eq!(report.products.len(), 2);
    assert_eq!(report.products[0].product_name, "Toner");
    assert_eq!(report.products[1].product_name, "Eraser");
    assert_eq!(report.products[1].quantity, 8);
    assert_eq!(report.products[1].total_value, dec!(16.00));
}

#[tokio::test]
async fn low_stock_list_orders_by_quantity_ascending() {
    let ctx = setup().await;
    create_product(&ctx, "Full", "FUL", None, 50, 5, dec!(1.00)).await;
    create_product(&ctx, "Boundary", "BND", None, 5, 5, dec!(1.00)).await;
    create_product(&ctx, "Empty", "EMP", None, 0, 5, dec!(1.00)).await;
    create_product(&ctx, "Scarce", "SCR", None, 2, 5, dec!(1.00)).await;

    let low = ctx
        .services
        .reporting
        .low_stock_list(10)
        .await
        .expect("low stock failed");

    let names: Vec<&str> = low.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(names, vec!["Empty", "Scarce", "Boundary"]);
}

#[tokio::test]
async fn daily_series_zero_fills_and_captures_todays_movements() {
    let ctx = setup().await;
    let product = create_product(&ctx, "Tape", "TPE", None, 10, 2, dec!(25.00)).await;

    ctx.services
        .ledger
        .record_stock_in(NewMovement {
            product_id: product.id,
            quantity: 6,
            reference: None,
            notes: None,
            actor: actor("clerk"),
        })
        .await
        .unwrap();
    ctx.services
        .ledger
        .record_stock_out(NewMovement {
            product_id: product.id,
            quantity: 2,
            reference: None,
            notes: None,
            actor: actor("clerk"),
        })
        .await
        .unwrap();

    let points = ctx
        .services
        .reporting
        .daily_series(7)
        .await
        .expect("series failed");

    assert_eq!(points.len(), 7);
    let today = points.last().unwrap();
    assert_eq!(today.date, Utc::now().date_naive());
    assert_eq!(today.stock_in, 6);
    assert_eq!(today.stock_out, 2);
    assert!(points[..6].iter().all(|p| p.stock_in == 0 && p.stock_out == 0));
}

#[tokio::test]
async fn dashboard_combines_sections() {
    let ctx = setup().await;
    let tools = create_category(&ctx, "Tools").await;
    let drill = create_product(&ctx, "Drill", "DRL", Some(tools.id), 8, 2, dec!(120.00)).await;
    create_product(&ctx, "Bit", "BIT", Some(tools.id), 1, 3, dec!(4.00)).await;

    ctx.services
        .ledger
        .record_stock_out(NewMovement {
            product_id: drill.id,
            quantity: 2,
            reference: None,
            notes: None,
            actor: actor("clerk"),
        })
        .await
        .unwrap();

    let dashboard = ctx
        .services
        .reporting
        .dashboard()
        .await
        .expect("dashboard failed");

    assert_eq!(dashboard.snapshot.total_products, 2);
    assert_eq!(dashboard.total_categories, 1);
    assert_eq!(dashboard.stock_out_totals.today, dec!(240.00));
    assert_eq!(dashboard.stock_out_totals.all_time, dec!(240.00));
    assert_eq!(dashboard.stock_out_by_category.len(), 1);
    assert_eq!(dashboard.stock_out_by_category[0].category_name, "Tools");
    assert_eq!(dashboard.stock_out_by_category[0].total_quantity, 2);
    assert_eq!(dashboard.snapshot.low_stock.len(), 1);
    assert_eq!(dashboard.snapshot.low_stock[0].name, "Bit");
    assert_eq!(dashboard.snapshot.recent_movements.len(), 1);
    assert_eq!(dashboard.top_products_by_value[0].product_name, "Drill");
    assert_eq!(dashboard.daily_movements.len(), 7);
    assert!(!dashboard.recent_activity.is_empty());
}
