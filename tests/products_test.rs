mod common;

use common::{actor, create_category, create_product, setup};
use rust_decimal_macros::dec;
use axum::http::StatusCode;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use stockroom_api::{
    entities::{
        activity_log::{self, Entity as ActivityLog},
        product::{self, Entity as Product},
        stock_movement::{self, Entity as StockMovement},
    },
    errors::ServiceError,
    services::{
        categories::CategoryInput,
        ledger::NewMovement,
        products::{ProductFilter, ProductInput, StatusBucket},
    },
};
use uuid::Uuid;

fn input(name: &str, sku: &str, category_id: Option<Uuid>) -> ProductInput {
    ProductInput {
        name: name.to_string(),
        sku: sku.to_string(),
        category_id,
        description: None,
        unit: "pcs".to_string(),
        quantity: 10,
        reorder_level: 2,
        price: dec!(40.00),
    }
}

#[tokio::test]
async fn create_product_records_audit_entry() {
    let ctx = setup().await;

    let created = ctx
        .services
        .products
        .create(input("Whiteboard Marker", "WBM-01", None), actor("admin"))
        .await
        .expect("create failed");

    assert_eq!(created.sku, "WBM-01");
    assert_eq!(created.quantity, 10);

    let audit = ActivityLog::find()
        .filter(activity_log::Column::Action.eq("CREATE"))
        .all(ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].object_repr, "Whiteboard Marker");
    assert_eq!(audit[0].actor.as_deref(), Some("admin"));
}

#[tokio::test]
async fn duplicate_sku_is_a_conflict() {
    let ctx = setup().await;
    create_product(&ctx, "Original", "DUP-01", None, 1, 1, dec!(1.00)).await;

    let err = ctx
        .services
        .products
        .create(input("Copycat", "DUP-01", None), actor("admin"))
        .await
        .expect_err("duplicate SKU should fail");
    assert!(matches!(err, ServiceError::Conflict(_)));

    // Updating another product onto the taken SKU also conflicts
    let other = create_product(&ctx, "Other", "OTH-01", None, 1, 1, dec!(1.00)).await;
    let err = ctx
        .services
        .products
        .update(other.id, input("Other", "DUP-01", None), actor("admin"))
        .await
        .expect_err("update onto taken SKU should fail");
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn unique_index_violation_surfaces_as_conflict() {
    let ctx = setup().await;
    create_product(&ctx, "Original", "DUP-02", None, 1, 1, dec!(1.00)).await;

    // A concurrent writer can slip past the duplicate pre-check; the unique
    // index then rejects the insert and the error must map to 409.
    let err = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set("Copycat".to_string()),
        sku: Set("DUP-02".to_string()),
        category_id: Set(None),
        description: Set(None),
        unit: Set("pcs".to_string()),
        quantity: Set(0),
        reorder_level: Set(1),
        price: Set(dec!(1.00)),
        ..Default::default()
    }
    .insert(ctx.db.as_ref())
    .await
    .expect_err("duplicate SKU must violate the unique index");

    let mapped = ServiceError::unique_conflict(err, "A product with SKU 'DUP-02' already exists");
    assert!(matches!(mapped, ServiceError::Conflict(_)));
    assert_eq!(mapped.status_code(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn update_diffs_changed_fields_into_audit() {
    let ctx = setup().await;
    let product = create_product(&ctx, "Notebook", "NTB-01", None, 10, 2, dec!(40.00)).await;

    let mut changed = input("Notebook", "NTB-01", None);
    changed.quantity = 7;
    changed.price = dec!(45.00);
    let updated = ctx
        .services
        .products
        .update(product.id, changed, actor("admin"))
        .await
        .expect("update failed");
    assert_eq!(updated.quantity, 7);

    let audit = ActivityLog::find()
        .filter(activity_log::Column::Action.eq("UPDATE"))
        .all(ctx.db.as_ref())
        .await
        .unwrap();
    assert_eq!(audit.len(), 1);
    let changes = audit[0].changes.as_deref().expect("changes missing");
    assert!(changes.contains("\"field\":\"quantity\""));
    assert!(changes.contains("\"field\":\"price\""));
    assert!(!changes.contains("\"field\":\"name\""));
}

#[tokio::test]
async fn delete_product_removes_movements_but_keeps_audit() {
    let ctx = setup().await;
    let product = create_product(&ctx, "Doomed", "DMD-01", None, 10, 2, dec!(10.00)).await;
    ctx.services
        .ledger
        .record_stock_out(NewMovement {
            product_id: product.id,
            quantity: 1,
            reference: None,
            notes: None,
            actor: actor("clerk"),
        })
        .await
        .unwrap();

    ctx.services
        .products
        .delete(product.id, actor("admin"))
        .await
        .expect("delete failed");

    assert!(Product::find_by_id(product.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .is_none());
    let movements = StockMovement::find()
        .filter(stock_movement::Column::ProductId.eq(product.id))
        .all(ctx.db.as_ref())
        .await
        .unwrap();
    assert!(movements.is_empty());

    let audit = ActivityLog::find().all(ctx.db.as_ref()).await.unwrap();
    let actions: Vec<&str> = audit.iter().map(|a| a.action.as_str()).collect();
    assert!(actions.contains(&"STOCK_OUT"));
    assert!(actions.contains(&"DELETE"));
}

#[tokio::test]
async fn list_filters_by_search_category_and_status() {
    let ctx = setup().await;
    let office = create_category(&ctx, "Office Supplies").await;
    let hardware = create_category(&ctx, "Hardware").await;
    create_product(&ctx, "Ballpoint Pen", "PEN-01", Some(office.id), 10, 2, dec!(5.00)).await;
    create_product(&ctx, "Hammer", "HMR-01", Some(hardware.id), 2, 2, dec!(90.00)).await;
    create_product(&ctx, "Nails", "NLS-01", Some(hardware.id), 0, 5, dec!(0.50)).await;

    let by_search = ctx
        .services
        .products
        .list(ProductFilter {
            search: Some("office".to_string()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_search.len(), 1);
    assert_eq!(by_search[0].product.name, "Ballpoint Pen");
    assert_eq!(by_search[0].category_name.as_deref(), Some("Office Supplies"));

    let by_category = ctx
        .services
        .products
        .list(ProductFilter {
            category_id: Some(hardware.id),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(by_category.len(), 2);

    let low = ctx
        .services
        .products
        .list(ProductFilter {
            stock_status: Some(StatusBucket::Low),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].product.name, "Hammer");

    let out = ctx
        .services
        .products
        .list(ProductFilter {
            stock_status: Some(StatusBucket::Out),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0].product.name, "Nails");
}

#[tokio::test]
async fn category_delete_detaches_products() {
    let ctx = setup().await;
    let doomed = create_category(&ctx, "Doomed").await;
    let product = create_product(&ctx, "Orphan", "ORP-01", Some(doomed.id), 5, 1, dec!(2.00)).await;

    ctx.services
        .categories
        .delete(doomed.id, actor("admin"))
        .await
        .expect("delete failed");

    let reloaded = Product::find_by_id(product.id)
        .one(ctx.db.as_ref())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reloaded.category_id, None);
}

#[tokio::test]
async fn duplicate_category_name_is_a_conflict() {
    let ctx = setup().await;
    create_category(&ctx, "Stationery").await;

    let err = ctx
        .services
        .categories
        .create(
            CategoryInput {
                name: "Stationery".to_string(),
                description: None,
            },
            actor("admin"),
        )
        .await
        .expect_err("duplicate name should fail");
    assert!(matches!(err, ServiceError::Conflict(_)));
}

#[tokio::test]
async fn create_with_unknown_category_is_not_found() {
    let ctx = setup().await;

    let err = ctx
        .services
        .products
        .create(
            input("Lost", "LST-01", Some(Uuid::new_v4())),
            actor("admin"),
        )
        .await
        .expect_err("unknown category should fail");
    assert!(matches!(err, ServiceError::NotFound(_)));
}
