mod common;

use reseller_order_desk::{
    domain::schema::FieldSchema,
    dto::{orders::CreateOrderRequest, price_policies::PricePolicyRequest},
    entity::{
        AuditLogs,
        audit_logs::Column as AuditCol,
        products::ActiveModel as ProductActive,
        sea_orm_active_enums::{OrderStatus, Role},
    },
    error::AppError,
    routes::params::{Pagination, SettlementPeriod, SettlementQuery},
    services::{notification_service, order_service, price_policy_service, settlement_service},
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::{Map, Value, json};
use uuid::Uuid;

fn row(value: Value) -> Map<String, Value> {
    value.as_object().cloned().expect("object row")
}

// Integration flow: seller submits -> admin confirms payment -> seller is notified ->
// the order shows up in settlement and the reduction report.
#[tokio::test]
async fn submit_confirm_and_settle_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin", Role::Admin, None).await?;
    let agency = common::create_user(&state, "agency", Role::Agency, Some(admin.user_id)).await?;
    let seller = common::create_user(&state, "seller", Role::Seller, Some(agency.user_id)).await?;
    let manager = common::create_user(&state, "manager", Role::Manager, Some(admin.user_id)).await?;

    let schema: FieldSchema = serde_json::from_value(json!([
        {"name": "url", "type": "url", "required": true},
        {"name": "qty", "type": "number", "required": true, "is_quantity": true},
    ]))?;
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(None),
        name: Set("Blog Review Post".into()),
        description: Set(String::new()),
        cost_price: Set(700),
        base_price: Set(1000),
        schema: Set(schema),
        min_work_days: Set(1),
        max_work_days: Set(3),
        reduction_rate: Set(20),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    // Bad rows are reported together and nothing is stored.
    let rejected = order_service::create_order(
        &state,
        &seller,
        CreateOrderRequest {
            product_id: product.id,
            rows: vec![row(json!({"url": "ftp://nope", "qty": "x"}))],
            memo: String::new(),
        },
    )
    .await;
    match rejected {
        Err(AppError::InvalidRows(errors)) => assert_eq!(errors.len(), 2),
        other => panic!("expected row errors, got {other:?}"),
    }

    // Managers only oversee.
    let forbidden = order_service::create_order(
        &state,
        &manager,
        CreateOrderRequest {
            product_id: product.id,
            rows: vec![row(json!({"url": "https://a", "qty": 1}))],
            memo: String::new(),
        },
    )
    .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden)));

    // Seller pays the base price: 1000 x 5 + 10% VAT.
    let receipt = order_service::create_order(
        &state,
        &seller,
        CreateOrderRequest {
            product_id: product.id,
            rows: vec![
                row(json!({"url": "https://a.example", "qty": "2"})),
                row(json!({"url": "https://b.example", "qty": 3})),
            ],
            memo: "first".into(),
        },
    )
    .await?
    .data
    .expect("receipt");
    assert_eq!(receipt.item_count, 2);
    assert_eq!(receipt.total_quantity, 5);
    assert_eq!(receipt.unit_price, 1000);
    assert_eq!(receipt.supply_amount, 5000);
    assert_eq!(receipt.vat_amount, 500);
    assert_eq!(receipt.total_amount, 5500);
    assert!(receipt.order_number.starts_with("ORD-"));

    // The agency sees its seller's order; the manager (other branch) does not.
    let agency_view = order_service::list_orders(&state, &agency, Default::default(), Pagination::new(1, 20))
        .await?
        .data
        .expect("orders");
    assert_eq!(agency_view.items.len(), 1);
    let hidden = order_service::get_order(&state, &manager, receipt.order_id).await;
    assert!(matches!(hidden, Err(AppError::NotFound)));

    let detail = order_service::get_order(&state, &seller, receipt.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(detail.items.len(), 2);
    assert_eq!(detail.items[0].row_number, 1);
    assert_eq!(detail.order.status, OrderStatus::Submitted);

    // Only staff can confirm.
    let denied = order_service::confirm_payment(&state, &seller, receipt.order_id).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let paid = order_service::confirm_payment(&state, &admin, receipt.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(paid.status, OrderStatus::Paid);
    assert_eq!(paid.confirmed_by, Some(admin.user_id));
    assert!(paid.confirmed_at.is_some());

    let again = order_service::confirm_payment(&state, &admin, receipt.order_id).await;
    assert!(matches!(again, Err(AppError::BadRequest(_))));
    let cancel = order_service::cancel_order(&state, &admin, receipt.order_id).await;
    assert!(matches!(cancel, Err(AppError::BadRequest(_))));

    let inbox = notification_service::list_notifications(&state, &seller, Pagination::new(1, 20))
        .await?
        .data
        .expect("notifications");
    assert_eq!(inbox.unread_count, 1);
    assert!(inbox.items[0].message.contains("Payment confirmed"));

    // Settlement sees the confirmed order.
    let all_time = || SettlementQuery {
        period: Some(SettlementPeriod::All),
        ..Default::default()
    };
    let settled = settlement_service::settlement_list(&state, &admin, all_time(), Pagination::new(1, 20))
        .await?
        .data
        .expect("settlement");
    assert_eq!(settled.summary.count, 1);
    assert_eq!(settled.summary.total_amount, 5500);

    // 20% of 5 units = 1 unit, worth 5000 / 5 of supply.
    let wrong = settlement_service::reduction_analysis(&state, &admin, all_time(), Some("guess")).await;
    assert!(matches!(wrong, Err(AppError::Unauthorized(_))));
    let report = settlement_service::reduction_analysis(
        &state,
        &admin,
        all_time(),
        Some(common::SETTLEMENT_PASSWORD),
    )
    .await?
    .data
    .expect("report");
    assert_eq!(report.summary.count, 1);
    assert_eq!(report.summary.reduced_quantity, 1);
    assert_eq!(report.summary.actual_quantity, 4);
    assert_eq!(report.summary.reduced_profit, 1000);

    // A price override changes what the agency pays and the rate snapshotted on its order.
    price_policy_service::save_price(
        &state,
        &admin,
        PricePolicyRequest {
            product_id: product.id,
            user_id: agency.user_id,
            price: Some(900),
            reduction_rate: Some(50),
        },
    )
    .await?;
    let agency_receipt = order_service::create_order(
        &state,
        &agency,
        CreateOrderRequest {
            product_id: product.id,
            rows: vec![row(json!({"url": "https://c.example", "qty": 10}))],
            memo: String::new(),
        },
    )
    .await?
    .data
    .expect("receipt");
    assert_eq!(agency_receipt.unit_price, 900);
    assert_eq!(agency_receipt.total_amount, 9900);

    let agency_order = order_service::get_order(&state, &admin, agency_receipt.order_id)
        .await?
        .data
        .expect("order");
    assert_eq!(agency_order.order.reduction_rate, 50);

    // Clearing both values removes the override.
    let cleared = price_policy_service::save_price(
        &state,
        &admin,
        PricePolicyRequest {
            product_id: product.id,
            user_id: agency.user_id,
            price: None,
            reduction_rate: None,
        },
    )
    .await?
    .data
    .expect("result");
    assert!(cleared.deleted);

    // Every state change left an audit trail.
    let status_changes = AuditLogs::find()
        .filter(AuditCol::Action.eq("order_status"))
        .count(&state.orm)
        .await?;
    assert_eq!(status_changes, 1);

    Ok(())
}
