mod common;

use chrono::NaiveDate;
use reseller_order_desk::{
    domain::schema::FieldSchema,
    dto::orders::{BulkStatusRequest, CreateOrderRequest, UpdateDeadlineRequest, UpdateItemRequest},
    entity::{
        OrderItems,
        order_items::Column as ItemCol,
        products::{ActiveModel as ProductActive, Model as ProductModel},
        sea_orm_active_enums::{ItemStatus, OrderStatus, Role},
    },
    error::AppError,
    middleware::auth::AuthUser,
    routes::params::{Pagination, SettlementPeriod, SettlementQuery},
    services::{notification_service, order_service, settlement_service},
    state::AppState,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use serde_json::json;
use uuid::Uuid;

async fn submit(state: &AppState, seller: &AuthUser, product: &ProductModel) -> anyhow::Result<Uuid> {
    let rows = vec![
        json!({"url": "https://a.example"}),
        json!({"url": "https://b.example"}),
    ]
    .into_iter()
    .filter_map(|v| v.as_object().cloned())
    .collect();
    let receipt = order_service::create_order(
        state,
        seller,
        CreateOrderRequest {
            product_id: product.id,
            rows,
            memo: String::new(),
        },
    )
    .await?
    .data
    .expect("receipt");
    Ok(receipt.order_id)
}

async fn unread(state: &AppState, user: &AuthUser) -> anyhow::Result<u64> {
    let inbox = notification_service::list_notifications(state, user, Pagination::new(1, 50))
        .await?
        .data
        .expect("notifications");
    Ok(inbox.unread_count)
}

// Integration flow: staff move orders through their lifecycle one by one and in bulk.
#[tokio::test]
async fn staff_order_lifecycle_flow() -> anyhow::Result<()> {
    let Some(state) = common::setup_state().await? else {
        return Ok(());
    };

    let admin = common::create_user(&state, "admin", Role::Admin, None).await?;
    let manager = common::create_user(&state, "manager", Role::Manager, Some(admin.user_id)).await?;
    let agency = common::create_user(&state, "agency", Role::Agency, Some(manager.user_id)).await?;
    let seller = common::create_user(&state, "seller", Role::Seller, Some(agency.user_id)).await?;

    let schema: FieldSchema =
        serde_json::from_value(json!([{"name": "url", "type": "url", "required": true}]))?;
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        category_id: Set(None),
        name: Set("Place Listing Save".into()),
        description: Set(String::new()),
        cost_price: Set(300),
        base_price: Set(500),
        schema: Set(schema),
        min_work_days: Set(1),
        max_work_days: Set(2),
        reduction_rate: Set(0),
        is_active: Set(true),
        created_at: NotSet,
        updated_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    let first = submit(&state, &seller, &product).await?;
    let second = submit(&state, &seller, &product).await?;
    let third = submit(&state, &seller, &product).await?;
    let fourth = submit(&state, &seller, &product).await?;

    // Moving into processing stamps the confirmation once; later moves keep it.
    let processing = order_service::update_status(&state, &manager, first, OrderStatus::Processing)
        .await?
        .data
        .expect("order");
    assert_eq!(processing.status, OrderStatus::Processing);
    assert_eq!(processing.confirmed_by, Some(manager.user_id));
    let stamped_at = processing.confirmed_at.expect("confirmed_at");

    let completed = order_service::update_status(&state, &admin, first, OrderStatus::Completed)
        .await?
        .data
        .expect("order");
    assert_eq!(completed.confirmed_by, Some(manager.user_id));
    assert_eq!(completed.confirmed_at, Some(stamped_at));

    let settled = settlement_service::settlement_list(
        &state,
        &admin,
        SettlementQuery {
            period: Some(SettlementPeriod::All),
            ..Default::default()
        },
        Pagination::new(1, 20),
    )
    .await?
    .data
    .expect("settlement");
    assert_eq!(settled.summary.count, 1);
    assert_eq!(settled.items[0].id, first);

    let by_seller = order_service::update_status(&state, &seller, second, OrderStatus::Paid).await;
    assert!(matches!(by_seller, Err(AppError::Forbidden)));

    // A submitted order can be cancelled, and is not treated as confirmed.
    let cancelled = order_service::cancel_order(&state, &manager, second)
        .await?
        .data
        .expect("order");
    assert_eq!(cancelled.status, OrderStatus::Cancelled);
    assert!(cancelled.confirmed_at.is_none());

    // Bulk changes are admin-only and notify once per order.
    let bulk = |ids: Vec<Uuid>| BulkStatusRequest {
        ids,
        status: OrderStatus::Paid,
    };
    let denied = order_service::bulk_update_status(&state, &manager, bulk(vec![third])).await;
    assert!(matches!(denied, Err(AppError::Forbidden)));

    let before = unread(&state, &seller).await?;
    let result = order_service::bulk_update_status(&state, &admin, bulk(vec![third, fourth, Uuid::new_v4()]))
        .await?
        .data
        .expect("result");
    assert_eq!(result.updated, 2);
    assert_eq!(unread(&state, &seller).await?, before + 2);
    let third_detail = order_service::get_order(&state, &admin, third)
        .await?
        .data
        .expect("order");
    assert_eq!(third_detail.order.status, OrderStatus::Paid);
    assert_eq!(third_detail.order.confirmed_by, Some(admin.user_id));

    // Deadlines can be moved and cleared.
    let due = NaiveDate::from_ymd_opt(2030, 1, 15).expect("date");
    let moved = order_service::update_deadline(&state, &manager, third, UpdateDeadlineRequest { deadline: Some(due) })
        .await?
        .data
        .expect("order");
    assert_eq!(moved.deadline, Some(due));
    assert!(moved.days_left.is_some());
    let cleared = order_service::update_deadline(&state, &admin, third, UpdateDeadlineRequest { deadline: None })
        .await?
        .data
        .expect("order");
    assert_eq!(cleared.deadline, None);
    assert_eq!(cleared.days_left, None);

    // Item results are recorded per row, and only through the owning order.
    let item_id = third_detail.items[1].id;
    let item = order_service::update_item_status(
        &state,
        &manager,
        third,
        item_id,
        UpdateItemRequest {
            status: ItemStatus::Completed,
            result_message: Some("published".into()),
        },
    )
    .await?
    .data
    .expect("item");
    assert_eq!(item.status, ItemStatus::Completed);
    assert_eq!(item.result_message, "published");

    let wrong_order = order_service::update_item_status(
        &state,
        &admin,
        fourth,
        item_id,
        UpdateItemRequest {
            status: ItemStatus::Failed,
            result_message: None,
        },
    )
    .await;
    assert!(matches!(wrong_order, Err(AppError::NotFound)));

    // Deleting an order is admin-only and takes its items with it.
    let by_manager = order_service::delete_order(&state, &manager, fourth).await;
    assert!(matches!(by_manager, Err(AppError::Forbidden)));
    order_service::delete_order(&state, &admin, fourth).await?;
    let gone = order_service::get_order(&state, &admin, fourth).await;
    assert!(matches!(gone, Err(AppError::NotFound)));
    let orphan_items = OrderItems::find()
        .filter(ItemCol::OrderId.eq(fourth))
        .count(&state.orm)
        .await?;
    assert_eq!(orphan_items, 0);

    Ok(())
}
