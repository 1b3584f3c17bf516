use chrono::{NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use serde_json::Value;
use uuid::Uuid;

use crate::{
    audit,
    domain::{
        hierarchy::OrderScope,
        pricing::{deadline_from, quote},
        schema::{RowError, total_quantity, validate_order_data},
    },
    dto::orders::{
        BulkStatusRequest, BulkStatusResult, CreateOrderRequest, OrderList, OrderReceipt,
        OrderWithItems, UpdateDeadlineRequest, UpdateItemRequest,
    },
    entity::{
        notifications::ActiveModel as NotificationActive,
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::Entity as Products,
        sea_orm_active_enums::{ItemStatus, OrderStatus, Role},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_any},
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::{product_service::user_terms, user_service::order_scope},
    state::AppState,
};

pub fn build_order_number(order_id: Uuid, today: NaiveDate) -> String {
    let suffix = order_id.simple().to_string();
    format!("ORD-{}-{}", today.format("%Y%m%d"), &suffix[..8])
}

pub fn status_message(order_number: &str, status: OrderStatus) -> String {
    format!("Order {} status: {}", order_number, status.label())
}

fn scope_condition(scope: &OrderScope) -> Condition {
    match scope {
        OrderScope::All => Condition::all(),
        OrderScope::Users(ids) => Condition::all().add(OrderCol::UserId.is_in(ids.clone())),
    }
}

/// Tell the order's owner about its new status. Runs inside the caller's transaction.
async fn notify_status<C: ConnectionTrait>(conn: &C, order: &OrderModel) -> AppResult<()> {
    NotificationActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(order.user_id),
        message: Set(status_message(&order.order_number, order.status)),
        link: Set(format!("/orders/{}", order.id)),
        is_read: Set(false),
        created_at: NotSet,
    }
    .insert(conn)
    .await?;
    Ok(())
}

/// Lock an order for a status change by an admin or a manager whose scope covers it.
async fn lock_managed_order<C: ConnectionTrait>(
    conn: &C,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<OrderModel> {
    ensure_any(auth, &[Role::Admin, Role::Manager])?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::NotFound)?;
    if !order_scope(conn, auth).await?.covers(order.user_id) {
        return Err(AppError::NotFound);
    }
    Ok(order)
}

fn set_status(active: &mut OrderActive, status: OrderStatus, auth: &AuthUser, confirmed: bool) {
    let now = Utc::now();
    active.status = Set(status);
    active.updated_at = Set(now.into());
    if !confirmed && OrderStatus::settled().contains(&status) {
        active.confirmed_at = Set(Some(now.into()));
        active.confirmed_by = Set(Some(auth.user_id));
    }
}

pub async fn create_order(
    state: &AppState,
    auth: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderReceipt>> {
    if auth.role == Role::Manager {
        return Err(AppError::Forbidden);
    }
    let product = Products::find_by_id(payload.product_id)
        .one(&state.orm)
        .await?
        .filter(|p| p.is_active)
        .ok_or(AppError::NotFound)?;

    let max_items = state.config.order_max_items;
    if payload.rows.len() > max_items {
        return Err(AppError::InvalidRows(vec![RowError::whole(format!(
            "An order may contain at most {max_items} rows"
        ))]));
    }

    let (rows, errors) = validate_order_data(&payload.rows, &product.schema);
    if !errors.is_empty() {
        return Err(AppError::InvalidRows(errors));
    }
    if rows.is_empty() {
        return Err(AppError::InvalidRows(vec![RowError::whole("No valid rows were submitted")]));
    }

    let total_qty = total_quantity(&payload.rows, &product.schema)
        .map_err(|e| AppError::InvalidRows(vec![e]))?;
    let (unit_price, reduction_rate) = user_terms(&state.orm, &product, auth).await?;
    let amounts = quote(unit_price, total_qty)?;
    let today = state.config.business_today();
    let deadline = deadline_from(today, product.max_work_days);
    let item_count = i32::try_from(rows.len())
        .map_err(|_| AppError::BadRequest("Too many rows".into()))?;

    let order_id = Uuid::new_v4();
    let now = Utc::now();
    let txn = state.orm.begin().await?;

    let order = OrderActive {
        id: Set(order_id),
        order_number: Set(build_order_number(order_id, today)),
        user_id: Set(auth.user_id),
        product_id: Set(product.id),
        status: Set(OrderStatus::Submitted),
        unit_price: Set(unit_price),
        total_amount: Set(amounts.total_amount),
        item_count: Set(item_count),
        total_quantity: Set(total_qty),
        reduction_rate: Set(reduction_rate),
        deadline: Set(Some(deadline)),
        memo: Set(payload.memo),
        confirmed_at: Set(None),
        confirmed_by: Set(None),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let items: Vec<OrderItemActive> = rows
        .into_iter()
        .enumerate()
        .map(|(idx, row)| OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            row_number: Set(idx as i32 + 1),
            data: Set(Value::Object(row)),
            unit_price: Set(unit_price),
            status: Set(ItemStatus::Pending),
            result_message: Set(String::new()),
            created_at: Set(now.into()),
        })
        .collect();
    OrderItems::insert_many(items).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        order_number = %order.order_number,
        items = item_count,
        total = order.total_amount,
        "order submitted"
    );
    audit::record(
        state,
        auth.user_id,
        "order_create",
        "orders",
        serde_json::json!({ "order_id": order.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order submitted",
        OrderReceipt {
            order_id: order.id,
            order_number: order.order_number,
            item_count: order.item_count,
            total_quantity: order.total_quantity,
            unit_price: order.unit_price,
            supply_amount: amounts.supply_amount,
            vat_amount: amounts.vat_amount,
            total_amount: amounts.total_amount,
            deadline: order.deadline,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_orders(
    state: &AppState,
    auth: &AuthUser,
    query: OrderListQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let scope = order_scope(&state.orm, auth).await?;

    let mut condition = scope_condition(&scope);
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }
    if let Some(product_id) = query.product_id {
        condition = condition.add(OrderCol::ProductId.eq(product_id));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or_default() {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&state.orm).await? as i64;
    let today = state.config.business_today();
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(|o| Order::from_model(o, today))
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

async fn with_items<C: ConnectionTrait>(
    conn: &C,
    order: OrderModel,
    today: NaiveDate,
) -> AppResult<OrderWithItems> {
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::RowNumber)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();
    Ok(OrderWithItems {
        order: Order::from_model(order, today),
        items,
    })
}

pub async fn get_order(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    if !order_scope(&state.orm, auth).await?.covers(order.user_id) {
        return Err(AppError::NotFound);
    }

    let data = with_items(&state.orm, order, state.config.business_today()).await?;
    Ok(ApiResponse::success("OK", data, Some(Meta::empty())))
}

/// Shared path for single-order status changes: lock, check, update, notify, commit.
async fn transition(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    status: OrderStatus,
    require_submitted: Option<&str>,
) -> AppResult<OrderModel> {
    let txn = state.orm.begin().await?;
    let order = lock_managed_order(&txn, auth, id).await?;
    if let Some(message) = require_submitted {
        if order.status != OrderStatus::Submitted {
            return Err(AppError::BadRequest(message.into()));
        }
    }

    let confirmed = order.confirmed_at.is_some();
    let mut active: OrderActive = order.into();
    set_status(&mut active, status, auth, confirmed);
    let order = active.update(&txn).await?;
    notify_status(&txn, &order).await?;
    txn.commit().await?;

    tracing::info!(order_id = %order.id, status = order.status.label(), "order status changed");
    audit::record(
        state,
        auth.user_id,
        "order_status",
        "orders",
        serde_json::json!({ "order_id": order.id, "status": order.status }),
    )
    .await;
    Ok(order)
}

pub async fn confirm_payment(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = transition(
        state,
        auth,
        id,
        OrderStatus::Paid,
        Some("Only submitted orders can have their payment confirmed"),
    )
    .await?;
    Ok(ApiResponse::success(
        "Payment confirmed",
        Order::from_model(order, state.config.business_today()),
        Some(Meta::empty()),
    ))
}

pub async fn cancel_order(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    let order = transition(
        state,
        auth,
        id,
        OrderStatus::Cancelled,
        Some("Only submitted orders can be cancelled"),
    )
    .await?;
    Ok(ApiResponse::success(
        "Order cancelled",
        Order::from_model(order, state.config.business_today()),
        Some(Meta::empty()),
    ))
}

pub async fn update_status(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    status: OrderStatus,
) -> AppResult<ApiResponse<Order>> {
    let order = transition(state, auth, id, status, None).await?;
    Ok(ApiResponse::success(
        format!("Order status changed to {}", status.label()),
        Order::from_model(order, state.config.business_today()),
        Some(Meta::empty()),
    ))
}

pub async fn bulk_update_status(
    state: &AppState,
    auth: &AuthUser,
    payload: BulkStatusRequest,
) -> AppResult<ApiResponse<BulkStatusResult>> {
    ensure_admin(auth)?;
    let txn = state.orm.begin().await?;
    let orders = Orders::find()
        .filter(OrderCol::Id.is_in(payload.ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    let mut updated = 0u64;
    for order in orders {
        let confirmed = order.confirmed_at.is_some();
        let mut active: OrderActive = order.into();
        set_status(&mut active, payload.status, auth, confirmed);
        let order = active.update(&txn).await?;
        notify_status(&txn, &order).await?;
        updated += 1;
    }
    txn.commit().await?;

    tracing::info!(updated, status = payload.status.label(), "bulk status change");
    audit::record(
        state,
        auth.user_id,
        "order_bulk_status",
        "orders",
        serde_json::json!({ "updated": updated, "status": payload.status }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("{} orders changed to {}", updated, payload.status.label()),
        BulkStatusResult { updated },
        Some(Meta::empty()),
    ))
}

pub async fn update_deadline(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdateDeadlineRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order = lock_managed_order(&txn, auth, id).await?;
    let mut active: OrderActive = order.into();
    active.deadline = Set(payload.deadline);
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&txn).await?;
    txn.commit().await?;

    let message = match order.deadline {
        Some(deadline) => format!("Deadline set to {}", deadline),
        None => "Deadline cleared".to_string(),
    };
    Ok(ApiResponse::success(
        message,
        Order::from_model(order, state.config.business_today()),
        Some(Meta::empty()),
    ))
}

pub async fn update_item_status(
    state: &AppState,
    auth: &AuthUser,
    order_id: Uuid,
    item_id: Uuid,
    payload: UpdateItemRequest,
) -> AppResult<ApiResponse<OrderItem>> {
    let txn = state.orm.begin().await?;
    let order = lock_managed_order(&txn, auth, order_id).await?;
    let item = OrderItems::find_by_id(item_id)
        .filter(OrderItemCol::OrderId.eq(order.id))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: OrderItemActive = item.into();
    active.status = Set(payload.status);
    if let Some(result_message) = payload.result_message {
        active.result_message = Set(result_message);
    }
    let item = active.update(&txn).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("Item updated", item.into(), Some(Meta::empty())))
}

pub async fn delete_order(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(auth)?;
    let order = Orders::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Orders::delete_by_id(id).exec(&state.orm).await?;

    tracing::info!(order_number = %order.order_number, "order deleted");
    audit::record(
        state,
        auth.user_id,
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id, "order_number": order.order_number }),
    )
    .await;

    Ok(ApiResponse::success(
        format!("Order {} deleted", order.order_number),
        Order::from_model(order, state.config.business_today()),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_embeds_date_and_id_prefix() {
        let id = Uuid::parse_str("0f1e2d3c-4b5a-6978-8796-a5b4c3d2e1f0").unwrap();
        let day = NaiveDate::from_ymd_opt(2026, 3, 9).unwrap();
        assert_eq!(build_order_number(id, day), "ORD-20260309-0f1e2d3c");
    }

    #[test]
    fn notification_text_uses_status_label() {
        assert_eq!(
            status_message("ORD-1", OrderStatus::Paid),
            "Order ORD-1 status: Payment confirmed"
        );
    }
}
