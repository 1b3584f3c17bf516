use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use sea_orm::sea_query::Expr;
use uuid::Uuid;

use crate::{
    dto::dashboard::{MarkReadResult, NotificationList},
    entity::notifications::{ActiveModel, Column, Entity as Notifications},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_notifications(
    state: &AppState,
    auth: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NotificationList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Notifications::find()
        .filter(Column::UserId.eq(auth.user_id))
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let unread_count = Notifications::find()
        .filter(Column::UserId.eq(auth.user_id))
        .filter(Column::IsRead.eq(false))
        .count(&state.orm)
        .await?;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notification::from)
        .collect();

    Ok(ApiResponse::success(
        "Notifications",
        NotificationList {
            items,
            unread_count,
        },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Mark one of the caller's own notifications read. Other users' notifications read as not found.
pub async fn mark_read(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notification>> {
    let notification = Notifications::find_by_id(id)
        .filter(Column::UserId.eq(auth.user_id))
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let notification = if notification.is_read {
        notification
    } else {
        let mut active: ActiveModel = notification.into();
        active.is_read = Set(true);
        active.update(&state.orm).await?
    };

    Ok(ApiResponse::success("Marked as read", notification.into(), Some(Meta::empty())))
}

pub async fn mark_all_read(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<MarkReadResult>> {
    let result = Notifications::update_many()
        .col_expr(Column::IsRead, Expr::value(true))
        .filter(Column::UserId.eq(auth.user_id))
        .filter(Column::IsRead.eq(false))
        .exec(&state.orm)
        .await?;

    Ok(ApiResponse::success(
        "All notifications marked as read",
        MarkReadResult {
            updated: result.rows_affected,
        },
        Some(Meta::empty()),
    ))
}
