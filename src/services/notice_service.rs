use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;

use crate::{
    audit,
    dto::dashboard::{CreateNoticeRequest, NoticeList, UpdateNoticeRequest},
    entity::notices::{ActiveModel, Column, Entity as Notices},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Notice,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Pinned notices first, then newest. Only admins see inactive ones.
pub async fn list_notices(
    state: &AppState,
    auth: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<NoticeList>> {
    let (page, limit, offset) = pagination.normalize();
    let mut finder = Notices::find();
    if !auth.is_admin() {
        finder = finder.filter(Column::IsActive.eq(true));
    }
    let finder = finder
        .order_by_desc(Column::IsPinned)
        .order_by_desc(Column::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Notice::from)
        .collect();

    Ok(ApiResponse::success(
        "Notices",
        NoticeList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_notice(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<ApiResponse<Notice>> {
    let notice = Notices::find_by_id(id)
        .one(&state.orm)
        .await?
        .filter(|n| n.is_active || auth.is_admin())
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("OK", notice.into(), Some(Meta::empty())))
}

pub async fn create_notice(
    state: &AppState,
    auth: &AuthUser,
    payload: CreateNoticeRequest,
) -> AppResult<ApiResponse<Notice>> {
    ensure_admin(auth)?;
    let now = Utc::now();
    let notice = ActiveModel {
        id: Set(Uuid::new_v4()),
        title: Set(payload.title.trim().to_string()),
        content: Set(payload.content),
        is_pinned: Set(payload.is_pinned),
        is_active: Set(payload.is_active),
        created_by: Set(Some(auth.user_id)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        auth.user_id,
        "notice_create",
        "notices",
        serde_json::json!({ "notice_id": notice.id }),
    )
    .await;

    Ok(ApiResponse::success("Notice created", notice.into(), Some(Meta::empty())))
}

pub async fn update_notice(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdateNoticeRequest,
) -> AppResult<ApiResponse<Notice>> {
    ensure_admin(auth)?;
    let existing = Notices::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title.trim().to_string());
    }
    if let Some(content) = payload.content {
        active.content = Set(content);
    }
    if let Some(is_pinned) = payload.is_pinned {
        active.is_pinned = Set(is_pinned);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    active.updated_at = Set(Utc::now().into());
    let notice = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Notice updated", notice.into(), Some(Meta::empty())))
}

pub async fn delete_notice(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Notice>> {
    ensure_admin(auth)?;
    let existing = Notices::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    Notices::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        state,
        auth.user_id,
        "notice_delete",
        "notices",
        serde_json::json!({ "notice_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Notice deleted", existing.into(), Some(Meta::empty())))
}
