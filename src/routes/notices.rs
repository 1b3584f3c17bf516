use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::dashboard::{CreateNoticeRequest, NoticeList, UpdateNoticeRequest},
    error::AppResult,
    middleware::auth::AuthUser,
    models::Notice,
    response::ApiResponse,
    routes::params::Pagination,
    services::notice_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notices).post(create_notice))
        .route(
            "/{id}",
            get(get_notice).put(update_notice).delete(delete_notice),
        )
}

#[utoipa::path(
    get,
    path = "/api/notices",
    params(Pagination),
    responses((status = 200, description = "Pinned notices first, then newest", body = ApiResponse<NoticeList>)),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn list_notices(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<NoticeList>>> {
    let resp = notice_service::list_notices(&state, &user, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice ID")),
    responses(
        (status = 200, description = "Get notice", body = ApiResponse<Notice>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn get_notice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notice>>> {
    let resp = notice_service::get_notice(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/notices",
    request_body = CreateNoticeRequest,
    responses(
        (status = 201, description = "Publish a notice", body = ApiResponse<Notice>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn create_notice(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateNoticeRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Notice>>)> {
    payload.validate()?;
    let resp = notice_service::create_notice(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice ID")),
    request_body = UpdateNoticeRequest,
    responses(
        (status = 200, description = "Update notice", body = ApiResponse<Notice>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn update_notice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateNoticeRequest>,
) -> AppResult<Json<ApiResponse<Notice>>> {
    payload.validate()?;
    let resp = notice_service::update_notice(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/notices/{id}",
    params(("id" = Uuid, Path, description = "Notice ID")),
    responses(
        (status = 200, description = "Delete notice", body = ApiResponse<Notice>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Dashboard"
)]
pub async fn delete_notice(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Notice>>> {
    let resp = notice_service::delete_notice(&state, &user, id).await?;
    Ok(Json(resp))
}
