use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, put},
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::price_policies::{
        PriceMatrix, PricePolicyList, PricePolicyRequest, SavePriceResult,
        UpdatePricePolicyRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::PricePolicy,
    response::ApiResponse,
    routes::params::{Pagination, PricePolicyQuery},
    services::price_policy_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_policies).post(create_policy))
        .route("/upsert", put(save_price))
        .route("/matrix", get(price_matrix))
        .route("/{id}", put(update_policy).delete(delete_policy))
}

#[utoipa::path(
    get,
    path = "/api/price-policies",
    params(Pagination, PricePolicyQuery),
    responses(
        (status = 200, description = "List price overrides", body = ApiResponse<PricePolicyList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Price Policies"
)]
pub async fn list_policies(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<PricePolicyQuery>,
) -> AppResult<Json<ApiResponse<PricePolicyList>>> {
    let resp = price_policy_service::list_policies(&state, &user, query, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/price-policies",
    request_body = PricePolicyRequest,
    responses(
        (status = 201, description = "Create price override", body = ApiResponse<PricePolicy>),
        (status = 400, description = "Override already exists"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Price Policies"
)]
pub async fn create_policy(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PricePolicyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<PricePolicy>>)> {
    payload.validate()?;
    let resp = price_policy_service::create_policy(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    put,
    path = "/api/price-policies/{id}",
    params(("id" = Uuid, Path, description = "Price policy ID")),
    request_body = UpdatePricePolicyRequest,
    responses(
        (status = 200, description = "Update price override", body = ApiResponse<PricePolicy>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Price Policies"
)]
pub async fn update_policy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePricePolicyRequest>,
) -> AppResult<Json<ApiResponse<PricePolicy>>> {
    payload.validate()?;
    let resp = price_policy_service::update_policy(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/price-policies/{id}",
    params(("id" = Uuid, Path, description = "Price policy ID")),
    responses(
        (status = 200, description = "Delete price override", body = ApiResponse<PricePolicy>),
        (status = 404, description = "Not Found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Price Policies"
)]
pub async fn delete_policy(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PricePolicy>>> {
    let resp = price_policy_service::delete_policy(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/price-policies/upsert",
    request_body = PricePolicyRequest,
    responses(
        (status = 200, description = "Set or clear the override for a product and user", body = ApiResponse<SavePriceResult>),
        (status = 404, description = "Product or user not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Price Policies"
)]
pub async fn save_price(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<PricePolicyRequest>,
) -> AppResult<Json<ApiResponse<SavePriceResult>>> {
    payload.validate()?;
    let resp = price_policy_service::save_price(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/price-policies/matrix",
    responses(
        (status = 200, description = "Products by users price grid", body = ApiResponse<PriceMatrix>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Price Policies"
)]
pub async fn price_matrix(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<PriceMatrix>>> {
    let resp = price_policy_service::price_matrix(&state, &user).await?;
    Ok(Json(resp))
}
