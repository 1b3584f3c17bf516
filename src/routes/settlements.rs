use axum::{
    Json, Router,
    extract::{Query, State},
    http::HeaderMap,
    routing::get,
};

use crate::{
    dto::settlements::{ReductionReport, SettlementList},
    error::AppResult,
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::{Pagination, SettlementQuery},
    services::settlement_service,
    state::AppState,
};

pub const SETTLEMENT_PASSWORD_HEADER: &str = "x-settlement-password";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(settlement_list))
        .route("/reduction", get(reduction_analysis))
}

#[utoipa::path(
    get,
    path = "/api/settlements",
    params(Pagination, SettlementQuery),
    responses(
        (status = 200, description = "Confirmed orders in the window with totals", body = ApiResponse<SettlementList>),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Settlements"
)]
pub async fn settlement_list(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<SettlementQuery>,
) -> AppResult<Json<ApiResponse<SettlementList>>> {
    let resp = settlement_service::settlement_list(&state, &user, query, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/settlements/reduction",
    params(
        SettlementQuery,
        ("x-settlement-password" = Option<String>, Header, description = "Second password guarding the report"),
    ),
    responses(
        (status = 200, description = "Profit on the reduced share of confirmed orders", body = ApiResponse<ReductionReport>),
        (status = 401, description = "Wrong settlement password"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Settlements"
)]
pub async fn reduction_analysis(
    State(state): State<AppState>,
    user: AuthUser,
    headers: HeaderMap,
    Query(query): Query<SettlementQuery>,
) -> AppResult<Json<ApiResponse<ReductionReport>>> {
    let password = headers
        .get(SETTLEMENT_PASSWORD_HEADER)
        .and_then(|value| value.to_str().ok());
    let resp = settlement_service::reduction_analysis(&state, &user, query, password).await?;
    Ok(Json(resp))
}
