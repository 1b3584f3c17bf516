use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use uuid::Uuid;

use crate::{
    audit,
    domain::pricing::MAX_UNIT_PRICE,
    dto::price_policies::{
        MatrixCell, MatrixProduct, MatrixRow, PriceMatrix, PricePolicyList, PricePolicyRequest,
        SavePriceResult, UpdatePricePolicyRequest,
    },
    entity::{
        categories::Entity as Categories,
        price_policies::{ActiveModel, Column, Entity as PricePolicies, Model as PolicyModel},
        products::{Column as ProdCol, Entity as Products},
        sea_orm_active_enums::Role,
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{PricePolicy, User},
    response::{ApiResponse, Meta},
    routes::params::{Pagination, PricePolicyQuery},
    services::user_service::descendant_ids,
    state::AppState,
};

fn check_terms(price: Option<i64>, reduction_rate: Option<i32>) -> AppResult<()> {
    if price.is_some_and(|p| !(0..=MAX_UNIT_PRICE).contains(&p)) {
        return Err(AppError::BadRequest(format!(
            "Price must be between 0 and {MAX_UNIT_PRICE}"
        )));
    }
    if reduction_rate.is_some_and(|r| !(0..=100).contains(&r)) {
        return Err(AppError::BadRequest("Reduction rate must be between 0 and 100".into()));
    }
    Ok(())
}

async fn ensure_pair_exists(state: &AppState, product_id: Uuid, user_id: Uuid) -> AppResult<()> {
    Products::find_by_id(product_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("Product does not exist".into()))?;
    Users::find_by_id(user_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::BadRequest("User does not exist".into()))?;
    Ok(())
}

async fn find_pair(state: &AppState, product_id: Uuid, user_id: Uuid) -> AppResult<Option<PolicyModel>> {
    let policy = PricePolicies::find()
        .filter(Column::ProductId.eq(product_id))
        .filter(Column::UserId.eq(user_id))
        .one(&state.orm)
        .await?;
    Ok(policy)
}

pub async fn list_policies(
    state: &AppState,
    auth: &AuthUser,
    query: PricePolicyQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<PricePolicyList>> {
    ensure_admin(auth)?;
    let (page, limit, offset) = pagination.normalize();

    let mut condition = Condition::all();
    if let Some(product_id) = query.product_id {
        condition = condition.add(Column::ProductId.eq(product_id));
    }
    if let Some(user_id) = query.user_id {
        condition = condition.add(Column::UserId.eq(user_id));
    }

    let finder = PricePolicies::find()
        .filter(condition)
        .order_by_desc(Column::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(PricePolicy::from)
        .collect();

    Ok(ApiResponse::success(
        "Price policies",
        PricePolicyList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn create_policy(
    state: &AppState,
    auth: &AuthUser,
    payload: PricePolicyRequest,
) -> AppResult<ApiResponse<PricePolicy>> {
    ensure_admin(auth)?;
    check_terms(payload.price, payload.reduction_rate)?;
    ensure_pair_exists(state, payload.product_id, payload.user_id).await?;
    if find_pair(state, payload.product_id, payload.user_id).await?.is_some() {
        return Err(AppError::BadRequest(
            "A price policy for this product and user already exists".into(),
        ));
    }

    let policy = ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(payload.product_id),
        user_id: Set(payload.user_id),
        price: Set(payload.price),
        reduction_rate: Set(payload.reduction_rate),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    audit::record(
        state,
        auth.user_id,
        "price_policy_create",
        "price_policies",
        serde_json::json!({ "policy_id": policy.id }),
    )
    .await;

    Ok(ApiResponse::success("Price policy created", policy.into(), Some(Meta::empty())))
}

pub async fn update_policy(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdatePricePolicyRequest,
) -> AppResult<ApiResponse<PricePolicy>> {
    ensure_admin(auth)?;
    check_terms(payload.price, payload.reduction_rate)?;
    let existing = PricePolicies::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: ActiveModel = existing.into();
    active.price = Set(payload.price);
    active.reduction_rate = Set(payload.reduction_rate);
    let policy = active.update(&state.orm).await?;

    Ok(ApiResponse::success("Price policy updated", policy.into(), Some(Meta::empty())))
}

pub async fn delete_policy(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PricePolicy>> {
    ensure_admin(auth)?;
    let existing = PricePolicies::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;
    PricePolicies::delete_by_id(id).exec(&state.orm).await?;

    audit::record(
        state,
        auth.user_id,
        "price_policy_delete",
        "price_policies",
        serde_json::json!({ "policy_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Price policy deleted", existing.into(), Some(Meta::empty())))
}

/// Upsert one matrix cell. Clearing both values removes the override.
pub async fn save_price(
    state: &AppState,
    auth: &AuthUser,
    payload: PricePolicyRequest,
) -> AppResult<ApiResponse<SavePriceResult>> {
    ensure_admin(auth)?;
    ensure_pair_exists(state, payload.product_id, payload.user_id).await?;
    let existing = find_pair(state, payload.product_id, payload.user_id).await?;

    if payload.price.is_none() && payload.reduction_rate.is_none() {
        if let Some(existing) = existing {
            PricePolicies::delete_by_id(existing.id).exec(&state.orm).await?;
        }
        return Ok(ApiResponse::success(
            "Price policy removed",
            SavePriceResult {
                deleted: true,
                policy: None,
            },
            Some(Meta::empty()),
        ));
    }

    check_terms(payload.price, payload.reduction_rate)?;
    let policy = match existing {
        Some(existing) => {
            let mut active: ActiveModel = existing.into();
            active.price = Set(payload.price);
            active.reduction_rate = Set(payload.reduction_rate);
            active.update(&state.orm).await?
        }
        None => {
            ActiveModel {
                id: Set(Uuid::new_v4()),
                product_id: Set(payload.product_id),
                user_id: Set(payload.user_id),
                price: Set(payload.price),
                reduction_rate: Set(payload.reduction_rate),
                created_at: NotSet,
            }
            .insert(&state.orm)
            .await?
        }
    };

    tracing::debug!(product_id = %policy.product_id, user_id = %policy.user_id, "price saved");
    Ok(ApiResponse::success(
        "Price policy saved",
        SavePriceResult {
            deleted: false,
            policy: Some(policy.into()),
        },
        Some(Meta::empty()),
    ))
}

/// Overrides for every agency and seller below the caller, against every active product.
pub async fn price_matrix(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<PriceMatrix>> {
    ensure_admin(auth)?;

    let mut products = Products::find()
        .filter(ProdCol::IsActive.eq(true))
        .find_also_related(Categories)
        .all(&state.orm)
        .await?;
    // uncategorised products sort last, as NULLs do in an ascending Postgres sort
    products.sort_by_key(|(p, c)| {
        let order = c.as_ref().map(|c| c.display_order);
        (order.is_none(), order.unwrap_or_default(), p.name.clone())
    });

    let scope = descendant_ids(&state.orm, auth.user_id).await?;
    let mut users = Users::find()
        .filter(UserCol::Id.is_in(scope))
        .filter(UserCol::Role.is_in([Role::Agency, Role::Seller]))
        .filter(UserCol::IsActive.eq(true))
        .all(&state.orm)
        .await?;
    users.sort_by_key(|u| (u.role.rank(), u.company_name.clone()));

    let user_ids: Vec<Uuid> = users.iter().map(|u| u.id).collect();
    let policies: HashMap<(Uuid, Uuid), PolicyModel> = if user_ids.is_empty() {
        HashMap::new()
    } else {
        PricePolicies::find()
            .filter(Column::UserId.is_in(user_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| ((p.product_id, p.user_id), p))
            .collect()
    };

    let rows = users
        .into_iter()
        .map(|user| {
            let cells: Vec<MatrixCell> = products
                .iter()
                .map(|(product, _)| {
                    let policy = policies.get(&(product.id, user.id));
                    MatrixCell {
                        product_id: product.id,
                        price: policy.and_then(|p| p.price),
                        reduction_rate: policy.and_then(|p| p.reduction_rate),
                    }
                })
                .collect();
            let configured_count = cells
                .iter()
                .filter(|c| c.price.is_some() || c.reduction_rate.is_some())
                .count();
            MatrixRow {
                user: User::from(user),
                configured_count,
                cells,
            }
        })
        .collect();

    let products = products
        .into_iter()
        .map(|(p, _)| MatrixProduct {
            id: p.id,
            name: p.name,
            category_id: p.category_id,
            base_price: p.base_price,
            reduction_rate: p.reduction_rate,
        })
        .collect();

    Ok(ApiResponse::success(
        "Price matrix",
        PriceMatrix { products, rows },
        Some(Meta::empty()),
    ))
}
