use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use uuid::Uuid;

use crate::{
    audit,
    domain::pricing::{MAX_UNIT_PRICE, effective_reduction_rate, unit_price_for},
    dto::products::{
        CreateProductRequest, PricedProduct, ProductList, ProductSchemaResponse,
        UpdateProductRequest,
    },
    entity::{
        orders::{Column as OrderCol, Entity as Orders},
        price_policies::{Column as PolicyCol, Entity as PricePolicies, Model as PolicyModel},
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{Pagination, ProductQuery},
    state::AppState,
};

async fn policy_for<C: ConnectionTrait>(
    conn: &C,
    product_id: Uuid,
    user_id: Uuid,
) -> AppResult<Option<PolicyModel>> {
    let policy = PricePolicies::find()
        .filter(PolicyCol::ProductId.eq(product_id))
        .filter(PolicyCol::UserId.eq(user_id))
        .one(conn)
        .await?;
    Ok(policy)
}

/// The user's policies for the given products, keyed by product id.
pub async fn policies_by_product<C: ConnectionTrait>(
    conn: &C,
    user_id: Uuid,
    product_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, PolicyModel>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let policies = PricePolicies::find()
        .filter(PolicyCol::UserId.eq(user_id))
        .filter(PolicyCol::ProductId.is_in(product_ids))
        .all(conn)
        .await?;
    Ok(policies.into_iter().map(|p| (p.product_id, p)).collect())
}

fn price_with(product: &ProductModel, auth: &AuthUser, policy: Option<&PolicyModel>) -> i64 {
    unit_price_for(
        product.cost_price,
        product.base_price,
        auth.is_admin(),
        policy.and_then(|p| p.price),
    )
}

pub async fn get_user_price<C: ConnectionTrait>(
    conn: &C,
    product: &ProductModel,
    auth: &AuthUser,
) -> AppResult<i64> {
    let policy = policy_for(conn, product.id, auth.user_id).await?;
    Ok(price_with(product, auth, policy.as_ref()))
}

/// Unit price and reduction rate for one user, read with a single policy lookup.
pub async fn user_terms<C: ConnectionTrait>(
    conn: &C,
    product: &ProductModel,
    auth: &AuthUser,
) -> AppResult<(i64, i32)> {
    let policy = policy_for(conn, product.id, auth.user_id).await?;
    let price = price_with(product, auth, policy.as_ref());
    let rate = effective_reduction_rate(
        product.reduction_rate,
        policy.as_ref().and_then(|p| p.reduction_rate),
    );
    Ok((price, rate))
}

/// Attach each product's per-user price and hide cost from non-admins.
pub async fn price_products<C: ConnectionTrait>(
    conn: &C,
    auth: &AuthUser,
    products: Vec<ProductModel>,
) -> AppResult<Vec<PricedProduct>> {
    let policies =
        policies_by_product(conn, auth.user_id, products.iter().map(|p| p.id).collect()).await?;
    Ok(products
        .into_iter()
        .map(|model| {
            let price = price_with(&model, auth, policies.get(&model.id));
            let product = Product::from(model);
            PricedProduct {
                product: if auth.is_admin() {
                    product
                } else {
                    product.without_cost()
                },
                price,
            }
        })
        .collect())
}

/// Products visible to the caller: admins see inactive ones too.
pub async fn load_visible_product<C: ConnectionTrait>(
    conn: &C,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ProductModel> {
    Products::find_by_id(id)
        .one(conn)
        .await?
        .filter(|p| p.is_active || auth.is_admin())
        .ok_or(AppError::NotFound)
}

/// `ILIKE` pattern matching `search` anywhere, with its own wildcards taken literally.
fn contains_pattern(search: &str) -> String {
    let escaped = search
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

fn check_product_rules(product: &ProductModel) -> AppResult<()> {
    if product.min_work_days < 1 || product.min_work_days > product.max_work_days {
        return Err(AppError::BadRequest(
            "Work days must satisfy 1 <= min_work_days <= max_work_days".into(),
        ));
    }
    if !(0..=100).contains(&product.reduction_rate) {
        return Err(AppError::BadRequest("Reduction rate must be between 0 and 100".into()));
    }
    let price_range = 0..=MAX_UNIT_PRICE;
    if !price_range.contains(&product.cost_price) || !price_range.contains(&product.base_price) {
        return Err(AppError::BadRequest(format!(
            "Prices must be between 0 and {MAX_UNIT_PRICE}"
        )));
    }
    product.schema.check().map_err(AppError::BadRequest)
}

pub async fn list_products(
    state: &AppState,
    auth: &AuthUser,
    query: ProductQuery,
    pagination: Pagination,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = pagination.normalize();
    let mut condition = Condition::all();
    if !auth.is_admin() {
        condition = condition.add(Column::IsActive.eq(true));
    }
    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }
    if let Some(search) = query.q.as_ref().map(|s| s.trim()).filter(|s| !s.is_empty()) {
        condition = condition.add(Expr::col(Column::Name).ilike(contains_pattern(search)));
    }

    let finder = Products::find()
        .filter(condition)
        .order_by_asc(Column::Name);
    let total = finder.clone().count(&state.orm).await? as i64;
    let products = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let items = price_products(&state.orm, auth, products).await?;
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_product(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<PricedProduct>> {
    let product = load_visible_product(&state.orm, auth, id).await?;
    let mut priced = price_products(&state.orm, auth, vec![product]).await?;
    let item = priced.pop().ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", item, Some(Meta::empty())))
}

pub async fn product_schema(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<ProductSchemaResponse>> {
    let product = load_visible_product(&state.orm, auth, id).await?;
    let price = get_user_price(&state.orm, &product, auth).await?;
    Ok(ApiResponse::success(
        "OK",
        ProductSchemaResponse {
            product_id: product.id,
            name: product.name,
            description: product.description,
            schema: product.schema,
            price,
            min_work_days: product.min_work_days,
            max_work_days: product.max_work_days,
        },
        Some(Meta::empty()),
    ))
}

pub async fn create_product(
    state: &AppState,
    auth: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(auth)?;
    let now = Utc::now();
    let product = ProductModel {
        id: Uuid::new_v4(),
        category_id: payload.category_id,
        name: payload.name.trim().to_string(),
        description: payload.description,
        cost_price: payload.cost_price,
        base_price: payload.base_price,
        schema: payload.schema,
        min_work_days: payload.min_work_days,
        max_work_days: payload.max_work_days,
        reduction_rate: payload.reduction_rate,
        is_active: payload.is_active,
        created_at: now.into(),
        updated_at: now.into(),
    };
    check_product_rules(&product)?;
    let active: ActiveModel = product.into();
    let product = active.reset_all().insert(&state.orm).await?;

    tracing::info!(product_id = %product.id, "product created");
    audit::record(
        state,
        auth.user_id,
        "product_create",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success("Product created", product.into(), Some(Meta::empty())))
}

pub async fn update_product(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(auth)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut product = existing;
    if let Some(category_id) = payload.category_id {
        product.category_id = category_id;
    }
    if let Some(name) = payload.name {
        product.name = name.trim().to_string();
    }
    if let Some(description) = payload.description {
        product.description = description;
    }
    if let Some(cost_price) = payload.cost_price {
        product.cost_price = cost_price;
    }
    if let Some(base_price) = payload.base_price {
        product.base_price = base_price;
    }
    if let Some(schema) = payload.schema {
        product.schema = schema;
    }
    if let Some(min_work_days) = payload.min_work_days {
        product.min_work_days = min_work_days;
    }
    if let Some(max_work_days) = payload.max_work_days {
        product.max_work_days = max_work_days;
    }
    if let Some(reduction_rate) = payload.reduction_rate {
        product.reduction_rate = reduction_rate;
    }
    if let Some(is_active) = payload.is_active {
        product.is_active = is_active;
    }
    product.updated_at = Utc::now().into();
    check_product_rules(&product)?;

    let mut active: ActiveModel = product.into();
    active = active.reset_all();
    active.created_at = NotSet;
    let product = active.update(&state.orm).await?;

    audit::record(
        state,
        auth.user_id,
        "product_update",
        "products",
        serde_json::json!({ "product_id": product.id }),
    )
    .await;

    Ok(ApiResponse::success("Product updated", product.into(), Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(auth)?;
    let existing = Products::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or(AppError::NotFound)?;

    let order_count = Orders::find()
        .filter(OrderCol::ProductId.eq(id))
        .count(&state.orm)
        .await?;
    if order_count > 0 {
        return Err(AppError::BadRequest(
            "Product has orders and cannot be deleted; deactivate it instead".into(),
        ));
    }

    Products::delete_by_id(id).exec(&state.orm).await?;
    audit::record(
        state,
        auth.user_id,
        "product_delete",
        "products",
        serde_json::json!({ "product_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Product deleted", existing.into(), Some(Meta::empty())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_wildcards_are_literal() {
        assert_eq!(contains_pattern("blog"), "%blog%");
        assert_eq!(contains_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn product_rules_cap_prices() {
        let now = Utc::now();
        let mut product = ProductModel {
            id: Uuid::new_v4(),
            category_id: None,
            name: "Blog Review Post".into(),
            description: String::new(),
            cost_price: 700,
            base_price: 1000,
            schema: Default::default(),
            min_work_days: 1,
            max_work_days: 3,
            reduction_rate: 20,
            is_active: true,
            created_at: now.into(),
            updated_at: now.into(),
        };
        assert!(check_product_rules(&product).is_ok());
        product.base_price = MAX_UNIT_PRICE + 1;
        assert!(matches!(check_product_rules(&product), Err(AppError::BadRequest(_))));
    }
}
