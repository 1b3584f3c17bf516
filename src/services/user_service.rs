use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit,
    domain::hierarchy::{DescendantWalk, OrderScope, build_forest, parent_role_allowed},
    dto::users::{
        BalanceAdjustRequest, BalanceTransactionList, CreateUserRequest, UpdateUserRequest,
        UserTree,
    },
    entity::{
        balance_transactions::{
            ActiveModel as TxActive, Column as TxCol, Entity as BalanceTransactions,
        },
        sea_orm_active_enums::Role,
        users::{ActiveModel as UserActive, Column as UserCol, Entity as Users, Model as UserModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_any},
    models::{BalanceTransaction, User},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::auth_service::hash_password,
    state::AppState,
};

pub async fn load_user<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<UserModel> {
    Users::find_by_id(id).one(conn).await?.ok_or(AppError::NotFound)
}

pub async fn direct_child_ids<C: ConnectionTrait>(conn: &C, parent: Uuid) -> AppResult<Vec<Uuid>> {
    let ids = Users::find()
        .select_only()
        .column(UserCol::Id)
        .filter(UserCol::ParentId.eq(parent))
        .into_tuple::<Uuid>()
        .all(conn)
        .await?;
    Ok(ids)
}

/// Every user below `root`, level by level, in discovery order. `root` itself is excluded.
pub async fn descendant_ids<C: ConnectionTrait>(conn: &C, root: Uuid) -> AppResult<Vec<Uuid>> {
    let mut walk = DescendantWalk::new(root);
    while !walk.is_done() {
        let children = Users::find()
            .select_only()
            .column(UserCol::Id)
            .filter(UserCol::ParentId.is_in(walk.frontier().to_vec()))
            .into_tuple::<Uuid>()
            .all(conn)
            .await?;
        walk.absorb(children);
    }
    Ok(walk.into_descendants())
}

/// The user followed by all of its descendants.
pub async fn all_order_user_ids<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> AppResult<Vec<Uuid>> {
    let mut ids = vec![user_id];
    ids.extend(descendant_ids(conn, user_id).await?);
    Ok(ids)
}

pub async fn order_scope<C: ConnectionTrait>(conn: &C, auth: &AuthUser) -> AppResult<OrderScope> {
    let scope = match auth.role {
        Role::Admin => OrderScope::All,
        Role::Manager => OrderScope::Users(all_order_user_ids(conn, auth.user_id).await?),
        Role::Agency => {
            let mut ids = vec![auth.user_id];
            ids.extend(direct_child_ids(conn, auth.user_id).await?);
            OrderScope::Users(ids)
        }
        Role::Seller => OrderScope::Users(vec![auth.user_id]),
    };
    Ok(scope)
}

/// Load a user the caller is allowed to administer. Out-of-reach users read as not found.
async fn load_managed_user<C: ConnectionTrait>(
    conn: &C,
    auth: &AuthUser,
    id: Uuid,
) -> AppResult<UserModel> {
    ensure_any(auth, &[Role::Admin, Role::Manager, Role::Agency])?;
    let target = load_user(conn, id).await?;
    let reachable = match auth.role {
        Role::Admin => true,
        Role::Manager => descendant_ids(conn, auth.user_id).await?.contains(&target.id),
        Role::Agency => target.parent_id == Some(auth.user_id),
        Role::Seller => false,
    };
    if !reachable {
        return Err(AppError::NotFound);
    }
    Ok(target)
}

/// Check that `parent` may sit above a user of `role`. `subject` is the user being
/// edited, when there is one, so it cannot be hung below itself.
async fn check_parent<C: ConnectionTrait>(
    conn: &C,
    role: Role,
    parent: Option<Uuid>,
    subject: Option<Uuid>,
) -> AppResult<()> {
    let Some(parent_id) = parent else {
        return Ok(());
    };
    if role == Role::Admin {
        return Err(AppError::BadRequest("An admin cannot have a parent".into()));
    }
    let parent = Users::find_by_id(parent_id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::BadRequest("Parent user does not exist".into()))?;
    if !parent_role_allowed(role, parent.role) {
        return Err(AppError::BadRequest(format!(
            "A {} cannot be placed under a {}",
            role.as_str(),
            parent.role.as_str()
        )));
    }
    if let Some(subject) = subject {
        if parent_id == subject || descendant_ids(conn, subject).await?.contains(&parent_id) {
            return Err(AppError::BadRequest(
                "A user cannot be placed under itself or its own descendant".into(),
            ));
        }
    }
    Ok(())
}

pub async fn list_users(state: &AppState, auth: &AuthUser) -> AppResult<ApiResponse<UserTree>> {
    ensure_any(auth, &[Role::Admin, Role::Manager, Role::Agency])?;

    let mut finder = Users::find().filter(UserCol::IsActive.eq(true));
    finder = match auth.role {
        Role::Admin => finder,
        Role::Manager => {
            finder.filter(UserCol::Id.is_in(descendant_ids(&state.orm, auth.user_id).await?))
        }
        _ => finder.filter(UserCol::ParentId.eq(auth.user_id)),
    };

    let users: Vec<User> = finder
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();
    let total = users.len() as i64;

    Ok(ApiResponse::success(
        "OK",
        UserTree {
            items: build_forest(users),
        },
        Some(Meta::unpaged(total)),
    ))
}

pub async fn create_user(
    state: &AppState,
    auth: &AuthUser,
    payload: CreateUserRequest,
) -> AppResult<ApiResponse<User>> {
    ensure_any(auth, &[Role::Admin, Role::Manager, Role::Agency])?;

    let username = payload.username.trim().to_string();
    if username.is_empty() {
        return Err(AppError::BadRequest("Username is required".into()));
    }
    let taken = Users::find()
        .filter(UserCol::Username.eq(username.as_str()))
        .count(&state.orm)
        .await?;
    if taken > 0 {
        return Err(AppError::BadRequest("Username is already taken".into()));
    }

    let (role, parent_id) = match auth.role {
        Role::Manager => (Role::Agency, Some(auth.user_id)),
        Role::Agency => (Role::Seller, Some(auth.user_id)),
        _ => {
            let role = payload
                .role
                .ok_or_else(|| AppError::BadRequest("Role is required".into()))?;
            (role, payload.parent_id)
        }
    };
    check_parent(&state.orm, role, parent_id, None).await?;

    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username),
        password_hash: Set(hash_password(&payload.password)?),
        role: Set(role),
        parent_id: Set(parent_id),
        balance: Set(0),
        company_name: Set(payload.company_name),
        contact_name: Set(payload.contact_name),
        phone: Set(payload.phone),
        is_active: Set(true),
        created_at: NotSet,
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user created");
    audit::record(
        state,
        auth.user_id,
        "user_create",
        "users",
        serde_json::json!({ "user_id": user.id, "role": user.role }),
    )
    .await;

    Ok(ApiResponse::success("User created", user.into(), Some(Meta::empty())))
}

pub async fn get_user(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    let user = if id == auth.user_id {
        load_user(&state.orm, id).await?
    } else {
        load_managed_user(&state.orm, auth, id).await?
    };
    Ok(ApiResponse::success("OK", user.into(), Some(Meta::empty())))
}

pub async fn update_user(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: UpdateUserRequest,
) -> AppResult<ApiResponse<User>> {
    let target = load_managed_user(&state.orm, auth, id).await?;

    if !auth.is_admin() && (payload.role.is_some() || payload.parent_id.is_some()) {
        return Err(AppError::Forbidden);
    }

    let role = payload.role.unwrap_or(target.role);
    let parent_id = payload.parent_id.unwrap_or(target.parent_id);
    if role != target.role || parent_id != target.parent_id {
        check_parent(&state.orm, role, parent_id, Some(target.id)).await?;
    }
    if role != target.role {
        let children = Users::find()
            .filter(UserCol::ParentId.eq(target.id))
            .all(&state.orm)
            .await?;
        if children.iter().any(|c| !parent_role_allowed(c.role, role)) {
            return Err(AppError::BadRequest(format!(
                "Existing subordinates cannot report to a {}",
                role.as_str()
            )));
        }
    }

    let mut active: UserActive = target.into();
    active.role = Set(role);
    active.parent_id = Set(parent_id);
    if let Some(password) = payload.password.as_deref().filter(|p| !p.is_empty()) {
        active.password_hash = Set(hash_password(password)?);
    }
    if let Some(company_name) = payload.company_name {
        active.company_name = Set(company_name);
    }
    if let Some(contact_name) = payload.contact_name {
        active.contact_name = Set(contact_name);
    }
    if let Some(phone) = payload.phone {
        active.phone = Set(phone);
    }
    if let Some(is_active) = payload.is_active {
        active.is_active = Set(is_active);
    }
    let user = active.update(&state.orm).await?;

    audit::record(
        state,
        auth.user_id,
        "user_update",
        "users",
        serde_json::json!({ "user_id": user.id }),
    )
    .await;

    Ok(ApiResponse::success("User updated", user.into(), Some(Meta::empty())))
}

pub async fn delete_user(state: &AppState, auth: &AuthUser, id: Uuid) -> AppResult<ApiResponse<User>> {
    if id == auth.user_id {
        return Err(AppError::BadRequest("You cannot delete yourself".into()));
    }
    let target = load_managed_user(&state.orm, auth, id).await?;
    Users::delete_by_id(target.id).exec(&state.orm).await?;

    tracing::info!(user_id = %target.id, "user deleted");
    audit::record(
        state,
        auth.user_id,
        "user_delete",
        "users",
        serde_json::json!({ "user_id": target.id, "username": target.username }),
    )
    .await;

    Ok(ApiResponse::success("User deleted", target.into(), Some(Meta::empty())))
}

pub async fn adjust_balance(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    payload: BalanceAdjustRequest,
) -> AppResult<ApiResponse<BalanceTransaction>> {
    ensure_admin(auth)?;
    if payload.amount <= 0 {
        return Err(AppError::BadRequest("Amount must be positive".into()));
    }

    let txn = state.orm.begin().await?;
    let user = Users::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let balance_after = payload
        .amount
        .checked_mul(payload.tx_type.sign())
        .and_then(|delta| user.balance.checked_add(delta))
        .ok_or_else(|| AppError::BadRequest("Balance out of range".into()))?;
    if balance_after < 0 {
        return Err(AppError::BadRequest("Insufficient balance".into()));
    }

    let mut active: UserActive = user.into();
    active.balance = Set(balance_after);
    active.update(&txn).await?;

    let entry = TxActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(id),
        tx_type: Set(payload.tx_type),
        amount: Set(payload.amount),
        balance_after: Set(balance_after),
        order_id: Set(None),
        description: Set(payload.description),
        created_by: Set(Some(auth.user_id)),
        created_at: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    txn.commit().await?;

    tracing::info!(user_id = %id, amount = entry.amount, balance_after, "balance adjusted");
    audit::record(
        state,
        auth.user_id,
        "balance_adjust",
        "balance_transactions",
        serde_json::json!({ "user_id": id, "transaction_id": entry.id }),
    )
    .await;

    Ok(ApiResponse::success("Balance updated", entry.into(), Some(Meta::empty())))
}

pub async fn list_balance_transactions(
    state: &AppState,
    auth: &AuthUser,
    id: Uuid,
    pagination: Pagination,
) -> AppResult<ApiResponse<BalanceTransactionList>> {
    if !order_scope(&state.orm, auth).await?.covers(id) {
        return Err(AppError::NotFound);
    }

    let (page, limit, offset) = pagination.normalize();
    let finder = BalanceTransactions::find()
        .filter(TxCol::UserId.eq(id))
        .order_by_desc(TxCol::CreatedAt);
    let total = finder.clone().count(&state.orm).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(BalanceTransaction::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        BalanceTransactionList { items },
        Some(Meta::new(page, limit, total)),
    ))
}
