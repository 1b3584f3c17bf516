use axum::{extract::FromRequestParts, http::header};
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::{ConnectionTrait, EntityTrait};
use uuid::Uuid;

use crate::{
    dto::auth::Claims,
    entity::{sea_orm_active_enums::Role, users::Entity as Users},
    error::AppError,
    state::AppState,
};

/// Caller identity decoded from the bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

pub fn ensure_any(user: &AuthUser, roles: &[Role]) -> Result<(), AppError> {
    if !roles.contains(&user.role) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

pub fn ensure_admin(user: &AuthUser) -> Result<(), AppError> {
    ensure_any(user, &[Role::Admin])
}

/// Current identity behind a token subject. The role comes from the user row, so
/// demotions apply at once; deactivated or deleted users are refused.
pub async fn resolve_user<C: ConnectionTrait>(conn: &C, user_id: Uuid) -> Result<AuthUser, AppError> {
    let user = Users::find_by_id(user_id)
        .one(conn)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| AppError::Unauthorized("Account is no longer active".into()))?;
    Ok(AuthUser {
        user_id: user.id,
        role: user.role,
    })
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

        let auth_str = auth_header
            .to_str()
            .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

        let token = auth_str
            .strip_prefix("Bearer ")
            .map(str::trim)
            .ok_or_else(|| AppError::Unauthorized("Invalid Authorization scheme".into()))?;

        let decoded = decode::<Claims>(
            token,
            &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

        let user_id = Uuid::parse_str(&decoded.claims.sub)
            .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

        resolve_user(&state.orm, user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_guards() {
        let seller = AuthUser {
            user_id: Uuid::new_v4(),
            role: Role::Seller,
        };
        assert!(ensure_admin(&seller).is_err());
        assert!(ensure_any(&seller, &[Role::Agency, Role::Seller]).is_ok());
        assert!(!seller.is_admin());
    }
}
