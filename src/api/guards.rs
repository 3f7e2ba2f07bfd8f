use async_trait::async_trait;
use axum::extract::{FromRequestParts, State};
use axum::http::{header, request::Parts};

use crate::api::errors::ApiError;
use crate::core::{security, state::AppState};
use crate::db::models::User;
use crate::db::types::UserRole;
use crate::repositories;
use crate::services::errors::DomainError;

/// Verified caller identity. The token is minted by the out-of-scope auth
/// layer; roles and branch scope come from the user row, not the token.
pub(crate) struct CurrentUser(pub(crate) User);

pub(crate) struct CurrentStaff(pub(crate) User);

pub(crate) struct CurrentStudent(pub(crate) User);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let State(app_state) = State::<AppState>::from_request_parts(parts, state)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to access application state"))?;

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or(ApiError::Unauthorized("Invalid authentication credentials"))?;

        let claims = security::verify_token(token, app_state.settings())
            .map_err(|_| ApiError::Unauthorized("Invalid authentication credentials"))?;

        let user = repositories::users::find_by_id(app_state.db(), &claims.sub)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load user"))?;

        let Some(user) = user else {
            return Err(ApiError::Unauthorized("User not found"));
        };

        if !user.is_active {
            return Err(ApiError::Unauthorized("Invalid authentication credentials"));
        }

        Ok(CurrentUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStaff {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        if user.role.is_staff() {
            Ok(CurrentStaff(user))
        } else {
            Err(ApiError::Forbidden("Staff access required".to_string()))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentStudent {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;

        match user.role {
            UserRole::Student | UserRole::NewStudent => Ok(CurrentStudent(user)),
            _ => Err(ApiError::Forbidden("Student access required".to_string())),
        }
    }
}

/// Staff may only touch resources in their own branch; superadmin crosses
/// branches freely.
pub(crate) fn require_branch_scope(user: &User, branch_id: &str) -> Result<(), ApiError> {
    if user.role == UserRole::SuperAdmin {
        return Ok(());
    }

    match user.branch_id.as_deref() {
        Some(own) if own == branch_id => Ok(()),
        _ => Err(DomainError::Scope("Resource is outside your branch").into()),
    }
}

/// The staff member's own branch, required for branch-scoped creation.
pub(crate) fn own_branch(user: &User) -> Result<&str, ApiError> {
    user.branch_id
        .as_deref()
        .ok_or_else(|| DomainError::Scope("No branch scope assigned to this account").into())
}
