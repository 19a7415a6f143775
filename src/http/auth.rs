use crate::domain::model::User;
use crate::http::AppState;
use crate::utils::error::{AppError, Result};
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;

const KEYWORD: &str = "Token";

/// 解析 `Authorization: Token <key>`。
///
/// 其他 scheme 或沒有 header 時視為匿名；`required` 為 true 時回 401。
pub async fn resolve_user(
    state: &AppState,
    headers: &HeaderMap,
    required: bool,
) -> Result<Option<User>> {
    let header = match headers.get(AUTHORIZATION) {
        Some(value) => value.to_str().map_err(|_| {
            AppError::authentication_failed(
                "Invalid token header. Token string should not contain invalid characters.",
            )
        })?,
        None => return anonymous(required),
    };

    let mut parts = header.split_whitespace();
    match parts.next() {
        Some(scheme) if scheme.eq_ignore_ascii_case(KEYWORD) => {}
        _ => return anonymous(required),
    }

    let key = match (parts.next(), parts.next()) {
        (Some(key), None) => key,
        (None, _) => {
            return Err(AppError::authentication_failed(
                "Invalid token header. No credentials provided.",
            ))
        }
        (Some(_), Some(_)) => {
            return Err(AppError::authentication_failed(
                "Invalid token header. Token string should not contain spaces.",
            ))
        }
    };

    state.users.user_for_token(key).await.map(Some)
}

fn anonymous(required: bool) -> Result<Option<User>> {
    if required {
        Err(AppError::NotAuthenticated)
    } else {
        Ok(None)
    }
}

/// 管理頁面用：必須是 staff
pub struct StaffUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for StaffUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let user = resolve_user(state, &parts.headers, true)
            .await?
            .ok_or(AppError::NotAuthenticated)?;

        if !(user.is_active && user.is_staff) {
            return Err(AppError::permission_denied(
                "You do not have permission to perform this action.",
            ));
        }
        Ok(StaffUser(user))
    }
}
