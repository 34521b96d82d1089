//! Auth routes: email access-code sign-in and session management.

use axum::extract::{FromRef, State};
use axum::response::{IntoResponse, Json};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use onboarding::ApiResponse;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::routes::error::{ApiError, ApiResult, ok};
use crate::routes::extract::ApiJson;
use crate::services::email_auth::{self, EmailAuthError};
use crate::services::mailer;
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

fn session_cookie(token: String, secure: bool, ttl_hours: i32) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::hours(i64::from(ttl_hours)))
        .build()
}

fn cleared_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(Duration::ZERO)
        .build()
}

fn email_auth_error(e: EmailAuthError) -> ApiError {
    match e {
        EmailAuthError::InvalidEmail | EmailAuthError::InvalidCode => ApiError::bad_request(e.to_string()),
        EmailAuthError::VerificationFailed => ApiError::new(axum::http::StatusCode::UNAUTHORIZED, e.to_string()),
        EmailAuthError::Db(e) => ApiError::internal(&e),
    }
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: SessionUser,
    pub token: String,
}

impl<S> axum::extract::FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(ApiError::unauthorized());
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await
            .map_err(|e| ApiError::internal(&e))?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Self { user, token: token.to_owned() })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct RequestCodeBody {
    pub email: String,
}

#[derive(Serialize)]
pub struct RequestCodeResponse {
    pub sent: bool,
}

/// `POST /api/auth/email/request-code`: email a sign-in code.
///
/// Answers the same way whether or not the address belongs to a user.
pub async fn request_email_code(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<RequestCodeBody>,
) -> ApiResult<RequestCodeResponse> {
    let issued = email_auth::request_access_code(&state.pool, &body.email)
        .await
        .map_err(email_auth_error)?;

    if let Some((email, code)) = issued {
        if state.mailer.is_none() {
            tracing::debug!(%email, %code, "email delivery disabled; login code not sent");
        }
        let message = mailer::login_code_email(&email, &code);
        if let Err(e) = mailer::deliver(&state.pool, state.transport(), &message).await {
            tracing::warn!(error = %e, "login code delivery failed");
        }
    } else {
        tracing::info!("login code requested for unknown email");
    }

    ok(RequestCodeResponse { sent: true })
}

#[derive(Deserialize)]
pub struct VerifyCodeBody {
    pub email: String,
    pub code: String,
}

/// `POST /api/auth/email/verify-code`: exchange a code for a session cookie.
pub async fn verify_email_code(
    State(state): State<AppState>,
    jar: CookieJar,
    ApiJson(body): ApiJson<VerifyCodeBody>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = email_auth::verify_access_code(&state.pool, &body.email, &body.code)
        .await
        .map_err(email_auth_error)?;

    let token = session::create_session(&state.pool, user_id, state.config.session_ttl_hours)
        .await
        .map_err(|e| ApiError::internal(&e))?;
    let user = session::validate_session(&state.pool, &token)
        .await
        .map_err(|e| ApiError::internal(&e))?
        .ok_or_else(ApiError::unauthorized)?;

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "user signed in");
    let jar = jar.add(session_cookie(token, state.config.cookie_secure, state.config.session_ttl_hours));
    Ok((jar, Json(ApiResponse::ok(user))))
}

/// `GET /api/auth/me`: return current user.
pub async fn me(auth: AuthUser) -> ApiResult<SessionUser> {
    ok(auth.user)
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, jar: CookieJar, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, "session delete failed");
    }
    let jar = jar.add(cleared_cookie(state.config.cookie_secure));
    (jar, Json(ApiResponse::ok(())))
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
