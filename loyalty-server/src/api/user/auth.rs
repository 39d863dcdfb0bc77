use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use loyalty_sdk::objects::Credentials;
use uuid::Uuid;

use super::UserApiError;
use crate::api::extractors::session_cookie;
use crate::password::{hash_password_blocking, verify_password_blocking};
use crate::state::AppState;

fn parse_credentials(
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Credentials, UserApiError> {
    let Json(credentials) =
        body.map_err(|_| UserApiError::BadRequest("invalid credentials body"))?;
    if !credentials.is_complete() {
        return Err(UserApiError::BadRequest("login and password are required"));
    }
    Ok(credentials)
}

/// 200 with a fresh session cookie.
fn start_session(state: &AppState, user_id: Uuid) -> Response {
    let token = state.signer.issue(user_id);
    match session_cookie(&token) {
        Some(cookie) => (StatusCode::OK, [(header::SET_COOKIE, cookie)]).into_response(),
        None => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

/// `POST /register`: create an account and log it in.
pub(super) async fn register(
    state: State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, UserApiError> {
    let credentials = parse_credentials(body)?;
    let password_hash = hash_password_blocking(credentials.password).await?;

    let user_id = state
        .ledger
        .create_user(&credentials.login, &password_hash)
        .await?
        .ok_or(UserApiError::LoginTaken)?;

    tracing::info!(%user_id, "User registered");
    Ok(start_session(&state, user_id))
}

/// `POST /login`: verify credentials and start a session.
pub(super) async fn login(
    state: State<AppState>,
    body: Result<Json<Credentials>, JsonRejection>,
) -> Result<Response, UserApiError> {
    let credentials = parse_credentials(body)?;

    let user = state
        .ledger
        .get_user_by_login(&credentials.login)
        .await?
        .ok_or(UserApiError::InvalidCredentials)?;
    if !verify_password_blocking(credentials.password, user.password_hash).await? {
        return Err(UserApiError::InvalidCredentials);
    }

    Ok(start_session(&state, user.user_id))
}
