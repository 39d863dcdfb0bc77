use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_core::entities::withdrawals::WithdrawalRecord;
use loyalty_core::ledger::{self, WithdrawOutcome};
use loyalty_sdk::objects::{BalanceResponse, WithdrawRequest, WithdrawalResponse};

use super::UserApiError;
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;

fn to_response(record: WithdrawalRecord) -> WithdrawalResponse {
    WithdrawalResponse {
        order: record.order_id,
        sum: record.amount,
        processed_at: record.processed_at,
    }
}

/// `GET /balance`
pub(super) async fn get_balance(
    state: State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<BalanceResponse>, UserApiError> {
    let balance = state.ledger.get_balance(user_id).await?;
    Ok(Json(BalanceResponse {
        current: balance.current,
        withdrawn: balance.withdrawn,
    }))
}

/// `POST /balance/withdraw`: spend points on an order.
///
/// 402 when the balance is too low; 422 for a bad order number, a
/// non-positive sum, or an order that was already paid with points.
pub(super) async fn withdraw(
    state: State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: Result<Json<WithdrawRequest>, JsonRejection>,
) -> Result<StatusCode, UserApiError> {
    let Json(request) = body.map_err(|_| UserApiError::BadRequest("invalid withdrawal body"))?;

    let outcome =
        ledger::withdraw(state.ledger.as_ref(), user_id, &request.order, request.sum).await?;
    let status = match outcome {
        WithdrawOutcome::Withdrawn => {
            tracing::info!(%user_id, order_id = %request.order, sum = %request.sum, "Points withdrawn");
            StatusCode::OK
        }
        WithdrawOutcome::InsufficientFunds => StatusCode::PAYMENT_REQUIRED,
        WithdrawOutcome::DuplicateDebit
        | WithdrawOutcome::InvalidNumber(_)
        | WithdrawOutcome::InvalidAmount => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok(status)
}

/// `GET /withdrawals`: newest first; 204 when there are none.
pub(super) async fn list_withdrawals(
    state: State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, UserApiError> {
    let withdrawals = state.ledger.get_user_withdrawals(user_id).await?;
    if withdrawals.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let withdrawals: Vec<WithdrawalResponse> = withdrawals.into_iter().map(to_response).collect();
    Ok(Json(withdrawals).into_response())
}
