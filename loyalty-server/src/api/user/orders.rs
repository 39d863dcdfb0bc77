use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use loyalty_core::entities::orders::OrderRecord;
use loyalty_core::ledger::{self, SubmitOutcome};
use loyalty_sdk::objects::OrderResponse;

use super::UserApiError;
use crate::api::extractors::AuthenticatedUser;
use crate::state::AppState;

/// Convert an `OrderRecord` (DB model) into an `OrderResponse` (API model).
fn to_response(record: OrderRecord) -> OrderResponse {
    OrderResponse {
        number: record.order_id,
        status: record.status.into(),
        accrual: record.accrual,
        uploaded_at: record.uploaded_at,
    }
}

/// `POST /orders`: submit an order number for accrual.
///
/// 202 for a new order, 200 when this user already submitted it, 409 when
/// another user did, 422 when the number fails the Luhn check.
pub(super) async fn submit_order(
    state: State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    body: String,
) -> Result<StatusCode, UserApiError> {
    let number = body.trim();
    if number.is_empty() {
        return Err(UserApiError::BadRequest("order number is required"));
    }

    let outcome = ledger::submit_order(state.ledger.as_ref(), user_id, number).await?;
    let status = match outcome {
        SubmitOutcome::Created => {
            tracing::info!(%user_id, order_id = number, "Order accepted for accrual");
            StatusCode::ACCEPTED
        }
        SubmitOutcome::AlreadyOwned => StatusCode::OK,
        SubmitOutcome::OwnedByAnotherUser => StatusCode::CONFLICT,
        SubmitOutcome::InvalidNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
    };
    Ok(status)
}

/// `GET /orders`: the user's orders, newest first; 204 when there are none.
pub(super) async fn list_orders(
    state: State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Response, UserApiError> {
    let orders = state.ledger.get_user_orders(user_id).await?;
    if orders.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }
    let orders: Vec<OrderResponse> = orders.into_iter().map(to_response).collect();
    Ok(Json(orders).into_response())
}
