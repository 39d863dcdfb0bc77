//! User API handlers.
//!
//! Registration and login are public; everything else requires the session
//! cookie verified by [`AuthenticatedUser`](crate::api::extractors::AuthenticatedUser).
//!
//! # Endpoints
//!
//! - `POST /register`          – create an account and start a session
//! - `POST /login`             – start a session
//! - `POST /orders`            – submit an order number (plain-text body)
//! - `GET  /orders`            – list submitted orders
//! - `GET  /balance`           – current and withdrawn points
//! - `POST /balance/withdraw`  – spend points on an order
//! - `GET  /withdrawals`       – list withdrawals

use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use loyalty_core::ledger::LedgerError;

use crate::password::HashError;
use crate::state::AppState;

mod auth;
mod balance;
mod orders;

/// Build the User API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route(
            "/orders",
            post(orders::submit_order).get(orders::list_orders),
        )
        .route("/balance", get(balance::get_balance))
        .route("/balance/withdraw", post(balance::withdraw))
        .route("/withdrawals", get(balance::list_withdrawals))
}

// ---------------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------------

/// Errors that can occur in User API handlers.
#[derive(Debug)]
enum UserApiError {
    /// The ledger failed.
    Ledger(LedgerError),
    /// Password hashing failed.
    Hash(HashError),
    /// The request body is malformed.
    BadRequest(&'static str),
    /// Registration with a login that is taken.
    LoginTaken,
    /// Unknown login or wrong password.
    InvalidCredentials,
}

impl From<LedgerError> for UserApiError {
    fn from(err: LedgerError) -> Self {
        UserApiError::Ledger(err)
    }
}

impl From<HashError> for UserApiError {
    fn from(err: HashError) -> Self {
        UserApiError::Hash(err)
    }
}

impl IntoResponse for UserApiError {
    fn into_response(self) -> Response {
        match self {
            UserApiError::Ledger(e) => {
                tracing::error!(error = %e, "Ledger error in User API");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            UserApiError::Hash(e) => {
                tracing::error!(error = %e, "Password hashing error in User API");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error").into_response()
            }
            UserApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, message).into_response()
            }
            UserApiError::LoginTaken => {
                (StatusCode::CONFLICT, "login is already taken").into_response()
            }
            UserApiError::InvalidCredentials => {
                (StatusCode::UNAUTHORIZED, "invalid login or password").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::server::build_router;
    use crate::state::AppState;
    use axum::Router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use axum::response::Response;
    use loyalty_core::ledger::{LedgerStore, MemoryLedger};
    use loyalty_sdk::objects::{BalanceResponse, OrderResponse, OrderStatus, WithdrawalResponse};
    use loyalty_sdk::signature::SessionSigner;
    use rust_decimal::Decimal;
    use std::sync::Arc;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        ledger: Arc<MemoryLedger>,
    }

    impl TestApp {
        fn new() -> Self {
            let ledger = Arc::new(MemoryLedger::new());
            let state = AppState::new(ledger.clone(), SessionSigner::new(b"test-session-secret"));
            Self {
                router: build_router(state),
                ledger,
            }
        }

        async fn send(&self, request: Request<Body>) -> Response {
            self.router.clone().oneshot(request).await.unwrap()
        }

        async fn register(&self, login: &str, password: &str) -> Response {
            self.send(json_request(
                "/api/user/register",
                None,
                format!(r#"{{"login":"{login}","password":"{password}"}}"#),
            ))
            .await
        }

        async fn session(&self, login: &str) -> String {
            let response = self.register(login, "secret").await;
            assert_eq!(response.status(), StatusCode::OK);
            session_of(&response)
        }
    }

    fn session_of(response: &Response) -> String {
        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        cookie.split(';').next().unwrap().to_string()
    }

    fn json_request(uri: &str, session: Option<&str>, body: String) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(session) = session {
            builder = builder.header(header::COOKIE, session);
        }
        builder.body(Body::from(body)).unwrap()
    }

    fn text_request(uri: &str, session: &str, body: &str) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "text/plain")
            .header(header::COOKIE, session)
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get_request(uri: &str, session: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, session)
            .body(Body::empty())
            .unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: Response) -> T {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let app = TestApp::new();

        assert_eq!(app.register("alice", "secret").await.status(), StatusCode::OK);
        assert_eq!(
            app.register("alice", "other").await.status(),
            StatusCode::CONFLICT
        );

        let missing = app
            .send(json_request(
                "/api/user/register",
                None,
                r#"{"login":"bob"}"#.to_string(),
            ))
            .await;
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);

        let empty = app.register("", "secret").await;
        assert_eq!(empty.status(), StatusCode::BAD_REQUEST);

        let wrong = app
            .send(json_request(
                "/api/user/login",
                None,
                r#"{"login":"alice","password":"nope"}"#.to_string(),
            ))
            .await;
        assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);

        let unknown = app
            .send(json_request(
                "/api/user/login",
                None,
                r#"{"login":"carol","password":"secret"}"#.to_string(),
            ))
            .await;
        assert_eq!(unknown.status(), StatusCode::UNAUTHORIZED);

        let ok = app
            .send(json_request(
                "/api/user/login",
                None,
                r#"{"login":"alice","password":"secret"}"#.to_string(),
            ))
            .await;
        assert_eq!(ok.status(), StatusCode::OK);
        let session = session_of(&ok);
        let balance = app.send(get_request("/api/user/balance", &session)).await;
        assert_eq!(balance.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_protected_routes_need_session() {
        let app = TestApp::new();
        let anonymous = Request::get("/api/user/orders").body(Body::empty()).unwrap();
        assert_eq!(app.send(anonymous).await.status(), StatusCode::UNAUTHORIZED);

        let forged = get_request("/api/user/balance", "user_id=not.a.session");
        assert_eq!(app.send(forged).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_order_submission_statuses() {
        let app = TestApp::new();
        let alice = app.session("alice").await;
        let bob = app.session("bob").await;

        let cases = [
            (&alice, "12345678903", StatusCode::ACCEPTED),
            (&alice, "12345678903", StatusCode::OK),
            (&bob, "12345678903", StatusCode::CONFLICT),
            (&alice, "12345678904", StatusCode::UNPROCESSABLE_ENTITY),
            (&alice, "1234abc", StatusCode::UNPROCESSABLE_ENTITY),
            (&alice, "   ", StatusCode::BAD_REQUEST),
        ];
        for (session, number, expected) in cases {
            let response = app
                .send(text_request("/api/user/orders", session, number))
                .await;
            assert_eq!(response.status(), expected, "order {number:?}");
        }
    }

    #[tokio::test]
    async fn test_order_listing() {
        let app = TestApp::new();
        let alice = app.session("alice").await;

        let empty = app.send(get_request("/api/user/orders", &alice)).await;
        assert_eq!(empty.status(), StatusCode::NO_CONTENT);

        app.send(text_request("/api/user/orders", &alice, "79927398713\n"))
            .await;
        let listed = app.send(get_request("/api/user/orders", &alice)).await;
        assert_eq!(listed.status(), StatusCode::OK);
        let orders: Vec<OrderResponse> = json_body(listed).await;
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].number, "79927398713");
        assert_eq!(orders[0].status, OrderStatus::New);
        assert_eq!(orders[0].accrual, None);
    }

    #[tokio::test]
    async fn test_withdraw_flow() {
        let app = TestApp::new();
        let alice = app.session("alice").await;
        let user_id = app
            .ledger
            .get_user_by_login("alice")
            .await
            .unwrap()
            .unwrap()
            .user_id;

        let broke = app
            .send(json_request(
                "/api/user/balance/withdraw",
                Some(&alice),
                r#"{"order":"2377225624","sum":10}"#.to_string(),
            ))
            .await;
        assert_eq!(broke.status(), StatusCode::PAYMENT_REQUIRED);

        let none = app.send(get_request("/api/user/withdrawals", &alice)).await;
        assert_eq!(none.status(), StatusCode::NO_CONTENT);

        app.ledger.credit(user_id, Decimal::from(100)).await;

        let paid = app
            .send(json_request(
                "/api/user/balance/withdraw",
                Some(&alice),
                r#"{"order":"2377225624","sum":42.5}"#.to_string(),
            ))
            .await;
        assert_eq!(paid.status(), StatusCode::OK);

        let duplicate = app
            .send(json_request(
                "/api/user/balance/withdraw",
                Some(&alice),
                r#"{"order":"2377225624","sum":1}"#.to_string(),
            ))
            .await;
        assert_eq!(duplicate.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let bad_number = app
            .send(json_request(
                "/api/user/balance/withdraw",
                Some(&alice),
                r#"{"order":"2377225625","sum":1}"#.to_string(),
            ))
            .await;
        assert_eq!(bad_number.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let balance: BalanceResponse =
            json_body(app.send(get_request("/api/user/balance", &alice)).await).await;
        assert_eq!(balance.current, Decimal::new(575, 1));
        assert_eq!(balance.withdrawn, Decimal::new(425, 1));

        let history = app.send(get_request("/api/user/withdrawals", &alice)).await;
        assert_eq!(history.status(), StatusCode::OK);
        let history: Vec<WithdrawalResponse> = json_body(history).await;
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].order, "2377225624");
        assert_eq!(history[0].sum, Decimal::new(425, 1));
    }

    #[tokio::test]
    async fn test_health() {
        let app = TestApp::new();
        let response = app
            .send(Request::get("/health").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
