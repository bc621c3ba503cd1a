//! HTTP surface.
//!
//! Four routes: a health probe, the TradingView-style webhook, the
//! verification-code endpoint, and an authentication self-test. Every
//! mutating route checks the shared secret before touching any state,
//! and no response ever carries the brokerage credential.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use utbot_trading::{Coordinator, Instruction, SessionManager, TradingError};

#[derive(Clone)]
pub struct AppState {
    pub coordinator: Arc<Coordinator>,
    pub session: Arc<SessionManager>,
    pub webhook_secret: String,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health))
        .route("/webhook", post(webhook))
        .route("/verify", post(verify))
        .route("/test-auth", get(test_auth))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    #[serde(default)]
    secret: String,
    action: String,
    // TradingView alerts include these; the configured symbol and
    // quantity are authoritative, so they are accepted and ignored.
    #[serde(default)]
    #[allow(dead_code)]
    symbol: Option<String>,
    #[serde(default)]
    #[allow(dead_code)]
    qty: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyPayload {
    #[serde(default)]
    secret: String,
    code: String,
}

async fn health(State(state): State<AppState>) -> Response {
    let position = state.coordinator.state().await;
    Json(json!({ "status": "ok", "position": position })).into_response()
}

async fn webhook(State(state): State<AppState>, Json(payload): Json<WebhookPayload>) -> Response {
    if payload.secret != state.webhook_secret {
        warn!("webhook rejected: bad secret");
        return error_response(StatusCode::UNAUTHORIZED, "invalid secret");
    }

    let Some(instruction) = Instruction::parse(&payload.action) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            &format!("unknown action '{}'", payload.action),
        );
    };

    info!(action = %payload.action, "webhook instruction accepted");
    match state.coordinator.handle_instruction(instruction).await {
        Ok(report) => Json(json!({ "status": "ok", "result": report })).into_response(),
        Err(error) => trading_error_response(error),
    }
}

async fn verify(State(state): State<AppState>, Json(payload): Json<VerifyPayload>) -> Response {
    if payload.secret != state.webhook_secret {
        warn!("verification rejected: bad secret");
        return error_response(StatusCode::UNAUTHORIZED, "invalid secret");
    }

    match state.session.submit_verification_code(&payload.code).await {
        Ok(()) => Json(json!({ "status": "ok" })).into_response(),
        Err(error) => trading_error_response(error),
    }
}

async fn test_auth(State(state): State<AppState>) -> Response {
    match state.session.credential().await {
        Ok(_) => Json(json!({ "status": "ok", "authenticated": true })).into_response(),
        Err(error) => trading_error_response(error),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "status": "error", "error": message }))).into_response()
}

fn trading_error_response(error: TradingError) -> Response {
    let status = match &error {
        TradingError::PendingVerification { .. } => StatusCode::CONFLICT,
        TradingError::NoPendingVerification => StatusCode::BAD_REQUEST,
        TradingError::AuthenticationFailed { .. }
        | TradingError::OrderExecution { .. }
        | TradingError::NoAccount
        | TradingError::Broker(_) => StatusCode::BAD_GATEWAY,
        TradingError::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(%error, "request failed");
    error_response(status, &error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use utbot_core::{BarSeries, Symbol};
    use utbot_trading::{
        AccountId, AuthOutcome, Broker, BrokerError, Credential, OrderSide, VerificationTicket,
    };

    struct StubBroker {
        orders: AtomicUsize,
        liquidations: AtomicUsize,
    }

    impl StubBroker {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                orders: AtomicUsize::new(0),
                liquidations: AtomicUsize::new(0),
            })
        }
    }

    impl Broker for StubBroker {
        fn authenticate<'a>(
            &'a self,
        ) -> Pin<Box<dyn Future<Output = Result<AuthOutcome, BrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(AuthOutcome::Authenticated(Credential::new("token"))) })
        }

        fn complete_verification<'a>(
            &'a self,
            _ticket: &'a VerificationTicket,
            _code: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<Credential, BrokerError>> + Send + 'a>> {
            Box::pin(async { Ok(Credential::new("token")) })
        }

        fn list_accounts<'a>(
            &'a self,
            _credential: &'a Credential,
        ) -> Pin<Box<dyn Future<Output = Result<Vec<AccountId>, BrokerError>> + Send + 'a>>
        {
            Box::pin(async { Ok(vec![AccountId(7)]) })
        }

        fn recent_bars<'a>(
            &'a self,
            _credential: &'a Credential,
            symbol: &'a Symbol,
            _count: usize,
        ) -> Pin<Box<dyn Future<Output = Result<BarSeries, BrokerError>> + Send + 'a>> {
            let symbol = symbol.clone();
            Box::pin(async move {
                BarSeries::new(symbol, Vec::new())
                    .map_err(|error| BrokerError::invalid_response(error.to_string()))
            })
        }

        fn place_market_order<'a>(
            &'a self,
            _credential: &'a Credential,
            _account: AccountId,
            _symbol: &'a Symbol,
            _side: OrderSide,
            _qty: u32,
        ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>> {
            self.orders.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }

        fn liquidate_position<'a>(
            &'a self,
            _credential: &'a Credential,
            _account: AccountId,
            _symbol: &'a Symbol,
        ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>> {
            self.liquidations.fetch_add(1, Ordering::SeqCst);
            Box::pin(async { Ok(()) })
        }
    }

    fn state_with(broker: Arc<StubBroker>) -> AppState {
        let session = Arc::new(SessionManager::new(broker.clone()));
        let symbol = Symbol::parse("MESM6").expect("valid symbol");
        let coordinator = Arc::new(
            Coordinator::new(broker, session.clone(), symbol, 1)
                .with_settle_delay(std::time::Duration::ZERO),
        );
        AppState {
            coordinator,
            session,
            webhook_secret: String::from("s3cret"),
        }
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body readable");
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn bad_secret_is_unauthorized_and_touches_nothing() {
        let broker = StubBroker::new();
        let state = state_with(broker.clone());

        let payload = WebhookPayload {
            secret: String::from("wrong"),
            action: String::from("buy"),
            symbol: None,
            qty: None,
        };
        let response = webhook(State(state), Json(payload)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(broker.orders.load(Ordering::SeqCst), 0);
        assert_eq!(broker.liquidations.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn unknown_action_is_a_bad_request() {
        let state = state_with(StubBroker::new());

        let payload = WebhookPayload {
            secret: String::from("s3cret"),
            action: String::from("hold"),
            symbol: None,
            qty: None,
        };
        let response = webhook(State(state), Json(payload)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].as_str().expect("message").contains("hold"));
    }

    #[tokio::test]
    async fn buy_webhook_opens_a_long_position() {
        let broker = StubBroker::new();
        let state = state_with(broker.clone());

        let payload = WebhookPayload {
            secret: String::from("s3cret"),
            action: String::from("long"),
            symbol: Some(String::from("IGNORED")),
            qty: Some(99),
        };
        let response = webhook(State(state.clone()), Json(payload)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["result"]["state"], "long");
        assert_eq!(broker.orders.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn health_reports_the_position() {
        let state = state_with(StubBroker::new());
        let response = health(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["position"], "flat");
    }

    #[tokio::test]
    async fn verify_without_pending_ticket_is_a_bad_request() {
        let state = state_with(StubBroker::new());

        let payload = VerifyPayload {
            secret: String::from("s3cret"),
            code: String::from("424242"),
        };
        let response = verify(State(state), Json(payload)).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_auth_confirms_a_working_session_without_the_token() {
        let state = state_with(StubBroker::new());
        let response = test_auth(State(state)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["authenticated"], true);
        assert!(!body.to_string().contains("token"));
    }
}
