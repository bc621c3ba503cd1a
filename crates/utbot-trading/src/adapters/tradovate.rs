//! Tradovate REST adapter.
//!
//! Implements the [`Broker`] contract over the Tradovate demo/live REST
//! API: `auth/accesstokenrequest`, `account/list`, `md/bars`,
//! `order/placeorder`, `order/liquidateposition`. The coordinator never
//! sees any of these payloads.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use utbot_core::{Bar, BarSeries, Symbol, UtcDateTime};

use crate::broker::{
    AccountId, AuthOutcome, Broker, BrokerError, Credential, OrderSide, VerificationTicket,
};
use crate::http_client::{HttpClient, HttpRequest, HttpResponse, DEFAULT_TIMEOUT};

/// Broker adapter for the Tradovate REST API.
pub struct TradovateBroker {
    http_client: Arc<dyn HttpClient>,
    base_url: String,
    username: String,
    password: String,
    timeout: Duration,
}

impl TradovateBroker {
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            http_client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            username: username.into(),
            password: password.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, BrokerError> {
        let response = self.http_client.execute(request).await?;

        if response.status == 401 || response.status == 403 {
            return Err(BrokerError::authentication_failed(format!(
                "brokerage rejected the credential (status {})",
                response.status
            )));
        }
        if !response.is_success() {
            return Err(BrokerError::unavailable(format!(
                "brokerage returned status {}",
                response.status
            )));
        }

        Ok(response)
    }

    async fn request_access_token(
        &self,
        body: serde_json::Value,
    ) -> Result<AccessTokenPayload, BrokerError> {
        let request = HttpRequest::post(self.endpoint("auth/accesstokenrequest"))
            .with_json_body(&body)
            .with_timeout(self.timeout);

        let response = self.execute(request).await?;
        parse_json(&response.body, "access token response")
    }
}

impl Broker for TradovateBroker {
    fn authenticate<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<AuthOutcome, BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            let body = json!({
                "name": self.username,
                "password": self.password,
                "appId": "UTBot",
                "appVersion": "1.0",
                "cid": 0,
                "sec": "",
            });

            let payload = self.request_access_token(body).await?;

            if let Some(token) = payload.access_token {
                return Ok(AuthOutcome::Authenticated(Credential::new(token)));
            }
            if let Some(ticket) = payload.p_ticket {
                return Ok(AuthOutcome::PendingVerification(VerificationTicket::new(
                    ticket,
                )));
            }

            Err(BrokerError::authentication_failed(
                payload
                    .error_text
                    .unwrap_or_else(|| String::from("no access token in response")),
            ))
        })
    }

    fn complete_verification<'a>(
        &'a self,
        ticket: &'a VerificationTicket,
        code: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Credential, BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            let body = json!({
                "name": self.username,
                "password": self.password,
                "appId": "UTBot",
                "appVersion": "1.0",
                "cid": 0,
                "sec": "",
                "p-ticket": ticket.as_str(),
                "p-code": code,
            });

            let payload = self.request_access_token(body).await?;

            match payload.access_token {
                Some(token) => Ok(Credential::new(token)),
                None => Err(BrokerError::authentication_failed(
                    payload
                        .error_text
                        .unwrap_or_else(|| String::from("verification code rejected")),
                )),
            }
        })
    }

    fn list_accounts<'a>(
        &'a self,
        credential: &'a Credential,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<AccountId>, BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            let request = HttpRequest::get(self.endpoint("account/list"))
                .with_bearer(credential.token())
                .with_timeout(self.timeout);

            let response = self.execute(request).await?;
            let accounts: Vec<AccountPayload> = parse_json(&response.body, "account list")?;

            Ok(accounts
                .into_iter()
                .map(|account| AccountId(account.id))
                .collect())
        })
    }

    fn recent_bars<'a>(
        &'a self,
        credential: &'a Credential,
        symbol: &'a Symbol,
        count: usize,
    ) -> Pin<Box<dyn Future<Output = Result<BarSeries, BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            if count == 0 {
                return Err(BrokerError::invalid_request(
                    "bar count must be greater than zero",
                ));
            }

            let url = format!(
                "{}?symbol={}&count={count}",
                self.endpoint("md/bars"),
                urlencoding::encode(symbol.as_str()),
            );
            let request = HttpRequest::get(url)
                .with_bearer(credential.token())
                .with_timeout(self.timeout);

            let response = self.execute(request).await?;
            let payload: Vec<BarPayload> = parse_json(&response.body, "bar history")?;

            let mut bars = Vec::with_capacity(payload.len());
            for raw in payload {
                let ts = UtcDateTime::parse(&raw.timestamp).map_err(|error| {
                    BrokerError::invalid_response(format!("bad bar timestamp: {error}"))
                })?;
                let bar = Bar::new(ts, raw.open, raw.high, raw.low, raw.close).map_err(
                    |error| BrokerError::invalid_response(format!("bad bar: {error}")),
                )?;
                bars.push(bar);
            }

            BarSeries::new(symbol.clone(), bars)
                .map_err(|error| BrokerError::invalid_response(format!("bad bar order: {error}")))
        })
    }

    fn place_market_order<'a>(
        &'a self,
        credential: &'a Credential,
        account: AccountId,
        symbol: &'a Symbol,
        side: OrderSide,
        qty: u32,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            let body = json!({
                "accountId": account.0,
                "action": side.as_str(),
                "symbol": symbol.as_str(),
                "orderQty": qty,
                "orderType": "Market",
                "isAutomated": true,
            });
            let request = HttpRequest::post(self.endpoint("order/placeorder"))
                .with_bearer(credential.token())
                .with_json_body(&body)
                .with_timeout(self.timeout);

            let response = self.execute(request).await?;
            let result: OrderResultPayload = parse_json(&response.body, "order result")?;

            if result.order_id.is_some() {
                return Ok(());
            }

            Err(BrokerError::order_rejected(
                result
                    .failure_text
                    .or(result.failure_reason)
                    .unwrap_or_else(|| String::from("order was not accepted")),
            ))
        })
    }

    fn liquidate_position<'a>(
        &'a self,
        credential: &'a Credential,
        account: AccountId,
        symbol: &'a Symbol,
    ) -> Pin<Box<dyn Future<Output = Result<(), BrokerError>> + Send + 'a>> {
        Box::pin(async move {
            let body = json!({
                "accountId": account.0,
                "symbol": symbol.as_str(),
                "isAutomated": true,
            });
            let request = HttpRequest::post(self.endpoint("order/liquidateposition"))
                .with_bearer(credential.token())
                .with_json_body(&body)
                .with_timeout(self.timeout);

            // Liquidating a flat position succeeds upstream; any 2xx is done.
            self.execute(request).await.map(|_| ())
        })
    }
}

fn parse_json<T: serde::de::DeserializeOwned>(
    body: &str,
    context: &str,
) -> Result<T, BrokerError> {
    serde_json::from_str(body)
        .map_err(|error| BrokerError::invalid_response(format!("bad {context}: {error}")))
}

#[derive(Debug, Deserialize)]
struct AccessTokenPayload {
    #[serde(rename = "accessToken")]
    access_token: Option<String>,
    #[serde(rename = "p-ticket")]
    p_ticket: Option<String>,
    #[serde(rename = "errorText")]
    error_text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountPayload {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct BarPayload {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
}

#[derive(Debug, Deserialize)]
struct OrderResultPayload {
    #[serde(rename = "orderId")]
    order_id: Option<i64>,
    #[serde(rename = "failureReason")]
    failure_reason: Option<String>,
    #[serde(rename = "failureText")]
    failure_text: Option<String>,
}
