//! HTTP routes and handlers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Query, Request, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

use currencies_common::{Currency, ErrorKind, Rejection};
use currencies_fx::{FxEngine, FxError, FxResult, OpenExchangeRatesProvider};

use crate::config::{ErrorStatusPolicy, ServerConfig};
use crate::metrics::{Endpoint, Metrics, SharedMetrics};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<FxEngine>,
    pub metrics: SharedMetrics,
    pub error_status: ErrorStatusPolicy,
}

impl AppState {
    pub fn new(engine: Arc<FxEngine>, error_status: ErrorStatusPolicy) -> Self {
        Self {
            engine,
            metrics: Arc::new(Metrics::new()),
            error_status,
        }
    }

    /// Wire the provider client, asset table and engine described by `config`.
    pub fn from_config(config: &ServerConfig) -> FxResult<Self> {
        let provider = OpenExchangeRatesProvider::new(config.provider_config())?;
        let assets = config.load_assets()?;
        let engine = FxEngine::new(Arc::new(provider), assets, config.engine_config());

        Ok(Self::new(Arc::new(engine), config.error_status))
    }
}

/// Build the service router.
pub fn router(state: AppState, metrics_enabled: bool) -> Router {
    let mut router = Router::new()
        .route("/rates", get(get_rates))
        .route("/exchange", get(get_exchange));

    if metrics_enabled {
        router = router.route("/metrics", get(get_metrics));
    }

    router
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

/// Reasons a request is refused.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing query parameter: {0}")]
    MissingParameter(&'static str),

    #[error(transparent)]
    Fx(#[from] FxError),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::MissingParameter(_) => ErrorKind::BadRequest,
            ApiError::Fx(e) => e.kind(),
        }
    }

    pub fn status(&self, policy: ErrorStatusPolicy) -> StatusCode {
        match (self.kind(), policy) {
            (ErrorKind::UpstreamFailure, ErrorStatusPolicy::ByKind) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    pub fn rejection(&self) -> Rejection {
        let message = self.to_string();
        match self {
            ApiError::MissingParameter(field) => {
                Rejection::with_field("MISSING_PARAMETER", message, *field)
            }
            ApiError::Fx(FxError::InvalidAmount(_)) | ApiError::Fx(FxError::AmountOutOfRange(_)) => {
                Rejection::with_field(self.code(), message, "amount")
            }
            ApiError::Fx(FxError::TooFewCurrencies { .. })
            | ApiError::Fx(FxError::EmptyCurrencyCode)
            | ApiError::Fx(FxError::UnknownCurrency(_)) => {
                Rejection::with_field(self.code(), message, "currencies")
            }
            ApiError::Fx(e) => Rejection::new(e.error_code(), message),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter(_) => "MISSING_PARAMETER",
            ApiError::Fx(e) => e.error_code(),
        }
    }
}

impl AppState {
    /// Log, count and render a failed request.
    fn reject(&self, err: ApiError) -> Response {
        let kind = err.kind();
        match kind {
            ErrorKind::UpstreamFailure => error!(error = %err, "failed to get latest rates"),
            ErrorKind::BadRequest => debug!(error = %err, "request rejected"),
        }
        self.metrics.request_failed(kind);

        (err.status(self.error_status), Json(err.rejection())).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct RatesQuery {
    pub currencies: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ExchangeQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
}

/// Treat absent and blank parameters alike.
fn required(value: Option<String>, name: &'static str) -> Result<String, ApiError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or(ApiError::MissingParameter(name))
}

async fn get_rates(State(state): State<AppState>, Query(query): Query<RatesQuery>) -> Response {
    state.metrics.request_received(Endpoint::Rates);

    let currencies = match required(query.currencies, "currencies") {
        Ok(raw) => Currency::parse_list(&raw),
        Err(e) => return state.reject(e),
    };

    match state.engine.cross_rates(&currencies).await {
        Ok(rates) => {
            state.metrics.rates_served(rates.len());
            Json(rates).into_response()
        }
        Err(e) => state.reject(e.into()),
    }
}

async fn get_exchange(State(state): State<AppState>, Query(query): Query<ExchangeQuery>) -> Response {
    state.metrics.request_received(Endpoint::Exchange);

    let params = required(query.from, "from").and_then(|from| {
        let to = required(query.to, "to")?;
        let amount = required(query.amount, "amount")?;
        Ok((Currency::new(from), Currency::new(to), amount))
    });
    let (from, to, amount) = match params {
        Ok(params) => params,
        Err(e) => return state.reject(e),
    };

    match state.engine.convert(&from, &to, &amount) {
        Ok(result) => {
            state.metrics.conversion_served();
            Json(result).into_response()
        }
        Err(e) => state.reject(e.into()),
    }
}

async fn get_metrics(State(state): State<AppState>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.to_prometheus(),
    )
}

/// Access log with a per-request id, echoed in `x-request-id`.
async fn log_requests(request: Request, next: Next) -> Response {
    let request_id = Uuid::now_v7();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let span = info_span!("request", %request_id, %method, %path);
    let mut response = next.run(request).instrument(span.clone()).await;

    let status = response.status().as_u16();
    let latency_ms = started.elapsed().as_millis() as u64;
    span.in_scope(|| info!(status, latency_ms, "request completed"));

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request as HttpRequest;
    use currencies_fx::{AssetRegistry, FxEngineConfig, MockRateProvider, UnknownCurrencyPolicy};
    use serde_json::Value;
    use tower::ServiceExt;

    struct TestApp {
        router: Router,
        provider: Arc<MockRateProvider>,
        metrics: SharedMetrics,
    }

    fn setup(error_status: ErrorStatusPolicy, policy: UnknownCurrencyPolicy) -> TestApp {
        let provider = Arc::new(MockRateProvider::new("test"));
        provider.set_rate("EUR", 1.2);
        provider.set_rate("GBP", 1.5);

        let config = FxEngineConfig {
            unknown_currency_policy: policy,
        };
        let engine = FxEngine::new(provider.clone(), AssetRegistry::builtin(), config);
        let state = AppState::new(Arc::new(engine), error_status);
        let metrics = state.metrics.clone();

        TestApp {
            router: router(state, true),
            provider,
            metrics,
        }
    }

    fn default_app() -> TestApp {
        setup(ErrorStatusPolicy::Uniform, UnknownCurrencyPolicy::Reject)
    }

    async fn get(router: &Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .clone()
            .oneshot(HttpRequest::get(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn rate(rows: &Value, from: &str, to: &str) -> f64 {
        rows.as_array()
            .unwrap()
            .iter()
            .find(|r| r["from"] == from && r["to"] == to)
            .and_then(|r| r["rate"].as_f64())
            .unwrap()
    }

    #[tokio::test]
    async fn test_rates_valid_request() {
        let app = default_app();

        let (status, body) = get(&app.router, "/rates?currencies=USD,EUR,GBP").await;

        assert_eq!(status, StatusCode::OK);
        let rows = body.as_array().unwrap();
        assert_eq!(rows.len(), 6);
        assert!(rows.iter().all(|r| r["from"] != r["to"]));
        assert!((rate(&body, "USD", "EUR") - 1.2).abs() < 1e-4);
        assert!((rate(&body, "USD", "GBP") - 1.5).abs() < 1e-4);
        assert!((rate(&body, "EUR", "GBP") - 1.5 / 1.2).abs() < 1e-4);
        assert!((rate(&body, "GBP", "EUR") - 1.2 / 1.5).abs() < 1e-4);
        assert_eq!(app.metrics.snapshot().cross_rates_served, 6);
    }

    #[tokio::test]
    async fn test_rates_codes_are_normalized() {
        let app = default_app();

        let (status, body) = get(&app.router, "/rates?currencies=usd,%20eur").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["from"], "USD");
        assert_eq!(body[0]["to"], "EUR");
    }

    #[tokio::test]
    async fn test_rates_missing_or_short_list() {
        let app = default_app();

        for uri in ["/rates", "/rates?currencies=", "/rates?currencies=USD"] {
            let (status, body) = get(&app.router, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["field"], "currencies");
        }

        assert_eq!(app.provider.calls(), 0);
    }

    #[tokio::test]
    async fn test_rates_empty_segment() {
        let app = default_app();

        let (status, body) = get(&app.router, "/rates?currencies=USD,,EUR").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "EMPTY_CURRENCY_CODE");
    }

    #[tokio::test]
    async fn test_rates_provider_failure_is_bad_request() {
        let app = default_app();
        app.provider.set_failure(Some("API error"));

        let (status, body) = get(&app.router, "/rates?currencies=USD,EUR,GBP").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "PROVIDER_UNAVAILABLE");
        assert_eq!(app.metrics.snapshot().upstream_failures, 1);
    }

    #[tokio::test]
    async fn test_rates_provider_failure_by_kind() {
        let app = setup(ErrorStatusPolicy::ByKind, UnknownCurrencyPolicy::Reject);
        app.provider.set_failure(Some("API error"));

        let (status, _) = get(&app.router, "/rates?currencies=USD,EUR").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);

        // client errors stay 400 under either policy
        let (status, _) = get(&app.router, "/rates?currencies=USD").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_rates_unknown_currency() {
        let app = default_app();
        let (status, body) = get(&app.router, "/rates?currencies=USD,XYZ").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "UNKNOWN_CURRENCY");

        let app = setup(ErrorStatusPolicy::Uniform, UnknownCurrencyPolicy::Omit);
        let (status, body) = get(&app.router, "/rates?currencies=USD,XYZ,EUR").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_exchange_valid_request() {
        let app = default_app();

        let (status, body) = get(&app.router, "/exchange?from=USDT&to=WBTC&amount=1000").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["from"], "USDT");
        assert_eq!(body["to"], "WBTC");
        let expected = ((1000.0 * (0.999 / 57037.22)) * 1e8_f64).round() / 1e8;
        assert!((body["amount"].as_f64().unwrap() - expected).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_exchange_rejections() {
        let app = default_app();

        let cases = [
            ("/exchange?to=WBTC&amount=1", "MISSING_PARAMETER"),
            ("/exchange?from=USDT&amount=1", "MISSING_PARAMETER"),
            ("/exchange?from=USDT&to=WBTC&amount=", "MISSING_PARAMETER"),
            ("/exchange?from=DOGE&to=WBTC&amount=1", "UNKNOWN_ASSET"),
            ("/exchange?from=USDT&to=DOGE&amount=1", "UNKNOWN_ASSET"),
            ("/exchange?from=USDT&to=WBTC&amount=abc", "INVALID_AMOUNT"),
            ("/exchange?from=USDT&to=WBTC&amount=-3", "INVALID_AMOUNT"),
            ("/exchange?from=WBTC&to=BEER&amount=1e300", "AMOUNT_OUT_OF_RANGE"),
        ];

        for (uri, code) in cases {
            let (status, body) = get(&app.router, uri).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["code"], code, "{}", uri);
        }

        assert_eq!(app.metrics.snapshot().requests_rejected, cases.len() as u64);
    }

    #[tokio::test]
    async fn test_exchange_overflow_is_not_served() {
        let app = default_app();

        let (status, body) = get(&app.router, "/exchange?from=WBTC&to=BEER&amount=1e300").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], "AMOUNT_OUT_OF_RANGE");
        assert_eq!(body["field"], "amount");
        assert_eq!(app.metrics.snapshot().requests_success, 0);
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = default_app();
        get(&app.router, "/exchange?from=USDT&to=WBTC&amount=1").await;

        let response = app
            .router
            .clone()
            .oneshot(HttpRequest::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("currencies_exchange_requests_total 1"));
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let provider = Arc::new(MockRateProvider::new("test"));
        let engine = FxEngine::new(provider, AssetRegistry::builtin(), FxEngineConfig::default());
        let app = router(
            AppState::new(Arc::new(engine), ErrorStatusPolicy::Uniform),
            false,
        );

        let (status, _) = get(&app, "/metrics").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_request_id_header() {
        let app = default_app();

        let response = app
            .router
            .clone()
            .oneshot(HttpRequest::get("/rates").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers().get("x-request-id").unwrap();
        assert!(Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }

    #[test]
    fn test_from_config() {
        let mut config = ServerConfig::default();
        config.app_id = "abc123".to_string();

        let state = AppState::from_config(&config).unwrap();
        assert_eq!(state.engine.provider_name(), "openexchangerates");
        assert_eq!(state.engine.supported_assets().len(), 5);
    }
}
