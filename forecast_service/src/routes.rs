//! HTTP API

use crate::error::{Result, ServiceError};
use crate::jobs::{DeliveryFailure, ServiceContext};
use crate::store::{ForecastRecord, SubscribeOutcome};
use axum::extract::State;
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub type AppState = Arc<ServiceContext>;

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/api/forecast", get(get_forecast))
        .route("/api/subscribe", post(subscribe))
        .route("/api/unsubscribe", post(unsubscribe))
        .route("/api/trigger-fetch", post(trigger_fetch))
        .route("/api/forecast-now", post(forecast_now))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: Option<String>,
}

impl EmailRequest {
    fn email(&self) -> Result<&str> {
        self.email
            .as_deref()
            .filter(|e| !e.trim().is_empty())
            .ok_or(ServiceError::MissingEmail)
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastNowResponse {
    pub message: String,
    pub forecast: ForecastRecord,
    pub emails_sent: usize,
    pub email_errors: Vec<DeliveryFailure>,
}

/// Run store, engine or SMTP work off the async executor
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "service": "unrate-forecast",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn index(State(ctx): State<AppState>) -> Result<Html<String>> {
    let forecast = blocking(move || ctx.forecasts.load()).await?;
    Ok(Html(render_index(forecast.as_ref())))
}

async fn get_forecast(State(ctx): State<AppState>) -> Result<Json<ForecastRecord>> {
    let forecast = blocking(move || ctx.forecasts.load()).await?;
    forecast.map(Json).ok_or(ServiceError::NoForecast)
}

async fn subscribe(
    State(ctx): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Value>> {
    let email = request.email()?.to_string();
    let outcome = blocking(move || ctx.subscribers.subscribe(&email)).await?;
    let message = match outcome {
        SubscribeOutcome::Added => "Successfully subscribed",
        SubscribeOutcome::AlreadySubscribed => "Already subscribed",
    };
    Ok(Json(json!({ "message": message })))
}

async fn unsubscribe(
    State(ctx): State<AppState>,
    Json(request): Json<EmailRequest>,
) -> Result<Json<Value>> {
    let email = request.email()?.to_string();
    blocking(move || ctx.subscribers.unsubscribe(&email)).await?;
    Ok(Json(json!({ "message": "Successfully unsubscribed" })))
}

async fn trigger_fetch(State(ctx): State<AppState>) -> Result<impl IntoResponse> {
    let record = blocking(move || ctx.refresh()).await?;
    Ok(Json(json!({
        "message": "Data fetch triggered",
        "forecast": record,
    })))
}

async fn forecast_now(State(ctx): State<AppState>) -> Result<Json<ForecastNowResponse>> {
    let (forecast, summary) = blocking(move || ctx.refresh_and_notify()).await?;
    Ok(Json(ForecastNowResponse {
        message: "Forecast generated and notifications sent".to_string(),
        forecast,
        emails_sent: summary.sent,
        email_errors: summary.failures,
    }))
}

fn render_index(forecast: Option<&ForecastRecord>) -> String {
    let panel = match forecast {
        Some(f) => format!(
            "<div class=\"forecast\">\n\
             <p>Current rate ({}): <strong>{:.2}%</strong></p>\n\
             <p>Forecast for {}: <strong>{:.2}%</strong></p>\n\
             <p><small>{} &middot; generated {}</small></p>\n\
             </div>",
            f.current_month,
            f.current_value,
            f.forecast_month,
            f.forecast_value,
            f.model,
            f.date.format("%Y-%m-%d"),
        ),
        None => "<div class=\"forecast\"><p>No forecast yet.</p></div>".to_string(),
    };

    format!(
        r#"<!DOCTYPE html>
<html>
<head><meta charset="utf-8"><title>UNRATE Forecast</title></head>
<body>
<h1>UNRATE Forecast</h1>
{panel}
<form id="subscribe">
  <input type="email" name="email" placeholder="you@example.com" required>
  <button type="submit">Subscribe</button>
</form>
<p id="status"></p>
<script>
document.getElementById("subscribe").addEventListener("submit", async (event) => {{
  event.preventDefault();
  const email = event.target.email.value;
  const response = await fetch("/api/subscribe", {{
    method: "POST",
    headers: {{ "Content-Type": "application/json" }},
    body: JSON.stringify({{ email }}),
  }});
  const body = await response.json();
  document.getElementById("status").textContent = body.message || body.error;
}});
</script>
</body>
</html>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_index_without_forecast() {
        let html = render_index(None);
        assert!(html.contains("No forecast yet."));
        assert!(html.contains("/api/subscribe"));
    }

    #[test]
    fn test_render_index_with_forecast() {
        let record = ForecastRecord {
            date: "2025-08-04T09:00:00Z".parse().unwrap(),
            forecast_value: 4.256,
            forecast_month: "2025-08".parse().unwrap(),
            current_value: 4.2,
            current_month: "2025-07".parse().unwrap(),
            model: "ARIMA(2,1,2)".to_string(),
            interval_95: None,
        };
        let html = render_index(Some(&record));
        assert!(html.contains("Forecast for 2025-08: <strong>4.26%</strong>"));
        assert!(html.contains("generated 2025-08-04"));
    }

    #[test]
    fn test_email_request() {
        let request: EmailRequest = serde_json::from_str("{}").unwrap();
        assert!(matches!(request.email(), Err(ServiceError::MissingEmail)));

        let request: EmailRequest = serde_json::from_str(r#"{"email": "a@b.com"}"#).unwrap();
        assert_eq!(request.email().unwrap(), "a@b.com");
    }
}
