use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use service::{gitea::Webhook, Outcome};
use tracing::{info, warn};

use crate::errors::ApiError;
use crate::state::ServerState;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers.get(name).and_then(|v| v.to_str().ok()).unwrap_or("-")
}

/// Receive one Gitea webhook delivery and relay it to Slack.
pub async fn receive(
    State(state): State<ServerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Outcome>, ApiError> {
    let event = header(&headers, "x-gitea-event");
    let delivery = header(&headers, "x-gitea-delivery");

    let webhook = Webhook::from_slice(&body).map_err(|e| {
        warn!(%event, %delivery, error = %e, "rejecting undecodable webhook");
        ApiError::bad_request(format!("invalid webhook payload: {e}"))
    })?;

    let outcome = state.notifier.handle(webhook).await?;
    info!(%event, %delivery, ?outcome, "webhook handled");
    Ok(Json(outcome))
}
