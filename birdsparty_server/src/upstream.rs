use std::time::Duration;

use async_trait::async_trait;
use birdsparty_core::{OutcomeQuery, OutcomeService, PreferredOutcome, ServiceError, SettingsService};
use serde::Deserialize;

const SETTINGS: &str = "settings";
const RNG: &str = "rng";

pub fn http_client(timeout_ms: u64) -> reqwest::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
}

#[derive(Debug, Deserialize)]
struct RtpBody {
    rtp: f64,
}

#[derive(Debug, Deserialize)]
struct OutcomeBody {
    pref_outcome: PreferredOutcome,
}

/// Game settings service: `GET {base}/rtp`.
#[derive(Clone)]
pub struct HttpSettings {
    client: reqwest::Client,
    base_url: String,
}

impl HttpSettings {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl SettingsService for HttpSettings {
    async fn rtp(&self, client_id: &str, game_id: &str, player_id: &str) -> Result<f64, ServiceError> {
        let url = format!("{}/rtp", self.base_url.trim_end_matches('/'));
        let body: RtpBody = self
            .client
            .get(url)
            .query(&[
                ("client_id", client_id),
                ("game_id", game_id),
                ("player_id", player_id),
            ])
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| ServiceError::new(SETTINGS, e.to_string()))?
            .json()
            .await
            .map_err(|e| ServiceError::new(SETTINGS, e.to_string()))?;
        Ok(body.rtp)
    }
}

/// RNG decision service: `POST {base}/outcome`.
#[derive(Clone)]
pub struct HttpOutcomes {
    client: reqwest::Client,
    base_url: String,
}

impl HttpOutcomes {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl OutcomeService for HttpOutcomes {
    async fn preferred_outcome(&self, query: &OutcomeQuery) -> Result<PreferredOutcome, ServiceError> {
        let url = format!("{}/outcome", self.base_url.trim_end_matches('/'));
        let body: OutcomeBody = self
            .client
            .post(url)
            .json(query)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(|e| ServiceError::new(RNG, e.to_string()))?
            .json()
            .await
            .map_err(|e| ServiceError::new(RNG, e.to_string()))?;
        Ok(body.pref_outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Query, routing::get, routing::post, Json, Router};
    use std::collections::HashMap;

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[tokio::test]
    async fn settings_client_reads_rtp() {
        let app = Router::new().route(
            "/rtp",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let rtp = if q.get("player_id").map(String::as_str) == Some("p") { 94.5 } else { 0.0 };
                Json(serde_json::json!({ "rtp": rtp }))
            }),
        );
        let base = serve(app).await;
        let settings = HttpSettings::new(http_client(1000).unwrap(), format!("{base}/"));
        assert_eq!(settings.rtp("c", "g", "p").await.unwrap(), 94.5);
    }

    #[tokio::test]
    async fn outcome_client_maps_failures() {
        let app = Router::new().route(
            "/outcome",
            post(|Json(q): Json<OutcomeQuery>| async move {
                if q.payout_multiplier > 1.0 {
                    Err(axum::http::StatusCode::BAD_GATEWAY)
                } else {
                    Ok(Json(serde_json::json!({ "pref_outcome": "loss" })))
                }
            }),
        );
        let base = serve(app).await;
        let outcomes = HttpOutcomes::new(http_client(1000).unwrap(), base);
        let mut query = OutcomeQuery {
            client_id: "c".into(),
            game_id: "g".into(),
            player_id: "p".into(),
            bet_id: "b".into(),
            rtp: 96.0,
            payout_multiplier: 0.4,
            bet_amount: 0.1,
        };
        assert_eq!(outcomes.preferred_outcome(&query).await.unwrap(), PreferredOutcome::Loss);
        query.payout_multiplier = 3.0;
        let err = outcomes.preferred_outcome(&query).await.unwrap_err();
        assert_eq!(err.service, "rng");
    }
}
