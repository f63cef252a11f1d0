//! REST adapter for the call service.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use super::{CallArtifacts, PlacedCall, TelephonyClient, TelephonyConfig, TelephonyError};

/// HTTP client for the call service.
///
/// Endpoints:
/// - `POST {base}/calls` places a call
/// - `GET {base}/calls/{sid}` returns `{ "status": ... }`
/// - `GET {base}/calls/{sid}/artifacts` returns the recording and transcript
pub struct HttpTelephonyClient {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct PlaceCallRequest<'a> {
    to: &'a str,
    message: &'a str,
    metadata: &'a Value,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
}

impl HttpTelephonyClient {
    pub fn new(config: &TelephonyConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        }
    }

    fn call_url(&self, call_sid: &str) -> String {
        format!("{}/calls/{}", self.api_base, urlencoding::encode(call_sid))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if self.api_key.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.api_key)
        }
    }

    async fn read_json<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, TelephonyError> {
        let status = response.status().as_u16();
        if !(200..300).contains(&status) {
            let message = response.text().await.unwrap_or_default();
            return Err(TelephonyError::Api { status, message });
        }
        response
            .json()
            .await
            .map_err(|e| TelephonyError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl TelephonyClient for HttpTelephonyClient {
    async fn place_call(
        &self,
        target: &str,
        message: &str,
        metadata: &Value,
    ) -> Result<PlacedCall, TelephonyError> {
        let request = PlaceCallRequest {
            to: target,
            message,
            metadata,
        };

        let response = self
            .authorize(self.client.post(format!("{}/calls", self.api_base)))
            .json(&request)
            .send()
            .await
            .map_err(|e| TelephonyError::Http(e.to_string()))?;

        let placed: PlacedCall = Self::read_json(response).await?;
        if placed.call_sid.is_empty() {
            return Err(TelephonyError::InvalidResponse(
                "placement returned an empty call_sid".to_string(),
            ));
        }
        debug!(call_sid = %placed.call_sid, "Call placed");
        Ok(placed)
    }

    async fn call_status(&self, call_sid: &str) -> Result<String, TelephonyError> {
        let response = self
            .authorize(self.client.get(self.call_url(call_sid)))
            .send()
            .await
            .map_err(|e| TelephonyError::Http(e.to_string()))?;

        let body: StatusResponse = Self::read_json(response).await?;
        Ok(body.status)
    }

    async fn call_artifacts(&self, call_sid: &str) -> Result<CallArtifacts, TelephonyError> {
        let response = self
            .authorize(
                self.client
                    .get(format!("{}/artifacts", self.call_url(call_sid))),
            )
            .send()
            .await
            .map_err(|e| TelephonyError::Http(e.to_string()))?;

        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> HttpTelephonyClient {
        HttpTelephonyClient::new(&TelephonyConfig {
            api_base: "http://calls.local/api/".to_string(),
            api_key: String::new(),
            timeout_secs: 5,
        })
    }

    #[test]
    fn test_call_url_encodes_sid() {
        assert_eq!(
            client().call_url("CA 1/2"),
            "http://calls.local/api/calls/CA%201%2F2"
        );
    }

    #[test]
    fn test_place_call_request_serialization() {
        let metadata = serde_json::json!({"context_id": "creator-7"});
        let request = PlaceCallRequest {
            to: "+15550100",
            message: "Hello",
            metadata: &metadata,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["to"], "+15550100");
        assert_eq!(json["metadata"]["context_id"], "creator-7");
    }

    #[test]
    fn test_artifacts_deserialize_partial() {
        let artifacts: CallArtifacts =
            serde_json::from_str(r#"{"recording_url": "https://rec/1.mp3"}"#).unwrap();
        assert_eq!(artifacts.recording_url.as_deref(), Some("https://rec/1.mp3"));
        assert!(artifacts.turns().is_empty());
        assert!(artifacts.context_id.is_none());
    }
}
