//! Gateway client used by `netguard-sim send`

use std::time::Duration;

use serde::Deserialize;

use crate::error::{SimError, SimResult};
use crate::profile::Sample;

/// Fields of the gateway's ingest response the agent reports on
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IngestReply {
    pub id: u64,
    pub model_ready: bool,
    pub anomaly_score: f64,
    pub threshold: Option<f64>,
    pub is_anomaly: bool,
    #[serde(default)]
    pub explanation: Vec<String>,
}

impl IngestReply {
    /// One-line summary, e.g. `ANOM ready score=0.4213 thr=0.0712`
    pub fn summary(&self) -> String {
        let status = if self.is_anomaly { "ANOM" } else { "ok" };
        let ready = if self.model_ready { "ready" } else { "warmup" };
        let thr = match self.threshold {
            Some(t) => format!("{t:.4}"),
            None => "inf".to_string(),
        };
        format!("{status} {ready} score={:.4} thr={thr}", self.anomaly_score)
    }
}

pub struct GatewayClient {
    http: reqwest::Client,
    url: String,
}

impl GatewayClient {
    /// `server` is the gateway base URL, e.g. `http://127.0.0.1:8000`
    pub fn new(server: &str) -> SimResult<Self> {
        let url = format!("{}/ingest", server.trim_end_matches('/'));
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(|source| SimError::Http {
                url: url.clone(),
                source,
            })?;
        Ok(Self { http, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn send(&self, sample: &Sample) -> SimResult<IngestReply> {
        let http_err = |source| SimError::Http {
            url: self.url.clone(),
            source,
        };

        let response = self.http.post(&self.url).json(sample).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(200).collect();
            return Err(SimError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        response.json::<IngestReply>().await.map_err(http_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_line() {
        let reply: IngestReply = serde_json::from_str(
            r#"{"ok":true,"id":7,"model_ready":true,"anomaly_score":0.42131,"threshold":0.07,"is_anomaly":true,"explanation":["bps_in (z=40.10)"]}"#,
        )
        .unwrap();
        assert_eq!(reply.summary(), "ANOM ready score=0.4213 thr=0.0700");

        let warmup: IngestReply = serde_json::from_str(
            r#"{"ok":true,"id":1,"model_ready":false,"anomaly_score":0.0,"threshold":null,"is_anomaly":false,"explanation":[]}"#,
        )
        .unwrap();
        assert_eq!(warmup.summary(), "ok warmup score=0.0000 thr=inf");
    }

    #[test]
    fn test_url_normalization() {
        let client = GatewayClient::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(client.url(), "http://127.0.0.1:8000/ingest");
    }
}
