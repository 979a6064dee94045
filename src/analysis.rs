use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::state::{ChartSeries, RowRecord};

/// Public deployment of the analysis backend.
pub const DEFAULT_ENDPOINT: &str = "https://real-estate-chatbot-mxfl.onrender.com/api/analyze/";

const UNKNOWN_ERROR: &str = "Unknown error";

#[derive(Serialize)]
struct AnalyzeRequest<'a> {
    query: &'a str,
}

#[derive(Deserialize)]
struct AnalyzePayload {
    success: bool,
    summary: Option<String>,
    chart_data: Option<ChartSeries>,
    table_data: Option<Vec<RowRecord>>,
    error: Option<String>,
}

/// Lenient view of an error body; non-2xx responses may not be well formed.
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Successful analysis: a summary plus optional chart and table data
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisReport {
    pub summary: String,
    pub chart_data: Option<ChartSeries>,
    pub table_data: Option<Vec<RowRecord>>,
}

/// What the backend said, once the transport succeeded
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResponse {
    Success(AnalysisReport),
    Failure { error: String },
}

impl TryFrom<AnalyzePayload> for AnalysisResponse {
    type Error = AnalysisError;

    fn try_from(payload: AnalyzePayload) -> Result<Self, Self::Error> {
        if !payload.success {
            return Ok(AnalysisResponse::Failure {
                error: payload.error.unwrap_or_else(|| UNKNOWN_ERROR.to_string()),
            });
        }

        let summary = payload
            .summary
            .ok_or(AnalysisError::MissingField("summary"))?;

        Ok(AnalysisResponse::Success(AnalysisReport {
            summary,
            chart_data: payload.chart_data,
            table_data: payload.table_data,
        }))
    }
}

#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    endpoint: String,
}

impl AnalysisClient {
    pub fn new(endpoint: &str) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.to_string(),
        }
    }

    /// Build a client whose requests give up after `timeout`. `None` keeps
    /// reqwest's default of waiting indefinitely.
    pub fn with_timeout(endpoint: &str, timeout: Option<Duration>) -> Result<Self, AnalysisError> {
        let mut builder =
            Client::builder().user_agent(concat!("estate-chat/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// POST `{"query": ...}` to the analysis endpoint. Exactly one request,
    /// no retries.
    pub async fn analyze(&self, query: &str) -> Result<AnalysisResponse, AnalysisError> {
        debug!(endpoint = %self.endpoint, "posting analysis query");

        let response = self
            .client
            .post(&self.endpoint)
            .json(&AnalyzeRequest { query })
            .send()
            .await?;

        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let detail = serde_json::from_slice::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error);
            warn!(%status, ?detail, "analysis backend returned an error status");
            return Err(AnalysisError::Status { status, detail });
        }

        let payload: AnalyzePayload = serde_json::from_slice(&body)?;
        AnalysisResponse::try_from(payload)
    }

    /// Like [`analyze`](Self::analyze), but settles with
    /// [`AnalysisError::Cancelled`] as soon as `cancel` fires.
    pub async fn analyze_until_cancelled(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<AnalysisResponse, AnalysisError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AnalysisError::Cancelled),
            result = self.analyze(query) => result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<AnalysisResponse, AnalysisError> {
        let payload: AnalyzePayload = serde_json::from_str(json).unwrap();
        AnalysisResponse::try_from(payload)
    }

    #[test]
    fn success_payload_keeps_optional_data() {
        let response = parse(
            r#"{"success": true, "summary": "ok",
                "chart_data": {"labels": ["2021"], "values": [50]},
                "table_data": [{"Area": "Wakad"}]}"#,
        )
        .unwrap();

        match response {
            AnalysisResponse::Success(report) => {
                assert_eq!(report.summary, "ok");
                assert_eq!(report.chart_data.unwrap().values, vec![50.0]);
                assert_eq!(report.table_data.unwrap().len(), 1);
            }
            other => panic!("unexpected response: {:?}", other),
        }
    }

    #[test]
    fn failure_without_error_text_is_unknown() {
        let response = parse(r#"{"success": false}"#).unwrap();
        assert_eq!(
            response,
            AnalysisResponse::Failure {
                error: "Unknown error".to_string()
            }
        );
    }

    #[test]
    fn success_without_summary_is_malformed() {
        let err = parse(r#"{"success": true}"#).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingField("summary")));
    }
}
