//! probe result reporting.

use crate::config::ReportConfig;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::future::Future;
use std::time::Duration;

/// signature reported for attempts whose blockhash expired. matches no real
/// signature but passes the collector's import filter.
pub const EXPIRED_SIGNATURE: &str =
    "9999999999999999999999999999999999999999999999999999999999999999999999999999999999999999";

/// payload of one report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeResult {
    /// milliseconds from first send to confirmation or expiry.
    pub time: u64,
    pub signature: String,
    pub transaction_type: String,
    pub success: bool,
    pub application: String,
    pub commitment_level: String,
    #[serde(serialize_with = "as_string", deserialize_with = "from_string")]
    pub slot_sent: u64,
    #[serde(serialize_with = "as_string", deserialize_with = "from_string")]
    pub slot_landed: u64,
}

fn as_string<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(value)
}

fn from_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    let text = String::deserialize(deserializer)?;
    text.parse().map_err(serde::de::Error::custom)
}

impl ProbeResult {
    #[inline]
    pub fn is_expired(&self) -> bool {
        self.signature == EXPIRED_SIGNATURE
    }
}

/// receives probe results.
pub trait Reporter: Send + Sync {
    fn report(&self, result: &ProbeResult) -> impl Future<Output = Result<(), ReportError>> + Send;
}

/// posts results to the collector with the api token header.
pub struct HttpReporter {
    client: reqwest::Client,
    url: String,
    api_key: String,
}

impl HttpReporter {
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Result<Self, ReportError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
        })
    }

    async fn post(&self, result: &ProbeResult) -> Result<(), ReportError> {
        let response = self
            .client
            .post(&self.url)
            .header("Token", &self.api_key)
            .json(result)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!("report accepted: {}", status);
        Ok(())
    }
}

impl Reporter for HttpReporter {
    fn report(&self, result: &ProbeResult) -> impl Future<Output = Result<(), ReportError>> + Send {
        self.post(result)
    }
}

/// logs results instead of posting them.
#[derive(Debug, Default)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, result: &ProbeResult) -> impl Future<Output = Result<(), ReportError>> + Send {
        tracing::info!(
            "result {} success={} time={}ms slots {}..{}",
            result.signature,
            result.success,
            result.time,
            result.slot_sent,
            result.slot_landed
        );
        std::future::ready(Ok(()))
    }
}

/// reporter chosen at start-up.
pub enum ReportSink {
    Http(HttpReporter),
    Log(LogReporter),
}

impl ReportSink {
    pub fn from_config(config: &ReportConfig) -> Result<Self, ReportError> {
        match (&config.api_key, config.skip) {
            (Some(key), false) => Ok(ReportSink::Http(HttpReporter::new(&config.url, key)?)),
            _ => Ok(ReportSink::Log(LogReporter)),
        }
    }
}

impl Reporter for ReportSink {
    fn report(&self, result: &ProbeResult) -> impl Future<Output = Result<(), ReportError>> + Send {
        async move {
            match self {
                ReportSink::Http(reporter) => reporter.report(result).await,
                ReportSink::Log(reporter) => reporter.report(result).await,
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("collector returned {status}: {body}")]
    Status { status: u16, body: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result() -> ProbeResult {
        ProbeResult {
            time: 812,
            signature: "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnb".into(),
            transaction_type: "transfer".into(),
            success: true,
            application: "web3".into(),
            commitment_level: "confirmed".into(),
            slot_sent: 300_000_001,
            slot_landed: 300_000_003,
        }
    }

    #[test]
    fn test_payload_shape() {
        let value = serde_json::to_value(result()).unwrap();
        assert_eq!(
            value,
            json!({
                "time": 812,
                "signature": "5VERv8NMvzbJMEkV8xnrLkEaWRtSz9CosKDYjCJjBRnb",
                "transaction_type": "transfer",
                "success": true,
                "application": "web3",
                "commitment_level": "confirmed",
                "slot_sent": "300000001",
                "slot_landed": "300000003",
            })
        );
    }

    #[test]
    fn test_expired_signature() {
        assert_eq!(EXPIRED_SIGNATURE.len(), 88);
        assert!(EXPIRED_SIGNATURE.bytes().all(|b| b == b'9'));

        let mut expired = result();
        assert!(!expired.is_expired());
        expired.signature = EXPIRED_SIGNATURE.into();
        assert!(expired.is_expired());
    }

    #[test]
    fn test_sink_selection() {
        let mut config = crate::config::Config::default().report;
        assert!(matches!(
            ReportSink::from_config(&config).unwrap(),
            ReportSink::Log(_)
        ));

        config.api_key = Some("key".into());
        assert!(matches!(
            ReportSink::from_config(&config).unwrap(),
            ReportSink::Http(_)
        ));

        config.skip = true;
        assert!(matches!(
            ReportSink::from_config(&config).unwrap(),
            ReportSink::Log(_)
        ));
    }
}
