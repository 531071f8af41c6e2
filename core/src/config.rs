//! configuration for the probe binary.

use solana_commitment_config::CommitmentConfig;
use std::time::Duration;

/// validators.app ping thing endpoint.
pub const DEFAULT_REPORT_URL: &str = "https://www.validators.app/api/v1/ping-thing/mainnet";

/// probe application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// rpc and websocket endpoints.
    pub rpc: RpcConfig,
    /// probe loop timing.
    pub probe: ProbeConfig,
    /// result reporting.
    pub report: ReportConfig,
    /// probe transaction contents.
    pub payload: PayloadConfig,
    /// blockhash and slot feeds.
    pub live: ping_live::Config,
}

/// rpc endpoint configuration.
#[derive(Debug, Clone)]
pub struct RpcConfig {
    /// http rpc url.
    pub rpc_url: String,
    /// websocket url for subscriptions.
    pub ws_url: String,
    /// commitment used for subscriptions, sends and lookups.
    pub commitment: CommitmentConfig,
    /// block height polling interval while waiting for confirmation.
    pub block_height_poll: Duration,
}

/// probe loop configuration.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    /// resend the transaction this often until it confirms.
    pub resend_interval: Duration,
    /// wait before looking up a confirmed transaction.
    pub settle_delay: Duration,
    /// pause before every iteration.
    pub loop_delay: Duration,
    /// consecutive unexpected failures before giving up.
    pub max_failures: u32,
}

/// reporter configuration.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub url: String,
    /// value of the `Token` header.
    pub api_key: Option<String>,
    /// log results instead of posting them.
    pub skip: bool,
    /// `application` field of every result.
    pub application: String,
}

/// probe transaction configuration.
#[derive(Debug, Clone)]
pub struct PayloadConfig {
    pub compute_unit_limit: u32,
    /// self-transfer amount.
    pub lamports: u64,
    /// compute unit price in micro-lamports.
    pub priority_fee: Option<u64>,
}

impl Config {
    /// create config for mainnet public endpoints.
    pub fn mainnet() -> Self {
        Self::custom(
            "https://api.mainnet-beta.solana.com",
            "wss://api.mainnet-beta.solana.com",
        )
    }

    /// create config with custom endpoints.
    pub fn custom(rpc_url: impl Into<String>, ws_url: impl Into<String>) -> Self {
        Self {
            rpc: RpcConfig {
                rpc_url: rpc_url.into(),
                ws_url: ws_url.into(),
                commitment: CommitmentConfig::confirmed(),
                block_height_poll: Duration::from_millis(1000),
            },
            probe: ProbeConfig::default(),
            report: ReportConfig {
                url: DEFAULT_REPORT_URL.into(),
                api_key: None,
                skip: false,
                application: "web3".into(),
            },
            payload: PayloadConfig {
                compute_unit_limit: 500,
                lamports: 5000,
                priority_fee: None,
            },
            live: ping_live::Config::default(),
        }
    }

    /// set commitment level.
    pub fn with_commitment(mut self, commitment: CommitmentConfig) -> Self {
        self.rpc.commitment = commitment;
        self
    }

    /// set lookup settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.probe.settle_delay = delay;
        self
    }

    /// set loop pacing delay.
    pub fn with_loop_delay(mut self, delay: Duration) -> Self {
        self.probe.loop_delay = delay;
        self
    }

    /// set resend interval.
    pub fn with_resend_interval(mut self, interval: Duration) -> Self {
        self.probe.resend_interval = interval;
        self
    }

    /// set report api key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.report.api_key = Some(key.into());
        self
    }

    /// set report url.
    pub fn with_report_url(mut self, url: impl Into<String>) -> Self {
        self.report.url = url.into();
        self
    }

    /// log results instead of posting them.
    pub fn with_skip_report(mut self, skip: bool) -> Self {
        self.report.skip = skip;
        self
    }

    /// set compute unit price.
    pub fn with_priority_fee(mut self, micro_lamports: u64) -> Self {
        self.payload.priority_fee = Some(micro_lamports);
        self
    }

    /// set live feed configuration.
    pub fn with_live(mut self, live: ping_live::Config) -> Self {
        self.live = live;
        self
    }

    /// check values the components cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.report.skip && self.report.api_key.is_none() {
            return Err(ConfigError::Missing("VA_API_KEY"));
        }
        if self.probe.resend_interval.is_zero() {
            return Err(ConfigError::Invalid {
                name: "resend_interval",
                value: "0".into(),
            });
        }
        if self.probe.max_failures == 0 {
            return Err(ConfigError::Invalid {
                name: "max_failures",
                value: "0".into(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            resend_interval: Duration::from_millis(2000),
            settle_delay: Duration::from_millis(2000),
            loop_delay: Duration::ZERO,
            max_failures: 3,
        }
    }
}

/// parse `processed`, `confirmed` or `finalized`.
pub fn parse_commitment(value: &str) -> Result<CommitmentConfig, ConfigError> {
    match value {
        "processed" => Ok(CommitmentConfig::processed()),
        "confirmed" => Ok(CommitmentConfig::confirmed()),
        "finalized" => Ok(CommitmentConfig::finalized()),
        _ => Err(ConfigError::Invalid {
            name: "COMMITMENT",
            value: value.into(),
        }),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing {0}")]
    Missing(&'static str),
    #[error("invalid {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("invalid keypair: {0}")]
    Keypair(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_commitment_config::CommitmentLevel;

    #[test]
    fn test_default_timings_and_payload() {
        let config = Config::default();
        assert_eq!(config.probe.resend_interval, Duration::from_millis(2000));
        assert_eq!(config.probe.settle_delay, Duration::from_millis(2000));
        assert_eq!(config.probe.loop_delay, Duration::ZERO);
        assert_eq!(config.probe.max_failures, 3);
        assert_eq!(config.payload.compute_unit_limit, 500);
        assert_eq!(config.payload.lamports, 5000);
        assert_eq!(config.rpc.commitment, CommitmentConfig::confirmed());
        assert_eq!(config.live.max_anchor_attempts, 5);
        assert_eq!(config.live.max_slot_attempts, 100);
    }

    #[test]
    fn test_parse_commitment() {
        assert_eq!(
            parse_commitment("finalized").unwrap().commitment,
            CommitmentLevel::Finalized
        );
        assert_eq!(
            parse_commitment("processed").unwrap().commitment,
            CommitmentLevel::Processed
        );
        assert!(matches!(
            parse_commitment("recent"),
            Err(ConfigError::Invalid { name: "COMMITMENT", .. })
        ));
    }

    #[test]
    fn test_api_key_required_unless_skipped() {
        let config = Config::custom("http://localhost:8899", "ws://localhost:8900");
        assert!(matches!(config.validate(), Err(ConfigError::Missing("VA_API_KEY"))));
        assert!(config.clone().with_skip_report(true).validate().is_ok());
        assert!(config.with_api_key("key").validate().is_ok());
    }
}
