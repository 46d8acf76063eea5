/// Sequential batch processing of wallets
///
/// Wallets are processed one at a time in input order. Every wallet yields
/// exactly one result, whatever happens to it, and a randomized pause
/// separates consecutive wallets.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{error, info};

use crate::core::error::ClaimError;
use crate::core::parser::ParsedMessage;
use crate::core::retry::Sleeper;
use crate::core::session::{ClaimSession, WalletOutcome};
use crate::core::signer::WalletSigner;
use crate::core::transport::HttpTransport;
use crate::core::vesting::{allocation_value, format_token_amount};
use crate::utils::CheckerConfig;

/// Placeholder address for wallets whose key could not be loaded
pub const UNKNOWN_ADDRESS: &str = "ERROR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletStatus {
    Success,
    Error(String),
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WalletStatus::Success => f.write_str("SUCCESS"),
            WalletStatus::Error(message) => write!(f, "ERROR: {}", message),
        }
    }
}

/// One output record per processed wallet
#[derive(Debug, Clone, PartialEq)]
pub struct WalletResult {
    pub private_key: String,
    pub address: String,
    pub eligible: bool,
    pub total_allocation: String,
    pub vested_amount: String,
    pub total_allocation_formatted: String,
    pub status: WalletStatus,
}

impl WalletResult {
    fn success(private_key: &str, outcome: &WalletOutcome, decimals: u32) -> Self {
        let (total, vested) = match &outcome.vesting {
            Some(data) => (data.total_allocation.clone(), data.vested_amount.clone()),
            None => ("0".to_string(), "0".to_string()),
        };
        Self {
            private_key: private_key.to_string(),
            address: outcome.address.clone(),
            eligible: outcome.eligible,
            total_allocation_formatted: format_token_amount(&total, decimals),
            total_allocation: total,
            vested_amount: vested,
            status: WalletStatus::Success,
        }
    }

    fn failure(private_key: &str, address: Option<&str>, err: &ClaimError) -> Self {
        Self {
            private_key: private_key.to_string(),
            address: address.unwrap_or(UNKNOWN_ADDRESS).to_string(),
            eligible: false,
            total_allocation: "0".to_string(),
            vested_amount: "0".to_string(),
            total_allocation_formatted: "0.000".to_string(),
            status: WalletStatus::Error(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == WalletStatus::Success
    }
}

/// Progress notifications emitted while a batch runs
#[derive(Debug)]
pub enum BatchEvent<'a> {
    WalletStarted { index: usize, total: usize, private_key: &'a str },
    BaseInfo { address: &'a str, info: &'a ParsedMessage },
    WalletFinished { index: usize, total: usize, result: &'a WalletResult, elapsed: Duration },
    Waiting { delay: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub eligible: usize,
    pub elapsed: Duration,
    /// Sum of raw allocations of eligible wallets
    pub allocation_sum: f64,
}

impl BatchSummary {
    pub fn from_results(results: &[WalletResult], elapsed: Duration) -> Self {
        let successful: Vec<&WalletResult> = results.iter().filter(|r| r.is_success()).collect();
        let eligible: Vec<&&WalletResult> = successful.iter().filter(|r| r.eligible).collect();
        let allocation_sum = eligible
            .iter()
            .filter_map(|r| allocation_value(&r.total_allocation))
            .sum();

        Self {
            total: results.len(),
            successful: successful.len(),
            eligible: eligible.len(),
            elapsed,
            allocation_sum,
        }
    }
}

pub struct BatchReport {
    pub results: Vec<WalletResult>,
    pub summary: BatchSummary,
}

pub struct BatchRunner {
    transport: Arc<dyn HttpTransport>,
    sleeper: Arc<dyn Sleeper>,
    config: Arc<CheckerConfig>,
    fetch_base_info: bool,
}

impl BatchRunner {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        sleeper: Arc<dyn Sleeper>,
        config: Arc<CheckerConfig>,
    ) -> Self {
        Self {
            transport,
            sleeper,
            config,
            fetch_base_info: false,
        }
    }

    /// Also query GetVestingBaseInfo for eligible wallets
    pub fn with_base_info(mut self, enabled: bool) -> Self {
        self.fetch_base_info = enabled;
        self
    }

    /// Check a single wallet. Failures become an error record.
    pub async fn check_wallet<F>(&self, private_key: &str, observer: &mut F) -> WalletResult
    where
        F: FnMut(BatchEvent<'_>),
    {
        let signer = match WalletSigner::from_base58(private_key) {
            Ok(signer) => signer,
            Err(err) => {
                error!(error = %err, "could not load wallet key");
                return WalletResult::failure(private_key, None, &err);
            }
        };

        let mut session = ClaimSession::new(
            signer,
            self.transport.clone(),
            self.sleeper.clone(),
            self.config.clone(),
        );
        info!(address = session.address(), "processing wallet");

        match session.check(self.fetch_base_info).await {
            Ok(outcome) => {
                if let Some(info) = &outcome.base_info {
                    observer(BatchEvent::BaseInfo {
                        address: &outcome.address,
                        info,
                    });
                }
                WalletResult::success(private_key, &outcome, self.config.token_decimals)
            }
            Err(err) => {
                error!(address = session.address(), error = %err, "wallet failed");
                WalletResult::failure(private_key, Some(session.address()), &err)
            }
        }
    }

    /// Process every key in order, pausing between wallets
    pub async fn run<F>(&self, keys: &[String], mut observer: F) -> BatchReport
    where
        F: FnMut(BatchEvent<'_>),
    {
        let started = Instant::now();
        let total = keys.len();
        let mut results = Vec::with_capacity(total);

        for (i, private_key) in keys.iter().enumerate() {
            let index = i + 1;
            observer(BatchEvent::WalletStarted {
                index,
                total,
                private_key,
            });

            let wallet_started = Instant::now();
            let result = self.check_wallet(private_key, &mut observer).await;
            observer(BatchEvent::WalletFinished {
                index,
                total,
                result: &result,
                elapsed: wallet_started.elapsed(),
            });
            results.push(result);

            if index < total {
                let delay = self.config.wallet_delay(&mut rand::thread_rng());
                observer(BatchEvent::Waiting { delay });
                self.sleeper.pause(delay).await;
            }
        }

        let summary = BatchSummary::from_results(&results, started.elapsed());
        BatchReport { results, summary }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::TransportError;
    use crate::core::retry::testing::RecordingSleeper;
    use crate::core::session::testing::{empty_reply, nested_vesting_reply, test_key, text_reply};
    use crate::core::transport::testing::ScriptedTransport;

    const TOKEN: &str = "eyJhbGciOiJIUzI1NiJ9.token";

    fn config() -> Arc<CheckerConfig> {
        Arc::new(CheckerConfig {
            delay_between_wallets: 100.0,
            delay_random_range: 0.0,
            max_retries: 2,
            retry_delay_base: 1.0,
            retry_delay_multiplier: 2.0,
            ..CheckerConfig::default()
        })
    }

    fn timeout() -> Result<crate::core::transport::HttpResponse, TransportError> {
        Err(TransportError::Timeout {
            url: "https://claim.solayer.foundation".to_string(),
        })
    }

    #[tokio::test]
    async fn test_failing_wallet_is_isolated() {
        let transport = Arc::new(
            ScriptedTransport::new()
                // wallet 1: not eligible
                .respond(Ok(text_reply("challenge one")))
                .respond(Ok(text_reply(TOKEN)))
                .respond(Ok(empty_reply()))
                // wallet 2: every attempt times out
                .respond_times(timeout(), 3)
                // wallet 3: eligible with a nested allocation
                .respond(Ok(text_reply("challenge three")))
                .respond(Ok(text_reply(TOKEN)))
                .respond(Ok(text_reply("account-eligible-0001")))
                .respond(Ok(nested_vesting_reply(5_000_000_000, 2_000_000_000))),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let runner = BatchRunner::new(transport.clone(), sleeper.clone(), config());

        let keys = vec![test_key(1), test_key(2), test_key(3)];
        let mut waits = 0;
        let report = runner
            .run(&keys, |event| {
                if let BatchEvent::Waiting { .. } = event {
                    waits += 1;
                }
            })
            .await;

        assert_eq!(report.results.len(), 3);
        assert_eq!(transport.remaining(), 0);

        let first = &report.results[0];
        assert_eq!(first.status, WalletStatus::Success);
        assert!(!first.eligible);
        assert_eq!(first.total_allocation, "0");

        let second = &report.results[1];
        assert!(second.status.to_string().starts_with("ERROR"));
        assert_ne!(second.address, UNKNOWN_ADDRESS);
        assert_eq!(second.private_key, keys[1]);

        let third = &report.results[2];
        assert_eq!(third.status, WalletStatus::Success);
        assert!(third.eligible);
        assert_eq!(third.total_allocation, "5000000000");
        assert_eq!(third.vested_amount, "2000000000");
        assert_eq!(third.total_allocation_formatted, "5.000");

        // pause after wallet 1, two backoffs inside wallet 2, pause after wallet 2
        assert_eq!(
            sleeper.pauses(),
            vec![
                Duration::from_secs(100),
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(100),
            ]
        );
        assert_eq!(waits, 2);

        assert_eq!(report.summary.total, 3);
        assert_eq!(report.summary.successful, 2);
        assert_eq!(report.summary.eligible, 1);
        assert_eq!(report.summary.allocation_sum, 5_000_000_000.0);
    }

    #[tokio::test]
    async fn test_bad_key_yields_error_record_without_network() {
        let transport = Arc::new(ScriptedTransport::new());
        let sleeper = Arc::new(RecordingSleeper::default());
        let runner = BatchRunner::new(transport.clone(), sleeper, config());

        let report = runner.run(&["not-a-key".to_string()], |_| {}).await;
        assert_eq!(report.results.len(), 1);
        let result = &report.results[0];
        assert_eq!(result.address, UNKNOWN_ADDRESS);
        assert!(result.status.to_string().starts_with("ERROR: crypto error"));
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_vesting_failure_records_eligible_success() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Ok(text_reply("challenge")))
                .respond(Ok(text_reply(TOKEN)))
                .respond(Ok(text_reply("account-eligible-0001")))
                .respond_times(timeout(), 3),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let runner = BatchRunner::new(transport, sleeper, config());

        let result = runner.check_wallet(&test_key(5), &mut |_| {}).await;
        assert_eq!(result.status, WalletStatus::Success);
        assert!(result.eligible);
        assert_eq!(result.total_allocation, "0");
        assert_eq!(result.vested_amount, "0");
        assert_eq!(result.total_allocation_formatted, "0.000");
    }

    #[tokio::test]
    async fn test_single_wallet_has_no_pause() {
        let transport = Arc::new(
            ScriptedTransport::new()
                .respond(Ok(text_reply("challenge")))
                .respond(Ok(text_reply(TOKEN)))
                .respond(Ok(empty_reply())),
        );
        let sleeper = Arc::new(RecordingSleeper::default());
        let runner = BatchRunner::new(transport, sleeper.clone(), config());

        let report = runner.run(&[test_key(4)], |_| {}).await;
        assert!(report.results[0].is_success());
        assert!(sleeper.pauses().is_empty());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(WalletStatus::Success.to_string(), "SUCCESS");
        assert_eq!(WalletStatus::Error("boom".to_string()).to_string(), "ERROR: boom");
    }
}
