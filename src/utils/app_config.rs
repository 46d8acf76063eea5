/// Checker configuration
/// Read from config.json (or a .toml file), every value has a default

use anyhow::{Context, Result};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::core::retry::RetryPolicy;
use crate::utils::constants::{BASE_URL, DEFAULT_CONFIG_FILE, MIN_WALLET_DELAY_SECS, WALLET_TYPE};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerConfig {
    /// Base pause between wallets, seconds
    pub delay_between_wallets: f64,
    /// Random spread (±) added to the pause, seconds
    pub delay_random_range: f64,
    pub max_retries: u32,
    /// First retry delay, seconds
    pub retry_delay_base: f64,
    pub retry_delay_multiplier: f64,
    /// Per-request timeout, seconds
    pub request_timeout: f64,

    pub base_url: String,
    pub wallet_type: String,

    /// Account info field 1 must be longer than this to count as eligible
    pub eligibility_min_length: usize,
    /// Nested integers above this are taken as allocation amounts
    pub allocation_min_value: u64,
    pub token_decimals: u32,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            delay_between_wallets: 2.0,
            delay_random_range: 1.0,
            max_retries: 3,
            retry_delay_base: 5.0,
            retry_delay_multiplier: 2.0,
            request_timeout: 30.0,
            base_url: BASE_URL.to_string(),
            wallet_type: WALLET_TYPE.to_string(),
            eligibility_min_length: 10,
            allocation_min_value: 1_000_000,
            token_decimals: 9,
        }
    }
}

impl CheckerConfig {
    /// `config.json` in the working directory, else the user config directory
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(DEFAULT_CONFIG_FILE);
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .map(|dir| dir.join("solayer-checker").join(DEFAULT_CONFIG_FILE))
            .unwrap_or(local)
    }

    /// Load configuration from file. A missing file gives the defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = match path.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?,
            _ => serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?,
        };

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.delay_between_wallets < 0.0 {
            errors.push("delay_between_wallets must not be negative".to_string());
        }
        if self.delay_random_range < 0.0 {
            errors.push("delay_random_range must not be negative".to_string());
        }
        if self.retry_delay_base < 0.0 {
            errors.push("retry_delay_base must not be negative".to_string());
        }
        if self.retry_delay_multiplier < 1.0 {
            errors.push("retry_delay_multiplier must be at least 1.0".to_string());
        }
        if self.request_timeout <= 0.0 {
            errors.push("request_timeout must be positive".to_string());
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            errors.push(format!("base_url is not an http(s) URL: {}", self.base_url));
        }

        errors
    }

    pub fn request_timeout(&self) -> Duration {
        secs(self.request_timeout)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            base_delay: secs(self.retry_delay_base),
            multiplier: self.retry_delay_multiplier,
        }
    }

    /// Pause before the next wallet: base ± range, never below 0.1s
    pub fn wallet_delay<R: Rng>(&self, rng: &mut R) -> Duration {
        let spread = if self.delay_random_range > 0.0 {
            rng.gen_range(-self.delay_random_range..=self.delay_random_range)
        } else {
            0.0
        };
        secs((self.delay_between_wallets + spread).max(MIN_WALLET_DELAY_SECS))
    }
}

/// Seconds to `Duration`, saturating at `Duration::MAX`. NaN and negatives give zero.
fn secs(value: f64) -> Duration {
    if value.is_nan() || value <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(value).unwrap_or(Duration::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Write;
    use tempfile::Builder;

    #[test]
    fn test_partial_json_keeps_defaults() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, r#"{{"max_retries": 5, "request_timeout": 10.5}}"#).unwrap();

        let config = CheckerConfig::load(file.path()).unwrap();
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.request_timeout(), Duration::from_millis(10_500));
        assert_eq!(config.delay_between_wallets, 2.0);
        assert_eq!(config.base_url, BASE_URL);
    }

    #[test]
    fn test_toml_config() {
        let mut file = Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "delay_between_wallets = 0.5").unwrap();
        writeln!(file, "eligibility_min_length = 20").unwrap();

        let config = CheckerConfig::load(file.path()).unwrap();
        assert_eq!(config.delay_between_wallets, 0.5);
        assert_eq!(config.eligibility_min_length, 20);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let config = CheckerConfig::load("/nonexistent/config.json").unwrap();
        assert_eq!(config, CheckerConfig::default());
    }

    #[test]
    fn test_malformed_file_is_error() {
        let mut file = Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(file, "{{ not json").unwrap();
        assert!(CheckerConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_validate() {
        assert!(CheckerConfig::default().validate().is_empty());

        let config = CheckerConfig {
            retry_delay_multiplier: 0.5,
            request_timeout: 0.0,
            base_url: "ftp://nope".to_string(),
            ..CheckerConfig::default()
        };
        assert_eq!(config.validate().len(), 3);
    }

    #[test]
    fn test_retry_policy_from_config() {
        let policy = CheckerConfig::default().retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
    }

    #[test]
    fn test_huge_values_saturate() {
        let mut rng = StdRng::seed_from_u64(1);
        let config = CheckerConfig {
            delay_between_wallets: 1e300,
            request_timeout: f64::INFINITY,
            ..CheckerConfig::default()
        };
        assert_eq!(config.wallet_delay(&mut rng), Duration::MAX);
        assert_eq!(config.request_timeout(), Duration::MAX);
        assert_eq!(secs(f64::NAN), Duration::ZERO);
        assert_eq!(secs(-3.0), Duration::ZERO);
    }

    #[test]
    fn test_wallet_delay_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        let config = CheckerConfig::default();
        for _ in 0..100 {
            let delay = config.wallet_delay(&mut rng).as_secs_f64();
            assert!((1.0..=3.0).contains(&delay), "delay {}", delay);
        }

        let floor = CheckerConfig {
            delay_between_wallets: 0.0,
            delay_random_range: 0.0,
            ..CheckerConfig::default()
        };
        assert_eq!(floor.wallet_delay(&mut rng), Duration::from_millis(100));
    }
}
