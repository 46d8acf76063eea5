/// CLI argument parsing

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use solayer_checker::utils::CheckerConfig;

// Build timestamp injected at compile time
pub const VERSION_WITH_BUILD: &str = concat!(env!("CARGO_PKG_VERSION"), " (built: ", env!("BUILD_TIMESTAMP"), ")");

#[derive(Parser)]
#[command(name = "solayer-checker")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Config file (JSON or TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter (error, warn, info, debug, trace). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(flatten)]
    pub overrides: ConfigOverrides,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a single wallet
    Check {
        /// Base58 secret key (defaults to PRIVATE_KEY from the environment or .env)
        #[arg(short, long)]
        key: Option<String>,

        /// CSV output path (defaults to a timestamped file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check every wallet in a key file
    Batch {
        /// One base58 secret key per line
        #[arg(short, long, default_value = "keys.txt")]
        keys: PathBuf,

        /// CSV output path (defaults to a timestamped file)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the effective configuration
    Config,
}

/// Command-line values that take precedence over the config file
#[derive(Args, Debug, Default)]
pub struct ConfigOverrides {
    /// Base pause between wallets, seconds
    #[arg(long, global = true)]
    pub delay: Option<f64>,

    /// Random spread around the pause, seconds
    #[arg(long, global = true)]
    pub jitter: Option<f64>,

    #[arg(long, global = true)]
    pub max_retries: Option<u32>,

    /// First retry delay, seconds
    #[arg(long, global = true)]
    pub retry_base: Option<f64>,

    /// Growth factor between retry delays
    #[arg(long, global = true)]
    pub retry_multiplier: Option<f64>,

    /// Per-request timeout, seconds
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// Claim service URL
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Also fetch GetVestingBaseInfo for eligible wallets
    #[arg(long, global = true)]
    pub base_info: bool,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut CheckerConfig) {
        if let Some(delay) = self.delay {
            config.delay_between_wallets = delay;
        }
        if let Some(jitter) = self.jitter {
            config.delay_random_range = jitter;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(base) = self.retry_base {
            config.retry_delay_base = base;
        }
        if let Some(multiplier) = self.retry_multiplier {
            config.retry_delay_multiplier = multiplier;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout = timeout;
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
    }
}
