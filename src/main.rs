mod cli;

use anyhow::{bail, Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use solayer_checker::core::report::save_results;
use solayer_checker::core::vesting::format_token_amount;
use solayer_checker::core::{
    BatchEvent, BatchReport, BatchRunner, ReqwestTransport, TokioSleeper, WalletResult,
};
use solayer_checker::utils::{
    format_duration, load_private_keys, mask_sensitive, CheckerConfig, DEFAULT_KEYS_FILE,
    PRIVATE_KEY_ENV,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let config_path = cli.config.clone().unwrap_or_else(CheckerConfig::default_path);
    let mut config = CheckerConfig::load(&config_path)?;
    cli.overrides.apply(&mut config);
    let base_info = cli.overrides.base_info;

    match cli.command {
        None => {
            if Path::new(DEFAULT_KEYS_FILE).exists() && prompt_batch_mode()? {
                handle_batch(config, base_info, PathBuf::from(DEFAULT_KEYS_FILE), None).await?;
            } else {
                handle_check(config, base_info, None, None).await?;
            }
        }
        Some(Commands::Check { key, output }) => {
            handle_check(config, base_info, key, output).await?;
        }
        Some(Commands::Batch { keys, output }) => {
            handle_batch(config, base_info, keys, output).await?;
        }
        Some(Commands::Config) => {
            handle_config(&config, &config_path)?;
        }
    }

    Ok(())
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn prompt_batch_mode() -> Result<bool> {
    println!("Found {}. Choose mode:", DEFAULT_KEYS_FILE.cyan());
    println!("  1. Single wallet ({} from environment)", PRIVATE_KEY_ENV);
    println!("  2. Batch ({})", DEFAULT_KEYS_FILE);
    print!("Enter choice [1/2]: ");
    io::stdout().flush()?;

    let mut choice = String::new();
    io::stdin().read_line(&mut choice)?;
    Ok(choice.trim() == "2")
}

fn checked_config(config: CheckerConfig) -> Result<Arc<CheckerConfig>> {
    let errors = config.validate();
    if !errors.is_empty() {
        for error in &errors {
            eprintln!("{} {}", "config:".red(), error);
        }
        bail!("invalid configuration ({} problems)", errors.len());
    }
    Ok(Arc::new(config))
}

fn runner(config: CheckerConfig, base_info: bool) -> Result<BatchRunner> {
    let config = checked_config(config)?;
    let transport = ReqwestTransport::new(config.request_timeout())?;
    Ok(BatchRunner::new(Arc::new(transport), Arc::new(TokioSleeper), config).with_base_info(base_info))
}

async fn handle_check(
    config: CheckerConfig,
    base_info: bool,
    key: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let decimals = config.token_decimals;
    let key = match key {
        Some(key) => key,
        None => std::env::var(PRIVATE_KEY_ENV)
            .with_context(|| format!("No key given and {} is not set", PRIVATE_KEY_ENV))?,
    };
    let runner = runner(config, base_info)?;

    println!("Checking wallet {}\n", mask_sensitive(&key, 6));
    let result = runner
        .check_wallet(&key, &mut |event| {
            if let BatchEvent::BaseInfo { info, .. } = event {
                println!("{}\n{}", "Vesting base info:".cyan(), info);
            }
        })
        .await;

    print_wallet(&result, decimals);

    let saved = save_results(output.as_deref(), std::slice::from_ref(&result))?;
    println!("\nResult saved to {}", saved.display().to_string().green());

    if !result.is_success() {
        bail!("wallet check failed");
    }
    Ok(())
}

async fn handle_batch(
    config: CheckerConfig,
    base_info: bool,
    keys_path: PathBuf,
    output: Option<PathBuf>,
) -> Result<()> {
    let keys = load_private_keys(&keys_path)?;
    if keys.is_empty() {
        bail!("No keys found in {}", keys_path.display());
    }
    let decimals = config.token_decimals;
    let runner = runner(config, base_info)?;
    info!(wallets = keys.len(), path = %keys_path.display(), "starting batch");

    let progress = ProgressBar::new(keys.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let report = runner
        .run(&keys, |event| match event {
            BatchEvent::WalletStarted { index, total, private_key } => {
                progress.set_message(format!("wallet {}/{} {}", index, total, mask_sensitive(private_key, 6)));
            }
            BatchEvent::BaseInfo { address, info } => {
                progress.println(format!("{} {}\n{}", "Vesting base info for".cyan(), address, info));
            }
            BatchEvent::WalletFinished { result, elapsed, .. } => {
                let elapsed = Duration::from_millis(elapsed.as_millis() as u64);
                progress.println(format!("{} ({})", wallet_line(result), humantime::format_duration(elapsed)));
                progress.inc(1);
            }
            BatchEvent::Waiting { delay } => {
                progress.set_message(format!("waiting {:.1}s", delay.as_secs_f64()));
            }
        })
        .await;
    progress.finish_and_clear();

    print_summary(&report, decimals);

    let saved = save_results(output.as_deref(), &report.results)?;
    println!("\nResults saved to {}", saved.display().to_string().green());

    Ok(())
}

fn handle_config(config: &CheckerConfig, path: &Path) -> Result<()> {
    println!("Config file: {}\n", path.display());
    println!("{}", serde_json::to_string_pretty(config)?);

    let errors = config.validate();
    if errors.is_empty() {
        println!("\n{}", "✓ Configuration is valid".green());
    } else {
        println!("\n{}", "Configuration problems:".red());
        for error in errors {
            println!("  • {}", error);
        }
    }
    Ok(())
}

fn wallet_line(result: &WalletResult) -> String {
    if !result.is_success() {
        format!("{} {} {}", "✗".red(), result.address, result.status.to_string().red())
    } else if result.eligible {
        format!(
            "{} {} eligible, {} LAYER",
            "✓".green(),
            result.address,
            result.total_allocation_formatted.green()
        )
    } else {
        format!("{} {} not eligible", "•".yellow(), result.address)
    }
}

fn print_wallet(result: &WalletResult, decimals: u32) {
    println!("{}", wallet_line(result));
    if result.is_success() && result.eligible {
        println!("  Total allocation: {} ({})", result.total_allocation_formatted, result.total_allocation);
        println!(
            "  Vested amount:    {} ({})",
            format_token_amount(&result.vested_amount, decimals),
            result.vested_amount
        );
    }
}

fn print_summary(report: &BatchReport, decimals: u32) {
    let summary = &report.summary;

    println!("\n{}", "Batch Summary".bold());
    println!("{}", "-".repeat(60));
    println!("Wallets processed: {}", summary.total);
    println!("Successful:        {}", summary.successful.to_string().green());
    println!("Failed:            {}", (summary.total - summary.successful).to_string().red());
    println!("Eligible:          {}", summary.eligible.to_string().cyan());
    println!("Elapsed:           {}", format_duration(summary.elapsed.as_secs()));

    if summary.eligible == 0 {
        return;
    }

    println!(
        "Total allocation:  {} LAYER",
        format_token_amount(&summary.allocation_sum.to_string(), decimals)
    );
    println!("\n{:<46} {:>18} {:>18}", "Address", "Allocation", "Vested");
    println!("{}", "-".repeat(84));
    for result in report.results.iter().filter(|r| r.is_success() && r.eligible) {
        println!(
            "{:<46} {:>18} {:>18}",
            result.address,
            result.total_allocation_formatted,
            format_token_amount(&result.vested_amount, decimals)
        );
    }
}
