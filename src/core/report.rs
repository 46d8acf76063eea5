/// CSV export of batch results

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::batch::WalletResult;
use crate::utils::{timestamped_results_path, RESULTS_FILE_PREFIX};

pub const CSV_HEADER: [&str; 7] = [
    "private_key",
    "wallet_address",
    "eligible",
    "total_allocation",
    "vested_amount",
    "total_allocation_formatted",
    "status",
];

/// Quote a field when it contains a delimiter, quote or line break
fn escape(field: &str) -> String {
    if field.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn row(result: &WalletResult) -> String {
    let eligible = if result.eligible { "true" } else { "false" };
    let status = result.status.to_string();
    [
        result.private_key.as_str(),
        result.address.as_str(),
        eligible,
        result.total_allocation.as_str(),
        result.vested_amount.as_str(),
        result.total_allocation_formatted.as_str(),
        status.as_str(),
    ]
    .iter()
    .map(|field| escape(field))
    .collect::<Vec<_>>()
    .join(",")
}

/// Write one header line plus one row per result, in input order
pub fn write_csv<P: AsRef<Path>>(path: P, results: &[WalletResult]) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)
        .with_context(|| format!("Failed to create results file {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    writeln!(writer, "{}", CSV_HEADER.join(","))?;
    for result in results {
        writeln!(writer, "{}", row(result))?;
    }
    writer.flush()?;

    Ok(())
}

/// Write results to `output`, or to a timestamped file in the working
/// directory. Returns the path written.
pub fn save_results(output: Option<&Path>, results: &[WalletResult]) -> Result<PathBuf> {
    let path = match output {
        Some(path) => path.to_path_buf(),
        None => timestamped_results_path(RESULTS_FILE_PREFIX),
    };
    write_csv(&path, results)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::batch::WalletStatus;
    use std::fs;

    fn result(status: WalletStatus) -> WalletResult {
        WalletResult {
            private_key: "key".to_string(),
            address: "Addr1".to_string(),
            eligible: true,
            total_allocation: "5000000000".to_string(),
            vested_amount: "2000000000".to_string(),
            total_allocation_formatted: "5.000".to_string(),
            status,
        }
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("plain"), "plain");
        assert_eq!(escape("a,b"), "\"a,b\"");
        assert_eq!(escape("say \"hi\""), "\"say \"\"hi\"\"\"");
    }

    #[test]
    fn test_write_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");
        let results = vec![
            result(WalletStatus::Success),
            result(WalletStatus::Error("HTTP 503 from https://x, retry".to_string())),
        ];

        write_csv(&path, &results).unwrap();
        let contents = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(
            lines[0],
            "private_key,wallet_address,eligible,total_allocation,vested_amount,total_allocation_formatted,status"
        );
        assert_eq!(lines[1], "key,Addr1,true,5000000000,2000000000,5.000,SUCCESS");
        assert_eq!(
            lines[2],
            "key,Addr1,true,5000000000,2000000000,5.000,\"ERROR: HTTP 503 from https://x, retry\""
        );
    }

    #[test]
    fn test_single_result_is_saved() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("single.csv");
        let record = result(WalletStatus::Success);

        let written = save_results(Some(target.as_path()), std::slice::from_ref(&record)).unwrap();
        assert_eq!(written, target);
        let contents = fs::read_to_string(&written).unwrap();
        assert_eq!(contents.lines().count(), 2);
        assert!(contents.ends_with("5.000,SUCCESS\n"));
    }

    #[test]
    fn test_unwritable_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(write_csv(dir.path().join("missing/out.csv"), &[]).is_err());
    }
}
