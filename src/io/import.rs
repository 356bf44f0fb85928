use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use crate::domain::{parse_amount, LedgerEntry};

/// Column positions in a ledger batch file: date,account,memo,debit,credit
const DATE: usize = 0;
const ACCOUNT: usize = 1;
const DEBIT: usize = 3;
const CREDIT: usize = 4;

/// Every ledger entry of an input directory, read once.
///
/// A snapshot never refreshes itself. Files changed on disk after
/// `load` are only seen by loading a new snapshot.
#[derive(Debug, Clone)]
pub struct LedgerSnapshot {
    pub entries: Vec<LedgerEntry>,
    pub files: Vec<PathBuf>,
    /// Rows dropped because they were unreadable or had no account
    pub skipped: usize,
    pub loaded_at: DateTime<Utc>,
}

impl LedgerSnapshot {
    /// Read all `*.csv` files in `dir`, in file name order.
    pub fn load(dir: &Path) -> Result<Self> {
        let files = ledger_files(dir)?;
        let mut entries = Vec::new();
        let mut skipped = 0;

        for path in &files {
            let file =
                File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
            let parsed = parse_ledger_csv(file)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            tracing::debug!(
                file = %path.display(),
                entries = parsed.entries.len(),
                skipped = parsed.skipped,
                "Read ledger file"
            );
            entries.extend(parsed.entries);
            skipped += parsed.skipped;
        }

        tracing::info!(
            dir = %dir.display(),
            files = files.len(),
            entries = entries.len(),
            skipped,
            "Loaded ledger snapshot"
        );

        Ok(Self {
            entries,
            files,
            skipped,
            loaded_at: Utc::now(),
        })
    }

    /// `load` on tokio's blocking pool, for callers on an async worker.
    pub async fn load_async(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        tokio::task::spawn_blocking(move || Self::load(&dir))
            .await
            .context("Ledger load task failed")?
    }

    /// Build a snapshot from entries already in memory.
    pub fn from_entries(entries: Vec<LedgerEntry>) -> Self {
        Self {
            entries,
            files: Vec::new(),
            skipped: 0,
            loaded_at: Utc::now(),
        }
    }
}

/// Result of reading one ledger file
#[derive(Debug, Clone, Default)]
pub struct ParsedLedger {
    pub entries: Vec<LedgerEntry>,
    pub skipped: usize,
}

/// Parse ledger rows. There is no header row.
///
/// Missing or malformed amounts count as zero. Rows without an account,
/// or that are not valid UTF-8, are skipped and counted.
pub fn parse_ledger_csv<R: Read>(reader: R) -> Result<ParsedLedger> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut parsed = ParsedLedger::default();

    for (line_num, result) in csv_reader.records().enumerate() {
        let record = match result {
            Ok(r) => r,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                tracing::warn!(line = line_num + 1, error = %e, "Skipping unreadable ledger row");
                parsed.skipped += 1;
                continue;
            }
        };

        let account = record.get(ACCOUNT).unwrap_or("");
        if account.is_empty() {
            parsed.skipped += 1;
            continue;
        }

        parsed.entries.push(LedgerEntry::new(
            record.get(DATE).unwrap_or(""),
            account,
            parse_amount(record.get(DEBIT).unwrap_or("")),
            parse_amount(record.get(CREDIT).unwrap_or("")),
        ));
    }

    Ok(parsed)
}

fn ledger_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let listing = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read ledger directory {}", dir.display()))?;

    for dir_entry in listing {
        let path = dir_entry
            .with_context(|| format!("Failed to list {}", dir.display()))?
            .path();
        let is_csv = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_rows() {
        let data = "2024-01-01,Cash,opening,100,0\n2024-01-02,Cash,withdrawal,,40.50\n";
        let parsed = parse_ledger_csv(data.as_bytes()).unwrap();

        assert_eq!(
            parsed.entries,
            vec![
                LedgerEntry::new("2024-01-01", "Cash", Decimal::from(100), Decimal::ZERO),
                LedgerEntry::new("2024-01-02", "Cash", Decimal::ZERO, Decimal::new(4050, 2)),
            ]
        );
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_missing_and_malformed_amounts_are_zero() {
        let data = "2024-01-01,Inventory\n2024-01-01,Inventory,memo,abc,12x\n2024-01-01,Inventory,memo,7\n";
        let parsed = parse_ledger_csv(data.as_bytes()).unwrap();

        assert_eq!(parsed.entries.len(), 3);
        assert_eq!(parsed.entries[0].amount().unwrap(), Decimal::ZERO);
        assert_eq!(parsed.entries[1].amount().unwrap(), Decimal::ZERO);
        assert_eq!(parsed.entries[2].amount().unwrap(), Decimal::from(7));
    }

    #[test]
    fn test_rows_without_account_are_skipped() {
        let data = "2024-01-01,,memo,5,0\n2024-01-01\n2024-01-01,Cash,memo,5,0\n";
        let parsed = parse_ledger_csv(data.as_bytes()).unwrap();

        assert_eq!(parsed.entries.len(), 1);
        assert_eq!(parsed.skipped, 2);
    }

    #[test]
    fn test_fields_are_trimmed() {
        let data = " 2024-03-01 , Cash , memo , 10 , 2 \n";
        let parsed = parse_ledger_csv(data.as_bytes()).unwrap();
        assert_eq!(
            parsed.entries,
            vec![LedgerEntry::new(
                "2024-03-01",
                "Cash",
                Decimal::from(10),
                Decimal::from(2)
            )]
        );
    }
}
