use anyhow::{Context, Result};
use std::path::Path;

use crate::domain::{
    format_amount, trial_balance, yearly_cash, FinancialStatement, LedgerEntry, SectionBalances,
};

/// Trial balance: every account with debit - credit, in first-seen order.
pub fn render_trial_balance(entries: &[LedgerEntry]) -> Result<String> {
    let mut csv_writer = report_writer();
    csv_writer.write_record(["Account", "Balance"])?;

    for (account, balance) in trial_balance(entries)?.iter() {
        csv_writer.write_record([account, format_amount(balance).as_str()])?;
    }

    finish(csv_writer)
}

/// Net cash movement per financial year, oldest year first.
pub fn render_yearly_cash(entries: &[LedgerEntry]) -> Result<String> {
    let mut csv_writer = report_writer();
    csv_writer.write_record(["Financial Year", "Cash Balance"])?;

    for (year, balance) in yearly_cash(entries)? {
        csv_writer.write_record([year, format_amount(balance)])?;
    }

    finish(csv_writer)
}

/// Income statement followed by the balance sheet.
///
/// The closing `Assets = Liabilities + Equity` line shows both sides as
/// computed; a statement that does not balance is printed as is.
pub fn render_financial_statement(entries: &[LedgerEntry]) -> Result<String> {
    let fs = FinancialStatement::compute(entries)?;
    let mut csv_writer = report_writer();

    csv_writer.write_record(["Basic Financial Statement"])?;

    csv_writer.write_record(["Income Statement"])?;
    write_section(&mut csv_writer, "Revenues", &fs.revenues, "Total Revenue")?;
    write_section(&mut csv_writer, "Expenses", &fs.expenses, "Total Expenses")?;
    csv_writer.write_record(["Net Income", format_amount(fs.net_income).as_str()])?;

    csv_writer.write_record(["Balance Sheet"])?;
    write_section(&mut csv_writer, "Assets", &fs.assets, "Total Assets")?;
    write_section(
        &mut csv_writer,
        "Liabilities",
        &fs.liabilities,
        "Total Liabilities",
    )?;

    csv_writer.write_record(["Equity"])?;
    for &(account, balance) in &fs.equity.lines {
        csv_writer.write_record([account, format_amount(balance).as_str()])?;
    }
    csv_writer.write_record(["Retained Earnings", format_amount(fs.net_income).as_str()])?;
    csv_writer.write_record(["Total Equity", format_amount(fs.total_equity).as_str()])?;

    let (assets, liabilities_and_equity) = fs.reconciliation();
    csv_writer.write_record([
        "Assets = Liabilities + Equity".to_string(),
        format!(
            " {} = {}",
            format_amount(assets),
            format_amount(liabilities_and_equity)
        ),
    ])?;

    finish(csv_writer)
}

/// Write a rendered report, replacing whatever was there.
pub async fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn write_section(
    csv_writer: &mut csv::Writer<Vec<u8>>,
    title: &str,
    section: &SectionBalances,
    total_label: &str,
) -> Result<()> {
    csv_writer.write_record([title])?;
    for &(account, balance) in &section.lines {
        csv_writer.write_record([account, format_amount(balance).as_str()])?;
    }
    csv_writer.write_record([total_label, format_amount(section.total).as_str()])?;
    Ok(())
}

fn report_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new())
}

fn finish(csv_writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = csv_writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush report: {}", e))?;
    String::from_utf8(bytes).context("Report is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::parse_amount;

    fn entry(date: &str, account: &str, debit: &str, credit: &str) -> LedgerEntry {
        LedgerEntry::new(date, account, parse_amount(debit), parse_amount(credit))
    }

    #[test]
    fn test_trial_balance_report() {
        let entries = vec![
            entry("2024-01-01", "A", "100", "0"),
            entry("2024-01-02", "B", "0", "25"),
            entry("2024-01-03", "A", "0", "40"),
        ];
        let report = render_trial_balance(&entries).unwrap();
        assert_eq!(report, "Account,Balance\nA,60.00\nB,-25.00\n");
    }

    #[test]
    fn test_trial_balance_report_empty() {
        assert_eq!(render_trial_balance(&[]).unwrap(), "Account,Balance\n");
    }

    #[test]
    fn test_trial_balance_rounds_after_summing() {
        let entries = vec![
            entry("2024-01-01", "A", "0.005", ""),
            entry("2024-01-01", "A", "0.005", ""),
            entry("2024-01-01", "B", "100.999", ""),
        ];
        let report = render_trial_balance(&entries).unwrap();
        assert_eq!(report, "Account,Balance\nA,0.01\nB,101.00\n");
    }

    #[test]
    fn test_overflowing_totals_fail_the_render() {
        let big = "50000000000000000000000000000";
        let entries = vec![
            entry("2024-01-01", "Cash", big, ""),
            entry("2024-01-02", "Cash", big, ""),
        ];
        assert!(render_trial_balance(&entries).is_err());
        assert!(render_yearly_cash(&entries).is_err());
        assert!(render_financial_statement(&entries).is_err());
    }

    #[test]
    fn test_yearly_cash_report() {
        let entries = vec![
            entry("2024-05-01", "Cash", "0", "30"),
            entry("2023-01-01", "Cash", "100", "0"),
        ];
        let report = render_yearly_cash(&entries).unwrap();
        assert_eq!(
            report,
            "Financial Year,Cash Balance\n2023,100.00\n2024,-30.00\n"
        );
    }

    #[test]
    fn test_account_names_with_commas_are_quoted() {
        let entries = vec![entry("2024-01-01", "Loans, long term", "1", "0")];
        let report = render_trial_balance(&entries).unwrap();
        assert_eq!(report, "Account,Balance\n\"Loans, long term\",1.00\n");
    }

    #[test]
    fn test_financial_statement_layout() {
        let entries = vec![
            entry("2024-01-01", "Cash", "1000", "0"),
            entry("2024-01-01", "Common Stock", "0", "1000"),
            entry("2024-02-01", "Rent Expense", "200", "0"),
            entry("2024-02-01", "Cash", "0", "200"),
        ];
        let report = render_financial_statement(&entries).unwrap();
        let lines: Vec<&str> = report.lines().collect();

        assert_eq!(lines[0], "Basic Financial Statement");
        assert!(lines.contains(&"Rent Expense,200.00"));
        assert!(lines.contains(&"Total Expenses,200.00"));
        assert!(lines.contains(&"Net Income,-200.00"));
        assert!(lines.contains(&"Total Assets,800.00"));
        assert!(lines.contains(&"Retained Earnings,-200.00"));
        assert!(lines.contains(&"Total Equity,-1200.00"));
        assert_eq!(
            lines.last(),
            Some(&"Assets = Liabilities + Equity, 800.00 = -1200.00")
        );
    }
}
