use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Datelike, NaiveDate};
use rust_decimal::Decimal;

use super::{checked_total, Amount, AmountOverflow};

/// Account name the yearly cash report follows.
pub const CASH_ACCOUNT: &str = "Cash";

/// One row of a ledger batch file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub date: String,
    pub account: String,
    pub debit: Amount,
    pub credit: Amount,
}

impl LedgerEntry {
    pub fn new(
        date: impl Into<String>,
        account: impl Into<String>,
        debit: Amount,
        credit: Amount,
    ) -> Self {
        Self {
            date: date.into(),
            account: account.into(),
            debit,
            credit,
        }
    }

    /// Signed effect on the account: debit - credit.
    pub fn amount(&self) -> Result<Amount, AmountOverflow> {
        self.debit
            .checked_sub(self.credit)
            .ok_or_else(|| AmountOverflow(format!("entry of account {}", self.account)))
    }

    /// Calendar year of the entry, if the date is readable.
    pub fn year(&self) -> Option<String> {
        entry_year(&self.date)
    }
}

/// Extract the calendar year from a ledger date.
/// Accepts YYYY-MM-DD, YYYY/MM/DD, RFC 3339, and anything that at least
/// starts with four digits.
pub fn entry_year(date: &str) -> Option<String> {
    let date = date.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d"] {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, format) {
            return Some(format!("{:04}", parsed.year()));
        }
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(date) {
        return Some(format!("{:04}", parsed.year()));
    }

    let prefix = date.get(..4)?;
    prefix
        .bytes()
        .all(|b| b.is_ascii_digit())
        .then(|| prefix.to_string())
}

/// Per-account balances, kept in the order each account was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountBalances {
    balances: Vec<(String, Amount)>,
    index: HashMap<String, usize>,
}

impl AccountBalances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `amount` to `account`, registering the account if it is new.
    pub fn add(&mut self, account: &str, amount: Amount) -> Result<(), AmountOverflow> {
        match self.index.get(account) {
            Some(&i) => {
                let balance = &mut self.balances[i].1;
                *balance = checked_total(*balance, amount, &format!("account {}", account))?;
            }
            None => {
                self.index.insert(account.to_string(), self.balances.len());
                self.balances.push((account.to_string(), amount));
            }
        }
        Ok(())
    }

    pub fn get(&self, account: &str) -> Option<Amount> {
        self.index.get(account).map(|&i| self.balances[i].1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Amount)> {
        self.balances
            .iter()
            .map(|(name, amount)| (name.as_str(), *amount))
    }
}

/// Balance of every account across all entries.
pub fn trial_balance(entries: &[LedgerEntry]) -> Result<AccountBalances, AmountOverflow> {
    let mut balances = AccountBalances::new();
    for entry in entries {
        balances.add(&entry.account, entry.amount()?)?;
    }
    Ok(balances)
}

/// Net cash movement per calendar year, ordered by year.
/// Cash entries whose date has no readable year are left out.
pub fn yearly_cash(entries: &[LedgerEntry]) -> Result<BTreeMap<String, Amount>, AmountOverflow> {
    let mut years: BTreeMap<String, Amount> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.account == CASH_ACCOUNT) {
        let Some(year) = entry.year() else {
            tracing::warn!(date = %entry.date, "Skipping cash entry with unreadable date");
            continue;
        };
        let amount = entry.amount()?;
        let total = years.entry(year).or_insert(Decimal::ZERO);
        *total = checked_total(*total, amount, "yearly cash")?;
    }
    Ok(years)
}

// ========================
// Financial statement
// ========================

pub const REVENUE_ACCOUNTS: &[&str] = &["Sales Revenue"];

pub const EXPENSE_ACCOUNTS: &[&str] = &[
    "Cost of Goods Sold",
    "Salaries Expense",
    "Rent Expense",
    "Utilities Expense",
    "Interest Expense",
    "Tax Expense",
];

pub const ASSET_ACCOUNTS: &[&str] = &[
    "Cash",
    "Accounts Receivable",
    "Inventory",
    "Fixed Assets",
    "Prepaid Expenses",
];

pub const LIABILITY_ACCOUNTS: &[&str] = &[
    "Accounts Payable",
    "Loan Payable",
    "Sales Tax Payable",
    "Accrued Liabilities",
    "Unearned Revenue",
    "Dividends Payable",
];

pub const EQUITY_ACCOUNTS: &[&str] = &["Common Stock"];

/// Balances of one taxonomy section, in taxonomy order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionBalances {
    pub lines: Vec<(&'static str, Amount)>,
    pub total: Amount,
}

impl SectionBalances {
    fn collect(
        title: &str,
        accounts: &'static [&'static str],
        balances: &AccountBalances,
    ) -> Result<Self, AmountOverflow> {
        let lines: Vec<(&'static str, Amount)> = accounts
            .iter()
            .map(|&name| (name, balances.get(name).unwrap_or(Decimal::ZERO)))
            .collect();
        let total = lines
            .iter()
            .try_fold(Decimal::ZERO, |sum, &(_, amount)| {
                checked_total(sum, amount, title)
            })?;
        Ok(Self { lines, total })
    }
}

/// Income statement and balance sheet over the fixed account taxonomy.
/// Accounts outside the taxonomy do not contribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinancialStatement {
    pub revenues: SectionBalances,
    pub expenses: SectionBalances,
    pub net_income: Amount,
    pub assets: SectionBalances,
    pub liabilities: SectionBalances,
    pub equity: SectionBalances,
    /// Listed equity plus net income carried as retained earnings.
    pub total_equity: Amount,
    liabilities_and_equity: Amount,
}

impl FinancialStatement {
    pub fn compute(entries: &[LedgerEntry]) -> Result<Self, AmountOverflow> {
        let mut balances = AccountBalances::new();
        for entry in entries {
            if is_taxonomy_account(&entry.account) {
                balances.add(&entry.account, entry.amount()?)?;
            }
        }

        let revenues = SectionBalances::collect("revenues", REVENUE_ACCOUNTS, &balances)?;
        let expenses = SectionBalances::collect("expenses", EXPENSE_ACCOUNTS, &balances)?;
        let net_income = revenues
            .total
            .checked_sub(expenses.total)
            .ok_or_else(|| AmountOverflow("net income".to_string()))?;
        let assets = SectionBalances::collect("assets", ASSET_ACCOUNTS, &balances)?;
        let liabilities = SectionBalances::collect("liabilities", LIABILITY_ACCOUNTS, &balances)?;
        let equity = SectionBalances::collect("equity", EQUITY_ACCOUNTS, &balances)?;
        let total_equity = checked_total(equity.total, net_income, "total equity")?;
        let liabilities_and_equity =
            checked_total(liabilities.total, total_equity, "liabilities and equity")?;

        Ok(Self {
            revenues,
            expenses,
            net_income,
            assets,
            liabilities,
            equity,
            total_equity,
            liabilities_and_equity,
        })
    }

    /// Both sides of `Assets = Liabilities + Equity`. Display only: the
    /// two values are not required to match.
    pub fn reconciliation(&self) -> (Amount, Amount) {
        (self.assets.total, self.liabilities_and_equity)
    }
}

fn is_taxonomy_account(account: &str) -> bool {
    [
        REVENUE_ACCOUNTS,
        EXPENSE_ACCOUNTS,
        ASSET_ACCOUNTS,
        LIABILITY_ACCOUNTS,
        EQUITY_ACCOUNTS,
    ]
    .iter()
    .any(|section| section.contains(&account))
}
