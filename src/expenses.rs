//! Month bucketing and exact totals over an engineer's expense submissions.

use anyhow::{bail, Result};
use chrono::{Datelike, Month, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use crate::models::ExpenseSubmission;

/// A calendar month, displayed as "November 2025". Orders chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthLabel {
    year: i32,
    month: u32,
}

impl MonthLabel {
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            bail!("Invalid month {}", month);
        }
        Ok(MonthLabel { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        MonthLabel {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for MonthLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = u8::try_from(self.month)
            .ok()
            .and_then(|m| Month::try_from(m).ok())
            .map(|m| m.name())
            .unwrap_or("?");
        write!(f, "{} {}", name, self.year)
    }
}

impl Serialize for MonthLabel {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl FromStr for MonthLabel {
    type Err = anyhow::Error;

    /// Accepts "November 2025", "Nov 2025" or "2025-11".
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some((year, month)) = s.split_once('-') {
            if let (Ok(year), Ok(month)) = (year.parse::<i32>(), month.parse::<u32>()) {
                return MonthLabel::new(year, month);
            }
        }
        if let Some((name, year)) = s.rsplit_once(' ') {
            if let (Ok(month), Ok(year)) = (name.trim().parse::<Month>(), year.parse::<i32>()) {
                return MonthLabel::new(year, month.number_from_month());
            }
        }
        bail!(
            "Invalid month '{}'. Use a label like \"November 2025\" or \"2025-11\"",
            s
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MonthFilter {
    #[default]
    All,
    Month(MonthLabel),
}

impl MonthFilter {
    pub fn matches(&self, expense: &ExpenseSubmission) -> bool {
        match self {
            MonthFilter::All => true,
            MonthFilter::Month(label) => label.contains(expense.expense_date),
        }
    }
}

impl FromStr for MonthFilter {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(MonthFilter::All)
        } else {
            Ok(MonthFilter::Month(s.parse()?))
        }
    }
}

impl fmt::Display for MonthFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonthFilter::All => f.write_str("all"),
            MonthFilter::Month(label) => fmt::Display::fmt(label, f),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ExpenseTotals {
    pub total: Decimal,
    pub approved: Decimal,
    pub pending: Decimal,
    /// A sum left the representable range. Affected figures are clamped to
    /// the nearest bound and must not be read as exact.
    pub out_of_range: bool,
}

impl ExpenseTotals {
    fn add_to(sum: &mut Decimal, amount: Decimal, out_of_range: &mut bool) {
        match sum.checked_add(amount) {
            Some(next) => *sum = next,
            None => {
                *sum = sum.saturating_add(amount);
                *out_of_range = true;
            }
        }
    }

    fn record(&mut self, expense: &ExpenseSubmission) {
        Self::add_to(&mut self.total, expense.amount, &mut self.out_of_range);
        if expense.status.is_approved() {
            Self::add_to(&mut self.approved, expense.amount, &mut self.out_of_range);
        } else if expense.status.is_pending() {
            Self::add_to(&mut self.pending, expense.amount, &mut self.out_of_range);
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseSummary<'a> {
    pub filtered: Vec<&'a ExpenseSubmission>,
    pub totals: ExpenseTotals,
}

/// Distinct months present in `expenses`, newest first.
pub fn month_labels(expenses: &[ExpenseSubmission]) -> Vec<MonthLabel> {
    let labels: BTreeSet<MonthLabel> = expenses
        .iter()
        .map(|e| MonthLabel::of(e.expense_date))
        .collect();
    labels.into_iter().rev().collect()
}

pub fn summarize<'a>(expenses: &'a [ExpenseSubmission], filter: &MonthFilter) -> ExpenseSummary<'a> {
    let filtered: Vec<&ExpenseSubmission> = expenses.iter().filter(|e| filter.matches(e)).collect();

    let mut totals = ExpenseTotals::default();
    for expense in &filtered {
        totals.record(expense);
    }
    if totals.out_of_range {
        tracing::warn!(records = filtered.len(), %filter, "expense totals out of range");
    }

    ExpenseSummary { filtered, totals }
}
