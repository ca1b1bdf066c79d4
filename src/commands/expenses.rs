use anyhow::Result;
use std::fmt::Write as _;

use fieldservice::db::Database;
use fieldservice::expenses::{ExpenseSummary, MonthFilter};
use fieldservice::portal::Portal;
use fieldservice::store::{Invalidation, Table};

use super::truncate;

pub fn list(db: &Database, engineer_id: i64, filter: &MonthFilter) -> Result<()> {
    let mut portal = Portal::new(db, engineer_id);
    portal.refresh(Invalidation::Changed(Table::Expenses))?;

    let summary = portal.expense_summary(filter);
    print!("{}", render_summary(&summary, filter));
    Ok(())
}

pub fn months(db: &Database, engineer_id: i64) -> Result<()> {
    let mut portal = Portal::new(db, engineer_id);
    portal.refresh(Invalidation::Changed(Table::Expenses))?;

    let labels = portal.month_labels();
    if labels.is_empty() {
        println!("No expenses found.");
        return Ok(());
    }
    println!("all");
    for label in labels {
        println!("{}", label);
    }
    Ok(())
}

pub fn render_summary(summary: &ExpenseSummary<'_>, filter: &MonthFilter) -> String {
    let mut out = String::new();

    if summary.filtered.is_empty() {
        let _ = writeln!(out, "No expenses found for {}.", filter);
    }
    for expense in &summary.filtered {
        let _ = writeln!(
            out,
            "#{:<4} {} {} {:<14} {:<32} {:>10} {:<3} [{}]",
            expense.id,
            expense.expense_date.format("%Y-%m-%d"),
            expense.category.icon(),
            expense.category,
            truncate(&expense.description, 32),
            expense.amount.round_dp(2),
            expense.currency,
            expense.status
        );
    }

    let totals = &summary.totals;
    let _ = writeln!(out);
    let _ = writeln!(out, "Month:    {}", filter);
    let _ = writeln!(out, "Total:    {:.2}", totals.total);
    let _ = writeln!(out, "Approved: {:.2}", totals.approved);
    let _ = writeln!(out, "Pending:  {:.2}", totals.pending);
    if totals.out_of_range {
        let _ = writeln!(out, "Warning: totals exceed the supported range and are capped.");
    }
    out
}
