use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::{self, Write};

use fieldservice::db::Database;
use fieldservice::expenses::{ExpenseTotals, MonthFilter};
use fieldservice::models::{ExpenseSubmission, ServiceCall};
use fieldservice::portal::Portal;
use fieldservice::queue::QueueCounts;
use fieldservice::store::Invalidation;

#[derive(Serialize)]
pub struct ExportData<'a> {
    pub version: i32,
    pub exported_at: String,
    pub engineer_id: i64,
    pub month: String,
    pub counts: QueueCounts,
    pub assigned: &'a [ServiceCall],
    pub in_progress: &'a [ServiceCall],
    pub closed: &'a [ServiceCall],
    pub months: Vec<String>,
    pub expenses: Vec<&'a ExpenseSubmission>,
    pub totals: ExpenseTotals,
}

pub fn run_json(
    db: &Database,
    engineer_id: i64,
    filter: &MonthFilter,
    output_path: Option<&str>,
) -> Result<()> {
    let mut portal = Portal::new(db, engineer_id);
    portal.refresh(Invalidation::Manual)?;

    let queue = portal.queue().cloned().unwrap_or_default();
    let summary = portal.expense_summary(filter);
    let data = ExportData {
        version: 1,
        exported_at: chrono::Utc::now().to_rfc3339(),
        engineer_id,
        month: filter.to_string(),
        counts: queue.counts(),
        assigned: &queue.assigned,
        in_progress: &queue.in_progress,
        closed: &queue.closed,
        months: portal.month_labels().iter().map(|l| l.to_string()).collect(),
        expenses: summary.filtered,
        totals: summary.totals,
    };

    let json = serde_json::to_string_pretty(&data)?;

    match output_path {
        Some(path) => {
            fs::write(path, json).context("Failed to write export file")?;
            eprintln!(
                "Exported {} calls and {} expenses to {}",
                queue.len(),
                data.expenses.len(),
                path
            );
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", json)?;
        }
    }
    Ok(())
}
