#![no_main]

//! Fuzz target for the read-model and lifecycle.
//!
//! Arbitrary call/expense snapshots and month strings go through
//! `partition`, `summarize` and `transition`. None of them may panic, and the
//! partition and totals invariants must hold for every input.

use arbitrary::Arbitrary;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;

use fieldservice::expenses::{month_labels, summarize, MonthFilter};
use fieldservice::lifecycle::transition;
use fieldservice::models::{
    CallCategory, CallStatus, ExpenseCategory, ExpenseStatus, ExpenseSubmission, Priority,
    ServiceCall,
};
use fieldservice::queue::partition;

#[derive(Arbitrary, Debug)]
struct ExpenseRow {
    status: u8,
    cents: u32,
    day_offset: u16,
}

#[derive(Arbitrary, Debug)]
struct WorkflowInput {
    call_statuses: Vec<u8>,
    requested: u8,
    expenses: Vec<ExpenseRow>,
    /// Free-form month filter text, e.g. "November 2025"
    month: String,
}

fuzz_target!(|input: WorkflowInput| {
    let now = Utc.with_ymd_and_hms(2025, 11, 4, 12, 0, 0).unwrap();
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();

    let calls: Vec<ServiceCall> = input
        .call_statuses
        .iter()
        .take(200)
        .enumerate()
        .map(|(i, s)| ServiceCall {
            id: i as i64,
            ticket_number: format!("SC-{}", i),
            customer_id: 1,
            engineer_id: 1,
            title: String::new(),
            description: None,
            priority: Priority::Medium,
            status: CallStatus::ALL[*s as usize % CallStatus::ALL.len()],
            category: CallCategory::Other,
            location: None,
            scheduled_at: None,
            started_at: None,
            completed_at: None,
            notes: None,
            created_at: now,
            updated_at: now,
            customer: None,
        })
        .collect();

    let requested = CallStatus::ALL[input.requested as usize % CallStatus::ALL.len()];
    for call in &calls {
        let allowed = call.status.can_transition_to(requested);
        assert_eq!(transition(call, requested, now).is_ok(), allowed);
    }

    let total_calls = calls.len();
    let queue = partition(calls);
    assert_eq!(queue.len(), total_calls);

    let expenses: Vec<ExpenseSubmission> = input
        .expenses
        .iter()
        .take(500)
        .enumerate()
        .map(|(i, row)| ExpenseSubmission {
            id: i as i64,
            engineer_id: 1,
            expense_date: base + Duration::days(i64::from(row.day_offset % 4000)),
            category: ExpenseCategory::Other,
            amount: Decimal::new(i64::from(row.cents) + 1, 2),
            currency: "USD".to_string(),
            description: String::new(),
            receipt_url: None,
            service_call_id: None,
            status: ExpenseStatus::ALL[row.status as usize % ExpenseStatus::ALL.len()],
            submitted_at: None,
            reviewed_at: None,
            reviewed_by: None,
            review_notes: None,
            payment_date: None,
            created_at: now,
            updated_at: now,
        })
        .collect();

    let filter = input.month.parse::<MonthFilter>().unwrap_or(MonthFilter::All);
    let summary = summarize(&expenses, &filter);
    assert!(summary.totals.approved + summary.totals.pending <= summary.totals.total);

    let labels = month_labels(&expenses);
    assert!(labels.windows(2).all(|w| w[0] > w[1]));
});
