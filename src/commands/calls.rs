use anyhow::{bail, Result};
use std::fmt::Write as _;

use fieldservice::db::Database;
use fieldservice::models::{CallStatus, ServiceCall};
use fieldservice::portal::Portal;
use fieldservice::queue::CallQueue;
use fieldservice::store::{Invalidation, Table};

use super::truncate;

pub fn list(db: &Database, engineer_id: i64, only: Option<CallStatus>) -> Result<()> {
    let mut portal = Portal::new(db, engineer_id);
    portal.refresh(Invalidation::Changed(Table::ServiceCalls))?;

    match portal.queue() {
        Some(queue) => print!("{}", render_queue(queue, only)),
        None => println!("No service calls."),
    }
    Ok(())
}

fn bucket_heading(status: CallStatus) -> &'static str {
    match status {
        CallStatus::Assigned => "Assigned",
        CallStatus::InProgress => "In Progress",
        CallStatus::Closed => "Closed",
    }
}

pub fn render_queue(queue: &CallQueue, only: Option<CallStatus>) -> String {
    let mut out = String::new();
    let counts = queue.counts();
    let _ = writeln!(
        out,
        "Assigned: {}  In Progress: {}  Closed: {}",
        counts.assigned, counts.in_progress, counts.closed
    );

    for status in CallStatus::ALL {
        if only.is_some_and(|s| s != *status) {
            continue;
        }
        let calls = queue.bucket(*status);
        let _ = writeln!(out, "\n{} {} ({})", status.icon(), bucket_heading(*status), calls.len());
        if calls.is_empty() {
            let _ = writeln!(out, "  (none)");
        }
        for call in calls {
            let _ = writeln!(out, "  {}", render_row(call));
        }
    }
    out
}

fn render_row(call: &ServiceCall) -> String {
    let scheduled = call
        .scheduled_at
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unscheduled".to_string());
    let customer = call
        .customer
        .as_ref()
        .map(|c| c.name.as_str())
        .unwrap_or("-");
    format!(
        "#{:<4} {:<12} {} {:<36} {:<20} {}",
        call.id,
        call.ticket_number,
        call.priority.icon(),
        truncate(&call.title, 36),
        truncate(customer, 20),
        scheduled
    )
}

pub fn show(db: &Database, engineer_id: i64, id: i64) -> Result<()> {
    let call = match db.get_service_call(id)? {
        Some(c) if c.engineer_id == engineer_id => c,
        _ => bail!("Service call #{} not found", id),
    };

    println!("Service call #{} [{}]: {}", call.id, call.ticket_number, call.title);
    println!("Status: {} {}", call.status.icon(), call.status);
    println!("Priority: {} {}", call.priority.icon(), call.priority);
    println!("Category: {}", call.category);
    if let Some(location) = &call.location {
        println!("Location: {}", location);
    }
    if let Some(scheduled) = call.scheduled_at {
        println!("Scheduled: {}", scheduled.format("%Y-%m-%d %H:%M"));
    }
    if let Some(started) = call.started_at {
        println!("Started: {}", started.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(completed) = call.completed_at {
        println!("Completed: {}", completed.format("%Y-%m-%d %H:%M:%S"));
    }

    if let Some(customer) = &call.customer {
        println!("\nCustomer: {}", customer.name);
        if let Some(company) = &customer.company {
            println!("  Company: {}", company);
        }
        if let Some(address) = &customer.address {
            println!("  Address: {}", address);
        }
        if let Some(phone) = &customer.phone {
            println!("  Phone: {}", phone);
        }
        if let Some(email) = &customer.email {
            println!("  Email: {}", email);
        }
    }

    if let Some(desc) = &call.description {
        if !desc.is_empty() {
            println!("\nDescription:");
            for line in desc.lines() {
                println!("  {}", line);
            }
        }
    }

    if let Some(notes) = &call.notes {
        if !notes.is_empty() {
            println!("\nNotes:");
            for line in notes.lines() {
                println!("  {}", line);
            }
        }
    }

    let next: Vec<&str> = call
        .status
        .allowed_next_states()
        .iter()
        .map(|s| match s {
            CallStatus::InProgress => "start",
            CallStatus::Closed => "close",
            CallStatus::Assigned => "assign",
        })
        .collect();
    if !next.is_empty() {
        println!("\nNext: fieldservice {} {}", next.join("|"), call.id);
    }

    Ok(())
}
