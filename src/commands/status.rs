use anyhow::Result;

use fieldservice::db::Database;
use fieldservice::models::CallStatus;
use fieldservice::portal::Portal;
use fieldservice::store::{Invalidation, Table};

pub fn start(db: &Database, engineer_id: i64, id: i64) -> Result<()> {
    change(db, engineer_id, id, CallStatus::InProgress)
}

pub fn close(db: &Database, engineer_id: i64, id: i64) -> Result<()> {
    change(db, engineer_id, id, CallStatus::Closed)
}

fn change(db: &Database, engineer_id: i64, id: i64, requested: CallStatus) -> Result<()> {
    let mut portal = Portal::new(db, engineer_id);
    portal.refresh(Invalidation::Changed(Table::ServiceCalls))?;

    let patch = portal.request_transition(id, requested)?;
    match (patch.started_at, patch.completed_at) {
        (Some(started), _) => println!(
            "Started service call #{} at {}",
            id,
            started.format("%Y-%m-%d %H:%M:%S")
        ),
        (_, Some(completed)) => println!(
            "Closed service call #{} at {}",
            id,
            completed.format("%Y-%m-%d %H:%M:%S")
        ),
        _ => println!("Service call #{} is now {}", id, patch.status),
    }

    if let Some(queue) = portal.queue() {
        let counts = queue.counts();
        println!(
            "Assigned: {}  In Progress: {}  Closed: {}",
            counts.assigned, counts.in_progress, counts.closed
        );
    }
    Ok(())
}
