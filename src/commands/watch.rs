use anyhow::{Context, Result};
use signal_hook::consts::{SIGINT, SIGTERM};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use fieldservice::db::Database;
use fieldservice::expenses::MonthFilter;
use fieldservice::portal::Portal;
use fieldservice::store::Invalidation;
use fieldservice::watch::ChangeWatcher;

use super::calls::render_queue;
use super::expenses::render_summary;

/// Re-render the engineer's queue and expense totals whenever the store
/// reports a change. Runs until SIGINT or SIGTERM.
pub fn run(db: &Database, engineer_id: i64, filter: &MonthFilter, poll_interval: Duration) -> Result<()> {
    let stop = Arc::new(AtomicBool::new(false));
    signal_hook::flag::register(SIGINT, Arc::clone(&stop)).context("Failed to install SIGINT handler")?;
    signal_hook::flag::register(SIGTERM, Arc::clone(&stop)).context("Failed to install SIGTERM handler")?;

    let mut portal = Portal::new(db, engineer_id);
    let mut watcher = ChangeWatcher::new(engineer_id);

    watcher.poll(db)?;
    portal.refresh(Invalidation::Manual)?;
    render(&portal, filter);
    println!("Watching for changes every {} ms (Ctrl-C to stop)", poll_interval.as_millis());

    while !stop.load(Ordering::Relaxed) {
        thread::sleep(poll_interval);

        let changes = match watcher.poll(db) {
            Ok(c) => c,
            Err(e) => {
                tracing::warn!(error = %e, "change poll failed");
                continue;
            }
        };
        if step(&mut portal, &changes) {
            render(&portal, filter);
        }
    }

    println!("Stopped watching.");
    Ok(())
}

/// Feed change notices into the portal. Returns whether anything was applied.
fn step(portal: &mut Portal<&Database>, changes: &[Invalidation]) -> bool {
    let mut applied = false;
    for change in changes {
        match portal.refresh(*change) {
            Ok(()) => applied = true,
            Err(e) => tracing::warn!(error = %e, ?change, "refresh after change failed"),
        }
    }
    applied
}

fn render(portal: &Portal<&Database>, filter: &MonthFilter) {
    println!("\n=== {} ===", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    if let Some(queue) = portal.queue() {
        print!("{}", render_queue(queue, None));
    }
    println!();
    print!("{}", render_summary(&portal.expense_summary(filter), filter));
}
