use anyhow::Result;
use std::collections::HashMap;

use crate::store::{FieldStore, Invalidation, Table};

/// Turns store change markers into `Invalidation` messages.
///
/// The first poll only records a baseline; a table is reported once per
/// observed change of its marker.
#[derive(Debug, Default)]
pub struct ChangeWatcher {
    engineer_id: i64,
    markers: HashMap<Table, String>,
}

impl ChangeWatcher {
    pub fn new(engineer_id: i64) -> Self {
        ChangeWatcher {
            engineer_id,
            markers: HashMap::new(),
        }
    }

    pub fn poll<S: FieldStore>(&mut self, store: &S) -> Result<Vec<Invalidation>> {
        let mut changed = Vec::new();
        for table in Table::ALL {
            let marker = store.change_marker(table, self.engineer_id)?;
            match self.markers.insert(table, marker.clone()) {
                Some(previous) if previous != marker => {
                    tracing::info!(%table, "change detected");
                    changed.push(Invalidation::Changed(table));
                }
                _ => {}
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests::{new_call, new_expense, seed_engineer, setup_test_db};
    use crate::models::ExpenseStatus;

    #[test]
    fn test_first_poll_is_baseline() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        db.create_service_call(&new_call("SC-1", customer, eng, None)).unwrap();

        let mut watcher = ChangeWatcher::new(eng);
        assert!(watcher.poll(&db).unwrap().is_empty());
        assert!(watcher.poll(&db).unwrap().is_empty());
    }

    #[test]
    fn test_reports_changed_table_once() {
        let (db, _dir) = setup_test_db();
        let (eng, _) = seed_engineer(&db, "a@example.com");
        let mut watcher = ChangeWatcher::new(eng);
        watcher.poll(&db).unwrap();

        db.create_expense(&new_expense(eng, "2025-11-03", "9.99", ExpenseStatus::Submitted))
            .unwrap();
        assert_eq!(
            watcher.poll(&db).unwrap(),
            vec![Invalidation::Changed(Table::Expenses)]
        );
        assert!(watcher.poll(&db).unwrap().is_empty());
    }

    #[test]
    fn test_ignores_other_engineers_rows() {
        let (db, _dir) = setup_test_db();
        let (eng, customer) = seed_engineer(&db, "a@example.com");
        let other = db.create_engineer("B", "b@example.com").unwrap();
        let mut watcher = ChangeWatcher::new(eng);
        watcher.poll(&db).unwrap();

        db.create_service_call(&new_call("SC-9", customer, other, None)).unwrap();
        assert!(watcher.poll(&db).unwrap().is_empty());
    }
}
