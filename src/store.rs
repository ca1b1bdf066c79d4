//! The data-access seam between the portal core and its backing store.
//!
//! The core only ever reads engineer-scoped snapshots and issues single-record
//! status updates; the store is the sole arbiter of concurrent writes.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::lifecycle::StatusPatch;
use crate::models::{CallStatus, ExpenseSubmission, ServiceCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Table {
    ServiceCalls,
    Expenses,
}

impl Table {
    pub const ALL: [Table; 2] = [Table::ServiceCalls, Table::Expenses];
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Table::ServiceCalls => f.write_str("service_calls"),
            Table::Expenses => f.write_str("expense_submissions"),
        }
    }
}

/// Why a refresh was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Invalidation {
    /// User asked for fresh data: re-fetch everything.
    Manual,
    /// Rows matching the engineer's filter changed in one table.
    Changed(Table),
}

pub trait FieldStore {
    /// Calls assigned to `engineer_id`, customer embedded, scheduled date ascending.
    fn fetch_service_calls(&self, engineer_id: i64) -> Result<Vec<ServiceCall>>;

    /// Apply `patch` to call `id` if it is still owned by `engineer_id` and
    /// still in `expected` status. Returns `false` when no row matched.
    fn update_service_call(
        &self,
        id: i64,
        engineer_id: i64,
        expected: CallStatus,
        patch: &StatusPatch,
    ) -> Result<bool>;

    /// Expenses submitted by `engineer_id`, expense date descending.
    fn fetch_expenses(&self, engineer_id: i64) -> Result<Vec<ExpenseSubmission>>;

    /// Opaque token that changes whenever a row of `table` visible to
    /// `engineer_id` is inserted, updated or deleted.
    fn change_marker(&self, table: Table, engineer_id: i64) -> Result<String>;
}

impl<S: FieldStore + ?Sized> FieldStore for &S {
    fn fetch_service_calls(&self, engineer_id: i64) -> Result<Vec<ServiceCall>> {
        (**self).fetch_service_calls(engineer_id)
    }

    fn update_service_call(
        &self,
        id: i64,
        engineer_id: i64,
        expected: CallStatus,
        patch: &StatusPatch,
    ) -> Result<bool> {
        (**self).update_service_call(id, engineer_id, expected, patch)
    }

    fn fetch_expenses(&self, engineer_id: i64) -> Result<Vec<ExpenseSubmission>> {
        (**self).fetch_expenses(engineer_id)
    }

    fn change_marker(&self, table: Table, engineer_id: i64) -> Result<String> {
        (**self).change_marker(table, engineer_id)
    }
}
