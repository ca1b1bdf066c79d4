//! The engineer's view of the store: versioned call queue and expense
//! snapshots, refreshed on demand and after every status change.

use anyhow::Result;

use crate::expenses::{self, ExpenseSummary, MonthFilter, MonthLabel};
use crate::lifecycle::{self, LifecycleError, StatusPatch};
use crate::models::{CallStatus, ExpenseSubmission};
use crate::queue::{self, CallQueue};
use crate::snapshot::SnapshotCell;
use crate::store::{FieldStore, Invalidation, Table};

pub struct Portal<S> {
    store: S,
    engineer_id: i64,
    calls: SnapshotCell<CallQueue>,
    expenses: SnapshotCell<Vec<ExpenseSubmission>>,
}

impl<S: FieldStore> Portal<S> {
    pub fn new(store: S, engineer_id: i64) -> Self {
        Portal {
            store,
            engineer_id,
            calls: SnapshotCell::new(),
            expenses: SnapshotCell::new(),
        }
    }

    /// Re-fetch what `reason` invalidated. On failure the previous snapshot
    /// stays in place and the error is returned.
    pub fn refresh(&mut self, reason: Invalidation) -> Result<()> {
        tracing::debug!(?reason, engineer_id = self.engineer_id, "refresh");
        match reason {
            Invalidation::Manual => {
                let calls = self.refresh_table(Table::ServiceCalls);
                let expenses = self.refresh_table(Table::Expenses);
                calls.and(expenses)
            }
            Invalidation::Changed(table) => self.refresh_table(table),
        }
    }

    fn refresh_table(&mut self, table: Table) -> Result<()> {
        match table {
            Table::ServiceCalls => {
                let ticket = self.calls.begin();
                let fetched = self
                    .store
                    .fetch_service_calls(self.engineer_id)
                    .inspect_err(|e| tracing::warn!(error = %e, "service call fetch failed"))?;
                self.calls.complete(ticket, queue::partition(fetched));
            }
            Table::Expenses => {
                let ticket = self.expenses.begin();
                let fetched = self
                    .store
                    .fetch_expenses(self.engineer_id)
                    .inspect_err(|e| tracing::warn!(error = %e, "expense fetch failed"))?;
                self.expenses.complete(ticket, fetched);
            }
        }
        Ok(())
    }

    /// Move call `call_id` to `requested`.
    ///
    /// The call list is re-fetched afterwards whether or not the update went
    /// through, so the queue always shows what the store holds.
    pub fn request_transition(
        &mut self,
        call_id: i64,
        requested: CallStatus,
    ) -> Result<StatusPatch, LifecycleError> {
        if self.calls.current().is_none() {
            self.refresh_table(Table::ServiceCalls)?;
        }
        let call = self
            .queue()
            .and_then(|q| q.find(call_id))
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Service call #{} not found", call_id))?;

        let outcome = lifecycle::apply_transition(&self.store, self.engineer_id, &call, requested);

        if let Err(e) = self.refresh_table(Table::ServiceCalls) {
            tracing::warn!(error = %e, "re-fetch after transition failed");
            if outcome.is_ok() {
                return Err(e.into());
            }
        }
        outcome
    }

    pub fn queue(&self) -> Option<&CallQueue> {
        self.calls.value()
    }

    pub fn expenses(&self) -> &[ExpenseSubmission] {
        self.expenses.value().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn month_labels(&self) -> Vec<MonthLabel> {
        expenses::month_labels(self.expenses())
    }

    pub fn expense_summary(&self, filter: &MonthFilter) -> ExpenseSummary<'_> {
        expenses::summarize(self.expenses(), filter)
    }

    /// Sequence numbers of the applied (calls, expenses) snapshots.
    pub fn versions(&self) -> (u64, u64) {
        (self.calls.applied_seq(), self.expenses.applied_seq())
    }
}
