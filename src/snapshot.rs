//! Versioned ownership of the currently displayed data.
//!
//! Every fetch is issued a ticket carrying a monotonically increasing
//! sequence number. A result is applied only if its ticket is newer than the
//! snapshot already held, so a slow fetch can never overwrite a faster,
//! later one.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Versioned<T> {
    pub seq: u64,
    pub value: T,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

#[derive(Debug)]
pub struct SnapshotCell<T> {
    issued: u64,
    current: Option<Versioned<T>>,
}

impl<T> Default for SnapshotCell<T> {
    fn default() -> Self {
        SnapshotCell {
            issued: 0,
            current: None,
        }
    }
}

impl<T> SnapshotCell<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Apply `value` fetched under `ticket`. Returns `false` and drops the
    /// value if a newer fetch has already been applied.
    pub fn complete(&mut self, ticket: FetchTicket, value: T) -> bool {
        if let Some(current) = &self.current {
            if current.seq >= ticket.0 {
                tracing::debug!(
                    ticket = ticket.0,
                    applied = current.seq,
                    "discarding stale fetch result"
                );
                return false;
            }
        }
        self.current = Some(Versioned {
            seq: ticket.0,
            value,
        });
        true
    }

    pub fn current(&self) -> Option<&Versioned<T>> {
        self.current.as_ref()
    }

    pub fn value(&self) -> Option<&T> {
        self.current.as_ref().map(|v| &v.value)
    }

    /// Sequence number of the applied snapshot, 0 if none.
    pub fn applied_seq(&self) -> u64 {
        self.current.as_ref().map_or(0, |v| v.seq)
    }
}
