use serde::Serialize;

use crate::models::{CallStatus, ServiceCall};

/// An engineer's calls split into display buckets. Each bucket keeps the
/// order the calls were fetched in.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CallQueue {
    pub assigned: Vec<ServiceCall>,
    pub in_progress: Vec<ServiceCall>,
    pub closed: Vec<ServiceCall>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub assigned: usize,
    pub in_progress: usize,
    pub closed: usize,
}

pub fn partition(calls: Vec<ServiceCall>) -> CallQueue {
    let mut queue = CallQueue::default();
    for call in calls {
        match call.status {
            CallStatus::Assigned => queue.assigned.push(call),
            CallStatus::InProgress => queue.in_progress.push(call),
            CallStatus::Closed => queue.closed.push(call),
        }
    }
    queue
}

impl CallQueue {
    pub fn counts(&self) -> QueueCounts {
        QueueCounts {
            assigned: self.assigned.len(),
            in_progress: self.in_progress.len(),
            closed: self.closed.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.assigned.len() + self.in_progress.len() + self.closed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn bucket(&self, status: CallStatus) -> &[ServiceCall] {
        match status {
            CallStatus::Assigned => &self.assigned,
            CallStatus::InProgress => &self.in_progress,
            CallStatus::Closed => &self.closed,
        }
    }

    pub fn find(&self, id: i64) -> Option<&ServiceCall> {
        self.assigned
            .iter()
            .chain(&self.in_progress)
            .chain(&self.closed)
            .find(|c| c.id == id)
    }
}
