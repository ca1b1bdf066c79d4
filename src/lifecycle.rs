//! Service-call status state machine.
//!
//! ```text
//! assigned → in_progress → closed
//! ```
//!
//! Entering `in_progress` stamps `started_at`; entering `closed` stamps
//! `completed_at`. Nothing leaves `closed`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{CallStatus, ServiceCall};
use crate::store::FieldStore;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Invalid state transition: service call #{id} from {from} to {to}")]
    InvalidTransition {
        id: i64,
        from: CallStatus,
        to: CallStatus,
    },

    #[error("Update rejected for service call #{id}: it is no longer {expected} or no longer assigned to you")]
    UpdateRejected { id: i64, expected: CallStatus },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

/// Fields written by a status change. Only the timestamp belonging to the
/// target status is ever set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPatch {
    pub status: CallStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

pub fn transition(
    call: &ServiceCall,
    requested: CallStatus,
    now: DateTime<Utc>,
) -> Result<StatusPatch, LifecycleError> {
    if !call.status.can_transition_to(requested) {
        return Err(LifecycleError::InvalidTransition {
            id: call.id,
            from: call.status,
            to: requested,
        });
    }

    let mut patch = StatusPatch {
        status: requested,
        started_at: None,
        completed_at: None,
    };
    match requested {
        CallStatus::InProgress => patch.started_at = Some(now),
        CallStatus::Closed => patch.completed_at = Some(now),
        CallStatus::Assigned => {}
    }
    Ok(patch)
}

/// Compute the patch for `call` and write it through `store`.
///
/// The update is conditional on the call still being in the status we saw,
/// so a concurrent change on the store side surfaces as `UpdateRejected`.
pub fn apply_transition<S: FieldStore>(
    store: &S,
    engineer_id: i64,
    call: &ServiceCall,
    requested: CallStatus,
) -> Result<StatusPatch, LifecycleError> {
    let patch = transition(call, requested, Utc::now())?;

    tracing::debug!(call_id = call.id, from = %call.status, to = %requested, "applying transition");
    if !store.update_service_call(call.id, engineer_id, call.status, &patch)? {
        tracing::warn!(call_id = call.id, expected = %call.status, "status update matched no row");
        return Err(LifecycleError::UpdateRejected {
            id: call.id,
            expected: call.status,
        });
    }
    tracing::info!(call_id = call.id, status = %patch.status, "service call status changed");

    Ok(patch)
}
