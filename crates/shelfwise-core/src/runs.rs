//! Run lifecycle state machine and an in-process run store.
//!
//! Transitions are conditional on the current status:
//!
//! * `queued -> running` only while the run is still `queued`.
//! * `queued | running -> success | failed` only while the run is not yet
//!   terminal, so at most one finalize call ever applies.
//! * the cancel flag can be merged into a run in any status.
//!
//! The Postgres store in `shelfwise-db` enforces the same guards with a single
//! conditional `UPDATE`; [`MemoryRunStore`] serializes them behind a mutex.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Key merged into a run's error blob when cancellation is requested.
pub const CANCEL_REQUESTED_KEY: &str = "cancelRequested";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl RunStatus {
    /// Statuses a run may be finalized from.
    pub const FINALIZABLE: [RunStatus; 2] = [RunStatus::Queued, RunStatus::Running];

    /// Storage representation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Running => "running",
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }

    /// Parse the storage representation; case-insensitive.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "queued" => Some(Self::Queued),
            "running" => Some(Self::Running),
            "success" => Some(Self::Success),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Success | Self::Failed)
    }

    #[must_use]
    pub fn can_mark_running(self) -> bool {
        self == Self::Queued
    }

    #[must_use]
    pub fn can_finalize(self) -> bool {
        Self::FINALIZABLE.contains(&self)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A tracked long-running job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRecord {
    pub id: i64,
    pub public_id: Uuid,
    pub kind: String,
    pub status: RunStatus,
    pub timings_ms: Option<Value>,
    pub result_json: Option<Value>,
    pub error_json: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunRecord {
    #[must_use]
    pub fn cancel_requested(&self) -> bool {
        self.error_json
            .as_ref()
            .and_then(|v| v.get(CANCEL_REQUESTED_KEY))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }
}

/// Merge `{"cancelRequested": true}` into an existing error/meta blob.
///
/// Objects keep their other keys. A non-object blob is preserved under
/// `detail`.
#[must_use]
pub fn merge_cancel_flag(existing: Option<Value>) -> Value {
    let mut map = match existing {
        None | Some(Value::Null) => Map::new(),
        Some(Value::Object(map)) => map,
        Some(other) => {
            let mut map = Map::new();
            map.insert("detail".to_string(), other);
            map
        }
    };
    map.insert(CANCEL_REQUESTED_KEY.to_string(), Value::Bool(true));
    Value::Object(map)
}

/// Combine a failure payload with whatever is already in the error blob.
///
/// When both are objects the payload's keys win; otherwise the payload
/// replaces the blob.
#[must_use]
pub fn merge_failure_payload(existing: Option<Value>, payload: Value) -> Value {
    match (existing, payload) {
        (Some(Value::Object(mut base)), Value::Object(update)) => {
            base.extend(update);
            Value::Object(base)
        }
        (_, payload) => payload,
    }
}

#[derive(Debug, Default)]
struct MemoryRuns {
    next_id: i64,
    runs: HashMap<i64, RunRecord>,
}

/// Run store backed by process memory.
///
/// Every transition takes the same mutex, so the check and the write happen
/// as one step.
#[derive(Debug, Default)]
pub struct MemoryRunStore {
    inner: Mutex<MemoryRuns>,
}

impl MemoryRunStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryRuns> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn insert(&self, kind: &str, status: RunStatus) -> RunRecord {
        let mut inner = self.lock();
        inner.next_id += 1;
        let now = Utc::now();
        let record = RunRecord {
            id: inner.next_id,
            public_id: Uuid::new_v4(),
            kind: kind.to_string(),
            status,
            timings_ms: None,
            result_json: None,
            error_json: None,
            created_at: now,
            started_at: (status == RunStatus::Running).then_some(now),
            finished_at: None,
        };
        inner.runs.insert(record.id, record.clone());
        record
    }

    /// Creates a run in `queued` status.
    pub fn create_queued(&self, kind: &str) -> RunRecord {
        self.insert(kind, RunStatus::Queued)
    }

    /// Creates a run that is already `running`.
    pub fn create_running(&self, kind: &str) -> RunRecord {
        self.insert(kind, RunStatus::Running)
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<RunRecord> {
        self.lock().runs.get(&id).cloned()
    }

    /// Moves a `queued` run to `running`. Returns whether the transition applied.
    pub fn mark_running(&self, id: i64) -> bool {
        let mut inner = self.lock();
        match inner.runs.get_mut(&id) {
            Some(run) if run.status.can_mark_running() => {
                run.status = RunStatus::Running;
                run.started_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Finalizes a non-terminal run as `success`. Returns whether it applied.
    pub fn finalize_success(&self, id: i64, result: Value, timings_ms: Option<Value>) -> bool {
        let mut inner = self.lock();
        match inner.runs.get_mut(&id) {
            Some(run) if run.status.can_finalize() => {
                run.status = RunStatus::Success;
                run.result_json = Some(result);
                run.timings_ms = timings_ms;
                run.finished_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Finalizes a non-terminal run as `failed`. Returns whether it applied.
    pub fn finalize_failed(&self, id: i64, error: Value, timings_ms: Option<Value>) -> bool {
        let mut inner = self.lock();
        match inner.runs.get_mut(&id) {
            Some(run) if run.status.can_finalize() => {
                run.status = RunStatus::Failed;
                run.error_json = Some(merge_failure_payload(run.error_json.take(), error));
                run.timings_ms = timings_ms;
                run.finished_at = Some(Utc::now());
                true
            }
            _ => false,
        }
    }

    /// Sets the cancel flag regardless of status. Returns `false` only when
    /// the run does not exist.
    pub fn request_cancel(&self, id: i64) -> bool {
        let mut inner = self.lock();
        match inner.runs.get_mut(&id) {
            Some(run) => {
                run.error_json = Some(merge_cancel_flag(run.error_json.take()));
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_cancel_requested(&self, id: i64) -> bool {
        self.lock()
            .runs
            .get(&id)
            .is_some_and(RunRecord::cancel_requested)
    }
}
