//! Generation jobs and trigger deduplication
//!
//! A job is identified by the workspace it was started for, the session epoch of
//! that workspace and the index of the user message that triggered it. The
//! [`TriggerTracker`] hands out at most one job per kind and message index, no
//! matter how many times the same transcript state is observed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ErrorKind, GenerationError};

/// What a job generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobKind {
    Chat,
    Code,
}

impl JobKind {
    pub const ALL: [JobKind; 2] = [JobKind::Chat, JobKind::Code];

    /// Path of the upstream endpoint serving this kind.
    pub fn endpoint(self) -> &'static str {
        match self {
            JobKind::Chat => "/ai-chat",
            JobKind::Code => "/gen-ai-code",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobKind::Chat => write!(f, "chat"),
            JobKind::Code => write!(f, "code"),
        }
    }
}

/// Lifecycle of a responder: `Idle -> Requesting -> Succeeded | Failed -> Idle`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ResponderState {
    #[default]
    Idle,
    Requesting,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderEvent {
    Send,
    Respond,
    Fail,
    Settle,
}

impl ResponderState {
    /// Next state for `event`, or `None` when the transition is not allowed.
    pub fn next(self, event: ResponderEvent) -> Option<ResponderState> {
        use ResponderEvent::*;
        use ResponderState::*;

        match (self, event) {
            (Idle, Send) => Some(Requesting),
            (Requesting, Respond) => Some(Succeeded),
            (Requesting, Fail) => Some(Failed),
            (Succeeded | Failed, Settle) => Some(Idle),
            _ => None,
        }
    }

    pub fn is_busy(self) -> bool {
        self == ResponderState::Requesting
    }
}

/// One generation round trip, tagged with the context it was started for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationJob {
    pub workspace_id: String,
    pub epoch: u64,
    pub trigger_index: usize,
    pub kind: JobKind,
    pub state: ResponderState,
}

impl GenerationJob {
    /// Apply `event`; illegal transitions leave the job unchanged and return `false`.
    pub fn advance(&mut self, event: ResponderEvent) -> bool {
        match self.state.next(event) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }

    /// Whether a result of this job may still be applied to the given session.
    pub fn matches(&self, workspace_id: &str, epoch: u64, transcript_len: usize) -> bool {
        self.workspace_id == workspace_id && self.epoch == epoch && self.trigger_index < transcript_len
    }
}

/// How a job ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobOutcome {
    Applied { cost: i64 },
    Failed(ErrorKind),
    Discarded,
}

/// User-visible failure report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: ErrorKind,
    pub job: Option<JobKind>,
    pub message: String,
    pub detail: String,
}

impl Notification {
    pub fn from_error(job: Option<JobKind>, error: &GenerationError) -> Self {
        Self {
            kind: error.kind(),
            job,
            message: error.notice(),
            detail: error.to_string(),
        }
    }
}

/// Last message index that started each job kind in a workspace.
///
/// Stored with the workspace so a reopened session never starts a job kind
/// twice for the same message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartedJobs {
    pub chat: Option<usize>,
    pub code: Option<usize>,
}

impl StartedJobs {
    pub fn get(&self, kind: JobKind) -> Option<usize> {
        match kind {
            JobKind::Chat => self.chat,
            JobKind::Code => self.code,
        }
    }

    fn slot(&mut self, kind: JobKind) -> &mut Option<usize> {
        match kind {
            JobKind::Chat => &mut self.chat,
            JobKind::Code => &mut self.code,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct TriggerMarks {
    started: StartedJobs,
    rejected: Option<usize>,
}

fn is_newer(mark: Option<usize>, index: usize) -> bool {
    !matches!(mark, Some(last) if last >= index)
}

/// Per-workspace record of the last message index that started each job kind.
#[derive(Debug, Default)]
pub struct TriggerTracker {
    marks: HashMap<String, TriggerMarks>,
}

impl TriggerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the right to start a `kind` job for message `index`.
    ///
    /// Returns `None` when that index (or a later one) already started such a job.
    pub fn claim(
        &mut self,
        workspace_id: &str,
        epoch: u64,
        index: usize,
        kind: JobKind,
    ) -> Option<GenerationJob> {
        let slot = self
            .marks
            .entry(workspace_id.to_string())
            .or_default()
            .started
            .slot(kind);

        if !is_newer(*slot, index) {
            return None;
        }
        *slot = Some(index);

        Some(GenerationJob {
            workspace_id: workspace_id.to_string(),
            epoch,
            trigger_index: index,
            kind,
            state: ResponderState::Idle,
        })
    }

    /// Record a failed admission for `index`. Returns `true` only the first time.
    pub fn note_rejection(&mut self, workspace_id: &str, index: usize) -> bool {
        let marks = self.marks.entry(workspace_id.to_string()).or_default();
        if !is_newer(marks.rejected, index) {
            return false;
        }
        marks.rejected = Some(index);
        true
    }

    /// Job kinds that have not started yet for message `index`.
    pub fn unstarted(&self, workspace_id: &str, index: usize) -> Vec<JobKind> {
        JobKind::ALL
            .into_iter()
            .filter(|kind| is_newer(self.last_started(workspace_id, *kind), index))
            .collect()
    }

    /// Merge marks read back from the store, keeping the later index per kind.
    pub fn restore(&mut self, workspace_id: &str, started: StartedJobs) {
        let marks = self.marks.entry(workspace_id.to_string()).or_default();
        for kind in JobKind::ALL {
            let slot = marks.started.slot(kind);
            *slot = (*slot).max(started.get(kind));
        }
    }

    /// Marks to persist for a workspace.
    pub fn started(&self, workspace_id: &str) -> StartedJobs {
        self.marks
            .get(workspace_id)
            .map(|marks| marks.started)
            .unwrap_or_default()
    }

    pub fn last_started(&self, workspace_id: &str, kind: JobKind) -> Option<usize> {
        self.started(workspace_id).get(kind)
    }
}
