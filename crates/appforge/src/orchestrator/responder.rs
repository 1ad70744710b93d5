use appforge_core::jobs::{GenerationJob, JobKind, ResponderEvent, ResponderState};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::watch;

/// Observable lifecycle shared by both responders.
///
/// Each job walks its own state machine; the published state is the state of the
/// most recent transition, and goes back to `Idle` once no job is in flight.
#[derive(Debug)]
pub(crate) struct Lifecycle {
    kind: JobKind,
    state: watch::Sender<ResponderState>,
    in_flight: AtomicUsize,
}

impl Lifecycle {
    pub fn new(kind: JobKind) -> Self {
        let (state, _) = watch::channel(ResponderState::Idle);
        Self {
            kind,
            state,
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn state(&self) -> ResponderState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResponderState> {
        self.state.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// `Idle -> Requesting`
    pub fn begin(&self, job: &mut GenerationJob) {
        self.transition(job, ResponderEvent::Send);
        self.in_flight.fetch_add(1, Ordering::SeqCst);
    }

    /// `Requesting -> Succeeded | Failed`
    pub fn finish(&self, job: &mut GenerationJob, succeeded: bool) {
        let event = if succeeded {
            ResponderEvent::Respond
        } else {
            ResponderEvent::Fail
        };
        self.transition(job, event);
    }

    /// `Succeeded | Failed -> Idle`
    pub fn settle(&self, job: &mut GenerationJob) {
        job.advance(ResponderEvent::Settle);
        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.state.send_replace(ResponderState::Idle);
        }
    }

    fn transition(&self, job: &mut GenerationJob, event: ResponderEvent) {
        if job.advance(event) {
            self.state.send_replace(job.state);
        } else {
            log::warn!(
                "Ignoring {event:?} for {} job in state {:?}",
                self.kind,
                job.state
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use appforge_core::jobs::TriggerTracker;

    #[test]
    fn test_lifecycle_round_trip() {
        let lifecycle = Lifecycle::new(JobKind::Chat);
        let mut job = TriggerTracker::new()
            .claim("w1", 1, 0, JobKind::Chat)
            .unwrap();

        lifecycle.begin(&mut job);
        assert_eq!(lifecycle.state(), ResponderState::Requesting);
        assert!(lifecycle.is_busy());

        lifecycle.finish(&mut job, false);
        assert_eq!(lifecycle.state(), ResponderState::Failed);
        assert_eq!(job.state, ResponderState::Failed);

        lifecycle.settle(&mut job);
        assert_eq!(lifecycle.state(), ResponderState::Idle);
        assert_eq!(job.state, ResponderState::Idle);
        assert!(!lifecycle.is_busy());
    }

    #[test]
    fn test_idle_only_after_last_job_settles() {
        let lifecycle = Lifecycle::new(JobKind::Code);
        let mut tracker = TriggerTracker::new();
        let mut first = tracker.claim("w1", 1, 0, JobKind::Code).unwrap();
        let mut second = tracker.claim("w1", 1, 2, JobKind::Code).unwrap();

        lifecycle.begin(&mut first);
        lifecycle.begin(&mut second);
        lifecycle.finish(&mut first, true);
        lifecycle.settle(&mut first);

        assert!(lifecycle.is_busy());
        assert_eq!(lifecycle.state(), ResponderState::Succeeded);

        lifecycle.finish(&mut second, true);
        lifecycle.settle(&mut second);
        assert_eq!(lifecycle.state(), ResponderState::Idle);
    }
}
