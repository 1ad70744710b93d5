use super::responder::Lifecycle;
use crate::upstream::Upstream;
use appforge_core::envelope::parse_chat_envelope;
use appforge_core::jobs::{GenerationJob, JobKind, ResponderState};
use appforge_core::GenerationError;
use tokio::sync::watch;

/// Produces the assistant reply for a pending user message.
#[derive(Debug)]
pub struct ChatResponder {
    lifecycle: Lifecycle,
}

impl Default for ChatResponder {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::new(JobKind::Chat),
        }
    }
}

impl ChatResponder {
    pub fn state(&self) -> ResponderState {
        self.lifecycle.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<ResponderState> {
        self.lifecycle.subscribe()
    }

    pub fn is_busy(&self) -> bool {
        self.lifecycle.is_busy()
    }

    pub(crate) fn begin(&self, job: &mut GenerationJob) {
        self.lifecycle.begin(job);
    }

    /// Ask the upstream for a reply and leave the job in `Succeeded` or `Failed`.
    pub(crate) async fn respond<U: Upstream>(
        &self,
        upstream: &U,
        job: &mut GenerationJob,
        prompt: &str,
    ) -> Result<String, GenerationError> {
        let result = match upstream.complete(JobKind::Chat, prompt).await {
            Ok(body) => parse_chat_envelope(&body),
            Err(err) => Err(err),
        };

        self.lifecycle.finish(job, result.is_ok());
        result
    }

    pub(crate) fn settle(&self, job: &mut GenerationJob) {
        self.lifecycle.settle(job);
    }
}
