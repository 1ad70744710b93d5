use super::responder::Lifecycle;
use crate::upstream::Upstream;
use appforge_core::envelope::parse_code_envelope;
use appforge_core::files::FileTree;
use appforge_core::jobs::{GenerationJob, JobKind, ResponderState};
use appforge_core::GenerationError;
use tokio::sync::watch;

/// Produces a file overlay for a pending user message.
#[derive(Debug)]
pub struct CodeGenerator {
    lifecycle: Lifecycle,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self {
            lifecycle: Lifecycle::new(JobKind::Code),
        }
    }
}

impl CodeGenerator {
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

    /// Ask the upstream for an overlay. An overlay without a usable `files`
    /// object fails the job with a schema error.
    pub(crate) async fn generate<U: Upstream>(
        &self,
        upstream: &U,
        job: &mut GenerationJob,
        prompt: &str,
    ) -> Result<FileTree, GenerationError> {
        let result = match upstream.complete(JobKind::Code, prompt).await {
            Ok(body) => parse_code_envelope(&body),
            Err(err) => Err(err),
        };

        self.lifecycle.finish(job, result.is_ok());
        result
    }

    pub(crate) fn settle(&self, job: &mut GenerationJob) {
        self.lifecycle.settle(job);
    }
}
