//! Generation orchestration
//!
//! The orchestrator owns the active workspace session. It watches the transcript
//! for an unanswered user message, checks the budget, starts one chat job and one
//! code job for it, and applies their results through the pure planners in
//! `appforge_core::commit`. Every applied result is published as a new
//! [`WorkspaceSnapshot`] so all views render the same state.
//!
//! Results are tagged with the workspace id and session epoch they were started
//! for. Opening or closing a workspace bumps the epoch, so anything that comes
//! back for an older session is dropped instead of applied.
//!
//! Which job kinds a message already started is saved with the workspace before
//! any request goes out. Reopening a workspace, in this process or another one,
//! never starts the same kind twice for the same message.

mod chat;
mod code;
mod responder;
mod session;


pub use chat::ChatResponder;
pub use code::CodeGenerator;

use crate::error::StoreError;
use crate::store::WorkspaceStore;
use crate::upstream::Upstream;
use appforge_core::commit::{plan_chat_commit, plan_code_commit};
use appforge_core::files::FileTree;
use appforge_core::jobs::{GenerationJob, JobKind, JobOutcome, Notification, TriggerTracker};
use appforge_core::ledger::check_admission;
use appforge_core::prompt::{build_prompt, PromptTemplates};
use appforge_core::transcript::{pending_user_index, Message, WorkspaceSnapshot};
use appforge_core::GenerationError;
use session::Session;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

#[derive(Debug, Default)]
struct Engine {
    session: Option<Session>,
    tracker: TriggerTracker,
    epoch: u64,
}

/// What one observation of the transcript did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Index of the unanswered user message, if there was one.
    pub trigger_index: Option<usize>,
    /// The budget check refused the cycle.
    pub rejected: bool,
    pub chat: Option<JobOutcome>,
    pub code: Option<JobOutcome>,
}

pub struct Orchestrator<S, U> {
    store: Arc<S>,
    upstream: Arc<U>,
    prompts: PromptTemplates,
    min_balance: i64,
    engine: Mutex<Engine>,
    chat: ChatResponder,
    code: CodeGenerator,
    snapshots: watch::Sender<WorkspaceSnapshot>,
    notices: mpsc::UnboundedSender<Notification>,
}

impl<S: WorkspaceStore, U: Upstream> Orchestrator<S, U> {
    /// Build an orchestrator and the receiving end of its notifications.
    pub fn new(
        store: Arc<S>,
        upstream: Arc<U>,
        prompts: PromptTemplates,
        min_balance: i64,
    ) -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (snapshots, _) = watch::channel(WorkspaceSnapshot::default());
        let (notices, receiver) = mpsc::unbounded_channel();

        let orchestrator = Self {
            store,
            upstream,
            prompts,
            min_balance,
            engine: Mutex::new(Engine::default()),
            chat: ChatResponder::default(),
            code: CodeGenerator::default(),
            snapshots,
            notices,
        };

        (orchestrator, receiver)
    }

    pub fn subscribe(&self) -> watch::Receiver<WorkspaceSnapshot> {
        self.snapshots.subscribe()
    }

    /// The last published snapshot.
    pub fn snapshot(&self) -> WorkspaceSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn chat(&self) -> &ChatResponder {
        &self.chat
    }

    pub fn code(&self) -> &CodeGenerator {
        &self.code
    }

    /// Make `workspace_id` the active workspace for the user with `email`.
    pub async fn open(
        &self,
        workspace_id: &str,
        email: &str,
    ) -> Result<WorkspaceSnapshot, GenerationError> {
        let workspace = self.store.load(workspace_id).await?;
        let user = self.store.get_user(email).await?;
        if workspace.user_id != user.id {
            return Err(StoreError::NotFound(format!("workspace {workspace_id} for {email}")).into());
        }

        let mut engine = self.engine.lock().await;
        engine.epoch += 1;
        engine.tracker.restore(workspace_id, workspace.started);
        log::info!(
            "Opened workspace {workspace_id} ({} messages, {} stored files, balance {})",
            workspace.messages.len(),
            workspace.file_data.len(),
            user.token_balance
        );
        engine.session = Some(Session::open(workspace, user, engine.epoch));

        Ok(self.publish(&engine))
    }

    /// Drop the active workspace. Jobs still in flight for it will be discarded.
    pub async fn close(&self) {
        let mut engine = self.engine.lock().await;
        engine.epoch += 1;
        if let Some(session) = engine.session.take() {
            log::info!("Closed workspace {}", session.workspace_id);
        }
        self.publish(&engine);
    }

    /// Append a user message to the active transcript and persist it.
    ///
    /// Returns the index of the new message. A failed save is reported as a
    /// notification; the message stays in the transcript either way.
    pub async fn append(&self, text: &str) -> Result<usize, GenerationError> {
        let text = text.trim();
        if text.is_empty() {
            return Err(GenerationError::MissingInput("message is empty".to_string()));
        }

        let mut engine = self.engine.lock().await;
        let Some(session) = engine.session.as_mut() else {
            return Err(GenerationError::MissingInput("no workspace is open".to_string()));
        };

        session.messages.push(Message::user(text));
        let index = session.messages.len() - 1;
        let workspace_id = session.workspace_id.clone();
        let messages = session.messages.clone();
        self.publish(&engine);

        if let Err(err) = self.store.save_messages(&workspace_id, &messages).await {
            self.persistence_failed(None, err);
        }

        Ok(index)
    }

    /// Whether the active transcript ends with a user message that still has a
    /// job kind left to start.
    pub async fn has_pending_jobs(&self) -> bool {
        let engine = self.engine.lock().await;
        let Some(session) = engine.session.as_ref() else {
            return false;
        };

        pending_user_index(&session.messages).is_some_and(|index| {
            !engine
                .tracker
                .unstarted(&session.workspace_id, index)
                .is_empty()
        })
    }

    /// Append a user message and run the generation cycle it triggers.
    pub async fn submit(&self, text: &str) -> Result<CycleReport, GenerationError> {
        self.append(text).await?;
        Ok(self.observe().await)
    }

    /// Look at the transcript and run whatever generation it calls for.
    ///
    /// Safe to call any number of times for the same transcript state: each job
    /// kind starts at most once per triggering message.
    pub async fn observe(&self) -> CycleReport {
        let mut report = CycleReport::default();

        let (chat, code) = {
            let mut engine = self.engine.lock().await;
            let Engine {
                session, tracker, ..
            } = &mut *engine;

            let Some(session) = session.as_ref() else {
                return report;
            };
            let Some(index) = pending_user_index(&session.messages) else {
                return report;
            };
            report.trigger_index = Some(index);

            let kinds = tracker.unstarted(&session.workspace_id, index);
            if kinds.is_empty() {
                log::debug!("Message {index} already triggered generation");
                return report;
            }

            if let Err(err) = check_admission(session.user.token_balance, self.min_balance) {
                report.rejected = true;
                if tracker.note_rejection(&session.workspace_id, index) {
                    log::warn!("Refusing generation for message {index}: {err}");
                    self.notify(None, &err);
                }
                return report;
            }

            let mut chat = None;
            let mut code = None;
            for kind in kinds {
                let Some(mut job) =
                    tracker.claim(&session.workspace_id, session.epoch, index, kind)
                else {
                    continue;
                };

                match kind {
                    JobKind::Chat => {
                        self.chat.begin(&mut job);
                        chat = Some((job, build_prompt(&session.messages, &self.prompts.chat_prompt)));
                    }
                    JobKind::Code => {
                        self.code.begin(&mut job);
                        code = Some((job, build_prompt(&session.messages, &self.prompts.code_prompt)));
                    }
                }
            }

            let started = tracker.started(&session.workspace_id);
            if let Err(err) = self.store.save_started(&session.workspace_id, started).await {
                self.persistence_failed(None, err);
            }

            log::info!(
                "Starting generation for message {index} of workspace {}",
                session.workspace_id
            );
            self.publish_busy();
            (chat, code)
        };

        let chat = async {
            match chat {
                Some((job, prompt)) => Some(self.run_chat(job, prompt).await),
                None => None,
            }
        };
        let code = async {
            match code {
                Some((job, prompt)) => Some(self.run_code(job, prompt).await),
                None => None,
            }
        };

        let (chat, code) = futures::join!(chat, code);
        report.chat = chat;
        report.code = code;
        report
    }

    async fn run_chat(&self, mut job: GenerationJob, prompt: String) -> JobOutcome {
        let outcome = match self.chat.respond(&*self.upstream, &mut job, &prompt).await {
            Ok(reply) => self.commit_chat(&job, reply).await,
            Err(err) => self.fail(&job, err).await,
        };

        self.chat.settle(&mut job);
        self.publish_busy();
        outcome
    }

    async fn run_code(&self, mut job: GenerationJob, prompt: String) -> JobOutcome {
        let outcome = match self.code.generate(&*self.upstream, &mut job, &prompt).await {
            Ok(overlay) => self.commit_code(&job, overlay).await,
            Err(err) => self.fail(&job, err).await,
        };

        self.code.settle(&mut job);
        self.publish_busy();
        outcome
    }

    async fn commit_chat(&self, job: &GenerationJob, reply: String) -> JobOutcome {
        let mut engine = self.engine.lock().await;
        let Some(session) = engine.session.as_mut().filter(|s| s.accepts(job)) else {
            log::info!(
                "Discarding chat reply for message {} of workspace {}",
                job.trigger_index,
                job.workspace_id
            );
            return JobOutcome::Discarded;
        };

        let plan = plan_chat_commit(&session.messages, session.user.token_balance, reply);
        let (cost, balance) = (plan.cost, plan.balance);
        session.messages = plan.messages;
        session.user.token_balance = balance;

        let workspace_id = session.workspace_id.clone();
        let user_id = session.user.id.clone();
        let messages = session.messages.clone();
        self.publish(&engine);
        log::info!("Applied chat reply (cost {cost}, balance {balance})");

        // The guard stays held so balance writes reach the store in commit order.
        let saved = async {
            self.store.save_messages(&workspace_id, &messages).await?;
            self.store.save_token_balance(&user_id, balance).await
        };
        if let Err(err) = saved.await {
            self.persistence_failed(Some(JobKind::Chat), err);
        }
        drop(engine);

        JobOutcome::Applied { cost }
    }

    async fn commit_code(&self, job: &GenerationJob, overlay: FileTree) -> JobOutcome {
        let mut engine = self.engine.lock().await;
        let Some(session) = engine.session.as_mut().filter(|s| s.accepts(job)) else {
            log::info!(
                "Discarding code overlay for message {} of workspace {}",
                job.trigger_index,
                job.workspace_id
            );
            return JobOutcome::Discarded;
        };

        let plan = match plan_code_commit(&session.files, session.user.token_balance, overlay) {
            Ok(plan) => plan,
            Err(err) => {
                drop(engine);
                return self.fail(job, err).await;
            }
        };
        let (cost, balance, overlay) = (plan.cost, plan.balance, plan.overlay);
        session.files = plan.files;
        session.user.token_balance = balance;

        let workspace_id = session.workspace_id.clone();
        let user_id = session.user.id.clone();
        self.publish(&engine);
        log::info!(
            "Applied code overlay of {} files (cost {cost}, balance {balance})",
            overlay.len()
        );

        let saved = async {
            self.store.save_files(&workspace_id, &overlay).await?;
            self.store.save_token_balance(&user_id, balance).await
        };
        if let Err(err) = saved.await {
            self.persistence_failed(Some(JobKind::Code), err);
        }
        drop(engine);

        JobOutcome::Applied { cost }
    }

    async fn fail(&self, job: &GenerationJob, err: GenerationError) -> JobOutcome {
        let engine = self.engine.lock().await;
        let current = engine.session.as_ref().is_some_and(|s| s.accepts(job));
        if !current {
            log::info!("Discarding {} failure for a closed session: {err}", job.kind);
            return JobOutcome::Discarded;
        }

        log::warn!("{} generation for message {} failed: {err}", job.kind, job.trigger_index);
        self.notify(Some(job.kind), &err);
        JobOutcome::Failed(err.kind())
    }

    fn persistence_failed(&self, job: Option<JobKind>, err: StoreError) {
        log::error!("Failed to persist workspace changes: {err}");
        self.notify(job, &err.into());
    }

    fn notify(&self, job: Option<JobKind>, err: &GenerationError) {
        if self.notices.send(Notification::from_error(job, err)).is_err() {
            log::debug!("No listener for notification: {err}");
        }
    }

    fn publish(&self, engine: &Engine) -> WorkspaceSnapshot {
        let snapshot = match &engine.session {
            Some(session) => session.snapshot(self.chat.is_busy(), self.code.is_busy()),
            None => WorkspaceSnapshot::default(),
        };
        self.snapshots.send_replace(snapshot.clone());
        snapshot
    }

    fn publish_busy(&self) {
        let chat_busy = self.chat.is_busy();
        let code_busy = self.code.is_busy();
        self.snapshots.send_modify(|snapshot| {
            snapshot.chat_busy = chat_busy;
            snapshot.code_busy = code_busy;
        });
    }
}
