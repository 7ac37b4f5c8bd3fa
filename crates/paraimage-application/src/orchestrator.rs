//! Orchestrator actor.
//!
//! A single tokio task owns the [`Workbench`]. Callers talk to it through a
//! cloneable [`OrchestratorHandle`]; generation calls, provider refreshes,
//! history fetches and persistence run on spawned tasks whose results come
//! back to the actor as internal events and are applied one at a time.

use futures::future::try_join_all;
use paraimage_core::error::{ParaImageError, Result};
use paraimage_core::{
    FileMaterializer, ImageGenerator, Model, ProviderConfig, ProviderConfigSource,
    ReferenceFile, ReferenceImage, Session, SessionRepository, Window, WindowId,
};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::dispatch::{Settlement, run_job};
use crate::session::SessionWriter;
use crate::workbench::{Effects, Workbench};

const DEFAULT_LAYOUT_COUNT: usize = 2;

/// Collaborators the orchestrator is wired against.
#[derive(Clone)]
pub struct OrchestratorDeps {
    pub generator: Arc<dyn ImageGenerator>,
    pub sessions: Arc<dyn SessionRepository>,
    pub providers: Arc<dyn ProviderConfigSource>,
    pub materializer: Arc<dyn FileMaterializer>,
}

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    /// Initial number of windows
    pub layout_count: usize,
    /// Size passed with every generation request
    pub image_size: Option<String>,
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            layout_count: DEFAULT_LAYOUT_COUNT,
            image_size: None,
        }
    }
}

enum Command {
    Submit {
        prompt: String,
        references: Vec<ReferenceImage>,
        reply: oneshot::Sender<Result<usize>>,
    },
    Retry {
        window_id: WindowId,
        message_id: String,
        reply: oneshot::Sender<bool>,
    },
    SetLayoutCount {
        count: usize,
        reply: oneshot::Sender<()>,
    },
    Rebind {
        window_id: WindowId,
        model_key: String,
        reply: oneshot::Sender<()>,
    },
    Close {
        window_id: WindowId,
        reply: oneshot::Sender<()>,
    },
    Focus {
        model_key: String,
        reply: oneshot::Sender<()>,
    },
    Clear {
        window_id: WindowId,
        reply: oneshot::Sender<()>,
    },
    ContinueSession {
        window_id: WindowId,
        session_id: String,
        reply: oneshot::Sender<bool>,
    },
    RefreshProviders {
        reply: oneshot::Sender<Result<usize>>,
    },
    HydrateHistory {
        reply: oneshot::Sender<()>,
    },
    ForgetSession {
        session_id: String,
        reply: oneshot::Sender<bool>,
    },
    GetWindows {
        reply: oneshot::Sender<Vec<Window>>,
    },
    GetModels {
        reply: oneshot::Sender<Vec<Model>>,
    },
    GetHistory {
        model_key: String,
        reply: oneshot::Sender<Vec<Session>>,
    },
    FindSession {
        session_id: String,
        reply: oneshot::Sender<Option<Session>>,
    },
    WaitIdle {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

enum Event {
    Settled(Settlement),
    ProvidersLoaded {
        refresh_id: u64,
        result: Result<Vec<ProviderConfig>>,
        reply: oneshot::Sender<Result<usize>>,
    },
    HistoryLoaded {
        model_key: String,
        result: Result<Vec<Session>>,
    },
    Persisted,
}

/// Cloneable handle to a running orchestrator.
#[derive(Clone)]
pub struct OrchestratorHandle {
    cmd_tx: mpsc::UnboundedSender<Command>,
    materializer: Arc<dyn FileMaterializer>,
}

impl OrchestratorHandle {
    /// Broadcasts a prompt to every window.
    ///
    /// All reference files are materialized before anything else happens; a
    /// single failure aborts the submission with no state change. Returns the
    /// number of generation calls issued.
    pub async fn submit(
        &self,
        prompt: impl Into<String>,
        files: Vec<ReferenceFile>,
    ) -> Result<usize> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() && files.is_empty() {
            return Err(ParaImageError::EmptySubmission);
        }

        let references =
            try_join_all(files.iter().map(|file| self.materializer.materialize(file))).await?;

        self.request(|reply| Command::Submit {
            prompt,
            references,
            reply,
        })
        .await?
    }

    /// Re-issues one user message for one window. Returns whether a call was issued.
    pub async fn retry(&self, window_id: WindowId, message_id: impl Into<String>) -> Result<bool> {
        let message_id = message_id.into();
        self.request(|reply| Command::Retry {
            window_id,
            message_id,
            reply,
        })
        .await
    }

    pub async fn set_layout_count(&self, count: usize) -> Result<()> {
        self.request(|reply| Command::SetLayoutCount { count, reply })
            .await
    }

    pub async fn rebind(&self, window_id: WindowId, model_key: impl Into<String>) -> Result<()> {
        let model_key = model_key.into();
        self.request(|reply| Command::Rebind {
            window_id,
            model_key,
            reply,
        })
        .await
    }

    pub async fn close(&self, window_id: WindowId) -> Result<()> {
        self.request(|reply| Command::Close { window_id, reply })
            .await
    }

    pub async fn focus(&self, model_key: impl Into<String>) -> Result<()> {
        let model_key = model_key.into();
        self.request(|reply| Command::Focus { model_key, reply })
            .await
    }

    /// Starts a new conversation in a window, keeping its model.
    pub async fn clear(&self, window_id: WindowId) -> Result<()> {
        self.request(|reply| Command::Clear { window_id, reply })
            .await
    }

    /// Loads a stored session into a window. Returns `false` if either is unknown.
    pub async fn continue_session(
        &self,
        window_id: WindowId,
        session_id: impl Into<String>,
    ) -> Result<bool> {
        let session_id = session_id.into();
        self.request(|reply| Command::ContinueSession {
            window_id,
            session_id,
            reply,
        })
        .await
    }

    /// Reloads provider configurations and rebuilds the model registry.
    ///
    /// Resolves once the new registry is applied. Returns the model count.
    pub async fn refresh_providers(&self) -> Result<usize> {
        self.request(|reply| Command::RefreshProviders { reply })
            .await?
    }

    /// Starts fetching history for every model not hydrated yet.
    pub async fn hydrate_history(&self) -> Result<()> {
        self.request(|reply| Command::HydrateHistory { reply })
            .await
    }

    /// Drops a session from the in-memory history.
    pub async fn forget_session(&self, session_id: impl Into<String>) -> Result<bool> {
        let session_id = session_id.into();
        self.request(|reply| Command::ForgetSession { session_id, reply })
            .await
    }

    pub async fn windows(&self) -> Result<Vec<Window>> {
        self.request(|reply| Command::GetWindows { reply }).await
    }

    pub async fn models(&self) -> Result<Vec<Model>> {
        self.request(|reply| Command::GetModels { reply }).await
    }

    /// Sessions recorded for a model, newest first.
    pub async fn history(&self, model_key: impl Into<String>) -> Result<Vec<Session>> {
        let model_key = model_key.into();
        self.request(|reply| Command::GetHistory { model_key, reply })
            .await
    }

    pub async fn find_session(&self, session_id: impl Into<String>) -> Result<Option<Session>> {
        let session_id = session_id.into();
        self.request(|reply| Command::FindSession { session_id, reply })
            .await
    }

    /// Resolves once no generation call, fetch or persistence write is outstanding.
    pub async fn wait_idle(&self) -> Result<()> {
        self.request(|reply| Command::WaitIdle { reply }).await
    }

    /// Stops the actor. Queued persistence writes still complete.
    pub fn shutdown(&self) {
        let _ = self.cmd_tx.send(Command::Shutdown);
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.cmd_tx
            .send(make(reply_tx))
            .map_err(|_| ParaImageError::OrchestratorStopped)?;
        reply_rx
            .await
            .map_err(|_| ParaImageError::OrchestratorStopped)
    }
}

pub struct Orchestrator {
    workbench: Workbench,
    generator: Arc<dyn ImageGenerator>,
    sessions: Arc<dyn SessionRepository>,
    providers: Arc<dyn ProviderConfigSource>,
    writer: SessionWriter,
    events_tx: mpsc::UnboundedSender<Event>,
    pending_writes: usize,
    pending_fetches: usize,
    /// Id of the most recently issued provider refresh
    next_refresh_id: u64,
    /// Id of the refresh whose registry is currently applied
    applied_refresh_id: u64,
    idle_waiters: Vec<oneshot::Sender<()>>,
}

impl Orchestrator {
    /// Spawns the actor on the current tokio runtime and returns its handle.
    pub fn spawn(deps: OrchestratorDeps, options: OrchestratorOptions) -> OrchestratorHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let persisted_tx = events_tx.clone();
        let writer = SessionWriter::spawn(deps.sessions.clone(), move || {
            let _ = persisted_tx.send(Event::Persisted);
        });

        let actor = Self {
            workbench: Workbench::new(options.layout_count, options.image_size),
            generator: deps.generator,
            sessions: deps.sessions,
            providers: deps.providers,
            writer,
            events_tx,
            pending_writes: 0,
            pending_fetches: 0,
            next_refresh_id: 0,
            applied_refresh_id: 0,
            idle_waiters: Vec::new(),
        };

        tokio::spawn(actor.run(cmd_rx, events_rx));
        tracing::debug!("[Orchestrator] Spawned with {} window(s)", options.layout_count);

        OrchestratorHandle {
            cmd_tx,
            materializer: deps.materializer,
        }
    }

    async fn run(
        mut self,
        mut cmd_rx: mpsc::UnboundedReceiver<Command>,
        mut events_rx: mpsc::UnboundedReceiver<Event>,
    ) {
        loop {
            tokio::select! {
                cmd = cmd_rx.recv() => match cmd {
                    Some(Command::Shutdown) | None => break,
                    Some(cmd) => self.handle_command(cmd),
                },
                Some(event) = events_rx.recv() => self.handle_event(event),
            }
            self.notify_if_idle();
        }
        tracing::debug!("[Orchestrator] Stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Submit {
                prompt,
                references,
                reply,
            } => {
                let result = self.workbench.submit(&prompt, references).map(|effects| {
                    let calls = effects.jobs.len();
                    self.apply(effects);
                    calls
                });
                let _ = reply.send(result);
            }
            Command::Retry {
                window_id,
                message_id,
                reply,
            } => {
                let effects = self.workbench.retry(window_id, &message_id);
                let issued = !effects.jobs.is_empty();
                self.apply(effects);
                let _ = reply.send(issued);
            }
            Command::SetLayoutCount { count, reply } => {
                let effects = self.workbench.set_layout_count(count);
                self.apply(effects);
                let _ = reply.send(());
            }
            Command::Rebind {
                window_id,
                model_key,
                reply,
            } => {
                let effects = self.workbench.rebind(window_id, &model_key);
                self.apply(effects);
                let _ = reply.send(());
            }
            Command::Close { window_id, reply } => {
                let effects = self.workbench.close(window_id);
                self.apply(effects);
                let _ = reply.send(());
            }
            Command::Focus { model_key, reply } => {
                let effects = self.workbench.focus(&model_key);
                self.apply(effects);
                let _ = reply.send(());
            }
            Command::Clear { window_id, reply } => {
                let effects = self.workbench.clear(window_id);
                self.apply(effects);
                let _ = reply.send(());
            }
            Command::ContinueSession {
                window_id,
                session_id,
                reply,
            } => {
                let found = match self.workbench.continue_session(window_id, &session_id) {
                    Some(effects) => {
                        self.apply(effects);
                        true
                    }
                    None => false,
                };
                let _ = reply.send(found);
            }
            Command::RefreshProviders { reply } => {
                self.pending_fetches += 1;
                self.next_refresh_id += 1;
                let refresh_id = self.next_refresh_id;
                let providers = self.providers.clone();
                let events_tx = self.events_tx.clone();
                tokio::spawn(async move {
                    let result = providers.list_provider_configs().await;
                    let _ = events_tx.send(Event::ProvidersLoaded {
                        refresh_id,
                        result,
                        reply,
                    });
                });
            }
            Command::HydrateHistory { reply } => {
                let effects = self.workbench.hydrate_history();
                self.apply(effects);
                let _ = reply.send(());
            }
            Command::ForgetSession { session_id, reply } => {
                let _ = reply.send(self.workbench.forget_session(&session_id));
            }
            Command::GetWindows { reply } => {
                let _ = reply.send(self.workbench.windows().to_vec());
            }
            Command::GetModels { reply } => {
                let _ = reply.send(self.workbench.models().to_vec());
            }
            Command::GetHistory { model_key, reply } => {
                let _ = reply.send(self.workbench.history(&model_key).to_vec());
            }
            Command::FindSession { session_id, reply } => {
                let _ = reply.send(self.workbench.find_session(&session_id).cloned());
            }
            Command::WaitIdle { reply } => {
                self.idle_waiters.push(reply);
            }
            Command::Shutdown => {}
        }
    }

    fn handle_event(&mut self, event: Event) {
        match event {
            Event::Settled(settlement) => {
                let effects = self.workbench.apply_settlement(settlement);
                self.apply(effects);
            }
            Event::ProvidersLoaded {
                refresh_id,
                result,
                reply,
            } => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                if refresh_id < self.applied_refresh_id {
                    // A later read already landed; this one may predate an edit
                    tracing::debug!(
                        "[Orchestrator] Discarding superseded provider refresh {} (applied {})",
                        refresh_id,
                        self.applied_refresh_id
                    );
                    let _ = reply.send(Ok(self.workbench.models().len()));
                    return;
                }
                match result {
                    Ok(configs) => {
                        self.applied_refresh_id = refresh_id;
                        let effects = self.workbench.apply_providers(&configs);
                        self.apply(effects);
                        let _ = reply.send(Ok(self.workbench.models().len()));
                    }
                    Err(e) => {
                        tracing::warn!("[Orchestrator] Failed to load providers: {}", e);
                        let _ = reply.send(Err(e));
                    }
                }
            }
            Event::HistoryLoaded { model_key, result } => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                self.workbench.apply_history(&model_key, result);
            }
            Event::Persisted => {
                self.pending_writes = self.pending_writes.saturating_sub(1);
            }
        }
    }

    fn apply(&mut self, effects: Effects) {
        for session in effects.persist {
            if self.writer.enqueue(session) {
                self.pending_writes += 1;
            }
        }

        for job in effects.jobs {
            let generator = self.generator.clone();
            let events_tx = self.events_tx.clone();
            tokio::spawn(async move {
                let settlement = run_job(generator, job).await;
                let _ = events_tx.send(Event::Settled(settlement));
            });
        }

        for model_key in effects.hydrate {
            self.pending_fetches += 1;
            let sessions = self.sessions.clone();
            let events_tx = self.events_tx.clone();
            tokio::spawn(async move {
                let result = sessions.list_by_model(&model_key).await;
                let _ = events_tx.send(Event::HistoryLoaded { model_key, result });
            });
        }
    }

    fn is_idle(&self) -> bool {
        self.workbench.in_flight() == 0 && self.pending_writes == 0 && self.pending_fetches == 0
    }

    fn notify_if_idle(&mut self) {
        if self.idle_waiters.is_empty() || !self.is_idle() {
            return;
        }
        for waiter in self.idle_waiters.drain(..) {
            let _ = waiter.send(());
        }
    }
}
