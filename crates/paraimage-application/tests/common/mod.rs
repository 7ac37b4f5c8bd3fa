//! Hand-written collaborators shared by the orchestrator tests.

#![allow(dead_code)]

use async_trait::async_trait;
use paraimage_application::{Orchestrator, OrchestratorDeps, OrchestratorHandle, OrchestratorOptions};
use paraimage_core::error::{ParaImageError, Result};
use paraimage_core::generation::GenerationError;
use paraimage_core::{
    FileMaterializer, GeneratedImage, GenerationRequest, ImageGenerator, ProviderConfig,
    ProviderConfigSource, ReferenceFile, ReferenceImage, Session, SessionRepository,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

pub const TIMEOUT: Duration = Duration::from_secs(5);

pub fn provider(name: &str, ids: &[&str]) -> ProviderConfig {
    ProviderConfig {
        provider_name: name.to_string(),
        model_ids: ids.iter().map(|s| s.to_string()).collect(),
        icon: None,
    }
}

// ----------------------------------------------------------------------------
// Generators
// ----------------------------------------------------------------------------

/// Answers immediately with a fixed outcome per model id; unknown ids succeed.
#[derive(Default)]
pub struct ScriptedGenerator {
    outcomes: HashMap<String, std::result::Result<GeneratedImage, GenerationError>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        model_id: &str,
        outcome: std::result::Result<GeneratedImage, GenerationError>,
    ) -> Self {
        self.outcomes.insert(model_id.to_string(), outcome);
        self
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GeneratedImage, GenerationError> {
        let outcome = self
            .outcomes
            .get(&request.model_id)
            .cloned()
            .unwrap_or_else(|| Ok(GeneratedImage::new(format!("https://img/{}", request.model_id))));
        self.calls.lock().unwrap().push(request);
        outcome
    }
}

type Gate = oneshot::Sender<std::result::Result<GeneratedImage, GenerationError>>;

/// Holds every call open until the test releases it.
#[derive(Default)]
pub struct GatedGenerator {
    pending: Mutex<Vec<(GenerationRequest, Gate)>>,
    calls: AtomicUsize,
}

impl GatedGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Waits until at least `count` calls are parked.
    pub async fn wait_for_calls(&self, count: usize) {
        tokio::time::timeout(TIMEOUT, async {
            while self.pending.lock().unwrap().len() < count {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("generation calls were not issued in time");
    }

    /// Releases every parked call with a successful image.
    pub fn release_all(&self) {
        let pending: Vec<_> = self.pending.lock().unwrap().drain(..).collect();
        for (request, gate) in pending {
            let _ = gate.send(Ok(GeneratedImage::new(format!("https://img/{}", request.model_id))));
        }
    }
}

#[async_trait]
impl ImageGenerator for GatedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GeneratedImage, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push((request, tx));
        rx.await.unwrap_or(Err(GenerationError::Aborted))
    }
}

// ----------------------------------------------------------------------------
// Stores
// ----------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemorySessionRepository {
    sessions: Mutex<HashMap<String, Session>>,
    writes: Mutex<Vec<Session>>,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl InMemorySessionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, session: Session) {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id.clone(), session);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Every upsert attempt, in arrival order.
    pub fn writes(&self) -> Vec<Session> {
        self.writes.lock().unwrap().clone()
    }

    pub fn stored(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(session_id).cloned()
    }
}

#[async_trait]
impl SessionRepository for InMemorySessionRepository {
    async fn list_by_model(&self, model_key: &str) -> Result<Vec<Session>> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(ParaImageError::io("store offline"));
        }
        let mut sessions: Vec<_> = self
            .sessions
            .lock()
            .unwrap()
            .values()
            .filter(|s| s.model_key == model_key)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(sessions)
    }

    async fn find_by_id(&self, session_id: &str) -> Result<Option<Session>> {
        Ok(self.stored(session_id))
    }

    async fn upsert(&self, session: &Session) -> Result<()> {
        self.writes.lock().unwrap().push(session.clone());
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ParaImageError::io("disk full"));
        }
        self.seed(session.clone());
        Ok(())
    }

    async fn delete(&self, session_id: &str) -> Result<()> {
        self.sessions.lock().unwrap().remove(session_id);
        Ok(())
    }
}

pub struct StaticProviders {
    providers: Mutex<Vec<ProviderConfig>>,
}

impl StaticProviders {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers: Mutex::new(providers),
        }
    }

    pub fn replace(&self, providers: Vec<ProviderConfig>) {
        *self.providers.lock().unwrap() = providers;
    }
}

#[async_trait]
impl ProviderConfigSource for StaticProviders {
    async fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        Ok(self.providers.lock().unwrap().clone())
    }
}

/// Answers successive reads from a script of `(delay, providers)` steps.
///
/// Each read takes the next step when called, then sleeps before answering,
/// so a slow early read can settle after a fast later one.
pub struct SequencedProviders {
    steps: Mutex<VecDeque<(Duration, Vec<ProviderConfig>)>>,
}

impl SequencedProviders {
    pub fn new(steps: Vec<(Duration, Vec<ProviderConfig>)>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
        }
    }
}

#[async_trait]
impl ProviderConfigSource for SequencedProviders {
    async fn list_provider_configs(&self) -> Result<Vec<ProviderConfig>> {
        let step = self.steps.lock().unwrap().pop_front();
        let Some((delay, providers)) = step else {
            return Err(ParaImageError::config("provider script exhausted"));
        };
        tokio::time::sleep(delay).await;
        Ok(providers)
    }
}

/// Materializes in-memory bytes; any file named `broken*` fails.
pub struct FakeMaterializer;

#[async_trait]
impl FileMaterializer for FakeMaterializer {
    async fn materialize(&self, file: &ReferenceFile) -> Result<ReferenceImage> {
        let name = file.display_name();
        if name.starts_with("broken") {
            return Err(ParaImageError::reference(name, "unreadable"));
        }
        Ok(ReferenceImage::new(name, "data:image/png;base64,AAAA"))
    }
}

pub fn bytes_file(name: &str) -> ReferenceFile {
    ReferenceFile::Bytes {
        name: name.to_string(),
        mime_type: Some("image/png".to_string()),
        bytes: vec![0, 1, 2],
    }
}

// ----------------------------------------------------------------------------
// Harness
// ----------------------------------------------------------------------------

pub struct Harness {
    pub handle: OrchestratorHandle,
    pub sessions: Arc<InMemorySessionRepository>,
    pub providers: Arc<StaticProviders>,
}

impl Harness {
    /// Spawns an orchestrator with `layout_count` windows and loads `providers`.
    pub async fn start(
        generator: Arc<dyn ImageGenerator>,
        providers: Vec<ProviderConfig>,
        layout_count: usize,
    ) -> Self {
        Self::start_with(generator, providers, layout_count, Arc::new(InMemorySessionRepository::new()))
            .await
    }

    pub async fn start_with(
        generator: Arc<dyn ImageGenerator>,
        providers: Vec<ProviderConfig>,
        layout_count: usize,
        sessions: Arc<InMemorySessionRepository>,
    ) -> Self {
        let providers = Arc::new(StaticProviders::new(providers));
        let handle = Orchestrator::spawn(
            OrchestratorDeps {
                generator,
                sessions: sessions.clone(),
                providers: providers.clone(),
                materializer: Arc::new(FakeMaterializer),
            },
            OrchestratorOptions {
                layout_count,
                image_size: None,
            },
        );
        handle.refresh_providers().await.unwrap();
        let harness = Self {
            handle,
            sessions,
            providers,
        };
        harness.idle().await;
        harness
    }

    pub async fn idle(&self) {
        tokio::time::timeout(TIMEOUT, self.handle.wait_idle())
            .await
            .expect("orchestrator did not go idle")
            .unwrap();
    }
}
