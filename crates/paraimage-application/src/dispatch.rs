//! Dispatch coordinator.
//!
//! Fans one submission out to every eligible window and applies each
//! settlement back to the window it was issued for. Planning and applying are
//! synchronous; only [`run_job`] awaits the backend.

use futures::FutureExt;
use paraimage_core::generation::GenerationError;
use paraimage_core::{
    GeneratedImage, GenerationRequest, ImageGenerator, Message, ModelRegistry, ReferenceImage,
    Window, WindowId,
};
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::window_store::WindowStore;

/// One generation call to be issued for one window.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub dispatch_id: u64,
    pub window_id: WindowId,
    pub model_key: String,
    pub request: GenerationRequest,
}

/// The settled outcome of a [`DispatchJob`].
#[derive(Debug, Clone)]
pub struct Settlement {
    pub dispatch_id: u64,
    pub window_id: WindowId,
    pub model_key: String,
    pub result: Result<GeneratedImage, GenerationError>,
}

/// Result of planning a submission.
#[derive(Debug, Default)]
pub struct SubmitPlan {
    /// Snapshots of every window the user message was appended to
    pub touched: Vec<Window>,
    pub jobs: Vec<DispatchJob>,
}

/// Tracks dispatch ids and which of them are still in flight.
#[derive(Debug, Default)]
pub struct DispatchCoordinator {
    next_dispatch_id: u64,
    in_flight: HashSet<u64>,
}

impl DispatchCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Appends one user message to every window and plans one call per
    /// window bound to a model present in `registry`.
    pub fn plan_submit(
        &mut self,
        store: &mut WindowStore,
        registry: &ModelRegistry,
        prompt: &str,
        references: Vec<ReferenceImage>,
        size: Option<&str>,
    ) -> SubmitPlan {
        let message = Message::user(prompt, references.clone());
        let mut plan = SubmitPlan::default();

        for window in store.windows_mut() {
            window.messages.push(message.clone());

            let model = window.model_key.as_deref().and_then(|key| registry.get(key));
            if let Some(model) = model {
                let dispatch_id = self.issue();
                window.generating = true;
                window.pending_dispatch = Some(dispatch_id);

                plan.jobs.push(DispatchJob {
                    dispatch_id,
                    window_id: window.id,
                    model_key: model.key.clone(),
                    request: GenerationRequest {
                        model_id: model.model_id.clone(),
                        provider_name: model.provider_name.clone(),
                        prompt: prompt.to_string(),
                        references: references.clone(),
                        size: size.map(str::to_string),
                    },
                });
            }

            plan.touched.push(window.clone());
        }

        tracing::debug!(
            "[DispatchCoordinator] Planned submission: windows={}, calls={}",
            plan.touched.len(),
            plan.jobs.len()
        );
        plan
    }

    /// Plans a re-issue of one user message for one window.
    ///
    /// Returns `None` when the window is unknown, still generating, not bound
    /// to a registered model, or the message is not a retryable user message.
    pub fn plan_retry(
        &mut self,
        store: &mut WindowStore,
        registry: &ModelRegistry,
        window_id: WindowId,
        message_id: &str,
        size: Option<&str>,
    ) -> Option<DispatchJob> {
        let window = store.get_mut(window_id)?;
        if window.generating {
            tracing::debug!(
                "[DispatchCoordinator] Retry ignored, window {} is generating",
                window_id
            );
            return None;
        }

        let message = window.find_message(message_id)?;
        if !message.is_retryable() {
            return None;
        }
        let prompt = message.prompt().unwrap_or_default().to_string();
        let references = message.references().to_vec();

        let model = registry.get(window.model_key.as_deref()?)?;
        let dispatch_id = self.issue();
        window.generating = true;
        window.pending_dispatch = Some(dispatch_id);

        Some(DispatchJob {
            dispatch_id,
            window_id,
            model_key: model.key.clone(),
            request: GenerationRequest {
                model_id: model.model_id.clone(),
                provider_name: model.provider_name.clone(),
                prompt,
                references,
                size: size.map(str::to_string),
            },
        })
    }

    /// Applies a settlement to the window it was issued for.
    ///
    /// Returns the updated window snapshot for recording, or `None` when the
    /// window no longer exists.
    pub fn apply_settlement(
        &mut self,
        store: &mut WindowStore,
        settlement: Settlement,
    ) -> Option<Window> {
        self.in_flight.remove(&settlement.dispatch_id);

        let Some(window) = store.get_mut(settlement.window_id) else {
            tracing::debug!(
                "[DispatchCoordinator] Window {} is gone, dropping dispatch {}",
                settlement.window_id,
                settlement.dispatch_id
            );
            return None;
        };

        window
            .messages
            .push(Message::assistant(settlement.model_key, settlement.result));

        if window.pending_dispatch == Some(settlement.dispatch_id) {
            window.generating = false;
            window.pending_dispatch = None;
        }

        Some(window.clone())
    }

    fn issue(&mut self) -> u64 {
        self.next_dispatch_id += 1;
        self.in_flight.insert(self.next_dispatch_id);
        self.next_dispatch_id
    }
}

/// Runs one generation call to completion.
///
/// A panicking backend is reported as [`GenerationError::Aborted`], so every
/// job yields exactly one settlement.
pub async fn run_job(generator: Arc<dyn ImageGenerator>, job: DispatchJob) -> Settlement {
    let DispatchJob {
        dispatch_id,
        window_id,
        model_key,
        request,
    } = job;

    let result = AssertUnwindSafe(generator.generate(request))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            tracing::warn!(
                "[DispatchCoordinator] Generation for window {} panicked",
                window_id
            );
            Err(GenerationError::Aborted)
        });

    Settlement {
        dispatch_id,
        window_id,
        model_key,
        result,
    }
}
