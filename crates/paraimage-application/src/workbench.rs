//! Synchronous owner of all orchestrator state.
//!
//! Every user action and every internal event is a method here that mutates
//! state in one step and returns the side effects to run: generation calls to
//! spawn, sessions to persist and models whose history should be fetched.
//! The orchestrator actor is the only caller, which makes each transition
//! atomic with respect to the others.

use chrono::Utc;
use paraimage_core::error::{ParaImageError, Result};
use paraimage_core::{
    Model, ModelRegistry, ProviderConfig, ReferenceImage, Session, Window, WindowId,
};

use crate::dispatch::{DispatchCoordinator, DispatchJob, Settlement};
use crate::session::{HistoryCache, SessionRecorder};
use crate::window_store::WindowStore;

/// Side effects produced by a state transition.
#[derive(Debug, Default)]
pub struct Effects {
    /// Generation calls to issue concurrently
    pub jobs: Vec<DispatchJob>,
    /// Recorded sessions to hand to persistence, in recording order
    pub persist: Vec<Session>,
    /// Models whose stored history should be fetched
    pub hydrate: Vec<String>,
}

impl Effects {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty() && self.persist.is_empty() && self.hydrate.is_empty()
    }
}

pub struct Workbench {
    store: WindowStore,
    registry: ModelRegistry,
    history: HistoryCache,
    recorder: SessionRecorder,
    dispatch: DispatchCoordinator,
    image_size: Option<String>,
}

impl Workbench {
    pub fn new(layout_count: usize, image_size: Option<String>) -> Self {
        Self {
            store: WindowStore::new(layout_count),
            registry: ModelRegistry::default(),
            history: HistoryCache::new(),
            recorder: SessionRecorder::new(),
            dispatch: DispatchCoordinator::new(),
            image_size,
        }
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    pub fn windows(&self) -> &[Window] {
        self.store.windows()
    }

    pub fn models(&self) -> &[Model] {
        self.registry.models()
    }

    pub fn history(&self, model_key: &str) -> &[Session] {
        self.history.list(model_key)
    }

    pub fn find_session(&self, session_id: &str) -> Option<&Session> {
        self.history.find(session_id)
    }

    pub fn in_flight(&self) -> usize {
        self.dispatch.in_flight()
    }

    // ------------------------------------------------------------------
    // Window lifecycle
    // ------------------------------------------------------------------

    pub fn set_layout_count(&mut self, count: usize) -> Effects {
        let before = self.store.layout_count();
        let mut outgoing = self.store.set_layout_count(count);
        if self.store.layout_count() > before {
            outgoing.extend(self.store.repair(&self.registry));
        }
        tracing::debug!(
            "[Workbench] Layout count {} -> {}",
            before,
            self.store.layout_count()
        );
        self.record_all(&outgoing)
    }

    pub fn rebind(&mut self, window_id: WindowId, model_key: &str) -> Effects {
        let outgoing = self.store.rebind(window_id, model_key);
        self.record_all(outgoing.as_slice())
    }

    pub fn close(&mut self, window_id: WindowId) -> Effects {
        let outgoing = self.store.close(window_id);
        self.record_all(outgoing.as_slice())
    }

    pub fn focus(&mut self, model_key: &str) -> Effects {
        let outgoing = self.store.focus(model_key);
        self.record_all(&outgoing)
    }

    pub fn clear(&mut self, window_id: WindowId) -> Effects {
        let outgoing = self.store.clear(window_id);
        self.record_all(outgoing.as_slice())
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Broadcasts one prompt with already materialized references.
    pub fn submit(&mut self, prompt: &str, references: Vec<ReferenceImage>) -> Result<Effects> {
        if prompt.trim().is_empty() && references.is_empty() {
            return Err(ParaImageError::EmptySubmission);
        }

        let plan = self.dispatch.plan_submit(
            &mut self.store,
            &self.registry,
            prompt,
            references,
            self.image_size.as_deref(),
        );

        let mut effects = self.record_all(&plan.touched);
        effects.jobs = plan.jobs;
        tracing::info!(
            "[Workbench] Submitted prompt to {} window(s), {} call(s) issued",
            plan.touched.len(),
            effects.jobs.len()
        );
        Ok(effects)
    }

    pub fn retry(&mut self, window_id: WindowId, message_id: &str) -> Effects {
        let job = self.dispatch.plan_retry(
            &mut self.store,
            &self.registry,
            window_id,
            message_id,
            self.image_size.as_deref(),
        );

        let mut effects = Effects::default();
        if let Some(job) = job {
            tracing::info!("[Workbench] Retrying message {} in window {}", message_id, window_id);
            effects.jobs.push(job);
        }
        effects
    }

    pub fn apply_settlement(&mut self, settlement: Settlement) -> Effects {
        tracing::info!(
            "[Workbench] Window {} settled via {} ({})",
            settlement.window_id,
            settlement.model_key,
            if settlement.result.is_ok() { "image" } else { "error" }
        );
        let updated = self.dispatch.apply_settlement(&mut self.store, settlement);
        self.record_all(updated.as_slice())
    }

    // ------------------------------------------------------------------
    // Providers and history
    // ------------------------------------------------------------------

    /// Replaces the model registry and repairs windows bound to vanished models.
    pub fn apply_providers(&mut self, providers: &[ProviderConfig]) -> Effects {
        self.registry = ModelRegistry::from_providers(providers);
        tracing::debug!("[Workbench] Registry rebuilt: {} model(s)", self.registry.len());

        let outgoing = self.store.repair(&self.registry);
        let mut effects = self.record_all(&outgoing);
        effects.hydrate = self.claim_unhydrated();
        effects
    }

    /// Claims every registered model whose history has not been loaded yet.
    pub fn hydrate_history(&mut self) -> Effects {
        Effects {
            hydrate: self.claim_unhydrated(),
            ..Effects::default()
        }
    }

    pub fn apply_history(&mut self, model_key: &str, result: Result<Vec<Session>>) {
        match result {
            Ok(sessions) => self.history.merge(model_key, sessions),
            Err(e) => {
                tracing::warn!(
                    "[Workbench] Failed to load history for model {}: {}",
                    model_key,
                    e
                );
                self.history.hydration_failed(model_key);
            }
        }
    }

    /// Continues a stored session in a window.
    ///
    /// Returns `None` when the window or session is unknown.
    pub fn continue_session(&mut self, window_id: WindowId, session_id: &str) -> Option<Effects> {
        self.store.get(window_id)?;
        let session = self.history.find(session_id)?.clone();

        let outgoing = self.store.load_session(window_id, &session);
        tracing::debug!(
            "[Workbench] Window {} continues session {} ({})",
            window_id,
            session.id,
            session.model_key
        );
        Some(self.record_all(outgoing.as_slice()))
    }

    pub fn forget_session(&mut self, session_id: &str) -> bool {
        self.history.forget(session_id).is_some()
    }

    fn claim_unhydrated(&mut self) -> Vec<String> {
        let keys: Vec<&str> = self.registry.models().iter().map(|m| m.key.as_str()).collect();
        self.history.claim_for_hydration(keys)
    }

    fn record_all(&mut self, windows: &[Window]) -> Effects {
        let now = Utc::now();
        let persist = windows
            .iter()
            .filter_map(|window| self.recorder.record(&mut self.history, window, now))
            .collect();
        Effects {
            persist,
            ..Effects::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use paraimage_core::GeneratedImage;
    use paraimage_core::generation::GenerationError;

    fn providers(ids: &[&str]) -> Vec<ProviderConfig> {
        vec![ProviderConfig {
            provider_name: "P".to_string(),
            model_ids: ids.iter().map(|s| s.to_string()).collect(),
            icon: None,
        }]
    }

    fn settle(job: &DispatchJob, result: std::result::Result<GeneratedImage, GenerationError>) -> Settlement {
        Settlement {
            dispatch_id: job.dispatch_id,
            window_id: job.window_id,
            model_key: job.model_key.clone(),
            result,
        }
    }

    #[test]
    fn test_empty_submission_is_rejected_without_state_change() {
        let mut bench = Workbench::new(2, None);
        bench.apply_providers(&providers(&["a", "b"]));

        let err = bench.submit("   ", vec![]).unwrap_err();

        assert!(matches!(err, ParaImageError::EmptySubmission));
        assert!(bench.windows().iter().all(|w| w.is_empty()));
    }

    #[test]
    fn test_providers_repair_windows_and_request_hydration() {
        let mut bench = Workbench::new(2, None);

        let effects = bench.apply_providers(&providers(&["a", "b"]));

        assert_eq!(effects.hydrate, vec!["P::a", "P::b"]);
        let keys: Vec<_> = bench.windows().iter().map(|w| w.model_key.clone()).collect();
        assert_eq!(keys, vec![Some("P::a".to_string()), Some("P::b".to_string())]);
        assert!(bench.apply_providers(&providers(&["a", "b"])).hydrate.is_empty());
    }

    #[test]
    fn test_growth_binds_new_windows() {
        let mut bench = Workbench::new(1, None);
        bench.apply_providers(&providers(&["a", "b"]));

        bench.set_layout_count(3);

        let keys: Vec<_> = bench.windows().iter().map(|w| w.model_key.clone().unwrap()).collect();
        assert_eq!(keys, vec!["P::a", "P::b", "P::a"]);
    }

    #[test]
    fn test_rebind_records_outgoing_conversation() {
        let mut bench = Workbench::new(1, None);
        bench.apply_providers(&providers(&["a", "b"]));
        let window_id = bench.windows()[0].id;
        let effects = bench.submit("cat", vec![]).unwrap();
        bench.apply_settlement(settle(&effects.jobs[0], Ok(GeneratedImage::new("u"))));
        bench.submit("dog", vec![]).unwrap();
        let session_id = bench.windows()[0].session_id.clone();

        let effects = bench.rebind(window_id, "P::b");

        assert_eq!(effects.persist.len(), 1);
        assert_eq!(effects.persist[0].id, session_id);
        assert_eq!(effects.persist[0].model_key, "P::a");
        assert_eq!(effects.persist[0].messages.len(), 3);
        assert_eq!(bench.history("P::a").len(), 1);
        assert!(bench.windows()[0].is_empty());
    }

    #[test]
    fn test_failed_history_fetch_can_be_retried() {
        let mut bench = Workbench::new(1, None);
        let effects = bench.apply_providers(&providers(&["a"]));
        assert_eq!(effects.hydrate, vec!["P::a"]);

        bench.apply_history("P::a", Err(ParaImageError::io("disk unplugged")));

        assert_eq!(bench.hydrate_history().hydrate, vec!["P::a"]);
    }

    #[test]
    fn test_continue_unknown_session_is_noop() {
        let mut bench = Workbench::new(1, None);
        let window_id = bench.windows()[0].id;
        assert!(bench.continue_session(window_id, "missing").is_none());
        assert!(bench.continue_session(999, "missing").is_none());
    }
}
