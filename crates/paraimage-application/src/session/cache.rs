use paraimage_core::Session;
use std::collections::{HashMap, HashSet};

/// In-memory history of recorded sessions, grouped by model key.
///
/// Each model's list is kept sorted by `updated_at`, newest first. Models are
/// hydrated from the store at most once; a failed fetch leaves the model
/// un-hydrated so a later call can retry it.
#[derive(Debug, Default)]
pub struct HistoryCache {
    by_model: HashMap<String, Vec<Session>>,
    hydrated: HashSet<String>,
    hydrating: HashSet<String>,
}

impl HistoryCache {
    /// Creates a new empty HistoryCache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions recorded for a model, newest first.
    pub fn list(&self, model_key: &str) -> &[Session] {
        self.by_model
            .get(model_key)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Finds a session by id across all models.
    pub fn find(&self, session_id: &str) -> Option<&Session> {
        self.by_model
            .values()
            .flat_map(|sessions| sessions.iter())
            .find(|s| s.id == session_id)
    }

    /// Finds a session by id within one model's history.
    pub fn find_in_model(&self, model_key: &str, session_id: &str) -> Option<&Session> {
        self.list(model_key).iter().find(|s| s.id == session_id)
    }

    /// Inserts or replaces a session and re-sorts its model's list.
    pub fn upsert(&mut self, session: Session) {
        let sessions = self.by_model.entry(session.model_key.clone()).or_default();
        match sessions.iter_mut().find(|s| s.id == session.id) {
            Some(existing) => *existing = session,
            None => sessions.push(session),
        }
        sort_newest_first(sessions);
    }

    /// Removes a session from memory. Returns the removed entry, if any.
    pub fn forget(&mut self, session_id: &str) -> Option<Session> {
        for sessions in self.by_model.values_mut() {
            if let Some(index) = sessions.iter().position(|s| s.id == session_id) {
                return Some(sessions.remove(index));
            }
        }
        None
    }

    /// Claims the models that still need hydrating.
    ///
    /// Returned models are marked in progress until [`HistoryCache::merge`] or
    /// [`HistoryCache::hydration_failed`] is called for them.
    pub fn claim_for_hydration<'a>(
        &mut self,
        model_keys: impl IntoIterator<Item = &'a str>,
    ) -> Vec<String> {
        let mut claimed = Vec::new();
        for key in model_keys {
            if self.hydrated.contains(key) || self.hydrating.contains(key) {
                continue;
            }
            self.hydrating.insert(key.to_string());
            claimed.push(key.to_string());
        }
        claimed
    }

    /// Merges persisted sessions for a model and marks it hydrated.
    ///
    /// Entries are matched by id; the one with the later `updated_at` wins, so
    /// sessions recorded while the fetch was in flight are not overwritten.
    pub fn merge(&mut self, model_key: &str, fetched: Vec<Session>) {
        self.hydrating.remove(model_key);
        self.hydrated.insert(model_key.to_string());

        let sessions = self.by_model.entry(model_key.to_string()).or_default();
        for incoming in fetched {
            match sessions.iter_mut().find(|s| s.id == incoming.id) {
                Some(existing) if existing.updated_at >= incoming.updated_at => {}
                Some(existing) => *existing = incoming,
                None => sessions.push(incoming),
            }
        }
        sort_newest_first(sessions);

        tracing::debug!(
            "[HistoryCache] Hydrated model {}: {} session(s)",
            model_key,
            sessions.len()
        );
    }

    /// Releases a model whose fetch failed so it can be retried.
    pub fn hydration_failed(&mut self, model_key: &str) {
        self.hydrating.remove(model_key);
    }

    pub fn is_hydrated(&self, model_key: &str) -> bool {
        self.hydrated.contains(model_key)
    }
}

fn sort_newest_first(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn session(id: &str, model_key: &str, age_minutes: i64) -> Session {
        let at = Utc::now() - Duration::minutes(age_minutes);
        Session {
            id: id.to_string(),
            model_key: model_key.to_string(),
            title: id.to_string(),
            messages: vec![],
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_upsert_keeps_newest_first() {
        let mut cache = HistoryCache::new();
        cache.upsert(session("old", "A", 10));
        cache.upsert(session("new", "A", 1));

        let ids: Vec<_> = cache.list("A").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "old"]);

        cache.upsert(session("old", "A", 0));
        let ids: Vec<_> = cache.list("A").iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "new"]);
        assert_eq!(cache.list("A").len(), 2);
    }

    #[test]
    fn test_merge_prefers_later_update() {
        let mut cache = HistoryCache::new();
        let mut local = session("s1", "A", 0);
        local.title = "local".to_string();
        cache.upsert(local);

        let mut stale = session("s1", "A", 30);
        stale.title = "stored".to_string();
        cache.merge("A", vec![stale, session("s2", "A", 60)]);

        assert_eq!(cache.list("A").len(), 2);
        assert_eq!(cache.find("s1").unwrap().title, "local");
        assert!(cache.is_hydrated("A"));
    }

    #[test]
    fn test_claim_is_exclusive_until_settled() {
        let mut cache = HistoryCache::new();
        assert_eq!(cache.claim_for_hydration(["A", "B"]), vec!["A", "B"]);
        assert!(cache.claim_for_hydration(["A"]).is_empty());

        cache.hydration_failed("A");
        cache.merge("B", vec![]);

        assert_eq!(cache.claim_for_hydration(["A", "B"]), vec!["A"]);
    }

    #[test]
    fn test_forget_removes_entry() {
        let mut cache = HistoryCache::new();
        cache.upsert(session("s1", "A", 0));

        assert!(cache.forget("s1").is_some());
        assert!(cache.find("s1").is_none());
        assert!(cache.forget("s1").is_none());
    }
}
