//! Window store.
//!
//! Ordered collection of independent windows. Every structural operation
//! returns the outgoing window snapshots that must be recorded before they are
//! discarded; the store itself never touches history.

use paraimage_core::session::Session;
use paraimage_core::{MAX_LAYOUT_COUNT, MIN_LAYOUT_COUNT, ModelRegistry, Window, WindowId};

#[derive(Debug, Clone)]
pub struct WindowStore {
    windows: Vec<Window>,
    next_id: WindowId,
}

impl WindowStore {
    /// Creates a store with `layout_count` fresh unbound windows.
    pub fn new(layout_count: usize) -> Self {
        let mut store = Self {
            windows: Vec::new(),
            next_id: 1,
        };
        let count = clamp_layout_count(layout_count);
        for _ in 0..count {
            let window = store.fresh_window(None);
            store.windows.push(window);
        }
        store
    }

    pub fn windows(&self) -> &[Window] {
        &self.windows
    }

    pub fn layout_count(&self) -> usize {
        self.windows.len()
    }

    pub fn get(&self, window_id: WindowId) -> Option<&Window> {
        self.windows.iter().find(|w| w.id == window_id)
    }

    pub fn get_mut(&mut self, window_id: WindowId) -> Option<&mut Window> {
        self.windows.iter_mut().find(|w| w.id == window_id)
    }

    pub(crate) fn windows_mut(&mut self) -> &mut [Window] {
        &mut self.windows
    }

    /// Resizes the layout.
    ///
    /// Returns the windows dropped by a shrink. Growing appends unbound
    /// windows; the caller is expected to run [`WindowStore::repair`] after.
    pub fn set_layout_count(&mut self, count: usize) -> Vec<Window> {
        let count = clamp_layout_count(count);
        let current = self.windows.len();

        if count < current {
            return self.windows.split_off(count);
        }

        for _ in current..count {
            let window = self.fresh_window(None);
            self.windows.push(window);
        }
        Vec::new()
    }

    /// Binds a window to another model, starting a new conversation.
    ///
    /// Returns the outgoing window, or `None` when the id is unknown or the
    /// window is already bound to `model_key`.
    pub fn rebind(&mut self, window_id: WindowId, model_key: &str) -> Option<Window> {
        let window = self.get_mut(window_id)?;
        if window.model_key.as_deref() == Some(model_key) {
            return None;
        }

        let outgoing = window.clone();
        window.reset(Some(model_key.to_string()));
        Some(outgoing)
    }

    /// Closes a window.
    ///
    /// The last remaining window is reset to an empty unbound placeholder
    /// instead of being removed.
    pub fn close(&mut self, window_id: WindowId) -> Option<Window> {
        let index = self.windows.iter().position(|w| w.id == window_id)?;

        if self.windows.len() > MIN_LAYOUT_COUNT {
            return Some(self.windows.remove(index));
        }

        let outgoing = self.windows[index].clone();
        let placeholder = self.fresh_window(None);
        self.windows[index] = placeholder;
        Some(outgoing)
    }

    /// Collapses the layout to a single window bound to `model_key`.
    ///
    /// An existing window bound to that model is kept as is; otherwise a new
    /// window is created. Returns every window that was visible before.
    pub fn focus(&mut self, model_key: &str) -> Vec<Window> {
        let outgoing = self.windows.clone();
        let kept = self
            .windows
            .iter()
            .position(|w| w.model_key.as_deref() == Some(model_key))
            .map(|index| self.windows.swap_remove(index));

        let window = match kept {
            Some(window) => window,
            None => self.fresh_window(Some(model_key.to_string())),
        };
        self.windows = vec![window];
        outgoing
    }

    /// Starts a new conversation in the same window and model.
    pub fn clear(&mut self, window_id: WindowId) -> Option<Window> {
        let window = self.get_mut(window_id)?;
        let outgoing = window.clone();
        let model_key = window.model_key.clone();
        window.reset(model_key);
        Some(outgoing)
    }

    /// Loads a stored conversation into a window.
    ///
    /// Rebinds the window to the session's model, replaces its transcript and
    /// adopts the session id. Returns the outgoing window when it held a
    /// different conversation.
    pub fn load_session(&mut self, window_id: WindowId, session: &Session) -> Option<Window> {
        let window = self.get_mut(window_id)?;
        let outgoing = (window.session_id != session.id).then(|| window.clone());

        window.model_key = Some(session.model_key.clone());
        window.messages = session.messages.clone();
        window.session_id = session.id.clone();
        window.generating = false;
        window.pending_dispatch = None;
        outgoing
    }

    /// Rebinds every window whose model is not in `registry`.
    ///
    /// Each such window moves to the registry's fallback for its position (or
    /// becomes unbound when there are no models) and starts a new
    /// conversation. Returns the outgoing windows.
    pub fn repair(&mut self, registry: &ModelRegistry) -> Vec<Window> {
        let mut outgoing = Vec::new();

        for (index, window) in self.windows.iter_mut().enumerate() {
            let bound_ok = window
                .model_key
                .as_deref()
                .is_some_and(|key| registry.contains(key));
            if bound_ok {
                continue;
            }

            let fallback = registry
                .fallback_for_position(index)
                .map(|model| model.key.clone());
            if fallback.is_none() && window.model_key.is_none() {
                continue;
            }

            outgoing.push(window.clone());
            window.reset(fallback);
        }

        outgoing
    }

    fn fresh_window(&mut self, model_key: Option<String>) -> Window {
        let id = self.next_id;
        self.next_id += 1;
        Window::new(id, model_key)
    }
}

impl Default for WindowStore {
    fn default() -> Self {
        Self::new(MIN_LAYOUT_COUNT)
    }
}

/// Bounds a requested layout count to the supported range.
pub fn clamp_layout_count(count: usize) -> usize {
    count.clamp(MIN_LAYOUT_COUNT, MAX_LAYOUT_COUNT)
}
