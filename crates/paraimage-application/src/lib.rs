//! Application layer for ParaImage.
//!
//! This crate owns the multi-window generation workflow: the window store,
//! the dispatch coordinator, the session recorder and history cache, and the
//! orchestrator actor that serializes every state transition.

pub mod dispatch;
pub mod orchestrator;
pub mod session;
pub mod window_store;
pub mod workbench;

pub use dispatch::{DispatchCoordinator, DispatchJob, Settlement};
pub use orchestrator::{Orchestrator, OrchestratorDeps, OrchestratorHandle, OrchestratorOptions};
pub use session::{HistoryCache, SessionRecorder};
pub use window_store::WindowStore;
pub use workbench::{Effects, Workbench};
