//! Session history management.
//!
//! - `cache`: per-model session lists, lazily hydrated from the store
//! - `recorder`: window snapshot to session upsert
//! - `writer`: single background task that persists recorded sessions in order

mod cache;
mod recorder;
mod writer;

pub use cache::HistoryCache;
pub use recorder::SessionRecorder;
pub use writer::SessionWriter;
