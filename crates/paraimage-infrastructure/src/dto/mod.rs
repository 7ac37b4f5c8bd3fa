//! On-disk representations.
//!
//! DTOs carry a `schema_version` so that stored files can be recognized and
//! rejected when they were written by a newer release.

mod config;
mod session;

pub use config::{AppSection, ConfigRoot, PromptEntry, ProviderEntry};
pub use session::{SESSION_SCHEMA_VERSION, SessionDocument};
