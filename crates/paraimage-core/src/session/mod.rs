//! Session domain module.
//!
//! A session is the persisted form of one window conversation.
//!
//! # Module Structure
//!
//! - `model`: Core session domain model (`Session`)
//! - `title`: Title derivation from a transcript
//! - `repository`: Repository trait for session persistence

mod model;
mod repository;
mod title;

// Re-export public API
pub use model::Session;
pub use repository::SessionRepository;
pub use title::{
    DEFAULT_CONVERSATION_TITLE, IMAGE_CONVERSATION_TITLE, derive_title,
};
