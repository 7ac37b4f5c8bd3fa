//! Domain layer for ParaImage.
//!
//! Holds the pure domain types (models, messages, windows, sessions), the
//! model registry, and the collaborator traits that the application layer
//! orchestrates against. Nothing in this crate performs I/O.

pub mod error;
pub mod generation;
pub mod message;
pub mod provider;
pub mod reference;
pub mod registry;
pub mod session;
pub mod window;

// Re-export common error type
pub use error::ParaImageError;

pub use generation::{GeneratedImage, GenerationError, GenerationRequest, ImageGenerator};
pub use message::{AssistantOutcome, Message, MessageBody};
pub use provider::{ProviderConfig, ProviderConfigSource, ProviderSettings, ProviderSettingsRepository};
pub use reference::{FileMaterializer, ReferenceFile, ReferenceImage};
pub use registry::{Model, ModelRegistry, build_model_list, build_model_map, model_key};
pub use session::{Session, SessionRepository};
pub use window::{MAX_LAYOUT_COUNT, MIN_LAYOUT_COUNT, Window, WindowId};
