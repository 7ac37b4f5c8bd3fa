//! HTTP image generation backends.
//!
//! - [`OpenAiImageAgent`]: OpenAI-compatible `/images/generations` endpoints
//!   (OpenAI, Volcengine Seedream, AIHubMix, DashScope compatible mode, ...)
//! - [`GeminiImageAgent`]: Gemini `generateContent` with inline image parts
//! - [`ProviderImageGenerator`]: resolves provider settings and routes each
//!   request to one of the above

mod http_error;
pub mod gemini_image_agent;
pub mod openai_image_agent;
pub mod provider_hints;
pub mod provider_router;

pub use gemini_image_agent::GeminiImageAgent;
pub use openai_image_agent::OpenAiImageAgent;
pub use provider_router::ProviderImageGenerator;
