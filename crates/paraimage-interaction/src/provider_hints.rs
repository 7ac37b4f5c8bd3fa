//! Provider and model heuristics.
//!
//! Providers are identified by loose hints in their name, base URL and model
//! id, so user-named providers ("My Doubao", "google-proxy") still get the
//! right defaults.

pub const DEFAULT_SEEDREAM_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const DEFAULT_DASHSCOPE_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
pub const DEFAULT_AIHUBMIX_BASE_URL: &str = "https://aihubmix.com/v1";

const SEEDREAM_PROVIDER_HINTS: &[&str] = &["seedream", "seededit", "doubao", "volc", "bytedance", "ark"];
const OPENAI_PROVIDER_HINTS: &[&str] = &["openai"];
const GEMINI_PROVIDER_HINTS: &[&str] = &["gemini", "google"];
const DASHSCOPE_PROVIDER_HINTS: &[&str] = &["qwen", "dashscope", "aliyun", "alibaba"];
const AIHUBMIX_PROVIDER_HINTS: &[&str] = &["aihubmix"];
const VOLCENGINE_PROVIDER_HINTS: &[&str] = &["volcengine", "volc", "ark", "doubao", "bytedance"];

const VOLCENGINE_MODEL_ALIASES: &[(&str, &str)] = &[
    ("doubao-seedream-4.0", "doubao-seedream-4-0-250828"),
    ("doubao-seedream-4-0", "doubao-seedream-4-0-250828"),
    ("doubao-seedream-4.5", "doubao-seedream-4-5-251128"),
    ("doubao-seedream-4-5", "doubao-seedream-4-5-251128"),
];

const GEMINI_MODEL_ALIASES: &[(&str, &str)] = &[
    ("nano-banana", "gemini-2.5-flash-image"),
    ("nano-banana-pro", "gemini-3-pro-image-preview"),
];

fn has_hint(value: &str, hints: &[&str]) -> bool {
    let lowered = value.to_lowercase();
    hints.iter().any(|hint| lowered.contains(hint))
}

/// Whether a request targets a Seedream (Volcengine Ark) style endpoint.
pub fn is_seedream_provider(provider_name: &str, base_url: &str, model_id: &str) -> bool {
    let model = model_id.to_lowercase();
    if model.contains("seedream") || model.contains("seededit") {
        return true;
    }
    let base = base_url.to_lowercase();
    if base.contains("volces.com") || base.contains("ark") {
        return true;
    }
    has_hint(provider_name, SEEDREAM_PROVIDER_HINTS)
}

pub fn is_gemini_provider(provider_name: &str) -> bool {
    has_hint(provider_name, GEMINI_PROVIDER_HINTS)
}

/// Base URL used when the provider's settings leave it empty.
pub fn resolve_default_base_url(provider_name: &str, model_id: &str) -> Option<&'static str> {
    let model = model_id.to_lowercase();

    if is_seedream_provider(provider_name, "", model_id) {
        return Some(DEFAULT_SEEDREAM_BASE_URL);
    }
    if has_hint(provider_name, AIHUBMIX_PROVIDER_HINTS) {
        return Some(DEFAULT_AIHUBMIX_BASE_URL);
    }
    if has_hint(provider_name, GEMINI_PROVIDER_HINTS) || model.contains("nano-banana") {
        return Some(DEFAULT_GEMINI_BASE_URL);
    }
    if has_hint(provider_name, DASHSCOPE_PROVIDER_HINTS) || model.contains("qwen") {
        return Some(DEFAULT_DASHSCOPE_BASE_URL);
    }
    if has_hint(provider_name, OPENAI_PROVIDER_HINTS) || model.starts_with("gpt-") {
        return Some(DEFAULT_OPENAI_BASE_URL);
    }
    None
}

/// Maps user-facing model aliases to the identifier the provider expects.
pub fn resolve_provider_model_id(provider_name: &str, model_id: &str) -> String {
    let model = model_id.to_lowercase();

    let lookup = |aliases: &[(&str, &'static str)]| {
        aliases
            .iter()
            .find(|(alias, _)| *alias == model)
            .map(|(_, target)| target.to_string())
    };

    if has_hint(provider_name, VOLCENGINE_PROVIDER_HINTS) {
        if let Some(mapped) = lookup(VOLCENGINE_MODEL_ALIASES) {
            return mapped;
        }
    }
    if has_hint(provider_name, &["gemini"]) || has_hint(provider_name, AIHUBMIX_PROVIDER_HINTS) {
        if let Some(mapped) = lookup(GEMINI_MODEL_ALIASES) {
            return mapped;
        }
    }
    model_id.to_string()
}

/// Seedream 4.x accepts the `sequential_image_generation` switch.
pub fn supports_seedream_sequence(model_id: &str) -> bool {
    model_id.to_lowercase().contains("seedream-4")
}

pub fn is_gpt_image_model(model_id: &str) -> bool {
    model_id.eq_ignore_ascii_case("gpt-image-1")
}
