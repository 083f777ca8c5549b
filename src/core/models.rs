//! Built-in model allow-list
//!
//! The completion endpoint accepts far more models than we admit here; the
//! chat core only ever selects from this fixed table, and `/model` rejects
//! anything outside it.

#[derive(Debug, Clone, Copy)]
pub struct ModelInfo {
    pub id: &'static str,
    pub display_name: &'static str,
}

const BUILTIN_MODELS: &[ModelInfo] = &[
    ModelInfo {
        id: "openai/gpt-4o",
        display_name: "GPT-4o",
    },
    ModelInfo {
        id: "anthropic/claude-3-haiku",
        display_name: "Claude 3 Haiku",
    },
    ModelInfo {
        id: "anthropic/claude-3-opus",
        display_name: "Claude 3 Opus",
    },
    ModelInfo {
        id: "anthropic/claude-3-sonnet",
        display_name: "Claude 3 Sonnet",
    },
    ModelInfo {
        id: "google/gemini-pro",
        display_name: "Gemini Pro",
    },
];

pub fn builtin_models() -> &'static [ModelInfo] {
    BUILTIN_MODELS
}

/// The model a fresh session starts on.
pub fn default_model() -> &'static str {
    BUILTIN_MODELS[0].id
}

pub fn find_model(id: &str) -> Option<&'static ModelInfo> {
    BUILTIN_MODELS.iter().find(|m| m.id == id)
}

pub fn is_allowed(id: &str) -> bool {
    find_model(id).is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_model_is_in_the_allow_list() {
        assert!(is_allowed(default_model()));
    }

    #[test]
    fn find_model_is_exact_match() {
        assert!(find_model("openai/gpt-4o").is_some());
        assert!(find_model("OPENAI/GPT-4O").is_none());
        assert!(find_model("gpt-4o").is_none());
    }

    #[test]
    fn model_properties() {
        for model in builtin_models() {
            assert!(!model.id.is_empty());
            assert!(!model.display_name.is_empty());
            // Endpoint model ids are provider-qualified
            assert!(model.id.contains('/'));
        }
    }
}
