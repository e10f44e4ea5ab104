//! Model name resolution and the hosted-model catalog.
//!
//! Prompt records carry short model names (`schnell`, `minimax`, ...).
//! Hosted APIs expect full identifiers (`flux-1/schnell`,
//! `minimax/image-01`, ...). The catalog file lists every model the
//! hosted dispatcher is willing to submit to.

use serde::Deserialize;

/// Local ComfyUI model names. Records with any other model are routed
/// to a hosted backend.
pub const LOCAL_MODELS: &[&str] = &["schnell", "dev"];

/// Models accepted even when absent from the catalog file.
pub const ALLOWED_OVERRIDES: &[&str] = &["gemini-25-flash-image/edit"];

/// Mapping from short record model names to full hosted-API model ids.
/// Names not listed here pass through unchanged (records may already
/// carry the full id).
const MODEL_MAPPING: &[(&str, &str)] = &[
    ("schnell", "flux-1/schnell"),
    ("dev", "flux-1/dev"),
    ("minimax", "minimax/image-01"),
    ("minimax-expand", "minimax/image-01"),
    ("imagen3", "imagen4/preview/ultra"),
    ("aura-flow", "aura-flow"),
    ("ideogram-v2a", "ideogram/v2a"),
    ("luma-photon", "luma-photon"),
    ("recraft-20b", "recraft-20b"),
    ("fal-ai/qwen-image", "qwen-image"),
];

/// Resolve a record's model name to the full hosted-API identifier.
pub fn resolve_model_name(model: &str) -> &str {
    MODEL_MAPPING
        .iter()
        .find(|(short, _)| *short == model)
        .map(|(_, full)| *full)
        .unwrap_or(model)
}

/// True when the model runs on the local ComfyUI instance.
pub fn is_local_model(model: &str) -> bool {
    LOCAL_MODELS.contains(&model)
}

/// One entry in the model catalog file.
///
/// The catalog carries more fields (pricing, dimensions limits); only
/// the name matters for dispatch.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelDefinition {
    pub name: String,
}

/// The set of hosted models a dispatcher may submit to.
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    names: Vec<String>,
}

impl ModelCatalog {
    /// Parse a catalog from the JSON model-definition file contents.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let defs: Vec<ModelDefinition> = serde_json::from_str(json)?;
        Ok(Self {
            names: defs.into_iter().map(|d| d.name).collect(),
        })
    }

    /// Build a catalog from bare model names (tests, fixtures).
    pub fn from_names<I: IntoIterator<Item = String>>(names: I) -> Self {
        Self {
            names: names.into_iter().collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// True when the (already resolved) model name may be dispatched:
    /// either listed in the catalog or explicitly allowed.
    pub fn allows(&self, resolved_model: &str) -> bool {
        self.names.iter().any(|n| n == resolved_model)
            || ALLOWED_OVERRIDES.contains(&resolved_model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names_resolve_to_full_ids() {
        assert_eq!(resolve_model_name("schnell"), "flux-1/schnell");
        assert_eq!(resolve_model_name("minimax"), "minimax/image-01");
        assert_eq!(resolve_model_name("minimax-expand"), "minimax/image-01");
        assert_eq!(resolve_model_name("imagen3"), "imagen4/preview/ultra");
    }

    #[test]
    fn unmapped_names_pass_through() {
        assert_eq!(resolve_model_name("flux-1/schnell"), "flux-1/schnell");
        assert_eq!(resolve_model_name("some-new-model"), "some-new-model");
    }

    #[test]
    fn local_models() {
        assert!(is_local_model("schnell"));
        assert!(is_local_model("dev"));
        assert!(!is_local_model("minimax"));
    }

    #[test]
    fn catalog_parses_definition_file() {
        let json = r#"[
            {"name": "flux-1/schnell", "max_width": 1536},
            {"name": "aura-flow"}
        ]"#;
        let catalog = ModelCatalog::from_json(json).unwrap();
        assert_eq!(catalog.len(), 2);
        assert!(catalog.allows("flux-1/schnell"));
        assert!(catalog.allows("aura-flow"));
        assert!(!catalog.allows("flux-1/dev"));
    }

    #[test]
    fn catalog_rejects_malformed_json() {
        assert!(ModelCatalog::from_json("{not json").is_err());
    }

    #[test]
    fn overrides_allowed_without_catalog_entry() {
        let catalog = ModelCatalog::default();
        assert!(catalog.allows("gemini-25-flash-image/edit"));
        assert!(!catalog.allows("flux-1/schnell"));
    }
}
