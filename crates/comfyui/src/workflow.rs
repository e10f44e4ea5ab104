//! Workflow template loading and per-job node patching.
//!
//! Templates are ComfyUI API-format graphs: a JSON object mapping node
//! ids to `{"class_type": ..., "inputs": {...}}`. Each generation type
//! is served by a fixed template file, and the node ids that receive
//! per-job values are hard-coded per template — they are positions in
//! that specific graph, not a schema.

use std::path::{Path, PathBuf};

use rand::Rng;
use serde_json::Value;
use storyloom_core::generation::{strength_label, GenerationType};

/// Errors from template loading and patching.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("No workflow template for generation type '{generation_type}' with model '{model}'")]
    UnsupportedVariant {
        generation_type: GenerationType,
        model: String,
    },

    #[error("Failed to read workflow template {path}: {source}")]
    TemplateRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Workflow template {path} is not valid JSON: {source}")]
    TemplateParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Workflow template is not a JSON object of nodes")]
    NotAnObject,

    #[error("Workflow has no node '{0}'")]
    MissingNode(String),

    #[error("Job is missing source image {index} for generation type '{generation_type}'")]
    MissingInputImage {
        generation_type: GenerationType,
        index: usize,
    },
}

/// Resolve the template file name for a generation type and model.
///
/// Only the plain prompt type is model-specific; the image-mix and
/// kontext templates embed their own checkpoints.
pub fn template_file(
    generation_type: GenerationType,
    model: &str,
) -> Result<&'static str, WorkflowError> {
    match generation_type {
        GenerationType::Prompt => match model {
            "schnell" => Ok("flux_schnell_for_image_gen.json"),
            "dev" => Ok("flux_dev_for_image_gen.json"),
            _ => Err(WorkflowError::UnsupportedVariant {
                generation_type,
                model: model.to_string(),
            }),
        },
        GenerationType::Outpaint => Ok("flux_outpaint_for_image_gen.json"),
        GenerationType::MixOne => Ok("flux_one_image_mix_for_image_gen.json"),
        GenerationType::Mix => Ok("flux_two_image_mix_for_image_gen.json"),
        GenerationType::KontextBasic => Ok("flux_kontext_basic.json"),
    }
}

/// A loaded workflow graph, ready for node patching.
#[derive(Debug, Clone)]
pub struct Workflow {
    graph: Value,
}

impl Workflow {
    /// Load a template from `dir` for the given variant.
    pub fn load(
        dir: &Path,
        generation_type: GenerationType,
        model: &str,
    ) -> Result<Self, WorkflowError> {
        let path = dir.join(template_file(generation_type, model)?);
        let text = std::fs::read_to_string(&path).map_err(|source| {
            WorkflowError::TemplateRead {
                path: path.clone(),
                source,
            }
        })?;
        Self::from_json(&text).map_err(|e| match e {
            WorkflowError::TemplateParse { source, .. } => {
                WorkflowError::TemplateParse { path, source }
            }
            other => other,
        })
    }

    /// Parse a template from JSON text.
    pub fn from_json(text: &str) -> Result<Self, WorkflowError> {
        let graph: Value =
            serde_json::from_str(text).map_err(|source| WorkflowError::TemplateParse {
                path: PathBuf::new(),
                source,
            })?;
        if !graph.is_object() {
            return Err(WorkflowError::NotAnObject);
        }
        Ok(Self { graph })
    }

    /// The full graph, as submitted to ComfyUI.
    pub fn graph(&self) -> &Value {
        &self.graph
    }

    /// Overwrite one input field on one node.
    ///
    /// Errors when the node id is absent — a template/plan mismatch
    /// must fail the record rather than silently render the template's
    /// baked-in values.
    pub fn set_input(
        &mut self,
        node: &str,
        field: &str,
        value: impl Into<Value>,
    ) -> Result<(), WorkflowError> {
        let node_obj = self
            .graph
            .get_mut(node)
            .ok_or_else(|| WorkflowError::MissingNode(node.to_string()))?;
        node_obj
            .as_object_mut()
            .ok_or_else(|| WorkflowError::MissingNode(node.to_string()))?
            .entry("inputs")
            .or_insert_with(|| Value::Object(Default::default()))
            .as_object_mut()
            .ok_or_else(|| WorkflowError::MissingNode(node.to_string()))?
            .insert(field.to_string(), value.into());
        Ok(())
    }

    /// Read back an input field (tests, logging).
    pub fn input(&self, node: &str, field: &str) -> Option<&Value> {
        self.graph.get(node)?.get("inputs")?.get(field)
    }
}

/// Everything the templater needs to turn a template into a
/// submittable graph for one record.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub generation_type: GenerationType,
    pub model: String,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    /// File name template for the save node.
    pub output_filename: String,
    /// Local paths of downloaded source images, in record order.
    pub input_images: Vec<PathBuf>,
    pub input_image_1_strength: Option<i32>,
    pub input_image_2_strength: Option<i32>,
    /// Sampler seed; random per submission unless pinned by the caller.
    pub seed: u64,
}

impl RenderJob {
    /// Draw a sampler seed the way every submission does.
    pub fn random_seed() -> u64 {
        rand::rng().random_range(1..=u32::MAX as u64)
    }

    fn input_image(&self, index: usize) -> Result<&str, WorkflowError> {
        self.input_images
            .get(index)
            .and_then(|p| p.to_str())
            .ok_or(WorkflowError::MissingInputImage {
                generation_type: self.generation_type,
                index: index + 1,
            })
    }
}

/// Load the variant's template and apply the per-job patches.
pub fn build_workflow(template_dir: &Path, job: &RenderJob) -> Result<Workflow, WorkflowError> {
    let mut wf = Workflow::load(template_dir, job.generation_type, &job.model)?;
    patch_workflow(&mut wf, job)?;
    Ok(wf)
}

/// Apply the hard-coded node patches for the job's variant.
pub fn patch_workflow(wf: &mut Workflow, job: &RenderJob) -> Result<(), WorkflowError> {
    match job.generation_type {
        GenerationType::Prompt if job.model == "schnell" => {
            wf.set_input("6", "text", job.prompt.as_str())?;
            wf.set_input("25", "noise_seed", job.seed)?;
            wf.set_input("31", "file_name_template", job.output_filename.as_str())?;
            wf.set_input("5", "width", job.width)?;
            wf.set_input("5", "height", job.height)?;
        }
        GenerationType::Prompt => {
            // dev graph: prompt encode + seed, save node 41, and the
            // 27/30 resize pair both track the target dimensions.
            wf.set_input("6", "text", job.prompt.as_str())?;
            wf.set_input("25", "noise_seed", job.seed)?;
            wf.set_input("41", "file_name_template", job.output_filename.as_str())?;
            for node in ["27", "30"] {
                wf.set_input(node, "width", job.width)?;
                wf.set_input(node, "height", job.height)?;
            }
        }
        GenerationType::Outpaint => {
            wf.set_input("40", "image", job.input_image(0)?)?;
            wf.set_input("6", "text", job.prompt.as_str())?;
            wf.set_input("25", "noise_seed", job.seed)?;
            wf.set_input("31", "file_name_template", job.output_filename.as_str())?;
            wf.set_input("5", "width", job.width)?;
            wf.set_input("5", "height", job.height)?;
        }
        GenerationType::Mix => {
            wf.set_input("40", "image", job.input_image(0)?)?;
            wf.set_input("56", "image", job.input_image(1)?)?;
            wf.set_input(
                "54",
                "downsampling_factor",
                job.input_image_1_strength.unwrap_or(1),
            )?;
            wf.set_input(
                "55",
                "downsampling_factor",
                job.input_image_2_strength.unwrap_or(1),
            )?;
            wf.set_input("6", "text", job.prompt.as_str())?;
            wf.set_input("25", "noise_seed", job.seed)?;
            wf.set_input("57", "file_name_template", job.output_filename.as_str())?;
            for node in ["27", "30"] {
                wf.set_input(node, "width", job.width)?;
                wf.set_input(node, "height", job.height)?;
            }
        }
        GenerationType::MixOne => {
            wf.set_input("40", "image", job.input_image(0)?)?;
            wf.set_input(
                "54",
                "image_strength",
                strength_label(job.input_image_1_strength.unwrap_or(1)),
            )?;
            wf.set_input("6", "text", job.prompt.as_str())?;
            wf.set_input("25", "noise_seed", job.seed)?;
            wf.set_input("56", "file_name_template", job.output_filename.as_str())?;
            for node in ["27", "30"] {
                wf.set_input(node, "width", job.width)?;
                wf.set_input(node, "height", job.height)?;
            }
        }
        GenerationType::KontextBasic => {
            // Kontext graphs save under their own naming and are sized
            // by the source image; only prompt, seed and image change.
            wf.set_input("142", "image", job.input_image(0)?)?;
            wf.set_input("6", "text", job.prompt.as_str())?;
            wf.set_input("31", "seed", job.seed)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn template(nodes: &[&str]) -> String {
        let mut obj = serde_json::Map::new();
        for id in nodes {
            obj.insert(
                id.to_string(),
                serde_json::json!({"class_type": "Test", "inputs": {}}),
            );
        }
        Value::Object(obj).to_string()
    }

    fn write_template(dir: &Path, name: &str, nodes: &[&str]) {
        let mut f = std::fs::File::create(dir.join(name)).unwrap();
        f.write_all(template(nodes).as_bytes()).unwrap();
    }

    fn job(generation_type: GenerationType, model: &str) -> RenderJob {
        RenderJob {
            generation_type,
            model: model.to_string(),
            prompt: "a fox reading a book".to_string(),
            width: 832,
            height: 1216,
            output_filename: "prompt_schnell_42_7.png".to_string(),
            input_images: vec![PathBuf::from("/tmp/in1.png"), PathBuf::from("/tmp/in2.png")],
            input_image_1_strength: Some(2),
            input_image_2_strength: Some(4),
            seed: 12345,
        }
    }

    #[test]
    fn template_files_per_variant() {
        assert_eq!(
            template_file(GenerationType::Prompt, "schnell").unwrap(),
            "flux_schnell_for_image_gen.json"
        );
        assert_eq!(
            template_file(GenerationType::Prompt, "dev").unwrap(),
            "flux_dev_for_image_gen.json"
        );
        assert_eq!(
            template_file(GenerationType::Mix, "schnell").unwrap(),
            "flux_two_image_mix_for_image_gen.json"
        );
        assert_eq!(
            template_file(GenerationType::KontextBasic, "dev").unwrap(),
            "flux_kontext_basic.json"
        );
    }

    #[test]
    fn prompt_template_requires_known_model() {
        assert_matches!(
            template_file(GenerationType::Prompt, "minimax"),
            Err(WorkflowError::UnsupportedVariant { .. })
        );
    }

    #[test]
    fn schnell_patches_expected_nodes() {
        let dir = tempfile::tempdir().unwrap();
        write_template(
            dir.path(),
            "flux_schnell_for_image_gen.json",
            &["5", "6", "25", "31"],
        );
        let wf = build_workflow(dir.path(), &job(GenerationType::Prompt, "schnell")).unwrap();
        assert_eq!(
            wf.input("6", "text").unwrap(),
            &Value::from("a fox reading a book")
        );
        assert_eq!(wf.input("25", "noise_seed").unwrap(), &Value::from(12345));
        assert_eq!(
            wf.input("31", "file_name_template").unwrap(),
            &Value::from("prompt_schnell_42_7.png")
        );
        assert_eq!(wf.input("5", "width").unwrap(), &Value::from(832));
        assert_eq!(wf.input("5", "height").unwrap(), &Value::from(1216));
    }

    #[test]
    fn dev_patches_resize_pair() {
        let dir = tempfile::tempdir().unwrap();
        write_template(
            dir.path(),
            "flux_dev_for_image_gen.json",
            &["6", "25", "27", "30", "41"],
        );
        let wf = build_workflow(dir.path(), &job(GenerationType::Prompt, "dev")).unwrap();
        for node in ["27", "30"] {
            assert_eq!(wf.input(node, "width").unwrap(), &Value::from(832));
            assert_eq!(wf.input(node, "height").unwrap(), &Value::from(1216));
        }
        assert!(wf.input("41", "file_name_template").is_some());
    }

    #[test]
    fn mix_patches_both_sources_and_strengths() {
        let dir = tempfile::tempdir().unwrap();
        write_template(
            dir.path(),
            "flux_two_image_mix_for_image_gen.json",
            &["6", "25", "27", "30", "40", "54", "55", "56", "57"],
        );
        let wf = build_workflow(dir.path(), &job(GenerationType::Mix, "schnell")).unwrap();
        assert_eq!(wf.input("40", "image").unwrap(), &Value::from("/tmp/in1.png"));
        assert_eq!(wf.input("56", "image").unwrap(), &Value::from("/tmp/in2.png"));
        assert_eq!(
            wf.input("54", "downsampling_factor").unwrap(),
            &Value::from(2)
        );
        assert_eq!(
            wf.input("55", "downsampling_factor").unwrap(),
            &Value::from(4)
        );
    }

    #[test]
    fn mix_one_maps_strength_to_label() {
        let dir = tempfile::tempdir().unwrap();
        write_template(
            dir.path(),
            "flux_one_image_mix_for_image_gen.json",
            &["6", "25", "27", "30", "40", "54", "56"],
        );
        let wf = build_workflow(dir.path(), &job(GenerationType::MixOne, "schnell")).unwrap();
        assert_eq!(wf.input("54", "image_strength").unwrap(), &Value::from("high"));
    }

    #[test]
    fn kontext_patches_seed_not_noise_seed() {
        let dir = tempfile::tempdir().unwrap();
        write_template(dir.path(), "flux_kontext_basic.json", &["6", "31", "142"]);
        let wf = build_workflow(dir.path(), &job(GenerationType::KontextBasic, "dev")).unwrap();
        assert_eq!(wf.input("31", "seed").unwrap(), &Value::from(12345));
        assert_eq!(
            wf.input("142", "image").unwrap(),
            &Value::from("/tmp/in1.png")
        );
    }

    #[test]
    fn missing_node_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        // schnell template missing the save node
        write_template(
            dir.path(),
            "flux_schnell_for_image_gen.json",
            &["5", "6", "25"],
        );
        let err = build_workflow(dir.path(), &job(GenerationType::Prompt, "schnell")).unwrap_err();
        assert_matches!(err, WorkflowError::MissingNode(node) if node == "31");
    }

    #[test]
    fn missing_source_image_fails_the_job() {
        let dir = tempfile::tempdir().unwrap();
        write_template(
            dir.path(),
            "flux_two_image_mix_for_image_gen.json",
            &["6", "25", "27", "30", "40", "54", "55", "56", "57"],
        );
        let mut j = job(GenerationType::Mix, "schnell");
        j.input_images.truncate(1);
        let err = build_workflow(dir.path(), &j).unwrap_err();
        assert_matches!(err, WorkflowError::MissingInputImage { index: 2, .. });
    }

    #[test]
    fn missing_template_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = build_workflow(dir.path(), &job(GenerationType::Prompt, "schnell")).unwrap_err();
        assert_matches!(err, WorkflowError::TemplateRead { .. });
    }

    #[test]
    fn non_object_template_rejected() {
        assert_matches!(
            Workflow::from_json("[1, 2, 3]"),
            Err(WorkflowError::NotAnObject)
        );
    }

    #[test]
    fn random_seed_in_range() {
        for _ in 0..64 {
            let seed = RenderJob::random_seed();
            assert!(seed >= 1 && seed <= u32::MAX as u64);
        }
    }
}
