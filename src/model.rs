use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use hf_hub::{api::sync::ApiBuilder, Repo, RepoType};
use ndarray::{Array2, Ix2};
use ort::{
    execution_providers::{
        CPUExecutionProvider, CUDAExecutionProvider, ExecutionProviderDispatch,
        TensorRTExecutionProvider,
    },
    session::{builder::GraphOptimizationLevel, Session, SessionInputValue},
    value::TensorRef,
};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};

use crate::{
    classification::Classifications,
    config::Engine,
    errors::{Result, SentimentCsvError},
    traits::SentimentModel,
};

const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";

/// Task the loaded model has to solve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    SentimentAnalysis,
}

impl Task {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SentimentAnalysis => "sentiment analysis",
        }
    }
}

/// Everything needed to resolve and instantiate a classifier.
#[derive(Debug, Clone)]
pub struct ModelOptions {
    pub task: Task,
    /// Local directory or Hugging Face Hub repository id
    pub model: String,
    pub revision: String,
    pub onnx_file: String,
    pub engine: Engine,
    pub device_id: i32,
    pub max_length: usize,
}

/// Files making up a sequence-classification model on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelFiles {
    pub onnx: PathBuf,
    pub tokenizer: PathBuf,
    pub config: PathBuf,
}

impl ModelFiles {
    /// Resolves the model files, from a local directory when `options.model`
    /// names one, otherwise from the Hugging Face Hub cache (downloading on a miss).
    pub fn resolve(options: &ModelOptions) -> Result<Self> {
        let local = Path::new(&options.model);
        if local.is_dir() {
            return Self::from_dir(local, &options.onnx_file).map_err(|e| {
                SentimentCsvError::model_load(&options.model, "local model lookup", e)
            });
        }
        Self::from_hub(options)
    }

    fn from_dir(dir: &Path, onnx_file: &str) -> std::result::Result<Self, String> {
        let files = Self {
            onnx: dir.join(onnx_file),
            tokenizer: dir.join(TOKENIZER_FILE),
            config: dir.join(CONFIG_FILE),
        };
        for path in [&files.onnx, &files.tokenizer, &files.config] {
            if !path.is_file() {
                return Err(format!("missing model file {}", path.display()));
            }
        }
        Ok(files)
    }

    fn from_hub(options: &ModelOptions) -> Result<Self> {
        tracing::info!(
            model = %options.model,
            revision = %options.revision,
            "Resolving model from the Hugging Face Hub"
        );

        let api = ApiBuilder::new()
            .with_progress(false)
            .build()
            .map_err(|e| {
                SentimentCsvError::model_load(&options.model, "hub client init", e.to_string())
            })?;
        let repo = api.repo(Repo::with_revision(
            options.model.clone(),
            RepoType::Model,
            options.revision.clone(),
        ));

        let fetch = |file: &str| {
            tracing::debug!(file, "Fetching model file");
            repo.get(file).map_err(|e| {
                SentimentCsvError::model_load(
                    &options.model,
                    format!("download {file}"),
                    e.to_string(),
                )
            })
        };

        Ok(Self {
            config: fetch(CONFIG_FILE)?,
            tokenizer: fetch(TOKENIZER_FILE)?,
            onnx: fetch(&options.onnx_file)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ClassifierConfig {
    id2label: Option<BTreeMap<String, String>>,
}

/// Reads the ordered label names from a model's `config.json`.
pub fn read_labels(config_path: &Path) -> std::result::Result<Vec<String>, String> {
    let raw = std::fs::read_to_string(config_path)
        .map_err(|e| format!("cannot read {}: {e}", config_path.display()))?;
    let config: ClassifierConfig = serde_json::from_str(&raw)
        .map_err(|e| format!("cannot parse {}: {e}", config_path.display()))?;
    let id2label = config
        .id2label
        .filter(|labels| !labels.is_empty())
        .ok_or_else(|| {
            "config has no id2label; not a sequence classification model".to_string()
        })?;

    let mut indexed = id2label
        .into_iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|id| (id, label))
                .map_err(|_| format!("label id `{id}` is not an integer"))
        })
        .collect::<std::result::Result<Vec<_>, _>>()?;
    indexed.sort_by_key(|(id, _)| *id);

    for (expected, (id, _)) in indexed.iter().enumerate() {
        if *id != expected {
            return Err(format!("label ids are not contiguous: missing {expected}"));
        }
    }
    Ok(indexed.into_iter().map(|(_, label)| label).collect())
}

fn execution_providers(engine: Engine, device_id: i32) -> Vec<ExecutionProviderDispatch> {
    match engine {
        Engine::Cpu => vec![CPUExecutionProvider::default().build()],
        Engine::Cuda => vec![CUDAExecutionProvider::default()
            .with_device_id(device_id)
            .build()
            .error_on_failure()],
        Engine::TensorRt => vec![TensorRTExecutionProvider::default()
            .with_device_id(device_id)
            .build()
            .error_on_failure()],
    }
}

/// DistilBERT-style sequence classifier running on ONNX Runtime.
pub struct OnnxSentimentModel {
    session: Session,
    tokenizer: Tokenizer,
    labels: Vec<String>,
    uses_token_type_ids: bool,
    logits_output: String,
}

impl OnnxSentimentModel {
    pub fn load(options: &ModelOptions) -> Result<Self> {
        tracing::info!(
            task = options.task.as_str(),
            model = %options.model,
            engine = %options.engine,
            "Loading classifier"
        );
        let files = ModelFiles::resolve(options)?;
        Self::from_files(&files, options)
    }

    pub fn from_files(files: &ModelFiles, options: &ModelOptions) -> Result<Self> {
        let fail = |operation: &str, message: String| {
            SentimentCsvError::model_load(&options.model, operation, message)
        };

        let labels = read_labels(&files.config).map_err(|e| fail("label lookup", e))?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer)
            .map_err(|e| fail("tokenizer load", e.to_string()))?;
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: options.max_length,
                ..Default::default()
            }))
            .map_err(|e| fail("tokenizer truncation setup", e.to_string()))?;
        tokenizer.with_padding(None);

        tracing::debug!(
            engine = %options.engine,
            device_id = options.device_id,
            "Building session"
        );
        let session = Session::builder()
            .map_err(|e| fail("session builder init", e.to_string()))?
            .with_execution_providers(execution_providers(options.engine, options.device_id))
            .map_err(|e| fail("execution provider setup", e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| fail("optimization level setup", e.to_string()))?
            .with_intra_threads(1)
            .map_err(|e| fail("thread setup", e.to_string()))?
            .commit_from_file(&files.onnx)
            .map_err(|e| fail(&format!("onnx load: {}", files.onnx.display()), e.to_string()))?;

        let input_names: Vec<&str> = session.inputs.iter().map(|i| i.name.as_str()).collect();
        for required in ["input_ids", "attention_mask"] {
            if !input_names.contains(&required) {
                return Err(fail(
                    "model input check",
                    format!("graph has no `{required}` input (found {input_names:?})"),
                ));
            }
        }
        let uses_token_type_ids = input_names.contains(&"token_type_ids");
        let logits_output = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| fail("model output check", "graph has no outputs".to_string()))?;

        tracing::info!(labels = ?labels, "Classifier ready");
        Ok(Self {
            session,
            tokenizer,
            labels,
            uses_token_type_ids,
            logits_output,
        })
    }

    fn logits(&mut self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| SentimentCsvError::inference("tokenization", e))?;

        let to_row = |values: &[u32]| -> Result<Array2<i64>> {
            let row: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
            Ok(Array2::from_shape_vec((1, row.len()), row)?)
        };
        let input_ids = to_row(encoding.get_ids())?;
        let attention_mask = to_row(encoding.get_attention_mask())?;
        let token_type_ids = to_row(encoding.get_type_ids())?;

        let mut inputs: Vec<(&str, SessionInputValue<'_>)> = vec![
            ("input_ids", TensorRef::from_array_view(&input_ids)?.into()),
            (
                "attention_mask",
                TensorRef::from_array_view(&attention_mask)?.into(),
            ),
        ];
        if self.uses_token_type_ids {
            inputs.push((
                "token_type_ids",
                TensorRef::from_array_view(&token_type_ids)?.into(),
            ));
        }

        let outputs = self.session.run(inputs)?;
        let logits = outputs[self.logits_output.as_str()]
            .try_extract_array::<f32>()?
            .into_dimensionality::<Ix2>()?;
        Ok(logits.row(0).to_vec())
    }
}

fn classify_logits(logits: &[f32], labels: &[String]) -> Result<Classifications> {
    if logits.is_empty() {
        return Err(SentimentCsvError::inference(
            "logits extraction",
            "model returned no logits",
        ));
    }
    if let Some(bad) = logits.iter().find(|x| !x.is_finite()) {
        return Err(SentimentCsvError::inference(
            "logits extraction",
            format!("model returned a non-finite logit: {bad}"),
        ));
    }
    Ok(Classifications::from_logits(logits, labels))
}

impl SentimentModel for OnnxSentimentModel {
    fn classify(&mut self, text: &str) -> Result<Classifications> {
        let logits = self.logits(text)?;
        classify_logits(&logits, &self.labels)
    }

    fn labels(&self) -> &[String] {
        &self.labels
    }
}
