use std::path::PathBuf;
use std::process::ExitCode;
use thiserror::Error;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Structured error types for the sentiment scoring run.
///
/// Every variant is fatal: the pipeline never recovers locally, the error is
/// propagated to `main`, logged once and mapped to a process exit status with
/// [`SentimentCsvError::exit_code`].
#[derive(Error, Debug)]
pub enum SentimentCsvError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Model load error: {operation} failed (model: {model})")]
    ModelLoad {
        model: String,
        operation: String,
        #[source]
        source: BoxError,
    },

    #[error("Input error: {operation} failed for {path:?}")]
    InputIo {
        path: PathBuf,
        operation: String,
        #[source]
        source: csv::Error,
    },

    #[error("Output error: {operation} failed for {path:?}")]
    OutputIo {
        path: PathBuf,
        operation: String,
        #[source]
        source: csv::Error,
    },

    #[error("Malformed row at line {line}: {reason}")]
    MalformedRow { line: u64, reason: String },

    #[error("Inference error: {operation} failed")]
    Inference {
        operation: String,
        #[source]
        source: BoxError,
    },
}

pub type Result<T> = std::result::Result<T, SentimentCsvError>;

impl SentimentCsvError {
    pub fn model_load(
        model: impl Into<String>,
        operation: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::ModelLoad {
            model: model.into(),
            operation: operation.into(),
            source: source.into(),
        }
    }

    pub fn inference(operation: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Inference {
            operation: operation.into(),
            source: source.into(),
        }
    }

    /// Exit status reported by the binary for this kind of failure.
    pub fn exit_code(&self) -> ExitCode {
        ExitCode::from(self.exit_status())
    }

    pub const fn exit_status(&self) -> u8 {
        match self {
            Self::Configuration { .. } => 2,
            Self::ModelLoad { .. } => 3,
            Self::InputIo { .. } => 4,
            Self::OutputIo { .. } => 5,
            Self::MalformedRow { .. } => 6,
            Self::Inference { .. } => 7,
        }
    }
}

/// Convert anyhow errors to configuration errors.
///
/// Only option validation produces anyhow errors, so the configuration
/// category is the only sensible target.
impl From<anyhow::Error> for SentimentCsvError {
    fn from(err: anyhow::Error) -> Self {
        Self::Configuration {
            message: format!("{err:#}"),
        }
    }
}

/// Convert ONNX Runtime errors to inference errors.
///
/// Load-time call sites build [`SentimentCsvError::ModelLoad`] themselves, so a
/// bare `ort::Error` reaching `?` comes from a session run.
impl From<ort::Error> for SentimentCsvError {
    fn from(err: ort::Error) -> Self {
        Self::inference("ort operation", err.to_string())
    }
}

/// Convert ndarray shape errors to inference errors.
impl From<ndarray::ShapeError> for SentimentCsvError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::inference("logits shape conversion", err)
    }
}
